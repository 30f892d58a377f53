//! Out-of-process execution of caller-supplied code.
//!
//! [`ProcessCodeRunner`] spawns the configured interpreter as
//! `<interpreter> -c <code>` in a process group of its own, with stdout and
//! stderr piped. Both pipes are drained on helper threads so the child never
//! blocks on a full buffer. The whole run, including collecting output, is
//! bounded by the timeout.
//!
//! Once the interpreter exits, anything it left running in its group is
//! killed so that background processes cannot hold the pipes open. On
//! timeout the entire group is killed.

use std::io::{self, Read};
use std::os::unix::process::CommandExt;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::sys::signal::{Signal, killpg};
use nix::unistd::Pid;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use super::EXECUTOR_TARGET;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Minimum time allowed for pipes to close after the group has been killed.
const DRAIN_GRACE: Duration = Duration::from_millis(250);

type PipeOutput = Receiver<io::Result<Vec<u8>>>;

/// Captured result of a finished child process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeOutput {
    /// Everything the code wrote to stdout.
    pub stdout: String,
    /// Everything the code wrote to stderr.
    pub stderr: String,
    /// Process exit code; `-1` when the process was ended by a signal.
    pub exit_code: i32,
}

impl CodeOutput {
    /// Returns `true` when the process exited with status zero.
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

/// Failures of the code execution capability.
#[derive(Debug, Clone, Error)]
pub enum CodeRunError {
    /// Code execution is switched off in the server configuration.
    #[error("Code execution is disabled on this server")]
    Disabled,

    /// The interpreter could not be started.
    #[error("failed to start interpreter '{interpreter}': {source}")]
    Spawn {
        /// Interpreter binary.
        interpreter: String,
        /// Underlying spawn error.
        #[source]
        source: Arc<io::Error>,
    },

    /// The code did not finish within its budget and was killed.
    #[error("Code execution timed out after {seconds}s")]
    Timeout {
        /// Budget in whole seconds.
        seconds: u64,
    },

    /// Waiting on the child or reading its output failed.
    #[error("I/O error while running code: {source}")]
    Io {
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },
}

impl CodeRunError {
    fn io(source: io::Error) -> Self {
        Self::Io {
            source: Arc::new(source),
        }
    }
}

/// Runs caller-supplied source code.
#[cfg_attr(test, mockall::automock)]
pub trait CodeRunner: Send + Sync {
    /// Executes `code` and captures its output.
    ///
    /// # Errors
    ///
    /// Returns [`CodeRunError`] when execution is disabled, the interpreter
    /// cannot be started, or the code overruns its budget.
    fn run(&self, code: &str) -> Result<CodeOutput, CodeRunError>;
}

/// Runner used when code execution is not enabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledCodeRunner;

impl CodeRunner for DisabledCodeRunner {
    fn run(&self, _code: &str) -> Result<CodeOutput, CodeRunError> {
        Err(CodeRunError::Disabled)
    }
}

/// Runner that executes code in a child interpreter process.
#[derive(Debug, Clone)]
pub struct ProcessCodeRunner {
    interpreter: String,
    timeout: Duration,
}

impl ProcessCodeRunner {
    /// Creates a runner for `interpreter` with a per-run budget.
    pub fn new(interpreter: impl Into<String>, timeout: Duration) -> Self {
        Self {
            interpreter: interpreter.into(),
            timeout,
        }
    }
}

impl CodeRunner for ProcessCodeRunner {
    fn run(&self, code: &str) -> Result<CodeOutput, CodeRunError> {
        debug!(
            target: EXECUTOR_TARGET,
            interpreter = %self.interpreter,
            code_bytes = code.len(),
            "spawning code interpreter"
        );
        let budget = Budget::starting_now(self.timeout);
        let mut child = Command::new(&self.interpreter)
            .arg("-c")
            .arg(code)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0)
            .spawn()
            .map_err(|source| CodeRunError::Spawn {
                interpreter: self.interpreter.clone(),
                source: Arc::new(source),
            })?;
        let group = process_group(&child);

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());
        let status = match wait_until(&mut child, &budget) {
            Ok(status) => status,
            Err(error) => {
                kill_group(group);
                drop(child.wait());
                return Err(error);
            }
        };
        // Leftover background processes would keep the pipes open.
        kill_group(group);

        Ok(CodeOutput {
            stdout: collect(stdout, &budget)?,
            stderr: collect(stderr, &budget)?,
            exit_code: status.code().unwrap_or(-1),
        })
    }
}

/// Time limit shared by waiting on the interpreter and collecting its output.
struct Budget {
    started: Instant,
    timeout: Duration,
}

impl Budget {
    fn starting_now(timeout: Duration) -> Self {
        Self {
            started: Instant::now(),
            timeout,
        }
    }

    fn remaining(&self) -> Duration {
        self.timeout.saturating_sub(self.started.elapsed())
    }

    fn exhausted(&self) -> CodeRunError {
        warn!(
            target: EXECUTOR_TARGET,
            timeout_secs = self.timeout.as_secs(),
            "code execution timed out, killing interpreter process group"
        );
        CodeRunError::Timeout {
            seconds: self.timeout.as_secs(),
        }
    }
}

fn process_group(child: &Child) -> Option<Pid> {
    i32::try_from(child.id()).ok().map(Pid::from_raw)
}

fn kill_group(group: Option<Pid>) {
    let Some(pgid) = group else {
        return;
    };
    match killpg(pgid, Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(error) => {
            warn!(target: EXECUTOR_TARGET, %error, "failed to kill interpreter process group");
        }
    }
}

fn drain<R>(pipe: Option<R>) -> Option<PipeOutput>
where
    R: Read + Send + 'static,
{
    pipe.map(|mut reader| {
        let (sender, receiver) = mpsc::channel();
        thread::spawn(move || {
            let mut buffer = Vec::new();
            let result = reader.read_to_end(&mut buffer).map(|_| buffer);
            // The runner may have given up waiting.
            sender.send(result).ok();
        });
        receiver
    })
}

fn collect(pipe: Option<PipeOutput>, budget: &Budget) -> Result<String, CodeRunError> {
    let Some(receiver) = pipe else {
        return Ok(String::new());
    };
    match receiver.recv_timeout(budget.remaining().max(DRAIN_GRACE)) {
        Ok(Ok(bytes)) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        Ok(Err(error)) => Err(CodeRunError::io(error)),
        Err(RecvTimeoutError::Timeout) => Err(budget.exhausted()),
        Err(RecvTimeoutError::Disconnected) => {
            Err(CodeRunError::io(io::Error::other("output reader panicked")))
        }
    }
}

fn wait_until(child: &mut Child, budget: &Budget) -> Result<ExitStatus, CodeRunError> {
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                debug!(target: EXECUTOR_TARGET, ?status, "code interpreter exited");
                return Ok(status);
            }
            Ok(None) if budget.remaining().is_zero() => return Err(budget.exhausted()),
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(error) => return Err(CodeRunError::io(error)),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use rstest::rstest;

    use super::*;

    fn shell(timeout: Duration) -> ProcessCodeRunner {
        ProcessCodeRunner::new("sh", timeout)
    }

    #[rstest]
    fn captures_stdout_and_exit_code() {
        let output = shell(Duration::from_secs(5))
            .run("echo hello")
            .expect("run succeeds");
        assert_eq!(output.stdout, "hello\n");
        assert!(output.stderr.is_empty());
        assert!(output.succeeded());
    }

    #[rstest]
    fn reports_non_zero_exit_with_stderr() {
        let output = shell(Duration::from_secs(5))
            .run("echo broken >&2; exit 3")
            .expect("run completes");
        assert_eq!(output.exit_code, 3);
        assert_eq!(output.stderr, "broken\n");
        assert!(!output.succeeded());
    }

    #[rstest]
    fn kills_code_that_overruns() {
        let start = Instant::now();
        let error = shell(Duration::from_millis(100))
            .run("sleep 5")
            .expect_err("should time out");
        assert!(matches!(error, CodeRunError::Timeout { .. }));
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[rstest]
    fn background_processes_do_not_outlive_the_run() {
        let start = Instant::now();
        let output = shell(Duration::from_millis(500))
            .run("sleep 6 & echo started")
            .expect("run completes");
        assert_eq!(output.stdout, "started\n");
        assert!(
            start.elapsed() < Duration::from_secs(3),
            "run took {:?}",
            start.elapsed()
        );
    }

    #[rstest]
    fn timeout_kills_the_whole_process_group() {
        let start = Instant::now();
        let error = shell(Duration::from_millis(200))
            .run("sleep 6 & sleep 6")
            .expect_err("should time out");
        assert!(matches!(error, CodeRunError::Timeout { .. }));
        assert!(
            start.elapsed() < Duration::from_secs(3),
            "run took {:?}",
            start.elapsed()
        );
    }

    #[rstest]
    fn missing_interpreter_is_a_spawn_error() {
        let runner = ProcessCodeRunner::new("scenelink-no-such-interpreter", Duration::from_secs(1));
        let error = runner.run("1").expect_err("spawn fails");
        assert!(matches!(error, CodeRunError::Spawn { .. }));
    }

    #[rstest]
    fn disabled_runner_refuses() {
        let error = DisabledCodeRunner.run("print(1)").expect_err("disabled");
        assert_eq!(error.to_string(), "Code execution is disabled on this server");
    }
}
