//! Unit tests for bootstrap health reporting and shutdown.

use std::io;
use std::sync::Arc;

use mockall::Sequence;
use rstest::{fixture, rstest};

use scenelink_config::{Endpoint, ServerConfig};

use crate::bootstrap::{BootstrapError, run_server, start_server};
use crate::health::MockHealthReporter;
use crate::shutdown::{ShutdownError, ShutdownSignal, StopReason};
use crate::transport::ListenerError;

struct ImmediateSignal;

impl ShutdownSignal for ImmediateSignal {
    fn wait(&self) -> Result<StopReason, ShutdownError> {
        Ok(StopReason::Requested)
    }
}

struct BrokenSignal;

impl ShutdownSignal for BrokenSignal {
    fn wait(&self) -> Result<StopReason, ShutdownError> {
        Err(ShutdownError::Install {
            source: io::Error::other("signals unavailable"),
        })
    }
}

#[fixture]
fn loopback_config() -> ServerConfig {
    ServerConfig {
        endpoint: Endpoint::new("127.0.0.1", 0),
        ..ServerConfig::default()
    }
}

fn healthy_reporter() -> MockHealthReporter {
    let mut reporter = MockHealthReporter::new();
    let mut sequence = Sequence::new();
    reporter
        .expect_bootstrap_starting()
        .times(1)
        .in_sequence(&mut sequence)
        .return_const(());
    reporter
        .expect_listener_bound()
        .withf(|addr| addr.ip().is_loopback() && addr.port() != 0)
        .times(1)
        .in_sequence(&mut sequence)
        .return_const(());
    reporter
        .expect_bootstrap_succeeded()
        .times(1)
        .in_sequence(&mut sequence)
        .return_const(());
    reporter
        .expect_shutdown()
        .times(1)
        .in_sequence(&mut sequence)
        .return_const(());
    reporter.expect_bootstrap_failed().never();
    reporter
}

#[rstest]
fn start_and_stop_report_each_stage(loopback_config: ServerConfig) {
    let server = start_server(&loopback_config, Arc::new(healthy_reporter())).expect("start");
    assert!(server.local_addr().is_some());
    server.stop().expect("stop");
}

#[rstest]
fn non_loopback_bind_is_reported_as_failure() {
    let config = ServerConfig {
        endpoint: Endpoint::new("0.0.0.0", 0),
        ..ServerConfig::default()
    };
    let mut reporter = MockHealthReporter::new();
    reporter.expect_bootstrap_starting().times(1).return_const(());
    reporter
        .expect_bootstrap_failed()
        .withf(|error| {
            matches!(
                error,
                BootstrapError::Listener {
                    source: ListenerError::NonLoopback { .. }
                }
            )
        })
        .times(1)
        .return_const(());
    reporter.expect_listener_bound().never();
    reporter.expect_bootstrap_succeeded().never();

    let error = start_server(&config, Arc::new(reporter)).expect_err("bind refused");
    assert!(error.to_string().starts_with("command socket failed"));
}

#[rstest]
fn run_server_stops_after_the_signal(loopback_config: ServerConfig) {
    run_server(&loopback_config, Arc::new(healthy_reporter()), &ImmediateSignal)
        .expect("clean shutdown");
}

#[rstest]
fn signal_failure_still_stops_the_listener(loopback_config: ServerConfig) {
    let error = run_server(&loopback_config, Arc::new(healthy_reporter()), &BrokenSignal)
        .expect_err("signal failure");
    assert!(matches!(error, BootstrapError::Signals { .. }));
}
