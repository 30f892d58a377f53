//! Command execution: validation, dispatch and envelope normalisation.
//!
//! [`CommandExecutor::execute`] is the only entry point and never fails:
//! unknown commands, validation errors, handler errors and handler panics all
//! come back as error envelopes so one bad request cannot take down a worker.
//!
//! The handler table is fixed at construction. Building an executor checks
//! that every command in the schema has exactly one handler and that no
//! handler is bound to an undeclared name, so a mismatch fails at boot
//! instead of on the first request.

mod code;
mod errors;
mod handler;

use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};

use scenelink_protocol::{
    CommandRequest, CommandResponse, ErrorCode, SchemaRegistry, ValidationError,
};
use serde_json::{Map, Value, json};
use tracing::{debug, error, warn};

pub use self::code::{
    CodeOutput, CodeRunError, CodeRunner, DisabledCodeRunner, ProcessCodeRunner,
};
pub use self::errors::ExecutorError;
pub use self::handler::{
    CommandHandler, Handler, HandlerError, HandlerTable, LIST_COMMANDS, Params,
};

#[cfg(test)]
pub(crate) use self::code::MockCodeRunner;

pub(crate) const EXECUTOR_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::executor");

const CODE_PARAM: &str = "code";
const CODE_SUCCESS_MESSAGE: &str = "Code executed successfully";

/// Validates requests and invokes the bound handler.
#[derive(Debug)]
pub struct CommandExecutor {
    registry: &'static SchemaRegistry,
    handlers: HashMap<String, Handler>,
}

impl CommandExecutor {
    /// Pairs the registry with a handler table.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::MissingHandler`] when a declared command has
    /// no handler and [`ExecutorError::UndeclaredHandler`] when a handler is
    /// bound to a name outside the schema.
    pub fn new(
        registry: &'static SchemaRegistry,
        table: HandlerTable,
    ) -> Result<Self, ExecutorError> {
        let handlers = table.into_entries();
        if let Some(spec) = registry.specs().find(|spec| !handlers.contains_key(&spec.name)) {
            return Err(ExecutorError::MissingHandler {
                command: spec.name.clone(),
            });
        }
        let mut undeclared: Vec<&String> = handlers
            .keys()
            .filter(|name| !registry.contains(name))
            .collect();
        undeclared.sort_unstable();
        if let Some(name) = undeclared.first() {
            return Err(ExecutorError::UndeclaredHandler {
                command: (*name).clone(),
            });
        }
        Ok(Self { registry, handlers })
    }

    /// Returns the registry the executor validates against.
    #[must_use]
    pub const fn registry(&self) -> &'static SchemaRegistry {
        self.registry
    }

    /// Runs one command to completion and returns its envelope.
    #[must_use]
    pub fn execute(&self, request: &CommandRequest) -> CommandResponse {
        let name = request.command_type();
        let params = match self.registry.validate(name, request.params()) {
            Ok(params) => params,
            Err(failure) => {
                debug!(
                    target: EXECUTOR_TARGET,
                    command = name,
                    error = %failure,
                    "request rejected by schema"
                );
                return CommandResponse::error(failure.code(), failure.to_string());
            }
        };

        let Some(handler) = self.handlers.get(name) else {
            let failure = ValidationError::unknown_command(name);
            return CommandResponse::error(failure.code(), failure.to_string());
        };

        debug!(target: EXECUTOR_TARGET, command = name, "executing command");
        match handler {
            Handler::Catalogue => self.catalogue(),
            Handler::Scene(scene) => invoke(name, scene.as_ref(), &params),
            Handler::CodeExecution(runner) => run_code(runner.as_ref(), &params),
        }
    }

    fn catalogue(&self) -> CommandResponse {
        CommandResponse::from_handler_output(json!({
            "commands": self.registry.command_names(),
        }))
    }
}

fn invoke(name: &str, handler: &dyn CommandHandler, params: &Params) -> CommandResponse {
    match guarded(name, || handler.call(params)) {
        Ok(Ok(output)) => CommandResponse::from_handler_output(output),
        Ok(Err(failure)) => {
            warn!(
                target: EXECUTOR_TARGET,
                command = name,
                error = %failure,
                "handler reported failure"
            );
            CommandResponse::error(ErrorCode::HandlerFailure, failure.message())
        }
        Err(response) => response,
    }
}

fn run_code(runner: &dyn CodeRunner, params: &Params) -> CommandResponse {
    let Some(code) = params.get(CODE_PARAM).and_then(Value::as_str) else {
        let failure = ValidationError::missing_param(CODE_PARAM);
        return CommandResponse::error(failure.code(), failure.to_string());
    };
    warn!(
        target: EXECUTOR_TARGET,
        code_bytes = code.len(),
        "executing caller-supplied code"
    );
    match guarded("execute_houdini_code", || runner.run(code)) {
        Ok(Ok(output)) if output.succeeded() => {
            let mut data = Map::with_capacity(3);
            data.insert("stdout".to_owned(), Value::from(output.stdout));
            data.insert("stderr".to_owned(), Value::from(output.stderr));
            data.insert("exit_code".to_owned(), Value::from(output.exit_code));
            CommandResponse::success(CODE_SUCCESS_MESSAGE, data)
        }
        Ok(Ok(output)) => {
            let detail = output.stderr.trim();
            let message = if detail.is_empty() {
                format!("Code exited with status {}", output.exit_code)
            } else {
                format!("Code exited with status {}: {detail}", output.exit_code)
            };
            CommandResponse::error(ErrorCode::HandlerFailure, message)
        }
        Ok(Err(CodeRunError::Disabled)) => CommandResponse::error(
            ErrorCode::CodeExecutionDisabled,
            CodeRunError::Disabled.to_string(),
        ),
        Ok(Err(failure)) => {
            warn!(target: EXECUTOR_TARGET, error = %failure, "code execution failed");
            CommandResponse::error(ErrorCode::HandlerFailure, failure.to_string())
        }
        Err(response) => response,
    }
}

/// Runs `call`, turning a panic into a handler failure envelope.
fn guarded<T>(name: &str, call: impl FnOnce() -> T) -> Result<T, CommandResponse> {
    panic::catch_unwind(AssertUnwindSafe(call)).map_err(|payload| {
        let detail = panic_detail(payload.as_ref());
        error!(
            target: EXECUTOR_TARGET,
            command = name,
            panic = detail,
            "handler panicked"
        );
        CommandResponse::error(
            ErrorCode::HandlerFailure,
            format!("Handler for '{name}' failed: {detail}"),
        )
    })
}

fn panic_detail(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
