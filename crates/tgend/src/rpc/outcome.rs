//! Command outcomes and the builder handlers record into.
//!
//! A handler never returns its status directly. It writes a result document
//! and zero or more errors into an [`OutcomeBuilder`], and the final
//! [`StatusCode`] is derived from what was recorded once the handler returns.
//! This keeps batch commands honest: each entry reports its own failure and
//! the remaining entries are still evaluated.

use serde::Serialize;
use serde_json::Value;
use strum::{Display, IntoStaticStr};

use super::errors::ParamError;

/// Final status of a dispatched command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, IntoStaticStr)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusCode {
    /// The command completed without recording an error.
    Ok,
    /// A request field failed validation.
    ParamError,
    /// The command ran but recorded one or more domain failures.
    ExecuteError,
    /// A collaborator failed for reasons unrelated to the request.
    InternalError,
    /// No handler is registered under the requested name.
    UnknownCommand,
}

/// One error attached to an outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RpcError {
    /// Path of the offending request field, for parameter errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Human-readable description.
    pub message: String,
}

impl RpcError {
    /// Error not tied to a request field.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            field: None,
            message: message.into(),
        }
    }
}

impl From<&ParamError> for RpcError {
    fn from(error: &ParamError) -> Self {
        Self {
            field: Some(error.field().to_owned()),
            message: error.to_string(),
        }
    }
}

/// Status, result and errors produced by one command.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    /// Final status.
    pub status: StatusCode,
    /// Result document; `null` when the command produced none.
    pub result: Value,
    /// Errors recorded while the command ran.
    pub errors: Vec<RpcError>,
}

impl Outcome {
    /// Outcome of a command aborted by a parameter error.
    #[must_use]
    pub fn param_error(error: &ParamError) -> Self {
        Self {
            status: StatusCode::ParamError,
            result: Value::Null,
            errors: vec![RpcError::from(error)],
        }
    }

    /// Outcome of a command aborted by a collaborator failure.
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::InternalError,
            result: Value::Null,
            errors: vec![RpcError::message(message)],
        }
    }

    /// Outcome for a command name with no registered handler.
    #[must_use]
    pub fn unknown_command(name: &str) -> Self {
        Self {
            status: StatusCode::UnknownCommand,
            result: Value::Null,
            errors: vec![RpcError::message(format!("unknown command '{name}'"))],
        }
    }

    /// Outcome rejected before the handler ran, e.g. by an access gate.
    pub fn execute_error(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::ExecuteError,
            result: Value::Null,
            errors: vec![RpcError::message(message)],
        }
    }

    /// Whether the command succeeded.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == StatusCode::Ok
    }
}

/// Accumulates a handler's result and errors.
#[derive(Debug, Default)]
pub struct OutcomeBuilder {
    result: Value,
    errors: Vec<RpcError>,
    entry_param_failures: usize,
}

impl OutcomeBuilder {
    /// Creates an empty builder with a `null` result.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the result document.
    pub fn set_result(&mut self, result: impl Into<Value>) {
        self.result = result.into();
    }

    /// Records a domain failure. Processing continues.
    pub fn report_execution_error(&mut self, message: impl Into<String>) {
        self.errors.push(RpcError::message(message));
    }

    /// Records a parameter failure scoped to one entry of a batch.
    ///
    /// Unlike a parameter error propagated out of the handler, this does not
    /// discard the result: the other entries still carry their answers.
    pub fn report_param_error(&mut self, error: &ParamError) {
        self.entry_param_failures += 1;
        self.errors.push(RpcError::from(error));
    }

    /// Whether anything has been recorded as failed.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Derives the status and produces the outcome.
    #[must_use]
    pub fn finish(self) -> Outcome {
        let status = if self.entry_param_failures > 0 {
            StatusCode::ParamError
        } else if self.errors.is_empty() {
            StatusCode::Ok
        } else {
            StatusCode::ExecuteError
        };
        Outcome {
            status,
            result: self.result,
            errors: self.errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;
    use crate::rpc::errors::ParamReason;
    use crate::rpc::value::ValueKind;

    fn missing_type() -> ParamError {
        ParamError::new(
            "api_vers[1].type",
            ParamReason::Missing {
                expected: ValueKind::String,
            },
        )
    }

    #[rstest]
    #[case(StatusCode::Ok, "\"OK\"")]
    #[case(StatusCode::ParamError, "\"PARAM_ERROR\"")]
    #[case(StatusCode::ExecuteError, "\"EXECUTE_ERROR\"")]
    #[case(StatusCode::InternalError, "\"INTERNAL_ERROR\"")]
    #[case(StatusCode::UnknownCommand, "\"UNKNOWN_COMMAND\"")]
    fn status_codes_serialise_in_wire_form(#[case] status: StatusCode, #[case] wire: &str) {
        assert_eq!(serde_json::to_string(&status).expect("serialise"), wire);
        assert_eq!(format!("\"{status}\""), wire);
    }

    #[test]
    fn empty_builder_finishes_ok() {
        let mut builder = OutcomeBuilder::new();
        builder.set_result(json!({}));
        let outcome = builder.finish();
        assert!(outcome.is_ok());
        assert_eq!(outcome.result, json!({}));
    }

    #[test]
    fn execution_errors_keep_best_effort_result() {
        let mut builder = OutcomeBuilder::new();
        builder.set_result(json!({"partial": true}));
        builder.report_execution_error("port 1 is owned by 'bob'");
        builder.report_execution_error("port 3 is owned by 'carol'");
        let outcome = builder.finish();
        assert_eq!(outcome.status, StatusCode::ExecuteError);
        assert_eq!(outcome.errors.len(), 2);
        assert_eq!(outcome.result, json!({"partial": true}));
    }

    #[test]
    fn entry_param_errors_take_precedence() {
        let mut builder = OutcomeBuilder::new();
        builder.report_execution_error("API mismatch");
        builder.report_param_error(&missing_type());
        builder.set_result(json!({"api_vers": []}));
        let outcome = builder.finish();
        assert_eq!(outcome.status, StatusCode::ParamError);
        assert_eq!(outcome.errors[1].field.as_deref(), Some("api_vers[1].type"));
        assert_eq!(outcome.result, json!({"api_vers": []}));
    }

    #[test]
    fn field_is_omitted_for_execution_errors() {
        let error = RpcError::message("boom");
        assert_eq!(
            serde_json::to_value(&error).expect("serialise"),
            json!({"message": "boom"})
        );
    }
}
