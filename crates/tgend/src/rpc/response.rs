//! Response serialization for the JSONL transport.

use std::io::Write;

use serde::Serialize;
use serde_json::Value;

use super::errors::DispatchError;
use super::outcome::{Outcome, RpcError, StatusCode};

/// Field path reported when the request line itself is unusable.
pub const REQUEST_FIELD: &str = "request";

/// One response line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpcResponse {
    /// Correlation ID copied from the request.
    pub id: Value,
    /// Final status.
    pub status: StatusCode,
    /// Result document, omitted when `null`.
    #[serde(skip_serializing_if = "Value::is_null")]
    pub result: Value,
    /// Recorded errors, omitted when empty.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<RpcError>,
}

impl RpcResponse {
    /// Wraps a command outcome.
    #[must_use]
    pub fn from_outcome(id: Value, outcome: Outcome) -> Self {
        Self {
            id,
            status: outcome.status,
            result: outcome.result,
            errors: outcome.errors,
        }
    }

    /// Response to a request line that never reached the dispatcher.
    #[must_use]
    pub fn rejected(error: &DispatchError) -> Self {
        Self {
            id: Value::Null,
            status: StatusCode::ParamError,
            result: Value::Null,
            errors: vec![RpcError {
                field: Some(REQUEST_FIELD.to_owned()),
                message: error.to_string(),
            }],
        }
    }
}

/// Writer that serializes responses to a stream.
///
/// The writer handles JSONL framing and flushes after every line so the
/// client sees each response as soon as it is produced.
pub struct ResponseWriter<W> {
    writer: W,
}

impl<W: Write> ResponseWriter<W> {
    /// Creates a new response writer wrapping the given output stream.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Writes a response as a JSONL line and flushes.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization, writing or flushing fails.
    pub fn write_response(&mut self, response: &RpcResponse) -> Result<(), DispatchError> {
        serde_json::to_writer(&mut self.writer, response)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    /// Writes a rejection for a request line that could not be dispatched.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_rejection(&mut self, error: &DispatchError) -> Result<(), DispatchError> {
        self.write_response(&RpcResponse::rejected(error))
    }
}
