//! Error types raised while decoding and dispatching RPC requests.
//!
//! [`ParamError`] describes a request field that failed validation and aborts
//! the command it belongs to. [`CommandError`] is what a handler returns when
//! it cannot continue at all. [`DispatchError`] covers failures of the
//! connection itself (framing, I/O, serialisation), which never reach a
//! handler.

use std::io;

use thiserror::Error;

use super::value::ValueKind;

/// Reason a request field was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParamReason {
    /// The field is absent.
    #[error("missing field (expected {expected})")]
    Missing {
        /// Expected value kind.
        expected: ValueKind,
    },
    /// The field has the wrong type.
    #[error("expected {expected}, got {found}")]
    TypeMismatch {
        /// Expected value kind.
        expected: ValueKind,
        /// Kind actually supplied.
        found: ValueKind,
    },
    /// A numeric field lies outside the accepted range.
    #[error("value {value} is out of range [{min}, {max}]")]
    OutOfRange {
        /// Supplied value, rendered as text.
        value: String,
        /// Inclusive lower bound.
        min: i128,
        /// Inclusive upper bound.
        max: i128,
    },
    /// A string field that must name something is empty or whitespace.
    #[error("value must not be blank")]
    Blank,
    /// A string field is not one of the permitted choices.
    #[error("value '{value}' is not one of [{}]", .allowed.join(", "))]
    InvalidChoice {
        /// Supplied value.
        value: String,
        /// Permitted values.
        allowed: Vec<String>,
    },
    /// The request document itself is not usable.
    #[error("{message}")]
    Malformed {
        /// Human-readable description.
        message: String,
    },
}

/// A request field that failed validation.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("bad parameter '{field}': {reason}")]
pub struct ParamError {
    field: String,
    #[source]
    reason: ParamReason,
}

impl ParamError {
    /// Creates an error for the field at `field`.
    pub fn new(field: impl Into<String>, reason: ParamReason) -> Self {
        Self {
            field: field.into(),
            reason,
        }
    }

    /// Creates an error describing an unusable request document.
    pub fn malformed(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            field,
            ParamReason::Malformed {
                message: message.into(),
            },
        )
    }

    /// Path of the offending field, e.g. `api_vers[1].type`.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Why the field was rejected.
    #[must_use]
    pub fn reason(&self) -> &ParamReason {
        &self.reason
    }
}

/// Failure that stops a command handler outright.
#[derive(Debug, Error)]
pub enum CommandError {
    /// A parameter failed validation before any side effect took place.
    #[error(transparent)]
    Param(#[from] ParamError),
    /// A collaborator failed in a way unrelated to the request content.
    #[error("internal error: {message}")]
    Internal {
        /// Description safe to return to the client.
        message: String,
    },
}

impl CommandError {
    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// Errors surfaced while reading requests from or writing responses to a
/// connection.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Request line could not be parsed as a request document.
    #[error("malformed request: {message}")]
    MalformedRequest {
        /// Parser diagnostic.
        message: String,
        /// Underlying JSON error, when there is one.
        #[source]
        source: Option<serde_json::Error>,
    },

    /// Request exceeds the maximum allowed size.
    #[error("request too large: {size} bytes exceeds {max_size} byte limit")]
    RequestTooLarge {
        /// Bytes received so far.
        size: usize,
        /// Configured limit.
        max_size: usize,
    },

    /// IO error during read or write.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Response serialization failed.
    #[error("failed to serialize response: {0}")]
    SerializeResponse(#[from] serde_json::Error),
}

impl DispatchError {
    /// Creates a malformed request error from a serde error.
    pub fn from_json_error(source: serde_json::Error) -> Self {
        Self::MalformedRequest {
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Creates a malformed request error with a custom message.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedRequest {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a request too large error.
    pub fn request_too_large(size: usize, max_size: usize) -> Self {
        Self::RequestTooLarge { size, max_size }
    }

    /// Whether the connection can keep serving requests after this error.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::MalformedRequest { .. })
    }
}
