//! Request deserialization for the JSONL transport.

use serde::Deserialize;
use serde_json::Value;

use super::errors::DispatchError;

/// Parsed request line.
///
/// `id` is echoed back verbatim so clients can pipeline requests; `params`
/// is left as a generic document for the command's handler to validate.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RpcRequest {
    /// Client correlation ID, `null` when absent.
    #[serde(default)]
    pub id: Value,
    /// Name of the command to run.
    pub command: String,
    /// Command parameters.
    #[serde(default)]
    pub params: Value,
}

impl RpcRequest {
    /// Parses a JSONL line into a request.
    ///
    /// Trailing whitespace (including the newline delimiter) is trimmed
    /// before parsing.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::MalformedRequest` if the line is empty, is not
    /// valid JSON matching the request schema, or names no command.
    pub fn parse(line: &[u8]) -> Result<Self, DispatchError> {
        let trimmed = trim_trailing_whitespace(line);
        if trimmed.is_empty() {
            return Err(DispatchError::malformed("empty request line"));
        }

        let request: Self =
            serde_json::from_slice(trimmed).map_err(DispatchError::from_json_error)?;
        if request.command.trim().is_empty() {
            return Err(DispatchError::malformed("command field is empty"));
        }
        Ok(request)
    }

    /// Returns the normalised command name (trimmed).
    #[must_use]
    pub fn command(&self) -> &str {
        self.command.trim()
    }
}

/// Trims trailing ASCII whitespace from a byte slice.
fn trim_trailing_whitespace(bytes: &[u8]) -> &[u8] {
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(0, |pos| pos + 1);
    bytes.get(..end).unwrap_or_default()
}
