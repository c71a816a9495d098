//! Helpers over the structured value model shared by requests and results.
//!
//! Requests and results are carried as [`serde_json::Value`], which already
//! models the null/bool/integer/float/string/array/object union with ordered
//! arrays and unique object keys. This module adds the vocabulary the
//! validation engine needs to describe what it found and what it expected.

use std::fmt;

use serde_json::Value;

/// Coarse classification of a structured value, used in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// JSON `null`.
    Null,
    /// `true` or `false`.
    Bool,
    /// Integral number.
    Int,
    /// Floating point number (integers are accepted where a float is expected).
    Float,
    /// UTF-8 string.
    String,
    /// Ordered sequence.
    Array,
    /// String-keyed map.
    Object,
}

impl ValueKind {
    /// Classifies a value.
    #[must_use]
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Bool,
            Value::Number(number) if number.is_f64() => Self::Float,
            Value::Number(_) => Self::Int,
            Value::String(_) => Self::String,
            Value::Array(_) => Self::Array,
            Value::Object(_) => Self::Object,
        }
    }

    /// Returns the name used in error messages.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "double",
            Self::String => "string",
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Returns an empty object, the result shape of every acknowledgement command.
#[must_use]
pub fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}
