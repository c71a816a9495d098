//! Typed, range-checked extraction of request parameters.
//!
//! Handlers never index into the raw request document. They wrap it in
//! [`Params`] and pull each field through a typed accessor, which either
//! yields a value of the expected type or a [`ParamError`] naming the exact
//! field path and the shape that was expected. Accessors return `Result` so
//! the first failure propagates with `?` and aborts the command before it
//! has touched any state.
//!
//! Nested objects and array elements are wrapped in their own [`Params`]
//! carrying the parent path, so an error deep in a batch reads as
//! `api_vers[2].type` rather than just `type`.

use once_cell::sync::Lazy;
use serde_json::{Map, Value};

use super::errors::{ParamError, ParamReason};
use super::value::ValueKind;

/// Name of the field carrying a port index.
pub const PORT_ID_FIELD: &str = "port_id";

/// Read-only view over a request object with path tracking.
#[derive(Debug, Clone)]
pub struct Params<'a> {
    members: &'a Map<String, Value>,
    path: String,
}

impl<'a> Params<'a> {
    /// Wraps the top-level `params` document.
    ///
    /// A `null` document is treated as an empty object so parameterless
    /// commands can be sent without a `params` member.
    ///
    /// # Errors
    ///
    /// Returns a type mismatch on the `params` field when the document is
    /// neither an object nor `null`.
    pub fn root(document: &'a Value) -> Result<Self, ParamError> {
        static EMPTY: Lazy<Map<String, Value>> = Lazy::new(Map::new);

        match document {
            Value::Object(members) => Ok(Self {
                members,
                path: String::new(),
            }),
            Value::Null => Ok(Self {
                members: &EMPTY,
                path: String::new(),
            }),
            other => Err(ParamError::new(
                "params",
                ParamReason::TypeMismatch {
                    expected: ValueKind::Object,
                    found: ValueKind::of(other),
                },
            )),
        }
    }

    /// Path of this view, empty at the root.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Full path of a member of this view.
    #[must_use]
    pub fn field_path(&self, name: &str) -> String {
        if self.path.is_empty() {
            name.to_owned()
        } else {
            format!("{}.{name}", self.path)
        }
    }

    /// Names of every member, in document order.
    pub fn member_names(&self) -> impl Iterator<Item = &'a str> {
        self.members.keys().map(String::as_str)
    }

    /// Whether the member is present (and not `null`).
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.members.get(name).is_some_and(|value| !value.is_null())
    }

    fn require(&self, name: &str, expected: ValueKind) -> Result<&'a Value, ParamError> {
        match self.members.get(name) {
            Some(Value::Null) | None => Err(ParamError::new(
                self.field_path(name),
                ParamReason::Missing { expected },
            )),
            Some(value) => Ok(value),
        }
    }

    fn mismatch(&self, name: &str, expected: ValueKind, found: &Value) -> ParamError {
        ParamError::new(
            self.field_path(name),
            ParamReason::TypeMismatch {
                expected,
                found: ValueKind::of(found),
            },
        )
    }

    fn out_of_range(&self, name: &str, value: impl ToString, min: i128, max: i128) -> ParamError {
        ParamError::new(
            self.field_path(name),
            ParamReason::OutOfRange {
                value: value.to_string(),
                min,
                max,
            },
        )
    }

    /// Reads a string field.
    ///
    /// # Errors
    ///
    /// Fails when the field is missing or not a string.
    pub fn string(&self, name: &str) -> Result<&'a str, ParamError> {
        let value = self.require(name, ValueKind::String)?;
        value
            .as_str()
            .ok_or_else(|| self.mismatch(name, ValueKind::String, value))
    }

    /// Reads a string field that must contain something other than
    /// whitespace.
    ///
    /// # Errors
    ///
    /// Fails when the field is missing, not a string, or blank.
    pub fn non_empty_string(&self, name: &str) -> Result<&'a str, ParamError> {
        let value = self.string(name)?;
        if value.trim().is_empty() {
            Err(ParamError::new(self.field_path(name), ParamReason::Blank))
        } else {
            Ok(value)
        }
    }

    /// Reads a boolean field.
    ///
    /// # Errors
    ///
    /// Fails when the field is missing or not a boolean.
    pub fn bool(&self, name: &str) -> Result<bool, ParamError> {
        let value = self.require(name, ValueKind::Bool)?;
        value
            .as_bool()
            .ok_or_else(|| self.mismatch(name, ValueKind::Bool, value))
    }

    /// Reads a signed integer field.
    ///
    /// # Errors
    ///
    /// Fails when the field is missing, not integral, or beyond `i64`.
    pub fn int(&self, name: &str) -> Result<i64, ParamError> {
        let value = self.require(name, ValueKind::Int)?;
        match value {
            Value::Number(number) => match (number.as_i64(), number.as_u64()) {
                (Some(signed), _) => Ok(signed),
                (None, Some(unsigned)) => {
                    Err(self.out_of_range(name, unsigned, i128::from(i64::MIN), i128::from(i64::MAX)))
                }
                (None, None) => Err(self.mismatch(name, ValueKind::Int, value)),
            },
            other => Err(self.mismatch(name, ValueKind::Int, other)),
        }
    }

    /// Reads a signed integer field constrained to `min..=max`.
    ///
    /// # Errors
    ///
    /// Fails when the field is missing, not integral, or outside the range.
    pub fn int_in_range(&self, name: &str, min: i64, max: i64) -> Result<i64, ParamError> {
        let value = self.int(name)?;
        if (min..=max).contains(&value) {
            Ok(value)
        } else {
            Err(self.out_of_range(name, value, i128::from(min), i128::from(max)))
        }
    }

    /// Reads an unsigned integer field that must fit in `T`.
    ///
    /// # Errors
    ///
    /// Fails when the field is missing, not integral, negative, or too large
    /// for `T`.
    pub fn uint<T>(&self, name: &str) -> Result<T, ParamError>
    where
        T: TryFrom<u64> + UnsignedBound,
    {
        let value = self.require(name, ValueKind::Int)?;
        let Value::Number(number) = value else {
            return Err(self.mismatch(name, ValueKind::Int, value));
        };
        let max = T::MAX_VALUE;
        if let Some(unsigned) = number.as_u64() {
            return T::try_from(unsigned)
                .map_err(|_| self.out_of_range(name, unsigned, 0, i128::from(max)));
        }
        match number.as_i64() {
            Some(negative) => Err(self.out_of_range(name, negative, 0, i128::from(max))),
            None => Err(self.mismatch(name, ValueKind::Int, value)),
        }
    }

    /// Reads an unsigned 32-bit field.
    ///
    /// # Errors
    ///
    /// See [`Params::uint`].
    pub fn uint32(&self, name: &str) -> Result<u32, ParamError> {
        self.uint::<u32>(name)
    }

    /// Reads a floating point field; integral numbers are accepted.
    ///
    /// # Errors
    ///
    /// Fails when the field is missing or not numeric.
    pub fn double(&self, name: &str) -> Result<f64, ParamError> {
        let value = self.require(name, ValueKind::Float)?;
        value
            .as_f64()
            .ok_or_else(|| self.mismatch(name, ValueKind::Float, value))
    }

    /// Reads an array field for element-wise iteration.
    ///
    /// # Errors
    ///
    /// Fails when the field is missing or not an array.
    pub fn array(&self, name: &str) -> Result<ParamArray<'a>, ParamError> {
        let value = self.require(name, ValueKind::Array)?;
        match value {
            Value::Array(items) => Ok(ParamArray {
                items,
                path: self.field_path(name),
            }),
            other => Err(self.mismatch(name, ValueKind::Array, other)),
        }
    }

    /// Reads a nested object field for member iteration.
    ///
    /// # Errors
    ///
    /// Fails when the field is missing or not an object.
    pub fn object(&self, name: &str) -> Result<Params<'a>, ParamError> {
        let value = self.require(name, ValueKind::Object)?;
        match value {
            Value::Object(members) => Ok(Params {
                members,
                path: self.field_path(name),
            }),
            other => Err(self.mismatch(name, ValueKind::Object, other)),
        }
    }

    /// Reads a string field constrained to an enumerated set.
    ///
    /// # Errors
    ///
    /// Fails when the field is missing, not a string, or not in `allowed`.
    pub fn choice(&self, name: &str, allowed: &[&str]) -> Result<&'a str, ParamError> {
        let value = self.string(name)?;
        if allowed.contains(&value) {
            Ok(value)
        } else {
            Err(ParamError::new(
                self.field_path(name),
                ParamReason::InvalidChoice {
                    value: value.to_owned(),
                    allowed: allowed.iter().map(|choice| (*choice).to_owned()).collect(),
                },
            ))
        }
    }

    /// Reads the `port_id` field and checks it against the live port count.
    ///
    /// # Errors
    ///
    /// Fails when the field is missing, not an unsigned integer, or not below
    /// `port_count`.
    pub fn port_id(&self, port_count: u8) -> Result<u8, ParamError> {
        let value = self.uint::<u8>(PORT_ID_FIELD)?;
        if value < port_count {
            Ok(value)
        } else {
            Err(self.out_of_range(
                PORT_ID_FIELD,
                value,
                0,
                i128::from(port_count) - 1,
            ))
        }
    }
}

/// Array field extracted from a request, with element access that keeps
/// the array's path.
#[derive(Debug, Clone)]
pub struct ParamArray<'a> {
    items: &'a [Value],
    path: String,
}

impl<'a> ParamArray<'a> {
    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the array is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Raw elements, for untyped passthrough.
    #[must_use]
    pub fn values(&self) -> &'a [Value] {
        self.items
    }

    /// Path of the array field.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Views element `index` as an object.
    ///
    /// # Errors
    ///
    /// Fails when the element is not an object.
    pub fn object_at(&self, index: usize) -> Result<Params<'a>, ParamError> {
        match self.items.get(index) {
            Some(Value::Object(members)) => Ok(Params {
                members,
                path: format!("{}[{index}]", self.path),
            }),
            Some(other) => Err(ParamError::new(
                format!("{}[{index}]", self.path),
                ParamReason::TypeMismatch {
                    expected: ValueKind::Object,
                    found: ValueKind::of(other),
                },
            )),
            None => Err(ParamError::new(
                format!("{}[{index}]", self.path),
                ParamReason::Missing {
                    expected: ValueKind::Object,
                },
            )),
        }
    }
}

/// Upper bound of an unsigned integer type accepted by [`Params::uint`].
pub trait UnsignedBound {
    /// Largest representable value.
    const MAX_VALUE: u64;
}

macro_rules! unsigned_bound {
    ($($ty:ty),*) => {
        $(impl UnsignedBound for $ty {
            const MAX_VALUE: u64 = <$ty>::MAX as u64;
        })*
    };
}

unsigned_bound!(u8, u16, u32, u64);
