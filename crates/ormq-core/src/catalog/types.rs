//! Core type definitions for the catalog.

use ormq_proto::Value;
use rkyv::Archive;
use serde::{Deserialize, Serialize};

/// Scalar data types of entity properties.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
    Serialize,
    Deserialize,
)]
pub enum ScalarType {
    /// Boolean value.
    Bool,
    /// 32-bit signed integer.
    Int32,
    /// 64-bit signed integer.
    Int64,
    /// 32-bit floating point.
    Float32,
    /// 64-bit floating point.
    Float64,
    /// Fixed-precision decimal.
    Decimal {
        /// Total number of digits.
        precision: u8,
        /// Number of digits after decimal point.
        scale: u8,
    },
    /// UTF-8 string.
    String,
    /// Binary data.
    Bytes,
    /// Timestamp (microseconds since Unix epoch).
    Timestamp,
    /// UUID (128-bit identifier).
    Uuid,
}

/// Field types.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
    Serialize,
    Deserialize,
)]
pub enum FieldType {
    /// A scalar value.
    Scalar(ScalarType),
    /// An optional scalar value (nullable).
    OptionalScalar(ScalarType),
    /// An array of scalar values.
    ArrayScalar(ScalarType),
    /// An enumeration stored as its variant name.
    Enum {
        /// Name of the enum type.
        name: String,
        /// Allowed variant values.
        variants: Vec<String>,
    },
}

impl ScalarType {
    /// Check if this type is numeric.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            ScalarType::Int32
                | ScalarType::Int64
                | ScalarType::Float32
                | ScalarType::Float64
                | ScalarType::Decimal { .. }
        )
    }

    /// Check if this type is a string-like type.
    pub fn is_string_like(&self) -> bool {
        matches!(self, ScalarType::String | ScalarType::Bytes)
    }

    /// Coerce a comparison value to this type's representation.
    ///
    /// Values that cannot be converted are returned unchanged, so the
    /// comparison itself decides whether they match. Lists are coerced
    /// element-wise.
    pub fn coerce(&self, value: &Value) -> Value {
        match value {
            Value::Null => Value::Null,
            Value::List(items) => Value::List(items.iter().map(|v| self.coerce(v)).collect()),
            _ => self.coerce_scalar(value).unwrap_or_else(|| value.clone()),
        }
    }

    fn coerce_scalar(&self, value: &Value) -> Option<Value> {
        match self {
            ScalarType::Bool => match value {
                Value::Bool(b) => Some(Value::Bool(*b)),
                Value::String(s) => match s.as_str() {
                    "true" | "1" => Some(Value::Bool(true)),
                    "false" | "0" => Some(Value::Bool(false)),
                    _ => None,
                },
                other => match other.as_i64()? {
                    0 => Some(Value::Bool(false)),
                    1 => Some(Value::Bool(true)),
                    _ => None,
                },
            },
            ScalarType::Int32 | ScalarType::Int64 => {
                let int = match value {
                    Value::Bool(b) => i64::from(*b),
                    Value::String(s) => s.trim().parse().ok()?,
                    Value::Float32(_) | Value::Float64(_) => {
                        let f = value.as_f64()?;
                        if f.fract() != 0.0 {
                            return None;
                        }
                        f as i64
                    }
                    other => other.as_i64()?,
                };
                match self {
                    ScalarType::Int32 => i32::try_from(int).ok().map(Value::Int32),
                    _ => Some(Value::Int64(int)),
                }
            }
            ScalarType::Float32 | ScalarType::Float64 | ScalarType::Decimal { .. } => {
                let float = match value {
                    Value::String(s) => s.trim().parse().ok()?,
                    other => other.as_f64()?,
                };
                Some(Value::Float64(float))
            }
            ScalarType::String => match value {
                Value::String(_) => Some(value.clone()),
                Value::Int32(_) | Value::Int64(_) | Value::Float32(_) | Value::Float64(_) => {
                    Some(Value::String(value.to_string()))
                }
                _ => None,
            },
            ScalarType::Timestamp => match value {
                Value::Timestamp(t) => Some(Value::Timestamp(*t)),
                other => other.as_i64().map(Value::Timestamp),
            },
            ScalarType::Bytes | ScalarType::Uuid => None,
        }
    }
}

impl FieldType {
    /// Create a scalar field type.
    pub fn scalar(scalar: ScalarType) -> Self {
        FieldType::Scalar(scalar)
    }

    /// Create an optional scalar field type.
    pub fn optional_scalar(scalar: ScalarType) -> Self {
        FieldType::OptionalScalar(scalar)
    }

    /// Create an array of scalars field type.
    pub fn array_scalar(scalar: ScalarType) -> Self {
        FieldType::ArrayScalar(scalar)
    }

    /// Create an enum field type.
    pub fn enum_type(name: impl Into<String>, variants: Vec<String>) -> Self {
        FieldType::Enum {
            name: name.into(),
            variants,
        }
    }

    /// Check if this type is nullable.
    pub fn is_nullable(&self) -> bool {
        matches!(self, FieldType::OptionalScalar(_))
    }

    /// Check if this type is an array.
    pub fn is_array(&self) -> bool {
        matches!(self, FieldType::ArrayScalar(_))
    }

    /// Get the inner scalar type. Enums are stored as strings.
    pub fn scalar_type(&self) -> Option<&ScalarType> {
        match self {
            FieldType::Scalar(s) | FieldType::OptionalScalar(s) | FieldType::ArrayScalar(s) => {
                Some(s)
            }
            FieldType::Enum { .. } => Some(&ScalarType::String),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_type_checks() {
        assert!(ScalarType::Int32.is_numeric());
        assert!(ScalarType::Decimal {
            precision: 10,
            scale: 2
        }
        .is_numeric());
        assert!(!ScalarType::String.is_numeric());

        assert!(ScalarType::String.is_string_like());
        assert!(!ScalarType::Int32.is_string_like());
    }

    #[test]
    fn test_field_type_builders() {
        let optional_int = FieldType::optional_scalar(ScalarType::Int32);
        assert!(optional_int.is_nullable());
        assert!(!FieldType::scalar(ScalarType::Int32).is_nullable());

        let int_array = FieldType::array_scalar(ScalarType::Int32);
        assert!(int_array.is_array());
        assert_eq!(int_array.scalar_type(), Some(&ScalarType::Int32));

        let status = FieldType::enum_type("Status", vec!["Active".into()]);
        assert_eq!(status.scalar_type(), Some(&ScalarType::String));
    }

    #[test]
    fn test_coerce_numbers() {
        assert_eq!(ScalarType::Int64.coerce(&Value::Int32(4)), Value::Int64(4));
        assert_eq!(ScalarType::Int64.coerce(&Value::from("42")), Value::Int64(42));
        assert_eq!(ScalarType::Int32.coerce(&Value::Float64(3.0)), Value::Int32(3));
        assert_eq!(ScalarType::Int32.coerce(&Value::Float64(3.5)), Value::Float64(3.5));
        assert_eq!(ScalarType::Float64.coerce(&Value::Int64(2)), Value::Float64(2.0));
        assert_eq!(ScalarType::Float64.coerce(&Value::from("2.5")), Value::Float64(2.5));
    }

    #[test]
    fn test_coerce_bool_and_lists() {
        assert_eq!(ScalarType::Bool.coerce(&Value::Int64(1)), Value::Bool(true));
        assert_eq!(ScalarType::Bool.coerce(&Value::from("false")), Value::Bool(false));
        assert_eq!(ScalarType::Bool.coerce(&Value::Int64(7)), Value::Int64(7));

        let list = Value::list(["1", "2"]);
        assert_eq!(
            ScalarType::Int64.coerce(&list),
            Value::list([Value::Int64(1), Value::Int64(2)])
        );
        assert_eq!(ScalarType::String.coerce(&Value::Null), Value::Null);
        assert_eq!(ScalarType::String.coerce(&Value::Int64(5)), Value::from("5"));
    }
}
