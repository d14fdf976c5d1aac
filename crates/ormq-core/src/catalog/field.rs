//! Field definitions for entities.

use super::types::{FieldType, ScalarType};
use rkyv::Archive;
use serde::{Deserialize, Serialize};

/// A scalar property of an entity.
#[derive(
    Debug, Clone, PartialEq, Archive, rkyv::Serialize, rkyv::Deserialize, Serialize, Deserialize,
)]
pub struct FieldDef {
    /// Property name.
    pub name: String,
    /// Field data type.
    pub field_type: FieldType,
    /// Storage column, when it does not follow the naming conventions.
    #[serde(default)]
    pub column: Option<String>,
}

impl FieldDef {
    /// Create a new required field.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            column: None,
        }
    }

    /// Create a nullable scalar field.
    pub fn optional(name: impl Into<String>, scalar: ScalarType) -> Self {
        Self::new(name, FieldType::OptionalScalar(scalar))
    }

    /// Map the field to an explicit storage column.
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    /// Check if the field accepts null.
    pub fn is_nullable(&self) -> bool {
        self.field_type.is_nullable()
    }

    /// The scalar type values of this field are coerced to.
    pub fn scalar_type(&self) -> Option<&ScalarType> {
        self.field_type.scalar_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_def_builder() {
        let field = FieldDef::new("publishedAt", FieldType::scalar(ScalarType::Timestamp))
            .with_column("published");

        assert_eq!(field.name, "publishedAt");
        assert_eq!(field.column.as_deref(), Some("published"));
        assert!(!field.is_nullable());
    }

    #[test]
    fn test_optional_field() {
        let field = FieldDef::optional("description", ScalarType::String);

        assert!(field.is_nullable());
        assert!(field.column.is_none());
        assert_eq!(field.scalar_type(), Some(&ScalarType::String));
    }
}
