//! Entity definitions.

use super::field::FieldDef;
use super::relation::RelationDef;
use rkyv::Archive;
use serde::{Deserialize, Serialize};

/// An entity definition: its scalar fields and relationship properties.
#[derive(
    Debug, Clone, PartialEq, Archive, rkyv::Serialize, rkyv::Deserialize, Serialize, Deserialize,
)]
pub struct EntityDef {
    /// Entity name (unique within schema).
    pub name: String,
    /// Identity field names; several for a composite primary key.
    pub identity_fields: Vec<String>,
    /// Storage table, when it does not follow the naming conventions.
    #[serde(default)]
    pub storage_name: Option<String>,
    /// Field definitions.
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    /// Relationship definitions.
    #[serde(default)]
    pub relations: Vec<RelationDef>,
}

impl EntityDef {
    /// Create a new entity definition with a single identity field.
    pub fn new(name: impl Into<String>, identity_field: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            identity_fields: vec![identity_field.into()],
            storage_name: None,
            fields: Vec::new(),
            relations: Vec::new(),
        }
    }

    /// Use a composite identity.
    pub fn with_identity(mut self, fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.identity_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Map the entity to an explicit storage table.
    pub fn with_storage_name(mut self, name: impl Into<String>) -> Self {
        self.storage_name = Some(name.into());
        self
    }

    /// Add a field to the entity.
    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Add multiple fields.
    pub fn with_fields(mut self, fields: impl IntoIterator<Item = FieldDef>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Add a relationship property.
    pub fn with_relation(mut self, relation: RelationDef) -> Self {
        self.relations.push(relation);
        self
    }

    /// Get a field by name.
    pub fn get_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Get a relationship by property name.
    pub fn get_relation(&self, name: &str) -> Option<&RelationDef> {
        self.relations.iter().find(|r| r.name == name)
    }

    /// Check if the identity spans several fields.
    pub fn has_composite_identity(&self) -> bool {
        self.identity_fields.len() > 1
    }
}
