//! Property metadata consumed by the collection engine.

use std::sync::Arc;

use super::conventions::StorageReflection;
use super::{EntityDef, FieldDef, RelationDef, ScalarType};
use crate::error::Error;

/// What a property is backed by.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyKind {
    /// A scalar field.
    Field(FieldDef),
    /// A relationship to another entity.
    Relation(RelationDef),
}

/// A resolved property of an entity.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyMetadata {
    /// Declaring entity name.
    pub entity: String,
    /// Property name.
    pub name: String,
    /// Field or relationship definition.
    pub kind: PropertyKind,
}

impl PropertyMetadata {
    /// The relationship descriptor, if this property is a relationship.
    pub fn relationship(&self) -> Option<&RelationDef> {
        match &self.kind {
            PropertyKind::Relation(relation) => Some(relation),
            PropertyKind::Field(_) => None,
        }
    }

    /// The scalar type comparison values are coerced to.
    pub fn scalar_type(&self) -> Option<&ScalarType> {
        match &self.kind {
            PropertyKind::Field(field) => field.scalar_type(),
            PropertyKind::Relation(_) => None,
        }
    }

    /// Whether the stored value may be null.
    pub fn is_nullable(&self) -> bool {
        match &self.kind {
            PropertyKind::Field(field) => field.is_nullable(),
            PropertyKind::Relation(relation) => relation.nullable || !relation.has_foreign_key(),
        }
    }
}

/// Read access to the entity model.
///
/// Implementations are immutable lookup tables; callers may share them across
/// concurrent evaluations.
pub trait MetadataProvider: Send + Sync {
    /// Get an entity definition.
    fn entity(&self, entity: &str) -> Result<&EntityDef, Error>;

    /// Check whether the entity declares the property.
    fn has_property(&self, entity: &str, name: &str) -> bool;

    /// Resolve a property of the entity.
    fn property(&self, entity: &str, name: &str) -> Result<Arc<PropertyMetadata>, Error>;

    /// Storage reflection of the entity.
    fn conventions(&self, entity: &str) -> Result<Arc<dyn StorageReflection>, Error>;
}
