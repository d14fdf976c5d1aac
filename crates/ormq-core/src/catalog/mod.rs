//! Entity metadata catalog.
//!
//! The catalog holds entity, field and relationship definitions, the storage
//! naming conventions derived from them, and the memoized metadata provider
//! the collection engine resolves property paths against.

mod catalog;
mod conventions;
mod entity;
mod field;
mod metadata;
mod relation;
mod schema;
mod types;

pub use catalog::Catalog;
pub use conventions::{Conventions, StorageReflection};
pub use entity::EntityDef;
pub use field::FieldDef;
pub use metadata::{MetadataProvider, PropertyKind, PropertyMetadata};
pub use relation::{Cardinality, RelationDef};
pub use schema::SchemaBundle;
pub use types::{FieldType, ScalarType};
