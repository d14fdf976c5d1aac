//! ormq core - entity catalog and collection query engine.
//!
//! A [`Filter`](ormq_proto::Filter) built against an entity is evaluated by one
//! of two backends with the same semantics:
//!
//! - [`ArrayCollection`] filters, sorts and slices an in-memory [`EntityGraph`].
//! - [`SqlCollection`] assembles a parametrized SQL query with the joins,
//!   grouping and HAVING clauses the filter requires.

pub mod catalog;
pub mod collection;
pub mod config;
pub mod error;

pub use catalog::{
    Cardinality, Catalog, Conventions, EntityDef, FieldDef, FieldType, MetadataProvider,
    PropertyKind, PropertyMetadata, RelationDef, ScalarType, SchemaBundle, StorageReflection,
};
pub use collection::{
    ArrayCollection, ArrayExpressionResult, EntityGraph, EntityRow, ExpressionContext, ParamType,
    QueryParam, SqlAggregator, SqlCollection, SqlExpressionResult, SqlQuery, SqlQueryBuilder,
    TableJoin,
};
pub use config::{CollectionConfig, ConventionsConfig};
pub use error::Error;

/// Re-export protocol types.
pub use ormq_proto as proto;
