//! Catalog: memoized metadata provider over a schema bundle.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::trace;

use super::conventions::{Conventions, StorageReflection};
use super::metadata::{MetadataProvider, PropertyKind, PropertyMetadata};
use super::{EntityDef, SchemaBundle};
use crate::config::ConventionsConfig;
use crate::error::Error;

/// The catalog of entity metadata.
///
/// The schema is immutable once loaded. Resolved properties and per-entity
/// conventions are built on first use and cached; a racing duplicate build
/// yields an equal value and the first insert wins.
pub struct Catalog {
    schema: SchemaBundle,
    config: ConventionsConfig,
    properties: DashMap<(String, String), Arc<PropertyMetadata>>,
    conventions: DashMap<String, Arc<Conventions>>,
}

impl Catalog {
    /// Create a catalog with the default naming conventions.
    pub fn new(schema: SchemaBundle) -> Result<Self, Error> {
        Self::with_config(schema, ConventionsConfig::default())
    }

    /// Create a catalog with custom naming conventions.
    pub fn with_config(schema: SchemaBundle, config: ConventionsConfig) -> Result<Self, Error> {
        schema.validate()?;
        Ok(Self {
            schema,
            config,
            properties: DashMap::new(),
            conventions: DashMap::new(),
        })
    }

    /// Load a catalog from a JSON schema bundle.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        Self::new(SchemaBundle::from_json(json)?)
    }

    /// The underlying schema.
    pub fn schema(&self) -> &SchemaBundle {
        &self.schema
    }

    /// The naming conventions configuration.
    pub fn conventions_config(&self) -> &ConventionsConfig {
        &self.config
    }

    fn resolve_property(&self, entity: &str, name: &str) -> Result<PropertyMetadata, Error> {
        let def = self.entity(entity)?;
        let kind = if let Some(field) = def.get_field(name) {
            PropertyKind::Field(field.clone())
        } else if let Some(relation) = def.get_relation(name) {
            PropertyKind::Relation(relation.clone())
        } else {
            return Err(Error::UnknownProperty {
                entity: entity.to_string(),
                property: name.to_string(),
            });
        };

        Ok(PropertyMetadata {
            entity: entity.to_string(),
            name: name.to_string(),
            kind,
        })
    }
}

impl MetadataProvider for Catalog {
    fn entity(&self, entity: &str) -> Result<&EntityDef, Error> {
        self.schema
            .get_entity(entity)
            .ok_or_else(|| Error::UnknownEntity {
                entity: entity.to_string(),
            })
    }

    fn has_property(&self, entity: &str, name: &str) -> bool {
        self.schema
            .get_entity(entity)
            .map(|def| def.get_field(name).is_some() || def.get_relation(name).is_some())
            .unwrap_or(false)
    }

    fn property(&self, entity: &str, name: &str) -> Result<Arc<PropertyMetadata>, Error> {
        let key = (entity.to_string(), name.to_string());
        if let Some(cached) = self.properties.get(&key) {
            return Ok(Arc::clone(cached.value()));
        }

        let resolved = Arc::new(self.resolve_property(entity, name)?);
        trace!(entity, property = name, "cached property metadata");
        let entry = self.properties.entry(key).or_insert(resolved);
        Ok(Arc::clone(entry.value()))
    }

    fn conventions(&self, entity: &str) -> Result<Arc<dyn StorageReflection>, Error> {
        if let Some(cached) = self.conventions.get(entity) {
            let conventions: Arc<dyn StorageReflection> = Arc::clone(cached.value()) as _;
            return Ok(conventions);
        }

        let built = Arc::new(Conventions::new(self.entity(entity)?, &self.config));
        let entry = self.conventions.entry(entity.to_string()).or_insert(built);
        let conventions: Arc<dyn StorageReflection> = Arc::clone(entry.value()) as _;
        Ok(conventions)
    }
}
