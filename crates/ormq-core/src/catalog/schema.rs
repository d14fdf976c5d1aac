//! Schema bundle - versioned snapshot of the entity model.

use super::EntityDef;
use crate::error::Error;
use rkyv::Archive;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A versioned snapshot of every entity definition.
#[derive(
    Debug, Clone, PartialEq, Archive, rkyv::Serialize, rkyv::Deserialize, Serialize, Deserialize,
)]
pub struct SchemaBundle {
    /// Schema version.
    #[serde(default)]
    pub version: u64,
    /// Entity definitions keyed by name.
    pub entities: HashMap<String, EntityDef>,
}

impl SchemaBundle {
    /// Create an empty schema bundle.
    pub fn new(version: u64) -> Self {
        Self {
            version,
            entities: HashMap::new(),
        }
    }

    /// Add an entity to the schema.
    pub fn with_entity(mut self, entity: EntityDef) -> Self {
        self.entities.insert(entity.name.clone(), entity);
        self
    }

    /// Get an entity by name.
    pub fn get_entity(&self, name: &str) -> Option<&EntityDef> {
        self.entities.get(name)
    }

    /// List all entity names, sorted.
    pub fn entity_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entities.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Check that every relationship and identity refers to something declared.
    pub fn validate(&self) -> Result<(), Error> {
        for entity in self.entities.values() {
            if entity.identity_fields.is_empty() {
                return Err(Error::InvalidArgument(format!(
                    "entity `{}` has no identity fields",
                    entity.name
                )));
            }
            for identity in &entity.identity_fields {
                if entity.get_field(identity).is_none() && entity.get_relation(identity).is_none()
                {
                    return Err(Error::UnknownProperty {
                        entity: entity.name.clone(),
                        property: identity.clone(),
                    });
                }
            }
            for relation in &entity.relations {
                let target = self.get_entity(&relation.to_entity).ok_or_else(|| {
                    Error::UnknownEntity {
                        entity: relation.to_entity.clone(),
                    }
                })?;
                if let Some(inverse) = &relation.inverse {
                    if target.get_relation(inverse).is_none() {
                        return Err(Error::UnknownProperty {
                            entity: target.name.clone(),
                            property: inverse.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Serialize the schema bundle to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        rkyv::to_bytes::<rkyv::rancor::Error>(self)
            .map(|v| v.to_vec())
            .map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize a schema bundle from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        rkyv::from_bytes::<Self, rkyv::rancor::Error>(bytes)
            .map_err(|e| Error::Deserialization(e.to_string()))
    }

    /// Load a schema bundle from JSON.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|e| Error::Deserialization(e.to_string()))
    }

    /// Render the schema bundle as JSON.
    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }
}

impl Default for SchemaBundle {
    fn default() -> Self {
        Self::new(0)
    }
}
