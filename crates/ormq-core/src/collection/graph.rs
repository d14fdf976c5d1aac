//! In-memory entity sets for the array backend.

use std::collections::HashMap;

use ormq_proto::Value;
use tracing::debug;

use crate::catalog::{MetadataProvider, PropertyKind};
use crate::error::Error;

static NULL: Value = Value::Null;

/// Internal representation of an entity row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityRow {
    /// Field values by property name.
    pub fields: HashMap<String, Value>,
    /// Linked row indices by relationship property name.
    pub links: HashMap<String, Vec<usize>>,
}

impl EntityRow {
    /// Get a field value; missing fields read as null.
    pub fn get(&self, field: &str) -> &Value {
        self.fields.get(field).unwrap_or(&NULL)
    }

    /// Get the rows linked through a relationship.
    pub fn linked(&self, relation: &str) -> &[usize] {
        self.links.get(relation).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Materialized entity sets, with relationships as row indices.
#[derive(Debug, Clone, Default)]
pub struct EntityGraph {
    sets: HashMap<String, Vec<EntityRow>>,
}

impl EntityGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a row and return its index within the entity set.
    pub fn insert<K: Into<String>>(
        &mut self,
        entity: &str,
        fields: impl IntoIterator<Item = (K, Value)>,
    ) -> usize {
        let rows = self.sets.entry(entity.to_string()).or_default();
        rows.push(EntityRow {
            fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            links: HashMap::new(),
        });
        rows.len() - 1
    }

    /// Link `row` to `target` through `relation`, and the reverse direction
    /// through the inverse property when one is declared.
    pub fn link(
        &mut self,
        metadata: &dyn MetadataProvider,
        entity: &str,
        row: usize,
        relation: &str,
        target: usize,
    ) -> Result<(), Error> {
        let property = metadata.property(entity, relation)?;
        let relation = property.relationship().ok_or_else(|| {
            Error::InvalidArgument(format!("`{entity}.{relation}` is not a relationship"))
        })?;
        self.check_row(entity, row)?;
        self.check_row(&relation.to_entity, target)?;

        self.push_link(entity, row, &relation.name, target);
        if let Some(inverse) = &relation.inverse {
            self.push_link(&relation.to_entity, target, inverse, row);
        }
        Ok(())
    }

    fn check_row(&self, entity: &str, row: usize) -> Result<(), Error> {
        if row < self.rows(entity).len() {
            Ok(())
        } else {
            Err(Error::InvalidArgument(format!(
                "entity `{entity}` has no row {row}"
            )))
        }
    }

    fn push_link(&mut self, entity: &str, row: usize, relation: &str, target: usize) {
        if let Some(row) = self.sets.get_mut(entity).and_then(|rows| rows.get_mut(row)) {
            let links = row.links.entry(relation.to_string()).or_default();
            if !links.contains(&target) {
                links.push(target);
            }
        }
    }

    /// All rows of an entity.
    pub fn rows(&self, entity: &str) -> &[EntityRow] {
        self.sets.get(entity).map(Vec::as_slice).unwrap_or(&[])
    }

    /// A single row.
    pub fn row(&self, entity: &str, index: usize) -> Option<&EntityRow> {
        self.rows(entity).get(index)
    }

    /// Identity value of a row: the identity field, or a list of them for a
    /// composite identity. Identity relationships contribute the linked row's
    /// identity.
    pub fn identity(
        &self,
        metadata: &dyn MetadataProvider,
        entity: &str,
        index: usize,
    ) -> Result<Value, Error> {
        let def = metadata.entity(entity)?;
        let row = self.row(entity, index).ok_or_else(|| {
            Error::InvalidArgument(format!("entity `{entity}` has no row {index}"))
        })?;

        let mut parts = Vec::with_capacity(def.identity_fields.len());
        for name in &def.identity_fields {
            let part = match &metadata.property(entity, name)?.kind {
                PropertyKind::Field(_) => row.get(name).clone(),
                PropertyKind::Relation(relation) => match row.linked(name).first() {
                    Some(&target) => self.identity(metadata, &relation.to_entity, target)?,
                    None => Value::Null,
                },
            };
            parts.push(part);
        }

        Ok(match parts.len() {
            1 => parts.pop().unwrap_or(Value::Null),
            _ => Value::List(parts),
        })
    }

    /// Render a row as JSON: fields plus relationship identities.
    pub fn row_to_json(
        &self,
        metadata: &dyn MetadataProvider,
        entity: &str,
        index: usize,
    ) -> Result<serde_json::Value, Error> {
        let def = metadata.entity(entity)?;
        let row = self.row(entity, index).ok_or_else(|| {
            Error::InvalidArgument(format!("entity `{entity}` has no row {index}"))
        })?;

        let mut object = serde_json::Map::new();
        for field in &def.fields {
            object.insert(field.name.clone(), row.get(&field.name).to_json());
        }
        for relation in &def.relations {
            let linked = row
                .linked(&relation.name)
                .iter()
                .map(|&target| {
                    self.identity(metadata, &relation.to_entity, target)
                        .map(|id| id.to_json())
                })
                .collect::<Result<Vec<_>, _>>()?;
            let value = if relation.is_to_many() {
                serde_json::Value::Array(linked)
            } else {
                linked.into_iter().next().unwrap_or(serde_json::Value::Null)
            };
            object.insert(relation.name.clone(), value);
        }
        Ok(serde_json::Value::Object(object))
    }

    /// Load a graph from JSON shaped `{ "Entity": [ { "field": value,
    /// "relation": id | [ids] } ] }`.
    ///
    /// Keys may be property names or storage column names. Relationship
    /// references are resolved by identity after all rows are loaded.
    pub fn from_json(metadata: &dyn MetadataProvider, json: &str) -> Result<Self, Error> {
        let document: HashMap<String, Vec<serde_json::Map<String, serde_json::Value>>> =
            serde_json::from_str(json).map_err(|e| Error::Deserialization(e.to_string()))?;

        let mut graph = Self::new();
        let mut references = Vec::new();
        let mut identities: HashMap<(String, String), usize> = HashMap::new();

        let mut entities: Vec<&String> = document.keys().collect();
        entities.sort();
        for entity in entities {
            let def = metadata.entity(entity)?;
            let conventions = metadata.conventions(entity)?;

            for object in &document[entity] {
                let mut fields = Vec::new();
                let mut raw_identity = HashMap::new();
                let index = graph.rows(entity).len();

                for (key, json_value) in object {
                    let name = if metadata.has_property(entity, key) {
                        key.clone()
                    } else {
                        conventions.convert_storage_to_entity_key(key)
                    };
                    let value = Value::from_json(json_value.clone())?;
                    if def.identity_fields.contains(&name) {
                        raw_identity.insert(name.clone(), value.clone());
                    }

                    match &metadata.property(entity, &name)?.kind {
                        PropertyKind::Field(_) => fields.push((name, value)),
                        PropertyKind::Relation(relation) => {
                            let targets = match (relation.is_to_many(), value) {
                                (_, Value::Null) => Vec::new(),
                                (true, Value::List(ids)) => ids,
                                (true, other) => {
                                    return Err(Error::InvalidArgument(format!(
                                        "`{entity}.{name}` expects a list of identities, got {other}"
                                    )))
                                }
                                (false, id) => vec![id],
                            };
                            references.push((entity.clone(), index, name, targets));
                        }
                    }
                }

                let identity = match def.identity_fields.as_slice() {
                    [single] => raw_identity.remove(single).unwrap_or(Value::Null),
                    composite => Value::List(
                        composite
                            .iter()
                            .map(|name| raw_identity.remove(name).unwrap_or(Value::Null))
                            .collect(),
                    ),
                };
                identities.insert((entity.clone(), identity.to_string()), index);
                graph.insert(entity, fields);
            }
        }

        for (entity, row, relation, targets) in references {
            let property = metadata.property(&entity, &relation)?;
            let target_entity = property
                .relationship()
                .map(|r| r.to_entity.clone())
                .ok_or_else(|| Error::InvalidState(format!("`{relation}` is not a relationship")))?;
            for id in targets {
                let target = identities
                    .get(&(target_entity.clone(), id.to_string()))
                    .copied()
                    .ok_or_else(|| {
                        Error::InvalidArgument(format!(
                            "`{entity}.{relation}` references missing {target_entity} {id}"
                        ))
                    })?;
                graph.link(metadata, &entity, row, &relation, target)?;
            }
        }

        debug!(
            entities = graph.sets.len(),
            rows = graph.sets.values().map(Vec::len).sum::<usize>(),
            "loaded entity graph"
        );
        Ok(graph)
    }
}
