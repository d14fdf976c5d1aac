//! Property path evaluation over an in-memory entity graph.

use std::collections::HashSet;

use ormq_proto::{Aggregator, Value};

use super::graph::EntityGraph;
use super::path::ResolvedPath;
use super::result::ArrayExpressionResult;
use crate::catalog::{MetadataProvider, PropertyKind};
use crate::config::CollectionConfig;
use crate::error::Error;

/// Evaluates property paths for rows of one root entity.
pub struct ArrayHelper<'a> {
    metadata: &'a dyn MetadataProvider,
    graph: &'a EntityGraph,
    entity: &'a str,
    config: &'a CollectionConfig,
}

impl<'a> ArrayHelper<'a> {
    pub fn new(
        metadata: &'a dyn MetadataProvider,
        graph: &'a EntityGraph,
        entity: &'a str,
        config: &'a CollectionConfig,
    ) -> Self {
        Self {
            metadata,
            graph,
            entity,
            config,
        }
    }

    /// The root entity name.
    pub fn entity(&self) -> &str {
        self.entity
    }

    /// Read `path` for the root row `row`.
    ///
    /// Crossing a to-many relationship yields the list of reached values and
    /// an aggregator to fold them with: `aggregator` when given, the
    /// configured default otherwise. Every reached row contributes one value,
    /// however many paths lead to it.
    pub fn fetch(
        &self,
        row: usize,
        path: &ResolvedPath,
        aggregator: Option<&Aggregator>,
    ) -> Result<ArrayExpressionResult, Error> {
        let mut entity = self.entity.to_string();
        let mut rows = vec![row];

        for relation in path.hop_relations() {
            let relation = relation?;
            rows = self.follow(&entity, &rows, &relation.name);
            entity = relation.to_entity.clone();
        }

        let property = path.property();
        let values = match &property.kind {
            PropertyKind::Field(field) => self.field_values(&entity, &rows, &field.name),
            // Foreign keys are read per row, NULL when unset.
            PropertyKind::Relation(relation) if relation.has_foreign_key() => rows
                .iter()
                .map(|&index| {
                    let target = self
                        .graph
                        .row(&entity, index)
                        .and_then(|row| row.linked(&relation.name).first());
                    match target {
                        Some(&target) => {
                            self.graph.identity(self.metadata, &relation.to_entity, target)
                        }
                        None => Ok(Value::Null),
                    }
                })
                .collect::<Result<Vec<_>, _>>()?,
            PropertyKind::Relation(relation) => self
                .follow(&entity, &rows, &relation.name)
                .into_iter()
                .map(|target| self.graph.identity(self.metadata, &relation.to_entity, target))
                .collect::<Result<Vec<_>, _>>()?,
        };

        let mut result = if path.is_to_many() {
            ArrayExpressionResult::from_property(Value::List(values), property.clone())
                .with_aggregator(
                    aggregator
                        .cloned()
                        .unwrap_or_else(|| self.config.default_aggregator()),
                )
        } else {
            let value = values.into_iter().next().unwrap_or(Value::Null);
            ArrayExpressionResult::from_property(value, property.clone())
        };
        // Relationships compare by identity, not by a typed column.
        if property.relationship().is_some() {
            result.property = None;
        }
        Ok(result)
    }

    /// Rows reached over `relation`, each once, in first-seen order.
    fn follow(&self, entity: &str, rows: &[usize], relation: &str) -> Vec<usize> {
        let set = self.graph.rows(entity);
        let mut seen = HashSet::new();
        rows.iter()
            .filter_map(|&index| set.get(index))
            .flat_map(|row| row.linked(relation).iter().copied())
            .filter(|&target| seen.insert(target))
            .collect()
    }

    fn field_values(&self, entity: &str, rows: &[usize], field: &str) -> Vec<Value> {
        let set = self.graph.rows(entity);
        rows.iter()
            .filter_map(|&index| set.get(index))
            .map(|row| row.get(field).clone())
            .collect()
    }
}
