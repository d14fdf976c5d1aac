//! Array collection backend: evaluates filters over an in-memory entity graph.

use std::cmp::Ordering;

use ormq_proto::{Filter, OrderDirection, Value};
use tracing::{debug, instrument};

use super::array_helper::ArrayHelper;
use super::functions::{is_truthy, CollectionFunction, CompileScope, Function};
use super::graph::{EntityGraph, EntityRow};
use crate::catalog::MetadataProvider;
use crate::config::CollectionConfig;
use crate::error::Error;

/// Filters, orders and limits the rows of one entity set.
pub struct ArrayCollection<'a> {
    metadata: &'a dyn MetadataProvider,
    graph: &'a EntityGraph,
    entity: &'a str,
    config: CollectionConfig,
}

impl<'a> ArrayCollection<'a> {
    /// Fails if the entity is unknown.
    pub fn new(
        metadata: &'a dyn MetadataProvider,
        graph: &'a EntityGraph,
        entity: &'a str,
    ) -> Result<Self, Error> {
        metadata.entity(entity)?;
        Ok(Self {
            metadata,
            graph,
            entity,
            config: CollectionConfig::default(),
        })
    }

    pub fn with_config(mut self, config: CollectionConfig) -> Self {
        self.config = config;
        self
    }

    /// Row indices matching `filter`, in result order.
    ///
    /// Ordering is a stable sort with nulls first; offset and limit apply
    /// after the full sort.
    #[instrument(skip_all, fields(entity = %self.entity))]
    pub fn fetch_indices(&self, filter: &Filter) -> Result<Vec<usize>, Error> {
        let scope = CompileScope::new(self.metadata, self.entity, &self.config);
        let condition = filter.condition();
        let function = condition
            .as_ref()
            .map(|condition| Function::compile(condition, &scope))
            .transpose()?;
        let order = filter
            .order_filter()
            .entries()
            .iter()
            .map(|entry| {
                Function::compile_order_key(&entry.expression, &scope)
                    .map(|function| (function, entry.direction))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let helper = ArrayHelper::new(self.metadata, self.graph, self.entity, &self.config);
        let total = self.graph.rows(self.entity).len();
        let mut selected: Vec<(usize, Vec<Value>)> = Vec::new();
        for row in 0..total {
            if let Some(function) = &function {
                if !is_truthy(&function.process_array(&helper, row, None)?)? {
                    continue;
                }
            }
            let keys = order
                .iter()
                .map(|(function, _)| function.process_array(&helper, row, None).map(|r| r.value))
                .collect::<Result<Vec<_>, _>>()?;
            selected.push((row, keys));
        }

        if !order.is_empty() {
            selected.sort_by(|(_, a), (_, b)| {
                for ((x, y), (_, direction)) in a.iter().zip(b).zip(&order) {
                    let ordering = match direction {
                        OrderDirection::Asc => x.sort_cmp(y),
                        OrderDirection::Desc => x.sort_cmp(y).reverse(),
                    };
                    if ordering != Ordering::Equal {
                        return ordering;
                    }
                }
                Ordering::Equal
            });
        }

        let matched = selected.len();
        let limit = filter
            .limit_spec()
            .map(|limit| (limit.count, limit.offset.unwrap_or(0)))
            .or_else(|| self.config.default_limit.map(|count| (count, 0)));
        let rows: Vec<usize> = match limit {
            Some((count, offset)) => selected
                .into_iter()
                .skip(offset as usize)
                .take(count as usize)
                .map(|(row, _)| row)
                .collect(),
            None => selected.into_iter().map(|(row, _)| row).collect(),
        };

        debug!(total, matched, returned = rows.len(), "evaluated collection filter");
        Ok(rows)
    }

    /// Rows matching `filter`, in result order.
    pub fn fetch(&self, filter: &Filter) -> Result<Vec<&'a EntityRow>, Error> {
        let rows = self.graph.rows(self.entity);
        Ok(self
            .fetch_indices(filter)?
            .into_iter()
            .filter_map(|index| rows.get(index))
            .collect())
    }

    /// Rows matching `filter` rendered as JSON objects.
    pub fn fetch_json(&self, filter: &Filter) -> Result<Vec<serde_json::Value>, Error> {
        self.fetch_indices(filter)?
            .into_iter()
            .map(|index| self.graph.row_to_json(self.metadata, self.entity, index))
            .collect()
    }
}
