//! Table joins and their per-evaluation registry.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::trace;

use super::result::QueryParam;
use crate::catalog::StorageReflection;
use crate::error::Error;

/// A LEFT JOIN required by an expression.
///
/// Joins are always LEFT joins so that rows without related rows reach the
/// filter as NULLs instead of disappearing.
#[derive(Clone)]
pub struct TableJoin {
    /// Joined table or subquery.
    pub to_expression: String,
    /// Parameters of `to_expression`.
    pub to_args: Vec<QueryParam>,
    /// Alias, unique per join site.
    pub to_alias: String,
    /// Join predicate.
    pub on_expression: String,
    /// Parameters of `on_expression`.
    pub on_args: Vec<QueryParam>,
    /// Qualified primary key column of the joined table, consumed by aggregators.
    pub to_primary_key: Option<String>,
    /// Whether the join is reached through a to-many relationship and can
    /// repeat the rows of the tables before it.
    pub to_many: bool,
    /// Storage reflection of the joined entity.
    pub conventions: Arc<dyn StorageReflection>,
}

impl TableJoin {
    /// Render the join clause.
    pub fn to_sql(&self) -> String {
        format!(
            "LEFT JOIN {} AS {} ON {}",
            self.to_expression, self.to_alias, self.on_expression
        )
    }

    /// Parameters in textual order.
    pub fn args(&self) -> impl Iterator<Item = &QueryParam> {
        self.to_args.iter().chain(self.on_args.iter())
    }

    /// The primary key, required by aggregators that count joined rows.
    pub fn primary_key(&self) -> Result<&str, Error> {
        self.to_primary_key.as_deref().ok_or_else(|| {
            Error::InvalidArgument(format!(
                "join `{}` has no primary key to aggregate over",
                self.to_alias
            ))
        })
    }

    fn same_target(&self, other: &TableJoin) -> bool {
        self.to_expression == other.to_expression
            && self.to_alias == other.to_alias
            && self.to_args == other.to_args
    }
}

impl fmt::Debug for TableJoin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableJoin")
            .field("to_expression", &self.to_expression)
            .field("to_alias", &self.to_alias)
            .field("on_expression", &self.on_expression)
            .field("on_args", &self.on_args)
            .field("to_primary_key", &self.to_primary_key)
            .field("to_many", &self.to_many)
            .finish_non_exhaustive()
    }
}

/// Joins built during one evaluation, keyed by relationship path and
/// join site key.
///
/// Reads of the same to-one path share one join. Past a to-many relationship
/// the site key names one aggregated property read, so every read gets
/// joins of its own.
#[derive(Debug, Default)]
pub struct JoinRegistry {
    joins: HashMap<(String, String), Vec<TableJoin>>,
}

impl JoinRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the joins for a relationship hop, building them on first use.
    pub fn get_or_try_insert_with(
        &mut self,
        path: &str,
        aggregation_key: Option<&str>,
        build: impl FnOnce() -> Result<Vec<TableJoin>, Error>,
    ) -> Result<Vec<TableJoin>, Error> {
        let key = (path.to_string(), aggregation_key.unwrap_or_default().to_string());
        if let Some(joins) = self.joins.get(&key) {
            return Ok(joins.clone());
        }
        let joins = build()?;
        self.joins.insert(key, joins.clone());
        Ok(joins)
    }

    /// Number of registered relationship hops.
    pub fn len(&self) -> usize {
        self.joins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joins.is_empty()
    }
}

/// Deduplicate joins by target and alias, keeping first-seen order.
///
/// Two joins with the same alias must be identical; a differing predicate
/// means two filters were compiled into one join site.
pub fn merge_joins(joins: impl IntoIterator<Item = TableJoin>) -> Result<Vec<TableJoin>, Error> {
    let mut merged: Vec<TableJoin> = Vec::new();
    for join in joins {
        let Some(index) = merged.iter().position(|existing| existing.same_target(&join)) else {
            merged.push(join);
            continue;
        };

        let existing = &merged[index];
        if existing.on_expression != join.on_expression || existing.on_args != join.on_args {
            return Err(Error::InvalidState(format!(
                "join `{}` is used with two different predicates: `{}` and `{}`",
                join.to_alias, existing.on_expression, join.on_expression
            )));
        }
        trace!(alias = %join.to_alias, "deduplicated join");
    }
    Ok(merged)
}
