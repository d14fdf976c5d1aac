//! SQL collection backend.

use ormq_proto::{Filter, Limit};
use tracing::{debug, instrument};

use super::builder::{SqlQuery, SqlQueryBuilder};
use super::context::ExpressionContext;
use super::functions::{CollectionFunction, CompileScope, Function};
use super::join::merge_joins;
use super::sql_helper::SqlHelper;
use crate::catalog::MetadataProvider;
use crate::config::CollectionConfig;
use crate::error::Error;

/// Compiles filters on one entity into SELECT statements.
pub struct SqlCollection<'a> {
    metadata: &'a dyn MetadataProvider,
    entity: &'a str,
    config: CollectionConfig,
}

impl<'a> SqlCollection<'a> {
    /// Fails if the entity is unknown.
    pub fn new(metadata: &'a dyn MetadataProvider, entity: &'a str) -> Result<Self, Error> {
        metadata.entity(entity)?;
        Ok(Self {
            metadata,
            entity,
            config: CollectionConfig::default(),
        })
    }

    pub fn with_config(mut self, config: CollectionConfig) -> Self {
        self.config = config;
        self
    }

    /// Compile `filter` into a query builder.
    ///
    /// The condition tree is compiled in AND context; a having-clause result
    /// becomes the HAVING predicate, anything else the WHERE predicate. Joins
    /// past a to-many relationship repeat root rows, so the query is then
    /// either grouped, when it has a HAVING predicate or an ordering, or
    /// DISTINCT. A grouped query groups by the root primary key plus the
    /// non-aggregated columns its HAVING and ORDER BY clauses reference.
    #[instrument(skip_all, fields(entity = %self.entity))]
    pub fn build_query(&self, filter: &Filter) -> Result<SqlQueryBuilder, Error> {
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

        let mut helper = SqlHelper::new(self.metadata, self.entity, &self.config)?;
        let predicate = function
            .map(|function| function.process_sql(&mut helper, ExpressionContext::FilterAnd, None))
            .transpose()?;
        let order = order
            .into_iter()
            .map(|(function, direction)| {
                function
                    .process_sql(&mut helper, ExpressionContext::ValueExpression, None)
                    .map(|result| (result, direction))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let joins = merge_joins(
            predicate
                .iter()
                .flat_map(|p| p.joins.iter().cloned())
                .chain(order.iter().flat_map(|(result, _)| result.joins.iter().cloned())),
        )?;

        let having = predicate.as_ref().is_some_and(|p| p.is_having_clause());
        let repeats_rows = joins.iter().any(|join| join.to_many);
        let grouped = having || (repeats_rows && !order.is_empty());
        let distinct = repeats_rows && !grouped;

        let mut builder = SqlQueryBuilder::new(helper.root_alias(), helper.root_alias())
            .with_distinct(distinct)
            .with_joins(joins);

        if let Some(predicate) = &predicate {
            builder = if having {
                builder.with_having(&predicate.expression, predicate.args.clone())
            } else {
                builder.with_where(&predicate.expression, predicate.args.clone())
            };
        }

        if grouped {
            let having_columns = predicate
                .iter()
                .filter(|_| having)
                .flat_map(|predicate| predicate.group_by.iter().cloned());
            let order_columns = order
                .iter()
                .flat_map(|(result, _)| result.group_by.iter().cloned());
            builder = builder.with_group_by(
                helper
                    .root_primary_key()
                    .into_iter()
                    .chain(having_columns)
                    .chain(order_columns),
            );
        }

        for (result, direction) in &order {
            if result.columns.is_empty() {
                builder = builder.with_order_by(&result.expression, result.args.clone(), *direction);
            } else {
                for column in &result.columns {
                    builder = builder.with_order_by(column, Vec::new(), *direction);
                }
            }
        }

        let limit = filter.limit_spec().or_else(|| {
            self.config
                .default_limit
                .map(|count| Limit { count, offset: None })
        });
        builder = builder.with_limit(limit);

        debug!(
            joins = builder.joins().len(),
            has_where = builder.where_sql().is_some(),
            has_having = builder.having_sql().is_some(),
            grouped,
            distinct,
            "compiled collection query"
        );
        Ok(builder)
    }

    /// Compile and render `filter`.
    pub fn to_sql(&self, filter: &Filter) -> Result<SqlQuery, Error> {
        Ok(self.build_query(filter)?.build())
    }
}
