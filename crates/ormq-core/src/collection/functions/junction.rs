//! AND / OR junctions.

use ormq_proto::{Aggregator, Group, LogicalOperator, Value};
use tracing::trace;

use super::{is_truthy, CollectionFunction, CompileScope, Function};
use crate::collection::array_helper::ArrayHelper;
use crate::collection::context::ExpressionContext;
use crate::collection::result::{ArrayExpressionResult, SqlExpressionResult};
use crate::collection::sql_helper::SqlHelper;
use crate::error::Error;

/// A logical group of functions.
///
/// The group's aggregator, if any, replaces the inherited one for every
/// descendant. An empty AND is true and an empty OR is false.
#[derive(Debug)]
pub struct Junction<'a> {
    operator: LogicalOperator,
    aggregator: Option<&'a Aggregator>,
    children: Vec<Function<'a>>,
}

impl<'a> Junction<'a> {
    pub fn compile(group: &'a Group, scope: &CompileScope<'_>) -> Result<Self, Error> {
        if let Some(aggregator) = &group.aggregator {
            if !aggregator.is_boolean() {
                return Err(Error::InvalidArgument(format!(
                    "group aggregator `{}` must yield a boolean",
                    aggregator.aggregate_key()
                )));
            }
        }

        let children = group
            .conditions
            .iter()
            .map(|condition| Function::compile(condition, scope))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            operator: group.operator,
            aggregator: group.aggregator.as_ref(),
            children,
        })
    }

    fn compile_children(
        &self,
        helper: &mut SqlHelper<'_>,
        context: ExpressionContext,
        aggregator: Option<&Aggregator>,
    ) -> Result<Vec<SqlExpressionResult>, Error> {
        self.children
            .iter()
            .map(|child| child.process_sql(helper, context, aggregator))
            .collect()
    }

    fn combine(&self, mut parts: Vec<SqlExpressionResult>) -> Result<SqlExpressionResult, Error> {
        let (glue, identity) = match self.operator {
            LogicalOperator::And => (" AND ", "1=1"),
            LogicalOperator::Or => (" OR ", "1=0"),
        };
        if parts.len() < 2 {
            return Ok(parts
                .pop()
                .unwrap_or_else(|| SqlExpressionResult::new(identity, Vec::new())));
        }

        let mut expressions = Vec::with_capacity(parts.len());
        let mut args = Vec::new();
        let mut joins = Vec::new();
        let mut group_by = Vec::new();
        let mut having = false;
        for part in parts {
            having |= part.is_having_clause();
            expressions.push(format!("({})", part.expression));
            args.extend(part.args);
            joins.extend(part.joins);
            group_by.extend(part.group_by);
        }

        SqlExpressionResult::new(expressions.join(glue), args)
            .with_joins(joins)
            .with_group_by(group_by)
            .with_aggregation(None, having)
    }
}

impl CollectionFunction for Junction<'_> {
    fn process_array(
        &self,
        helper: &ArrayHelper<'_>,
        row: usize,
        aggregator: Option<&Aggregator>,
    ) -> Result<ArrayExpressionResult, Error> {
        let aggregator = self.aggregator.or(aggregator);
        let conjunction = self.operator == LogicalOperator::And;

        for child in &self.children {
            let matched = is_truthy(&child.process_array(helper, row, aggregator)?)?;
            if matched != conjunction {
                return Ok(ArrayExpressionResult::new(Value::Bool(matched)));
            }
        }
        Ok(ArrayExpressionResult::new(Value::Bool(conjunction)))
    }

    fn process_sql(
        &self,
        helper: &mut SqlHelper<'_>,
        context: ExpressionContext,
        aggregator: Option<&Aggregator>,
    ) -> Result<SqlExpressionResult, Error> {
        let aggregator = self.aggregator.or(aggregator);

        let parts = match self.operator {
            LogicalOperator::Or => {
                self.compile_children(helper, ExpressionContext::FilterOr, aggregator)?
            }
            LogicalOperator::And => {
                let inner = context.for_conjunction();
                let parts = self.compile_children(helper, inner, aggregator)?;
                if inner == ExpressionContext::FilterAnd
                    && parts.iter().any(SqlExpressionResult::is_having_clause)
                {
                    trace!("conjunction mixes row and group predicates, moving it to HAVING");
                    self.compile_children(
                        helper,
                        ExpressionContext::FilterAndWithHavingClause,
                        aggregator,
                    )?
                } else {
                    parts
                }
            }
        };

        self.combine(parts)
    }
}
