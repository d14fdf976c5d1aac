//! SQL rewriting of aggregators.
//!
//! The array-mode reductions live on [`Aggregator`] itself; this module adds
//! the query-builder side.

use ormq_proto::{Aggregator, NumericFunction};
use tracing::trace;

use super::context::ExpressionContext;
use super::join::TableJoin;
use super::result::SqlExpressionResult;
use crate::error::Error;

/// Applies an aggregator to a compiled SQL expression.
pub trait SqlAggregator {
    /// Rewrite `expression`, which crosses a to-many relationship, into its
    /// aggregated form for `context`.
    fn aggregate_expression(
        &self,
        expression: SqlExpressionResult,
        context: ExpressionContext,
    ) -> Result<SqlExpressionResult, Error>;
}

impl SqlAggregator for Aggregator {
    fn aggregate_expression(
        &self,
        expression: SqlExpressionResult,
        context: ExpressionContext,
    ) -> Result<SqlExpressionResult, Error> {
        if self.is_boolean() && context == ExpressionContext::ValueExpression {
            return Err(Error::InvalidArgument(format!(
                "aggregator `{}` yields a boolean and cannot be used as a value",
                self.aggregate_key()
            )));
        }

        match self {
            Aggregator::Any { .. } if context.allows_join_filtering() => {
                filter_joined_rows(expression)
            }
            Aggregator::Any { .. } => fold(expression, |count| format!("{count} > 0")),
            Aggregator::None { .. } => fold(expression, |count| format!("{count} = 0")),
            Aggregator::Count {
                at_least, at_most, ..
            } => fold(expression, |count| {
                let bounds: Vec<String> = [(">=", *at_least), ("<=", *at_most)]
                    .into_iter()
                    .filter_map(|(op, bound)| bound.map(|b| format!("{count} {op} {b}")))
                    .collect();
                bounds.join(" AND ")
            }),
            Aggregator::Numeric { function, .. } => correlated_subquery(*function, expression),
        }
    }
}

/// Keep the row-level filter on the joined rows. The synthetic NULL row of a
/// LEFT JOIN without matches must not satisfy NULL-matching predicates.
fn filter_joined_rows(expression: SqlExpressionResult) -> Result<SqlExpressionResult, Error> {
    let join = trailing_join(&expression)?;
    let sql = format!("({}) AND {} IS NOT NULL", expression.expression, join.primary_key()?);
    expression
        .with_args(sql, expression.args.clone())
        .with_aggregation(None, false)
}

/// Move the filter into the trailing join's predicate and count the distinct
/// joined rows. Rows repeated by other to-many joins count once.
fn fold(
    expression: SqlExpressionResult,
    having: impl FnOnce(&str) -> String,
) -> Result<SqlExpressionResult, Error> {
    let mut joins = expression.joins.clone();
    let join = joins.pop().ok_or_else(|| missing_join(&expression))?;
    let count = format!("COUNT(DISTINCT {})", join.primary_key()?);

    let mut on_args = join.on_args.clone();
    on_args.extend(expression.args.iter().cloned());
    let on_expression = format!("({}) AND ({})", join.on_expression, expression.expression);
    trace!(alias = %join.to_alias, "folded filter into join predicate");
    joins.push(TableJoin {
        on_expression,
        on_args,
        ..join
    });

    expression
        .with_args(having(&count), Vec::new())
        .with_joins(joins)
        .with_aggregation(None, true)
}

/// Reduce the to-many part of `expression` in a correlated scalar subquery.
///
/// The subquery reads the joins past the first to-many relationship; joins
/// before it stay in the outer query. When more than one relationship is
/// crossed, each reached row is reduced once however many paths lead to it.
fn correlated_subquery(
    function: NumericFunction,
    expression: SqlExpressionResult,
) -> Result<SqlExpressionResult, Error> {
    let (outer, chain): (Vec<TableJoin>, Vec<TableJoin>) =
        expression.joins.iter().cloned().partition(|join| !join.to_many);
    let (first, rest) = chain.split_first().ok_or_else(|| missing_join(&expression))?;

    let mut from = format!("{} AS {}", first.to_expression, first.to_alias);
    let mut from_args = first.to_args.clone();
    for join in rest {
        from = format!("{from} {}", join.to_sql());
        from_args.extend(join.args().cloned());
    }

    let reduced = format!("{}({})", function.sql_name(), expression.expression);
    let mut args = expression.args.clone();
    let hops = chain.iter().filter(|join| join.to_primary_key.is_some()).count();
    let sql = match chain.last() {
        Some(last) if hops > 1 => {
            let key = last.primary_key()?;
            args.extend(last.to_args.iter().cloned());
            args.extend(from_args);
            args.extend(first.on_args.iter().cloned());
            format!(
                "(SELECT {reduced} FROM {} AS {} WHERE {key} IN (SELECT {key} FROM {from} WHERE {}))",
                last.to_expression, last.to_alias, first.on_expression
            )
        }
        _ => {
            args.extend(from_args);
            args.extend(first.on_args.iter().cloned());
            format!("(SELECT {reduced} FROM {from} WHERE {})", first.on_expression)
        }
    };
    trace!(alias = %first.to_alias, "reduced to-many values in a subquery");

    // The subquery correlates with the last outer join, if any.
    let group_by = outer
        .last()
        .and_then(|join| join.to_primary_key.clone())
        .into_iter()
        .collect();
    Ok(SqlExpressionResult::new(sql, args)
        .with_joins(outer)
        .with_group_by(group_by))
}

fn trailing_join(expression: &SqlExpressionResult) -> Result<&TableJoin, Error> {
    expression.joins.last().ok_or_else(|| missing_join(expression))
}

fn missing_join(expression: &SqlExpressionResult) -> Error {
    Error::InvalidArgument(format!(
        "aggregation over `{}` requires a to-many relationship join",
        expression.expression
    ))
}
