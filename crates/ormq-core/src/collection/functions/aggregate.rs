//! Numeric aggregate value functions: COUNT, SUM, AVG, MIN, MAX.

use ormq_proto::{Aggregator, NumericFunction};

use super::CollectionFunction;
use crate::collection::aggregator::SqlAggregator;
use crate::collection::array_helper::ArrayHelper;
use crate::collection::context::ExpressionContext;
use crate::collection::path::ResolvedPath;
use crate::collection::result::{ArrayExpressionResult, SqlExpressionResult};
use crate::collection::sql_helper::SqlHelper;
use crate::error::Error;

/// Reduces the values of a to-many property path to one number.
///
/// Uses its own aggregator; aggregators inherited from groups do not apply.
/// In SQL the reduction is a correlated subquery, a plain value usable in
/// WHERE and ORDER BY alike.
#[derive(Debug, Clone)]
pub struct Aggregate {
    function: NumericFunction,
    path: ResolvedPath,
    site: usize,
}

impl Aggregate {
    /// Fails unless `path` crosses a to-many relationship.
    pub fn new(function: NumericFunction, path: ResolvedPath, site: usize) -> Result<Self, Error> {
        if !path.is_to_many() {
            return Err(Error::InvalidArgument(format!(
                "{}(`{}`) needs a path crossing a to-many relationship",
                function.sql_name(),
                path.as_str()
            )));
        }
        Ok(Self {
            function,
            path,
            site,
        })
    }

    fn aggregator(&self) -> Aggregator {
        Aggregator::numeric(self.function)
    }
}

impl CollectionFunction for Aggregate {
    fn process_array(
        &self,
        helper: &ArrayHelper<'_>,
        row: usize,
        _aggregator: Option<&Aggregator>,
    ) -> Result<ArrayExpressionResult, Error> {
        let aggregator = self.aggregator();
        let values = helper.fetch(row, &self.path, Some(&aggregator))?;
        Ok(ArrayExpressionResult::new(
            aggregator.aggregate_array_values(values.fan_out()?),
        ))
    }

    fn process_sql(
        &self,
        helper: &mut SqlHelper<'_>,
        _context: ExpressionContext,
        _aggregator: Option<&Aggregator>,
    ) -> Result<SqlExpressionResult, Error> {
        let aggregator = self.aggregator();
        let column = helper.fetch(&self.path, Some(&aggregator), self.site)?;
        let mut result =
            aggregator.aggregate_expression(column, ExpressionContext::ValueExpression)?;
        // Only COUNT of an empty group is not NULL.
        result.nullable = self.function != NumericFunction::Count;
        Ok(result)
    }
}
