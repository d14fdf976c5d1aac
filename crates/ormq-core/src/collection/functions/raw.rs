//! Raw SQL predicates.

use ormq_proto::{Aggregator, Value};

use super::CollectionFunction;
use crate::collection::array_helper::ArrayHelper;
use crate::collection::context::ExpressionContext;
use crate::collection::result::{ArrayExpressionResult, QueryParam, SqlExpressionResult};
use crate::collection::sql_helper::SqlHelper;
use crate::error::Error;

/// A SQL predicate passed through verbatim, with `?` placeholders.
///
/// Column references must use the query's table aliases. Only the SQL
/// backend can evaluate it.
#[derive(Debug)]
pub struct RawSql<'a> {
    sql: &'a str,
    args: &'a [Value],
}

impl<'a> RawSql<'a> {
    /// Fails when the placeholder count does not match `args`.
    pub fn new(sql: &'a str, args: &'a [Value]) -> Result<Self, Error> {
        let placeholders = sql.matches('?').count();
        if placeholders != args.len() {
            return Err(Error::InvalidArgument(format!(
                "raw SQL `{sql}` has {placeholders} placeholders but {} arguments",
                args.len()
            )));
        }
        Ok(Self { sql, args })
    }
}

impl CollectionFunction for RawSql<'_> {
    fn process_array(
        &self,
        _helper: &ArrayHelper<'_>,
        _row: usize,
        _aggregator: Option<&Aggregator>,
    ) -> Result<ArrayExpressionResult, Error> {
        Err(Error::NotSupported {
            function: "raw_sql".into(),
            backend: "array",
        })
    }

    fn process_sql(
        &self,
        _helper: &mut SqlHelper<'_>,
        _context: ExpressionContext,
        _aggregator: Option<&Aggregator>,
    ) -> Result<SqlExpressionResult, Error> {
        let args = self.args.iter().cloned().map(QueryParam::new).collect();
        Ok(SqlExpressionResult::new(self.sql, args))
    }
}
