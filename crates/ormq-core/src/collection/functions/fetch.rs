//! Property fetch.

use ormq_proto::Aggregator;

use super::CollectionFunction;
use crate::collection::array_helper::ArrayHelper;
use crate::collection::context::ExpressionContext;
use crate::collection::path::ResolvedPath;
use crate::collection::result::{ArrayExpressionResult, SqlExpressionResult};
use crate::collection::sql_helper::SqlHelper;
use crate::error::Error;

/// Reads a property path. Leaves a pending aggregator when the path crosses
/// a to-many relationship.
///
/// `site` numbers the read within its filter; reads with different sites
/// never share a to-many join.
#[derive(Debug, Clone)]
pub struct Fetch {
    path: ResolvedPath,
    site: usize,
}

impl Fetch {
    pub fn new(path: ResolvedPath, site: usize) -> Self {
        Self { path, site }
    }

    pub fn path(&self) -> &ResolvedPath {
        &self.path
    }
}

impl CollectionFunction for Fetch {
    fn process_array(
        &self,
        helper: &ArrayHelper<'_>,
        row: usize,
        aggregator: Option<&Aggregator>,
    ) -> Result<ArrayExpressionResult, Error> {
        helper.fetch(row, &self.path, aggregator)
    }

    fn process_sql(
        &self,
        helper: &mut SqlHelper<'_>,
        _context: ExpressionContext,
        aggregator: Option<&Aggregator>,
    ) -> Result<SqlExpressionResult, Error> {
        helper.fetch(&self.path, aggregator, self.site)
    }
}
