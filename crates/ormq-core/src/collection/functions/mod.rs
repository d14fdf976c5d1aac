//! Collection functions.
//!
//! A filter's condition tree is compiled once into a tree of [`Function`]s,
//! which is then evaluated per row by the array backend or rendered once by
//! the SQL backend.

mod aggregate;
mod compare;
mod fetch;
mod junction;
mod like;
mod raw;

pub use aggregate::Aggregate;
pub use compare::Compare;
pub use fetch::Fetch;
pub use junction::Junction;
pub use like::{like_match, like_pattern, Like};
pub use raw::RawSql;

use std::cell::Cell;

use ormq_proto::{Aggregator, Condition, FunctionCall, KeyOperator, LikeMode, ValueExpression};

use super::array_helper::ArrayHelper;
use super::context::ExpressionContext;
use super::path::ResolvedPath;
use super::result::{ArrayExpressionResult, SqlExpressionResult};
use super::sql_helper::SqlHelper;
use crate::catalog::MetadataProvider;
use crate::config::CollectionConfig;
use crate::error::Error;

/// A function evaluable by both collection backends.
///
/// `aggregator` is the aggregator inherited from the enclosing groups; it
/// applies to property reads that cross a to-many relationship.
pub trait CollectionFunction {
    /// Evaluate against one in-memory row.
    fn process_array(
        &self,
        helper: &ArrayHelper<'_>,
        row: usize,
        aggregator: Option<&Aggregator>,
    ) -> Result<ArrayExpressionResult, Error>;

    /// Compile into a SQL expression for `context`.
    fn process_sql(
        &self,
        helper: &mut SqlHelper<'_>,
        context: ExpressionContext,
        aggregator: Option<&Aggregator>,
    ) -> Result<SqlExpressionResult, Error>;
}

/// What property paths are resolved against while compiling.
///
/// Also numbers the property reads of one filter; SQL compilation gives each
/// numbered read that crosses a to-many relationship joins of its own.
pub struct CompileScope<'s> {
    pub metadata: &'s dyn MetadataProvider,
    pub entity: &'s str,
    pub config: &'s CollectionConfig,
    sites: Cell<usize>,
}

impl<'s> CompileScope<'s> {
    pub fn new(
        metadata: &'s dyn MetadataProvider,
        entity: &'s str,
        config: &'s CollectionConfig,
    ) -> Self {
        Self {
            metadata,
            entity,
            config,
            sites: Cell::new(0),
        }
    }

    fn resolve(&self, path: &str) -> Result<ResolvedPath, Error> {
        ResolvedPath::resolve(self.metadata, self.entity, path, self.config)
    }

    fn next_site(&self) -> usize {
        let site = self.sites.get();
        self.sites.set(site + 1);
        site
    }

    fn fetch(&self, path: &str) -> Result<Fetch, Error> {
        Ok(Fetch::new(self.resolve(path)?, self.next_site()))
    }
}

/// A compiled collection function.
#[derive(Debug)]
pub enum Function<'a> {
    Fetch(Fetch),
    Aggregate(Aggregate),
    Compare(Compare<'a>),
    Like(Like<'a>),
    Junction(Junction<'a>),
    RawSql(RawSql<'a>),
}

impl<'a> Function<'a> {
    /// Compile a condition. Unknown properties fail here, before any row is read.
    pub fn compile(condition: &'a Condition, scope: &CompileScope<'_>) -> Result<Self, Error> {
        match condition {
            Condition::Pair { key, value } => {
                let (path, operator) = Condition::parse_key(key)?;
                let lhs = Function::Fetch(scope.fetch(path)?);
                match operator {
                    KeyOperator::Compare(operator) => {
                        Compare::new(lhs, operator, value).map(Function::Compare)
                    }
                    KeyOperator::Like => {
                        let pattern = value.as_str().ok_or_else(|| {
                            Error::InvalidArgument(format!(
                                "LIKE condition `{key}` needs a string pattern, got {value}"
                            ))
                        })?;
                        Ok(Function::Like(Like::new(lhs, LikeMode::Raw, pattern)))
                    }
                }
            }
            Condition::Call(FunctionCall::Compare {
                expression,
                operator,
                value,
            }) => Compare::new(Self::compile_value(expression, scope)?, *operator, value)
                .map(Function::Compare),
            Condition::Call(FunctionCall::Like {
                expression,
                mode,
                pattern,
            }) => Ok(Function::Like(Like::new(
                Self::compile_value(expression, scope)?,
                *mode,
                pattern,
            ))),
            Condition::Call(FunctionCall::RawSql { sql, args }) => {
                RawSql::new(sql, args).map(Function::RawSql)
            }
            Condition::Group(group) => Junction::compile(group, scope).map(Function::Junction),
        }
    }

    /// Compile a value expression.
    pub fn compile_value(
        expression: &ValueExpression,
        scope: &CompileScope<'_>,
    ) -> Result<Self, Error> {
        match expression {
            ValueExpression::Property(path) => Ok(Function::Fetch(scope.fetch(path)?)),
            ValueExpression::Aggregate { function, path } => {
                Aggregate::new(*function, scope.resolve(path)?, scope.next_site())
                    .map(Function::Aggregate)
            }
        }
    }

    /// Compile an ordering key, which must yield one value per row.
    pub fn compile_order_key(
        expression: &ValueExpression,
        scope: &CompileScope<'_>,
    ) -> Result<Self, Error> {
        let function = Self::compile_value(expression, scope)?;
        if let Function::Fetch(fetch) = &function {
            if fetch.path().is_to_many() {
                return Err(Error::InvalidArgument(format!(
                    "cannot order by `{}`: it crosses a to-many relationship, use an aggregate function",
                    fetch.path().as_str()
                )));
            }
        }
        Ok(function)
    }

    fn as_dyn(&self) -> &dyn CollectionFunction {
        match self {
            Function::Fetch(f) => f,
            Function::Aggregate(f) => f,
            Function::Compare(f) => f,
            Function::Like(f) => f,
            Function::Junction(f) => f,
            Function::RawSql(f) => f,
        }
    }
}

impl CollectionFunction for Function<'_> {
    fn process_array(
        &self,
        helper: &ArrayHelper<'_>,
        row: usize,
        aggregator: Option<&Aggregator>,
    ) -> Result<ArrayExpressionResult, Error> {
        self.as_dyn().process_array(helper, row, aggregator)
    }

    fn process_sql(
        &self,
        helper: &mut SqlHelper<'_>,
        context: ExpressionContext,
        aggregator: Option<&Aggregator>,
    ) -> Result<SqlExpressionResult, Error> {
        self.as_dyn().process_sql(helper, context, aggregator)
    }
}

/// Whether an array result selects its row, applying a pending aggregator.
pub fn is_truthy(result: &ArrayExpressionResult) -> Result<bool, Error> {
    Ok(match &result.aggregator {
        Some(aggregator) => aggregator
            .aggregate_array_values(result.fan_out()?)
            .is_truthy(),
        None => result.value.is_truthy(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::fixtures;
    use ormq_proto::{FindFilter, Value};

    #[test]
    fn test_compile_shorthand_pairs() {
        let catalog = fixtures::catalog();
        let config = CollectionConfig::default();
        let scope = CompileScope::new(&catalog, "Book", &config);

        let condition = Condition::pair("title~", "D%");
        assert!(matches!(
            Function::compile(&condition, &scope).unwrap(),
            Function::Like(_)
        ));

        let condition = Condition::pair("pages>=", 300);
        assert!(matches!(
            Function::compile(&condition, &scope).unwrap(),
            Function::Compare(_)
        ));

        let condition = Condition::pair("title~", 3);
        assert!(matches!(
            Function::compile(&condition, &scope),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_compile_fails_fast_on_unknown_property() {
        let catalog = fixtures::catalog();
        let config = CollectionConfig::default();
        let scope = CompileScope::new(&catalog, "Book", &config);

        let condition = FindFilter::default()
            .eq("title", "Dune")
            .eq("author->nickname", "x")
            .to_condition()
            .unwrap();

        assert!(matches!(
            Function::compile(&condition, &scope),
            Err(Error::UnknownProperty { entity, property })
                if entity == "Author" && property == "nickname"
        ));
    }

    #[test]
    fn test_order_key_rejects_to_many_values() {
        let catalog = fixtures::catalog();
        let config = CollectionConfig::default();
        let scope = CompileScope::new(&catalog, "Author", &config);

        assert!(Function::compile_order_key(&ValueExpression::property("name"), &scope).is_ok());
        assert!(Function::compile_order_key(&ValueExpression::count("books->id"), &scope).is_ok());
        assert!(matches!(
            Function::compile_order_key(&ValueExpression::property("books->title"), &scope),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_is_truthy_applies_pending_aggregator() {
        let pending = ArrayExpressionResult::new(Value::list([false, true]))
            .with_aggregator(Aggregator::none());
        assert!(!is_truthy(&pending).unwrap());

        assert!(is_truthy(&ArrayExpressionResult::new(Value::Bool(true))).unwrap());
    }
}
