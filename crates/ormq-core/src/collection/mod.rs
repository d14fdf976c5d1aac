//! Collection query engine.
//!
//! Filters are compiled into [`functions::Function`] trees and evaluated by
//! the array backend ([`ArrayCollection`]) or rendered by the SQL backend
//! ([`SqlCollection`]).

pub mod aggregator;
pub mod array;
pub mod array_helper;
pub mod builder;
pub mod context;
pub mod functions;
pub mod graph;
pub mod join;
pub mod path;
pub mod result;
pub mod sql;
pub mod sql_helper;

#[cfg(test)]
pub(crate) mod fixtures;

pub use aggregator::SqlAggregator;
pub use array::ArrayCollection;
pub use array_helper::ArrayHelper;
pub use builder::{SqlQuery, SqlQueryBuilder};
pub use context::ExpressionContext;
pub use functions::{CollectionFunction, CompileScope, Function};
pub use graph::{EntityGraph, EntityRow};
pub use join::{merge_joins, JoinRegistry, TableJoin};
pub use path::ResolvedPath;
pub use result::{ArrayExpressionResult, ParamType, QueryParam, SqlExpressionResult, ValueNormalizer};
pub use sql::SqlCollection;
pub use sql_helper::SqlHelper;
