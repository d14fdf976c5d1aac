//! Filter IR for the ormq collection engine.
//!
//! This crate defines the backend-independent description of a collection
//! query: the condition tree built with [`FindFilter`], ordering built with
//! [`OrderFilter`], limits, and the [`Aggregator`]s that fold to-many
//! relationships into a single value.
//!
//! # Modules
//!
//! - [`value`] - Runtime values used in conditions and results
//! - [`aggregator`] - Aggregators and numeric aggregate functions
//! - [`filter`] - Condition tree, ordering and limit builders
//! - [`error`] - Protocol error types
//!
//! ```
//! use ormq_proto::{Aggregator, Filter};
//!
//! let filter = Filter::new()
//!     .find(|f| {
//!         f.eq("name", "Tolkien")
//!             .or_aggregated(Aggregator::any(), |g| g.starts_with("books->title", "The"))
//!     })
//!     .order(|o| o.desc("id"))
//!     .limit(10, None);
//!
//! assert!(filter.condition().is_some());
//! ```

pub mod aggregator;
pub mod error;
pub mod filter;
pub mod value;

pub use aggregator::{Aggregator, NumericFunction};
pub use error::Error;
pub use filter::{
    CompareOperator, Condition, Filter, FindFilter, FunctionCall, Group, KeyOperator, Limit,
    LikeMode, LogicalOperator, OrderDirection, OrderEntry, OrderFilter, ValueExpression,
    PATH_SEPARATOR,
};
pub use value::Value;
