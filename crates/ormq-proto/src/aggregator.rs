//! Aggregators fold the values of a to-many relationship into one scalar.
//!
//! The definitions and their in-memory reductions live here so that filters can
//! carry them; the SQL rewriting lives with the query engine.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::value::Value;

/// Default aggregation key for [`Aggregator::Any`].
pub const ANY_KEY: &str = "any";
/// Default aggregation key for [`Aggregator::None`].
pub const NONE_KEY: &str = "none";
/// Default aggregation key for [`Aggregator::Count`].
pub const COUNT_KEY: &str = "count";

/// Numeric aggregate functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NumericFunction {
    /// Number of non-null values.
    Count,
    /// Sum of values.
    Sum,
    /// Average of values.
    Avg,
    /// Minimum value.
    Min,
    /// Maximum value.
    Max,
}

impl NumericFunction {
    /// SQL function name.
    pub fn sql_name(&self) -> &'static str {
        match self {
            NumericFunction::Count => "COUNT",
            NumericFunction::Sum => "SUM",
            NumericFunction::Avg => "AVG",
            NumericFunction::Min => "MIN",
            NumericFunction::Max => "MAX",
        }
    }

    /// Default aggregation key.
    pub fn default_key(&self) -> &'static str {
        match self {
            NumericFunction::Count => "count",
            NumericFunction::Sum => "sum",
            NumericFunction::Avg => "avg",
            NumericFunction::Min => "min",
            NumericFunction::Max => "max",
        }
    }

    /// Reduce values the way the SQL aggregate would: nulls are skipped and an
    /// empty input yields `Null`, except `COUNT` which yields zero.
    pub fn reduce(&self, values: &[Value]) -> Value {
        let present: Vec<&Value> = values.iter().filter(|v| !v.is_null()).collect();

        match self {
            NumericFunction::Count => Value::Int64(present.len() as i64),
            _ if present.is_empty() => Value::Null,
            NumericFunction::Sum => {
                if present.iter().all(|v| v.as_i64().is_some()) {
                    Value::Int64(present.iter().filter_map(|v| v.as_i64()).sum())
                } else {
                    Value::Float64(present.iter().filter_map(|v| v.as_f64()).sum())
                }
            }
            NumericFunction::Avg => {
                let numbers: Vec<f64> = present.iter().filter_map(|v| v.as_f64()).collect();
                if numbers.is_empty() {
                    Value::Null
                } else {
                    Value::Float64(numbers.iter().sum::<f64>() / numbers.len() as f64)
                }
            }
            NumericFunction::Min => Self::pick(&present, Ordering::Less),
            NumericFunction::Max => Self::pick(&present, Ordering::Greater),
        }
    }

    fn pick(values: &[&Value], wanted: Ordering) -> Value {
        let mut best: Option<&Value> = None;
        for &value in values {
            best = match best {
                Some(current) if value.compare(current) != Some(wanted) => Some(current),
                _ => Some(value),
            };
        }
        best.cloned().unwrap_or(Value::Null)
    }
}

/// Reduction applied to the values reached through a to-many relationship.
///
/// The key is used as a join alias suffix, so different aggregations over the
/// same relationship get separate joins.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Aggregator {
    /// True if any value is truthy.
    Any { key: String },
    /// True if no value is truthy.
    None { key: String },
    /// True if the number of truthy values is within the bounds.
    Count {
        at_least: Option<u64>,
        at_most: Option<u64>,
        key: String,
    },
    /// Numeric reduction of the raw values.
    Numeric { function: NumericFunction, key: String },
}

impl Aggregator {
    /// "Any" aggregator with the default key.
    pub fn any() -> Self {
        Self::any_with_key(ANY_KEY)
    }

    /// "Any" aggregator with a custom key.
    pub fn any_with_key(key: impl Into<String>) -> Self {
        Aggregator::Any { key: key.into() }
    }

    /// "None" aggregator with the default key.
    pub fn none() -> Self {
        Self::none_with_key(NONE_KEY)
    }

    /// "None" aggregator with a custom key.
    pub fn none_with_key(key: impl Into<String>) -> Self {
        Aggregator::None { key: key.into() }
    }

    /// Count aggregator with the default key. At least one bound is required.
    pub fn count(at_least: Option<u64>, at_most: Option<u64>) -> Result<Self, Error> {
        Self::count_with_key(at_least, at_most, COUNT_KEY)
    }

    /// Count aggregator with a custom key.
    pub fn count_with_key(
        at_least: Option<u64>,
        at_most: Option<u64>,
        key: impl Into<String>,
    ) -> Result<Self, Error> {
        if at_least.is_none() && at_most.is_none() {
            return Err(Error::InvalidArgument(
                "count aggregator needs at least one of `at_least` or `at_most`".into(),
            ));
        }
        Ok(Aggregator::Count {
            at_least,
            at_most,
            key: key.into(),
        })
    }

    /// Numeric aggregator keyed by the function name.
    pub fn numeric(function: NumericFunction) -> Self {
        Aggregator::Numeric {
            function,
            key: function.default_key().to_string(),
        }
    }

    /// The join alias suffix for this aggregation.
    pub fn aggregate_key(&self) -> &str {
        match self {
            Aggregator::Any { key }
            | Aggregator::None { key }
            | Aggregator::Count { key, .. }
            | Aggregator::Numeric { key, .. } => key,
        }
    }

    /// Whether the SQL form of this aggregator always needs a HAVING clause.
    ///
    /// `Any` only needs one outside of plain AND filtering; numeric
    /// reductions are correlated subqueries and need none.
    pub fn requires_having_clause(&self) -> bool {
        matches!(self, Aggregator::None { .. } | Aggregator::Count { .. })
    }

    /// Whether the aggregation yields a boolean (filtering) result.
    pub fn is_boolean(&self) -> bool {
        !matches!(self, Aggregator::Numeric { .. })
    }

    /// Reduce in-memory values.
    pub fn aggregate_array_values(&self, values: &[Value]) -> Value {
        match self {
            Aggregator::Any { .. } => Value::Bool(values.iter().any(Value::is_truthy)),
            Aggregator::None { .. } => Value::Bool(!values.iter().any(Value::is_truthy)),
            Aggregator::Count {
                at_least, at_most, ..
            } => {
                let count = values.iter().filter(|v| v.is_truthy()).count() as u64;
                let above = at_least.map_or(true, |min| count >= min);
                let below = at_most.map_or(true, |max| count <= max);
                Value::Bool(above && below)
            }
            Aggregator::Numeric { function, .. } => function.reduce(values),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bools(values: &[bool]) -> Vec<Value> {
        values.iter().map(|b| Value::Bool(*b)).collect()
    }

    #[test]
    fn test_any_and_none_are_negations() {
        let samples = [
            vec![],
            bools(&[false]),
            bools(&[true]),
            bools(&[false, true, false]),
            vec![Value::Null, Value::Int64(0)],
        ];

        for values in samples {
            let any = Aggregator::any().aggregate_array_values(&values);
            let none = Aggregator::none().aggregate_array_values(&values);
            let expected = values.iter().any(Value::is_truthy);
            assert_eq!(any, Value::Bool(expected));
            assert_eq!(none, Value::Bool(!expected));
        }
    }

    #[test]
    fn test_count_requires_a_bound() {
        assert!(Aggregator::count(None, None).is_err());
        assert!(Aggregator::count(Some(1), None).is_ok());
        assert!(Aggregator::count(None, Some(1)).is_ok());
    }

    #[test]
    fn test_count_bounds() {
        let values = bools(&[true, false, true, true]);

        let at_least_two = Aggregator::count(Some(2), None).unwrap();
        assert_eq!(at_least_two.aggregate_array_values(&values), Value::Bool(true));

        let at_most_two = Aggregator::count(None, Some(2)).unwrap();
        assert_eq!(at_most_two.aggregate_array_values(&values), Value::Bool(false));

        let between = Aggregator::count(Some(3), Some(3)).unwrap();
        assert_eq!(between.aggregate_array_values(&values), Value::Bool(true));

        let at_least_one = Aggregator::count(Some(1), None).unwrap();
        assert_eq!(at_least_one.aggregate_array_values(&[]), Value::Bool(false));
    }

    #[test]
    fn test_numeric_reductions() {
        let values = vec![Value::Int64(3), Value::Null, Value::Int64(1), Value::Int64(5)];

        assert_eq!(NumericFunction::Count.reduce(&values), Value::Int64(3));
        assert_eq!(NumericFunction::Sum.reduce(&values), Value::Int64(9));
        assert_eq!(NumericFunction::Avg.reduce(&values), Value::Float64(3.0));
        assert_eq!(NumericFunction::Min.reduce(&values), Value::Int64(1));
        assert_eq!(NumericFunction::Max.reduce(&values), Value::Int64(5));

        let mixed = vec![Value::Int64(1), Value::Float64(0.5)];
        assert_eq!(NumericFunction::Sum.reduce(&mixed), Value::Float64(1.5));
    }

    #[test]
    fn test_numeric_reductions_on_empty_input() {
        assert_eq!(NumericFunction::Count.reduce(&[]), Value::Int64(0));
        assert_eq!(NumericFunction::Sum.reduce(&[]), Value::Null);
        assert_eq!(NumericFunction::Max.reduce(&[Value::Null]), Value::Null);
    }

    #[test]
    fn test_aggregate_keys() {
        assert_eq!(Aggregator::any().aggregate_key(), "any");
        assert_eq!(Aggregator::any_with_key("x").aggregate_key(), "x");
        assert_eq!(
            Aggregator::count_with_key(Some(2), None, "y").unwrap().aggregate_key(),
            "y"
        );
        assert_eq!(Aggregator::numeric(NumericFunction::Sum).aggregate_key(), "sum");
        assert!(!Aggregator::any().requires_having_clause());
        assert!(Aggregator::none().requires_having_clause());
        assert!(!Aggregator::numeric(NumericFunction::Avg).requires_having_clause());
    }
}
