//! Filter IR: the condition tree, ordering and limit of a collection query.
//!
//! Property paths use `->` to cross relationships: `books->tags->name` starts at
//! the root entity, follows `books`, then `tags`, and reads `name`.

use serde::{Deserialize, Serialize};

use crate::aggregator::{Aggregator, NumericFunction};
use crate::error::Error;
use crate::value::Value;

/// Separator between relationship hops in a property path.
pub const PATH_SEPARATOR: &str = "->";

/// How the conditions of a group are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalOperator {
    /// All conditions must match.
    And,
    /// At least one condition must match.
    Or,
}

/// Value comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOperator {
    Equal,
    NotEqual,
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
}

impl CompareOperator {
    /// SQL operator symbol.
    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOperator::Equal => "=",
            CompareOperator::NotEqual => "!=",
            CompareOperator::Greater => ">",
            CompareOperator::GreaterOrEqual => ">=",
            CompareOperator::Less => "<",
            CompareOperator::LessOrEqual => "<=",
        }
    }
}

/// Anchoring of a LIKE pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LikeMode {
    /// Pattern used verbatim; wildcards are the caller's responsibility.
    Raw,
    StartsWith,
    EndsWith,
    Contains,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderDirection {
    Asc,
    Desc,
}

/// An expression producing a value for a row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValueExpression {
    /// A property path, possibly crossing relationships.
    Property(String),
    /// A numeric aggregate over a property path that crosses a to-many relationship.
    Aggregate {
        function: NumericFunction,
        path: String,
    },
}

impl ValueExpression {
    /// A plain property path.
    pub fn property(path: impl Into<String>) -> Self {
        ValueExpression::Property(path.into())
    }

    /// `COUNT(path)`.
    pub fn count(path: impl Into<String>) -> Self {
        Self::aggregate(NumericFunction::Count, path)
    }

    /// `SUM(path)`.
    pub fn sum(path: impl Into<String>) -> Self {
        Self::aggregate(NumericFunction::Sum, path)
    }

    /// `AVG(path)`.
    pub fn avg(path: impl Into<String>) -> Self {
        Self::aggregate(NumericFunction::Avg, path)
    }

    /// `MIN(path)`.
    pub fn min(path: impl Into<String>) -> Self {
        Self::aggregate(NumericFunction::Min, path)
    }

    /// `MAX(path)`.
    pub fn max(path: impl Into<String>) -> Self {
        Self::aggregate(NumericFunction::Max, path)
    }

    fn aggregate(function: NumericFunction, path: impl Into<String>) -> Self {
        ValueExpression::Aggregate {
            function,
            path: path.into(),
        }
    }

    /// The property path this expression reads.
    pub fn path(&self) -> &str {
        match self {
            ValueExpression::Property(path) | ValueExpression::Aggregate { path, .. } => path,
        }
    }
}

impl From<&str> for ValueExpression {
    fn from(path: &str) -> Self {
        ValueExpression::Property(path.to_string())
    }
}

impl From<String> for ValueExpression {
    fn from(path: String) -> Self {
        ValueExpression::Property(path)
    }
}

/// An explicit collection function invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FunctionCall {
    /// `expression <operator> value`.
    Compare {
        expression: ValueExpression,
        operator: CompareOperator,
        value: Value,
    },
    /// `expression LIKE pattern`, anchored by mode.
    Like {
        expression: ValueExpression,
        mode: LikeMode,
        pattern: String,
    },
    /// Raw SQL predicate with `?` placeholders. SQL backend only.
    RawSql { sql: String, args: Vec<Value> },
}

/// Operator encoded in a shorthand condition key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOperator {
    Compare(CompareOperator),
    /// `~` suffix: raw LIKE.
    Like,
}

/// A node of the condition tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    /// Shorthand `"{path}{operator}" => value`, e.g. `"books->title!=" => "x"`.
    Pair { key: String, value: Value },
    /// Explicit function call.
    Call(FunctionCall),
    /// Nested logical group.
    Group(Group),
}

impl Condition {
    /// Shorthand pair.
    pub fn pair(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Condition::Pair {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Split a shorthand key into its property path and operator.
    ///
    /// Without an operator suffix the key means equality.
    pub fn parse_key(key: &str) -> Result<(&str, KeyOperator), Error> {
        const SUFFIXES: [(&str, KeyOperator); 7] = [
            ("!=", KeyOperator::Compare(CompareOperator::NotEqual)),
            (">=", KeyOperator::Compare(CompareOperator::GreaterOrEqual)),
            ("<=", KeyOperator::Compare(CompareOperator::LessOrEqual)),
            (">", KeyOperator::Compare(CompareOperator::Greater)),
            ("<", KeyOperator::Compare(CompareOperator::Less)),
            ("=", KeyOperator::Compare(CompareOperator::Equal)),
            ("~", KeyOperator::Like),
        ];

        let key = key.trim();
        let (path, operator) = SUFFIXES
            .iter()
            .find_map(|(suffix, op)| key.strip_suffix(suffix).map(|path| (path, *op)))
            .unwrap_or((key, KeyOperator::Compare(CompareOperator::Equal)));

        // `->` ends with `>`, so a bare path like `a->` is malformed rather than `a- >`.
        let path = path.trim_end();
        if path.is_empty() || path.ends_with('-') || path.ends_with(PATH_SEPARATOR) {
            return Err(Error::InvalidArgument(format!(
                "condition key `{key}` has no property path"
            )));
        }
        Ok((path, operator))
    }
}

/// A logical group of conditions, optionally aggregated.
///
/// The aggregator applies to every condition below the group that crosses a
/// to-many relationship, unless a nested group sets its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub operator: LogicalOperator,
    pub aggregator: Option<Aggregator>,
    pub conditions: Vec<Condition>,
}

/// Builder for the condition tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FindFilter {
    operator: LogicalOperator,
    aggregator: Option<Aggregator>,
    conditions: Vec<Condition>,
}

impl Default for FindFilter {
    fn default() -> Self {
        Self::new(LogicalOperator::And)
    }
}

impl FindFilter {
    /// Create a builder combining its conditions with `operator`.
    pub fn new(operator: LogicalOperator) -> Self {
        Self {
            operator,
            aggregator: None,
            conditions: Vec::new(),
        }
    }

    /// Set the aggregator applied to the conditions of this group.
    pub fn with_aggregator(mut self, aggregator: Aggregator) -> Self {
        self.aggregator = Some(aggregator);
        self
    }

    /// Add a raw condition node.
    pub fn condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Add a shorthand `"{path}{operator}" => value` condition.
    pub fn pair(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.condition(Condition::pair(key, value))
    }

    /// Add an explicit comparison.
    pub fn compare(
        self,
        expression: impl Into<ValueExpression>,
        operator: CompareOperator,
        value: impl Into<Value>,
    ) -> Self {
        self.condition(Condition::Call(FunctionCall::Compare {
            expression: expression.into(),
            operator,
            value: value.into(),
        }))
    }

    /// `path = value` (`IN` for lists, `IS NULL` for null).
    pub fn eq(self, path: impl Into<ValueExpression>, value: impl Into<Value>) -> Self {
        self.compare(path, CompareOperator::Equal, value)
    }

    /// `path != value`.
    pub fn ne(self, path: impl Into<ValueExpression>, value: impl Into<Value>) -> Self {
        self.compare(path, CompareOperator::NotEqual, value)
    }

    /// `path > value`.
    pub fn gt(self, path: impl Into<ValueExpression>, value: impl Into<Value>) -> Self {
        self.compare(path, CompareOperator::Greater, value)
    }

    /// `path >= value`.
    pub fn ge(self, path: impl Into<ValueExpression>, value: impl Into<Value>) -> Self {
        self.compare(path, CompareOperator::GreaterOrEqual, value)
    }

    /// `path < value`.
    pub fn lt(self, path: impl Into<ValueExpression>, value: impl Into<Value>) -> Self {
        self.compare(path, CompareOperator::Less, value)
    }

    /// `path <= value`.
    pub fn le(self, path: impl Into<ValueExpression>, value: impl Into<Value>) -> Self {
        self.compare(path, CompareOperator::LessOrEqual, value)
    }

    /// LIKE with the given anchoring.
    pub fn like(
        self,
        path: impl Into<ValueExpression>,
        mode: LikeMode,
        pattern: impl Into<String>,
    ) -> Self {
        self.condition(Condition::Call(FunctionCall::Like {
            expression: path.into(),
            mode,
            pattern: pattern.into(),
        }))
    }

    pub fn starts_with(self, path: impl Into<ValueExpression>, prefix: impl Into<String>) -> Self {
        self.like(path, LikeMode::StartsWith, prefix)
    }

    pub fn ends_with(self, path: impl Into<ValueExpression>, suffix: impl Into<String>) -> Self {
        self.like(path, LikeMode::EndsWith, suffix)
    }

    pub fn contains(self, path: impl Into<ValueExpression>, needle: impl Into<String>) -> Self {
        self.like(path, LikeMode::Contains, needle)
    }

    /// Raw SQL predicate with `?` placeholders.
    pub fn raw_sql(self, sql: impl Into<String>, args: Vec<Value>) -> Self {
        self.condition(Condition::Call(FunctionCall::RawSql {
            sql: sql.into(),
            args,
        }))
    }

    /// Nested AND group.
    pub fn and(self, build: impl FnOnce(FindFilter) -> FindFilter) -> Self {
        self.group(FindFilter::new(LogicalOperator::And), build)
    }

    /// Nested OR group.
    pub fn or(self, build: impl FnOnce(FindFilter) -> FindFilter) -> Self {
        self.group(FindFilter::new(LogicalOperator::Or), build)
    }

    /// Nested AND group whose to-many conditions use `aggregator`.
    pub fn and_aggregated(
        self,
        aggregator: Aggregator,
        build: impl FnOnce(FindFilter) -> FindFilter,
    ) -> Self {
        self.group(
            FindFilter::new(LogicalOperator::And).with_aggregator(aggregator),
            build,
        )
    }

    /// Nested OR group whose to-many conditions use `aggregator`.
    pub fn or_aggregated(
        self,
        aggregator: Aggregator,
        build: impl FnOnce(FindFilter) -> FindFilter,
    ) -> Self {
        self.group(
            FindFilter::new(LogicalOperator::Or).with_aggregator(aggregator),
            build,
        )
    }

    fn group(self, nested: FindFilter, build: impl FnOnce(FindFilter) -> FindFilter) -> Self {
        // Empty groups are dropped instead of becoming a vacuous node.
        match build(nested).to_condition() {
            Some(condition) => self.condition(condition),
            None => self,
        }
    }

    /// Whether no condition was added.
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Build the condition tree.
    ///
    /// Returns `None` for an empty builder. A single nested group is returned
    /// as-is rather than wrapped in another group.
    pub fn to_condition(&self) -> Option<Condition> {
        match self.conditions.as_slice() {
            [] => None,
            [single @ Condition::Group(_)] if self.aggregator.is_none() => Some(single.clone()),
            conditions => Some(Condition::Group(Group {
                operator: self.operator,
                aggregator: self.aggregator.clone(),
                conditions: conditions.to_vec(),
            })),
        }
    }
}

/// An ordering entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderEntry {
    pub expression: ValueExpression,
    pub direction: OrderDirection,
}

/// Builder for the ordering of a collection. Entries are applied left to right.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderFilter {
    entries: Vec<OrderEntry>,
}

impl OrderFilter {
    /// Create an empty ordering.
    pub fn new() -> Self {
        Self::default()
    }

    /// Order by an expression.
    pub fn by(mut self, expression: impl Into<ValueExpression>, direction: OrderDirection) -> Self {
        self.entries.push(OrderEntry {
            expression: expression.into(),
            direction,
        });
        self
    }

    /// Ascending order.
    pub fn asc(self, expression: impl Into<ValueExpression>) -> Self {
        self.by(expression, OrderDirection::Asc)
    }

    /// Descending order.
    pub fn desc(self, expression: impl Into<ValueExpression>) -> Self {
        self.by(expression, OrderDirection::Desc)
    }

    /// The ordering entries.
    pub fn entries(&self) -> &[OrderEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Limit and offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limit {
    pub count: u64,
    pub offset: Option<u64>,
}

/// A complete collection query: conditions, ordering and limit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(default)]
    find: FindFilter,
    #[serde(default)]
    order: OrderFilter,
    #[serde(default)]
    limit: Option<Limit>,
}

impl Filter {
    /// Create an empty filter matching everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add conditions; the top level combines them with AND.
    pub fn find(mut self, build: impl FnOnce(FindFilter) -> FindFilter) -> Self {
        self.find = build(self.find);
        self
    }

    /// Add ordering entries.
    pub fn order(mut self, build: impl FnOnce(OrderFilter) -> OrderFilter) -> Self {
        self.order = build(self.order);
        self
    }

    /// Limit the result, optionally skipping `offset` rows first.
    pub fn limit(mut self, count: u64, offset: Option<u64>) -> Self {
        self.limit = Some(Limit { count, offset });
        self
    }

    /// The compiled condition tree, if any.
    pub fn condition(&self) -> Option<Condition> {
        self.find.to_condition()
    }

    pub fn find_filter(&self) -> &FindFilter {
        &self.find
    }

    pub fn order_filter(&self) -> &OrderFilter {
        &self.order
    }

    pub fn limit_spec(&self) -> Option<Limit> {
        self.limit
    }

    /// Load a filter from JSON.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }
}
