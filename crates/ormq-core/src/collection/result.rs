//! Expression results produced by collection functions.

use std::fmt;
use std::sync::Arc;

use ormq_proto::{Aggregator, Value};
use serde::Serialize;

use super::join::TableJoin;
use crate::catalog::{PropertyMetadata, ScalarType};
use crate::error::Error;

/// Result of evaluating an expression against one in-memory row.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayExpressionResult {
    /// The evaluated value; a list of fan-out values while `aggregator` is set.
    pub value: Value,
    /// Aggregator still to be applied to the fan-out values.
    pub aggregator: Option<Aggregator>,
    /// Backing property while the value is a plain property lookup.
    pub property: Option<Arc<PropertyMetadata>>,
}

impl ArrayExpressionResult {
    /// A derived value with no backing property.
    pub fn new(value: Value) -> Self {
        Self {
            value,
            aggregator: None,
            property: None,
        }
    }

    /// A value read from a property.
    pub fn from_property(value: Value, property: Arc<PropertyMetadata>) -> Self {
        Self {
            value,
            aggregator: None,
            property: Some(property),
        }
    }

    /// Attach the aggregator to fold the fan-out values with.
    pub fn with_aggregator(mut self, aggregator: Aggregator) -> Self {
        self.aggregator = Some(aggregator);
        self
    }

    /// Replace the value by a derived one; the property link is dropped.
    pub fn derive(self, value: Value) -> Self {
        Self {
            value,
            aggregator: None,
            property: None,
        }
    }

    /// Coerce a comparison value to the backing property's type.
    ///
    /// Derived values compare as-is.
    pub fn normalize(&self, value: &Value) -> Value {
        match self.property.as_ref().and_then(|p| p.scalar_type()) {
            Some(scalar) => scalar.coerce(value),
            None => value.clone(),
        }
    }

    /// The fan-out values an aggregator applies to.
    pub fn fan_out(&self) -> Result<&[Value], Error> {
        self.value.as_list().ok_or_else(|| {
            Error::InvalidState(format!(
                "aggregated expression must hold a list of values, got {}",
                self.value
            ))
        })
    }
}

/// Parameter binding hint for a query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParamType {
    Bool,
    Int,
    Float,
    Decimal,
    String,
    Bytes,
    Timestamp,
    Uuid,
}

impl ParamType {
    /// Binding hint for a column of the given scalar type.
    pub fn from_scalar(scalar: &ScalarType) -> Self {
        match scalar {
            ScalarType::Bool => ParamType::Bool,
            ScalarType::Int32 | ScalarType::Int64 => ParamType::Int,
            ScalarType::Float32 | ScalarType::Float64 => ParamType::Float,
            ScalarType::Decimal { .. } => ParamType::Decimal,
            ScalarType::String => ParamType::String,
            ScalarType::Bytes => ParamType::Bytes,
            ScalarType::Timestamp => ParamType::Timestamp,
            ScalarType::Uuid => ParamType::Uuid,
        }
    }
}

/// A positional query parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryParam {
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub param_type: Option<ParamType>,
}

impl QueryParam {
    /// A parameter without a binding hint.
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            param_type: None,
        }
    }

    /// A parameter bound with an explicit type.
    pub fn typed(value: impl Into<Value>, param_type: Option<ParamType>) -> Self {
        Self {
            value: value.into(),
            param_type,
        }
    }
}

/// Coerces a comparison value to a column's storage representation.
pub type ValueNormalizer = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// A compiled SQL fragment with everything it needs from the enclosing query.
///
/// The fragment uses `?` placeholders bound to `args` in order.
#[derive(Clone)]
pub struct SqlExpressionResult {
    /// SQL text.
    pub expression: String,
    /// Positional parameters of `expression`.
    pub args: Vec<QueryParam>,
    /// Joins the expression reads from, in dependency order.
    pub joins: Vec<TableJoin>,
    /// Expressions to group by when this is used as a HAVING predicate.
    pub group_by: Vec<String>,
    /// Backing property while the expression is a plain column reference.
    pub property: Option<Arc<PropertyMetadata>>,
    /// Coercion for values compared against this expression.
    pub value_normalizer: Option<ValueNormalizer>,
    /// Binding hint for values compared against this expression.
    pub param_type: Option<ParamType>,
    /// Column references; several for a composite key.
    pub columns: Vec<String>,
    /// Whether the expression may evaluate to NULL for a row.
    pub nullable: bool,
    aggregator: Option<Aggregator>,
    is_having_clause: bool,
}

impl SqlExpressionResult {
    /// A plain row-level expression.
    pub fn new(expression: impl Into<String>, args: Vec<QueryParam>) -> Self {
        Self {
            expression: expression.into(),
            args,
            joins: Vec::new(),
            group_by: Vec::new(),
            property: None,
            value_normalizer: None,
            param_type: None,
            columns: Vec::new(),
            nullable: false,
            aggregator: None,
            is_having_clause: false,
        }
    }

    /// A reference to one or more columns.
    pub fn column(columns: Vec<String>) -> Self {
        let mut result = Self::new(columns.join(", "), Vec::new());
        result.columns = columns;
        result
    }

    /// Set the joins.
    pub fn with_joins(mut self, joins: Vec<TableJoin>) -> Self {
        self.joins = joins;
        self
    }

    /// Set the group-by expressions.
    pub fn with_group_by(mut self, group_by: Vec<String>) -> Self {
        self.group_by = group_by;
        self
    }

    /// Set the backing property, deriving the normalizer and binding hint from its type.
    pub fn with_property(mut self, property: Arc<PropertyMetadata>) -> Self {
        if let Some(scalar) = property.scalar_type() {
            let scalar = scalar.clone();
            self.param_type = Some(ParamType::from_scalar(&scalar));
            self.value_normalizer = Some(Arc::new(move |value: &Value| scalar.coerce(value)));
        }
        self.nullable |= property.is_nullable();
        self.property = Some(property);
        self
    }

    /// Set the aggregator and having flag together.
    ///
    /// An aggregator can only be carried by a HAVING expression.
    pub fn with_aggregation(
        mut self,
        aggregator: Option<Aggregator>,
        is_having_clause: bool,
    ) -> Result<Self, Error> {
        if aggregator.is_some() && !is_having_clause {
            return Err(Error::InvalidArgument(
                "an expression with an aggregator must be a having-clause expression".into(),
            ));
        }
        self.aggregator = aggregator;
        self.is_having_clause = is_having_clause;
        Ok(self)
    }

    /// The aggregator still to be applied.
    pub fn aggregator(&self) -> Option<&Aggregator> {
        self.aggregator.as_ref()
    }

    /// Whether the expression belongs to the HAVING clause.
    pub fn is_having_clause(&self) -> bool {
        self.is_having_clause
    }

    /// Whether the expression reads a composite key.
    pub fn is_composite(&self) -> bool {
        self.columns.len() > 1
    }

    /// Append SQL text and its parameters. Joins, grouping and aggregation
    /// are preserved; the result is no longer a plain column reference.
    pub fn append(&self, expression: &str, args: Vec<QueryParam>) -> Self {
        let mut merged = self.args.clone();
        merged.extend(args);
        self.with_args(format!("{}{expression}", self.expression), merged)
    }

    /// Replace the SQL text and parameters, keeping the side-channel fields.
    pub fn with_args(&self, expression: impl Into<String>, args: Vec<QueryParam>) -> Self {
        Self {
            expression: expression.into(),
            args,
            joins: self.joins.clone(),
            group_by: self.group_by.clone(),
            property: None,
            value_normalizer: None,
            param_type: None,
            columns: Vec::new(),
            nullable: false,
            aggregator: self.aggregator.clone(),
            is_having_clause: self.is_having_clause,
        }
    }

    /// The expression and its parameters, for embedding in a parent expression.
    pub fn get_args_for_expansion(&self) -> (&str, &[QueryParam]) {
        (&self.expression, &self.args)
    }

    /// Coerce a comparison value to the column's representation and wrap it
    /// as a parameter.
    pub fn normalize_param(&self, value: &Value) -> QueryParam {
        let value = match &self.value_normalizer {
            Some(normalize) => normalize(value),
            None => value.clone(),
        };
        QueryParam::typed(value, self.param_type)
    }
}

impl fmt::Debug for SqlExpressionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlExpressionResult")
            .field("expression", &self.expression)
            .field("args", &self.args)
            .field("joins", &self.joins)
            .field("group_by", &self.group_by)
            .field("columns", &self.columns)
            .field("nullable", &self.nullable)
            .field("aggregator", &self.aggregator)
            .field("is_having_clause", &self.is_having_clause)
            .finish_non_exhaustive()
    }
}
