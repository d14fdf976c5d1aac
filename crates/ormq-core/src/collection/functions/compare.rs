//! Value comparison operators.

use std::cmp::Ordering;

use ormq_proto::{Aggregator, CompareOperator, Value};

use super::{CollectionFunction, Function};
use crate::collection::aggregator::SqlAggregator;
use crate::collection::array_helper::ArrayHelper;
use crate::collection::context::ExpressionContext;
use crate::collection::result::{ArrayExpressionResult, QueryParam, SqlExpressionResult};
use crate::collection::sql_helper::SqlHelper;
use crate::error::Error;

/// `lhs <operator> value`.
///
/// Equality against a list means membership (`IN`); equality against `Null`
/// means `IS NULL`. Rows where the left side is NULL do not satisfy ordering
/// operators but do satisfy `!=` against a non-null value, on both backends.
#[derive(Debug)]
pub struct Compare<'a> {
    lhs: Box<Function<'a>>,
    operator: CompareOperator,
    value: &'a Value,
}

impl<'a> Compare<'a> {
    pub fn new(
        lhs: Function<'a>,
        operator: CompareOperator,
        value: &'a Value,
    ) -> Result<Self, Error> {
        if value.is_list() && !is_equality(operator) {
            return Err(Error::InvalidArgument(format!(
                "operator `{}` cannot compare against the list {value}",
                operator.symbol()
            )));
        }
        Ok(Self {
            lhs: Box::new(lhs),
            operator,
            value,
        })
    }

    fn matches(&self, value: &Value, target: &Value) -> bool {
        match self.operator {
            CompareOperator::Equal => equals(value, target),
            CompareOperator::NotEqual => !equals(value, target),
            operator => value
                .compare(target)
                .is_some_and(|ordering| accepts(operator, ordering)),
        }
    }

    fn scalar_predicate(&self, lhs: &SqlExpressionResult) -> SqlExpressionResult {
        let equal = self.operator == CompareOperator::Equal;
        match self.value {
            Value::Null if equal => lhs.append(" IS NULL", Vec::new()),
            Value::Null if self.operator == CompareOperator::NotEqual => {
                lhs.append(" IS NOT NULL", Vec::new())
            }
            Value::List(items) if items.is_empty() => {
                lhs.with_args(if equal { "1=0" } else { "1=1" }, Vec::new())
            }
            Value::List(items) => {
                let placeholders = vec!["?"; items.len()].join(", ");
                let params = items.iter().map(|item| lhs.normalize_param(item)).collect();
                if equal {
                    lhs.append(&format!(" IN ({placeholders})"), params)
                } else {
                    null_safe_negation(lhs, &format!(" NOT IN ({placeholders})"), params)
                }
            }
            value if self.operator == CompareOperator::NotEqual => {
                null_safe_negation(lhs, " != ?", vec![lhs.normalize_param(value)])
            }
            value => lhs.append(
                &format!(" {} ?", self.operator.symbol()),
                vec![lhs.normalize_param(value)],
            ),
        }
    }
}

impl CollectionFunction for Compare<'_> {
    fn process_array(
        &self,
        helper: &ArrayHelper<'_>,
        row: usize,
        aggregator: Option<&Aggregator>,
    ) -> Result<ArrayExpressionResult, Error> {
        let lhs = self.lhs.process_array(helper, row, aggregator)?;
        let target = lhs.normalize(self.value);

        let value = match &lhs.aggregator {
            Some(aggregator) => {
                let matched: Vec<Value> = lhs
                    .fan_out()?
                    .iter()
                    .map(|value| Value::Bool(self.matches(value, &target)))
                    .collect();
                aggregator.aggregate_array_values(&matched)
            }
            None => Value::Bool(self.matches(&lhs.value, &target)),
        };
        Ok(lhs.derive(value))
    }

    fn process_sql(
        &self,
        helper: &mut SqlHelper<'_>,
        context: ExpressionContext,
        aggregator: Option<&Aggregator>,
    ) -> Result<SqlExpressionResult, Error> {
        let lhs = self.lhs.process_sql(helper, context, aggregator)?;
        let predicate = if lhs.is_composite() {
            composite_predicate(self.operator, self.value, &lhs)?
        } else {
            self.scalar_predicate(&lhs)
        };

        match lhs.aggregator() {
            Some(aggregator) => aggregator.aggregate_expression(predicate, context),
            None => Ok(predicate),
        }
    }
}

/// Equality of a multi-column key with a tuple or a list of tuples.
fn composite_predicate(
    operator: CompareOperator,
    value: &Value,
    lhs: &SqlExpressionResult,
) -> Result<SqlExpressionResult, Error> {
    if !is_equality(operator) {
        return Err(Error::InvalidArgument(format!(
            "operator `{}` is not defined for the composite key ({})",
            operator.symbol(),
            lhs.expression
        )));
    }

    let tuples: Vec<&[Value]> = match value {
        Value::Null => vec![&[] as &[Value]],
        Value::List(items) if !items.is_empty() && items.iter().all(Value::is_list) => {
            items.iter().filter_map(Value::as_list).collect()
        }
        Value::List(items) if items.is_empty() => Vec::new(),
        Value::List(items) => vec![items.as_slice()],
        other => {
            return Err(Error::InvalidArgument(format!(
                "composite key ({}) must be compared with a tuple, got {other}",
                lhs.expression
            )))
        }
    };

    let mut alternatives = Vec::with_capacity(tuples.len());
    let mut args = lhs.args.clone();
    for tuple in tuples {
        if !tuple.is_empty() && tuple.len() != lhs.columns.len() {
            return Err(Error::InvalidArgument(format!(
                "tuple of {} values compared with the {} columns ({})",
                tuple.len(),
                lhs.columns.len(),
                lhs.expression
            )));
        }
        let parts: Vec<String> = lhs
            .columns
            .iter()
            .enumerate()
            .map(|(index, column)| match tuple.get(index) {
                None | Some(Value::Null) => format!("{column} IS NULL"),
                Some(value) => {
                    args.push(QueryParam::new(value.clone()));
                    format!("{column} = ?")
                }
            })
            .collect();
        alternatives.push(format!("({})", parts.join(" AND ")));
    }

    let equal = operator == CompareOperator::Equal;
    let expression = match (alternatives.is_empty(), equal) {
        (true, true) => "1=0".to_string(),
        (true, false) => "1=1".to_string(),
        (false, true) => format!("({})", alternatives.join(" OR ")),
        (false, false) => format!("NOT ({})", alternatives.join(" OR ")),
    };
    Ok(lhs.with_args(expression, args))
}

fn is_equality(operator: CompareOperator) -> bool {
    matches!(operator, CompareOperator::Equal | CompareOperator::NotEqual)
}

fn accepts(operator: CompareOperator, ordering: Ordering) -> bool {
    match operator {
        CompareOperator::Equal => ordering == Ordering::Equal,
        CompareOperator::NotEqual => ordering != Ordering::Equal,
        CompareOperator::Greater => ordering == Ordering::Greater,
        CompareOperator::GreaterOrEqual => ordering != Ordering::Less,
        CompareOperator::Less => ordering == Ordering::Less,
        CompareOperator::LessOrEqual => ordering != Ordering::Greater,
    }
}

/// Equality with list targets read as "one of", except when comparing a
/// tuple (composite identity) with a single tuple.
fn equals(value: &Value, target: &Value) -> bool {
    match target {
        Value::List(items) if !value.is_list() || items.iter().all(Value::is_list) => {
            items.iter().any(|item| value.loosely_equals(item))
        }
        _ => value.loosely_equals(target),
    }
}

/// `lhs {suffix}`, also matching NULL when the left side is nullable.
fn null_safe_negation(
    lhs: &SqlExpressionResult,
    suffix: &str,
    params: Vec<QueryParam>,
) -> SqlExpressionResult {
    if !lhs.nullable {
        return lhs.append(suffix, params);
    }
    let (expression, lhs_args) = lhs.get_args_for_expansion();
    let mut args = lhs_args.to_vec();
    args.extend(params);
    args.extend_from_slice(lhs_args);
    lhs.with_args(
        format!("({expression}{suffix} OR {expression} IS NULL)"),
        args,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::fixtures;
    use crate::collection::functions::{is_truthy, CompileScope};
    use crate::config::CollectionConfig;
    use ormq_proto::{Condition, FunctionCall, ValueExpression};
    use pretty_assertions::assert_eq;

    fn sql(entity: &str, condition: Condition, context: ExpressionContext) -> Result<SqlExpressionResult, Error> {
        let catalog = fixtures::catalog();
        let config = CollectionConfig::default();
        let scope = CompileScope::new(&catalog, entity, &config);
        let function = Function::compile(&condition, &scope)?;
        let mut helper = SqlHelper::new(&catalog, entity, &config)?;
        function.process_sql(&mut helper, context, None)
    }

    fn matching_rows(entity: &str, condition: Condition) -> Vec<usize> {
        let catalog = fixtures::catalog();
        let graph = fixtures::graph(&catalog);
        let config = CollectionConfig::default();
        let scope = CompileScope::new(&catalog, entity, &config);
        let function = Function::compile(&condition, &scope).unwrap();
        let helper = ArrayHelper::new(&catalog, &graph, entity, &config);
        (0..graph.rows(entity).len())
            .filter(|&row| {
                is_truthy(&function.process_array(&helper, row, None).unwrap()).unwrap()
            })
            .collect()
    }

    #[test]
    fn test_scalar_operators() {
        let result = sql("Book", Condition::pair("pages>", 250), ExpressionContext::FilterAnd).unwrap();
        assert_eq!(result.expression, "book.pages > ?");
        assert_eq!(result.args[0].value, Value::Int32(250));

        let result = sql("Book", Condition::pair("title", Value::Null), ExpressionContext::FilterAnd).unwrap();
        assert_eq!(result.expression, "book.title IS NULL");

        let result = sql("Book", Condition::pair("id", Value::list([1i64, 3])), ExpressionContext::FilterAnd)
            .unwrap();
        assert_eq!(result.expression, "book.id IN (?, ?)");

        let result = sql("Book", Condition::pair("id", Value::List(Vec::new())), ExpressionContext::FilterAnd)
            .unwrap();
        assert_eq!(result.expression, "1=0");

        let result = sql("Book", Condition::pair("id!=", Value::List(Vec::new())), ExpressionContext::FilterAnd)
            .unwrap();
        assert_eq!(result.expression, "1=1");
    }

    #[test]
    fn test_nullable_not_equal_matches_null() {
        let result = sql("Book", Condition::pair("price!=", 10), ExpressionContext::FilterAnd).unwrap();
        assert_eq!(result.expression, "(book.price != ? OR book.price IS NULL)");
        assert_eq!(result.args.len(), 1);
        assert_eq!(result.args[0].value, Value::Float64(10.0));

        let result = sql("Book", Condition::pair("pages!=", 10), ExpressionContext::FilterAnd).unwrap();
        assert_eq!(result.expression, "book.pages != ?");

        // Book 5 has no price.
        assert_eq!(matching_rows("Book", Condition::pair("price!=", 10)), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_ordering_against_list_is_rejected() {
        assert!(matches!(
            sql("Book", Condition::pair("pages>", Value::list([1, 2])), ExpressionContext::FilterAnd),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_to_many_compare_applies_aggregator() {
        let and = sql("Author", Condition::pair("books->title", "Orm"), ExpressionContext::FilterAnd).unwrap();
        assert_eq!(and.expression, "(books_any.title = ?) AND books_any.id IS NOT NULL");
        assert!(!and.is_having_clause());

        let or = sql("Author", Condition::pair("books->title", "Orm"), ExpressionContext::FilterOr).unwrap();
        assert_eq!(or.expression, "COUNT(DISTINCT books_any.id) > 0");
        assert!(or.is_having_clause());

        assert_eq!(matching_rows("Author", Condition::pair("books->title", "Orm")), vec![0]);
        assert_eq!(
            matching_rows("Author", Condition::pair("books->tags->name", "scifi")),
            vec![1, 2]
        );
    }

    #[test]
    fn test_aggregate_value_compare() {
        let condition = Condition::Call(FunctionCall::Compare {
            expression: ValueExpression::sum("books->pages"),
            operator: CompareOperator::GreaterOrEqual,
            value: Value::Int64(450),
        });

        let result = sql("Author", condition.clone(), ExpressionContext::FilterAnd).unwrap();
        assert_eq!(
            result.expression,
            "(SELECT SUM(books_sum.pages) FROM book AS books_sum WHERE books_sum.author_id = author.id) >= ?"
        );
        assert!(!result.is_having_clause());

        // Tolkien 450, Asimov 450, Herbert 600, Clarke none.
        assert_eq!(matching_rows("Author", condition), vec![0, 1, 2]);
    }

    #[test]
    fn test_relationship_identity_compare() {
        let result = sql("Book", Condition::pair("author", 2i64), ExpressionContext::FilterAnd).unwrap();
        assert_eq!(result.expression, "book.author_id = ?");

        assert_eq!(matching_rows("Book", Condition::pair("author", 2i64)), vec![1, 4]);
        assert_eq!(
            matching_rows("Book", Condition::pair("author", Value::list([1i64, 3]))),
            vec![0, 2, 3]
        );
    }

    #[test]
    fn test_composite_predicates() {
        let lhs = SqlExpressionResult::column(vec!["t.a".into(), "t.b".into()]);

        let pairs = Value::list([Value::list([1, 2]), Value::list([3, 4])]);
        let result = composite_predicate(CompareOperator::Equal, &pairs, &lhs).unwrap();
        assert_eq!(result.expression, "((t.a = ? AND t.b = ?) OR (t.a = ? AND t.b = ?))");
        assert_eq!(result.args.len(), 4);

        let tuple = Value::list([Value::from(1), Value::Null]);
        let result = composite_predicate(CompareOperator::NotEqual, &tuple, &lhs).unwrap();
        assert_eq!(result.expression, "NOT ((t.a = ? AND t.b IS NULL))");

        let result = composite_predicate(CompareOperator::Equal, &Value::Null, &lhs).unwrap();
        assert_eq!(result.expression, "((t.a IS NULL AND t.b IS NULL))");

        let empty = Value::List(Vec::new());
        let result = composite_predicate(CompareOperator::Equal, &empty, &lhs).unwrap();
        assert_eq!(result.expression, "1=0");

        let short = Value::list([1]);
        assert!(composite_predicate(CompareOperator::Equal, &short, &lhs).is_err());
        assert!(composite_predicate(CompareOperator::Less, &tuple, &lhs).is_err());
    }

    #[test]
    fn test_array_equality_forms() {
        assert!(equals(&Value::Int64(3), &Value::list([1i64, 3])));
        assert!(!equals(&Value::Int64(3), &Value::List(Vec::new())));
        assert!(equals(&Value::list([1, 2]), &Value::list([1, 2])));
        assert!(equals(
            &Value::list([1, 2]),
            &Value::list([Value::list([0, 0]), Value::list([1, 2])])
        ));
        assert!(equals(&Value::Null, &Value::Null));
        assert!(!equals(&Value::Null, &Value::Int64(1)));
    }
}
