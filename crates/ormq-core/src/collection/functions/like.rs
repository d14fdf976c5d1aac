//! LIKE pattern matching.

use std::iter::Peekable;
use std::str::Chars;

use ormq_proto::{Aggregator, LikeMode, Value};

use super::{CollectionFunction, Function};
use crate::collection::aggregator::SqlAggregator;
use crate::collection::array_helper::ArrayHelper;
use crate::collection::context::ExpressionContext;
use crate::collection::result::{
    ArrayExpressionResult, ParamType, QueryParam, SqlExpressionResult,
};
use crate::collection::sql_helper::SqlHelper;
use crate::error::Error;

/// `lhs LIKE pattern`.
///
/// Both backends match the same pattern text: `%` for any run of characters,
/// `_` for one character and `\` to escape the next one. Matching is
/// case-sensitive. Non-string values never match.
#[derive(Debug)]
pub struct Like<'a> {
    lhs: Box<Function<'a>>,
    pattern: String,
}

impl<'a> Like<'a> {
    pub fn new(lhs: Function<'a>, mode: LikeMode, pattern: &str) -> Self {
        Self {
            lhs: Box::new(lhs),
            pattern: like_pattern(mode, pattern),
        }
    }

    /// The pattern sent to the database.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    fn matches(&self, value: &Value) -> bool {
        value
            .as_str()
            .is_some_and(|text| like_match(text, &self.pattern))
    }
}

impl CollectionFunction for Like<'_> {
    fn process_array(
        &self,
        helper: &ArrayHelper<'_>,
        row: usize,
        aggregator: Option<&Aggregator>,
    ) -> Result<ArrayExpressionResult, Error> {
        let lhs = self.lhs.process_array(helper, row, aggregator)?;
        let value = match &lhs.aggregator {
            Some(aggregator) => {
                let matched: Vec<Value> = lhs
                    .fan_out()?
                    .iter()
                    .map(|value| Value::Bool(self.matches(value)))
                    .collect();
                aggregator.aggregate_array_values(&matched)
            }
            None => Value::Bool(self.matches(&lhs.value)),
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
        if lhs.is_composite() {
            return Err(Error::InvalidArgument(format!(
                "LIKE is not defined for the composite key ({})",
                lhs.expression
            )));
        }

        let param = QueryParam::typed(self.pattern.as_str(), Some(ParamType::String));
        let predicate = lhs.append(" LIKE ? ESCAPE '\\'", vec![param]);
        match lhs.aggregator() {
            Some(aggregator) => aggregator.aggregate_expression(predicate, context),
            None => Ok(predicate),
        }
    }
}

/// Build the LIKE pattern for `mode`. Anchored modes escape the wildcards of
/// `text`; raw patterns are used verbatim.
pub fn like_pattern(mode: LikeMode, text: &str) -> String {
    match mode {
        LikeMode::Raw => text.to_string(),
        LikeMode::StartsWith => format!("{}%", escape(text)),
        LikeMode::EndsWith => format!("%{}", escape(text)),
        LikeMode::Contains => format!("%{}%", escape(text)),
    }
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Match `value` against a LIKE pattern.
///
/// - `%` matches zero or more characters
/// - `_` matches exactly one character
/// - `\` makes the next pattern character literal
pub fn like_match(value: &str, pattern: &str) -> bool {
    match_from(&mut value.chars().peekable(), &mut pattern.chars().peekable())
}

fn match_from(value: &mut Peekable<Chars<'_>>, pattern: &mut Peekable<Chars<'_>>) -> bool {
    loop {
        match (pattern.peek().copied(), value.peek().copied()) {
            (None, rest) => return rest.is_none(),
            (Some('%'), _) => {
                pattern.next();
                if pattern.peek().is_none() {
                    return true;
                }
                // Let `%` absorb 0, 1, 2, ... characters.
                loop {
                    if match_from(&mut value.clone(), &mut pattern.clone()) {
                        return true;
                    }
                    if value.next().is_none() {
                        return false;
                    }
                }
            }
            (Some('_'), Some(_)) => {
                pattern.next();
                value.next();
            }
            (Some('\\'), _) => {
                pattern.next();
                let literal = pattern.next().unwrap_or('\\');
                if value.next() != Some(literal) {
                    return false;
                }
            }
            (Some(expected), Some(actual)) if expected == actual => {
                pattern.next();
                value.next();
            }
            (Some(_), _) => return false,
        }
    }
}
