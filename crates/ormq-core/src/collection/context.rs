//! Expression contexts.

/// Where a compiled expression ends up, which decides the SQL rewrites an
/// aggregator may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpressionContext {
    /// Part of a conjunction that filters rows directly.
    FilterAnd,
    /// Part of a conjunction that also contains HAVING predicates.
    FilterAndWithHavingClause,
    /// Part of a disjunction.
    FilterOr,
    /// A value, e.g. an ordering key.
    ValueExpression,
}

impl ExpressionContext {
    /// Whether a relationship filter can be pushed into the row-level WHERE.
    pub fn allows_join_filtering(&self) -> bool {
        matches!(self, ExpressionContext::FilterAnd)
    }

    /// Context for the children of an AND junction compiled in this context.
    pub fn for_conjunction(&self) -> Self {
        match self {
            ExpressionContext::FilterOr => ExpressionContext::FilterOr,
            ExpressionContext::FilterAndWithHavingClause => {
                ExpressionContext::FilterAndWithHavingClause
            }
            ExpressionContext::FilterAnd | ExpressionContext::ValueExpression => {
                ExpressionContext::FilterAnd
            }
        }
    }
}
