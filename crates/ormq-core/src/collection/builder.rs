//! SELECT statement assembly.

use ormq_proto::{Limit, OrderDirection};
use serde::Serialize;

use super::join::TableJoin;
use super::result::QueryParam;

/// A rendered query: SQL text with `?` placeholders and its parameters in
/// placeholder order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SqlQuery {
    pub sql: String,
    pub params: Vec<QueryParam>,
}

/// A SQL fragment with its parameters.
#[derive(Debug, Clone, PartialEq)]
struct Clause {
    sql: String,
    args: Vec<QueryParam>,
}

/// Builder for the SELECT statement of a collection query.
///
/// Clauses are rendered in SQL order, and parameters follow the same order:
/// join parameters, WHERE, HAVING, then ORDER BY.
#[derive(Debug, Clone)]
pub struct SqlQueryBuilder {
    table: String,
    alias: String,
    distinct: bool,
    joins: Vec<TableJoin>,
    where_clause: Option<Clause>,
    group_by: Vec<String>,
    having: Option<Clause>,
    order_by: Vec<Clause>,
    limit: Option<Limit>,
}

impl SqlQueryBuilder {
    /// Select all columns of `table`, aliased `alias`.
    pub fn new(table: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            alias: alias.into(),
            distinct: false,
            joins: Vec::new(),
            where_clause: None,
            group_by: Vec::new(),
            having: None,
            order_by: Vec::new(),
            limit: None,
        }
    }

    /// Use `SELECT DISTINCT`.
    pub fn with_distinct(mut self, distinct: bool) -> Self {
        self.distinct = distinct;
        self
    }

    /// Set the joins, already deduplicated.
    pub fn with_joins(mut self, joins: Vec<TableJoin>) -> Self {
        self.joins = joins;
        self
    }

    /// Set the row-level predicate.
    pub fn with_where(mut self, sql: impl Into<String>, args: Vec<QueryParam>) -> Self {
        self.where_clause = Some(Clause {
            sql: sql.into(),
            args,
        });
        self
    }

    /// Set the grouping expressions. Duplicates are dropped, keeping the
    /// first occurrence.
    pub fn with_group_by(mut self, group_by: impl IntoIterator<Item = String>) -> Self {
        self.group_by.clear();
        for expression in group_by {
            if !self.group_by.contains(&expression) {
                self.group_by.push(expression);
            }
        }
        self
    }

    /// Set the group predicate.
    pub fn with_having(mut self, sql: impl Into<String>, args: Vec<QueryParam>) -> Self {
        self.having = Some(Clause {
            sql: sql.into(),
            args,
        });
        self
    }

    /// Append an ordering expression.
    pub fn with_order_by(
        mut self,
        sql: impl AsRef<str>,
        args: Vec<QueryParam>,
        direction: OrderDirection,
    ) -> Self {
        let keyword = match direction {
            OrderDirection::Asc => "ASC",
            OrderDirection::Desc => "DESC",
        };
        self.order_by.push(Clause {
            sql: format!("{} {keyword}", sql.as_ref()),
            args,
        });
        self
    }

    /// Set the limit and offset.
    pub fn with_limit(mut self, limit: Option<Limit>) -> Self {
        self.limit = limit;
        self
    }

    pub fn is_distinct(&self) -> bool {
        self.distinct
    }

    pub fn joins(&self) -> &[TableJoin] {
        &self.joins
    }

    /// The WHERE predicate, if any.
    pub fn where_sql(&self) -> Option<&str> {
        self.where_clause.as_ref().map(|c| c.sql.as_str())
    }

    /// The HAVING predicate, if any.
    pub fn having_sql(&self) -> Option<&str> {
        self.having.as_ref().map(|c| c.sql.as_str())
    }

    pub fn group_by(&self) -> &[String] {
        &self.group_by
    }

    /// Render the statement.
    pub fn build(&self) -> SqlQuery {
        let mut sql = format!(
            "SELECT {}{}.* FROM {} AS {}",
            if self.distinct { "DISTINCT " } else { "" },
            self.alias,
            self.table,
            self.alias
        );
        let mut params = Vec::new();

        for join in &self.joins {
            sql.push(' ');
            sql.push_str(&join.to_sql());
            params.extend(join.args().cloned());
        }
        if let Some(clause) = &self.where_clause {
            sql.push_str(" WHERE ");
            sql.push_str(&clause.sql);
            params.extend(clause.args.iter().cloned());
        }
        if !self.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&self.group_by.join(", "));
        }
        if let Some(clause) = &self.having {
            sql.push_str(" HAVING ");
            sql.push_str(&clause.sql);
            params.extend(clause.args.iter().cloned());
        }
        if !self.order_by.is_empty() {
            let entries: Vec<&str> = self.order_by.iter().map(|c| c.sql.as_str()).collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&entries.join(", "));
            params.extend(self.order_by.iter().flat_map(|c| c.args.iter().cloned()));
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit.count));
            if let Some(offset) = limit.offset.filter(|offset| *offset > 0) {
                sql.push_str(&format!(" OFFSET {offset}"));
            }
        }

        SqlQuery { sql, params }
    }
}
