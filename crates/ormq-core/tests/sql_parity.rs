//! Runs the compiled SQL on an in-memory SQLite copy of the library fixture
//! and checks it returns the same rows as the array backend.

mod common;

use common::{TestContext, LIBRARY_DDL};
use ormq_core::SqlQuery;
use ormq_proto::{Aggregator, Filter, LikeMode, Value, ValueExpression};
use pretty_assertions::assert_eq;
use rusqlite::{types::Value as SqlValue, Connection};

struct Parity {
    ctx: TestContext,
    conn: Connection,
}

impl Parity {
    fn new() -> Self {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA case_sensitive_like = ON;").unwrap();
        conn.execute_batch(LIBRARY_DDL).unwrap();
        Self {
            ctx: TestContext::new(),
            conn,
        }
    }

    fn run(&self, query: &SqlQuery) -> Vec<i64> {
        let mut stmt = self.conn.prepare(&query.sql).unwrap();
        let params = query.params.iter().map(|p| to_sql_value(&p.value));
        stmt.query_map(rusqlite::params_from_iter(params), |row| row.get::<_, i64>("id"))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    /// Asserts both backends agree and returns the shared identities.
    fn check(&self, entity: &str, filter: &Filter) -> Vec<i64> {
        let query = self.ctx.sql(entity).to_sql(filter).unwrap();
        let mut from_sql = self.run(&query);
        let mut from_array = self.ctx.ids(entity, filter);

        if filter.order_filter().is_empty() {
            from_sql.sort_unstable();
            from_array.sort_unstable();
        }

        assert_eq!(from_sql, from_array, "backends disagree on {}", query.sql);
        from_array
    }
}

fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Int32(n) => SqlValue::Integer(i64::from(*n)),
        Value::Int64(n) | Value::Timestamp(n) => SqlValue::Integer(*n),
        Value::Float32(f) => SqlValue::Real(f64::from(*f)),
        Value::Float64(f) => SqlValue::Real(*f),
        Value::String(s) => SqlValue::Text(s.clone()),
        Value::Bytes(b) => SqlValue::Blob(b.clone()),
        Value::Uuid(u) => SqlValue::Blob(u.to_vec()),
        Value::List(_) => panic!("list parameters are expanded by the compiler"),
    }
}

#[test]
fn test_same_path_conjunction_matches_rows_independently() {
    let parity = Parity::new();

    // Orm and The Hobbit each satisfy one side for Tolkien.
    let filter = Filter::new().find(|f| f.eq("books->title", "Orm").gt("books->pages", 200));
    assert_eq!(parity.check("Author", &filter), vec![1]);

    let filter = Filter::new().find(|f| {
        f.eq("books->tags->name", "fantasy")
            .eq("books->tags->name", "scifi")
    });
    assert_eq!(parity.check("Author", &filter), vec![3]);
}

#[test]
fn test_sibling_folds_keep_their_own_predicates() {
    let parity = Parity::new();
    let filter = Filter::new().find(|f| {
        f.eq("books->title", "Orm")
            .gt("books->pages", 200)
            .and_aggregated(Aggregator::none(), |g| g.eq("books->title", "Dune"))
    });

    assert_eq!(parity.check("Author", &filter), vec![1]);

    let filter = Filter::new().find(|f| {
        f.or(|g| g.eq("books->title", "Foundation").eq("name", "nobody"))
            .or(|g| g.gt("books->pages", 500).eq("name", "nobody"))
    });
    assert!(parity.check("Author", &filter).is_empty());
}

#[test]
fn test_count_beside_another_to_many_join() {
    let parity = Parity::new();

    let filter = Filter::new().find(|f| {
        f.and_aggregated(Aggregator::count(Some(2), None).unwrap(), |g| {
            g.gt("books->pages", 200)
        })
        .or(|g| g.gt("books->pages", 100).eq("name", "nobody"))
    });
    assert!(parity.check("Author", &filter).is_empty());

    let filter = Filter::new().find(|f| {
        f.and_aggregated(Aggregator::count(Some(2), None).unwrap(), |g| {
            g.gt("books->pages", 100)
        })
        .or(|g| g.eq("books->tags->name", "scifi").eq("name", "Clarke"))
    });
    assert_eq!(parity.check("Author", &filter), vec![2]);
}

#[test]
fn test_numeric_beside_another_to_many_join() {
    let parity = Parity::new();

    let filter = Filter::new().find(|f| {
        f.le(ValueExpression::sum("books->pages"), 450i64)
            .eq("books->tags->name", "classic")
    });
    assert_eq!(parity.check("Author", &filter), vec![1, 2]);

    let filter = Filter::new().find(|f| {
        f.or(|g| {
            g.gt(ValueExpression::avg("books->price"), 11.0)
                .eq("books->tags->name", "fantasy")
        })
    });
    assert_eq!(parity.check("Author", &filter), vec![1, 3]);
}

#[test]
fn test_aggregates_across_two_to_many_hops() {
    let parity = Parity::new();

    let filter = Filter::new().find(|f| {
        f.and_aggregated(Aggregator::count(Some(3), None).unwrap(), |g| {
            g.gt("authors->books->tags->id", 0)
        })
    });
    assert_eq!(parity.check("Publisher", &filter), vec![1]);

    let filter =
        Filter::new().find(|f| f.gt(ValueExpression::sum("authors->books->pages"), 1000i64));
    assert_eq!(parity.check("Publisher", &filter), vec![1]);

    let filter =
        Filter::new().find(|f| f.ge(ValueExpression::max("authors->books->pages"), 600i64));
    assert_eq!(parity.check("Publisher", &filter), vec![1]);
}

#[test]
fn test_fold_aggregators() {
    let parity = Parity::new();

    let filter = Filter::new()
        .find(|f| f.and_aggregated(Aggregator::none(), |g| g.eq("books->title", "Orm")));
    assert_eq!(parity.check("Author", &filter), vec![2, 3, 4]);

    let filter = Filter::new().find(|f| {
        f.and_aggregated(Aggregator::count(Some(2), None).unwrap(), |g| g.gt("tags->id", 0))
    });
    assert_eq!(parity.check("Book", &filter), vec![1, 3]);

    let filter = Filter::new().find(|f| f.eq("books->tags->name", "scifi"));
    assert_eq!(parity.check("Author", &filter), vec![2, 3]);
}

#[test]
fn test_ordering_and_limits() {
    let parity = Parity::new();

    let filter = Filter::new()
        .order(|o| o.desc(ValueExpression::sum("books->pages")).asc("name"))
        .limit(2, None);
    assert_eq!(parity.check("Author", &filter), vec![3, 2]);

    let filter = Filter::new().order(|o| o.asc("author->name").desc("id"));
    assert_eq!(parity.check("Book", &filter), vec![5, 2, 3, 4, 1]);

    let filter = Filter::new().order(|o| o.asc("price")).limit(3, None);
    assert_eq!(parity.check("Book", &filter), vec![5, 2, 1]);
}

#[test]
fn test_like_and_null_handling() {
    let parity = Parity::new();

    let filter = Filter::new().find(|f| f.starts_with("title", "The"));
    assert_eq!(parity.check("Book", &filter), vec![1]);

    let filter = Filter::new().find(|f| f.like("title", LikeMode::Raw, "%o%"));
    assert_eq!(parity.check("Book", &filter), vec![1, 2, 5]);

    let filter = Filter::new().find(|f| f.contains("title", ", R"));
    assert_eq!(parity.check("Book", &filter), vec![5]);

    let filter = Filter::new().find(|f| f.eq("email", Value::Null));
    assert_eq!(parity.check("Author", &filter), vec![2, 3]);

    let filter = Filter::new().find(|f| f.ne("price", 12.0));
    assert_eq!(parity.check("Book", &filter), vec![1, 2, 4, 5]);
}
