//! Library model shared by the collection unit tests.
//!
//! Publisher 1-n Author 1-n Book m-n Tag.

use ormq_proto::Value;

use super::graph::EntityGraph;
use crate::catalog::{Catalog, EntityDef, FieldDef, FieldType, RelationDef, ScalarType, SchemaBundle};

pub fn schema() -> SchemaBundle {
    let publisher = EntityDef::new("Publisher", "id")
        .with_field(FieldDef::new("id", FieldType::scalar(ScalarType::Int64)))
        .with_field(FieldDef::new("name", FieldType::scalar(ScalarType::String)))
        .with_relation(RelationDef::one_to_many("authors", "Publisher", "Author", "publisher"));

    let author = EntityDef::new("Author", "id")
        .with_field(FieldDef::new("id", FieldType::scalar(ScalarType::Int64)))
        .with_field(FieldDef::new("name", FieldType::scalar(ScalarType::String)))
        .with_field(FieldDef::optional("email", ScalarType::String))
        .with_relation(
            RelationDef::many_to_one("publisher", "Author", "Publisher")
                .with_inverse("authors")
                .nullable(),
        )
        .with_relation(RelationDef::one_to_many("books", "Author", "Book", "author"));

    let book = EntityDef::new("Book", "id")
        .with_field(FieldDef::new("id", FieldType::scalar(ScalarType::Int64)))
        .with_field(FieldDef::new("title", FieldType::scalar(ScalarType::String)))
        .with_field(FieldDef::optional("price", ScalarType::Float64))
        .with_field(FieldDef::new("pages", FieldType::scalar(ScalarType::Int32)))
        .with_relation(RelationDef::many_to_one("author", "Book", "Author").with_inverse("books"))
        .with_relation(RelationDef::many_to_many("tags", "Book", "Tag").with_inverse("books"));

    let tag = EntityDef::new("Tag", "id")
        .with_field(FieldDef::new("id", FieldType::scalar(ScalarType::Int64)))
        .with_field(FieldDef::new("name", FieldType::scalar(ScalarType::String)))
        .with_relation(RelationDef::many_to_many("books", "Tag", "Book").mapped_by("tags"));

    SchemaBundle::new(1)
        .with_entity(publisher)
        .with_entity(author)
        .with_entity(book)
        .with_entity(tag)
}

pub fn catalog() -> Catalog {
    Catalog::new(schema()).unwrap()
}

/// Five books by three authors, plus an author without books.
///
/// | book | title      | author  | price | pages | tags                     |
/// |------|------------|---------|-------|-------|--------------------------|
/// | 1    | The Hobbit | Tolkien | 10    | 300   | fantasy, classic         |
/// | 2    | Foundation | Asimov  | 8     | 250   | classic                  |
/// | 3    | Dune       | Herbert | 12    | 600   | fantasy, classic, scifi  |
/// | 4    | Orm        | Tolkien | 20    | 150   |                          |
/// | 5    | I, Robot   | Asimov  | null  | 200   | scifi                    |
pub fn graph(catalog: &Catalog) -> EntityGraph {
    let mut graph = EntityGraph::new();

    for (id, name) in [(1, "Orbit"), (2, "Tor")] {
        graph.insert("Publisher", [("id", Value::Int64(id)), ("name", name.into())]);
    }

    let authors = [
        (1, "Tolkien", Some("jrr@example.com"), Some(0)),
        (2, "Asimov", None, Some(1)),
        (3, "Herbert", None, Some(0)),
        (4, "Clarke", Some("arthur@example.com"), None),
    ];
    for (id, name, email, publisher) in authors {
        let row = graph.insert(
            "Author",
            [
                ("id", Value::Int64(id)),
                ("name", name.into()),
                ("email", email.into()),
            ],
        );
        if let Some(publisher) = publisher {
            graph.link(catalog, "Author", row, "publisher", publisher).unwrap();
        }
    }

    for (id, name) in [(1, "fantasy"), (2, "classic"), (3, "scifi")] {
        graph.insert("Tag", [("id", Value::Int64(id)), ("name", name.into())]);
    }

    let books: [(i64, &str, usize, Option<f64>, i32, &[usize]); 5] = [
        (1, "The Hobbit", 0, Some(10.0), 300, &[0, 1]),
        (2, "Foundation", 1, Some(8.0), 250, &[1]),
        (3, "Dune", 2, Some(12.0), 600, &[0, 1, 2]),
        (4, "Orm", 0, Some(20.0), 150, &[]),
        (5, "I, Robot", 1, None, 200, &[2]),
    ];
    for (id, title, author, price, pages, tags) in books {
        let row = graph.insert(
            "Book",
            [
                ("id", Value::Int64(id)),
                ("title", title.into()),
                ("price", price.into()),
                ("pages", Value::Int32(pages)),
            ],
        );
        graph.link(catalog, "Book", row, "author", author).unwrap();
        for &tag in tags {
            graph.link(catalog, "Book", row, "tags", tag).unwrap();
        }
    }

    graph
}
