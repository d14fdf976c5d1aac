//! Library fixture shared by the integration suites.

#![allow(dead_code)]

use ormq_core::{
    ArrayCollection, Catalog, EntityDef, EntityGraph, FieldDef, FieldType, RelationDef,
    ScalarType, SchemaBundle, SqlCollection,
};
use ormq_proto::Filter;

pub const LIBRARY: &str = r#"{
    "Publisher": [
        { "id": 1, "name": "Orbit" },
        { "id": 2, "name": "Tor" }
    ],
    "Author": [
        { "id": 1, "name": "Tolkien", "email": "jrr@example.com", "publisher": 1 },
        { "id": 2, "name": "Asimov", "email": null, "publisher": 2 },
        { "id": 3, "name": "Herbert", "publisher": 1 },
        { "id": 4, "name": "Clarke", "email": "arthur@example.com", "publisher": null }
    ],
    "Tag": [
        { "id": 1, "name": "fantasy" },
        { "id": 2, "name": "classic" },
        { "id": 3, "name": "scifi" }
    ],
    "Book": [
        { "id": 1, "title": "The Hobbit", "author": 1, "price": 10.0, "pages": 300, "tags": [1, 2] },
        { "id": 2, "title": "Foundation", "author": 2, "price": 8.0, "pages": 250, "tags": [2] },
        { "id": 3, "title": "Dune", "author": 3, "price": 12.0, "pages": 600, "tags": [1, 2, 3] },
        { "id": 4, "title": "Orm", "author": 1, "price": 20.0, "pages": 150, "tags": [] },
        { "id": 5, "title": "I, Robot", "author": 2, "price": null, "pages": 200, "tags": [3] }
    ]
}"#;

/// The same rows as [`LIBRARY`], as tables named the way the SQL backend names them.
pub const LIBRARY_DDL: &str = r#"
    CREATE TABLE publisher (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL
    );

    CREATE TABLE author (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        email TEXT,
        publisher_id INTEGER REFERENCES publisher(id)
    );

    CREATE TABLE book (
        id INTEGER PRIMARY KEY,
        title TEXT NOT NULL,
        price REAL,
        pages INTEGER NOT NULL,
        author_id INTEGER NOT NULL REFERENCES author(id)
    );

    CREATE TABLE tag (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL
    );

    CREATE TABLE book_x_tag (
        book_id INTEGER NOT NULL REFERENCES book(id),
        tag_id INTEGER NOT NULL REFERENCES tag(id),
        PRIMARY KEY (book_id, tag_id)
    );

    INSERT INTO publisher (id, name) VALUES (1, 'Orbit'), (2, 'Tor');

    INSERT INTO author (id, name, email, publisher_id) VALUES
        (1, 'Tolkien', 'jrr@example.com', 1),
        (2, 'Asimov', NULL, 2),
        (3, 'Herbert', NULL, 1),
        (4, 'Clarke', 'arthur@example.com', NULL);

    INSERT INTO tag (id, name) VALUES (1, 'fantasy'), (2, 'classic'), (3, 'scifi');

    INSERT INTO book (id, title, price, pages, author_id) VALUES
        (1, 'The Hobbit', 10.0, 300, 1),
        (2, 'Foundation', 8.0, 250, 2),
        (3, 'Dune', 12.0, 600, 3),
        (4, 'Orm', 20.0, 150, 1),
        (5, 'I, Robot', NULL, 200, 2);

    INSERT INTO book_x_tag (book_id, tag_id) VALUES
        (1, 1), (1, 2), (2, 2), (3, 1), (3, 2), (3, 3), (5, 3);
"#;

pub struct TestContext {
    pub catalog: Catalog,
    pub graph: EntityGraph,
}

impl TestContext {
    pub fn new() -> Self {
        let catalog = Catalog::new(library_schema()).unwrap();
        let graph = EntityGraph::from_json(&catalog, LIBRARY).unwrap();
        Self { catalog, graph }
    }

    /// Identities of the rows the array backend returns.
    pub fn ids(&self, entity: &str, filter: &Filter) -> Vec<i64> {
        ArrayCollection::new(&self.catalog, &self.graph, entity)
            .unwrap()
            .fetch(filter)
            .unwrap()
            .into_iter()
            .filter_map(|row| row.get("id").as_i64())
            .collect()
    }

    pub fn sql<'s>(&'s self, entity: &'s str) -> SqlCollection<'s> {
        SqlCollection::new(&self.catalog, entity).unwrap()
    }
}

pub fn library_schema() -> SchemaBundle {
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
