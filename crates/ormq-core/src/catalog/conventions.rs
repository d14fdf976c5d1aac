//! Storage reflection: mapping entity property names to storage names.

use std::collections::HashMap;
use std::fmt;

use super::EntityDef;
use crate::config::ConventionsConfig;

/// Name mapping between an entity and its storage table.
pub trait StorageReflection: fmt::Debug + Send + Sync {
    /// The storage table name.
    fn storage_name(&self) -> &str;

    /// Map an entity property name to its storage column.
    fn convert_entity_to_storage_key(&self, key: &str) -> String;

    /// Map a storage column back to the entity property name.
    fn convert_storage_to_entity_key(&self, key: &str) -> String;

    /// The primary key columns.
    fn storage_primary_key(&self) -> &[String];

    /// Link table of a many-to-many relationship owned by this entity.
    fn many_has_many_storage_name(&self, target: &dyn StorageReflection) -> String;

    /// Link table columns referencing this entity and the target, in that order.
    fn many_has_many_storage_primary_keys(&self, target: &dyn StorageReflection)
        -> (String, String);
}

/// Convention-based storage reflection for one entity.
///
/// Tables and columns are the snake_case entity and property names. Owned
/// to-one relationships map to `{property}{fk_suffix}`, and many-to-many link
/// tables are `{source}{separator}{target}`.
#[derive(Debug, Clone, PartialEq)]
pub struct Conventions {
    table: String,
    primary_key: Vec<String>,
    to_storage: HashMap<String, String>,
    to_entity: HashMap<String, String>,
    config: ConventionsConfig,
}

impl Conventions {
    /// Build the conventions for an entity.
    pub fn new(entity: &EntityDef, config: &ConventionsConfig) -> Self {
        let table = entity
            .storage_name
            .clone()
            .unwrap_or_else(|| config.convert_name(&entity.name));

        let mut to_storage = HashMap::new();
        for field in &entity.fields {
            let column = field
                .column
                .clone()
                .unwrap_or_else(|| config.convert_name(&field.name));
            to_storage.insert(field.name.clone(), column);
        }
        for relation in entity.relations.iter().filter(|r| r.has_foreign_key()) {
            let column = format!(
                "{}{}",
                config.convert_name(&relation.name),
                config.foreign_key_suffix
            );
            to_storage.insert(relation.name.clone(), column);
        }

        let to_entity = to_storage
            .iter()
            .map(|(property, column)| (column.clone(), property.clone()))
            .collect();

        let primary_key = entity
            .identity_fields
            .iter()
            .map(|name| {
                to_storage
                    .get(name)
                    .cloned()
                    .unwrap_or_else(|| config.convert_name(name))
            })
            .collect();

        Self {
            table,
            primary_key,
            to_storage,
            to_entity,
            config: config.clone(),
        }
    }
}

impl StorageReflection for Conventions {
    fn storage_name(&self) -> &str {
        &self.table
    }

    fn convert_entity_to_storage_key(&self, key: &str) -> String {
        self.to_storage
            .get(key)
            .cloned()
            .unwrap_or_else(|| self.config.convert_name(key))
    }

    fn convert_storage_to_entity_key(&self, key: &str) -> String {
        self.to_entity
            .get(key)
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }

    fn storage_primary_key(&self) -> &[String] {
        &self.primary_key
    }

    fn many_has_many_storage_name(&self, target: &dyn StorageReflection) -> String {
        format!(
            "{}{}{}",
            self.table,
            self.config.many_has_many_separator,
            target.storage_name()
        )
    }

    fn many_has_many_storage_primary_keys(
        &self,
        target: &dyn StorageReflection,
    ) -> (String, String) {
        let suffix = &self.config.foreign_key_suffix;
        (
            format!("{}{suffix}", self.table),
            format!("{}{suffix}", target.storage_name()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{FieldDef, FieldType, RelationDef, ScalarType};

    fn book() -> EntityDef {
        EntityDef::new("Book", "id")
            .with_field(FieldDef::new("id", FieldType::scalar(ScalarType::Int64)))
            .with_field(FieldDef::new("publishedAt", FieldType::scalar(ScalarType::Timestamp)))
            .with_field(FieldDef::new("isbn", FieldType::scalar(ScalarType::String)).with_column("code"))
            .with_relation(RelationDef::many_to_one("mainAuthor", "Book", "Author"))
            .with_relation(RelationDef::many_to_many("tags", "Book", "Tag"))
    }

    #[test]
    fn test_column_names() {
        let conventions = Conventions::new(&book(), &ConventionsConfig::default());

        assert_eq!(conventions.storage_name(), "book");
        assert_eq!(conventions.convert_entity_to_storage_key("publishedAt"), "published_at");
        assert_eq!(conventions.convert_entity_to_storage_key("isbn"), "code");
        assert_eq!(conventions.convert_entity_to_storage_key("mainAuthor"), "main_author_id");
        assert_eq!(conventions.storage_primary_key(), &["id".to_string()]);
    }

    #[test]
    fn test_storage_to_entity_keys() {
        let conventions = Conventions::new(&book(), &ConventionsConfig::default());

        assert_eq!(conventions.convert_storage_to_entity_key("published_at"), "publishedAt");
        assert_eq!(conventions.convert_storage_to_entity_key("main_author_id"), "mainAuthor");
        assert_eq!(conventions.convert_storage_to_entity_key("unknown"), "unknown");
    }

    #[test]
    fn test_many_has_many_names() {
        let config = ConventionsConfig::default();
        let book = Conventions::new(&book(), &config);
        let tag = Conventions::new(
            &EntityDef::new("Tag", "id").with_storage_name("tags"),
            &config,
        );

        assert_eq!(book.many_has_many_storage_name(&tag), "book_x_tags");
        assert_eq!(
            book.many_has_many_storage_primary_keys(&tag),
            ("book_id".to_string(), "tags_id".to_string())
        );
    }

    #[test]
    fn test_custom_config() {
        let config = ConventionsConfig::default()
            .with_snake_case(false)
            .with_foreign_key_suffix("Id");
        let conventions = Conventions::new(&book(), &config);

        assert_eq!(conventions.storage_name(), "Book");
        assert_eq!(conventions.convert_entity_to_storage_key("publishedAt"), "publishedAt");
        assert_eq!(conventions.convert_entity_to_storage_key("mainAuthor"), "mainAuthorId");
    }
}
