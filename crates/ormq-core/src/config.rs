//! Configuration for storage naming and collection evaluation.

use heck::ToSnakeCase;
use ormq_proto::aggregator::ANY_KEY;
use ormq_proto::Aggregator;
use serde::{Deserialize, Serialize};

/// Naming conventions used to derive storage names from the entity model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConventionsConfig {
    /// Suffix appended to a relationship property to name its foreign key column.
    pub foreign_key_suffix: String,

    /// Separator between the two table names of a many-to-many link table.
    pub many_has_many_separator: String,

    /// Convert camelCase names to snake_case storage names.
    pub snake_case: bool,
}

impl Default for ConventionsConfig {
    fn default() -> Self {
        Self {
            foreign_key_suffix: "_id".to_string(),
            many_has_many_separator: "_x_".to_string(),
            snake_case: true,
        }
    }
}

impl ConventionsConfig {
    /// Set the foreign key suffix.
    pub fn with_foreign_key_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.foreign_key_suffix = suffix.into();
        self
    }

    /// Set the many-to-many link table separator.
    pub fn with_many_has_many_separator(mut self, separator: impl Into<String>) -> Self {
        self.many_has_many_separator = separator.into();
        self
    }

    /// Enable or disable snake_case conversion.
    pub fn with_snake_case(mut self, enabled: bool) -> Self {
        self.snake_case = enabled;
        self
    }

    /// Convert an entity-level name to its storage form.
    pub fn convert_name(&self, name: &str) -> String {
        if self.snake_case {
            name.to_snake_case()
        } else {
            name.to_string()
        }
    }
}

/// Limits and defaults applied when evaluating a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionConfig {
    /// Maximum number of relationship hops in a property path.
    pub max_path_depth: usize,

    /// Aggregation key used when a to-many relationship is crossed without
    /// an explicit aggregator.
    pub default_aggregation_key: String,

    /// Limit applied when the filter sets none.
    pub default_limit: Option<u64>,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            max_path_depth: 8,
            default_aggregation_key: ANY_KEY.to_string(),
            default_limit: None,
        }
    }
}

impl CollectionConfig {
    /// Set the maximum path depth.
    pub fn with_max_path_depth(mut self, depth: usize) -> Self {
        self.max_path_depth = depth;
        self
    }

    /// Set the default aggregation key.
    pub fn with_default_aggregation_key(mut self, key: impl Into<String>) -> Self {
        self.default_aggregation_key = key.into();
        self
    }

    /// Set the default limit.
    pub fn with_default_limit(mut self, limit: u64) -> Self {
        self.default_limit = Some(limit);
        self
    }

    /// The implicit aggregator for to-many relationships.
    pub fn default_aggregator(&self) -> Aggregator {
        Aggregator::any_with_key(self.default_aggregation_key.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snake_case() {
        let config = ConventionsConfig::default();

        assert_eq!(config.convert_name("Author"), "author");
        assert_eq!(config.convert_name("BookTag"), "book_tag");
        assert_eq!(config.convert_name("publishedAt"), "published_at");
        assert_eq!(config.convert_name("HTTPServer"), "http_server");
        assert_eq!(config.convert_name("isbn13Code"), "isbn13_code");
        assert_eq!(config.convert_name("already_snake"), "already_snake");
        assert_eq!(config.convert_name("XMLHttpRequest"), "xml_http_request");
        assert_eq!(config.convert_name("shelf-label"), "shelf_label");
        assert_eq!(config.convert_name("ÉditionNumber"), "édition_number");

        let verbatim = ConventionsConfig::default().with_snake_case(false);
        assert_eq!(verbatim.convert_name("publishedAt"), "publishedAt");
    }

    #[test]
    fn test_collection_defaults() {
        let config = CollectionConfig::default();

        assert_eq!(config.max_path_depth, 8);
        assert_eq!(config.default_limit, None);
        assert_eq!(config.default_aggregator(), Aggregator::any());

        let custom = config.with_default_aggregation_key("implicit").with_default_limit(50);
        assert_eq!(custom.default_aggregator().aggregate_key(), "implicit");
        assert_eq!(custom.default_limit, Some(50));
    }
}
