//! Property path resolution.

use std::sync::Arc;

use ormq_proto::PATH_SEPARATOR;

use crate::catalog::{MetadataProvider, PropertyMetadata, RelationDef};
use crate::config::CollectionConfig;
use crate::error::Error;

/// A property path resolved against the entity model.
///
/// `books->tags->name` resolved from `Author` has the hops `Author.books` and
/// `Book.tags`, and the final property `Tag.name`.
#[derive(Debug, Clone)]
pub struct ResolvedPath {
    path: String,
    hops: Vec<Arc<PropertyMetadata>>,
    property: Arc<PropertyMetadata>,
    to_many: bool,
}

impl ResolvedPath {
    /// Resolve `path` starting at `entity`. Unknown names fail immediately.
    pub fn resolve(
        metadata: &dyn MetadataProvider,
        entity: &str,
        path: &str,
        config: &CollectionConfig,
    ) -> Result<Self, Error> {
        let segments: Vec<&str> = path.split(PATH_SEPARATOR).map(str::trim).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(Error::InvalidArgument(format!(
                "property path `{path}` has an empty segment"
            )));
        }
        let Some((last, relations)) = segments.split_last() else {
            return Err(Error::InvalidArgument("empty property path".into()));
        };
        if relations.len() > config.max_path_depth {
            return Err(Error::InvalidArgument(format!(
                "property path `{path}` crosses {} relationships, at most {} are allowed",
                relations.len(),
                config.max_path_depth
            )));
        }

        let mut current = entity.to_string();
        let mut hops = Vec::with_capacity(relations.len());
        let mut to_many = false;
        for name in relations {
            let property = metadata.property(&current, name)?;
            let relation = property.relationship().ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "`{current}.{name}` is not a relationship and cannot be traversed in `{path}`"
                ))
            })?;
            to_many |= relation.is_to_many();
            current = relation.to_entity.clone();
            hops.push(property);
        }

        let property = metadata.property(&current, last)?;
        if let Some(relation) = property.relationship() {
            to_many |= relation.is_to_many();
        }

        Ok(Self {
            path: path.to_string(),
            hops,
            property,
            to_many,
        })
    }

    /// The path as written.
    pub fn as_str(&self) -> &str {
        &self.path
    }

    /// Relationship hops before the final property.
    pub fn hops(&self) -> &[Arc<PropertyMetadata>] {
        &self.hops
    }

    /// The relationship of each hop.
    pub fn hop_relations(&self) -> impl Iterator<Item = Result<&RelationDef, Error>> {
        self.hops.iter().map(|hop| {
            hop.relationship().ok_or_else(|| {
                Error::InvalidState(format!("hop `{}` is not a relationship", hop.name))
            })
        })
    }

    /// The final property.
    pub fn property(&self) -> &Arc<PropertyMetadata> {
        &self.property
    }

    /// Whether evaluating the path may yield several values.
    pub fn is_to_many(&self) -> bool {
        self.to_many
    }
}
