//! Property path compilation to column references and joins.

use std::collections::HashMap;
use std::sync::Arc;

use ormq_proto::{Aggregator, PATH_SEPARATOR};
use tracing::trace;

use super::join::{JoinRegistry, TableJoin};
use super::path::ResolvedPath;
use super::result::SqlExpressionResult;
use crate::catalog::{Cardinality, MetadataProvider, PropertyKind, RelationDef, StorageReflection};
use crate::config::CollectionConfig;
use crate::error::Error;

/// Compiles property paths of one root entity into SQL.
///
/// Holds the join registry of a single query compilation.
pub struct SqlHelper<'a> {
    metadata: &'a dyn MetadataProvider,
    entity: &'a str,
    config: &'a CollectionConfig,
    root: Arc<dyn StorageReflection>,
    registry: JoinRegistry,
    /// Read sites seen per aggregation key, in first-use order.
    sites: HashMap<String, Vec<usize>>,
}

impl<'a> SqlHelper<'a> {
    pub fn new(
        metadata: &'a dyn MetadataProvider,
        entity: &'a str,
        config: &'a CollectionConfig,
    ) -> Result<Self, Error> {
        Ok(Self {
            metadata,
            entity,
            config,
            root: metadata.conventions(entity)?,
            registry: JoinRegistry::new(),
            sites: HashMap::new(),
        })
    }

    /// The root entity name.
    pub fn entity(&self) -> &str {
        self.entity
    }

    /// Alias of the root table; the table name itself.
    pub fn root_alias(&self) -> &str {
        self.root.storage_name()
    }

    /// Qualified primary key columns of the root table.
    pub fn root_primary_key(&self) -> Vec<String> {
        self.root
            .storage_primary_key()
            .iter()
            .map(|column| format!("{}.{column}", self.root_alias()))
            .collect()
    }

    /// Number of relationship hops joined so far.
    pub fn join_count(&self) -> usize {
        self.registry.len()
    }

    /// Compile `path`, read at `site`, into a column reference plus the
    /// joins it reads from.
    ///
    /// Join aliases are the path segments joined with `_`. To-one hops are
    /// shared by every read of the same path. Once a to-many relationship is
    /// crossed the site key is appended: the aggregation key for the first
    /// site using it, then `{key}_2`, `{key}_3`, ... for later sites. The
    /// result of a to-many path carries the aggregator (`aggregator` or the
    /// configured default) and is a having-clause expression until the
    /// aggregator is applied.
    pub fn fetch(
        &mut self,
        path: &ResolvedPath,
        aggregator: Option<&Aggregator>,
        site: usize,
    ) -> Result<SqlExpressionResult, Error> {
        let effective = path
            .is_to_many()
            .then(|| aggregator.cloned().unwrap_or_else(|| self.config.default_aggregator()));
        let key = effective
            .as_ref()
            .map(|aggregator| self.site_key(aggregator.aggregate_key(), site));
        let key = key.as_deref();

        let mut alias = self.root_alias().to_string();
        let mut reflection = self.root.clone();
        let mut segments: Vec<&str> = Vec::new();
        let mut crossed = false;
        let mut nullable = false;
        let mut joins = Vec::new();

        for relation in path.hop_relations() {
            let relation = relation?;
            segments.push(&relation.name);
            crossed |= relation.is_to_many();
            nullable |= relation.nullable || !relation.has_foreign_key();

            let hop_key = if crossed { key } else { None };
            let (to_alias, built) = self.join(&alias, relation, &segments, hop_key, crossed)?;
            joins.extend(built);
            alias = to_alias;
            reflection = self.metadata.conventions(&relation.to_entity)?;
        }

        let property = path.property();
        let columns = match &property.kind {
            PropertyKind::Field(field) => {
                vec![format!("{alias}.{}", reflection.convert_entity_to_storage_key(&field.name))]
            }
            PropertyKind::Relation(relation) if relation.has_foreign_key() => {
                vec![format!("{alias}.{}", reflection.convert_entity_to_storage_key(&relation.name))]
            }
            PropertyKind::Relation(relation) => {
                segments.push(&relation.name);
                crossed |= relation.is_to_many();
                let hop_key = if crossed { key } else { None };
                let (to_alias, built) =
                    self.join(&alias, relation, &segments, hop_key, crossed)?;
                joins.extend(built);
                self.metadata
                    .conventions(&relation.to_entity)?
                    .storage_primary_key()
                    .iter()
                    .map(|column| format!("{to_alias}.{column}"))
                    .collect()
            }
        };

        let mut result = SqlExpressionResult::column(columns).with_joins(joins);
        if !crossed {
            result.group_by = result.columns.clone();
        }
        let mut result = result.with_property(property.clone());
        result.nullable |= nullable;

        if crossed {
            result = result.with_aggregation(effective, true)?;
        }
        Ok(result)
    }

    fn site_key(&mut self, aggregation_key: &str, site: usize) -> String {
        let sites = self.sites.entry(aggregation_key.to_string()).or_default();
        let ordinal = match sites.iter().position(|&seen| seen == site) {
            Some(ordinal) => ordinal,
            None => {
                sites.push(site);
                sites.len() - 1
            }
        };
        match ordinal {
            0 => aggregation_key.to_string(),
            n => format!("{aggregation_key}_{}", n + 1),
        }
    }

    fn join(
        &mut self,
        from_alias: &str,
        relation: &RelationDef,
        segments: &[&str],
        key: Option<&str>,
        to_many: bool,
    ) -> Result<(String, Vec<TableJoin>), Error> {
        let mut alias = segments.join("_");
        if let Some(key) = key {
            alias = format!("{alias}_{key}");
        }
        let metadata = self.metadata;
        let joins = self.registry.get_or_try_insert_with(
            &segments.join(PATH_SEPARATOR),
            key,
            || build_relation_joins(metadata, from_alias, relation, &alias, to_many),
        )?;
        Ok((alias, joins))
    }
}

/// The joins reaching the target of `relation` from the table aliased `from_alias`.
fn build_relation_joins(
    metadata: &dyn MetadataProvider,
    from_alias: &str,
    relation: &RelationDef,
    alias: &str,
    to_many: bool,
) -> Result<Vec<TableJoin>, Error> {
    let source = metadata.conventions(&relation.from_entity)?;
    let target = metadata.conventions(&relation.to_entity)?;
    let target_key = single_key(target.as_ref())?;
    trace!(relation = %relation.name, alias = %alias, "joining relationship");

    let to_join = |on_expression: String| TableJoin {
        to_expression: target.storage_name().to_string(),
        to_args: Vec::new(),
        to_alias: alias.to_string(),
        on_expression,
        on_args: Vec::new(),
        to_primary_key: Some(format!("{alias}.{target_key}")),
        to_many,
        conventions: target.clone(),
    };

    match relation.cardinality {
        Cardinality::ManyToOne | Cardinality::OneToOne if relation.has_foreign_key() => {
            let foreign_key = source.convert_entity_to_storage_key(&relation.name);
            Ok(vec![to_join(format!(
                "{alias}.{target_key} = {from_alias}.{foreign_key}"
            ))])
        }
        Cardinality::OneToMany | Cardinality::OneToOne => {
            let inverse = inverse_of(relation)?;
            let source_key = single_key(source.as_ref())?;
            let foreign_key = target.convert_entity_to_storage_key(inverse);
            Ok(vec![to_join(format!(
                "{alias}.{foreign_key} = {from_alias}.{source_key}"
            ))])
        }
        Cardinality::ManyToMany => {
            let source_key = single_key(source.as_ref())?;
            let (table, source_column, target_column) = if relation.is_main {
                let (source_column, target_column) =
                    source.many_has_many_storage_primary_keys(target.as_ref());
                (
                    source.many_has_many_storage_name(target.as_ref()),
                    source_column,
                    target_column,
                )
            } else {
                let (target_column, source_column) =
                    target.many_has_many_storage_primary_keys(source.as_ref());
                (
                    target.many_has_many_storage_name(source.as_ref()),
                    source_column,
                    target_column,
                )
            };

            let link = format!("{alias}_link");
            let link_join = TableJoin {
                to_expression: table,
                to_args: Vec::new(),
                to_alias: link.clone(),
                on_expression: format!("{link}.{source_column} = {from_alias}.{source_key}"),
                on_args: Vec::new(),
                to_primary_key: None,
                to_many,
                conventions: target.clone(),
            };
            Ok(vec![
                link_join,
                to_join(format!("{alias}.{target_key} = {link}.{target_column}")),
            ])
        }
        Cardinality::ManyToOne => Err(Error::InvalidArgument(format!(
            "many-to-one relationship `{}.{}` must own its foreign key",
            relation.from_entity, relation.name
        ))),
    }
}

fn single_key(conventions: &dyn StorageReflection) -> Result<&str, Error> {
    match conventions.storage_primary_key() {
        [column] => Ok(column),
        columns => Err(Error::InvalidArgument(format!(
            "table `{}` needs a single-column primary key to be joined, found {}",
            conventions.storage_name(),
            columns.len()
        ))),
    }
}

fn inverse_of(relation: &RelationDef) -> Result<&str, Error> {
    relation.inverse.as_deref().ok_or_else(|| {
        Error::InvalidArgument(format!(
            "relationship `{}.{}` has no inverse side to join on",
            relation.from_entity, relation.name
        ))
    })
}
