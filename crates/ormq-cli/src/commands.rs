//! Subcommand implementations.

use std::path::{Path, PathBuf};

use ormq_core::{ArrayCollection, Catalog, EntityGraph, SqlCollection};
use ormq_proto::Filter;
use thiserror::Error;
use tracing::{debug, info};

use crate::formatter::Formatter;

/// CLI errors.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Core(#[from] ormq_core::Error),

    #[error(transparent)]
    Protocol(#[from] ormq_proto::Error),
}

fn read(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Load the catalog and filter shared by every subcommand.
pub fn load(schema: &Path, filter: &Path) -> Result<(Catalog, Filter), CliError> {
    let catalog = Catalog::from_json(&read(schema)?)?;
    let filter = Filter::from_json(&read(filter)?)?;
    debug!(
        schema = %schema.display(),
        entities = catalog.schema().entities.len(),
        "loaded schema"
    );
    Ok((catalog, filter))
}

/// Compile the filter into SQL.
pub fn sql(
    schema: &Path,
    filter: &Path,
    entity: &str,
    formatter: &dyn Formatter,
) -> Result<String, CliError> {
    let (catalog, filter) = load(schema, filter)?;
    let query = SqlCollection::new(&catalog, entity)?.to_sql(&filter)?;
    info!(entity, params = query.params.len(), "compiled filter");
    Ok(formatter.format_query(&query))
}

/// Evaluate the filter against a JSON data set with the array backend.
pub fn eval(
    schema: &Path,
    filter: &Path,
    data: &Path,
    entity: &str,
    formatter: &dyn Formatter,
) -> Result<String, CliError> {
    let (catalog, filter) = load(schema, filter)?;
    let graph = EntityGraph::from_json(&catalog, &read(data)?)?;
    let rows = ArrayCollection::new(&catalog, &graph, entity)?.fetch_json(&filter)?;
    info!(entity, rows = rows.len(), "evaluated filter");
    Ok(formatter.format_rows(&rows))
}
