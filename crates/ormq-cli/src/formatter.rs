//! Output formatters for compiled queries and evaluated rows.

use clap::ValueEnum;
use comfy_table::{Cell, Table};
use ormq_core::SqlQuery;

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format
    Table,
    /// JSON format
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Trait for formatting output.
pub trait Formatter {
    /// Format a compiled SQL query and its parameters.
    fn format_query(&self, query: &SqlQuery) -> String;

    /// Format rows returned by the array backend.
    fn format_rows(&self, rows: &[serde_json::Value]) -> String;
}

/// Create a formatter for the given output format.
pub fn create_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Table => Box::new(TableFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
    }
}

/// Table formatter using comfy-table.
pub struct TableFormatter;

impl Formatter for TableFormatter {
    fn format_query(&self, query: &SqlQuery) -> String {
        if query.params.is_empty() {
            return query.sql.clone();
        }

        let mut table = Table::new();
        table.set_header(vec!["#", "value", "type"]);
        for (index, param) in query.params.iter().enumerate() {
            let param_type = param
                .param_type
                .map(|t| format!("{t:?}").to_lowercase())
                .unwrap_or_default();
            table.add_row(vec![
                Cell::new(index + 1),
                Cell::new(param.value.to_string()),
                Cell::new(param_type),
            ]);
        }
        format!("{}\n\n{table}", query.sql)
    }

    fn format_rows(&self, rows: &[serde_json::Value]) -> String {
        if rows.is_empty() {
            return "No results".to_string();
        }

        let mut columns: Vec<&str> = Vec::new();
        for row in rows.iter().filter_map(serde_json::Value::as_object) {
            for key in row.keys() {
                if !columns.contains(&key.as_str()) {
                    columns.push(key);
                }
            }
        }

        let mut table = Table::new();
        table.set_header(columns.iter().map(|c| Cell::new(c)).collect::<Vec<_>>());
        for row in rows {
            let cells: Vec<Cell> = columns
                .iter()
                .map(|column| Cell::new(format_cell(row.get(*column))))
                .collect();
            table.add_row(cells);
        }

        format!("{table}\n{} row(s)", rows.len())
    }
}

/// JSON formatter.
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format_query(&self, query: &SqlQuery) -> String {
        serde_json::to_string_pretty(query).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
    }

    fn format_rows(&self, rows: &[serde_json::Value]) -> String {
        serde_json::to_string_pretty(rows).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
    }
}

fn format_cell(value: Option<&serde_json::Value>) -> String {
    match value {
        None | Some(serde_json::Value::Null) => "NULL".to_string(),
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
