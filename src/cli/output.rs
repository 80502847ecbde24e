use crate::cli::OutputFormat;
use crate::error::ValidationError;
use crate::manager::Listing;
use crate::schema::RawEntity;
use colored::Colorize;
use comfy_table::{Cell, ContentArrangement, Table};
use serde_json::Value;
use std::collections::BTreeMap;

/// Render a fetched collection
pub fn format_listing(listing: &Listing<RawEntity>, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(&listing.items).unwrap_or_else(|_| "[]".to_string())
        }
        OutputFormat::Table => {
            if listing.items.is_empty() {
                return "No entities found.".to_string();
            }

            let mut columns: Vec<&str> = Vec::new();
            for item in &listing.items {
                for key in item.keys() {
                    if !columns.contains(&key.as_str()) {
                        columns.push(key);
                    }
                }
            }

            let mut table = Table::new();
            table.set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(columns.iter().map(|c| Cell::new(c)));
            for item in &listing.items {
                table.add_row(
                    columns
                        .iter()
                        .map(|c| Cell::new(item.get(*c).map(cell_text).unwrap_or_default())),
                );
            }
            format!("{table}\n{} entit{}", listing.items.len(), plural(listing.items.len()))
        }
    }
}

/// Render a single entity
pub fn format_entity(entity: &RawEntity, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(entity).unwrap_or_else(|_| "{}".to_string())
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table.set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(vec!["Field", "Value"]);
            for (key, value) in entity {
                table.add_row(vec![Cell::new(key), Cell::new(cell_text(value))]);
            }
            table.to_string()
        }
    }
}

/// Report items skipped by a lenient fetch on stderr
pub fn print_skipped(invalid: &BTreeMap<usize, ValidationError>) {
    for (index, error) in invalid {
        eprintln!(
            "{} skipped item {}: {}",
            "Warning:".yellow().bold(),
            index,
            error.source
        );
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "y" } else { "ies" }
}
