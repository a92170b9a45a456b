//! Response shapes produced by a grid builder.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::hooks::ColumnDefinition;
use super::request::ExportFormat;
use super::scope::CompiledQuery;

/// Row page plus the total row count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridResponse {
    pub total: u64,
    pub data: Vec<Value>,
}

impl GridResponse {
    /// Number each row with `__index`, counting from `start_row + 1`.
    pub fn add_index_column(&mut self, start_row: u64) {
        for (i, row) in self.data.iter_mut().enumerate() {
            if let Value::Object(map) = row {
                map.insert("__index".to_string(), Value::from(start_row + i as u64 + 1));
            }
        }
    }
}

/// Everything an exporter needs to write a file.
#[derive(Debug, Clone)]
pub struct ExportHandoff {
    pub format: ExportFormat,
    /// Column ids requested for export; `None` exports every defined column.
    pub columns: Option<Vec<String>>,
    pub definitions: Vec<ColumnDefinition>,
    pub query: CompiledQuery,
}

impl ExportHandoff {
    /// Suggested download file name.
    pub fn file_name(&self) -> String {
        format!("export.{}", self.format.extension())
    }

    /// Definitions narrowed to the requested columns, in definition order.
    pub fn selected_definitions(&self) -> Vec<&ColumnDefinition> {
        match self.columns {
            Some(ref columns) => self
                .definitions
                .iter()
                .filter(|d| columns.iter().any(|c| *c == d.field))
                .collect(),
            None => self.definitions.iter().collect(),
        }
    }
}

/// Result of answering a grid request.
#[derive(Debug, Clone)]
pub enum GridOutcome {
    Rows(GridResponse),
    Export(ExportHandoff),
}
