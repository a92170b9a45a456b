//! Grid request wire types.
//!
//! Mirrors the JSON a data grid sends for a row fetch, a set-values lookup
//! or an export. Discriminants that select behaviour (`filterType`, `type`,
//! combinator `operator`) stay as strings here and are parsed during
//! compilation so an unknown value surfaces as a compile error.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Inbound grid request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridRequest {
    /// Column id → filter tree.
    #[serde(default, deserialize_with = "null_as_default")]
    pub filter_model: BTreeMap<String, FilterNode>,

    /// Ordered sort list; the first entry is the primary sort key.
    #[serde(default, deserialize_with = "null_as_default")]
    pub sort_model: Vec<SortModelEntry>,

    /// First row of the window (inclusive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_row: Option<u64>,

    /// End of the window (exclusive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_row: Option<u64>,

    /// Selection mode; selection filtering only applies when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_model: Option<RowModel>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub select_all: bool,

    /// Row identities toggled relative to the selection baseline.
    #[serde(default, deserialize_with = "null_as_default")]
    pub toggled_nodes: Vec<Value>,

    /// Opaque values for the entity's custom filter hook.
    #[serde(default, deserialize_with = "null_as_default")]
    pub custom_filters: Map<String, Value>,

    /// Column whose distinct values are requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_format: Option<ExportFormat>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_columns: Option<Vec<String>>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Filter tree node.
///
/// A combinator carries `operator` and `conditions` (and usually a
/// `filterType` too, which is ignored); anything else is a leaf.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterNode {
    Combinator(CombinatorFilter),
    Leaf(LeafFilter),
}

/// AND/OR group of filter nodes on the same column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombinatorFilter {
    /// `and` or `or`, case-insensitive.
    pub operator: String,
    pub conditions: Vec<FilterNode>,
}

/// Single typed filter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeafFilter {
    /// `set`, `text`, `number` or `date`.
    pub filter_type: String,

    /// Type-specific operator such as `contains` or `inRange`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_to: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_from: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_to: Option<String>,

    /// Set filter values; `null` entries select missing values.
    #[serde(default, deserialize_with = "null_as_default")]
    pub values: Vec<Value>,

    /// Set filter "match all" flag for array columns.
    #[serde(default, deserialize_with = "null_as_default")]
    pub all: bool,
}

impl LeafFilter {
    /// Leaf of the given filter type and operator.
    pub fn new(filter_type: &str, operator: &str) -> Self {
        Self {
            filter_type: filter_type.to_string(),
            operator: Some(operator.to_string()),
            ..Default::default()
        }
    }

    /// Set the primary operand.
    pub fn with_filter(mut self, value: impl Into<Value>) -> Self {
        self.filter = Some(value.into());
        self
    }

    /// Set the upper bound for range operators.
    pub fn with_filter_to(mut self, value: impl Into<Value>) -> Self {
        self.filter_to = Some(value.into());
        self
    }
}

/// Sort request entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortModelEntry {
    pub col_id: String,
    #[serde(default)]
    pub sort: SortDirection,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl From<SortDirection> for sea_query::Order {
    fn from(direction: SortDirection) -> Self {
        match direction {
            SortDirection::Asc => sea_query::Order::Asc,
            SortDirection::Desc => sea_query::Order::Desc,
        }
    }
}

/// Row model the selection was made in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RowModel {
    ServerSide,
    ClientSide,
}

/// Export output format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Excel,
    Csv,
    Tsv,
}

impl ExportFormat {
    /// File extension for the exported artifact.
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Excel => "xlsx",
            ExportFormat::Csv => "csv",
            ExportFormat::Tsv => "tsv",
        }
    }
}
