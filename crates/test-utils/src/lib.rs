//! grid-query test utilities.
//!
//! Helpers for integration testing: the zoo fixture schema, request
//! builders, a recording row source, and SQL assertion helpers.

use std::sync::Arc;

use async_trait::async_trait;
use grid_query::grid::{CustomFilterHook, QueryScope};
use grid_query::schema::{SchemaFormat, parse_schema};
use grid_query::{GridRequest, GridResult, RowSource, SchemaRegistry};
use parking_lot::Mutex;
use sea_query::{Asterisk, Expr, Order};
use serde_json::{Map, Value, json};

/// Zoo fixture schema: flamingos, keepers, zoos and vaccinations.
pub const ZOO_SCHEMA: &str = include_str!("../../grid-query/fixtures/zoo.yml");

/// Parse the zoo fixture schema.
pub fn zoo_registry() -> SchemaRegistry {
    match parse_schema(ZOO_SCHEMA, SchemaFormat::Yaml) {
        Ok(registry) => registry,
        Err(e) => panic!("zoo fixture schema is invalid: {e:#}"),
    }
}

/// Zoo registry whose `flamingos` entity honours `customFilters.trashed`.
pub fn zoo_registry_with_trashed_filter() -> Arc<SchemaRegistry> {
    let mut registry = zoo_registry();
    registry.register_custom_filter("flamingos", Arc::new(TrashedFilter));
    Arc::new(registry)
}

/// Custom filter including soft-deleted rows when `trashed` is true.
#[derive(Debug, Clone, Copy)]
pub struct TrashedFilter;

impl CustomFilterHook for TrashedFilter {
    fn apply(&self, scope: &mut QueryScope, filters: &Map<String, Value>) -> GridResult<()> {
        if filters.get("trashed").and_then(Value::as_bool) == Some(true) {
            scope.with_trashed();
        }
        Ok(())
    }
}

/// Zoo registry whose `flamingos` entity tallies rows per species when
/// `customFilters.tally` is true.
pub fn zoo_registry_with_species_tally() -> Arc<SchemaRegistry> {
    let mut registry = zoo_registry();
    registry.register_custom_filter("flamingos", Arc::new(SpeciesTally));
    Arc::new(registry)
}

/// Custom filter turning the page into one `species`, `flamingo_count` row
/// per species.
#[derive(Debug, Clone, Copy)]
pub struct SpeciesTally;

impl CustomFilterHook for SpeciesTally {
    fn apply(&self, scope: &mut QueryScope, filters: &Map<String, Value>) -> GridResult<()> {
        if filters.get("tally").and_then(Value::as_bool) == Some(true) {
            scope
                .group_by("species")
                .select_expr(Expr::col(Asterisk).count(), "flamingo_count")
                .order_by("species", Order::Asc);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Start an empty grid request.
pub fn request() -> TestRequest {
    TestRequest {
        body: json!({}),
    }
}

/// A grid request builder working on the wire JSON.
#[derive(Debug, Clone)]
pub struct TestRequest {
    body: Value,
}

impl TestRequest {
    fn set(mut self, key: &str, value: Value) -> Self {
        if let Some(obj) = self.body.as_object_mut() {
            obj.insert(key.to_string(), value);
        }
        self
    }

    /// Add a filter-model entry.
    pub fn filter(mut self, column: &str, filter: Value) -> Self {
        if let Some(obj) = self.body.as_object_mut() {
            let model = obj
                .entry("filterModel")
                .or_insert_with(|| json!({}));
            if let Some(model) = model.as_object_mut() {
                model.insert(column.to_string(), filter);
            }
        }
        self
    }

    /// Append a sort-model entry.
    pub fn sort(mut self, column: &str, direction: &str) -> Self {
        if let Some(obj) = self.body.as_object_mut() {
            let model = obj.entry("sortModel").or_insert_with(|| json!([]));
            if let Some(model) = model.as_array_mut() {
                model.push(json!({"colId": column, "sort": direction}));
            }
        }
        self
    }

    /// Set the row window.
    pub fn window(self, start: u64, end: u64) -> Self {
        self.set("startRow", json!(start)).set("endRow", json!(end))
    }

    /// Server-side selection.
    pub fn server_side(self, select_all: bool, toggled: Value) -> Self {
        self.set("rowModel", json!("serverSide"))
            .set("selectAll", json!(select_all))
            .set("toggledNodes", toggled)
    }

    /// Client-side selection.
    pub fn client_side(self, toggled: Value) -> Self {
        self.set("rowModel", json!("clientSide"))
            .set("toggledNodes", toggled)
    }

    /// Request distinct values of a column.
    pub fn column(self, column: &str) -> Self {
        self.set("column", json!(column))
    }

    pub fn custom_filters(self, filters: Value) -> Self {
        self.set("customFilters", filters)
    }

    pub fn export(self, format: &str) -> Self {
        self.set("exportFormat", json!(format))
    }

    /// Wire JSON of the request.
    pub fn json(&self) -> &Value {
        &self.body
    }

    /// Deserialize into a [`GridRequest`].
    pub fn build(self) -> GridRequest {
        match serde_json::from_value(self.body) {
            Ok(request) => request,
            Err(e) => panic!("test request does not deserialize: {e}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Row source
// ---------------------------------------------------------------------------

/// Row source returning canned results and recording every statement.
#[derive(Debug, Default)]
pub struct RecordingSource {
    rows: Vec<Value>,
    count: i64,
    statements: Mutex<Vec<String>>,
}

impl RecordingSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows returned by every row query.
    pub fn with_rows(mut self, rows: Vec<Value>) -> Self {
        self.rows = rows;
        self
    }

    /// Value returned by every count query.
    pub fn with_count(mut self, count: i64) -> Self {
        self.count = count;
        self
    }

    /// Statements executed so far, in order.
    pub fn statements(&self) -> Vec<String> {
        self.statements.lock().clone()
    }

    /// Most recent statement.
    pub fn last_statement(&self) -> Option<String> {
        self.statements.lock().last().cloned()
    }
}

#[async_trait]
impl RowSource for RecordingSource {
    async fn fetch_rows(&self, sql: &str) -> GridResult<Vec<Value>> {
        self.statements.lock().push(sql.to_string());
        Ok(self.rows.clone())
    }

    async fn fetch_count(&self, sql: &str) -> GridResult<i64> {
        self.statements.lock().push(sql.to_string());
        Ok(self.count)
    }
}

/// Assertion helpers for rendered SQL.
pub mod assert {
    /// Assert that a statement contains a fragment.
    pub fn contains(sql: &str, fragment: &str) {
        assert!(
            sql.contains(fragment),
            "Expected SQL to contain '{fragment}'\nActual: {sql}"
        );
    }

    /// Assert that a statement does not contain a fragment.
    pub fn not_contains(sql: &str, fragment: &str) {
        assert!(
            !sql.contains(fragment),
            "Expected SQL to NOT contain '{fragment}'\nActual: {sql}"
        );
    }

    /// Assert that a statement ends with a fragment.
    pub fn ends_with(sql: &str, fragment: &str) {
        assert!(
            sql.ends_with(fragment),
            "Expected SQL to end with '{fragment}'\nActual: {sql}"
        );
    }
}
