//! Grid query orchestration.
//!
//! A [`GridQueryBuilder`] compiles a [`GridRequest`] against a [`Subject`]
//! in a fixed order: custom filter hook, filter model, selection, sort,
//! pagination. The result is frozen before anything executes, so the page,
//! the total count and value listings all derive from the same query.

use std::cmp::Ordering;
use std::sync::Arc;

use sea_query::{Alias, Order, PostgresQueryBuilder, Query, SelectStatement};
use serde_json::Value;
use tracing::{debug, warn};

use super::column::ColumnResolver;
use super::filter::compile_entry;
use super::pagination::PaginationWindow;
use super::relation::join_relations;
use super::request::GridRequest;
use super::response::{ExportHandoff, GridOutcome, GridResponse};
use super::scope::CompiledQuery;
use super::selection::SelectionFilter;
use super::sort::SortCompiler;
use super::source::RowSource;
use super::subject::Subject;
use crate::error::{GridError, GridResult};
use crate::schema::SchemaRegistry;

/// Allow-list entry granting value listings on every column.
pub const ALL_COLUMNS: &str = "*";

/// Output alias of value listings.
const VALUE_ALIAS: &str = "value";

/// Compiled grid request bound to its subject.
#[derive(Debug, Clone)]
pub struct GridQueryBuilder {
    request: GridRequest,
    subject: Subject,
    query: CompiledQuery,
    total_count: Option<u64>,
    index_column: bool,
}

impl GridQueryBuilder {
    /// Compile a request. Fails without side effects on the first invalid
    /// column, filter or operand.
    pub fn new(request: GridRequest, subject: Subject) -> GridResult<Self> {
        let query = match compile(&request, &subject) {
            Ok(query) => query,
            Err(e) => {
                warn!(entity = %subject.entity().name, error = %e, "grid request rejected");
                return Err(e);
            }
        };

        debug!(
            entity = %subject.entity().name,
            filters = request.filter_model.len(),
            sorts = request.sort_model.len(),
            "grid request compiled"
        );

        Ok(Self {
            request,
            subject,
            query,
            total_count: None,
            index_column: false,
        })
    }

    /// Compile a request against a registered entity.
    pub fn for_entity(
        request: GridRequest,
        registry: Arc<SchemaRegistry>,
        entity: &str,
    ) -> GridResult<Self> {
        Self::new(request, Subject::new(registry, entity)?)
    }

    /// Number rows with `__index` in [`respond`](Self::respond).
    pub fn with_index_column(mut self) -> Self {
        self.index_column = true;
        self
    }

    /// Use a known total instead of running the count query.
    pub fn with_total_count(mut self, total: u64) -> Self {
        self.total_count = Some(total);
        self
    }

    pub fn request(&self) -> &GridRequest {
        &self.request
    }

    pub fn subject(&self) -> &Subject {
        &self.subject
    }

    pub fn compiled(&self) -> &CompiledQuery {
        &self.query
    }

    /// Page query SQL.
    pub fn sql(&self) -> String {
        self.query.select_statement().to_string(PostgresQueryBuilder)
    }

    /// Total count SQL.
    pub fn count_sql(&self) -> String {
        self.query.count_statement().to_string(PostgresQueryBuilder)
    }

    /// Value listing SQL for the request's `column`.
    pub fn distinct_sql(&self, allowed_columns: &[&str]) -> GridResult<String> {
        let (statement, _) = self.distinct_statement(allowed_columns)?;
        Ok(statement.to_string(PostgresQueryBuilder))
    }

    /// Total rows matching the request, ignoring the row window.
    pub async fn count(&self, source: &dyn RowSource) -> GridResult<u64> {
        if let Some(total) = self.total_count {
            return Ok(total);
        }
        let sql = self.count_sql();
        debug!(sql = %sql, "grid count query");
        let total = source.fetch_count(&sql).await?;
        Ok(u64::try_from(total).unwrap_or(0))
    }

    /// Rows of the requested page.
    pub async fn rows(&self, source: &dyn RowSource) -> GridResult<Vec<Value>> {
        let sql = self.sql();
        debug!(sql = %sql, "grid page query");
        source.fetch_rows(&sql).await
    }

    /// Sorted distinct values of the request's `column`.
    ///
    /// `allowed_columns` must name the column or contain [`ALL_COLUMNS`].
    /// A whole JSON column holding arrays is flattened one level.
    pub async fn distinct_values(
        &self,
        source: &dyn RowSource,
        allowed_columns: &[&str],
    ) -> GridResult<Vec<Value>> {
        let (statement, flatten) = self.distinct_statement(allowed_columns)?;
        let sql = statement.to_string(PostgresQueryBuilder);
        debug!(sql = %sql, "grid value listing query");

        let values = source
            .fetch_rows(&sql)
            .await?
            .into_iter()
            .map(|mut row| row.get_mut(VALUE_ALIAS).map(Value::take).unwrap_or(Value::Null));

        if !flatten {
            return Ok(values.collect());
        }

        let mut flat = Vec::new();
        for value in values {
            match value {
                Value::Array(items) => flat.extend(items),
                other => flat.push(other),
            }
        }
        flat.sort_by(compare_json);
        flat.dedup_by(|a, b| compare_json(a, b) == Ordering::Equal);
        Ok(flat)
    }

    /// Answer the request: an export handoff when an export format is set,
    /// otherwise the page with its total.
    pub async fn respond(&self, source: &dyn RowSource) -> GridResult<GridOutcome> {
        if let Some(format) = self.request.export_format {
            let entity = &self.subject.entity().name;
            let definitions = self
                .subject
                .registry()
                .export_columns(entity)
                .map(|provider| provider.column_definitions())
                .unwrap_or_default();
            debug!(entity = %entity, format = format.extension(), "grid export requested");

            return Ok(GridOutcome::Export(ExportHandoff {
                format,
                columns: self.request.export_columns.clone(),
                definitions,
                query: self.query.clone(),
            }));
        }

        let total = self.count(source).await?;
        let mut response = GridResponse {
            total,
            data: self.rows(source).await?,
        };
        if self.index_column {
            response.add_index_column(self.request.start_row.unwrap_or(0));
        }
        Ok(GridOutcome::Rows(response))
    }

    /// Listing statement and whether its values need flattening.
    fn distinct_statement(&self, allowed_columns: &[&str]) -> GridResult<(SelectStatement, bool)> {
        let column = self
            .request
            .column
            .as_deref()
            .ok_or(GridError::MissingColumnForSetValues)?;
        if !allowed_columns
            .iter()
            .any(|allowed| *allowed == ALL_COLUMNS || *allowed == column)
        {
            warn!(column, "value listing refused for column");
            return Err(GridError::UnauthorizedSetFilterColumn(column.to_string()));
        }

        let path = ColumnResolver::new(self.subject.registry())
            .resolve(self.subject.entity(), column)?;
        let table = self.query.table();
        let flatten = path.is_json() && !path.is_nested_json();

        let mut statement = Query::select();
        statement.from(Alias::new(table));
        join_relations(&mut statement, &path, table);
        statement.expr_as(path.expr(&path.leaf_alias(table)), Alias::new(VALUE_ALIAS));

        let condition = self.query.filter_condition();
        if !condition.is_empty() {
            statement.cond_where(condition);
        }

        // JSON documents have no equality in PostgreSQL; they are
        // deduplicated after flattening instead.
        if !flatten {
            statement
                .distinct()
                .order_by(Alias::new(VALUE_ALIAS), Order::Asc);
        }
        Ok((statement, flatten))
    }
}

/// Run every compilation stage into one scope and freeze it.
fn compile(request: &GridRequest, subject: &Subject) -> GridResult<CompiledQuery> {
    let entity = subject.entity();
    let registry = subject.registry();
    let mut scope = subject.scope()?;

    if let Some(hook) = registry.custom_filter(&entity.name) {
        hook.apply(&mut scope, &request.custom_filters)?;
    }

    let resolver = ColumnResolver::new(registry);
    for (column_id, node) in &request.filter_model {
        // A value listing never filters on its own column.
        if request.column.as_deref() == Some(column_id.as_str()) {
            continue;
        }
        let path = resolver.resolve(entity, column_id)?;
        let condition = compile_entry(&path, scope.table(), node)?;
        scope.and_where(condition);
    }

    if let Some(selection) = SelectionFilter::from_request(request) {
        selection.apply(&mut scope)?;
    }

    SortCompiler::new(ColumnResolver::new(registry), entity).apply(&mut scope, &request.sort_model)?;

    if let Some(window) = PaginationWindow::from_request(request) {
        window.apply(&mut scope);
    }

    Ok(scope.freeze())
}

/// Total order over JSON values: null, booleans, numbers, strings, arrays,
/// objects.
fn compare_json(a: &Value, b: &Value) -> Ordering {
    fn rank(value: &Value) -> u8 {
        match value {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => x
            .iter()
            .zip(y.iter())
            .map(|(x, y)| compare_json(x, y))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        (Value::Object(_), Value::Object(_)) => a.to_string().cmp(&b.to_string()),
        _ => rank(a).cmp(&rank(b)),
    }
}
