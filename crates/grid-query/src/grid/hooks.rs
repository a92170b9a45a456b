//! Per-entity hooks consulted while compiling and exporting grid requests.
//!
//! Hooks are registered on the [`SchemaRegistry`](crate::schema::SchemaRegistry)
//! by entity name.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use super::scope::QueryScope;
use crate::error::GridResult;

// ---------------------------------------------------------------------------
// Custom filters
// ---------------------------------------------------------------------------

/// Entity-specific filtering driven by the request's `customFilters` map.
///
/// Runs once per request, before the filter model is compiled.
pub trait CustomFilterHook: Send + Sync {
    fn apply(&self, scope: &mut QueryScope, filters: &Map<String, Value>) -> GridResult<()>;
}

impl<F> CustomFilterHook for F
where
    F: Fn(&mut QueryScope, &Map<String, Value>) -> GridResult<()> + Send + Sync,
{
    fn apply(&self, scope: &mut QueryScope, filters: &Map<String, Value>) -> GridResult<()> {
        self(scope, filters)
    }
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Locale and timezone handed to value formatters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatterContext {
    pub locale: String,
    /// IANA timezone name; `None` leaves timestamps as stored.
    pub timezone: Option<String>,
}

impl FormatterContext {
    pub fn new(locale: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            timezone: None,
        }
    }

    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }
}

/// Formats a cell value for export.
pub trait ValueFormatter: Send + Sync {
    fn format(&self, ctx: &FormatterContext, value: &Value) -> Value;

    /// Spreadsheet number format applied to the column, if any.
    fn excel_format(&self) -> Option<&str> {
        None
    }
}

/// Derives a cell value from a whole row.
pub type ValueResolver = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// One exported column.
#[derive(Clone)]
pub struct ColumnDefinition {
    /// Column id in the row, possibly dotted.
    pub field: String,
    pub header: String,
    pub formatter: Option<Arc<dyn ValueFormatter>>,
    pub value_resolver: Option<ValueResolver>,
}

impl ColumnDefinition {
    pub fn new(field: impl Into<String>, header: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            header: header.into(),
            formatter: None,
            value_resolver: None,
        }
    }

    pub fn with_formatter(mut self, formatter: Arc<dyn ValueFormatter>) -> Self {
        self.formatter = Some(formatter);
        self
    }

    pub fn with_value_resolver(mut self, resolver: ValueResolver) -> Self {
        self.value_resolver = Some(resolver);
        self
    }

    /// Raw cell value: the resolver's output, or the field looked up by path.
    pub fn resolve(&self, row: &Value) -> Value {
        if let Some(ref resolver) = self.value_resolver {
            return resolver(row);
        }
        self.field
            .split('.')
            .try_fold(row, |value, key| value.get(key))
            .cloned()
            .unwrap_or(Value::Null)
    }

    /// Cell value after formatting.
    pub fn render(&self, ctx: &FormatterContext, row: &Value) -> Value {
        let value = self.resolve(row);
        match self.formatter {
            Some(ref formatter) => formatter.format(ctx, &value),
            None => value,
        }
    }
}

impl fmt::Debug for ColumnDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnDefinition")
            .field("field", &self.field)
            .field("header", &self.header)
            .field("formatter", &self.formatter.is_some())
            .field("value_resolver", &self.value_resolver.is_some())
            .finish()
    }
}

/// Ordered export columns for an entity.
pub trait ExportColumns: Send + Sync {
    fn column_definitions(&self) -> Vec<ColumnDefinition>;
}

impl ExportColumns for Vec<ColumnDefinition> {
    fn column_definitions(&self) -> Vec<ColumnDefinition> {
        self.clone()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Upper;

    impl ValueFormatter for Upper {
        fn format(&self, _ctx: &FormatterContext, value: &Value) -> Value {
            match value {
                Value::String(s) => Value::String(s.to_uppercase()),
                other => other.clone(),
            }
        }
    }

    #[test]
    fn resolve_walks_dotted_fields() {
        let row = json!({"name": "Pinky", "keeper": {"name": "Ann"}});
        assert_eq!(ColumnDefinition::new("keeper.name", "Keeper").resolve(&row), json!("Ann"));
        assert_eq!(ColumnDefinition::new("keeper.age", "Age").resolve(&row), Value::Null);
    }

    #[test]
    fn resolver_takes_precedence() {
        let row = json!({"name": "Pinky"});
        let column = ColumnDefinition::new("name", "Name").with_value_resolver(Arc::new(
            |row: &Value| json!(format!("{}!", row["name"].as_str().unwrap_or_default())),
        ));
        assert_eq!(column.resolve(&row), json!("Pinky!"));
    }

    #[test]
    fn formatter_applies_on_render() {
        let ctx = FormatterContext::new("en").with_timezone("Europe/Amsterdam");
        let column = ColumnDefinition::new("name", "Name").with_formatter(Arc::new(Upper));
        assert_eq!(column.render(&ctx, &json!({"name": "pinky"})), json!("PINKY"));
        assert!(format!("{column:?}").contains("formatter: true"));
    }

    #[test]
    fn closures_are_custom_filter_hooks() {
        let hook = |scope: &mut QueryScope, filters: &Map<String, Value>| -> GridResult<()> {
            if filters.get("hungry") == Some(&Value::Bool(true)) {
                scope.where_in("is_hungry", [true]);
            }
            Ok(())
        };
        let mut scope = QueryScope::new("flamingos", "id", None);
        let filters = json!({"hungry": true}).as_object().cloned().unwrap();
        CustomFilterHook::apply(&hook, &mut scope, &filters).unwrap();

        let sql = scope
            .freeze()
            .select_statement()
            .to_string(sea_query::PostgresQueryBuilder);
        assert!(sql.contains(r#""flamingos"."is_hungry" IN (TRUE)"#), "{sql}");
    }
}
