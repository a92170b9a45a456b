//! Filter tree compilation.
//!
//! Turns a [`FilterNode`] into a sea-query [`Condition`] on one resolved
//! column. Combinators recurse over the same column; leaves dispatch on
//! their filter kind.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use sea_query::extension::postgres::PgExpr;
use sea_query::{Cond, Condition, ExprTrait, IntoCondition, SimpleExpr};
use serde_json::Value;

use super::column::ColumnPath;
use super::operator::{BoolOperator, DateOperator, FilterKind, NumberOperator, TextOperator};
use super::relation::{missing_relation, wrap_in_exists};
use super::request::{FilterNode, LeafFilter};
use crate::error::{GridError, GridResult};

/// Compile one filter-model entry against the subject table.
///
/// Paths that cross relations are wrapped in their own correlated EXISTS
/// chain, so every entry restricts the subject independently. A set filter
/// selecting `null` on such a path also matches subjects with no related row,
/// the rows a value listing reports as `null`.
pub fn compile_entry(
    path: &ColumnPath,
    base_alias: &str,
    node: &FilterNode,
) -> GridResult<Condition> {
    let leaf_alias = path.leaf_alias(base_alias);
    let predicate = FilterCompiler::new(path, &leaf_alias).compile(node)?;
    if !path.has_relations() {
        return Ok(predicate);
    }

    let exists = wrap_in_exists(path, base_alias, predicate);
    match missing_relation(path, base_alias) {
        Some(missing) if selects_null(node)? => Ok(Cond::any().add(exists).add(missing)),
        _ => Ok(exists),
    }
}

fn selects_null(node: &FilterNode) -> GridResult<bool> {
    match node {
        FilterNode::Leaf(leaf) => Ok(FilterKind::from_tag(&leaf.filter_type)? == FilterKind::Set
            && leaf.values.iter().any(Value::is_null)),
        FilterNode::Combinator(_) => Ok(false),
    }
}

/// Compiles filter nodes for one column on one table alias.
pub struct FilterCompiler<'a> {
    path: &'a ColumnPath,
    alias: &'a str,
}

impl<'a> FilterCompiler<'a> {
    pub fn new(path: &'a ColumnPath, alias: &'a str) -> Self {
        Self { path, alias }
    }

    pub fn compile(&self, node: &FilterNode) -> GridResult<Condition> {
        match node {
            FilterNode::Combinator(combinator) => {
                let mut group = match BoolOperator::from_tag(&combinator.operator)? {
                    BoolOperator::And => Cond::all(),
                    BoolOperator::Or => Cond::any(),
                };
                for condition in &combinator.conditions {
                    group = group.add(self.compile(condition)?);
                }
                Ok(group)
            }
            FilterNode::Leaf(leaf) => self.compile_leaf(leaf),
        }
    }

    fn compile_leaf(&self, leaf: &LeafFilter) -> GridResult<Condition> {
        match FilterKind::from_tag(&leaf.filter_type)? {
            FilterKind::Set => self.set_filter(leaf),
            FilterKind::Text => self.text_filter(leaf),
            FilterKind::Number => self.number_filter(leaf),
            FilterKind::Date => self.date_filter(leaf),
        }
    }

    fn column_id(&self) -> &str {
        &self.path.column_id
    }

    fn raw_expr(&self) -> SimpleExpr {
        self.path.expr(self.alias)
    }

    fn operator_tag<'l>(&self, leaf: &'l LeafFilter) -> GridResult<&'l str> {
        leaf.operator.as_deref().ok_or_else(|| {
            GridError::UnknownFilterType(format!(
                "{} filter on column {} has no type",
                leaf.filter_type,
                self.column_id()
            ))
        })
    }

    fn set_filter(&self, leaf: &LeafFilter) -> GridResult<Condition> {
        if self.path.is_json() {
            return Err(GridError::UnsupportedFilterOperation {
                column: self.column_id().to_string(),
                reason: "set filters cannot target JSON columns".to_string(),
            });
        }

        let has_null = leaf.values.iter().any(Value::is_null);
        let values = leaf
            .values
            .iter()
            .filter(|v| !v.is_null())
            .map(|v| scalar_value(self.column_id(), v))
            .collect::<GridResult<Vec<_>>>()?;

        let expr = self.raw_expr();
        let condition = match (values.is_empty(), has_null) {
            (true, true) => expr.is_null().into_condition(),
            (false, true) => Cond::any()
                .add(expr.clone().is_in(values))
                .add(expr.is_null()),
            // An empty list renders as a contradiction.
            (_, false) => expr.is_in(values).into_condition(),
        };
        Ok(condition)
    }

    /// Text comparisons run on text; other column kinds are cast.
    fn text_expr(&self) -> SimpleExpr {
        let expr = self.raw_expr();
        if self.path.kind.is_textual() || self.path.is_nested_json() {
            expr
        } else {
            expr.cast_as("text")
        }
    }

    fn text_filter(&self, leaf: &LeafFilter) -> GridResult<Condition> {
        let operator = TextOperator::from_tag(self.operator_tag(leaf)?)?;
        let value = || text_operand(self.column_id(), leaf.filter.as_ref());
        let pattern = || value().map(|v| escape_like_wildcards(&v));

        let condition = match operator {
            TextOperator::Equals => self.text_expr().eq(value()?),
            TextOperator::NotEqual => self.text_expr().ne(value()?),
            TextOperator::Contains => self.text_expr().ilike(format!("%{}%", pattern()?)),
            TextOperator::NotContains => self.text_expr().not_ilike(format!("%{}%", pattern()?)),
            TextOperator::StartsWith => self.text_expr().ilike(format!("{}%", pattern()?)),
            TextOperator::EndsWith => self.text_expr().ilike(format!("%{}", pattern()?)),
            TextOperator::Blank => self.raw_expr().is_null(),
            TextOperator::NotBlank => self.raw_expr().is_not_null(),
        };
        Ok(condition.into_condition())
    }

    /// JSON values come back as text or jsonb and are compared as numeric.
    fn number_expr(&self) -> SimpleExpr {
        let expr = self.raw_expr();
        if self.path.is_json() {
            expr.cast_as("numeric")
        } else {
            expr
        }
    }

    fn number_filter(&self, leaf: &LeafFilter) -> GridResult<Condition> {
        let operator = NumberOperator::from_tag(self.operator_tag(leaf)?)?;
        let expr = self.number_expr();
        let column = self.column_id();
        let value = || number_operand(column, leaf.filter.as_ref(), "filter");

        let condition = match operator {
            NumberOperator::Equals => expr.eq(value()?).into_condition(),
            NumberOperator::NotEqual => expr.ne(value()?).into_condition(),
            NumberOperator::GreaterThan => expr.gt(value()?).into_condition(),
            NumberOperator::GreaterThanOrEqual => expr.gte(value()?).into_condition(),
            NumberOperator::LessThan => expr.lt(value()?).into_condition(),
            NumberOperator::LessThanOrEqual => expr.lte(value()?).into_condition(),
            NumberOperator::InRange => {
                let upper = number_operand(column, leaf.filter_to.as_ref(), "filterTo")?;
                Cond::all()
                    .add(expr.clone().gte(value()?))
                    .add(expr.lte(upper))
            }
            NumberOperator::Blank => self.raw_expr().is_null().into_condition(),
            NumberOperator::NotBlank => self.raw_expr().is_not_null().into_condition(),
        };
        Ok(condition)
    }

    fn date_expr(&self) -> GridResult<SimpleExpr> {
        if self.path.is_json() && !self.path.is_nested_json() {
            return Err(GridError::UnsupportedFilterOperation {
                column: self.column_id().to_string(),
                reason: "date filters need a scalar JSON key, not a whole document".to_string(),
            });
        }
        Ok(self.raw_expr().cast_as("date"))
    }

    fn date_filter(&self, leaf: &LeafFilter) -> GridResult<Condition> {
        let operator = DateOperator::from_tag(self.operator_tag(leaf)?)?;
        let column = self.column_id();
        let from = || date_operand(column, leaf.date_from.as_deref(), "dateFrom");

        let condition = match operator {
            DateOperator::Blank => self.raw_expr().is_null().into_condition(),
            DateOperator::NotBlank => self.raw_expr().is_not_null().into_condition(),
            DateOperator::Equals => self.date_expr()?.eq(from()?).into_condition(),
            DateOperator::NotEqual => self.date_expr()?.ne(from()?).into_condition(),
            // Both bounds are inclusive at day granularity.
            DateOperator::GreaterThan => self.date_expr()?.gte(from()?).into_condition(),
            DateOperator::LessThan => self.date_expr()?.lte(from()?).into_condition(),
            DateOperator::InRange => {
                let to = date_operand(column, leaf.date_to.as_deref(), "dateTo")?;
                let expr = self.date_expr()?;
                Cond::all().add(expr.clone().gte(from()?)).add(expr.lte(to))
            }
        };
        Ok(condition)
    }
}

/// Escape LIKE wildcards in user input.
fn escape_like_wildcards(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn text_operand(column: &str, raw: Option<&Value>) -> GridResult<String> {
    match raw {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::Bool(b)) => Ok(b.to_string()),
        Some(_) => Err(GridError::invalid_value(column, "filter must be a string")),
        None => Err(GridError::invalid_value(column, "filter is required")),
    }
}

fn number_operand(column: &str, raw: Option<&Value>, field: &str) -> GridResult<sea_query::Value> {
    let invalid = || GridError::invalid_value(column, format!("{field} must be a number"));
    match raw {
        Some(Value::Number(n)) => number_to_value(n).ok_or_else(invalid),
        Some(Value::String(s)) => {
            let s = s.trim();
            if let Ok(i) = s.parse::<i64>() {
                return Ok(i.into());
            }
            s.parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(Into::into)
                .ok_or_else(invalid)
        }
        Some(_) => Err(invalid()),
        None => Err(GridError::invalid_value(column, format!("{field} is required"))),
    }
}

fn number_to_value(n: &serde_json::Number) -> Option<sea_query::Value> {
    n.as_i64()
        .map(Into::into)
        .or_else(|| n.as_u64().map(Into::into))
        .or_else(|| n.as_f64().map(Into::into))
}

/// Parse a date endpoint and truncate it to the day.
///
/// Accepts `YYYY-MM-DD HH:MM:SS` (what grids send), plain `YYYY-MM-DD` and
/// RFC 3339 timestamps.
pub(crate) fn parse_day(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.date())
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.date_naive()))
        .ok()
}

fn date_operand(column: &str, raw: Option<&str>, field: &str) -> GridResult<String> {
    let raw = raw.ok_or_else(|| GridError::invalid_value(column, format!("{field} is required")))?;
    let day = parse_day(raw)
        .ok_or_else(|| GridError::invalid_value(column, format!("{field} is not a date: {raw}")))?;
    Ok(day.format("%Y-%m-%d").to_string())
}

/// Convert a JSON scalar into a bindable value.
pub(crate) fn scalar_value(column: &str, value: &Value) -> GridResult<sea_query::Value> {
    match value {
        Value::String(s) => Ok(s.clone().into()),
        Value::Bool(b) => Ok((*b).into()),
        Value::Number(n) => number_to_value(n)
            .ok_or_else(|| GridError::invalid_value(column, format!("unsupported number {n}"))),
        Value::Null => Ok(sea_query::Value::String(None)),
        Value::Array(_) | Value::Object(_) => Err(GridError::invalid_value(
            column,
            "expected a scalar value",
        )),
    }
}
