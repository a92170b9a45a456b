//! Query building scope and its frozen form.
//!
//! Compilers and custom filter hooks write into a [`QueryScope`]. Once every
//! stage has run, the scope is frozen into a [`CompiledQuery`], which renders
//! independent statements for the page, the total count and value listings.

use sea_query::{
    Alias, Asterisk, Cond, Condition, Expr, IntoCondition, Order, Query, SelectStatement,
    SimpleExpr,
};

/// One ordering term.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderTerm {
    pub expr: SimpleExpr,
    pub order: Order,
    /// Subject column name when the term orders on a direct column.
    pub column: Option<String>,
}

/// Mutable query scope for a single entity.
///
/// This is the whole surface a custom filter hook gets to see.
#[derive(Debug, Clone)]
pub struct QueryScope {
    table: String,
    primary_key: String,
    soft_delete: Option<String>,
    with_trashed: bool,
    condition: Condition,
    orders: Vec<OrderTerm>,
    groups: Vec<String>,
    selects: Vec<(SimpleExpr, String)>,
    offset: Option<u64>,
    limit: Option<u64>,
}

impl QueryScope {
    pub(crate) fn new(table: &str, primary_key: &str, soft_delete: Option<&str>) -> Self {
        Self {
            table: table.to_string(),
            primary_key: primary_key.to_string(),
            soft_delete: soft_delete.map(str::to_string),
            with_trashed: false,
            condition: Cond::all(),
            orders: Vec::new(),
            groups: Vec::new(),
            selects: Vec::new(),
            offset: None,
            limit: None,
        }
    }

    /// Table (and alias) of the subject.
    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// Qualified column expression on the subject table.
    pub fn column(&self, name: &str) -> SimpleExpr {
        Expr::col((Alias::new(&self.table), Alias::new(name))).into()
    }

    /// AND a condition into the scope.
    pub fn and_where<C: IntoCondition>(&mut self, condition: C) -> &mut Self {
        let current = std::mem::replace(&mut self.condition, Cond::all());
        self.condition = current.add(condition.into_condition());
        self
    }

    pub fn where_in<I, V>(&mut self, column: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<SimpleExpr>,
    {
        let expr = Expr::col((Alias::new(&self.table), Alias::new(column))).is_in(values);
        self.and_where(expr)
    }

    pub fn where_not_in<I, V>(&mut self, column: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<SimpleExpr>,
    {
        let expr = Expr::col((Alias::new(&self.table), Alias::new(column))).is_not_in(values);
        self.and_where(expr)
    }

    pub fn where_null(&mut self, column: &str) -> &mut Self {
        let expr = Expr::col((Alias::new(&self.table), Alias::new(column))).is_null();
        self.and_where(expr)
    }

    pub fn where_not_null(&mut self, column: &str) -> &mut Self {
        let expr = Expr::col((Alias::new(&self.table), Alias::new(column))).is_not_null();
        self.and_where(expr)
    }

    /// Append an ordering on a subject column.
    pub fn order_by(&mut self, column: &str, order: Order) -> &mut Self {
        self.orders.push(OrderTerm {
            expr: self.column(column),
            order,
            column: Some(column.to_string()),
        });
        self
    }

    /// Append an ordering on an arbitrary expression.
    pub fn order_by_expr(&mut self, expr: SimpleExpr, order: Order) -> &mut Self {
        self.orders.push(OrderTerm {
            expr,
            order,
            column: None,
        });
        self
    }

    /// Drop every ordering added so far.
    pub fn clear_order(&mut self) -> &mut Self {
        self.orders.clear();
        self
    }

    /// Group page rows by a subject column.
    ///
    /// A grouped page selects the group columns plus any [`select_expr`]
    /// terms instead of whole subject rows.
    ///
    /// [`select_expr`]: QueryScope::select_expr
    pub fn group_by(&mut self, column: &str) -> &mut Self {
        self.groups.push(column.to_string());
        self
    }

    /// Add a named output column to the page, typically an aggregate.
    pub fn select_expr(&mut self, expr: impl Into<SimpleExpr>, alias: &str) -> &mut Self {
        self.selects.push((expr.into(), alias.to_string()));
        self
    }

    pub fn offset(&mut self, offset: u64) -> &mut Self {
        self.offset = Some(offset);
        self
    }

    pub fn limit(&mut self, limit: u64) -> &mut Self {
        self.limit = Some(limit);
        self
    }

    /// Include soft-deleted rows.
    pub fn with_trashed(&mut self) -> &mut Self {
        self.with_trashed = true;
        self
    }

    pub fn is_grouped(&self) -> bool {
        !self.groups.is_empty()
    }

    /// Whether some ordering term already sorts on the given subject column.
    pub fn is_ordered_on(&self, column: &str) -> bool {
        self.orders
            .iter()
            .any(|term| term.column.as_deref() == Some(column))
    }

    pub fn orders(&self) -> &[OrderTerm] {
        &self.orders
    }

    pub(crate) fn freeze(self) -> CompiledQuery {
        CompiledQuery {
            table: self.table,
            primary_key: self.primary_key,
            soft_delete: self.soft_delete,
            with_trashed: self.with_trashed,
            condition: self.condition,
            orders: self.orders,
            groups: self.groups,
            selects: self.selects,
            offset: self.offset,
            limit: self.limit,
        }
    }
}

/// Immutable compiled query.
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    table: String,
    primary_key: String,
    soft_delete: Option<String>,
    with_trashed: bool,
    condition: Condition,
    orders: Vec<OrderTerm>,
    groups: Vec<String>,
    selects: Vec<(SimpleExpr, String)>,
    offset: Option<u64>,
    limit: Option<u64>,
}

impl CompiledQuery {
    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    pub fn orders(&self) -> &[OrderTerm] {
        &self.orders
    }

    pub fn offset(&self) -> Option<u64> {
        self.offset
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn is_grouped(&self) -> bool {
        !self.groups.is_empty()
    }

    /// Every row restriction, including the soft-delete guard.
    pub fn filter_condition(&self) -> Condition {
        let mut condition = self.condition.clone();
        if let Some(ref column) = self.soft_delete
            && !self.with_trashed
        {
            condition = condition.add(
                Expr::col((Alias::new(&self.table), Alias::new(column))).is_null(),
            );
        }
        condition
    }

    /// FROM, WHERE and GROUP BY shared by every realized statement.
    fn base_statement(&self) -> SelectStatement {
        let mut query = Query::select();
        query.from(Alias::new(&self.table));

        let condition = self.filter_condition();
        if !condition.is_empty() {
            query.cond_where(condition);
        }

        for group in &self.groups {
            query.group_by_col((Alias::new(&self.table), Alias::new(group)));
        }
        query
    }

    /// Page statement: subject rows, or group columns when grouped, with
    /// ordering and window.
    pub fn select_statement(&self) -> SelectStatement {
        let mut query = self.base_statement();
        if self.is_grouped() {
            for group in &self.groups {
                query.column((Alias::new(&self.table), Alias::new(group)));
            }
        } else {
            query.column((Alias::new(&self.table), Asterisk));
        }
        for (expr, alias) in &self.selects {
            query.expr_as(expr.clone(), Alias::new(alias));
        }

        for term in &self.orders {
            query.order_by_expr(term.expr.clone(), term.order.clone());
        }
        if let Some(offset) = self.offset {
            query.offset(offset);
        }
        if let Some(limit) = self.limit {
            query.limit(limit);
        }
        query
    }

    /// Total count statement, free of ordering and window.
    ///
    /// Grouped queries count their groups through a wrapping subquery.
    pub fn count_statement(&self) -> SelectStatement {
        if !self.is_grouped() {
            let mut query = self.base_statement();
            query.expr(Expr::col(Asterisk).count());
            return query;
        }

        let mut inner = self.base_statement();
        for group in &self.groups {
            inner.column((Alias::new(&self.table), Alias::new(group)));
        }

        Query::select()
            .expr(Expr::col(Asterisk).count())
            .from_subquery(inner, Alias::new("grid_count"))
            .to_owned()
    }
}
