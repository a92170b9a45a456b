//! Sort model compilation with a stable tiebreak.

use sea_query::Order;

use super::column::ColumnResolver;
use super::relation::sort_subquery;
use super::request::SortModelEntry;
use super::scope::QueryScope;
use crate::error::GridResult;
use crate::schema::EntitySchema;

/// Compiles a sort model into ordering terms on a scope.
pub struct SortCompiler<'a> {
    resolver: ColumnResolver<'a>,
    entity: &'a EntitySchema,
}

impl<'a> SortCompiler<'a> {
    pub fn new(resolver: ColumnResolver<'a>, entity: &'a EntitySchema) -> Self {
        Self { resolver, entity }
    }

    /// Apply the sort model, then the primary key tiebreak.
    ///
    /// Orderings already on the scope (from a custom filter hook) survive only
    /// when the sort model is empty.
    pub fn apply(&self, scope: &mut QueryScope, sort_model: &[SortModelEntry]) -> GridResult<()> {
        if !sort_model.is_empty() {
            scope.clear_order();
        }

        for entry in sort_model {
            let path = self.resolver.resolve(self.entity, &entry.col_id)?;
            let order: Order = entry.sort.into();

            if path.has_relations() {
                let expr = sort_subquery(&path, scope.table(), &order);
                scope.order_by_expr(expr, order);
            } else if path.is_nested_json() {
                let expr = path.expr(scope.table());
                scope.order_by_expr(expr, order);
            } else {
                scope.order_by(&path.leaf, order);
            }
        }

        let primary_key = self.entity.primary_key.as_str();
        if !scope.is_ordered_on(primary_key) && !scope.is_grouped() {
            scope.order_by(primary_key, Order::Asc);
        }
        Ok(())
    }
}
