//! The entity a grid request runs against.

use std::sync::Arc;

use serde_json::Value;

use super::filter::scalar_value;
use super::scope::QueryScope;
use crate::error::{GridError, GridResult};
use crate::schema::{EntitySchema, SchemaRegistry};

/// Restriction to the children of one parent row.
#[derive(Debug, Clone, PartialEq)]
pub struct ParentScope {
    /// Column on the subject holding the parent key.
    pub column: String,
    pub value: Value,
}

/// Base subject of a grid query: an entity, optionally narrowed to the rows
/// related to one parent row.
#[derive(Debug, Clone)]
pub struct Subject {
    registry: Arc<SchemaRegistry>,
    entity: Arc<EntitySchema>,
    parent: Option<ParentScope>,
}

impl Subject {
    pub fn new(registry: Arc<SchemaRegistry>, entity: &str) -> GridResult<Self> {
        let entity = registry.entity(entity)?;
        Ok(Self {
            registry,
            entity,
            parent: None,
        })
    }

    /// Rows reached from one parent row through `relation`.
    ///
    /// `parent_key` is the parent's value of the relation's local key.
    pub fn related(
        registry: Arc<SchemaRegistry>,
        parent_entity: &str,
        relation: &str,
        parent_key: Value,
    ) -> GridResult<Self> {
        let parent = registry.entity(parent_entity)?;
        let relation = parent
            .find_relation(relation)
            .ok_or_else(|| GridError::invalid_column(format!("{parent_entity}.{relation}")))?;
        let entity = registry.entity(&relation.entity)?;
        Ok(Self {
            parent: Some(ParentScope {
                column: relation.foreign_key.clone(),
                value: parent_key,
            }),
            registry,
            entity,
        })
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn entity(&self) -> &EntitySchema {
        &self.entity
    }

    pub fn parent(&self) -> Option<&ParentScope> {
        self.parent.as_ref()
    }

    /// Fresh scope on the subject table, with the parent restriction applied.
    pub(crate) fn scope(&self) -> GridResult<QueryScope> {
        let mut scope = QueryScope::new(
            self.entity.table(),
            &self.entity.primary_key,
            self.entity.soft_delete.as_deref(),
        );
        if let Some(ref parent) = self.parent {
            let value = scalar_value(&parent.column, &parent.value)?;
            let expr = scope.column(&parent.column).eq(value);
            scope.and_where(expr);
        }
        Ok(scope)
    }
}
