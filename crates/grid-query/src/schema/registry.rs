//! Schema registry: entities plus the per-entity hooks grid requests consult.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::types::{EntitySchema, is_safe_identifier};
use crate::error::{GridError, GridResult};
use crate::grid::{CustomFilterHook, ExportColumns};

/// Registry of queryable entities.
#[derive(Default)]
pub struct SchemaRegistry {
    entities: HashMap<String, Arc<EntitySchema>>,
    custom_filters: HashMap<String, Arc<dyn CustomFilterHook>>,
    export_columns: HashMap<String, Arc<dyn ExportColumns>>,
}

impl SchemaRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a set of entities and validate cross references.
    pub fn from_entities(entities: impl IntoIterator<Item = EntitySchema>) -> GridResult<Self> {
        let mut registry = Self::new();
        for entity in entities {
            registry.register_entity(entity)?;
        }
        registry.validate()?;
        Ok(registry)
    }

    /// Register an entity. Identifiers are checked here; relation targets are
    /// checked by [`SchemaRegistry::validate`] once every entity is present.
    pub fn register_entity(&mut self, entity: EntitySchema) -> GridResult<()> {
        check_identifier(&entity.name, "entity name")?;
        check_identifier(entity.table(), "table name")?;
        check_identifier(&entity.primary_key, "primary key")?;
        if let Some(ref column) = entity.soft_delete {
            check_identifier(column, "soft delete column")?;
        }
        for column in &entity.columns {
            check_identifier(&column.name, "column name")?;
        }
        for relation in &entity.relations {
            check_identifier(&relation.name, "relation name")?;
            check_identifier(&relation.local_key, "relation local key")?;
            check_identifier(&relation.foreign_key, "relation foreign key")?;
        }
        if entity.find_column(&entity.primary_key).is_none() {
            return Err(GridError::Schema(format!(
                "entity '{}' does not declare its primary key column '{}'",
                entity.name, entity.primary_key
            )));
        }

        if self.entities.contains_key(&entity.name) {
            tracing::warn!(entity = %entity.name, "replacing registered entity");
        }
        self.entities
            .insert(entity.name.clone(), Arc::new(entity));
        Ok(())
    }

    /// Check that every relation points at a registered entity and that both
    /// join keys exist on their respective sides.
    pub fn validate(&self) -> GridResult<()> {
        for entity in self.entities.values() {
            for relation in &entity.relations {
                let target = self.entities.get(&relation.entity).ok_or_else(|| {
                    GridError::Schema(format!(
                        "relation '{}.{}' targets unknown entity '{}'",
                        entity.name, relation.name, relation.entity
                    ))
                })?;
                if entity.find_column(&relation.local_key).is_none() {
                    return Err(GridError::Schema(format!(
                        "relation '{}.{}' uses undeclared local key '{}'",
                        entity.name, relation.name, relation.local_key
                    )));
                }
                if target.find_column(&relation.foreign_key).is_none() {
                    return Err(GridError::Schema(format!(
                        "relation '{}.{}' uses undeclared foreign key '{}.{}'",
                        entity.name, relation.name, target.name, relation.foreign_key
                    )));
                }
            }
        }
        Ok(())
    }

    /// Look up an entity by name.
    pub fn entity(&self, name: &str) -> GridResult<Arc<EntitySchema>> {
        self.entities
            .get(name)
            .cloned()
            .ok_or_else(|| GridError::UnknownEntity(name.to_string()))
    }

    /// Names of all registered entities, sorted.
    pub fn entity_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entities.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Attach a custom filter hook to an entity.
    pub fn register_custom_filter(&mut self, entity: &str, hook: Arc<dyn CustomFilterHook>) {
        self.custom_filters.insert(entity.to_string(), hook);
    }

    /// Custom filter hook for an entity, if one is registered.
    pub fn custom_filter(&self, entity: &str) -> Option<Arc<dyn CustomFilterHook>> {
        self.custom_filters.get(entity).cloned()
    }

    /// Attach an export column provider to an entity.
    pub fn register_export_columns(&mut self, entity: &str, provider: Arc<dyn ExportColumns>) {
        self.export_columns.insert(entity.to_string(), provider);
    }

    /// Export column provider for an entity, if one is registered.
    pub fn export_columns(&self, entity: &str) -> Option<Arc<dyn ExportColumns>> {
        self.export_columns.get(entity).cloned()
    }
}

impl fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaRegistry")
            .field("entities", &self.entity_names())
            .field("custom_filters", &self.custom_filters.keys().collect::<Vec<_>>())
            .field("export_columns", &self.export_columns.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn check_identifier(name: &str, what: &str) -> GridResult<()> {
    if is_safe_identifier(name) {
        Ok(())
    } else {
        Err(GridError::Schema(format!("unsafe {what}: '{name}'")))
    }
}
