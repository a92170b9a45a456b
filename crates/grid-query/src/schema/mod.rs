//! Entity schemas.
//!
//! This module provides:
//! - EntitySchema / ColumnDef / RelationDef: what a column id may address
//! - SchemaRegistry: entities plus per-entity hooks
//! - load_schema: YAML/TOML schema files

mod loader;
mod registry;
pub mod types;

pub use loader::{SchemaFile, SchemaFormat, load_schema, parse_schema};
pub use registry::SchemaRegistry;
pub use types::{ColumnDef, ColumnKind, EntitySchema, RelationDef, RelationKind};

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod fixtures {
    use super::{SchemaFormat, SchemaRegistry, parse_schema};

    /// Zoo schema shared by unit tests.
    pub fn zoo() -> SchemaRegistry {
        parse_schema(include_str!("../../fixtures/zoo.yml"), SchemaFormat::Yaml).unwrap()
    }
}
