//! Entity schema types.
//!
//! Describes the tables a grid request may address: their columns, the JSON
//! columns that allow nested addressing, and the relations that column ids
//! may traverse.

use serde::{Deserialize, Serialize};

/// A queryable entity backed by one table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitySchema {
    /// Entity name used in column ids and relation targets.
    pub name: String,

    /// Backing table (defaults to the entity name).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,

    /// Identity column used for selection and the sort tiebreak.
    #[serde(default = "default_primary_key")]
    pub primary_key: String,

    /// Soft-delete timestamp column; rows where it is set are hidden unless
    /// a custom filter asks for them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soft_delete: Option<String>,

    #[serde(default)]
    pub columns: Vec<ColumnDef>,

    #[serde(default)]
    pub relations: Vec<RelationDef>,
}

fn default_primary_key() -> String {
    "id".to_string()
}

impl EntitySchema {
    /// Create an entity with an `id` primary key and no columns.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: None,
            primary_key: default_primary_key(),
            soft_delete: None,
            columns: Vec::new(),
            relations: Vec::new(),
        }
    }

    /// Add a column.
    pub fn column(mut self, name: impl Into<String>, kind: ColumnKind) -> Self {
        self.columns.push(ColumnDef {
            name: name.into(),
            kind,
        });
        self
    }

    /// Add a relation.
    pub fn relation(mut self, relation: RelationDef) -> Self {
        self.relations.push(relation);
        self
    }

    /// Set the backing table.
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Set the primary key column.
    pub fn with_primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key = column.into();
        self
    }

    /// Enable soft deletes on the given column.
    pub fn with_soft_delete(mut self, column: impl Into<String>) -> Self {
        self.soft_delete = Some(column.into());
        self
    }

    /// Backing table name.
    pub fn table(&self) -> &str {
        self.table.as_deref().unwrap_or(&self.name)
    }

    /// Look up a declared column.
    pub fn find_column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Look up a declared relation.
    pub fn find_relation(&self, name: &str) -> Option<&RelationDef> {
        self.relations.iter().find(|r| r.name == name)
    }
}

/// A declared column.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    #[serde(default)]
    pub kind: ColumnKind,
}

/// Storage kind of a column.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    #[default]
    Text,
    Integer,
    Float,
    Boolean,
    Date,
    Timestamp,
    Uuid,
    /// Semi-structured column; nested keys are addressable with dots.
    Json,
}

impl ColumnKind {
    /// Whether text pattern matching works on the raw column.
    pub fn is_textual(self) -> bool {
        matches!(self, ColumnKind::Text)
    }
}

/// Relation from one entity to another.
///
/// The correlation is always `related.foreign_key = parent.local_key`, which
/// covers both directions: a belongs-to relation has `local_key = "keeper_id"`
/// and `foreign_key = "id"`, a has-many relation the reverse.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RelationDef {
    /// Name used as a column id segment.
    pub name: String,

    /// Target entity name.
    pub entity: String,

    #[serde(default)]
    pub kind: RelationKind,

    /// Column on the parent entity.
    pub local_key: String,

    /// Column on the related entity.
    pub foreign_key: String,
}

impl RelationDef {
    /// A to-one relation stored as a foreign key on the parent.
    pub fn belongs_to(name: &str, entity: &str, local_key: &str) -> Self {
        Self {
            name: name.to_string(),
            entity: entity.to_string(),
            kind: RelationKind::BelongsTo,
            local_key: local_key.to_string(),
            foreign_key: "id".to_string(),
        }
    }

    /// A to-many relation stored as a foreign key on the related rows.
    pub fn has_many(name: &str, entity: &str, foreign_key: &str) -> Self {
        Self {
            name: name.to_string(),
            entity: entity.to_string(),
            kind: RelationKind::HasMany,
            local_key: "id".to_string(),
            foreign_key: foreign_key.to_string(),
        }
    }
}

/// Cardinality of a relation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    #[default]
    BelongsTo,
    HasOne,
    HasMany,
}

/// Validate a SQL identifier name (table/column names).
/// Allows only `[a-zA-Z_][a-zA-Z0-9_]*` with max 63 chars (PostgreSQL limit).
pub(crate) fn is_safe_identifier(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 63
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && name.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_')
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn entity_defaults() {
        let entity = EntitySchema::new("flamingos");
        assert_eq!(entity.table(), "flamingos");
        assert_eq!(entity.primary_key, "id");
        assert!(entity.soft_delete.is_none());
    }

    #[test]
    fn entity_deserializes_with_defaults() {
        let yaml = r#"
name: flamingos
columns:
  - name: id
    kind: integer
  - name: custom_properties
    kind: json
relations:
  - name: keeper
    entity: keepers
    local_key: keeper_id
    foreign_key: id
"#;
        let entity: EntitySchema = serde_yml::from_str(yaml).unwrap();
        assert_eq!(entity.primary_key, "id");
        assert_eq!(
            entity.find_column("custom_properties").map(|c| c.kind),
            Some(ColumnKind::Json)
        );
        assert_eq!(
            entity.find_relation("keeper").map(|r| r.kind),
            Some(RelationKind::BelongsTo)
        );
    }

    #[test]
    fn relation_constructors() {
        let rel = RelationDef::has_many("flamingos", "flamingos", "keeper_id");
        assert_eq!(rel.local_key, "id");
        assert_eq!(rel.foreign_key, "keeper_id");
        assert_eq!(rel.kind, RelationKind::HasMany);
    }

    #[test]
    fn safe_identifiers() {
        assert!(is_safe_identifier("keeper_id"));
        assert!(is_safe_identifier("_hidden"));
        assert!(!is_safe_identifier("1st"));
        assert!(!is_safe_identifier("name; DROP TABLE x"));
        assert!(!is_safe_identifier(""));
    }
}
