//! Column id resolution.
//!
//! A column id is a dotted path: leading segments walk relations, the rest
//! names a column, and segments after a JSON column address nested keys.
//! `keeper.zoo.name` follows two relations; `custom_properties.nature.mood`
//! reads a nested JSON key.

use sea_query::extension::postgres::PgExpr;
use sea_query::{Alias, Expr, SimpleExpr};

use crate::error::{GridError, GridResult};
use crate::schema::{ColumnKind, EntitySchema, RelationKind, SchemaRegistry};

/// One hop across a relation, with everything needed to correlate it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationStep {
    pub name: String,
    pub table: String,
    pub kind: RelationKind,
    /// Column on the entity the step starts from.
    pub local_key: String,
    /// Column on the related entity.
    pub foreign_key: String,
    pub soft_delete: Option<String>,
}

impl RelationStep {
    /// Alias of the related table when reached from `parent_alias`.
    pub fn alias(&self, parent_alias: &str) -> String {
        format!("{parent_alias}__{}", self.name)
    }
}

/// Resolved column id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnPath {
    /// Original column id.
    pub column_id: String,
    pub relations: Vec<RelationStep>,
    pub leaf: String,
    pub json_path: Vec<String>,
    pub kind: ColumnKind,
}

impl ColumnPath {
    pub fn has_relations(&self) -> bool {
        !self.relations.is_empty()
    }

    /// Leaf is a JSON column, addressed whole or through nested keys.
    pub fn is_json(&self) -> bool {
        self.kind == ColumnKind::Json
    }

    /// Leaf addresses a key inside a JSON column.
    pub fn is_nested_json(&self) -> bool {
        !self.json_path.is_empty()
    }

    /// Relation names joined with dots, e.g. `keeper.zoo`.
    pub fn dotted_relation(&self) -> String {
        self.relations
            .iter()
            .map(|r| r.name.as_str())
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Alias of the table holding the leaf when the query starts at `base_alias`.
    pub fn leaf_alias(&self, base_alias: &str) -> String {
        self.relations
            .iter()
            .fold(base_alias.to_string(), |alias, step| step.alias(&alias))
    }

    /// Leaf value expression on the given table alias.
    ///
    /// Nested JSON keys use `->` for intermediate segments and `->>` for the
    /// last, so the result is text.
    pub fn expr(&self, table_alias: &str) -> SimpleExpr {
        let column: SimpleExpr = Expr::col((Alias::new(table_alias), Alias::new(&self.leaf))).into();
        let Some((last, intermediate)) = self.json_path.split_last() else {
            return column;
        };
        intermediate
            .iter()
            .fold(column, |expr, key| expr.get_json_field(key.as_str()))
            .cast_json_field(last.as_str())
    }

    /// Whether this path addresses the given column directly on the subject.
    pub fn is_direct_column(&self, column: &str) -> bool {
        !self.has_relations() && !self.is_nested_json() && self.leaf == column
    }
}

/// Resolves column ids against a schema registry.
pub struct ColumnResolver<'a> {
    registry: &'a SchemaRegistry,
}

impl<'a> ColumnResolver<'a> {
    pub fn new(registry: &'a SchemaRegistry) -> Self {
        Self { registry }
    }

    /// Resolve a column id starting at `base`.
    pub fn resolve(&self, base: &EntitySchema, column_id: &str) -> GridResult<ColumnPath> {
        let segments: Vec<&str> = column_id.split('.').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(GridError::invalid_column(column_id));
        }

        let mut relations = Vec::new();
        let mut current = None;
        let mut consumed = 0;

        for segment in &segments {
            let entity = current.as_deref().unwrap_or(base);
            let Some(relation) = entity.find_relation(segment) else {
                break;
            };
            let target = self
                .registry
                .entity(&relation.entity)
                .map_err(|_| GridError::invalid_column(column_id))?;
            relations.push(RelationStep {
                name: relation.name.clone(),
                table: target.table().to_string(),
                kind: relation.kind,
                local_key: relation.local_key.clone(),
                foreign_key: relation.foreign_key.clone(),
                soft_delete: target.soft_delete.clone(),
            });
            current = Some(target);
            consumed += 1;
        }

        let entity = current.as_deref().unwrap_or(base);
        let tail = &segments[consumed..];
        let Some(first) = tail.first() else {
            return Err(GridError::invalid_column(column_id));
        };

        // A JSON column swallows the rest of the path as nested keys;
        // otherwise the dotted tail must itself be a declared column.
        let json_column = entity
            .find_column(first)
            .filter(|c| c.kind == ColumnKind::Json);
        if let Some(column) = json_column {
            return Ok(ColumnPath {
                column_id: column_id.to_string(),
                relations,
                leaf: column.name.clone(),
                json_path: tail[1..].iter().map(|s| s.to_string()).collect(),
                kind: ColumnKind::Json,
            });
        }

        let leaf = tail.join(".");
        let column = entity
            .find_column(&leaf)
            .ok_or_else(|| GridError::invalid_column(column_id))?;

        Ok(ColumnPath {
            column_id: column_id.to_string(),
            relations,
            leaf: column.name.clone(),
            json_path: Vec::new(),
            kind: column.kind,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::schema::fixtures;
    use sea_query::{PostgresQueryBuilder, Query};

    fn resolve(column_id: &str) -> GridResult<ColumnPath> {
        let registry = fixtures::zoo();
        let flamingos = registry.entity("flamingos").unwrap();
        ColumnResolver::new(&registry).resolve(&flamingos, column_id)
    }

    fn render(expr: SimpleExpr) -> String {
        Query::select()
            .expr(expr)
            .to_owned()
            .to_string(PostgresQueryBuilder)
    }

    #[test]
    fn direct_column() {
        let path = resolve("name").unwrap();
        assert!(!path.has_relations());
        assert_eq!(path.leaf, "name");
        assert_eq!(path.kind, ColumnKind::Text);
        assert!(path.is_direct_column("name"));
    }

    #[test]
    fn relation_chain() {
        let path = resolve("keeper.zoo.city").unwrap();
        assert_eq!(path.dotted_relation(), "keeper.zoo");
        assert_eq!(path.leaf, "city");
        assert_eq!(path.relations[0].table, "keepers");
        assert_eq!(path.relations[1].table, "zoos");
        assert_eq!(path.leaf_alias("flamingos"), "flamingos__keeper__zoo");
    }

    #[test]
    fn json_column_with_nested_keys() {
        let path = resolve("custom_properties.nature.mood").unwrap();
        assert!(path.is_json());
        assert!(path.is_nested_json());
        assert_eq!(path.leaf, "custom_properties");
        assert_eq!(path.json_path, vec!["nature", "mood"]);

        let sql = render(path.expr("flamingos"));
        assert!(
            sql.contains(r#"("flamingos"."custom_properties" -> 'nature') ->> 'mood'"#),
            "{sql}"
        );
    }

    #[test]
    fn whole_json_column() {
        let path = resolve("preferred_food_types").unwrap();
        assert!(path.is_json());
        assert!(!path.is_nested_json());
        let sql = render(path.expr("flamingos"));
        assert!(sql.contains(r#""flamingos"."preferred_food_types""#), "{sql}");
        assert!(!sql.contains("->"), "{sql}");
    }

    #[test]
    fn nested_key_on_scalar_column_is_rejected() {
        let err = resolve("name.first").unwrap_err();
        assert!(matches!(err, GridError::InvalidColumnReference { .. }));
    }

    #[test]
    fn unknown_column_is_rejected() {
        assert!(matches!(
            resolve("wingspan"),
            Err(GridError::InvalidColumnReference { ref column }) if column == "wingspan"
        ));
        assert!(resolve("keeper.wingspan").is_err());
    }

    #[test]
    fn path_ending_at_relation_is_rejected() {
        assert!(resolve("keeper").is_err());
        assert!(resolve("keeper.").is_err());
    }

    #[test]
    fn soft_delete_travels_with_relation_step() {
        let registry = fixtures::zoo();
        let keepers = registry.entity("keepers").unwrap();
        let path = ColumnResolver::new(&registry)
            .resolve(&keepers, "flamingos.name")
            .unwrap();
        assert_eq!(path.relations[0].soft_delete.as_deref(), Some("deleted_at"));
        assert_eq!(path.relations[0].kind, RelationKind::HasMany);
    }
}
