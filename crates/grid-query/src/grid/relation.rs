//! Relation traversal: correlated EXISTS chains for filters, scalar
//! subqueries for sorts and LEFT JOINs for value listings.

use sea_query::{
    Alias, Cond, Condition, Expr, IntoCondition, JoinType, Order, Query, SelectStatement,
    SimpleExpr,
};

use super::column::{ColumnPath, RelationStep};
use crate::schema::RelationKind;

/// Table aliases along the path, starting with `base_alias`.
///
/// Entry `i + 1` is the alias of the table reached by relation step `i`.
pub(crate) fn relation_aliases(path: &ColumnPath, base_alias: &str) -> Vec<String> {
    let mut aliases = Vec::with_capacity(path.relations.len() + 1);
    aliases.push(base_alias.to_string());
    for step in &path.relations {
        let next = step.alias(&aliases[aliases.len() - 1]);
        aliases.push(next);
    }
    aliases
}

/// `related.foreign_key = parent.local_key`, plus the related soft-delete guard.
fn correlation(step: &RelationStep, parent_alias: &str, alias: &str) -> Condition {
    let joined = Expr::col((Alias::new(alias), Alias::new(&step.foreign_key)))
        .equals((Alias::new(parent_alias), Alias::new(&step.local_key)));
    let live = step
        .soft_delete
        .as_ref()
        .map(|column| Expr::col((Alias::new(alias), Alias::new(column))).is_null());
    Cond::all().add(joined).add_option(live)
}

/// Nested correlated EXISTS, one per relation step, innermost step first.
///
/// `None` when the path has no relations.
fn exists_chain(
    path: &ColumnPath,
    base_alias: &str,
    predicate: Option<Condition>,
) -> Option<SimpleExpr> {
    let aliases = relation_aliases(path, base_alias);
    let mut inner = predicate;
    let mut exists = None;

    for (i, step) in path.relations.iter().enumerate().rev() {
        let alias = &aliases[i + 1];

        let mut subquery = Query::select();
        subquery
            .expr(Expr::val(1))
            .from_as(Alias::new(&step.table), Alias::new(alias))
            .cond_where(correlation(step, &aliases[i], alias).add_option(inner.take()));
        let expr = Expr::exists(subquery);
        inner = Some(expr.clone().into_condition());
        exists = Some(expr);
    }
    exists
}

/// Wrap a predicate written against the leaf alias in one correlated EXISTS
/// per relation step.
pub(crate) fn wrap_in_exists(
    path: &ColumnPath,
    base_alias: &str,
    predicate: Condition,
) -> Condition {
    match exists_chain(path, base_alias, Some(predicate.clone())) {
        Some(exists) => exists.into_condition(),
        None => predicate,
    }
}

/// Subject rows reaching no row at the end of the relation chain.
///
/// These are the rows a LEFT JOIN reports with a null leaf value.
pub(crate) fn missing_relation(path: &ColumnPath, base_alias: &str) -> Option<SimpleExpr> {
    exists_chain(path, base_alias, None).map(SimpleExpr::not)
}

/// Correlated scalar subquery yielding the related value to sort on.
///
/// Paths crossing a to-many relation aggregate with `MIN` ascending and
/// `MAX` descending so each subject row gets exactly one key.
pub(crate) fn sort_subquery(path: &ColumnPath, base_alias: &str, order: &Order) -> SimpleExpr {
    let aliases = relation_aliases(path, base_alias);
    let leaf = path.expr(&aliases[aliases.len() - 1]);
    let to_many = path
        .relations
        .iter()
        .any(|step| step.kind == RelationKind::HasMany);

    let mut subquery = Query::select();
    if to_many {
        let aggregate = match order {
            Order::Desc => Expr::expr(leaf).max(),
            _ => Expr::expr(leaf).min(),
        };
        subquery.expr(aggregate);
    } else {
        subquery.expr(leaf).limit(1);
    }

    let mut condition = Cond::all();
    for (i, step) in path.relations.iter().enumerate() {
        let parent = &aliases[i];
        let alias = &aliases[i + 1];
        if i == 0 {
            subquery.from_as(Alias::new(&step.table), Alias::new(alias));
            condition = condition.add(correlation(step, parent, alias));
        } else {
            subquery.join_as(
                JoinType::InnerJoin,
                Alias::new(&step.table),
                Alias::new(alias),
                correlation(step, parent, alias),
            );
        }
    }
    subquery.cond_where(condition);

    SimpleExpr::SubQuery(None, Box::new(subquery.into_sub_query_statement()))
}

/// LEFT JOIN every relation on the path so the leaf can be selected directly.
pub(crate) fn join_relations(query: &mut SelectStatement, path: &ColumnPath, base_alias: &str) {
    let aliases = relation_aliases(path, base_alias);
    for (i, step) in path.relations.iter().enumerate() {
        query.join_as(
            JoinType::LeftJoin,
            Alias::new(&step.table),
            Alias::new(&aliases[i + 1]),
            correlation(step, &aliases[i], &aliases[i + 1]),
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::grid::column::ColumnResolver;
    use crate::schema::fixtures;
    use sea_query::{ExprTrait, PostgresQueryBuilder};

    fn path(column_id: &str) -> ColumnPath {
        let registry = fixtures::zoo();
        let flamingos = registry.entity("flamingos").unwrap();
        ColumnResolver::new(&registry)
            .resolve(&flamingos, column_id)
            .unwrap()
    }

    fn render_where(condition: Condition) -> String {
        Query::select()
            .expr(Expr::val(1))
            .from(Alias::new("flamingos"))
            .cond_where(condition)
            .to_string(PostgresQueryBuilder)
    }

    #[test]
    fn aliases_follow_the_chain() {
        assert_eq!(
            relation_aliases(&path("keeper.zoo.name"), "flamingos"),
            vec!["flamingos", "flamingos__keeper", "flamingos__keeper__zoo"]
        );
    }

    #[test]
    fn exists_nests_once_per_relation() {
        let path = path("keeper.zoo.name");
        let predicate = path
            .expr("flamingos__keeper__zoo")
            .eq("Artis")
            .into_condition();
        let sql = render_where(wrap_in_exists(&path, "flamingos", predicate));

        assert_eq!(sql.matches("EXISTS(").count(), 2, "{sql}");
        assert!(
            sql.contains(r#"EXISTS(SELECT 1 FROM "keepers" AS "flamingos__keeper" WHERE "flamingos__keeper"."id" = "flamingos"."keeper_id""#),
            "{sql}"
        );
        assert!(
            sql.contains(r#"FROM "zoos" AS "flamingos__keeper__zoo" WHERE "flamingos__keeper__zoo"."id" = "flamingos__keeper"."zoo_id""#),
            "{sql}"
        );
        assert!(sql.contains(r#""flamingos__keeper__zoo"."name" = 'Artis'"#), "{sql}");
    }

    #[test]
    fn missing_relation_negates_the_bare_chain() {
        let sql = render_where(missing_relation(&path("keeper.zoo.name"), "flamingos").unwrap().into_condition());
        assert!(
            sql.contains(r#"WHERE NOT EXISTS(SELECT 1 FROM "keepers" AS "flamingos__keeper" WHERE "flamingos__keeper"."id" = "flamingos"."keeper_id" AND EXISTS(SELECT 1 FROM "zoos" AS "flamingos__keeper__zoo" WHERE "flamingos__keeper__zoo"."id" = "flamingos__keeper"."zoo_id"))"#),
            "{sql}"
        );
        assert!(missing_relation(&path("name"), "flamingos").is_none());
    }

    #[test]
    fn exists_respects_related_soft_delete() {
        let registry = fixtures::zoo();
        let keepers = registry.entity("keepers").unwrap();
        let path = ColumnResolver::new(&registry)
            .resolve(&keepers, "flamingos.name")
            .unwrap();
        let predicate = path.expr("keepers__flamingos").is_not_null().into_condition();
        let sql = render_where(wrap_in_exists(&path, "keepers", predicate));
        assert!(
            sql.contains(r#""keepers__flamingos"."keeper_id" = "keepers"."id""#),
            "{sql}"
        );
        assert!(
            sql.contains(r#""keepers__flamingos"."deleted_at" IS NULL"#),
            "{sql}"
        );
    }

    #[test]
    fn to_many_sort_aggregates_by_direction() {
        let path = path("vaccinations.given_on");
        let asc = Query::select()
            .expr(sort_subquery(&path, "flamingos", &Order::Asc))
            .to_string(PostgresQueryBuilder);
        assert!(asc.contains(r#"MIN("flamingos__vaccinations"."given_on")"#), "{asc}");
        assert!(
            asc.contains(r#""flamingos__vaccinations"."flamingo_id" = "flamingos"."id""#),
            "{asc}"
        );

        let desc = Query::select()
            .expr(sort_subquery(&path, "flamingos", &Order::Desc))
            .to_string(PostgresQueryBuilder);
        assert!(desc.contains(r#"MAX("flamingos__vaccinations"."given_on")"#), "{desc}");
    }

    #[test]
    fn to_one_sort_selects_the_value() {
        let path = path("keeper.zoo.city");
        let sql = Query::select()
            .expr(sort_subquery(&path, "flamingos", &Order::Asc))
            .to_string(PostgresQueryBuilder);
        assert!(sql.contains(r#"(SELECT "flamingos__keeper__zoo"."city" FROM "keepers" AS "flamingos__keeper" INNER JOIN "zoos" AS "flamingos__keeper__zoo""#), "{sql}");
        assert!(sql.contains("LIMIT 1"), "{sql}");
        assert!(!sql.contains("MIN("), "{sql}");
    }

    #[test]
    fn joins_are_left_joins() {
        let path = path("keeper.name");
        let mut query = Query::select();
        query
            .expr(path.expr("flamingos__keeper"))
            .from(Alias::new("flamingos"));
        join_relations(&mut query, &path, "flamingos");
        let sql = query.to_string(PostgresQueryBuilder);
        assert!(
            sql.contains(r#"LEFT JOIN "keepers" AS "flamingos__keeper" ON "flamingos__keeper"."id" = "flamingos"."keeper_id""#),
            "{sql}"
        );
    }
}
