#![allow(clippy::unwrap_used, clippy::expect_used)]
//! PostgreSQL round-trip tests.
//!
//! Run only when `DATABASE_URL` is set. Each test builds the zoo tables as
//! temporary tables on a single-connection pool, so nothing outlives it.

use std::sync::Arc;

use grid_query::grid::{GridOutcome, GridQueryBuilder, PgRowSource};
use grid_query::{GridRequest, SchemaRegistry};
use grid_query_test_utils::{request, zoo_registry, zoo_registry_with_species_tally};
use serde_json::{Value, json};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

const SETUP: &[&str] = &[
    "CREATE TEMP TABLE zoos (id INTEGER PRIMARY KEY, name TEXT, city TEXT)",
    "CREATE TEMP TABLE keepers (id INTEGER PRIMARY KEY, name TEXT, zoo_id INTEGER)",
    "CREATE TEMP TABLE flamingos (
        id INTEGER PRIMARY KEY,
        name TEXT,
        species TEXT,
        weight DOUBLE PRECISION,
        is_hungry BOOLEAN,
        last_vaccinated_on DATE,
        preferred_food_types JSONB,
        custom_properties JSONB,
        keeper_id INTEGER,
        created_at TIMESTAMP DEFAULT now(),
        deleted_at TIMESTAMP
    )",
    "CREATE TEMP TABLE vaccinations (id INTEGER PRIMARY KEY, flamingo_id INTEGER, vaccine TEXT, given_on DATE)",
    "INSERT INTO zoos VALUES (1, 'Artis', 'Amsterdam'), (2, 'Blijdorp', 'Rotterdam')",
    "INSERT INTO keepers VALUES (1, 'Ann', 1), (2, 'Bob', 2)",
    r#"INSERT INTO flamingos (id, name, species, weight, is_hungry, last_vaccinated_on, preferred_food_types, custom_properties, keeper_id, deleted_at) VALUES
        (1, 'Pinky',  'chilean', 2.5, true,  '2024-01-10', '["shrimp", "algae"]', '{"nature": {"mood": "calm"}}',   1, NULL),
        (2, 'Rosa',   'andean',  3.1, false, '2024-03-05', '["algae"]',           '{"nature": {"mood": "grumpy"}}', 1, NULL),
        (3, 'Flo',    'chilean', 4.0, true,  NULL,         '["brine flies"]',     '{}',                             2, NULL),
        (4, 'Ghost',  'james',   1.9, false, '2023-12-01', '[]',                  '{}',                             2, now()),
        (5, 'Salmon', NULL,      2.2, false, '2024-02-20', NULL,                  NULL,                             NULL, NULL)"#,
    "INSERT INTO vaccinations VALUES (1, 1, 'flu', '2024-01-10'), (2, 2, 'flu', '2024-03-05'), (3, 1, 'pox', '2023-06-01')",
];

/// Single-connection pool with the zoo tables, or `None` without a database.
async fn setup() -> Option<PgPool> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&url)
        .await
        .expect("failed to connect to DATABASE_URL");
    for statement in SETUP {
        sqlx::query(statement).execute(&pool).await.unwrap();
    }
    Some(pool)
}

fn registry() -> Arc<SchemaRegistry> {
    Arc::new(zoo_registry())
}

async fn page(pool: &PgPool, request: GridRequest) -> (u64, Vec<Value>) {
    let builder = GridQueryBuilder::for_entity(request, registry(), "flamingos").unwrap();
    let source = PgRowSource::new(pool.clone());
    match builder.respond(&source).await.unwrap() {
        GridOutcome::Rows(response) => (response.total, response.data),
        GridOutcome::Export(_) => panic!("expected rows"),
    }
}

fn ids(rows: &[Value]) -> Vec<i64> {
    rows.iter().map(|row| row["id"].as_i64().unwrap()).collect()
}

#[tokio::test]
async fn test_soft_deleted_rows_are_hidden() {
    let Some(pool) = setup().await else { return };
    let (total, rows) = page(&pool, request().sort("id", "asc").build()).await;
    assert_eq!(total, 4);
    assert_eq!(ids(&rows), vec![1, 2, 3, 5]);
}

#[tokio::test]
async fn test_window_and_total() {
    let Some(pool) = setup().await else { return };
    let (total, rows) = page(&pool, request().sort("weight", "desc").window(1, 3).build()).await;
    assert_eq!(total, 4);
    assert_eq!(ids(&rows), vec![2, 1]);
}

#[tokio::test]
async fn test_filters_against_postgres() {
    let Some(pool) = setup().await else { return };

    let (_, rows) = page(
        &pool,
        request()
            .filter("name", json!({"filterType": "text", "type": "contains", "filter": "os"}))
            .build(),
    )
    .await;
    assert_eq!(ids(&rows), vec![2]);

    let (_, rows) = page(
        &pool,
        request()
            .filter(
                "weight",
                json!({"filterType": "number", "type": "inRange", "filter": 2.4, "filterTo": 3.1}),
            )
            .sort("id", "asc")
            .build(),
    )
    .await;
    assert_eq!(ids(&rows), vec![1, 2]);

    let (_, rows) = page(
        &pool,
        request()
            .filter("species", json!({"filterType": "set", "values": ["andean", null]}))
            .sort("id", "asc")
            .build(),
    )
    .await;
    assert_eq!(ids(&rows), vec![2, 5]);

    let (_, rows) = page(
        &pool,
        request()
            .filter(
                "last_vaccinated_on",
                json!({"filterType": "date", "type": "greaterThan", "dateFrom": "2024-02-20 00:00:00"}),
            )
            .sort("id", "asc")
            .build(),
    )
    .await;
    assert_eq!(ids(&rows), vec![2, 5]);
}

#[tokio::test]
async fn test_relation_and_json_filters_against_postgres() {
    let Some(pool) = setup().await else { return };

    let (_, rows) = page(
        &pool,
        request()
            .filter(
                "keeper.zoo.city",
                json!({"filterType": "text", "type": "equals", "filter": "Rotterdam"}),
            )
            .build(),
    )
    .await;
    assert_eq!(ids(&rows), vec![3]);

    let (_, rows) = page(
        &pool,
        request()
            .filter(
                "custom_properties.nature.mood",
                json!({"filterType": "text", "type": "equals", "filter": "calm"}),
            )
            .build(),
    )
    .await;
    assert_eq!(ids(&rows), vec![1]);
}

#[tokio::test]
async fn test_to_many_sort_against_postgres() {
    let Some(pool) = setup().await else { return };
    // Earliest vaccination: Pinky 2023-06-01, Rosa 2024-03-05; others have none.
    let (_, rows) = page(
        &pool,
        request()
            .filter("vaccinations.vaccine", json!({"filterType": "text", "type": "equals", "filter": "flu"}))
            .sort("vaccinations.given_on", "asc")
            .build(),
    )
    .await;
    assert_eq!(ids(&rows), vec![1, 2]);
}

#[tokio::test]
async fn test_distinct_values_against_postgres() {
    let Some(pool) = setup().await else { return };
    let source = PgRowSource::new(pool.clone());

    let species = GridQueryBuilder::for_entity(request().column("species").build(), registry(), "flamingos")
        .unwrap()
        .distinct_values(&source, &["*"])
        .await
        .unwrap();
    assert_eq!(species, vec![json!("andean"), json!("chilean"), Value::Null]);

    let foods = GridQueryBuilder::for_entity(
        request().column("preferred_food_types").build(),
        registry(),
        "flamingos",
    )
    .unwrap()
    .distinct_values(&source, &["preferred_food_types"])
    .await
    .unwrap();
    assert_eq!(
        foods,
        vec![Value::Null, json!("algae"), json!("brine flies"), json!("shrimp")]
    );
}

#[tokio::test]
async fn test_listed_null_on_relation_filters_back_to_its_rows() {
    let Some(pool) = setup().await else { return };
    let source = PgRowSource::new(pool.clone());

    // Salmon has no keeper, so the joined listing reports a null name.
    let names = GridQueryBuilder::for_entity(request().column("keeper.name").build(), registry(), "flamingos")
        .unwrap()
        .distinct_values(&source, &["*"])
        .await
        .unwrap();
    assert_eq!(names, vec![json!("Ann"), json!("Bob"), Value::Null]);

    let (total, rows) = page(
        &pool,
        request()
            .filter("keeper.name", json!({"filterType": "set", "values": [null]}))
            .build(),
    )
    .await;
    assert_eq!(total, 1);
    assert_eq!(ids(&rows), vec![5]);

    let (total, rows) = page(
        &pool,
        request()
            .filter("keeper.name", json!({"filterType": "set", "values": ["Ann", null]}))
            .sort("id", "asc")
            .build(),
    )
    .await;
    assert_eq!(total, 3);
    assert_eq!(ids(&rows), vec![1, 2, 5]);
}

#[tokio::test]
async fn test_grouped_page_against_postgres() {
    let Some(pool) = setup().await else { return };
    let builder = GridQueryBuilder::for_entity(
        request().custom_filters(json!({"tally": true})).build(),
        zoo_registry_with_species_tally(),
        "flamingos",
    )
    .unwrap();

    let GridOutcome::Rows(response) = builder.respond(&PgRowSource::new(pool)).await.unwrap() else {
        panic!("expected rows");
    };
    assert_eq!(response.total, 3);
    assert_eq!(
        response.data,
        vec![
            json!({"species": "andean", "flamingo_count": 1}),
            json!({"species": "chilean", "flamingo_count": 2}),
            json!({"species": null, "flamingo_count": 1}),
        ]
    );
}
