//! Row sources that execute rendered grid statements.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::GridResult;

/// Executes rendered SQL for a grid builder.
#[async_trait]
pub trait RowSource: Send + Sync {
    /// Run a SELECT and return each row as a JSON object.
    async fn fetch_rows(&self, sql: &str) -> GridResult<Vec<Value>>;

    /// Run a single-value COUNT query.
    async fn fetch_count(&self, sql: &str) -> GridResult<i64>;
}

/// PostgreSQL row source.
///
/// Every statement runs in its own transaction under `SET LOCAL
/// statement_timeout`, so the timeout resets on commit.
#[derive(Debug, Clone)]
pub struct PgRowSource {
    pool: PgPool,
    statement_timeout: Duration,
}

impl PgRowSource {
    /// Default statement timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            statement_timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Open a pool from `config`, check it answers, and apply the configured
    /// statement timeout.
    pub async fn connect(config: &Config) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .connect(config.require_database_url()?)
            .await
            .context("failed to connect to PostgreSQL")?;

        sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .context("database health check failed")?;
        info!(
            max_connections = config.database_max_connections,
            "database connection established"
        );

        Ok(Self::new(pool).with_statement_timeout(config.statement_timeout))
    }

    pub fn with_statement_timeout(mut self, timeout: Duration) -> Self {
        self.statement_timeout = timeout;
        self
    }

    fn timeout_statement(&self) -> String {
        format!(
            "SET LOCAL statement_timeout = '{}ms'",
            self.statement_timeout.as_millis()
        )
    }
}

#[async_trait]
impl RowSource for PgRowSource {
    async fn fetch_rows(&self, sql: &str) -> GridResult<Vec<Value>> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(&self.timeout_statement())
            .execute(&mut *tx)
            .await?;

        let rows: Vec<Value> = sqlx::query_scalar(&format!("SELECT row_to_json(t) FROM ({sql}) t"))
            .fetch_all(&mut *tx)
            .await?;
        tx.commit().await?;

        debug!(rows = rows.len(), "grid rows fetched");
        Ok(rows)
    }

    async fn fetch_count(&self, sql: &str) -> GridResult<i64> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(&self.timeout_statement())
            .execute(&mut *tx)
            .await?;

        let total: i64 = sqlx::query_scalar(sql).fetch_one(&mut *tx).await?;
        tx.commit().await?;

        debug!(total, "grid count fetched");
        Ok(total)
    }
}
