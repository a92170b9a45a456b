//! Configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

/// Runtime configuration for the `grid-query` binary.
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL. Only needed for commands that execute.
    pub database_url: Option<String>,

    /// Maximum database connections in pool (default: 5).
    pub database_max_connections: u32,

    /// Path to the entity schema file (default: ./grid-schema.yml).
    pub schema_path: PathBuf,

    /// Per-statement timeout (default: 10000 ms).
    pub statement_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("DATABASE_URL").ok().filter(|url| !url.is_empty());

        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .context("DATABASE_MAX_CONNECTIONS must be a valid u32")?;

        let schema_path = env::var("GRID_SCHEMA_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./grid-schema.yml"));

        let timeout_ms: u64 = env::var("GRID_STATEMENT_TIMEOUT_MS")
            .unwrap_or_else(|_| "10000".to_string())
            .parse()
            .context("GRID_STATEMENT_TIMEOUT_MS must be a valid u64")?;

        Ok(Self {
            database_url,
            database_max_connections,
            schema_path,
            statement_timeout: Duration::from_millis(timeout_ms),
        })
    }

    /// Connection URL, or an error naming the missing variable.
    pub fn require_database_url(&self) -> Result<&str> {
        self.database_url
            .as_deref()
            .context("DATABASE_URL environment variable is required for this command")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn missing_database_url_is_reported() {
        let config = Config {
            database_url: None,
            database_max_connections: 5,
            schema_path: PathBuf::from("schema.yml"),
            statement_timeout: Duration::from_secs(10),
        };
        let err = config.require_database_url().unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }
}
