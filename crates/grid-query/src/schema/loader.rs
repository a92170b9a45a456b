//! Schema file loading.
//!
//! Schemas are declared in YAML (`.yml`/`.yaml`) or TOML (`.toml`) files
//! holding a top-level `entities` list.

use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::registry::SchemaRegistry;
use super::types::EntitySchema;

/// Maximum schema file size (1 MB).
const MAX_SCHEMA_FILE_SIZE: u64 = 1024 * 1024;

/// On-disk schema document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaFile {
    #[serde(default)]
    pub entities: Vec<EntitySchema>,
}

/// Supported schema file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaFormat {
    Yaml,
    Toml,
}

impl SchemaFormat {
    /// Pick a format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yml" | "yaml") => Some(SchemaFormat::Yaml),
            Some("toml") => Some(SchemaFormat::Toml),
            _ => None,
        }
    }
}

/// Parse a schema document and build a validated registry.
pub fn parse_schema(contents: &str, format: SchemaFormat) -> Result<SchemaRegistry> {
    let file: SchemaFile = match format {
        SchemaFormat::Yaml => serde_yml::from_str(contents).context("invalid YAML schema")?,
        SchemaFormat::Toml => toml::from_str(contents).context("invalid TOML schema")?,
    };

    debug!(entities = file.entities.len(), "parsed schema document");
    SchemaRegistry::from_entities(file.entities).context("schema failed validation")
}

/// Load a schema file from disk.
pub fn load_schema(path: &Path) -> Result<SchemaRegistry> {
    let Some(format) = SchemaFormat::from_path(path) else {
        bail!(
            "unsupported schema file extension: {} (expected .yml, .yaml or .toml)",
            path.display()
        );
    };

    let metadata = std::fs::metadata(path)
        .with_context(|| format!("failed to stat schema file {}", path.display()))?;
    if metadata.len() > MAX_SCHEMA_FILE_SIZE {
        bail!(
            "schema file {} exceeds {} bytes",
            path.display(),
            MAX_SCHEMA_FILE_SIZE
        );
    }

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read schema file {}", path.display()))?;
    let registry = parse_schema(&contents, format)
        .with_context(|| format!("failed to load schema {}", path.display()))?;

    info!(
        path = %path.display(),
        entities = registry.entity_names().len(),
        "schema loaded"
    );
    Ok(registry)
}
