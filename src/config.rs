//! Split configuration file helpers.
//!
//! A config file pins column names and run modes for a dataset so repeated
//! runs do not depend on remembering flags. Explicit CLI flags win.
use crate::manifest::{MatchMode, DEFAULT_ID_COLUMN, DEFAULT_SPLIT_COLUMN};
use crate::report::TransferMode;
use crate::tree::CompareMode;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Current schema version for split config files.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SplitConfig {
    pub schema_version: u32,
    #[serde(default = "default_id_column")]
    pub id_column: String,
    #[serde(default = "default_split_column")]
    pub split_column: String,
    #[serde(default)]
    pub match_mode: MatchMode,
    #[serde(default)]
    pub mode: TransferMode,
    #[serde(default)]
    pub compare: CompareMode,
}

fn default_id_column() -> String {
    DEFAULT_ID_COLUMN.to_string()
}

fn default_split_column() -> String {
    DEFAULT_SPLIT_COLUMN.to_string()
}

/// Config used when no file is given.
pub fn default_config() -> SplitConfig {
    SplitConfig {
        schema_version: CONFIG_SCHEMA_VERSION,
        id_column: default_id_column(),
        split_column: default_split_column(),
        match_mode: MatchMode::default(),
        mode: TransferMode::default(),
        compare: CompareMode::default(),
    }
}

/// Load and validate a config file.
pub fn load_config(path: &Path) -> Result<SplitConfig> {
    let bytes = fs::read(path).with_context(|| format!("read config {}", path.display()))?;
    let config: SplitConfig = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse config JSON {}", path.display()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validate schema version and column names.
pub fn validate_config(config: &SplitConfig) -> Result<()> {
    if config.schema_version != CONFIG_SCHEMA_VERSION {
        return Err(anyhow!(
            "unsupported config schema_version {} (expected {CONFIG_SCHEMA_VERSION})",
            config.schema_version
        ));
    }
    if config.id_column.trim().is_empty() {
        return Err(anyhow!("id_column must be non-empty"));
    }
    if config.split_column.trim().is_empty() {
        return Err(anyhow!("split_column must be non-empty"));
    }
    if config.id_column.trim() == config.split_column.trim() {
        return Err(anyhow!(
            "id_column and split_column must differ (both {:?})",
            config.id_column
        ));
    }
    Ok(())
}
