//! CLI configuration loading.
//!
//! Read the file, parse it as TOML, and map any failure to `ConfigError`.

use std::path::Path;

use serde::Deserialize;

use ledger_contracts::error::{LedgerError, LedgerResult};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    Memory,
    Sqlite,
}

impl Default for StoreKind {
    fn default() -> Self {
        StoreKind::Memory
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnchorConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,
}

impl Default for AnchorConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            interval_seconds: default_interval_seconds(),
        }
    }
}

fn default_batch_size() -> usize {
    100
}

fn default_interval_seconds() -> u64 {
    300
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LedgerConfig {
    #[serde(default)]
    pub store: StoreKind,
    pub sqlite_path: Option<String>,
    pub system_key_path: Option<String>,
    #[serde(default)]
    pub anchor: AnchorConfig,
}

impl LedgerConfig {
    /// Parse `s` as TOML and build a `LedgerConfig`.
    pub fn from_toml_str(s: &str) -> LedgerResult<Self> {
        toml::from_str(s).map_err(|e| LedgerError::ConfigError {
            reason: format!("failed to parse ledger config TOML: {e}"),
        })
    }

    /// Load configuration from `path`, or fall back to defaults (in-memory
    /// store, ephemeral system key) if the file does not exist — the CLI
    /// must still run without an operator having written a config file yet.
    pub fn load(path: &Path) -> LedgerResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|e| LedgerError::ConfigError {
            reason: format!("failed to read config file '{}': {e}", path.display()),
        })?;
        Self::from_toml_str(&contents)
    }
}
