//! Database configuration.

use std::path::Path;

use serde::Deserialize;

use crate::error::DbError;
use crate::result_window::WindowOptions;

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    /// Whether new connections start in auto-commit mode
    pub auto_commit: bool,
    /// Options used by `Connection::create_statement`
    pub default_options: WindowOptions,
    /// Maximum rows materialized per query (0 = unlimited)
    pub max_rows: usize,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            auto_commit: true,
            default_options: WindowOptions::default(),
            max_rows: 0,
        }
    }
}

impl DbConfig {
    /// Parses a configuration from JSON. Missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self, DbError> {
        serde_json::from_str(json)
            .map_err(|e| DbError::SerializationError(format!("invalid config: {}", e)))
    }

    /// Loads a JSON configuration file.
    pub fn load(path: &Path) -> Result<Self, DbError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            DbError::IoError(format!("cannot read config {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }
}
