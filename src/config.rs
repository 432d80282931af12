//! Configuration Module
//!
//! This module defines the configuration for the `iou-contract` binary.
//! Configuration is loaded from TOML files and parsed using serde.

use crate::{Party, PublicKey};
use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Main configuration structure
///
/// # Example TOML
/// ```toml
/// [node]
/// name = "Alice"
/// owning_key = "alice-key"
///
/// [logging]
/// level = "info"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub node: NodeConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Identity of the local node
///
/// # Fields
/// - `name`: Display name of the party
/// - `owning_key`: Identifier of the party's signing key
#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    pub name: String,
    pub owning_key: String,
}

impl NodeConfig {
    pub fn identity(&self) -> Party {
        Party::new(self.name.clone(), PublicKey::new(self.owning_key.clone()))
    }
}

/// Logging configuration
///
/// `level` is the default `tracing` filter; `RUST_LOG` overrides it.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Returns
    /// * `Ok(Config)` if the file was successfully loaded and parsed
    /// * `Err` if the file couldn't be read or the TOML is invalid
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;

        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }
}
