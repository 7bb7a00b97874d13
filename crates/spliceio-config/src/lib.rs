//! Configuration management system for spliceio
//!
//! This crate loads the settings that shape a splice engine instance and the host's logging
//! from layered sources:
//!
//! - **Defaults**: Every option has a sensible default
//! - **Files**: YAML, TOML or JSON configuration files
//! - **Environment overrides**: `SPLICEIO__ENGINE__CHUNK_SIZE=131072` and friends
//! - **Validation**: Values are checked after all layers are merged
//!
//! # Examples
//!
//! ```rust
//! use spliceio_config::ConfigBuilder;
//!
//! let config = ConfigBuilder::new()
//!     .add_defaults()
//!     .add_env_prefix("SPLICEIO")
//!     .build()
//!     .expect("Failed to load configuration");
//!
//! println!("Chunk size: {}", config.engine.chunk_size.get());
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

use serde::{Deserialize, Serialize};
use spliceio_types::{CapabilityScope, ChunkSize};

pub mod builder;
pub mod error;
pub mod loader;

pub use builder::ConfigBuilder;
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;

/// Main configuration structure for spliceio
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Splice engine configuration
    #[serde(default)]
    pub engine: EngineConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Splice engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Per-call ceiling for file-to-pipe moves
    #[serde(default)]
    pub chunk_size: ChunkSize,
    /// Start optimistic about vmsplice-to-user support; `false` forces the copying read path
    #[serde(default = "default_zero_copy")]
    pub zero_copy: bool,
    /// Where a detected lack of vmsplice-to-user support is remembered
    #[serde(default)]
    pub capability_scope: CapabilityScope,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chunk_size: ChunkSize::default(),
            zero_copy: true,
            capability_scope: CapabilityScope::Instance,
        }
    }
}

fn default_zero_copy() -> bool {
    true
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatting
    #[serde(default)]
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.engine.chunk_size.get(), 64 * 1024);
        assert!(config.engine.zero_copy);
        assert_eq!(config.engine.capability_scope, CapabilityScope::Instance);
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json_format);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: Config = serde_yaml::from_str("engine:\n  zero_copy: false\n").unwrap();
        assert!(!config.engine.zero_copy);
        assert_eq!(config.engine.chunk_size, ChunkSize::default());
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_invalid_chunk_size_rejected() {
        let result: Result<Config, _> = serde_yaml::from_str("engine:\n  chunk_size: 5000\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_capability_scope_lowercase() {
        let config: Config =
            serde_yaml::from_str("engine:\n  capability_scope: process\n").unwrap();
        assert_eq!(config.engine.capability_scope, CapabilityScope::Process);
    }
}
