//! Core configuration.
//!
//! Every field has a default, so an empty TOML document is a valid configuration:
//!
//! ```toml
//! handler_timeout_ms = 1000
//! bind_address = "0.0.0.0:8080"
//! max_request_bytes = 1048576
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Settings for the dispatch core and the bundled transport adapter.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Per-request deadline covering authentication and the handler.
    pub handler_timeout_ms: u64,

    /// Address the transport adapter listens on.
    pub bind_address: String,

    /// Largest request (head plus body) the transport adapter buffers.
    pub max_request_bytes: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            handler_timeout_ms: 30_000,
            bind_address: "127.0.0.1:8080".to_string(),
            max_request_bytes: 8 * 1024 * 1024,
        }
    }
}

impl CoreConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse, and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Semantic checks serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.handler_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "handler_timeout_ms must be greater than zero".into(),
            ));
        }
        if self.max_request_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_request_bytes must be greater than zero".into(),
            ));
        }
        if self.bind_address.trim().is_empty() {
            return Err(ConfigError::Invalid("bind_address must not be empty".into()));
        }
        Ok(())
    }

    pub fn handler_timeout(&self) -> Duration {
        Duration::from_millis(self.handler_timeout_ms)
    }
}
