//! # Configuration
//!
//! Settings shared by the CLI and the HTTP server.
//!
//! Values are resolved in three layers, later layers winning:
//!
//! 1. Built-in defaults
//! 2. A TOML file: `--config <path>`, or `bangumi.toml` in the working
//!    directory when present
//! 3. Command-line flags
//!
//! ```toml
//! catalog = "data/anime.json"
//! database = "bangumi.redb"
//! page_size = 60
//!
//! [server]
//! host = "127.0.0.1"
//! port = 8080
//! ```

use bangumi_core::{ExplorerError, Paginator, primitives::DEFAULT_PAGE_SIZE};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "bangumi.toml";

/// Maximum config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Resolved application settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Catalog JSON file produced by the ingestion step.
    pub catalog: PathBuf,
    /// redb database holding subject statuses.
    pub database: PathBuf,
    pub page_size: usize,
    pub server: ServerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            catalog: PathBuf::from("data/anime.json"),
            database: PathBuf::from("bangumi.redb"),
            page_size: DEFAULT_PAGE_SIZE,
            server: ServerConfig::default(),
        }
    }
}

impl AppConfig {
    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ExplorerError> {
        toml::from_str(text)
            .map_err(|e| ExplorerError::DeserializationError(format!("Config: {}", e)))
    }

    /// Load the configuration file.
    ///
    /// An explicit path must exist. Without one, [`DEFAULT_CONFIG_FILE`] is
    /// read if present and the defaults are used otherwise.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ExplorerError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !fallback.is_file() {
                    return Ok(Self::default());
                }
                fallback
            }
        };

        let metadata = std::fs::metadata(&path).map_err(|e| {
            ExplorerError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ExplorerError::DeserializationError(format!(
                "Config file size {} bytes exceeds maximum allowed {} bytes",
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }

        let text = std::fs::read_to_string(&path).map_err(|e| {
            ExplorerError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Self::from_toml_str(&text)
    }

    /// Build the paginator for the configured page size.
    pub fn paginator(&self) -> Result<Paginator, ExplorerError> {
        Paginator::new(self.page_size)
    }

    /// `host:port` for the HTTP listener.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

// =============================================================================
// TESTS
// =============================================================================
