//! mvnx configuration
//!
//! Provides the settings a resolution run needs:
//! - Global user configuration (~/.mvnx/config.toml)
//! - Local repository discovery from Maven's settings.xml
//! - Configuration precedence and merging
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded and merged in the following order (later overrides earlier):
//! 1. Built-in defaults
//! 2. Global config (~/.mvnx/config.toml)
//! 3. Environment variables (MVNX_*)
//! 4. CLI flags ([`ConfigOverrides`])
//!
//! # Example
//!
//! ```no_run
//! use mvnx_config::{ConfigLoader, ConfigOverrides};
//!
//! let mut loader = ConfigLoader::new();
//! let config = loader.load(&ConfigOverrides::default()).unwrap();
//! let resolver = config.resolver().unwrap();
//! ```

pub mod global;
pub mod loader;
pub mod settings;

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {}: {error}", .file.display())]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid settings document {}: {reason}", .file.display())]
    SettingsParseError { file: PathBuf, reason: String },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Home directory not found")]
    HomeNotFound,
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

// Re-export main types
pub use global::{GlobalConfig, PomMode};
pub use loader::{Config, ConfigLoader, ConfigOverrides};
pub use settings::discover_local_repository;
