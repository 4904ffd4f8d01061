//! Global Configuration (~/.mvnx/config.toml)
//!
//! Handles user-level configuration stored in `~/.mvnx/config.toml`.

use crate::{ConfigError, ConfigResult};
use mvnx_resolver::{parse_remotes, FetchMode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Global user configuration from ~/.mvnx/config.toml
///
/// ```toml
/// repositories = ["https://repo.maven.apache.org/maven2/"]
/// local_repository = "/srv/m2"
/// timeout_secs = 30
/// pom_mode = "materialize"
///
/// [properties]
/// "java.version" = "17"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct GlobalConfig {
    /// Remote repository base URLs, searched in order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repositories: Option<Vec<String>>,

    /// Local repository root; bypasses settings.xml discovery
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_repository: Option<PathBuf>,

    /// Per-request timeout for remote repositories
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// How POM documents missing locally are fetched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pom_mode: Option<PomMode>,

    /// Extra properties visible to `${...}` templating
    #[serde(default)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

/// Fetch mode for POM documents
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PomMode {
    /// Keep fetched POMs in memory only
    #[default]
    InMemory,
    /// Persist fetched POMs into the local repository
    Materialize,
}

impl From<PomMode> for FetchMode {
    fn from(mode: PomMode) -> Self {
        match mode {
            PomMode::InMemory => FetchMode::InMemory,
            PomMode::Materialize => FetchMode::Materialize,
        }
    }
}

impl GlobalConfig {
    /// Load global configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the global configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(repositories) = &self.repositories {
            validate_repositories("repositories", repositories)?;
        }
        if let Some(timeout) = self.timeout_secs {
            validate_timeout("timeout_secs", timeout)?;
        }
        Ok(())
    }

    /// Get the global config file path (~/.mvnx/config.toml)
    pub fn global_config_path() -> ConfigResult<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
        Ok(home.join(".mvnx").join("config.toml"))
    }

    /// Merge another global config into this one
    /// Other config takes precedence for non-None values
    pub fn merge(&mut self, other: &GlobalConfig) {
        if other.repositories.is_some() {
            self.repositories = other.repositories.clone();
        }
        if other.local_repository.is_some() {
            self.local_repository = other.local_repository.clone();
        }
        if other.timeout_secs.is_some() {
            self.timeout_secs = other.timeout_secs;
        }
        if other.pom_mode.is_some() {
            self.pom_mode = other.pom_mode;
        }
        self.properties
            .extend(other.properties.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
}

/// Repository URLs must be absolute http(s) URLs, and at least one is needed
pub(crate) fn validate_repositories(field: &str, repositories: &[String]) -> ConfigResult<()> {
    if repositories.is_empty() {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            reason: "at least one repository is required".to_string(),
        });
    }
    parse_remotes(repositories)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidValue {
            field: field.to_string(),
            reason: e.to_string(),
        })
}

pub(crate) fn validate_timeout(field: &str, timeout: u64) -> ConfigResult<()> {
    if timeout == 0 {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(())
}
