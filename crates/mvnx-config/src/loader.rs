//! Configuration Loader
//!
//! Handles loading and merging configuration from multiple sources with proper precedence.

use crate::global::{validate_repositories, validate_timeout, GlobalConfig};
use crate::settings::discover_local_repository;
use crate::{ConfigError, ConfigResult};
use mvnx_resolver::{
    parse_remotes, FetchMode, HttpTransport, RepositoryResolver, Resolver, SystemProperties,
    DEFAULT_REMOTES, DEFAULT_TIMEOUT,
};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use url::Url;

const ENV_REPOSITORIES: &str = "MVNX_REPOSITORIES";
const ENV_LOCAL_REPOSITORY: &str = "MVNX_LOCAL_REPOSITORY";
const ENV_TIMEOUT_SECS: &str = "MVNX_TIMEOUT_SECS";

/// Values given on the command line; highest precedence
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub repositories: Option<Vec<String>>,
    pub local_repository: Option<PathBuf>,
    /// Alternative settings.xml for local repository discovery
    pub settings: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
    pub pom_mode: Option<crate::PomMode>,
    /// `-D key=value` pairs
    pub properties: Vec<(String, String)>,
}

/// Configuration loader
///
/// Loads configuration from multiple sources and merges them with proper precedence:
/// 1. Built-in defaults - lowest priority
/// 2. Global config (~/.mvnx/config.toml) - overrides defaults
/// 3. Environment variables (MVNX_*) - overrides global
/// 4. CLI flags - highest priority ([`ConfigOverrides`])
pub struct ConfigLoader {
    /// Cached global config path
    global_config_path: Option<PathBuf>,
    /// Home directory used for settings.xml discovery
    home: Option<PathBuf>,
}

/// Merged configuration result
#[derive(Debug, Clone)]
pub struct Config {
    /// Remote repositories, normalized, in search order
    pub repositories: Vec<Url>,

    /// Local repository root
    pub local_repository: PathBuf,

    /// Per-request timeout
    pub timeout: Duration,

    /// Fetch mode for POM documents
    pub pom_mode: FetchMode,

    /// Properties for `${...}` templating
    pub properties: SystemProperties,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self {
            global_config_path: None,
            home: None,
        }
    }

    /// Read the global configuration from `path` instead of ~/.mvnx/config.toml
    pub fn with_global_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.global_config_path = Some(path.into());
        self
    }

    /// Use `home` instead of the user's home directory
    pub fn with_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = Some(home.into());
        self
    }

    /// Load and merge every configuration source
    pub fn load(&mut self, overrides: &ConfigOverrides) -> ConfigResult<Config> {
        let mut merged = self.load_global_config()?;
        merged.merge(&self.env_overrides()?);
        merged.merge(&GlobalConfig {
            repositories: overrides.repositories.clone(),
            local_repository: overrides.local_repository.clone(),
            timeout_secs: overrides.timeout_secs,
            pom_mode: overrides.pom_mode,
            properties: overrides.properties.iter().cloned().collect(),
        });
        merged.validate()?;

        let mut properties = SystemProperties::from_environment();
        properties.extend(merged.properties.clone());

        let local_repository = match merged.local_repository {
            Some(path) => path,
            None => {
                let home = self.home()?;
                discover_local_repository(&home, overrides.settings.as_deref(), &properties)?
            }
        };

        let repositories = match &merged.repositories {
            Some(urls) => parse_remotes(urls),
            None => parse_remotes(DEFAULT_REMOTES),
        }
        .map_err(|e| ConfigError::InvalidValue {
            field: "repositories".to_string(),
            reason: e.to_string(),
        })?;

        let config = Config {
            repositories,
            local_repository,
            timeout: merged
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_TIMEOUT),
            pom_mode: merged.pom_mode.unwrap_or_default().into(),
            properties,
        };
        debug!(
            local = %config.local_repository.display(),
            remotes = config.repositories.len(),
            timeout = ?config.timeout,
            "configuration loaded"
        );
        Ok(config)
    }

    /// Load global configuration from ~/.mvnx/config.toml
    fn load_global_config(&mut self) -> ConfigResult<GlobalConfig> {
        // Get or cache global config path
        if self.global_config_path.is_none() {
            self.global_config_path = Some(GlobalConfig::global_config_path()?);
        }

        let path = match self.global_config_path.as_ref() {
            Some(path) => path,
            None => return Ok(GlobalConfig::default()),
        };

        // Global config is optional - if it doesn't exist, return default
        if !path.exists() {
            return Ok(GlobalConfig::default());
        }

        GlobalConfig::load_from_file(path)
    }

    /// Environment variable overrides
    ///
    /// MVNX_REPOSITORIES is comma separated; empty entries are ignored and a
    /// value with no entries leaves the repositories unset.
    fn env_overrides(&self) -> ConfigResult<GlobalConfig> {
        let mut config = GlobalConfig::default();

        if let Ok(repositories) = env::var(ENV_REPOSITORIES) {
            let urls: Vec<String> = repositories
                .split(',')
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .map(str::to_string)
                .collect();
            if !urls.is_empty() {
                validate_repositories(ENV_REPOSITORIES, &urls)?;
                config.repositories = Some(urls);
            }
        }

        if let Ok(local) = env::var(ENV_LOCAL_REPOSITORY) {
            if !local.trim().is_empty() {
                config.local_repository = Some(PathBuf::from(local));
            }
        }

        if let Ok(timeout) = env::var(ENV_TIMEOUT_SECS) {
            let secs = timeout
                .trim()
                .parse::<u64>()
                .map_err(|e| ConfigError::InvalidValue {
                    field: ENV_TIMEOUT_SECS.to_string(),
                    reason: e.to_string(),
                })?;
            validate_timeout(ENV_TIMEOUT_SECS, secs)?;
            config.timeout_secs = Some(secs);
        }

        Ok(config)
    }

    fn home(&self) -> ConfigResult<PathBuf> {
        match &self.home {
            Some(home) => Ok(home.clone()),
            None => dirs::home_dir().ok_or(ConfigError::HomeNotFound),
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Repository access over HTTP with the configured timeout
    pub fn repository_resolver(&self) -> mvnx_resolver::Result<RepositoryResolver> {
        Ok(RepositoryResolver::new(
            &self.local_repository,
            self.repositories.clone(),
            HttpTransport::new(self.timeout)?,
        ))
    }

    /// Resolver wired with the configured repositories, properties and POM mode
    pub fn resolver(&self) -> mvnx_resolver::Result<Resolver> {
        Ok(Resolver::new(self.repository_resolver()?)
            .with_system_properties(self.properties.clone())
            .with_pom_mode(self.pom_mode))
    }

    /// Get the local repository root
    pub fn local_repository(&self) -> &Path {
        &self.local_repository
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    fn loader(dir: &TempDir) -> ConfigLoader {
        ConfigLoader::new()
            .with_global_config_path(dir.path().join("config.toml"))
            .with_home(dir.path())
    }

    fn create_config_file(dir: &Path, content: &str) -> PathBuf {
        let config_path = dir.join("config.toml");
        fs::write(&config_path, content).unwrap();
        config_path
    }

    fn clear_env() {
        env::remove_var(ENV_REPOSITORIES);
        env::remove_var(ENV_LOCAL_REPOSITORY);
        env::remove_var(ENV_TIMEOUT_SECS);
    }

    #[test]
    #[serial]
    fn test_defaults_without_any_source() {
        clear_env();
        let temp_dir = TempDir::new().unwrap();

        let config = loader(&temp_dir).load(&ConfigOverrides::default()).unwrap();

        let remotes: Vec<&str> = config.repositories.iter().map(Url::as_str).collect();
        assert_eq!(remotes, DEFAULT_REMOTES.to_vec());
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert_eq!(config.pom_mode, FetchMode::InMemory);
        assert_eq!(
            config.local_repository(),
            temp_dir.path().join(".m2").join("repository")
        );
    }

    #[test]
    #[serial]
    fn test_global_config_applies() {
        clear_env();
        let temp_dir = TempDir::new().unwrap();
        create_config_file(
            temp_dir.path(),
            r#"
repositories = ["https://nexus.example/maven"]
timeout_secs = 3
pom_mode = "materialize"

[properties]
"revision" = "1.2.3"
"#,
        );

        let config = loader(&temp_dir).load(&ConfigOverrides::default()).unwrap();

        assert_eq!(config.repositories[0].as_str(), "https://nexus.example/maven/");
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.pom_mode, FetchMode::Materialize);
        assert_eq!(config.properties.get("revision"), Some("1.2.3"));
    }

    #[test]
    #[serial]
    fn test_env_overrides_global() {
        clear_env();
        let temp_dir = TempDir::new().unwrap();
        create_config_file(temp_dir.path(), "timeout_secs = 3\n");

        env::set_var(ENV_TIMEOUT_SECS, "7");
        env::set_var(ENV_REPOSITORIES, "https://a.example/, https://b.example");
        env::set_var(ENV_LOCAL_REPOSITORY, "/tmp/mvnx-env-repo");

        let config = loader(&temp_dir).load(&ConfigOverrides::default());
        clear_env();
        let config = config.unwrap();

        assert_eq!(config.timeout, Duration::from_secs(7));
        let remotes: Vec<&str> = config.repositories.iter().map(Url::as_str).collect();
        assert_eq!(remotes, vec!["https://a.example/", "https://b.example/"]);
        assert_eq!(config.local_repository(), Path::new("/tmp/mvnx-env-repo"));
    }

    #[test]
    #[serial]
    fn test_blank_env_repositories_keep_defaults() {
        for blank in ["", " , ,"] {
            clear_env();
            let temp_dir = TempDir::new().unwrap();
            env::set_var(ENV_REPOSITORIES, blank);

            let config = loader(&temp_dir).load(&ConfigOverrides::default());
            clear_env();
            let config = config.unwrap();

            let remotes: Vec<&str> = config.repositories.iter().map(Url::as_str).collect();
            assert_eq!(remotes, DEFAULT_REMOTES.to_vec());
        }
    }

    #[test]
    #[serial]
    fn test_cli_overrides_env() {
        clear_env();
        let temp_dir = TempDir::new().unwrap();
        env::set_var(ENV_TIMEOUT_SECS, "7");

        let overrides = ConfigOverrides {
            timeout_secs: Some(9),
            local_repository: Some(PathBuf::from("/cli/repo")),
            properties: vec![("revision".to_string(), "cli".to_string())],
            ..Default::default()
        };
        let config = loader(&temp_dir).load(&overrides);
        clear_env();
        let config = config.unwrap();

        assert_eq!(config.timeout, Duration::from_secs(9));
        assert_eq!(config.local_repository(), Path::new("/cli/repo"));
        assert_eq!(config.properties.get("revision"), Some("cli"));
    }

    #[test]
    #[serial]
    fn test_invalid_env_timeout() {
        clear_env();
        let temp_dir = TempDir::new().unwrap();
        env::set_var(ENV_TIMEOUT_SECS, "soon");

        let result = loader(&temp_dir).load(&ConfigOverrides::default());
        clear_env();

        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    #[serial]
    fn test_settings_override_path() {
        clear_env();
        let temp_dir = TempDir::new().unwrap();
        let settings = temp_dir.path().join("alt-settings.xml");
        fs::write(&settings, "<settings><localRepository>/alt/repo</localRepository></settings>")
            .unwrap();

        let overrides = ConfigOverrides {
            settings: Some(settings),
            ..Default::default()
        };
        let config = loader(&temp_dir).load(&overrides).unwrap();

        assert_eq!(config.local_repository(), Path::new("/alt/repo"));
    }

    #[test]
    #[serial]
    fn test_malformed_global_config() {
        clear_env();
        let temp_dir = TempDir::new().unwrap();
        create_config_file(temp_dir.path(), "timeout_secs = \"ten\"\n");

        let result = loader(&temp_dir).load(&ConfigOverrides::default());
        assert!(matches!(result, Err(ConfigError::TomlParseError { .. })));
    }
}
