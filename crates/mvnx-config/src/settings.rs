//! Maven settings.xml discovery
//!
//! Only `<localRepository>` is read; profiles, mirrors and proxies are ignored.

use crate::{ConfigError, ConfigResult};
use mvnx_resolver::{template, PomDocument, SystemProperties};
use std::path::{Path, PathBuf};
use tracing::debug;

/// `<home>/.m2`
pub fn user_home_m2(home: &Path) -> PathBuf {
    home.join(".m2")
}

/// `<home>/.m2/settings.xml`
pub fn default_settings_path(home: &Path) -> PathBuf {
    user_home_m2(home).join("settings.xml")
}

/// Local repository root for a Maven installation
///
/// A non-blank `<localRepository>` in the settings document wins, templated
/// against `system`; otherwise `<home>/.m2/repository`. An explicit
/// `settings` path must exist, the default one is optional.
pub fn discover_local_repository(
    home: &Path,
    settings: Option<&Path>,
    system: &SystemProperties,
) -> ConfigResult<PathBuf> {
    let default_repository = user_home_m2(home).join("repository");
    let path = match settings {
        Some(explicit) if !explicit.is_file() => {
            return Err(ConfigError::NotFound(explicit.to_path_buf()));
        }
        Some(explicit) => explicit.to_path_buf(),
        None => default_settings_path(home),
    };
    if !path.is_file() {
        return Ok(default_repository);
    }

    let content = std::fs::read_to_string(&path)?;
    let document =
        PomDocument::from_str(&content).map_err(|e| ConfigError::SettingsParseError {
            file: path.clone(),
            reason: e.to_string(),
        })?;

    match document
        .root()
        .child_text("localRepository")
        .filter(|value| !value.trim().is_empty())
    {
        Some(raw) => {
            let local = PathBuf::from(template(raw, |key| system.lookup(key)));
            debug!(settings = %path.display(), local = %local.display(), "local repository from settings");
            Ok(local)
        }
        None => Ok(default_repository),
    }
}
