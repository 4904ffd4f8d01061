//! Configuration loading and precedence tests

use mvnx_config::{ConfigError, ConfigLoader, ConfigOverrides, GlobalConfig, PomMode};
use mvnx_resolver::{FetchMode, DEFAULT_TIMEOUT};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serial_test::serial;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

fn create_config_file(dir: &Path, content: &str) -> PathBuf {
    let config_path = dir.join("config.toml");
    fs::write(&config_path, content).unwrap();
    config_path
}

fn loader(dir: &TempDir) -> ConfigLoader {
    ConfigLoader::new()
        .with_global_config_path(dir.path().join("config.toml"))
        .with_home(dir.path())
}

fn clear_env() {
    for key in ["MVNX_REPOSITORIES", "MVNX_LOCAL_REPOSITORY", "MVNX_TIMEOUT_SECS"] {
        env::remove_var(key);
    }
}

// ============================================================================
// Global Config Tests
// ============================================================================

#[test]
fn test_load_global_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = create_config_file(
        temp_dir.path(),
        r#"
local_repository = "/var/cache/m2"
pom_mode = "in-memory"
"#,
    );

    let config = GlobalConfig::load_from_file(&path).unwrap();
    assert_eq!(config.local_repository, Some(PathBuf::from("/var/cache/m2")));
    assert_eq!(config.pom_mode, Some(PomMode::InMemory));
}

#[test]
fn test_missing_global_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let err = GlobalConfig::load_from_file(&temp_dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::NotFound(_)));
}

#[test]
fn test_global_config_serializes_only_set_fields() {
    let config = GlobalConfig {
        timeout_secs: Some(12),
        ..Default::default()
    };
    assert_eq!(toml::to_string(&config).unwrap().trim(), "timeout_secs = 12");
}

#[rstest]
#[case("timeout_secs = 0", "timeout_secs")]
#[case(r#"repositories = ["file:///tmp/repo"]"#, "repositories")]
#[case(r#"repositories = ["::not a url"]"#, "repositories")]
fn test_invalid_values_rejected(#[case] content: &str, #[case] expected_field: &str) {
    let temp_dir = TempDir::new().unwrap();
    let path = create_config_file(temp_dir.path(), content);

    match GlobalConfig::load_from_file(&path).unwrap_err() {
        ConfigError::InvalidValue { field, .. } => assert_eq!(field, expected_field),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_unknown_field_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = create_config_file(temp_dir.path(), "[mirrors]\ncentral = \"x\"\n");
    assert!(matches!(
        GlobalConfig::load_from_file(&path),
        Err(ConfigError::TomlParseError { .. })
    ));
}

// ============================================================================
// Precedence Tests
// ============================================================================

#[test]
#[serial]
fn test_precedence_global_env_cli() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    create_config_file(
        temp_dir.path(),
        r#"
repositories = ["https://global.example/"]
timeout_secs = 1
local_repository = "/global/repo"
"#,
    );
    env::set_var("MVNX_TIMEOUT_SECS", "2");
    env::set_var("MVNX_REPOSITORIES", "https://env.example/");

    let overrides = ConfigOverrides {
        timeout_secs: Some(3),
        ..Default::default()
    };
    let config = loader(&temp_dir).load(&overrides);
    clear_env();
    let config = config.unwrap();

    assert_eq!(config.timeout, Duration::from_secs(3));
    assert_eq!(config.repositories[0].as_str(), "https://env.example/");
    assert_eq!(config.local_repository(), Path::new("/global/repo"));
}

#[test]
#[serial]
fn test_settings_discovery_used_without_explicit_repository() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let m2 = temp_dir.path().join(".m2");
    fs::create_dir_all(&m2).unwrap();
    fs::write(
        m2.join("settings.xml"),
        "<settings><localRepository>${cache.root}/m2</localRepository></settings>",
    )
    .unwrap();

    let overrides = ConfigOverrides {
        properties: vec![("cache.root".to_string(), "/cache".to_string())],
        ..Default::default()
    };
    let config = loader(&temp_dir).load(&overrides).unwrap();

    assert_eq!(config.local_repository(), Path::new("/cache/m2"));
    assert_eq!(config.timeout, DEFAULT_TIMEOUT);
}

#[test]
#[serial]
fn test_resolver_from_config() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let overrides = ConfigOverrides {
        repositories: Some(vec!["https://only.example/maven2".to_string()]),
        pom_mode: Some(PomMode::Materialize),
        ..Default::default()
    };
    let config = loader(&temp_dir).load(&overrides).unwrap();
    assert_eq!(config.pom_mode, FetchMode::Materialize);

    let resolver = config.resolver().unwrap();
    let remotes: Vec<&str> = resolver
        .repository()
        .remotes()
        .iter()
        .map(|url| url.as_str())
        .collect();
    assert_eq!(remotes, vec!["https://only.example/maven2/"]);
    assert_eq!(resolver.repository().local_root(), config.local_repository());
}
