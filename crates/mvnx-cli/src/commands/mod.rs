//! Subcommand implementations
//!
//! Every subcommand resolves one coordinate the same way: load the merged
//! configuration, build a resolver, resolve with the classpath filter the
//! global flags describe.

pub mod classpath;
pub mod run;
pub mod tree;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use mvnx_config::{ConfigLoader, ConfigOverrides};
use mvnx_resolver::{Artifact, Coordinate, Resolution, Resolver, Scope};
use std::path::PathBuf;
use std::time::Duration;

/// Resolution settings taken from the global command line flags
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolveOptions {
    pub repositories: Option<Vec<String>>,
    pub settings: Option<PathBuf>,
    pub local_repository: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
    pub properties: Vec<(String, String)>,
    pub include_test: bool,
    pub include_provided: bool,
    pub include_optional: bool,
    /// Show a spinner on stderr while resolving
    pub progress: bool,
}

impl ResolveOptions {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            repositories: self.repositories.clone(),
            local_repository: self.local_repository.clone(),
            settings: self.settings.clone(),
            timeout_secs: self.timeout_secs,
            pom_mode: None,
            properties: self.properties.clone(),
        }
    }

    /// Classpath filter widened by the `--include-*` flags
    pub fn accepts(&self, artifact: &Artifact) -> bool {
        !artifact.is_pom()
            && (self.include_test || !artifact.has_scope(Scope::Test))
            && (self.include_provided || !artifact.has_scope(Scope::Provided))
            && (self.include_optional || !artifact.optional)
    }
}

/// A configured resolver and one resolved coordinate
pub struct Session {
    pub resolver: Resolver,
    pub resolution: Resolution,
}

/// Load configuration and resolve `coordinate`
pub fn resolve(options: &ResolveOptions, coordinate: &str) -> Result<Session> {
    let coordinate: Coordinate = coordinate
        .parse()
        .with_context(|| format!("Invalid coordinate '{}'", coordinate))?;

    let config = ConfigLoader::new()
        .load(&options.overrides())
        .context("Failed to load configuration")?;
    let resolver = config
        .resolver()
        .context("Failed to set up repository access")?;

    let spinner = options.progress.then(|| {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(80));
        pb.set_message(format!("Resolving {}...", coordinate));
        pb
    });

    let filter = |artifact: &Artifact| options.accepts(artifact);
    let resolution = resolver.resolve_coordinate(&coordinate, &filter);

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    let resolution = resolution.with_context(|| format!("Failed to resolve {}", coordinate))?;

    Ok(Session {
        resolver,
        resolution,
    })
}
