//! mvnx dependency resolution
//!
//! Resolves a Maven coordinate into a scope- and version-correct dependency
//! graph using nothing but the Maven repository layout and POM documents:
//! parent inheritance, dependency management (including BOM imports), scope
//! defaulting and `${...}` property templating. The resolved graph is then
//! projected into an ordered, deduplicated classpath.
//!
//! # Example
//!
//! ```no_run
//! use mvnx_resolver::{classpath_filter, Coordinate, RepositoryResolver, Resolver};
//!
//! let repository = RepositoryResolver::with_defaults("/home/me/.m2/repository").unwrap();
//! let resolver = Resolver::new(repository);
//! let coordinate: Coordinate = "junit:junit:4.10".parse().unwrap();
//! let resolution = resolver.resolve_coordinate(&coordinate, &classpath_filter).unwrap();
//! for artifact in resolution.classpath_artifacts(&classpath_filter) {
//!     println!("{artifact}");
//! }
//! ```

pub mod artifact;
pub mod classpath;
pub mod graph;
pub mod pom;
pub mod repository;
pub mod resolver;
pub mod template;

pub use artifact::{Artifact, ArtifactKey, Coordinate, Scope};
pub use classpath::{
    classpath_filter, project, render_tree, Classpath, ClasspathEntry, MAIN_CLASS_PROPERTY,
};
pub use graph::{ArtifactGraph, ArtifactId};
pub use pom::{DependencyDecl, Element, PomDocument};
pub use repository::{
    artifact_extension, parse_remotes, repository_path, CancellationFlag, FetchMode, HttpTransport,
    Located, RepositoryResolver, Transport, DEFAULT_REMOTES, DEFAULT_TIMEOUT,
};
pub use resolver::{Resolution, Resolver};
pub use template::{template, SystemProperties};

use std::path::PathBuf;
use thiserror::Error;

/// Dependency resolution errors
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Invalid coordinate '{input}': {reason}")]
    InvalidCoordinate { input: String, reason: String },

    #[error("Invalid repository URL '{url}': {reason}")]
    InvalidRepository { url: String, reason: String },

    #[error("Download failed for {coordinate}: {path} (tried: {})", .repositories.join(", "))]
    DownloadFailed {
        coordinate: String,
        path: String,
        repositories: Vec<String>,
    },

    #[error("Transport error for {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Malformed POM for {coordinate}: {source}")]
    MalformedPom {
        coordinate: String,
        #[source]
        source: roxmltree::Error,
    },

    #[error("No version could be resolved for {coordinate}")]
    UnresolvedVersion { coordinate: String },

    #[error("Circular dependency detected: {0}")]
    CircularDependency(String),

    #[error("Resolution cancelled")]
    Cancelled,

    #[error("IO error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, ResolveError>;
