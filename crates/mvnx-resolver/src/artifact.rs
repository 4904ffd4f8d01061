//! Artifact data model and Maven coordinates

use crate::graph::ArtifactId;
use crate::pom::DependencyDecl;
use crate::ResolveError;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Packaging assumed when a POM or dependency declaration omits it
pub const DEFAULT_PACKAGING: &str = "jar";

/// Packaging of parent and BOM documents
pub const POM_PACKAGING: &str = "pom";

/// Dependency scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Compile,
    Test,
    Provided,
    Runtime,
    Import,
    System,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Compile => "compile",
            Scope::Test => "test",
            Scope::Provided => "provided",
            Scope::Runtime => "runtime",
            Scope::Import => "import",
            Scope::System => "system",
        }
    }

    /// Parse a scope name as it appears in a POM
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "compile" => Some(Scope::Compile),
            "test" => Some(Scope::Test),
            "provided" => Some(Scope::Provided),
            "runtime" => Some(Scope::Runtime),
            "import" => Some(Scope::Import),
            "system" => Some(Scope::System),
            _ => None,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed `groupId:artifactId[:packaging[:classifier]]:version` string
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Coordinate {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub packaging: Option<String>,
    pub classifier: Option<String>,
}

impl Coordinate {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
            packaging: None,
            classifier: None,
        }
    }
}

impl FromStr for Coordinate {
    type Err = ResolveError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ResolveError::InvalidCoordinate {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let parts: Vec<&str> = input.trim().split(':').collect();
        if parts.iter().any(|part| part.trim().is_empty()) {
            return Err(invalid("empty segment"));
        }

        let owned = |s: &str| s.trim().to_string();
        match parts.as_slice() {
            [group, artifact, version] => Ok(Coordinate::new(
                owned(group),
                owned(artifact),
                owned(version),
            )),
            [group, artifact, packaging, version] => Ok(Coordinate {
                packaging: Some(owned(packaging)),
                ..Coordinate::new(owned(group), owned(artifact), owned(version))
            }),
            [group, artifact, packaging, classifier, version] => Ok(Coordinate {
                packaging: Some(owned(packaging)),
                classifier: Some(owned(classifier)),
                ..Coordinate::new(owned(group), owned(artifact), owned(version))
            }),
            _ => Err(invalid(
                "expected groupId:artifactId[:packaging[:classifier]]:version",
            )),
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group_id, self.artifact_id)?;
        if let Some(packaging) = &self.packaging {
            write!(f, ":{}", packaging)?;
        }
        if let Some(classifier) = &self.classifier {
            write!(f, ":{}", classifier)?;
        }
        write!(f, ":{}", self.version)
    }
}

/// Full identity of an artifact: coordinate identity plus version
///
/// Two artifacts with equal keys occupy the same classpath slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactKey {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub packaging: String,
    pub classifier: Option<String>,
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_coordinate(
            f,
            self.group_id.as_deref(),
            self.artifact_id.as_deref(),
            &self.packaging,
            self.classifier.as_deref(),
            self.version.as_deref(),
        )
    }
}

/// A node of the dependency graph
///
/// Created from a seed coordinate or a `<dependency>` declaration and filled
/// in place while its POM is resolved. Graph edges are [`ArtifactId`]s into
/// the owning [`crate::ArtifactGraph`].
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub packaging: String,
    pub classifier: Option<String>,
    pub scope: Option<String>,
    pub optional: bool,

    /// Resolved parent POM
    pub parent: Option<ArtifactId>,
    /// Direct dependencies in declaration order
    pub dependencies: Vec<ArtifactId>,
    /// Override-only entries, never resolved as graph children
    pub dependency_management: Vec<ArtifactId>,
    /// Properties declared directly on this artifact, untemplated
    pub properties: HashMap<String, String>,
    /// Base URL of the repository that last served this artifact
    pub remote: Option<String>,
}

impl Default for Artifact {
    fn default() -> Self {
        Self {
            group_id: None,
            artifact_id: None,
            version: None,
            packaging: DEFAULT_PACKAGING.to_string(),
            classifier: None,
            scope: None,
            optional: false,
            parent: None,
            dependencies: Vec::new(),
            dependency_management: Vec::new(),
            properties: HashMap::new(),
            remote: None,
        }
    }
}

impl Artifact {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group_id: Some(group_id.into()),
            artifact_id: Some(artifact_id.into()),
            version: Some(version.into()),
            ..Default::default()
        }
    }

    pub fn from_coordinate(coordinate: &Coordinate) -> Self {
        Self {
            packaging: coordinate
                .packaging
                .clone()
                .unwrap_or_else(|| DEFAULT_PACKAGING.to_string()),
            classifier: coordinate.classifier.clone(),
            ..Self::new(
                coordinate.group_id.clone(),
                coordinate.artifact_id.clone(),
                coordinate.version.clone(),
            )
        }
    }

    /// Build an unresolved artifact from a `<dependency>` or `<parent>` block
    pub fn from_decl(decl: DependencyDecl) -> Self {
        Self {
            group_id: decl.group_id,
            artifact_id: decl.artifact_id,
            version: decl.version,
            packaging: decl.packaging,
            classifier: decl.classifier,
            scope: decl.scope,
            optional: decl.optional,
            ..Default::default()
        }
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = Some(scope.as_str().to_string());
        self
    }

    pub fn with_packaging(mut self, packaging: impl Into<String>) -> Self {
        self.packaging = packaging.into();
        self
    }

    pub fn with_classifier(mut self, classifier: impl Into<String>) -> Self {
        self.classifier = Some(classifier.into());
        self
    }

    /// Version-independent identity used for management lookups
    pub fn same_coordinate(&self, other: &Artifact) -> bool {
        self.group_id == other.group_id
            && self.artifact_id == other.artifact_id
            && self.classifier == other.classifier
            && self.packaging == other.packaging
    }

    /// Full identity used for classpath deduplication
    pub fn key(&self) -> ArtifactKey {
        ArtifactKey {
            group_id: self.group_id.clone(),
            artifact_id: self.artifact_id.clone(),
            version: self.version.clone(),
            packaging: self.packaging.clone(),
            classifier: self.classifier.clone(),
        }
    }

    /// Parsed scope, `None` when unset or not a known scope name
    pub fn scope_kind(&self) -> Option<Scope> {
        self.scope.as_deref().and_then(Scope::parse)
    }

    pub fn has_scope(&self, scope: Scope) -> bool {
        self.scope.as_deref() == Some(scope.as_str())
    }

    pub fn is_pom(&self) -> bool {
        self.packaging == POM_PACKAGING
    }

    /// Forget everything learned from this artifact's POM
    ///
    /// Identity, scope, optionality and the remembered remote survive.
    pub fn reset_resolution(&mut self) {
        self.parent = None;
        self.dependencies.clear();
        self.dependency_management.clear();
        self.properties.clear();
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_coordinate(
            f,
            self.group_id.as_deref(),
            self.artifact_id.as_deref(),
            &self.packaging,
            self.classifier.as_deref(),
            self.version.as_deref(),
        )
    }
}

fn write_coordinate(
    f: &mut fmt::Formatter<'_>,
    group_id: Option<&str>,
    artifact_id: Option<&str>,
    packaging: &str,
    classifier: Option<&str>,
    version: Option<&str>,
) -> fmt::Result {
    write!(
        f,
        "{}:{}",
        group_id.unwrap_or("?"),
        artifact_id.unwrap_or("?")
    )?;
    if packaging != DEFAULT_PACKAGING || classifier.is_some() {
        write!(f, ":{}", packaging)?;
    }
    if let Some(classifier) = classifier {
        write!(f, ":{}", classifier)?;
    }
    write!(f, ":{}", version.unwrap_or("?"))
}
