//! Classpath projection of a resolved graph

use crate::artifact::{Artifact, ArtifactKey, Scope};
use crate::graph::{ArtifactGraph, ArtifactId};
use crate::repository::{artifact_extension, FetchMode, Located};
use crate::resolver::Resolver;
use crate::template::{management_entry_lookup, template};
use crate::Result;
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

/// Root property naming the default entry point
pub const MAIN_CLASS_PROPERTY: &str = "mainClass";

const PATH_SEPARATOR: &str = if cfg!(windows) { ";" } else { ":" };

/// Standard runtime classpath filter
///
/// Rejects `pom` packaging, `test` and `provided` scopes and optional
/// dependencies.
pub fn classpath_filter(artifact: &Artifact) -> bool {
    !artifact.is_pom()
        && !artifact.has_scope(Scope::Test)
        && !artifact.has_scope(Scope::Provided)
        && !artifact.optional
}

/// Filtered preorder projection of the graph under `root`
///
/// An artifact is visited before its parent chain, which is visited before
/// its dependencies. Parents are always descended so that inherited
/// dependencies are reached; a dependency is descended only when the filter
/// accepts it. The first occurrence of each full identity wins.
pub fn project(
    graph: &ArtifactGraph,
    root: ArtifactId,
    filter: &dyn Fn(&Artifact) -> bool,
) -> Vec<ArtifactId> {
    let mut seen = HashSet::new();
    let mut order = Vec::new();
    visit(graph, root, filter, &mut seen, &mut order);
    order
}

fn visit(
    graph: &ArtifactGraph,
    id: ArtifactId,
    filter: &dyn Fn(&Artifact) -> bool,
    seen: &mut HashSet<ArtifactKey>,
    order: &mut Vec<ArtifactId>,
) {
    let artifact = &graph[id];
    if filter(artifact) && seen.insert(artifact.key()) {
        order.push(id);
    }
    if let Some(parent) = artifact.parent {
        visit(graph, parent, filter, seen, order);
    }
    for &dependency in &artifact.dependencies {
        if filter(&graph[dependency]) {
            visit(graph, dependency, filter, seen, order);
        }
    }
}

/// One located classpath element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClasspathEntry {
    pub artifact: ArtifactKey,
    pub location: Located,
}

/// Ordered, located classpath plus the root's declared entry point
#[derive(Debug, Clone, Default)]
pub struct Classpath {
    entries: Vec<ClasspathEntry>,
    main_class: Option<String>,
}

impl Classpath {
    /// Locate the file of every projected artifact
    ///
    /// [`FetchMode::Probe`] yields remote URLs, any other mode downloads into
    /// the local repository.
    pub fn assemble(
        resolver: &Resolver,
        graph: &mut ArtifactGraph,
        root: ArtifactId,
        filter: &dyn Fn(&Artifact) -> bool,
        mode: FetchMode,
    ) -> Result<Self> {
        let mode = match mode {
            FetchMode::Probe => FetchMode::Probe,
            FetchMode::InMemory | FetchMode::Materialize => FetchMode::Materialize,
        };

        let mut entries = Vec::new();
        for id in project(graph, root, filter) {
            let artifact = &mut graph[id];
            let extension = artifact_extension(&artifact.packaging).to_string();
            let location = resolver.repository().locate(artifact, &extension, mode)?;
            debug!(artifact = %artifact, %location, "classpath entry");
            entries.push(ClasspathEntry {
                artifact: artifact.key(),
                location,
            });
        }

        let main_class = graph[root].properties.get(MAIN_CLASS_PROPERTY).map(|raw| {
            template(
                raw,
                management_entry_lookup(graph, root, resolver.system_properties()),
            )
        });

        Ok(Self {
            entries,
            main_class,
        })
    }

    pub fn entries(&self) -> &[ClasspathEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `mainClass` declared by the root artifact, templated
    pub fn main_class(&self) -> Option<&str> {
        self.main_class.as_deref()
    }

    pub fn local_paths(&self) -> impl Iterator<Item = &Path> {
        self.entries.iter().filter_map(|entry| entry.location.local_path())
    }

    /// Local entries joined with the platform path separator
    pub fn to_path_string(&self) -> String {
        self.local_paths()
            .map(|path| path.display().to_string())
            .collect::<Vec<_>>()
            .join(PATH_SEPARATOR)
    }
}

/// Indented dependency tree under `root`
///
/// Each node lists its own dependencies followed by those inherited from
/// its parent chain; dependencies rejected by `filter` are left out.
pub fn render_tree(
    graph: &ArtifactGraph,
    root: ArtifactId,
    filter: &dyn Fn(&Artifact) -> bool,
) -> String {
    let mut out = format!("{}\n", graph[root]);
    render_children(graph, root, filter, "", &mut out);
    out
}

fn render_children(
    graph: &ArtifactGraph,
    id: ArtifactId,
    filter: &dyn Fn(&Artifact) -> bool,
    prefix: &str,
    out: &mut String,
) {
    let owners = std::iter::once(id).chain(graph.ancestors(id));
    let children: Vec<ArtifactId> = owners
        .flat_map(|owner| graph[owner].dependencies.iter().copied())
        .filter(|&child| filter(&graph[child]))
        .collect();

    for (index, &child) in children.iter().enumerate() {
        let last = index + 1 == children.len();
        let (branch, indent) = if last {
            ("└── ", "    ")
        } else {
            ("├── ", "│   ")
        };
        let artifact = &graph[child];
        out.push_str(&format!(
            "{}{}{} ({})\n",
            prefix,
            branch,
            artifact,
            artifact.scope.as_deref().unwrap_or(Scope::Compile.as_str())
        ));
        render_children(graph, child, filter, &format!("{}{}", prefix, indent), out);
    }
}
