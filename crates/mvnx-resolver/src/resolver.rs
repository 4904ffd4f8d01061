//! Recursive dependency resolution
//!
//! [`Resolver::resolve`] fills an artifact from its POM and recurses into its
//! parent, BOM imports and dependencies. The ancestor stack (root first) is
//! passed down by value; it decides property lookups and dependency
//! management, where the entry nearest the root wins.

use crate::artifact::{Artifact, Coordinate, Scope, POM_PACKAGING};
use crate::classpath::project;
use crate::graph::{ArtifactGraph, ArtifactId};
use crate::pom::{DependencyDecl, Element, PomDocument};
use crate::repository::{FetchMode, RepositoryResolver};
use crate::template::{management_entry_lookup, template, use_site_lookup, SystemProperties};
use crate::{ResolveError, Result};
use tracing::{debug, info, trace, warn};

const PROJECT_GROUP_ID: &str = "project.groupId";
const PROJECT_ARTIFACT_ID: &str = "project.artifactId";
const PROJECT_VERSION: &str = "project.version";
const PROJECT_PARENT_GROUP_ID: &str = "project.parent.groupId";
const PROJECT_PARENT_VERSION: &str = "project.parent.version";

/// A fully resolved graph and its root
#[derive(Debug, Clone)]
pub struct Resolution {
    pub graph: ArtifactGraph,
    pub root: ArtifactId,
}

impl Resolution {
    pub fn root_artifact(&self) -> &Artifact {
        &self.graph[self.root]
    }

    /// Artifacts of the filtered projection, in classpath order
    pub fn classpath_artifacts(&self, filter: &dyn Fn(&Artifact) -> bool) -> Vec<&Artifact> {
        project(&self.graph, self.root, filter)
            .into_iter()
            .map(|id| &self.graph[id])
            .collect()
    }
}

/// Coordinate fields that are templated at a dependency's use site
struct CoordinateFields {
    group_id: Option<String>,
    artifact_id: Option<String>,
    version: Option<String>,
    classifier: Option<String>,
    packaging: String,
    scope: Option<String>,
}

impl CoordinateFields {
    fn templated(artifact: &Artifact, lookup: &dyn Fn(&str) -> Option<String>) -> Self {
        let apply = |value: &Option<String>| value.as_deref().map(|v| template(v, lookup));
        Self {
            group_id: apply(&artifact.group_id),
            artifact_id: apply(&artifact.artifact_id),
            version: apply(&artifact.version),
            classifier: apply(&artifact.classifier),
            packaging: template(&artifact.packaging, lookup),
            scope: apply(&artifact.scope),
        }
    }

    fn assign_to(self, artifact: &mut Artifact) {
        artifact.group_id = self.group_id;
        artifact.artifact_id = self.artifact_id;
        artifact.version = self.version;
        artifact.classifier = self.classifier;
        artifact.packaging = self.packaging;
        artifact.scope = self.scope;
    }
}

/// Builds artifact graphs from POM documents
#[derive(Debug)]
pub struct Resolver {
    repository: RepositoryResolver,
    system: SystemProperties,
    pom_mode: FetchMode,
}

impl Resolver {
    pub fn new(repository: RepositoryResolver) -> Self {
        Self {
            repository,
            system: SystemProperties::from_environment(),
            pom_mode: FetchMode::default(),
        }
    }

    pub fn with_system_properties(mut self, system: SystemProperties) -> Self {
        self.system = system;
        self
    }

    /// How POM documents missing from the local cache are fetched
    pub fn with_pom_mode(mut self, mode: FetchMode) -> Self {
        self.pom_mode = mode;
        self
    }

    pub fn repository(&self) -> &RepositoryResolver {
        &self.repository
    }

    pub fn system_properties(&self) -> &SystemProperties {
        &self.system
    }

    /// Resolve `coordinate` into a fresh graph
    pub fn resolve_coordinate(
        &self,
        coordinate: &Coordinate,
        filter: &dyn Fn(&Artifact) -> bool,
    ) -> Result<Resolution> {
        info!(%coordinate, "resolving");
        let mut graph = ArtifactGraph::new();
        let root = graph.insert(Artifact::from_coordinate(coordinate));
        self.resolve(&mut graph, root, &[], filter)?;
        info!(%coordinate, artifacts = graph.len(), "resolved");
        Ok(Resolution { graph, root })
    }

    /// Fill `id` from its POM and recursively resolve what it refers to
    ///
    /// `ancestors` holds the artifacts that led here, root first. `filter`
    /// prunes dependencies before any network cost is paid for them.
    pub fn resolve(
        &self,
        graph: &mut ArtifactGraph,
        id: ArtifactId,
        ancestors: &[ArtifactId],
        filter: &dyn Fn(&Artifact) -> bool,
    ) -> Result<()> {
        let mut stack = ancestors.to_vec();
        stack.push(id);

        let document = self.load_pom(graph, id)?;
        for element in &document.root().children {
            match element.name.as_str() {
                "parent" => self.apply_parent(graph, id, element, &stack, filter)?,
                "groupId" => graph[id].group_id = Some(element.text.clone()),
                "artifactId" => graph[id].artifact_id = Some(element.text.clone()),
                "version" => {
                    let artifact = &mut graph[id];
                    artifact.version = Some(element.text.clone());
                    artifact
                        .properties
                        .insert(PROJECT_VERSION.to_string(), element.text.clone());
                }
                "packaging" => graph[id].packaging = element.text.clone(),
                "properties" => {
                    let artifact = &mut graph[id];
                    for property in &element.children {
                        artifact
                            .properties
                            .insert(property.name.clone(), property.text.clone());
                    }
                }
                "dependencyManagement" => {
                    self.apply_dependency_management(graph, id, element, &stack, filter)?
                }
                "dependencies" => {
                    for declaration in element.children_named("dependency") {
                        let dependency =
                            graph.insert(Artifact::from_decl(DependencyDecl::from_element(declaration)));
                        graph[id].dependencies.push(dependency);
                    }
                }
                _ => {}
            }
        }
        seed_project_properties(graph, id);

        let dependencies = graph[id].dependencies.clone();
        for dependency in dependencies {
            self.resolve_dependency(graph, dependency, &stack, filter)?;
        }

        self.reconcile_inherited(graph, id, &stack, filter)
    }

    /// Apply dependency management from `dependents` to `target`
    ///
    /// Every dependent contributes its parent chain (eldest first) and each
    /// member of that chain contributes its dependencies, then its
    /// management entries. The first matching entry with a version and the
    /// first with a scope win; the scope defaults to `compile`.
    pub fn manage(&self, graph: &mut ArtifactGraph, target: ArtifactId, dependents: &[ArtifactId]) {
        let (version, scope) = self.managed_values(graph, target, dependents);

        let artifact = &mut graph[target];
        if let Some(version) = version {
            if artifact.version.as_deref() != Some(version.as_str()) {
                trace!(artifact = %artifact, %version, "managed version");
            }
            artifact.version = Some(version);
        }
        artifact.scope = Some(scope.unwrap_or_else(|| Scope::Compile.as_str().to_string()));
    }

    fn managed_values(
        &self,
        graph: &ArtifactGraph,
        target: ArtifactId,
        dependents: &[ArtifactId],
    ) -> (Option<String>, Option<String>) {
        let wanted = &graph[target];
        let mut version = None;
        let mut scope = None;

        for owner in dependents.iter().flat_map(|&dependent| graph.hierarchy(dependent)) {
            let artifact = &graph[owner];
            let candidates = artifact
                .dependencies
                .iter()
                .chain(artifact.dependency_management.iter())
                .map(|&candidate| &graph[candidate])
                .filter(|candidate| candidate.same_coordinate(wanted));

            for candidate in candidates {
                if version.is_none() {
                    // Entries of skipped dependencies were never templated.
                    version = candidate.version.as_deref().map(|v| {
                        template(v, management_entry_lookup(graph, owner, &self.system))
                    });
                }
                if scope.is_none() {
                    scope = candidate.scope.clone();
                }
                if version.is_some() && scope.is_some() {
                    return (version, scope);
                }
            }
        }

        (version, scope)
    }

    fn load_pom(&self, graph: &mut ArtifactGraph, id: ArtifactId) -> Result<PomDocument> {
        let artifact = &mut graph[id];
        let located = self.repository.locate(artifact, POM_PACKAGING, self.pom_mode)?;
        debug!(artifact = %artifact, location = %located, "loading pom");
        let bytes = self.repository.read(located)?;
        PomDocument::from_bytes(&bytes).map_err(|source| ResolveError::MalformedPom {
            coordinate: graph[id].to_string(),
            source,
        })
    }

    fn apply_parent(
        &self,
        graph: &mut ArtifactGraph,
        id: ArtifactId,
        element: &Element,
        stack: &[ArtifactId],
        filter: &dyn Fn(&Artifact) -> bool,
    ) -> Result<()> {
        let parent = Artifact::from_decl(DependencyDecl::from_element(element))
            .with_packaging(POM_PACKAGING);
        let parent = graph.insert(parent);
        ensure_not_on_stack(graph, parent, stack)?;
        self.resolve(graph, parent, stack, filter)?;

        let parent_group = graph[parent].group_id.clone();
        let parent_version = graph[parent].version.clone();

        let artifact = &mut graph[id];
        artifact.parent = Some(parent);
        if artifact.group_id.is_none() {
            artifact.group_id = parent_group.clone();
        }
        if artifact.version.is_none() {
            artifact.version = parent_version.clone();
        }
        if let Some(version) = artifact.version.clone() {
            artifact.properties.insert(PROJECT_VERSION.to_string(), version);
        }
        if let Some(group) = parent_group {
            artifact
                .properties
                .insert(PROJECT_PARENT_GROUP_ID.to_string(), group);
        }
        if let Some(version) = parent_version {
            artifact
                .properties
                .insert(PROJECT_PARENT_VERSION.to_string(), version);
        }
        Ok(())
    }

    fn apply_dependency_management(
        &self,
        graph: &mut ArtifactGraph,
        id: ArtifactId,
        element: &Element,
        stack: &[ArtifactId],
        filter: &dyn Fn(&Artifact) -> bool,
    ) -> Result<()> {
        let declarations = element
            .children_named("dependencies")
            .flat_map(|dependencies| dependencies.children_named("dependency"));

        for declaration in declarations {
            let mut entry = Artifact::from_decl(DependencyDecl::from_element(declaration));
            let fields = {
                let lookup = management_entry_lookup(graph, id, &self.system);
                CoordinateFields::templated(&entry, &lookup)
            };
            fields.assign_to(&mut entry);

            if entry.has_scope(Scope::Import) {
                debug!(bom = %entry, importer = %graph[id], "importing bom");
                let bom = graph.insert(entry);
                ensure_not_on_stack(graph, bom, stack)?;
                self.resolve(graph, bom, stack, filter)?;
                let imported = graph[bom].dependency_management.clone();
                graph[id].dependency_management.extend(imported);
            } else {
                let entry = graph.insert(entry);
                graph[id].dependency_management.push(entry);
            }
        }
        Ok(())
    }

    /// Template, manage and resolve one direct dependency
    ///
    /// The filter runs on the raw declaration, after templating and after
    /// management, so rejected dependencies never reach the network.
    fn resolve_dependency(
        &self,
        graph: &mut ArtifactGraph,
        dependency: ArtifactId,
        stack: &[ArtifactId],
        filter: &dyn Fn(&Artifact) -> bool,
    ) -> Result<()> {
        if !filter(&graph[dependency]) {
            trace!(dependency = %graph[dependency], "skipped before templating");
            return Ok(());
        }

        let fields = {
            let lookup = use_site_lookup(graph, stack, &self.system);
            CoordinateFields::templated(&graph[dependency], &lookup)
        };
        fields.assign_to(&mut graph[dependency]);
        if !filter(&graph[dependency]) {
            trace!(dependency = %graph[dependency], "skipped after templating");
            return Ok(());
        }

        self.manage(graph, dependency, stack);
        if !filter(&graph[dependency]) {
            trace!(dependency = %graph[dependency], "skipped after management");
            return Ok(());
        }

        if graph[dependency].version.is_none() {
            return Err(ResolveError::UnresolvedVersion {
                coordinate: graph[dependency].to_string(),
            });
        }
        ensure_not_on_stack(graph, dependency, stack)?;
        self.resolve(graph, dependency, stack, filter)
    }

    /// Re-manage dependencies declared by ancestors of `id`
    ///
    /// Management visible only from the full stack can change the version
    /// of an inherited dependency; such dependencies are resolved again.
    fn reconcile_inherited(
        &self,
        graph: &mut ArtifactGraph,
        id: ArtifactId,
        stack: &[ArtifactId],
        filter: &dyn Fn(&Artifact) -> bool,
    ) -> Result<()> {
        for ancestor in graph.ancestors(id) {
            let inherited = graph[ancestor].dependencies.clone();
            for dependency in inherited {
                if !filter(&graph[dependency]) {
                    continue;
                }
                let before = graph[dependency].version.clone();
                self.manage(graph, dependency, stack);
                if graph[dependency].version == before || !filter(&graph[dependency]) {
                    continue;
                }

                warn!(
                    dependency = %graph[dependency],
                    previous = before.as_deref().unwrap_or("?"),
                    "inherited dependency re-resolved after management"
                );
                graph[dependency].reset_resolution();
                self.resolve(graph, dependency, stack, filter)?;
            }
        }
        Ok(())
    }
}

fn seed_project_properties(graph: &mut ArtifactGraph, id: ArtifactId) {
    let artifact = &mut graph[id];
    let synthetic = [
        (PROJECT_GROUP_ID, artifact.group_id.clone()),
        (PROJECT_ARTIFACT_ID, artifact.artifact_id.clone()),
        (PROJECT_VERSION, artifact.version.clone()),
    ];
    for (key, value) in synthetic {
        if let Some(value) = value {
            artifact
                .properties
                .entry(key.to_string())
                .or_insert(value);
        }
    }
}

fn ensure_not_on_stack(graph: &ArtifactGraph, candidate: ArtifactId, stack: &[ArtifactId]) -> Result<()> {
    let key = graph[candidate].key();
    if let Some(position) = stack.iter().position(|&id| graph[id].key() == key) {
        let cycle: Vec<String> = stack[position..]
            .iter()
            .map(|&id| graph[id].to_string())
            .chain(std::iter::once(graph[candidate].to_string()))
            .collect();
        return Err(ResolveError::CircularDependency(cycle.join(" -> ")));
    }
    Ok(())
}
