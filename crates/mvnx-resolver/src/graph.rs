//! Arena storage for the artifact graph

use crate::artifact::Artifact;
use std::ops::{Index, IndexMut};

/// Handle to an artifact stored in an [`ArtifactGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactId(usize);

impl ArtifactId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Owns every artifact created during one resolution run
///
/// Artifacts are never removed; ids stay valid for the lifetime of the graph.
#[derive(Debug, Clone, Default)]
pub struct ArtifactGraph {
    artifacts: Vec<Artifact>,
}

impl ArtifactGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, artifact: Artifact) -> ArtifactId {
        self.artifacts.push(artifact);
        ArtifactId(self.artifacts.len() - 1)
    }

    pub fn get(&self, id: ArtifactId) -> Option<&Artifact> {
        self.artifacts.get(id.0)
    }

    pub fn get_mut(&mut self, id: ArtifactId) -> Option<&mut Artifact> {
        self.artifacts.get_mut(id.0)
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ArtifactId, &Artifact)> {
        self.artifacts
            .iter()
            .enumerate()
            .map(|(index, artifact)| (ArtifactId(index), artifact))
    }

    /// Parent chain of `id`, eldest ancestor first, ending with `id` itself
    pub fn hierarchy(&self, id: ArtifactId) -> Vec<ArtifactId> {
        let mut chain = vec![id];
        chain.extend(self.ancestors(id));
        chain.reverse();
        chain
    }

    /// Parent, grandparent, ... of `id` (nearest first, `id` excluded)
    pub fn ancestors(&self, id: ArtifactId) -> Vec<ArtifactId> {
        let mut chain = Vec::new();
        let mut current = self[id].parent;
        while let Some(parent) = current {
            chain.push(parent);
            current = self[parent].parent;
        }
        chain
    }
}

impl Index<ArtifactId> for ArtifactGraph {
    type Output = Artifact;

    fn index(&self, id: ArtifactId) -> &Artifact {
        &self.artifacts[id.0]
    }
}

impl IndexMut<ArtifactId> for ArtifactGraph {
    fn index_mut(&mut self, id: ArtifactId) -> &mut Artifact {
        &mut self.artifacts[id.0]
    }
}
