//! `${...}` property templating
//!
//! [`template`] substitutes tokens through a caller supplied lookup. The
//! lookup strategies used during resolution live here as well:
//!
//! - [`management_entry_lookup`]: the owning artifact, its direct parent, then
//!   the system lookup.
//! - [`use_site_lookup`]: every artifact on the ancestor stack (nearest
//!   first), then the system lookup.
//! - [`SystemProperties::lookup`]: `env.`-prefixed keys read the process
//!   environment, everything else reads the process-level property table.

use crate::graph::{ArtifactGraph, ArtifactId};
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::LazyLock;

static PROPERTY_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([\w.-]+)\}").expect("property token pattern is valid"));

const ENV_PREFIX: &str = "env.";

/// Replace every `${key}` in `text` with `lookup(key)`, recursively
///
/// Values are templated again before substitution, so properties may refer
/// to other properties. Unknown keys keep their literal token, as does a key
/// that is reached again while its own value is being expanded.
pub fn template<F>(text: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut expanding = Vec::new();
    expand(text, &lookup, &mut expanding)
}

fn expand(
    text: &str,
    lookup: &dyn Fn(&str) -> Option<String>,
    expanding: &mut Vec<String>,
) -> String {
    if !text.contains("${") {
        return text.to_string();
    }

    PROPERTY_TOKEN
        .replace_all(text, |caps: &Captures<'_>| {
            let key = &caps[1];
            if expanding.iter().any(|k| k == key) {
                return caps[0].to_string();
            }
            match lookup(key) {
                Some(value) => {
                    expanding.push(key.to_string());
                    let expanded = expand(&value, lookup, expanding);
                    expanding.pop();
                    expanded
                }
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Process-level property table, the counterpart of JVM system properties
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SystemProperties {
    properties: HashMap<String, String>,
}

impl SystemProperties {
    /// Empty table; only `env.` keys resolve
    pub fn new() -> Self {
        Self::default()
    }

    /// Table seeded with the built-in keys a Maven installation would expose
    pub fn from_environment() -> Self {
        let mut system = Self::new();

        if let Some(home) = dirs::home_dir() {
            system.set("user.home", home.display().to_string());
        }
        if let Ok(dir) = std::env::current_dir() {
            system.set("user.dir", dir.display().to_string());
        }
        if let Some(user) = std::env::var("USER")
            .ok()
            .or_else(|| std::env::var("USERNAME").ok())
        {
            system.set("user.name", user);
        }
        system.set("os.name", std::env::consts::OS);
        system.set("os.arch", std::env::consts::ARCH);
        system.set("file.separator", std::path::MAIN_SEPARATOR.to_string());
        system.set("path.separator", if cfg!(windows) { ";" } else { ":" });
        system.set("line.separator", if cfg!(windows) { "\r\n" } else { "\n" });
        system.set("java.io.tmpdir", std::env::temp_dir().display().to_string());

        system
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Resolve `key` against the environment (`env.` prefix) or the table
    pub fn lookup(&self, key: &str) -> Option<String> {
        match key.strip_prefix(ENV_PREFIX) {
            Some(name) => std::env::var(name).ok(),
            None => self.properties.get(key).cloned(),
        }
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for SystemProperties {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.set(key, value);
        }
    }
}

/// Property declared on `owner` or on its direct parent
fn declared_property(graph: &ArtifactGraph, owner: ArtifactId, key: &str) -> Option<String> {
    let artifact = &graph[owner];
    artifact.properties.get(key).cloned().or_else(|| {
        artifact
            .parent
            .and_then(|parent| graph[parent].properties.get(key).cloned())
    })
}

/// Lookup for a `<dependencyManagement>` entry owned by `owner`
pub fn management_entry_lookup<'a>(
    graph: &'a ArtifactGraph,
    owner: ArtifactId,
    system: &'a SystemProperties,
) -> impl Fn(&str) -> Option<String> + 'a {
    move |key| declared_property(graph, owner, key).or_else(|| system.lookup(key))
}

/// Lookup for a dependency declared somewhere on `stack`
///
/// `stack` runs from the root to the artifact declaring the dependency; the
/// declaring artifact is consulted first.
pub fn use_site_lookup<'a>(
    graph: &'a ArtifactGraph,
    stack: &'a [ArtifactId],
    system: &'a SystemProperties,
) -> impl Fn(&str) -> Option<String> + 'a {
    move |key| {
        stack
            .iter()
            .rev()
            .find_map(|&owner| declared_property(graph, owner, key))
            .or_else(|| system.lookup(key))
    }
}
