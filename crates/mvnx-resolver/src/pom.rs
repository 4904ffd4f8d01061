//! POM document model
//!
//! Parses a POM (or `settings.xml`) into an owned tree of [`Element`]s and
//! extracts `<dependency>`-shaped blocks. Pure data extraction: no
//! templating, no management, no network.

use crate::artifact::DEFAULT_PACKAGING;

/// An XML element with its trimmed direct text and child elements
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    /// Local tag name (namespace stripped)
    pub name: String,
    pub text: String,
    pub children: Vec<Element>,
}

impl Element {
    /// Direct children with the given tag name, in document order
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |child| child.name == name)
    }

    /// First direct child with the given tag name
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|child| child.name == name)
    }

    /// Text of the first direct child with the given tag name
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(|child| child.text.as_str())
    }

    fn from_node(node: roxmltree::Node<'_, '_>) -> Self {
        let text: String = node
            .children()
            .filter(|child| child.is_text())
            .filter_map(|child| child.text())
            .collect();

        Self {
            name: node.tag_name().name().to_string(),
            text: text.trim().to_string(),
            children: node
                .children()
                .filter(|child| child.is_element())
                .map(Element::from_node)
                .collect(),
        }
    }
}

/// A parsed POM document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PomDocument {
    root: Element,
}

impl PomDocument {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(text: &str) -> Result<Self, roxmltree::Error> {
        let options = roxmltree::ParsingOptions {
            allow_dtd: true,
            ..Default::default()
        };
        let document = roxmltree::Document::parse_with_options(text, options)?;
        Ok(Self {
            root: Element::from_node(document.root_element()),
        })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, roxmltree::Error> {
        Self::from_str(&String::from_utf8_lossy(bytes))
    }

    /// The document element (`<project>` for a POM)
    pub fn root(&self) -> &Element {
        &self.root
    }
}

/// Fields of a `<dependency>` (or `<parent>`) block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyDecl {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub scope: Option<String>,
    pub classifier: Option<String>,
    /// `<type>`, defaulting to `jar`
    pub packaging: String,
    pub optional: bool,
}

impl DependencyDecl {
    pub fn from_element(element: &Element) -> Self {
        let text = |name: &str| {
            element
                .child_text(name)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };

        Self {
            group_id: text("groupId"),
            artifact_id: text("artifactId"),
            version: text("version"),
            scope: text("scope"),
            classifier: text("classifier"),
            packaging: text("type").unwrap_or_else(|| DEFAULT_PACKAGING.to_string()),
            optional: element.child_text("optional") == Some("true"),
        }
    }
}
