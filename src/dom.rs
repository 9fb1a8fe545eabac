use std::collections::HashMap;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Child-index path from a snapshot root down to a node.
pub type NodePath = Vec<usize>;

/// Tri-valued state for `checked` and `pressed` (`aria-pressed` and the
/// checkbox `indeterminate` state both allow "mixed").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriState {
    True,
    False,
    Mixed,
}

impl TriState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::True => "true",
            Self::False => "false",
            Self::Mixed => "mixed",
        }
    }
}

impl fmt::Display for TriState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One node of the semantic tree. Element nodes carry a stable `dom_…` id
/// that is also persisted on the live element; text nodes carry
/// `<parentId>::text-<k>` ids and the `StaticText` role.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub id: String,
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checked: Option<TriState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pressed: Option<TriState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expanded: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focused: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(id: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: role.into(),
            name: None,
            value: None,
            description: None,
            text_content: None,
            tag_name: None,
            input_type: None,
            placeholder: None,
            href: None,
            title: None,
            checked: None,
            pressed: None,
            disabled: None,
            expanded: None,
            selected: None,
            focused: None,
            children: Vec::new(),
        }
    }

    /// Leaf node for a direct text-node child.
    pub fn static_text(id: impl Into<String>, content: impl Into<String>) -> Self {
        let mut node = Self::new(id, crate::naming::roles::STATIC_TEXT);
        node.name = Some(content.into());
        node
    }

    pub fn is_focused(&self) -> bool {
        self.focused == Some(true)
    }
}

/// Options controlling one collection pass. Override individual fields with
/// struct-update syntax: `CollectorOptions { include_hidden: true, ..Default::default() }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectorOptions {
    pub max_text_length: usize,
    pub include_hidden: bool,
    pub capture_text_nodes: bool,
}

impl Default for CollectorOptions {
    fn default() -> Self {
        Self {
            max_text_length: 160,
            include_hidden: false,
            capture_text_nodes: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotMetadata {
    pub title: String,
    pub url: String,
    /// RFC 3339 collection time.
    pub collected_at: String,
    pub options: CollectorOptions,
}

/// A whole-document capture. The root always has role `RootWebArea`;
/// `id_to_node` maps every retained id to its child-index path from the root.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub root: Node,
    pub id_to_node: HashMap<String, NodePath>,
    pub total_nodes: usize,
    /// Epoch milliseconds at collection time.
    pub timestamp: i64,
    pub metadata: SnapshotMetadata,
}

impl Snapshot {
    /// Look up a retained node by its stable id.
    pub fn node(&self, id: &str) -> Option<&Node> {
        resolve_path(&self.root, self.id_to_node.get(id)?)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.id_to_node.contains_key(id)
    }
}

/// Working form used for text rendering: the tree with `placeholder`
/// promoted into missing `description`s, an insertion-ordered id index, and
/// the precomputed focus-ancestor set.
#[derive(Debug, Clone, Serialize)]
pub struct TextSnapshot {
    pub root: Node,
    pub id_to_node: IndexMap<String, NodePath>,
    pub focus_ancestors: std::collections::HashSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tab_id: Option<i64>,
}

impl TextSnapshot {
    pub fn node(&self, id: &str) -> Option<&Node> {
        resolve_path(&self.root, self.id_to_node.get(id)?)
    }
}

pub(crate) fn resolve_path<'a>(root: &'a Node, path: &NodePath) -> Option<&'a Node> {
    let mut current = root;
    for &index in path {
        current = current.children.get(index)?;
    }
    Some(current)
}
