//! Snapshot diff: compare two captures of the same page and produce a
//! compact change summary.
//!
//! The persisted `data-aipex-nodeid` values give every element the same
//! identity in consecutive snapshots, so the diff is a plain keyed join:
//! Added/Removed/Modified entries, capped at 50 for token efficiency.

use std::collections::HashMap;

use crate::dom::{Node, Snapshot, TriState};

/// Maximum number of diff entries to return.
const MAX_DIFF_ENTRIES: usize = 50;

/// A single change between two snapshots.
#[derive(Debug, Clone, PartialEq)]
pub enum DiffEntry {
    Added(NodeSummary),
    Removed(NodeSummary),
    Modified {
        node: NodeSummary,
        changes: Vec<FieldChange>,
    },
}

/// Compact summary of a node for diff output.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSummary {
    pub id: String,
    pub role: String,
    pub name: Option<String>,
}

impl NodeSummary {
    fn of(node: &Node) -> Self {
        Self {
            id: node.id.clone(),
            role: node.role.clone(),
            name: node.name.clone(),
        }
    }
}

/// What changed about a modified node.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldChange {
    NameChanged {
        old: Option<String>,
        new: Option<String>,
    },
    ValueChanged {
        old: Option<String>,
        new: Option<String>,
    },
    CheckedChanged {
        old: Option<TriState>,
        new: Option<TriState>,
    },
    /// disabled / expanded / selected / focused flipped.
    StateChanged,
}

/// Result of diffing two snapshots.
pub struct DiffResult {
    pub entries: Vec<DiffEntry>,
    pub total_changes: usize,
}

fn flatten<'a>(node: &'a Node, order: &mut Vec<&'a Node>, map: &mut HashMap<&'a str, &'a Node>) {
    order.push(node);
    map.insert(node.id.as_str(), node);
    for child in &node.children {
        flatten(child, order, map);
    }
}

/// Compare two snapshots and return the changes, new-side document order
/// first, then removals in old-side order.
pub fn diff_snapshots(old: &Snapshot, new: &Snapshot) -> DiffResult {
    let mut old_order = Vec::new();
    let mut old_map = HashMap::new();
    flatten(&old.root, &mut old_order, &mut old_map);
    let mut new_order = Vec::new();
    let mut new_map = HashMap::new();
    flatten(&new.root, &mut new_order, &mut new_map);

    let mut entries = Vec::new();

    for node in &new_order {
        match old_map.get(node.id.as_str()) {
            Some(old_node) => {
                let changes = diff_node(old_node, node);
                if !changes.is_empty() {
                    entries.push(DiffEntry::Modified {
                        node: NodeSummary::of(node),
                        changes,
                    });
                }
            }
            None => entries.push(DiffEntry::Added(NodeSummary::of(node))),
        }
    }

    for node in &old_order {
        if !new_map.contains_key(node.id.as_str()) {
            entries.push(DiffEntry::Removed(NodeSummary::of(node)));
        }
    }

    let total = entries.len();
    entries.truncate(MAX_DIFF_ENTRIES);

    DiffResult {
        entries,
        total_changes: total,
    }
}

fn diff_node(old: &Node, new: &Node) -> Vec<FieldChange> {
    let mut changes = Vec::new();

    if old.name != new.name {
        changes.push(FieldChange::NameChanged {
            old: old.name.clone(),
            new: new.name.clone(),
        });
    }
    if old.value != new.value {
        changes.push(FieldChange::ValueChanged {
            old: old.value.clone(),
            new: new.value.clone(),
        });
    }
    if old.checked != new.checked {
        changes.push(FieldChange::CheckedChanged {
            old: old.checked,
            new: new.checked,
        });
    }
    if old.disabled != new.disabled
        || old.expanded != new.expanded
        || old.selected != new.selected
        || old.focused != new.focused
    {
        changes.push(FieldChange::StateChanged);
    }

    changes
}

/// Format a diff result into compact text output.
pub fn format_diff(diff: &DiffResult) -> String {
    if diff.entries.is_empty() {
        return "no changes".into();
    }

    let mut output = format!("diff: {} changes\n", diff.total_changes);

    for entry in &diff.entries {
        match entry {
            DiffEntry::Added(node) => {
                output.push_str("+ ");
                format_summary(node, &mut output);
                output.push('\n');
            }
            DiffEntry::Removed(node) => {
                output.push_str("- ");
                format_summary(node, &mut output);
                output.push('\n');
            }
            DiffEntry::Modified { node, changes } => {
                output.push_str("~ ");
                format_summary(node, &mut output);
                for change in changes {
                    match change {
                        FieldChange::ValueChanged { old, new } => {
                            output.push_str(&format!(
                                " = \"{}\" -> \"{}\"",
                                old.as_deref().unwrap_or_default(),
                                new.as_deref().unwrap_or_default()
                            ));
                        }
                        FieldChange::NameChanged { old, new } => {
                            output.push_str(&format!(
                                " name: \"{}\" -> \"{}\"",
                                old.as_deref().unwrap_or_default(),
                                new.as_deref().unwrap_or_default()
                            ));
                        }
                        FieldChange::CheckedChanged { old, new } => {
                            output.push_str(&format!(
                                " checked: {} -> {}",
                                old.map_or("none", TriState::as_str),
                                new.map_or("none", TriState::as_str)
                            ));
                        }
                        FieldChange::StateChanged => {
                            output.push_str(" [state changed]");
                        }
                    }
                }
                output.push('\n');
            }
        }
    }

    if diff.total_changes > MAX_DIFF_ENTRIES {
        output.push_str(&format!(
            "...and {} more changes\n",
            diff.total_changes - MAX_DIFF_ENTRIES
        ));
    }

    output
}

fn format_summary(node: &NodeSummary, output: &mut String) {
    output.push_str(&node.role);
    output.push_str(&format!(" uid={}", node.id));
    if let Some(name) = &node.name {
        let display = if name.chars().count() > 40 {
            let truncated: String = name.chars().take(37).collect();
            format!("{truncated}...")
        } else {
            name.clone()
        };
        output.push_str(&format!(" \"{display}\""));
    }
}
