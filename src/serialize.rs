//! Text builder and canonical rendering.
//!
//! The rendered form is the prompt surface for the driving model, so its
//! invariants are load-bearing: one marker character per line immediately
//! before `uid=`, two-space indentation per emitted depth level, and a fixed
//! attribute order. Example:
//!
//! ```text
//! →uid=dom_k2f9xa3b4c5d RootWebArea "Checkout" <body>
//!   *uid=dom_k2f9xe6f7a8 button "Place order" <button>
//!      StaticText "Place order"
//! ```

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::dom::{Node, NodePath, Snapshot, TextSnapshot};
use crate::naming::{self, roles};

/// Derive the working tree for rendering: clones the snapshot tree,
/// promotes `placeholder` into a missing `description`, and precomputes the
/// focus-ancestor set and an insertion-ordered id index.
pub fn build_text(snapshot: &Snapshot, tab_id: Option<i64>) -> TextSnapshot {
    let mut root = snapshot.root.clone();
    promote_placeholders(&mut root);

    let mut focus_ancestors = HashSet::new();
    collect_focus_ancestors(&root, &mut Vec::new(), &mut focus_ancestors);

    let mut id_to_node = IndexMap::new();
    index_preorder(&root, &mut Vec::new(), &mut id_to_node);

    TextSnapshot {
        root,
        id_to_node,
        focus_ancestors,
        tab_id,
    }
}

fn promote_placeholders(node: &mut Node) {
    if node.description.is_none() {
        if let Some(placeholder) = &node.placeholder {
            if !placeholder.trim().is_empty() {
                node.description = Some(placeholder.clone());
            }
        }
    }
    for child in &mut node.children {
        promote_placeholders(child);
    }
}

fn collect_focus_ancestors(node: &Node, stack: &mut Vec<String>, out: &mut HashSet<String>) {
    if node.is_focused() {
        for ancestor in stack.iter() {
            out.insert(ancestor.clone());
        }
    }
    stack.push(node.id.clone());
    for child in &node.children {
        collect_focus_ancestors(child, stack, out);
    }
    stack.pop();
}

fn index_preorder(node: &Node, path: &mut NodePath, out: &mut IndexMap<String, NodePath>) {
    out.insert(node.id.clone(), path.clone());
    for (index, child) in node.children.iter().enumerate() {
        path.push(index);
        index_preorder(child, path, out);
        path.pop();
    }
}

/// Render the canonical, deterministic text form.
pub fn format(snapshot: &TextSnapshot) -> String {
    let mut output = String::new();
    emit(&snapshot.root, 0, snapshot, &mut output);
    output
}

fn emit(node: &Node, depth: usize, snapshot: &TextSnapshot, output: &mut String) {
    if !should_emit_line(node) {
        // No line of its own; children render at the same depth.
        for child in &node.children {
            emit(child, depth, snapshot, output);
        }
        return;
    }

    output.push_str(&"  ".repeat(depth));
    output.push(marker(node, snapshot));

    if node.role == roles::STATIC_TEXT {
        output.push_str(roles::STATIC_TEXT);
        if let Some(name) = &node.name {
            output.push_str(&quoted_name(name));
        }
    } else {
        output.push_str("uid=");
        output.push_str(&node.id);
        output.push(' ');
        output.push_str(&node.role);
        output.push_str(&quoted_name(node.name.as_deref().unwrap_or_default()));
        if let Some(tag) = &node.tag_name {
            output.push_str(&format!(" <{tag}>"));
        }
        push_attrs(node, output);
    }

    output.push('\n');

    for child in &node.children {
        emit(child, depth + 1, snapshot, output);
    }
}

/// `*` on the focused node, `→` on its ancestors, a single space otherwise.
fn marker(node: &Node, snapshot: &TextSnapshot) -> char {
    if node.is_focused() {
        '*'
    } else if snapshot.focus_ancestors.contains(&node.id) {
        '→'
    } else {
        ' '
    }
}

/// Output filter, independent of the tree-shape decisions the collector
/// made: operable and named nodes get a line, bare containers recurse.
fn should_emit_line(node: &Node) -> bool {
    if node.role == roles::ROOT_WEB_AREA {
        return true;
    }
    if naming::is_interactive_role(&node.role) || naming::is_image_role(&node.role) {
        return true;
    }
    let name_len = node
        .name
        .as_deref()
        .map(|name| name.trim().chars().count())
        .unwrap_or(0);
    if node.role == roles::STATIC_TEXT {
        return name_len >= 2;
    }
    name_len > 1
}

fn quoted_name(name: &str) -> String {
    format!(" \"{}\"", escape_quotes(name))
}

fn push_attrs(node: &Node, output: &mut String) {
    if let Some(value) = &node.value {
        if !value.is_empty() {
            output.push_str(&format!(" value=\"{}\"", escape_quotes(value)));
        }
    }
    if let Some(description) = &node.description {
        if !description.is_empty() {
            output.push_str(&format!(" desc=\"{}\"", escape_quotes(description)));
        }
    }
    if let Some(placeholder) = &node.placeholder {
        if !placeholder.is_empty() {
            output.push_str(&format!(" placeholder=\"{}\"", escape_quotes(placeholder)));
        }
    }
    if let Some(checked) = node.checked {
        output.push_str(&format!(" checked=\"{checked}\""));
    }
    if let Some(pressed) = node.pressed {
        output.push_str(&format!(" pressed=\"{pressed}\""));
    }
    if node.disabled == Some(true) {
        output.push_str(" disabled");
    }
    if node.selected == Some(true) {
        output.push_str(" selected");
    }
    if node.expanded == Some(true) {
        output.push_str(" expanded");
    }
    if node.focused == Some(true) {
        output.push_str(" focused");
    }
}

/// Only inner double quotes are escaped; values are otherwise verbatim.
fn escape_quotes(text: &str) -> String {
    text.replace('"', "\\\"")
}
