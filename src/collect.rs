//! Single-pass tree transformer: walks a [`Document`], keeps only nodes
//! that are interactive, labelled, or carry visible text, assigns stable
//! ids, and emits the semantic tree plus a flat id index.

use std::collections::HashMap;

use chrono::Utc;
use rand::Rng;
use tracing::debug;

use crate::document::{Document, NodeId};
use crate::dom::{CollectorOptions, Node, NodePath, Snapshot, SnapshotMetadata, TriState};
use crate::naming::{self, roles};
use crate::visibility;

/// Attribute persisted on live elements. Written once per element, never
/// removed; later collections reuse the value, which is what makes ids
/// stable across snapshots.
pub const NODE_ID_ATTR: &str = "data-aipex-nodeid";

/// Capture a snapshot of `doc`. Total: malformed subtrees degrade to empty
/// subtrees, never errors.
pub fn collect(doc: &mut Document, options: CollectorOptions) -> Snapshot {
    let root_element = doc.body().unwrap_or_else(|| doc.document_element());
    let root_id = ensure_node_id(doc, root_element);

    let (mut children, _) = element_children(doc, root_element, &options);
    if options.capture_text_nodes {
        children.extend(text_children(doc, root_element, &root_id));
    }

    let mut root = Node::new(root_id, roles::ROOT_WEB_AREA);
    root.tag_name = doc.tag(root_element).map(str::to_string);
    if !doc.title().is_empty() {
        root.name = Some(doc.title().to_string());
    }
    if doc.active_element() == Some(root_element) {
        root.focused = Some(true);
    }
    root.children = children;

    let id_to_node = index_tree(&root);
    let total_nodes = id_to_node.len();
    debug!(nodes = total_nodes, url = %doc.url(), "collection complete");

    Snapshot {
        metadata: SnapshotMetadata {
            title: doc.title().to_string(),
            url: doc.url().to_string(),
            collected_at: Utc::now().to_rfc3339(),
            options,
        },
        root,
        id_to_node,
        total_nodes,
        timestamp: Utc::now().timestamp_millis(),
    }
}

pub fn collect_with_defaults(doc: &mut Document) -> Snapshot {
    collect(doc, CollectorOptions::default())
}

/// Walk one element. Returns the nodes it contributes to its parent plus
/// the "subtree contains a visibility:visible element" signal used for
/// deferred `visibility: hidden` pruning.
fn walk_element(doc: &mut Document, id: NodeId, options: &CollectorOptions) -> (Vec<Node>, bool) {
    let tag = match doc.tag(id) {
        Some(tag) => tag.to_string(),
        None => return (Vec::new(), false),
    };
    if visibility::is_skip_tag(&tag) {
        return (Vec::new(), false);
    }
    if !options.include_hidden && visibility::is_hard_hidden(doc, id) {
        return (Vec::new(), false);
    }

    let stable_id = ensure_node_id(doc, id);

    let (mut children, child_visible) = if tag == "iframe" {
        frame_children(doc, id, options)
    } else {
        element_children(doc, id, options)
    };

    let self_hidden = visibility::is_visibility_hidden(doc, id);
    if self_hidden && !child_visible {
        return (Vec::new(), false);
    }
    let subtree_visible = !self_hidden || child_visible;

    if options.capture_text_nodes && tag != "iframe" {
        children.extend(text_children(doc, id, &stable_id));
    }

    let role = naming::resolve_role(doc, id);
    // Iframes always materialize so frame content (or its absence) hangs
    // off a node of its own.
    let include_self = should_include_element(doc, id, &tag, &role, options) || tag == "iframe";

    if !include_self {
        return match children.len() {
            0 => (Vec::new(), subtree_visible),
            // Collapse the wrapper: lift its only child.
            1 => (children, subtree_visible),
            // Keep a synthetic container so siblings stay grouped.
            _ => {
                let node = make_node(doc, id, stable_id, role, &tag, children, options);
                (vec![node], subtree_visible)
            }
        };
    }

    let node = make_node(doc, id, stable_id, role, &tag, children, options);
    (vec![node], subtree_visible)
}

fn element_children(
    doc: &mut Document,
    id: NodeId,
    options: &CollectorOptions,
) -> (Vec<Node>, bool) {
    let mut nodes = Vec::new();
    let mut any_visible = false;
    for child in doc.children(id).to_vec() {
        if !doc.is_element(child) {
            continue;
        }
        let (mut emitted, visible) = walk_element(doc, child, options);
        nodes.append(&mut emitted);
        any_visible |= visible;
    }
    (nodes, any_visible)
}

/// Same-origin frame content becomes the iframe node's subtree;
/// cross-origin access is caught and yields no children.
fn frame_children(
    doc: &mut Document,
    id: NodeId,
    options: &CollectorOptions,
) -> (Vec<Node>, bool) {
    match doc.content_document_mut(id) {
        Ok(Some(frame)) => {
            let root = frame.body().unwrap_or_else(|| frame.document_element());
            walk_element(frame, root, options)
        }
        Ok(None) => (Vec::new(), false),
        Err(_) => (Vec::new(), false),
    }
}

/// Direct text-node children, keyed `<parentId>::text-<k>` where `k` is the
/// child's index among all of the parent's child nodes.
fn text_children(doc: &Document, id: NodeId, parent_id: &str) -> Vec<Node> {
    let mut out = Vec::new();
    for (index, &child) in doc.children(id).iter().enumerate() {
        if let Some(raw) = doc.text(child) {
            let text = naming::normalize_whitespace(raw);
            if !text.is_empty() {
                out.push(Node::static_text(format!("{parent_id}::text-{index}"), text));
            }
        }
    }
    out
}

fn should_include_element(
    doc: &Document,
    id: NodeId,
    tag: &str,
    role: &str,
    options: &CollectorOptions,
) -> bool {
    if !options.include_hidden && !visibility::passes_weak_visibility(doc, id) {
        return false;
    }
    if naming::is_interactive_role(role) || naming::is_interactive_tag(tag) {
        return true;
    }
    if naming::is_content_editable(doc, id) {
        return true;
    }
    if doc
        .computed_style(id)
        .is_some_and(|style| style.is_pointer_cursor())
    {
        return true;
    }
    if naming::is_image_role(role)
        && doc.attr(id, "alt").is_some_and(|alt| !alt.trim().is_empty())
    {
        return true;
    }
    if has_explicit_label(doc, id) {
        return true;
    }
    if !naming::is_layout_role(role) {
        if naming::accessible_name(doc, id, role)
            .is_some_and(|name| name.trim().chars().count() > 1)
        {
            return true;
        }
        if naming::visible_text(doc, id).chars().count() >= 2 {
            return true;
        }
    }
    false
}

fn has_explicit_label(doc: &Document, id: NodeId) -> bool {
    if doc
        .attr(id, "aria-label")
        .is_some_and(|label| label.trim().chars().count() > 1)
    {
        return true;
    }
    naming::labelledby_text(doc, id).is_some_and(|label| label.chars().count() > 1)
}

/// Whether the element counts as interactive for `text_content` purposes:
/// interactive role or tag, content-editable, or a pointer cursor.
fn is_interactive_element(doc: &Document, id: NodeId, role: &str, tag: &str) -> bool {
    naming::is_interactive_role(role)
        || naming::is_interactive_tag(tag)
        || naming::is_content_editable(doc, id)
        || doc
            .computed_style(id)
            .is_some_and(|style| style.is_pointer_cursor())
}

fn make_node(
    doc: &Document,
    id: NodeId,
    stable_id: String,
    role: String,
    tag: &str,
    children: Vec<Node>,
    options: &CollectorOptions,
) -> Node {
    let mut node = Node::new(stable_id, role.clone());
    node.tag_name = Some(tag.to_string());
    node.children = children;

    let mut name = naming::accessible_name(doc, id, &role);

    match tag {
        "input" => {
            let input_type = doc.attr(id, "type").unwrap_or("text").to_ascii_lowercase();
            node.input_type = Some(normalized_input_type(&input_type).to_string());
            if let Some(value) = doc.attr(id, "value") {
                node.value = Some(if input_type == "password" {
                    "*".repeat(value.chars().count())
                } else {
                    value.to_string()
                });
            }
            if input_type == "checkbox" || input_type == "radio" {
                node.checked = Some(if doc.has_attr(id, "indeterminate") {
                    TriState::Mixed
                } else if doc.has_attr(id, "checked") {
                    TriState::True
                } else {
                    TriState::False
                });
            }
            if let Some(placeholder) = doc.attr(id, "placeholder") {
                if !placeholder.trim().is_empty() {
                    node.placeholder = Some(placeholder.to_string());
                }
            }
        }
        "textarea" => {
            node.input_type = Some("textarea".to_string());
            let text = naming::visible_text(doc, id);
            if !text.is_empty() {
                node.value = Some(text);
            }
            if let Some(placeholder) = doc.attr(id, "placeholder") {
                if !placeholder.trim().is_empty() {
                    node.placeholder = Some(placeholder.to_string());
                }
            }
        }
        "select" => {
            node.input_type = Some("select".to_string());
            let selected = selected_options(doc, id);
            if !selected.is_empty() {
                let values: Vec<String> =
                    selected.iter().map(|&opt| option_value(doc, opt)).collect();
                node.value = Some(values.join(", "));
                let labels: Vec<String> =
                    selected.iter().map(|&opt| option_label(doc, opt)).collect();
                let label = labels.join(", ");
                if !label.trim().is_empty() {
                    name = Some(label);
                }
            }
        }
        "a" => {
            if let Some(href) = doc.attr(id, "href") {
                node.href = Some(resolve_href(doc.url(), href));
            }
        }
        "img" => {
            if let Some(alt) = doc.attr(id, "alt") {
                if !alt.trim().is_empty() {
                    node.description = Some(alt.to_string());
                }
            }
        }
        _ => {}
    }

    if naming::is_content_editable(doc, id) && node.value.is_none() {
        let text = naming::visible_text(doc, id);
        if !text.is_empty() {
            node.value = Some(text);
        }
    }

    if let Some(title) = doc.attr(id, "title") {
        if !title.trim().is_empty() {
            node.title = Some(title.to_string());
        }
    }
    node.disabled = match doc.attr(id, "aria-disabled") {
        Some(value) if value.eq_ignore_ascii_case("true") => Some(true),
        Some(value) if value.eq_ignore_ascii_case("false") => Some(false),
        _ => doc.has_attr(id, "disabled").then_some(true),
    };
    node.pressed = tri_state_attr(doc, id, "aria-pressed");
    node.expanded = bool_attr(doc, id, "aria-expanded");
    node.selected = bool_attr(doc, id, "aria-selected");
    if doc.active_element() == Some(id) {
        node.focused = Some(true);
    }

    node.name = name.filter(|n| !n.trim().is_empty());

    if is_interactive_element(doc, id, &role, tag) {
        let text = naming::visible_text(doc, id);
        if !text.is_empty() && node.name.as_deref() != Some(text.as_str()) {
            node.text_content = Some(truncate_chars(&text, options.max_text_length));
        }
    }

    node
}

fn tri_state_attr(doc: &Document, id: NodeId, attr: &str) -> Option<TriState> {
    match doc.attr(id, attr)?.to_ascii_lowercase().as_str() {
        "true" => Some(TriState::True),
        "false" => Some(TriState::False),
        "mixed" => Some(TriState::Mixed),
        _ => None,
    }
}

fn bool_attr(doc: &Document, id: NodeId, attr: &str) -> Option<bool> {
    match doc.attr(id, attr)?.to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// `range` inputs surface as sliders; everything else keeps its type.
fn normalized_input_type(input_type: &str) -> &str {
    if input_type == "range" {
        "slider"
    } else {
        input_type
    }
}

fn selected_options(doc: &Document, select: NodeId) -> Vec<NodeId> {
    let mut options = Vec::new();
    gather_options(doc, select, &mut options);
    let selected: Vec<NodeId> = options
        .iter()
        .copied()
        .filter(|&opt| doc.has_attr(opt, "selected"))
        .collect();
    if !selected.is_empty() {
        return selected;
    }
    // A single-select with no explicit selection defaults to its first option.
    if !doc.has_attr(select, "multiple") {
        return options.into_iter().take(1).collect();
    }
    Vec::new()
}

fn gather_options(doc: &Document, id: NodeId, out: &mut Vec<NodeId>) {
    for &child in doc.children(id) {
        if doc.tag(child) == Some("option") {
            out.push(child);
        } else if doc.is_element(child) {
            gather_options(doc, child, out);
        }
    }
}

fn option_value(doc: &Document, option: NodeId) -> String {
    match doc.attr(option, "value") {
        Some(value) => value.to_string(),
        None => naming::visible_text(doc, option),
    }
}

fn option_label(doc: &Document, option: NodeId) -> String {
    match doc.attr(option, "label") {
        Some(label) if !label.trim().is_empty() => label.trim().to_string(),
        _ => naming::visible_text(doc, option),
    }
}

fn resolve_href(base_url: &str, href: &str) -> String {
    if let Ok(base) = url::Url::parse(base_url) {
        if let Ok(resolved) = base.join(href) {
            return resolved.to_string();
        }
    }
    href.to_string()
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((byte, _)) => text[..byte].to_string(),
        None => text.to_string(),
    }
}

fn ensure_node_id(doc: &mut Document, id: NodeId) -> String {
    if let Some(existing) = doc.attr(id, NODE_ID_ATTR) {
        return existing.to_string();
    }
    let fresh = generate_node_id();
    doc.set_attr(id, NODE_ID_ATTR, &fresh);
    fresh
}

const BASE36_DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// `dom_<base36-time-tail><base36-random-6>`.
fn generate_node_id() -> String {
    let time = to_base36(Utc::now().timestamp_millis().unsigned_abs());
    let tail = &time[time.len().saturating_sub(6)..];
    let mut rng = rand::thread_rng();
    let suffix: String = (0..6)
        .map(|_| BASE36_DIGITS[rng.gen_range(0..BASE36_DIGITS.len())] as char)
        .collect();
    format!("dom_{tail}{suffix}")
}

fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE36_DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8(digits).expect("base36 digits are ascii")
}

fn index_tree(root: &Node) -> HashMap<String, NodePath> {
    fn visit(node: &Node, path: &mut NodePath, out: &mut HashMap<String, NodePath>) {
        out.insert(node.id.clone(), path.clone());
        for (index, child) in node.children.iter().enumerate() {
            path.push(index);
            visit(child, path, out);
            path.pop();
        }
    }
    let mut out = HashMap::new();
    visit(root, &mut Vec::new(), &mut out);
    out
}
