//! Visibility and skip policy: decides whether an element and its subtree
//! are worth visiting at all.

use crate::document::{Document, NodeId};

/// Tags whose subtrees are never visited and contribute no text.
pub const SKIP_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "svg", "head", "meta", "link",
];

pub fn is_skip_tag(tag: &str) -> bool {
    SKIP_TAGS.contains(&tag)
}

/// Conditions that always prune a subtree (unless `include_hidden` is set):
/// `aria-hidden="true"`, the `hidden` or `inert` attributes, `display: none`.
pub fn is_hard_hidden(doc: &Document, id: NodeId) -> bool {
    if doc.attr(id, "aria-hidden") == Some("true") {
        return true;
    }
    if doc.has_attr(id, "hidden") || doc.has_attr(id, "inert") {
        return true;
    }
    doc.computed_style(id)
        .is_some_and(|style| style.is_display_none())
}

/// `visibility: hidden|collapse`, resolved through inheritance. Not a prune
/// by itself: a descendant may re-assert `visibility: visible`, so the
/// collector defers the decision until the subtree has been walked.
pub fn is_visibility_hidden(doc: &Document, id: NodeId) -> bool {
    doc.computed_style(id)
        .is_some_and(|style| style.is_visibility_hidden())
}

/// Weaker check used only to decide whether to emit the node itself: not
/// display:none, not visibility:hidden, not fully transparent. A missing
/// style is treated as visible.
pub fn passes_weak_visibility(doc: &Document, id: NodeId) -> bool {
    match doc.computed_style(id) {
        None => true,
        Some(style) => {
            !style.is_display_none() && !style.is_visibility_hidden() && !style.is_transparent()
        }
    }
}
