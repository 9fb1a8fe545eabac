//! Role and accessible-name resolution, plus the text normalization shared
//! by both.

use crate::document::{Document, NodeId};
use crate::visibility;

/// Role strings used by the resolver. Explicit `role` attributes pass
/// through verbatim, so roles are open-ended strings rather than an enum.
pub mod roles {
    pub const ROOT_WEB_AREA: &str = "RootWebArea";
    pub const STATIC_TEXT: &str = "StaticText";
    pub const GENERIC: &str = "generic";
    pub const BUTTON: &str = "button";
    pub const LINK: &str = "link";
    pub const TEXTBOX: &str = "textbox";
    pub const COMBOBOX: &str = "combobox";
    pub const CHECKBOX: &str = "checkbox";
    pub const RADIO: &str = "radio";
    pub const SLIDER: &str = "slider";
    pub const SPINBUTTON: &str = "spinbutton";
    pub const SEARCHBOX: &str = "searchbox";
    pub const IMAGE: &str = "image";
}

/// Roles an agent can act on.
pub const INTERACTIVE_ROLES: &[&str] = &[
    "button",
    "checkbox",
    "combobox",
    "link",
    "menuitem",
    "radio",
    "searchbox",
    "slider",
    "spinbutton",
    "switch",
    "tab",
    "textbox",
];

/// Tags treated as interactive regardless of resolved role.
pub const INTERACTIVE_TAGS: &[&str] = &[
    "a", "button", "summary", "details", "select", "textarea", "input", "label", "video", "audio",
];

/// Container roles that are never retained on text alone.
pub const LAYOUT_ROLES: &[&str] = &[
    "generic",
    "article",
    "section",
    "region",
    "group",
    "main",
    "complementary",
    "navigation",
    "banner",
    "contentinfo",
];

pub fn is_interactive_role(role: &str) -> bool {
    INTERACTIVE_ROLES.contains(&role)
}

pub fn is_interactive_tag(tag: &str) -> bool {
    INTERACTIVE_TAGS.contains(&tag)
}

pub fn is_layout_role(role: &str) -> bool {
    LAYOUT_ROLES.contains(&role)
}

pub fn is_image_role(role: &str) -> bool {
    role == "image" || role == "img"
}

/// `contenteditable` present and not explicitly "false".
pub fn is_content_editable(doc: &Document, id: NodeId) -> bool {
    match doc.attr(id, "contenteditable") {
        Some(value) => !value.eq_ignore_ascii_case("false"),
        None => false,
    }
}

/// Collapse any whitespace run (Unicode classes) into a single space, then
/// trim.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalized concatenation of all descendant text nodes, in document
/// order, excluding skip-tag subtrees.
pub fn visible_text(doc: &Document, id: NodeId) -> String {
    let mut buffer = String::new();
    append_text(doc, id, &mut buffer);
    normalize_whitespace(&buffer)
}

fn append_text(doc: &Document, id: NodeId, buffer: &mut String) {
    if let Some(tag) = doc.tag(id) {
        if visibility::is_skip_tag(tag) {
            return;
        }
    }
    if let Some(text) = doc.text(id) {
        buffer.push_str(text);
        return;
    }
    for &child in doc.children(id) {
        append_text(doc, child, buffer);
    }
}

/// Resolve the role of an element: explicit `role` attribute first, then
/// tag-based mapping, then the `input` type table, then content-editable,
/// otherwise `generic`.
pub fn resolve_role(doc: &Document, id: NodeId) -> String {
    if let Some(explicit) = doc.attr(id, "role") {
        let explicit = explicit.trim();
        if !explicit.is_empty() {
            return explicit.to_string();
        }
    }

    let tag = doc.tag(id).unwrap_or_default();
    match tag {
        "a" => {
            if doc.has_attr(id, "href") {
                roles::LINK.to_string()
            } else {
                roles::GENERIC.to_string()
            }
        }
        "button" => roles::BUTTON.to_string(),
        "img" => roles::IMAGE.to_string(),
        "textarea" => roles::TEXTBOX.to_string(),
        "select" => roles::COMBOBOX.to_string(),
        "input" => input_role(
            &doc.attr(id, "type")
                .unwrap_or("text")
                .to_ascii_lowercase(),
        )
        .to_string(),
        _ => {
            if is_content_editable(doc, id) {
                roles::TEXTBOX.to_string()
            } else {
                roles::GENERIC.to_string()
            }
        }
    }
}

fn input_role(input_type: &str) -> &'static str {
    match input_type {
        "button" | "submit" | "reset" | "image" => roles::BUTTON,
        "checkbox" => roles::CHECKBOX,
        "radio" => roles::RADIO,
        "range" => roles::SLIDER,
        "search" => roles::SEARCHBOX,
        "number" => roles::SPINBUTTON,
        _ => roles::TEXTBOX,
    }
}

/// Accessible-name precedence: aria-label, aria-labelledby, then the
/// tag-specific fallbacks, then visible text for interactive elements only.
/// Non-interactive containers return `None`; their text is carried by
/// `StaticText` children instead.
pub fn accessible_name(doc: &Document, id: NodeId, role: &str) -> Option<String> {
    if let Some(label) = doc.attr(id, "aria-label") {
        let label = label.trim();
        if !label.is_empty() {
            return Some(label.to_string());
        }
    }

    if let Some(label) = labelledby_text(doc, id) {
        return Some(label);
    }

    let tag = doc.tag(id).unwrap_or_default();

    if tag == "img" {
        if let Some(alt) = doc.attr(id, "alt") {
            let alt = alt.trim();
            if !alt.is_empty() {
                return Some(alt.to_string());
            }
        }
    }

    if tag == "input" {
        if let Some(placeholder) = doc.attr(id, "placeholder") {
            let placeholder = placeholder.trim();
            if !placeholder.is_empty() {
                return Some(placeholder.to_string());
            }
        }
        let input_type = doc.attr(id, "type").unwrap_or("text").to_ascii_lowercase();
        if input_type == "submit" || input_type == "button" {
            let value = doc.attr(id, "value").map(str::trim).unwrap_or_default();
            return Some(if value.is_empty() {
                "Submit".to_string()
            } else {
                value.to_string()
            });
        }
    }

    if tag == "button" || tag == "a" {
        let text = visible_text(doc, id);
        if !text.is_empty() {
            return Some(text);
        }
        return None;
    }

    if is_interactive_role(role) || is_interactive_tag(tag) {
        let text = visible_text(doc, id);
        if !text.is_empty() {
            return Some(text);
        }
    }

    None
}

/// Concatenated text of the elements referenced by `aria-labelledby`;
/// missing ids are skipped.
pub fn labelledby_text(doc: &Document, id: NodeId) -> Option<String> {
    let refs = doc.attr(id, "aria-labelledby")?;
    let mut parts = Vec::new();
    for target in refs.split_whitespace() {
        if let Some(target_id) = doc.element_by_id(target) {
            let text = visible_text(doc, target_id);
            if !text.is_empty() {
                parts.push(text);
            }
        }
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}
