//! Document-shaped host over parsed HTML.
//!
//! The collector does not walk scraper's tree directly: parsing builds a
//! mutable node arena so that stable ids can be written back onto elements
//! and survive across collection passes, the way they would on a live DOM.
//! Computed styles are derived from inline `style` attributes, with
//! `visibility` and `cursor` resolving through ancestor inheritance.

use scraper::{ElementRef, Html, Node as HtmlNode, Selector};
use thiserror::Error;
use url::Url;

/// Handle to one node in a [`Document`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// Access to a cross-origin frame's content was denied.
#[derive(Debug, Clone, Error)]
#[error("cross-origin frame access denied")]
pub struct CrossOriginFrame;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Visible,
    Hidden,
    Collapse,
}

/// Resolved style for one element. `display` and `opacity` come from the
/// element's own declarations; `visibility` and `cursor` from the nearest
/// explicit declaration on the element or an ancestor.
#[derive(Debug, Clone, Default)]
pub struct ComputedStyle {
    pub display: Option<String>,
    pub visibility: Visibility,
    pub cursor: Option<String>,
    pub opacity: Option<f32>,
}

impl ComputedStyle {
    pub fn is_display_none(&self) -> bool {
        self.display.as_deref() == Some("none")
    }

    pub fn is_visibility_hidden(&self) -> bool {
        matches!(self.visibility, Visibility::Hidden | Visibility::Collapse)
    }

    pub fn is_pointer_cursor(&self) -> bool {
        self.cursor.as_deref() == Some("pointer")
    }

    pub fn is_transparent(&self) -> bool {
        self.opacity == Some(0.0)
    }
}

#[derive(Debug, Clone)]
enum Frame {
    SameOrigin(Box<Document>),
    CrossOrigin,
}

#[derive(Debug, Clone)]
struct ElementData {
    tag: String,
    attrs: Vec<(String, String)>,
    frame: Option<Frame>,
}

#[derive(Debug, Clone)]
enum NodeData {
    Element(ElementData),
    Text(String),
}

#[derive(Debug, Clone)]
struct HostNode {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: NodeData,
}

/// A parsed document. Comments are dropped; whitespace-only text nodes are
/// kept so `childNodes` indices match the parsed DOM.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<HostNode>,
    root: NodeId,
    body: Option<NodeId>,
    title: String,
    url: String,
    active: Option<NodeId>,
}

impl Document {
    pub fn parse(html: &str, url: &str) -> Self {
        let parsed = Html::parse_document(html);
        let title = extract_title(&parsed);
        let mut doc = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            body: None,
            title,
            url: url.to_string(),
            active: None,
        };
        let root = doc.build_element(parsed.root_element(), None, url);
        doc.root = root;
        doc.body = doc.find_descendant_tag(root, "body");
        doc.active = doc
            .elements()
            .into_iter()
            .find(|&id| doc.has_attr(id, "autofocus"));
        doc
    }

    fn build_element(&mut self, element: ElementRef, parent: Option<NodeId>, url: &str) -> NodeId {
        let el = element.value();
        let tag = el.name().to_ascii_lowercase();
        let attrs: Vec<(String, String)> = el
            .attrs()
            .map(|(k, v)| (k.to_ascii_lowercase(), v.to_string()))
            .collect();
        let frame = if tag == "iframe" {
            frame_content(&attrs, url)
        } else {
            None
        };

        let id = self.push(HostNode {
            parent,
            children: Vec::new(),
            data: NodeData::Element(ElementData { tag, attrs, frame }),
        });

        for child in element.children() {
            if let Some(child_element) = ElementRef::wrap(child) {
                let child_id = self.build_element(child_element, Some(id), url);
                self.nodes[id.0].children.push(child_id);
            } else if let HtmlNode::Text(text) = child.value() {
                let child_id = self.push(HostNode {
                    parent: Some(id),
                    children: Vec::new(),
                    data: NodeData::Text(text.text.to_string()),
                });
                self.nodes[id.0].children.push(child_id);
            }
        }

        id
    }

    fn push(&mut self, node: HostNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    pub fn document_element(&self) -> NodeId {
        self.root
    }

    pub fn body(&self) -> Option<NodeId> {
        self.body
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.0].data, NodeData::Element(_))
    }

    fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.nodes[id.0].data {
            NodeData::Element(el) => Some(el),
            NodeData::Text(_) => None,
        }
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|el| el.tag.as_str())
    }

    /// Text-node content; `None` for elements.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].data {
            NodeData::Text(text) => Some(text),
            NodeData::Element(_) => None,
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        let el = self.element(id)?;
        el.attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.attr(id, name).is_some()
    }

    /// Write-or-replace an attribute on an element. No-op for text nodes.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        if let NodeData::Element(el) = &mut self.nodes[id.0].data {
            if let Some(entry) = el.attrs.iter_mut().find(|(k, _)| *k == name) {
                entry.1 = value.to_string();
            } else {
                el.attrs.push((name, value.to_string()));
            }
        }
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// All elements of this document (not frame content), in document order.
    pub fn elements(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_elements(self.root, &mut out);
        out
    }

    fn collect_elements(&self, id: NodeId, out: &mut Vec<NodeId>) {
        if self.is_element(id) {
            out.push(id);
        }
        for &child in &self.nodes[id.0].children {
            self.collect_elements(child, out);
        }
    }

    /// `getElementById` over the HTML `id` attribute.
    pub fn element_by_id(&self, html_id: &str) -> Option<NodeId> {
        self.elements()
            .into_iter()
            .find(|&id| self.attr(id, "id") == Some(html_id))
    }

    fn find_descendant_tag(&self, from: NodeId, tag: &str) -> Option<NodeId> {
        if self.tag(from) == Some(tag) {
            return Some(from);
        }
        for &child in &self.nodes[from.0].children {
            if let Some(found) = self.find_descendant_tag(child, tag) {
                return Some(found);
            }
        }
        None
    }

    pub fn active_element(&self) -> Option<NodeId> {
        self.active
    }

    pub fn focus(&mut self, id: NodeId) {
        if self.is_element(id) {
            self.active = Some(id);
        }
    }

    pub fn blur(&mut self) {
        self.active = None;
    }

    /// `None` for text nodes; callers treat that as "not hidden".
    pub fn computed_style(&self, id: NodeId) -> Option<ComputedStyle> {
        self.element(id)?;
        let visibility = match self.inherited_style_value(id, "visibility").as_deref() {
            Some("hidden") => Visibility::Hidden,
            Some("collapse") => Visibility::Collapse,
            _ => Visibility::Visible,
        };
        Some(ComputedStyle {
            display: self.own_style_value(id, "display"),
            visibility,
            cursor: self.inherited_style_value(id, "cursor"),
            opacity: self
                .own_style_value(id, "opacity")
                .and_then(|v| v.parse::<f32>().ok()),
        })
    }

    fn own_style_value(&self, id: NodeId, property: &str) -> Option<String> {
        inline_style_property(self.attr(id, "style")?, property)
    }

    /// Nearest explicit declaration on self or an ancestor; `inherit` keeps
    /// walking up.
    fn inherited_style_value(&self, id: NodeId, property: &str) -> Option<String> {
        let mut current = Some(id);
        while let Some(node) = current {
            if let Some(value) = self.own_style_value(node, property) {
                if value != "inherit" {
                    return Some(value);
                }
            }
            current = self.parent(node);
        }
        None
    }

    /// Content of an `<iframe>`: `Ok(Some)` for an attached same-origin
    /// sub-document, `Ok(None)` when there is nothing to traverse, and
    /// `Err(CrossOriginFrame)` when the frame is cross-origin.
    pub fn content_document(&self, id: NodeId) -> Result<Option<&Document>, CrossOriginFrame> {
        match self.element(id).and_then(|el| el.frame.as_ref()) {
            Some(Frame::SameOrigin(doc)) => Ok(Some(doc)),
            Some(Frame::CrossOrigin) => Err(CrossOriginFrame),
            None => Ok(None),
        }
    }

    pub fn content_document_mut(
        &mut self,
        id: NodeId,
    ) -> Result<Option<&mut Document>, CrossOriginFrame> {
        match &mut self.nodes[id.0].data {
            NodeData::Element(el) => match el.frame.as_mut() {
                Some(Frame::SameOrigin(doc)) => Ok(Some(doc)),
                Some(Frame::CrossOrigin) => Err(CrossOriginFrame),
                None => Ok(None),
            },
            NodeData::Text(_) => Ok(None),
        }
    }
}

fn frame_content(attrs: &[(String, String)], base_url: &str) -> Option<Frame> {
    let attr = |name: &str| {
        attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    };
    if let Some(srcdoc) = attr("srcdoc") {
        return Some(Frame::SameOrigin(Box::new(Document::parse(
            srcdoc, base_url,
        ))));
    }
    if let Some(src) = attr("src") {
        if is_cross_origin(base_url, src) {
            return Some(Frame::CrossOrigin);
        }
    }
    None
}

fn is_cross_origin(base_url: &str, src: &str) -> bool {
    let Ok(base) = Url::parse(base_url) else {
        return false;
    };
    let Ok(target) = base.join(src) else {
        return false;
    };
    target.origin() != base.origin()
}

fn inline_style_property(style: &str, property: &str) -> Option<String> {
    for declaration in style.split(';') {
        if let Some((prop, value)) = declaration.split_once(':') {
            if prop.trim().eq_ignore_ascii_case(property) {
                return Some(value.trim().to_ascii_lowercase());
            }
        }
    }
    None
}

fn extract_title(document: &Html) -> String {
    let selector = Selector::parse("title").expect("valid selector");
    document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>())
        .unwrap_or_default()
        .trim()
        .to_string()
}
