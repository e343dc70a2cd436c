// Document model
//
// Arena tree built from the html5ever parse produced by `scraper`. Rules read
// it through selector queries; the remediation engine clones it and mutates
// the clone. Node ids are arena indices assigned in document order at parse
// time and survive `Clone`, so a violation recorded against the original can
// be applied to the working copy.

pub mod location;
pub mod parser;
pub mod selector;
pub mod serializer;

pub use location::Location;
pub use selector::Selector;
pub use serializer::SerializeOptions;

use html5ever::{LocalName, Namespace, QualName};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Index of a node inside a [`Document`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Document,
    Doctype(String),
    Element(ElementData),
    Text(String),
    Comment(String),
}

/// Qualified tag name plus attributes in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementData {
    name: QualName,
    attrs: Vec<(QualName, String)>,
}

fn html_name(local: &str) -> QualName {
    QualName::new(None, Namespace::from(HTML_NAMESPACE), LocalName::from(local.to_ascii_lowercase().as_str()))
}

fn attr_name(local: &str) -> QualName {
    QualName::new(None, Namespace::from(""), LocalName::from(local.to_ascii_lowercase().as_str()))
}

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

impl ElementData {
    pub fn new(name: &str) -> Self {
        Self {
            name: html_name(name),
            attrs: Vec::new(),
        }
    }

    /// Element as produced by the parser, keeping namespaces.
    pub(crate) fn from_parts(name: QualName, attrs: Vec<(QualName, String)>) -> Self {
        Self { name, attrs }
    }

    pub fn name(&self) -> &str {
        &self.name.local
    }

    pub fn qual_name(&self) -> &QualName {
        &self.name
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| (*key.local).eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn attrs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attrs.iter().map(|(k, v)| (&*k.local, v.as_str()))
    }

    pub(crate) fn qualified_attrs(&self) -> impl Iterator<Item = (&QualName, &str)> {
        self.attrs.iter().map(|(k, v)| (k, v.as_str()))
    }

    /// Replaces the value in place when the attribute exists, otherwise appends it.
    pub fn set_attr(&mut self, name: &str, value: &str) {
        match self
            .attrs
            .iter_mut()
            .find(|(key, _)| (*key.local).eq_ignore_ascii_case(name))
        {
            Some((_, existing)) => *existing = value.to_string(),
            None => self.attrs.push((attr_name(name), value.to_string())),
        }
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let position = self
            .attrs
            .iter()
            .position(|(key, _)| (*key.local).eq_ignore_ascii_case(name))?;
        Some(self.attrs.remove(position).1)
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class")
            .unwrap_or_default()
            .split_ascii_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c.eq_ignore_ascii_case(class))
    }
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Parsed markup document.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    page_id: Option<String>,
}

const ROOT: NodeId = NodeId(0);

impl Document {
    pub(crate) fn empty() -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
            }],
            page_id: None,
        }
    }

    /// Attach the identifier of the page this document was loaded from.
    pub fn with_page_id(mut self, page_id: impl Into<String>) -> Self {
        self.page_id = Some(page_id.into());
        self
    }

    pub fn page_id(&self) -> Option<&str> {
        self.page_id.as_deref()
    }

    pub fn root(&self) -> NodeId {
        ROOT
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.nodes.get(id.0).map(|node| &node.kind)
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match self.kind(id) {
            Some(NodeKind::Element(data)) => Some(data),
            _ => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match self.nodes.get_mut(id.0).map(|node| &mut node.kind) {
            Some(NodeKind::Element(data)) => Some(data),
            _ => None,
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(ElementData::name)
    }

    /// True when `id` is an element with one of the given tag names.
    pub fn is_tag(&self, id: NodeId, names: &[&str]) -> bool {
        self.tag(id).is_some_and(|tag| names.contains(&tag))
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|el| el.attr(name))
    }

    /// Attribute value with surrounding whitespace removed; `None` when missing or blank.
    pub fn non_empty_attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attr(id, name)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.attr(id, name).is_some()
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.element(id).is_some_and(|el| el.has_class(class))
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let Some(el) = self.element_mut(id) {
            el.set_attr(name, value);
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Option<String> {
        self.element_mut(id).and_then(|el| el.remove_attr(name))
    }

    /// Change the tag name of an element, keeping attributes and children.
    pub fn rename(&mut self, id: NodeId, name: &str) {
        if let Some(el) = self.element_mut(id) {
            el.name = QualName::new(None, el.name.ns.clone(), LocalName::from(name.to_ascii_lowercase().as_str()));
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|node| node.parent)
    }

    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id).filter(|parent| self.is_element(*parent))
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id.0)
            .map(|node| node.children.as_slice())
            .unwrap_or_default()
    }

    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|child| self.is_element(*child))
            .collect()
    }

    /// Element ancestors, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            document: self,
            next: self.parent_element(id),
        }
    }

    /// Pre-order descendants of `id`, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    /// Every attached element in document order.
    pub fn elements(&self) -> Vec<NodeId> {
        self.descendants(ROOT)
            .into_iter()
            .filter(|id| self.is_element(*id))
            .collect()
    }

    pub fn descendant_elements(&self, id: NodeId) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|child| self.is_element(*child))
            .collect()
    }

    /// Whether the node is still reachable from the document root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == ROOT {
                return true;
            }
            match self.parent(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    pub fn previous_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let siblings = self.children(self.parent(id)?);
        let position = siblings.iter().position(|s| *s == id)?;
        siblings[..position]
            .iter()
            .rev()
            .copied()
            .find(|s| self.is_element(*s))
    }

    pub fn next_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let siblings = self.children(self.parent(id)?);
        let position = siblings.iter().position(|s| *s == id)?;
        siblings[position + 1..]
            .iter()
            .copied()
            .find(|s| self.is_element(*s))
    }

    pub fn first_element_by_tag(&self, name: &str) -> Option<NodeId> {
        self.elements()
            .into_iter()
            .find(|id| self.tag(*id) == Some(name))
    }

    pub fn elements_by_tag(&self, name: &str) -> Vec<NodeId> {
        self.elements()
            .into_iter()
            .filter(|id| self.tag(*id) == Some(name))
            .collect()
    }

    pub fn html_element(&self) -> Option<NodeId> {
        self.element_children(ROOT)
            .into_iter()
            .find(|id| self.tag(*id) == Some("html"))
    }

    pub fn head(&self) -> Option<NodeId> {
        self.first_element_by_tag("head")
    }

    pub fn body(&self) -> Option<NodeId> {
        self.first_element_by_tag("body")
    }

    pub fn element_by_id(&self, value: &str) -> Option<NodeId> {
        self.elements()
            .into_iter()
            .find(|id| self.attr(*id, "id") == Some(value))
    }

    /// Map of `id` attribute values to the first element carrying each.
    /// Rules that resolve many references build this once per pass.
    pub fn id_index(&self) -> HashMap<&str, NodeId> {
        let mut index = HashMap::new();
        for id in self.elements() {
            if let Some(value) = self.attr(id, "id") {
                index.entry(value).or_insert(id);
            }
        }
        index
    }

    /// Whitespace-normalised text of the node and its descendants.
    /// Script and style contents are not text; `<br>` counts as a space.
    pub fn text(&self, id: NodeId) -> String {
        let mut raw = String::new();
        self.collect_text(id, &mut raw);
        normalize_whitespace(&raw)
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match self.kind(id) {
            Some(NodeKind::Text(text)) => out.push_str(text),
            Some(NodeKind::Element(el)) => {
                match el.name() {
                    "script" | "style" | "template" => return,
                    "br" => {
                        out.push(' ');
                        return;
                    }
                    _ => {}
                }
                for child in self.children(id) {
                    self.collect_text(*child, out);
                }
            }
            Some(NodeKind::Document) => {
                for child in self.children(id) {
                    self.collect_text(*child, out);
                }
            }
            _ => {}
        }
    }

    /// Elements whose [`Document::text`] is non-empty, found in one pass.
    pub fn elements_with_text(&self) -> HashSet<NodeId> {
        let mut found = HashSet::new();
        // (node, inside script/style/template)
        let mut stack = vec![(ROOT, false)];
        while let Some((id, skipped)) = stack.pop() {
            match self.kind(id) {
                Some(NodeKind::Text(text)) => {
                    if skipped || text.trim().is_empty() {
                        continue;
                    }
                    let mut current = self.parent_element(id);
                    while let Some(element) = current {
                        if !found.insert(element) {
                            break;
                        }
                        current = self.parent_element(element);
                    }
                }
                _ => {
                    let skip = skipped || self.is_tag(id, &["script", "style", "template"]);
                    stack.extend(self.children(id).iter().map(|child| (*child, skip)));
                }
            }
        }
        found
    }

    /// Text of the direct text-node children only.
    pub fn own_text(&self, id: NodeId) -> String {
        let raw: String = self
            .children(id)
            .iter()
            .filter_map(|child| match self.kind(*child) {
                Some(NodeKind::Text(text)) => Some(text.as_str()),
                _ => None,
            })
            .collect();
        normalize_whitespace(&raw)
    }

    /// Create a detached element. Attach it with [`Document::append_child`]
    /// or [`Document::insert_before`].
    pub fn create_element(&mut self, name: &str, attrs: &[(&str, &str)]) -> NodeId {
        let mut data = ElementData::new(name);
        for (key, value) in attrs {
            data.set_attr(key, value);
        }
        self.push_node(NodeKind::Element(data))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push_node(NodeKind::Text(text.to_string()))
    }

    pub(crate) fn push_node(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if !self.contains(parent) || !self.contains(child) || parent == child {
            return;
        }
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Insert `node` as the previous sibling of `reference`.
    pub fn insert_before(&mut self, reference: NodeId, node: NodeId) {
        if !self.contains(node) || reference == node {
            return;
        }
        let Some(parent) = self.parent(reference) else {
            return;
        };
        self.detach(node);
        let siblings = &mut self.nodes[parent.0].children;
        let position = siblings
            .iter()
            .position(|s| *s == reference)
            .unwrap_or(siblings.len());
        siblings.insert(position, node);
        self.nodes[node.0].parent = Some(parent);
    }

    /// Unlink a node from its parent. The node stays in the arena.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.parent(id) {
            self.nodes[parent.0].children.retain(|c| *c != id);
            self.nodes[id.0].parent = None;
        }
    }
}

pub struct Ancestors<'a> {
    document: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.document.parent_element(current);
        Some(current)
    }
}

pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_assigns_ids_in_document_order() {
        let doc = Document::parse("<html><body><p>a</p><div><span>b</span></div></body></html>");
        let elements = doc.elements();
        let tags: Vec<_> = elements.iter().filter_map(|id| doc.tag(*id)).collect();
        assert_eq!(tags, vec!["html", "head", "body", "p", "div", "span"]);
        assert!(elements.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_text_is_normalised() {
        let doc = Document::parse("<p>  Hello \n <b>big</b><br>world <script>var x;</script></p>");
        let p = doc.first_element_by_tag("p").unwrap();
        assert_eq!(doc.text(p), "Hello big world");
    }

    #[test]
    fn test_clone_preserves_ids() {
        let doc = Document::parse("<img src='a.png'><img src='b.png'>");
        let mut copy = doc.clone();
        let second = doc.elements_by_tag("img")[1];
        copy.set_attr(second, "alt", "B");
        assert_eq!(copy.attr(second, "src"), Some("b.png"));
        assert_eq!(copy.attr(second, "alt"), Some("B"));
        assert_eq!(doc.attr(second, "alt"), None);
    }

    #[test]
    fn test_insert_before_and_detach() {
        let mut doc = Document::parse("<body><input id='q'></body>");
        let input = doc.first_element_by_tag("input").unwrap();
        let label = doc.create_element("label", &[("for", "q")]);
        let text = doc.create_text("Query:");
        doc.append_child(label, text);
        doc.insert_before(input, label);

        let body = doc.body().unwrap();
        assert_eq!(doc.element_children(body), vec![label, input]);
        assert!(doc.is_attached(label));

        doc.detach(label);
        assert!(!doc.is_attached(label));
        assert_eq!(doc.element_children(body), vec![input]);
    }

    #[test]
    fn test_attribute_mutation_keeps_order() {
        let mut doc = Document::parse("<a href='/x' class='btn primary' id='go'>Go</a>");
        let a = doc.first_element_by_tag("a").unwrap();
        doc.set_attr(a, "class", "btn");
        doc.set_attr(a, "title", "Go home");
        let names: Vec<_> = doc.element(a).unwrap().attrs().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["href", "class", "id", "title"]);
        assert!(doc.has_class(a, "BTN"));
        assert_eq!(doc.remove_attr(a, "id").as_deref(), Some("go"));
    }

    #[test]
    fn test_id_index_and_text_bearing_elements() {
        let doc = Document::parse(
            "<div id='a'><div><p id='b'>Hi</p></div><div><script>x()</script></div></div><p id='a'>dup</p>",
        );
        let index = doc.id_index();
        let first = doc.first_element_by_tag("div").unwrap();
        assert_eq!(index.get("a"), Some(&first));
        assert!(index.contains_key("b"));

        let with_text = doc.elements_with_text();
        let divs = doc.elements_by_tag("div");
        assert!(with_text.contains(&divs[0]));
        assert!(with_text.contains(&divs[1]));
        assert!(!with_text.contains(&divs[2]));
        assert!(!with_text.contains(&doc.first_element_by_tag("script").unwrap()));
        assert!(with_text.contains(&doc.body().unwrap()));
    }

    #[test]
    fn test_rename_and_siblings() {
        let mut doc = Document::parse("<h1>A</h1><h3>B</h3><p>C</p>");
        let h3 = doc.first_element_by_tag("h3").unwrap();
        doc.rename(h3, "h2");
        assert_eq!(doc.tag(h3), Some("h2"));
        let h1 = doc.previous_element_sibling(h3).unwrap();
        assert_eq!(doc.tag(h1), Some("h1"));
        assert_eq!(doc.tag(doc.next_element_sibling(h3).unwrap()), Some("p"));
    }
}
