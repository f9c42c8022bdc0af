/*!
 * Host-independent document model.
 *
 * An arena of element, text and comment nodes addressed by [`NodeId`]. It is
 * the surface the content-script logic works against: attribute and class
 * manipulation, live form values, tree walks and an opt-in mutation record
 * queue standing in for a browser mutation observer.
 *
 * - `html`: HTML import (html5ever) and serialization
 */

pub mod html;

use html5ever::{LocalName, QualName, namespace_url, ns};

pub use self::html::{SerializableNode, node_to_html, parse_html, read_html, to_html};

/// Handle to a node inside a [`Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Element payload
#[derive(Debug, Clone, PartialEq)]
pub struct ElementData {
    /// Namespaced name as the parser produced it (`linearGradient` keeps its case)
    pub name: QualName,
    /// Attributes in document order
    pub attrs: Vec<(QualName, String)>,
    /// Live form value once it diverged from markup
    value: Option<String>,
    /// Inert fragment holding a `<template>`'s content
    template_contents: Option<NodeId>,
}

/// Node payload
#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    Document,
    /// Detached container for template content
    Fragment,
    Doctype { name: String },
    Element(ElementData),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: NodeData,
}

/// A recorded change, delivered to observers in the order it happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    /// `child` was inserted under `parent`
    ChildAdded { parent: NodeId, child: NodeId },
    /// The text of `node` changed
    CharacterData { node: NodeId },
}

/// Arena-backed document tree
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    recording: bool,
    mutations: Vec<Mutation>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document containing only the root node
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                data: NodeData::Document,
            }],
            recording: false,
            mutations: Vec::new(),
        }
    }

    /// Create a document with an empty `html`/`head`/`body` skeleton
    pub fn blank() -> Self {
        let mut doc = Self::new();
        let html = doc.create_element("html");
        let head = doc.create_element("head");
        let body = doc.create_element("body");
        let root = doc.root();
        doc.append_child(root, html);
        doc.append_child(html, head);
        doc.append_child(html, body);
        doc
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    // ----- creation -------------------------------------------------------

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            data,
        });
        id
    }

    /// Create a detached HTML element
    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.create_qualified_element(QualName::new(None, ns!(html), LocalName::from(name)))
    }

    /// Create a detached element in any namespace. Template elements get an
    /// empty content fragment.
    pub fn create_qualified_element(&mut self, name: QualName) -> NodeId {
        let is_template = name.ns == ns!(html) && &*name.local == "template";
        let id = self.push(NodeData::Element(ElementData {
            name,
            attrs: Vec::new(),
            value: None,
            template_contents: None,
        }));
        if is_template {
            let fragment = self.push(NodeData::Fragment);
            if let Some(element) = self.element_mut(id) {
                element.template_contents = Some(fragment);
            }
        }
        id
    }

    /// Create a detached element with attributes
    pub fn create_element_with_attrs(&mut self, name: &str, attrs: &[(&str, &str)]) -> NodeId {
        let id = self.create_element(name);
        for (attr, value) in attrs {
            self.set_attr(id, attr, value);
        }
        id
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Text(text.to_string()))
    }

    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Comment(text.to_string()))
    }

    pub fn create_doctype(&mut self, name: &str) -> NodeId {
        self.push(NodeData::Doctype { name: name.to_string() })
    }

    // ----- tree structure -------------------------------------------------

    /// Append `child` as the last child of `parent`, detaching it first
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
        self.record_insert(parent, child);
    }

    /// Insert `child` right after `reference`. Returns false if `reference`
    /// has no parent.
    pub fn insert_after(&mut self, reference: NodeId, child: NodeId) -> bool {
        let Some(parent) = self.parent(reference) else {
            return false;
        };
        self.detach(child);
        let position = self.nodes[parent.0]
            .children
            .iter()
            .position(|id| *id == reference)
            .map_or(self.nodes[parent.0].children.len(), |index| index + 1);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.insert(position, child);
        self.record_insert(parent, child);
        true
    }

    /// Remove `node` from its parent. The node and its subtree stay valid
    /// but are no longer connected.
    pub fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node.0].parent.take() {
            self.nodes[parent.0].children.retain(|id| *id != node);
        }
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].children
    }

    pub fn element_children(&self, node: NodeId) -> Vec<NodeId> {
        self.children(node)
            .iter()
            .copied()
            .filter(|id| self.is_element(*id))
            .collect()
    }

    pub fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.parent(node)?;
        let siblings = self.children(parent);
        let index = siblings.iter().position(|id| *id == node)?;
        siblings.get(index + 1).copied()
    }

    pub fn next_element_sibling(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.parent(node)?;
        let siblings = self.children(parent);
        let index = siblings.iter().position(|id| *id == node)?;
        siblings[index + 1..]
            .iter()
            .copied()
            .find(|id| self.is_element(*id))
    }

    /// Ancestors of `node`, nearest first, excluding `node` itself
    pub fn ancestors(&self, node: NodeId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            next: self.parent(node),
        }
    }

    /// Nodes below `node` in document order, excluding `node` itself
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack: Vec<NodeId> = self.children(node).iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            result.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        result
    }

    /// Nearest element, starting at `node` itself, matching `predicate`
    pub fn closest(&self, node: NodeId, predicate: impl Fn(&Document, NodeId) -> bool) -> Option<NodeId> {
        std::iter::once(node)
            .chain(self.ancestors(node))
            .find(|id| self.is_element(*id) && predicate(self, *id))
    }

    /// Whether `node` is reachable from the document root
    pub fn is_connected(&self, node: NodeId) -> bool {
        node == self.root() || self.ancestors(node).any(|id| id == self.root())
    }

    /// Connected elements matching `predicate`, in document order
    pub fn find_elements(&self, predicate: impl Fn(&Document, NodeId) -> bool) -> Vec<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .filter(|id| self.is_element(*id) && predicate(self, *id))
            .collect()
    }

    pub fn get_element_by_id(&self, element_id: &str) -> Option<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .find(|id| self.attr(*id, "id") == Some(element_id))
    }

    /// The `html` element
    pub fn document_element(&self) -> Option<NodeId> {
        self.children(self.root())
            .iter()
            .copied()
            .find(|id| self.is_element(*id))
    }

    pub fn head(&self) -> Option<NodeId> {
        self.document_child("head")
    }

    pub fn body(&self) -> Option<NodeId> {
        self.document_child("body")
    }

    fn document_child(&self, name: &str) -> Option<NodeId> {
        let html = self.document_element()?;
        self.children(html)
            .iter()
            .copied()
            .find(|id| self.tag_name(*id) == Some(name))
    }

    /// The `head` element, created under `html` if the document lacks one
    pub fn ensure_head(&mut self) -> NodeId {
        if let Some(head) = self.head() {
            return head;
        }
        let html = match self.document_element() {
            Some(html) => html,
            None => {
                let html = self.create_element("html");
                let root = self.root();
                self.append_child(root, html);
                html
            }
        };
        let head = self.create_element("head");
        self.nodes[head.0].parent = Some(html);
        self.nodes[html.0].children.insert(0, head);
        head
    }

    // ----- node data ------------------------------------------------------

    pub fn data(&self, node: NodeId) -> &NodeData {
        &self.nodes[node.0].data
    }

    pub fn element(&self, node: NodeId) -> Option<&ElementData> {
        match &self.nodes[node.0].data {
            NodeData::Element(element) => Some(element),
            _ => None,
        }
    }

    fn element_mut(&mut self, node: NodeId) -> Option<&mut ElementData> {
        match &mut self.nodes[node.0].data {
            NodeData::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn is_element(&self, node: NodeId) -> bool {
        matches!(self.nodes[node.0].data, NodeData::Element(_))
    }

    pub fn is_text(&self, node: NodeId) -> bool {
        matches!(self.nodes[node.0].data, NodeData::Text(_))
    }

    /// Local name of an element
    pub fn tag_name(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(|element| &*element.name.local)
    }

    /// Content fragment of a `<template>`. It is never connected, so page
    /// walks do not see it.
    pub fn template_contents(&self, node: NodeId) -> Option<NodeId> {
        self.element(node)?.template_contents
    }

    pub fn text(&self, node: NodeId) -> Option<&str> {
        match &self.nodes[node.0].data {
            NodeData::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    /// Replace the content of a text node
    pub fn set_text(&mut self, node: NodeId, text: &str) {
        if let NodeData::Text(current) = &mut self.nodes[node.0].data {
            current.clear();
            current.push_str(text);
            if self.recording && self.is_connected(node) {
                self.mutations.push(Mutation::CharacterData { node });
            }
        }
    }

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self, node: NodeId) -> String {
        if let Some(text) = self.text(node) {
            return text.to_string();
        }
        self.descendants(node)
            .into_iter()
            .filter_map(|id| self.text(id))
            .collect()
    }

    /// Replace all children of `node` with a single text node. A lone text
    /// child is updated in place instead of being replaced.
    pub fn set_text_content(&mut self, node: NodeId, text: &str) {
        if let [only] = self.children(node) {
            let only = *only;
            if self.is_text(only) {
                self.set_text(only, text);
                return;
            }
        }
        let children: Vec<NodeId> = self.children(node).to_vec();
        for child in children {
            self.detach(child);
        }
        let text_node = self.create_text(text);
        self.append_child(node, text_node);
    }

    // ----- attributes -----------------------------------------------------

    /// Value of a namespace-less attribute
    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        self.element(node)?
            .attrs
            .iter()
            .find(|(attr, _)| is_plain_attr(attr, name))
            .map(|(_, value)| value.as_str())
    }

    pub fn has_attr(&self, node: NodeId, name: &str) -> bool {
        self.attr(node, name).is_some()
    }

    pub fn set_attr(&mut self, node: NodeId, name: &str, value: &str) {
        let Some(element) = self.element_mut(node) else {
            return;
        };
        match element.attrs.iter_mut().find(|(attr, _)| is_plain_attr(attr, name)) {
            Some((_, current)) => {
                current.clear();
                current.push_str(value);
            }
            None => element
                .attrs
                .push((QualName::new(None, ns!(), LocalName::from(name)), value.to_string())),
        }
    }

    pub fn remove_attr(&mut self, node: NodeId, name: &str) -> bool {
        let Some(element) = self.element_mut(node) else {
            return false;
        };
        let before = element.attrs.len();
        element.attrs.retain(|(attr, _)| !is_plain_attr(attr, name));
        element.attrs.len() != before
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.attr(node, "class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }

    pub fn add_class(&mut self, node: NodeId, class: &str) {
        if self.has_class(node, class) || !self.is_element(node) {
            return;
        }
        let classes = match self.attr(node, "class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {}", existing.trim(), class),
            _ => class.to_string(),
        };
        self.set_attr(node, "class", &classes);
    }

    pub fn remove_class(&mut self, node: NodeId, class: &str) {
        let Some(existing) = self.attr(node, "class") else {
            return;
        };
        let remaining = existing
            .split_whitespace()
            .filter(|c| *c != class)
            .collect::<Vec<_>>()
            .join(" ");
        if remaining.is_empty() {
            self.remove_attr(node, "class");
        } else {
            self.set_attr(node, "class", &remaining);
        }
    }

    // ----- form values ----------------------------------------------------

    /// Current value of a form control. Inputs fall back to their `value`
    /// attribute, textareas to their text content.
    pub fn value(&self, node: NodeId) -> String {
        let Some(element) = self.element(node) else {
            return String::new();
        };
        if let Some(value) = &element.value {
            return value.clone();
        }
        match &*element.name.local {
            "textarea" => self.text_content(node),
            _ => self.attr(node, "value").unwrap_or_default().to_string(),
        }
    }

    /// Set the live value of a form control (does not touch markup)
    pub fn set_value(&mut self, node: NodeId, value: &str) {
        if let Some(element) = self.element_mut(node) {
            element.value = Some(value.to_string());
        }
    }

    // ----- mutation records -----------------------------------------------

    /// Start queueing [`Mutation`] records for connected nodes
    pub fn start_recording(&mut self) {
        self.recording = true;
    }

    pub fn stop_recording(&mut self) {
        self.recording = false;
        self.mutations.clear();
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Drain queued records in the order they happened
    pub fn take_mutations(&mut self) -> Vec<Mutation> {
        std::mem::take(&mut self.mutations)
    }

    fn record_insert(&mut self, parent: NodeId, child: NodeId) {
        if self.recording && self.is_connected(parent) {
            self.mutations.push(Mutation::ChildAdded { parent, child });
        }
    }
}

fn is_plain_attr(attr: &QualName, name: &str) -> bool {
    attr.ns == ns!() && &*attr.local == name
}

/// Iterator over the ancestors of a node
pub struct Ancestors<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.doc.parent(current);
        Some(current)
    }
}
