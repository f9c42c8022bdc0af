/*!
 * HTML import and serialization for the document model.
 *
 * Parsing goes through html5ever into an `RcDom`, which is then copied into
 * the arena [`Document`]. Serialization hands the arena to html5ever's
 * serializer through [`SerializableNode`].
 */

use std::io::{self, Read};

use html5ever::serialize::{Serialize, SerializeOpts, Serializer, TraversalScope, serialize};
use html5ever::tendril::TendrilSink;
use html5ever::{QualName, parse_document};
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};

use crate::errors::DomError;

use super::{Document, NodeData, NodeId};

/// Parse an HTML string into a document
pub fn parse_html(html: &str) -> Document {
    let dom = parse_document(RcDom::default(), Default::default()).one(html);
    from_rcdom(&dom)
}

/// Parse UTF-8 HTML from a reader
pub fn read_html<R: Read>(reader: &mut R) -> Result<Document, DomError> {
    let dom = parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(reader)?;
    Ok(from_rcdom(&dom))
}

fn from_rcdom(dom: &RcDom) -> Document {
    let mut doc = Document::new();
    let root = doc.root();

    let mut stack: Vec<(Handle, NodeId)> = dom
        .document
        .children
        .borrow()
        .iter()
        .rev()
        .map(|child| (child.clone(), root))
        .collect();

    while let Some((handle, parent)) = stack.pop() {
        let id = match &handle.data {
            RcNodeData::Document | RcNodeData::ProcessingInstruction { .. } => continue,
            RcNodeData::Doctype { name, .. } => doc.create_doctype(name),
            RcNodeData::Text { contents } => doc.create_text(&contents.borrow()),
            RcNodeData::Comment { contents } => doc.create_comment(contents),
            RcNodeData::Element {
                name,
                attrs,
                template_contents,
                ..
            } => {
                let id = doc.create_qualified_element(name.clone());
                if let Some(element) = doc.element_mut(id) {
                    element.attrs = attrs
                        .borrow()
                        .iter()
                        .map(|attr| (attr.name.clone(), attr.value.to_string()))
                        .collect();
                }
                if let (Some(contents), Some(fragment)) =
                    (template_contents.borrow().as_ref(), doc.template_contents(id))
                {
                    for child in contents.children.borrow().iter().rev() {
                        stack.push((child.clone(), fragment));
                    }
                }
                id
            }
        };

        doc.append_child(parent, id);
        for child in handle.children.borrow().iter().rev() {
            stack.push((child.clone(), id));
        }
    }

    doc
}

/// Serialize the whole document to HTML
pub fn to_html(doc: &Document) -> Result<String, DomError> {
    write_html(SerializableNode::new(doc, doc.root()), TraversalScope::ChildrenOnly(None))
}

/// Serialize a single node and its subtree
pub fn node_to_html(doc: &Document, node: NodeId) -> Result<String, DomError> {
    write_html(SerializableNode::new(doc, node), TraversalScope::IncludeNode)
}

fn write_html(node: SerializableNode<'_>, traversal_scope: TraversalScope) -> Result<String, DomError> {
    let mut buf: Vec<u8> = Vec::new();
    let opts = SerializeOpts {
        traversal_scope,
        ..SerializeOpts::default()
    };
    serialize(&mut buf, &node, opts).map_err(DomError::Write)?;
    Ok(String::from_utf8(buf)?)
}

/// A subtree of a [`Document`] in the shape html5ever serializes
#[derive(Debug, Clone, Copy)]
pub struct SerializableNode<'a> {
    doc: &'a Document,
    node: NodeId,
}

impl<'a> SerializableNode<'a> {
    pub fn new(doc: &'a Document, node: NodeId) -> Self {
        Self { doc, node }
    }

    /// Children as written out: a template's are those of its fragment
    fn content_of(&self, node: NodeId) -> &'a [NodeId] {
        match self.doc.template_contents(node) {
            Some(fragment) => self.doc.children(fragment),
            None => self.doc.children(node),
        }
    }
}

enum SerializeOp {
    Open(NodeId),
    Close(QualName),
}

impl Serialize for SerializableNode<'_> {
    fn serialize<S>(&self, serializer: &mut S, traversal_scope: TraversalScope) -> io::Result<()>
    where
        S: Serializer,
    {
        let mut ops: Vec<SerializeOp> = match traversal_scope {
            TraversalScope::IncludeNode => vec![SerializeOp::Open(self.node)],
            TraversalScope::ChildrenOnly(_) => self
                .content_of(self.node)
                .iter()
                .rev()
                .map(|child| SerializeOp::Open(*child))
                .collect(),
        };

        while let Some(op) = ops.pop() {
            match op {
                SerializeOp::Open(node) => match self.doc.data(node) {
                    NodeData::Document | NodeData::Fragment => {
                        ops.extend(self.doc.children(node).iter().rev().map(|child| SerializeOp::Open(*child)));
                    }
                    NodeData::Doctype { name } => serializer.write_doctype(name)?,
                    NodeData::Text(text) => serializer.write_text(text)?,
                    NodeData::Comment(text) => serializer.write_comment(text)?,
                    NodeData::Element(element) => {
                        serializer.start_elem(
                            element.name.clone(),
                            element.attrs.iter().map(|(name, value)| (name, value.as_str())),
                        )?;
                        ops.push(SerializeOp::Close(element.name.clone()));
                        ops.extend(
                            self.content_of(node)
                                .iter()
                                .rev()
                                .map(|child| SerializeOp::Open(*child)),
                        );
                    }
                },
                SerializeOp::Close(name) => serializer.end_elem(name)?,
            }
        }
        Ok(())
    }
}
