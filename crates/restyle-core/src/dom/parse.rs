//! HTML parsing via html5ever.
//!
//! html5ever builds an `RcDom`; the tree is then copied into the arena with an
//! explicit work stack so deeply nested input cannot exhaust the call stack.

use super::document::Document;
use super::node::{Attribute, ElementData, NodeData, NodeId};
use html5ever::tendril::TendrilSink;
use html5ever::{LocalName, Namespace, ParseOpts, QualName, parse_document, parse_fragment};
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

impl Document {
    /// Parses a complete HTML document. Parsing never fails; malformed markup is
    /// repaired the way a browser would.
    pub fn parse(html: &str) -> Self {
        let dom = parse_document(RcDom::default(), ParseOpts::default()).one(html);
        let mut doc = Document::new();
        let root = doc.root();
        let top: Vec<Handle> = dom.document.children.borrow().clone();
        for child in top {
            doc.import_rc(root, child);
        }
        doc
    }

    /// Parses markup as the children of a `<body>` element.
    ///
    /// The parsed nodes become direct children of the returned document node.
    pub fn parse_fragment(html: &str) -> Self {
        let context = QualName::new(
            None,
            Namespace::from(HTML_NAMESPACE),
            LocalName::from("body"),
        );
        let dom = parse_fragment(RcDom::default(), ParseOpts::default(), context, Vec::new())
            .one(html);

        let mut doc = Document::new();
        let root = doc.root();
        let top: Vec<Handle> = dom.document.children.borrow().clone();
        for child in top {
            // The fragment parser wraps its output in a synthetic <html> element.
            let is_wrapper = matches!(
                &child.data,
                RcNodeData::Element { name, .. } if &*name.local == "html"
            );
            if is_wrapper {
                let inner: Vec<Handle> = child.children.borrow().clone();
                for node in inner {
                    doc.import_rc(root, node);
                }
            } else {
                doc.import_rc(root, child);
            }
        }
        doc
    }

    fn import_rc(&mut self, parent: NodeId, handle: Handle) {
        let mut stack: Vec<(NodeId, Handle)> = vec![(parent, handle)];
        while let Some((parent, handle)) = stack.pop() {
            let data = match &handle.data {
                RcNodeData::Document => None,
                RcNodeData::Doctype { name, .. } => Some(NodeData::Doctype {
                    name: name.to_string(),
                }),
                RcNodeData::Text { contents } => {
                    Some(NodeData::Text(contents.borrow().to_string()))
                }
                RcNodeData::Comment { contents } => Some(NodeData::Comment(contents.to_string())),
                RcNodeData::Element { name, attrs, .. } => {
                    let mut element = ElementData::new(name.local.to_string());
                    element.attrs = attrs
                        .borrow()
                        .iter()
                        .map(|a| Attribute {
                            name: a.name.local.to_string(),
                            value: a.value.to_string(),
                        })
                        .collect();
                    Some(NodeData::Element(element))
                }
                RcNodeData::ProcessingInstruction { .. } => continue,
            };

            let target = match data {
                Some(data) => {
                    let id = self.create_node(data);
                    self.append_child(parent, id);
                    id
                }
                None => parent,
            };

            let mut children: Vec<Handle> = handle.children.borrow().clone();
            if let RcNodeData::Element {
                template_contents, ..
            } = &handle.data
            {
                if let Some(contents) = template_contents.borrow().as_ref() {
                    children.extend(contents.children.borrow().iter().cloned());
                }
            }
            for child in children.into_iter().rev() {
                stack.push((target, child));
            }
        }
    }
}
