//! HTML serialization for the arena document.

use super::document::Document;
use super::node::{NodeData, NodeId};

/// Elements that never have content or an end tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose text children are emitted verbatim.
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "script", "style", "xmp", "iframe", "noembed", "noframes", "plaintext", "noscript",
];

pub fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

fn escape_text(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
}

fn escape_attr(value: &str, out: &mut String) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
}

enum Step {
    Open(NodeId),
    Close(NodeId),
}

impl Document {
    /// Serializes the node and its subtree.
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.serialize_into(id, true, &mut out);
        out
    }

    /// Serializes only the children of the node.
    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.serialize_into(id, false, &mut out);
        out
    }

    /// Serializes the whole document, doctype included.
    pub fn to_html(&self) -> String {
        self.inner_html(self.root())
    }

    fn serialize_into(&self, id: NodeId, include_self: bool, out: &mut String) {
        let mut stack: Vec<Step> = Vec::new();
        if include_self {
            stack.push(Step::Open(id));
        } else {
            stack.extend(self.children(id).iter().rev().map(|c| Step::Open(*c)));
        }

        while let Some(step) = stack.pop() {
            match step {
                Step::Open(node) => match &self.node(node).data {
                    NodeData::Document => {
                        stack.extend(self.children(node).iter().rev().map(|c| Step::Open(*c)));
                    }
                    NodeData::Doctype { name } => {
                        out.push_str("<!DOCTYPE ");
                        out.push_str(name);
                        out.push('>');
                    }
                    NodeData::Text(text) => {
                        let raw = self
                            .parent(node)
                            .and_then(|p| self.tag_name(p))
                            .is_some_and(|tag| RAW_TEXT_ELEMENTS.contains(&tag));
                        if raw {
                            out.push_str(text);
                        } else {
                            escape_text(text, out);
                        }
                    }
                    NodeData::Comment(text) => {
                        out.push_str("<!--");
                        out.push_str(text);
                        out.push_str("-->");
                    }
                    NodeData::Element(el) => {
                        out.push('<');
                        out.push_str(&el.tag);
                        for attr in &el.attrs {
                            out.push(' ');
                            out.push_str(&attr.name);
                            out.push_str("=\"");
                            escape_attr(&attr.value, out);
                            out.push('"');
                        }
                        out.push('>');
                        if !is_void(&el.tag) {
                            stack.push(Step::Close(node));
                            stack.extend(self.children(node).iter().rev().map(|c| Step::Open(*c)));
                        }
                    }
                },
                Step::Close(node) => {
                    if let Some(tag) = self.tag_name(node) {
                        out.push_str("</");
                        out.push_str(tag);
                        out.push('>');
                    }
                }
            }
        }
    }
}
