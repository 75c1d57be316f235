//! Which nodes an operator may target.

use crate::dom::{Document, NodeId};
use crate::error::{RestyleError, Result};

/// Document structural roots.
const STRUCTURAL_TAGS: &[&str] = &["html", "head", "body"];

/// Script, style, metadata and embedding elements, including their contents.
const FORBIDDEN_TAGS: &[&str] = &[
    "script", "style", "link", "meta", "base", "title", "noscript", "template", "iframe",
    "frame", "frameset", "object", "embed", "applet",
];

/// Checks the safety predicate for `id`.
///
/// # Errors
///
/// Returns `RestyleError::UnsafeTarget` when the node is a structural root, a
/// script/style/embedding element or inside one, part of the engine's control
/// surface, or not a rendered element of the body.
pub fn check_target(doc: &Document, id: NodeId) -> Result<()> {
    if !doc.contains(id) {
        return Err(RestyleError::unsafe_target("node does not belong to this document"));
    }
    let Some(tag) = doc.tag_name(id) else {
        return Err(RestyleError::unsafe_target("not an element"));
    };
    if STRUCTURAL_TAGS.contains(&tag) {
        return Err(RestyleError::unsafe_target(format!(
            "<{}> is a structural root",
            tag
        )));
    }
    if doc.in_control_surface(id) {
        return Err(RestyleError::unsafe_target("element belongs to the control surface"));
    }
    let forbidden = std::iter::once(id)
        .chain(doc.ancestors(id))
        .find_map(|n| doc.tag_name(n).filter(|t| FORBIDDEN_TAGS.contains(t)));
    if let Some(forbidden) = forbidden {
        return Err(RestyleError::unsafe_target(format!(
            "<{}> content cannot be edited",
            forbidden
        )));
    }
    let in_body = doc
        .body()
        .is_some_and(|body| doc.ancestors(id).any(|a| a == body));
    if !in_body {
        return Err(RestyleError::unsafe_target("element is not part of the page body"));
    }
    Ok(())
}

pub fn is_safe_target(doc: &Document, id: NodeId) -> bool {
    check_target(doc, id).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find(doc: &Document, tag: &str) -> NodeId {
        doc.descendant_elements(doc.root())
            .into_iter()
            .find(|n| doc.tag_name(*n) == Some(tag))
            .unwrap()
    }

    #[test]
    fn test_safety_predicate() {
        let doc = Document::parse(
            r#"<html><head><title>t</title></head><body>
<main><p>ok</p><iframe src="x"></iframe><object><span>inner</span></object></main>
<script>var a;</script>
<div data-restyle-ui="root"><button>x</button></div>
</body></html>"#,
        );
        assert!(is_safe_target(&doc, find(&doc, "p")));
        assert!(is_safe_target(&doc, find(&doc, "main")));

        for tag in ["html", "head", "body", "title", "script", "iframe", "span", "button"] {
            let err = check_target(&doc, find(&doc, tag)).unwrap_err();
            assert!(matches!(err, RestyleError::UnsafeTarget { .. }), "{}", tag);
        }
    }

    #[test]
    fn test_detached_and_text_nodes_are_unsafe() {
        let mut doc = Document::parse("<html><body><p>x</p></body></html>");
        let p = find(&doc, "p");
        let text = doc.children(p)[0];
        assert!(!is_safe_target(&doc, text));
        doc.detach(p);
        assert!(!is_safe_target(&doc, p));
    }
}
