//! Address generation and resolution.
//!
//! An address is a selector that resolves to exactly one element at the time
//! it is generated. Elements with an `id` that is unique in the document get
//! `#id`. Everything else gets a path of per-level compounds from the body's
//! child down to the node, joined with child combinators; a level carries
//! `:nth-of-type(k)` when another sibling matches the same compound.

use crate::dom::{Document, NodeId, SelectorList, escape_ident};
use crate::error::{RestyleError, Result};

/// Generates the address of `id`.
///
/// # Errors
///
/// Returns `RestyleError::AddressResolution` when no candidate resolves back
/// to `id` alone (for example a node outside the body).
pub fn generate_address(doc: &Document, id: NodeId) -> Result<String> {
    if let Some(element_id) = doc.element(id).and_then(|el| el.id()) {
        let candidate = format!("#{}", escape_ident(element_id));
        if resolves_to(doc, &candidate, id) {
            return Ok(candidate);
        }
        tracing::debug!(
            "[Address] id '{}' is not unique, falling back to a path",
            element_id
        );
    }

    let body = doc.body();
    let mut levels = Vec::new();
    let mut current = Some(id);
    while let Some(node) = current {
        if Some(node) == body || !doc.node(node).is_element() {
            break;
        }
        levels.push(level_selector(doc, node));
        current = doc.parent(node);
    }
    levels.reverse();
    let path = levels.join(" > ");

    if resolves_to(doc, &path, id) {
        return Ok(path);
    }
    let anchored = format!("body > {}", path);
    if resolves_to(doc, &anchored, id) {
        return Ok(anchored);
    }
    Err(RestyleError::AddressResolution {
        matches: count_matches(doc, &anchored).unwrap_or(0),
        address: anchored,
    })
}

/// Resolves `address` to the single element it names.
///
/// # Errors
///
/// Returns `RestyleError::AddressResolution` when the address is malformed or
/// matches zero or several elements.
pub fn resolve_address(doc: &Document, address: &str) -> Result<NodeId> {
    let matches = query(doc, address)?;
    match matches.as_slice() {
        [single] => Ok(*single),
        _ => Err(RestyleError::AddressResolution {
            address: address.to_string(),
            matches: matches.len(),
        }),
    }
}

/// Number of elements `address` currently matches.
pub fn count_matches(doc: &Document, address: &str) -> Result<usize> {
    Ok(query(doc, address)?.len())
}

fn query(doc: &Document, address: &str) -> Result<Vec<NodeId>> {
    let selector = SelectorList::parse(address).map_err(|e| {
        tracing::debug!("[Address] {}", e);
        RestyleError::AddressResolution {
            address: address.to_string(),
            matches: 0,
        }
    })?;
    Ok(doc.query_selector_all(doc.root(), &selector))
}

fn resolves_to(doc: &Document, address: &str, id: NodeId) -> bool {
    matches!(resolve_address(doc, address), Ok(found) if found == id)
}

/// `tag[.class...][:nth-of-type(k)]` for one level of the path.
fn level_selector(doc: &Document, id: NodeId) -> String {
    let Some(el) = doc.element(id) else {
        return String::new();
    };
    let mut compound = escape_ident(&el.tag);
    for class in el.classes() {
        compound.push('.');
        compound.push_str(&escape_ident(class));
    }

    let Some(parent) = doc.parent(id) else {
        return compound;
    };
    let Ok(selector) = SelectorList::parse(&compound) else {
        return compound;
    };
    let siblings: Vec<NodeId> = doc
        .element_children(parent)
        .filter(|s| !doc.in_control_surface(*s))
        .collect();
    let colliding = siblings
        .iter()
        .filter(|s| selector.matches(doc, **s))
        .count();
    if colliding > 1 {
        let position = siblings
            .iter()
            .filter(|s| doc.tag_name(**s) == Some(el.tag.as_str()))
            .position(|s| *s == id)
            .map(|p| p + 1)
            .unwrap_or(1);
        compound.push_str(&format!(":nth-of-type({})", position));
    }
    compound
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all(doc: &Document, tag: &str) -> Vec<NodeId> {
        doc.descendant_elements(doc.root())
            .into_iter()
            .filter(|n| doc.tag_name(*n) == Some(tag))
            .collect()
    }

    #[test]
    fn test_id_fast_path_ignores_depth() {
        let doc = Document::parse(
            r#"<html><body><div><section><header><h1 id="title">Hi</h1></header></section></div></body></html>"#,
        );
        let h1 = all(&doc, "h1")[0];
        assert_eq!(generate_address(&doc, h1).unwrap(), "#title");
    }

    #[test]
    fn test_colliding_siblings_get_positional_qualifier() {
        let doc = Document::parse(
            r#"<html><body><div class="hero"><button class="cta">A</button><button class="cta">B</button></div></body></html>"#,
        );
        let buttons = all(&doc, "button");
        let first = generate_address(&doc, buttons[0]).unwrap();
        let second = generate_address(&doc, buttons[1]).unwrap();
        assert_eq!(first, "div.hero > button.cta:nth-of-type(1)");
        assert_eq!(second, "div.hero > button.cta:nth-of-type(2)");
        assert_eq!(resolve_address(&doc, &second).unwrap(), buttons[1]);
    }

    #[test]
    fn test_every_body_element_round_trips() {
        let doc = Document::parse(
            r#"<html><body>
<div class="card"><p>a</p><p class="x">b</p><p class="x y">c</p></div>
<div class="card"><p>a</p><span id="dup">1</span></div>
<ul><li>1</li><li>2</li></ul><span id="dup">2</span>
<div data-restyle-ui="root"><p>ui</p></div>
</body></html>"#,
        );
        let body = doc.body().unwrap();
        for node in doc.descendant_elements(body) {
            if doc.in_control_surface(node) {
                continue;
            }
            let address = generate_address(&doc, node).unwrap();
            assert_eq!(resolve_address(&doc, &address).unwrap(), node, "{}", address);
        }
    }

    #[test]
    fn test_duplicate_id_falls_back_to_path() {
        let doc = Document::parse(
            r#"<html><body><span id="dup">1</span><span id="dup">2</span></body></html>"#,
        );
        let spans = all(&doc, "span");
        let address = generate_address(&doc, spans[1]).unwrap();
        assert_eq!(address, "span:nth-of-type(2)");
    }

    #[test]
    fn test_resolution_errors() {
        let doc = Document::parse("<html><body><p>a</p><p>b</p></body></html>");
        assert!(matches!(
            resolve_address(&doc, "p"),
            Err(RestyleError::AddressResolution { matches: 2, .. })
        ));
        assert!(matches!(
            resolve_address(&doc, "p >"),
            Err(RestyleError::AddressResolution { matches: 0, .. })
        ));
    }
}
