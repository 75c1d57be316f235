//! Effective style computation.
//!
//! A lightweight cascade over the static tree: values inherited from the
//! parent, then tag defaults, then matching author rules ordered by
//! (importance, inline, specificity, source order). No layout, no shorthand
//! expansion, no `var()` substitution.

use super::declaration::parse_valid_declarations;
use super::stylesheet::StyleSheetSet;
use crate::dom::{Document, NodeId, Specificity};
use std::collections::BTreeMap;

/// Resolved property → value map.
pub type StyleMap = BTreeMap<String, String>;

/// Properties whose value passes from parent to child.
const INHERITED_PROPERTIES: &[&str] = &[
    "color",
    "cursor",
    "font-family",
    "font-size",
    "font-style",
    "font-weight",
    "letter-spacing",
    "line-height",
    "list-style-type",
    "text-align",
    "text-indent",
    "text-transform",
    "visibility",
    "white-space",
    "word-spacing",
];

const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "dd", "details", "div", "dl", "dt",
    "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6",
    "header", "hgroup", "hr", "html", "main", "menu", "nav", "ol", "p", "pre", "section",
    "summary", "ul",
];

const HIDDEN_TAGS: &[&str] = &[
    "head", "link", "meta", "script", "style", "template", "title", "noscript", "base",
];

/// User-agent defaults for a tag.
fn tag_defaults(tag: &str) -> Vec<(&'static str, &'static str)> {
    let display = if HIDDEN_TAGS.contains(&tag) {
        "none"
    } else if BLOCK_TAGS.contains(&tag) {
        "block"
    } else {
        match tag {
            "li" => "list-item",
            "table" => "table",
            "tr" => "table-row",
            "td" | "th" => "table-cell",
            "thead" => "table-header-group",
            "tbody" => "table-row-group",
            "tfoot" => "table-footer-group",
            "img" | "button" | "input" | "select" | "textarea" => "inline-block",
            _ => "inline",
        }
    };
    let mut out = vec![("display", display)];
    match tag {
        "body" => out.push(("margin", "8px")),
        "p" | "blockquote" | "figure" | "dl" => out.push(("margin", "1em 0")),
        "ul" | "ol" | "menu" => {
            out.push(("margin", "1em 0"));
            out.push(("padding", "0 0 0 40px"));
        }
        "h1" => out.extend([("font-size", "2em"), ("margin", "0.67em 0")]),
        "h2" => out.extend([("font-size", "1.5em"), ("margin", "0.83em 0")]),
        "h3" => out.extend([("font-size", "1.17em"), ("margin", "1em 0")]),
        "h4" => out.push(("margin", "1.33em 0")),
        "h5" => out.extend([("font-size", "0.83em"), ("margin", "1.67em 0")]),
        "h6" => out.extend([("font-size", "0.67em"), ("margin", "2.33em 0")]),
        "a" => out.extend([("color", "#0000ee"), ("text-decoration", "underline"), ("cursor", "pointer")]),
        "pre" | "code" | "kbd" | "samp" => out.push(("font-family", "monospace")),
        "th" => out.push(("text-align", "center")),
        "center" => out.push(("text-align", "center")),
        _ => {}
    }
    if matches!(tag, "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "b" | "strong" | "th") {
        out.push(("font-weight", "bold"));
    }
    if matches!(tag, "em" | "i" | "cite" | "var" | "dfn" | "address") {
        out.push(("font-style", "italic"));
    }
    if matches!(tag, "u" | "ins") {
        out.push(("text-decoration", "underline"));
    }
    if matches!(tag, "s" | "del" | "strike") {
        out.push(("text-decoration", "line-through"));
    }
    out
}

/// Computes the effective style of `id` given the document's readable sheets.
///
/// Each element on the path from the document element down to `id` is
/// resolved in turn so inherited values come from the parent's result.
pub fn effective_style(doc: &Document, sheets: &StyleSheetSet, id: NodeId) -> StyleMap {
    let mut path: Vec<NodeId> = std::iter::once(id)
        .chain(doc.ancestors(id))
        .filter(|n| doc.node(*n).is_element())
        .collect();
    path.reverse();

    let mut parent_style = StyleMap::new();
    for node in path {
        parent_style = resolve_element(doc, sheets, node, &parent_style);
    }
    parent_style
}

fn resolve_element(
    doc: &Document,
    sheets: &StyleSheetSet,
    id: NodeId,
    parent: &StyleMap,
) -> StyleMap {
    let mut style: StyleMap = parent
        .iter()
        .filter(|(prop, _)| INHERITED_PROPERTIES.contains(&prop.as_str()))
        .map(|(prop, value)| (prop.clone(), value.clone()))
        .collect();

    if let Some(tag) = doc.tag_name(id) {
        for (prop, value) in tag_defaults(tag) {
            style.insert(prop.to_string(), value.to_string());
        }
    }

    // (important, inline, specificity, order)
    type Key = (bool, bool, Specificity, usize);
    let mut declared: Vec<(Key, String, String)> = Vec::new();
    for (rule, specificity) in sheets.matching(doc, id) {
        for decl in &rule.declarations {
            declared.push((
                (decl.important, false, specificity, rule.order),
                decl.property.clone(),
                decl.value.clone(),
            ));
        }
    }
    if let Some(inline) = doc.attr(id, "style") {
        for (i, decl) in parse_valid_declarations(inline).into_iter().enumerate() {
            declared.push((
                (decl.important, true, Specificity::default(), i),
                decl.property,
                decl.value,
            ));
        }
    }
    // Stable sort keeps declaration order within one rule.
    declared.sort_by(|a, b| a.0.cmp(&b.0));

    for (_, prop, value) in declared {
        let value = if value.eq_ignore_ascii_case("inherit") {
            match parent.get(&prop) {
                Some(inherited) => inherited.clone(),
                None => {
                    style.remove(&prop);
                    continue;
                }
            }
        } else {
            value
        };
        style.insert(prop, value);
    }
    style
}
