//! Markup sanitizer for content patches.
//!
//! Explicit allow-lists for tags and attributes. Script-bearing and embedding
//! elements are removed with their content; any other unknown element is
//! unwrapped so its text survives. URL attributes accept only http(s),
//! mailto, tel, relative and fragment targets; inline `style` goes through the
//! style sanitizer.

use crate::css::{check_declaration, parse_declaration_block, serialize_declarations};
use crate::dom::{Document, NodeData, NodeId};

const ALLOWED_TAGS: &[&str] = &[
    "a", "abbr", "article", "aside", "b", "blockquote", "br", "button", "caption", "cite",
    "code", "col", "colgroup", "dd", "del", "details", "dfn", "div", "dl", "dt", "em",
    "figcaption", "figure", "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr",
    "i", "img", "ins", "kbd", "label", "li", "main", "mark", "nav", "ol", "p", "picture",
    "pre", "q", "s", "samp", "section", "small", "source", "span", "strong", "sub",
    "summary", "sup", "table", "tbody", "td", "tfoot", "th", "thead", "time", "tr", "u",
    "ul", "var", "wbr",
];

/// Removed together with everything inside them.
const DROPPED_TAGS: &[&str] = &[
    "script", "style", "iframe", "frame", "frameset", "object", "embed", "applet", "template",
    "noscript", "link", "meta", "base", "svg", "math",
];

const GLOBAL_ATTRIBUTES: &[&str] = &["class", "id", "title", "lang", "dir", "role", "hidden", "tabindex", "style"];

const URL_ATTRIBUTES: &[&str] = &["href", "src", "cite"];

const ALLOWED_SCHEMES: &[&str] = &["http", "https", "mailto", "tel"];

fn tag_attributes(tag: &str) -> &'static [&'static str] {
    match tag {
        "a" => &["href", "target", "rel"],
        "img" => &["src", "alt", "width", "height", "loading"],
        "source" => &["src", "type", "media"],
        "td" | "th" => &["colspan", "rowspan", "scope"],
        "col" | "colgroup" => &["span"],
        "ol" => &["start", "reversed", "type"],
        "li" => &["value"],
        "time" => &["datetime"],
        "button" => &["type", "disabled"],
        "blockquote" | "q" | "del" | "ins" => &["cite"],
        "details" => &["open"],
        "label" => &["for"],
        _ => &[],
    }
}

/// What the sanitizer removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SanitizeReport {
    pub dropped_elements: usize,
    pub unwrapped_elements: usize,
    pub removed_attributes: usize,
}

impl SanitizeReport {
    pub fn is_clean(&self) -> bool {
        self.dropped_elements == 0 && self.unwrapped_elements == 0 && self.removed_attributes == 0
    }
}

/// Parses `markup` as a body fragment and sanitizes it in place.
pub fn sanitize_markup(markup: &str) -> (Document, SanitizeReport) {
    let mut fragment = Document::parse_fragment(markup);
    let report = sanitize_fragment(&mut fragment);
    (fragment, report)
}

/// Sanitizes every node below the fragment's document node.
pub fn sanitize_fragment(fragment: &mut Document) -> SanitizeReport {
    let mut report = SanitizeReport::default();
    let root = fragment.root();
    let mut stack: Vec<NodeId> = fragment.children(root).to_vec();

    while let Some(node) = stack.pop() {
        let tag = match &fragment.node(node).data {
            NodeData::Element(el) => el.tag.clone(),
            NodeData::Text(_) => continue,
            _ => {
                fragment.detach(node);
                continue;
            }
        };

        if DROPPED_TAGS.contains(&tag.as_str()) {
            tracing::debug!("[Sanitize] Dropping <{}>", tag);
            fragment.detach(node);
            report.dropped_elements += 1;
            continue;
        }

        let children: Vec<NodeId> = fragment.children(node).to_vec();
        if !ALLOWED_TAGS.contains(&tag.as_str()) {
            tracing::debug!("[Sanitize] Unwrapping <{}>", tag);
            fragment.take_children(node);
            if !fragment.replace_with(node, &children) {
                fragment.detach(node);
            }
            report.unwrapped_elements += 1;
        } else {
            report.removed_attributes += clean_attributes(fragment, node, &tag);
        }
        stack.extend(children);
    }

    if !report.is_clean() {
        tracing::warn!(
            "[Sanitize] Removed {} elements, unwrapped {}, stripped {} attributes",
            report.dropped_elements,
            report.unwrapped_elements,
            report.removed_attributes
        );
    }
    report
}

fn clean_attributes(doc: &mut Document, node: NodeId, tag: &str) -> usize {
    let Some(el) = doc.element_mut(node) else {
        return 0;
    };
    let before = el.attrs.len();
    let per_tag = tag_attributes(tag);

    el.attrs.retain(|attr| {
        let name = attr.name.to_ascii_lowercase();
        let allowed_name = GLOBAL_ATTRIBUTES.contains(&name.as_str())
            || per_tag.contains(&name.as_str())
            || name.starts_with("aria-")
            || (name.starts_with("data-") && name != crate::dom::CONTROL_SURFACE_ATTR);
        if !allowed_name {
            if name.starts_with("on") {
                tracing::debug!("[Sanitize] Removing event handler attribute '{}'", name);
            }
            return false;
        }
        if URL_ATTRIBUTES.contains(&name.as_str()) {
            return is_safe_url(&attr.value);
        }
        true
    });

    let mut removed = before - el.attrs.len();

    if let Some(style) = el.attr("style").map(str::to_string) {
        let kept: Vec<_> = parse_declaration_block(&style)
            .into_iter()
            .filter_map(|d| d.ok())
            .filter(|d| check_declaration(d).is_ok())
            .collect();
        if kept.is_empty() {
            el.remove_attr("style");
            removed += 1;
        } else {
            el.set_attr("style", serialize_declarations(&kept));
        }
    }

    if tag == "a" && el.attr("target").is_some_and(|t| t.eq_ignore_ascii_case("_blank")) {
        el.set_attr("rel", "noopener noreferrer");
    }
    removed
}

/// True for http(s), mailto, tel, relative and fragment URLs.
pub fn is_safe_url(value: &str) -> bool {
    // Browsers ignore ASCII whitespace and control characters inside schemes.
    let compact: String = value
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && !c.is_control())
        .collect();
    let scheme_end = compact.find(|c| matches!(c, ':' | '/' | '?' | '#'));
    match scheme_end {
        Some(i) if compact[i..].starts_with(':') => {
            let scheme = compact[..i].to_ascii_lowercase();
            ALLOWED_SCHEMES.contains(&scheme.as_str())
        }
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clean(markup: &str) -> String {
        let (fragment, _) = sanitize_markup(markup);
        fragment.inner_html(fragment.root())
    }

    #[test]
    fn test_scripts_and_handlers_removed() {
        assert_eq!(
            clean(r#"<div onclick="x()" class="a"><script>alert(1)</script><p onmouseover="y">hi</p></div>"#),
            r#"<div class="a"><p>hi</p></div>"#
        );
    }

    #[test]
    fn test_unknown_elements_are_unwrapped() {
        assert_eq!(
            clean("<form action=\"/x\"><input name=\"q\"><marquee>wow</marquee></form>"),
            "wow"
        );
    }

    #[test]
    fn test_url_schemes() {
        assert!(is_safe_url("https://example.com"));
        assert!(is_safe_url("/relative/path"));
        assert!(is_safe_url("#anchor"));
        assert!(is_safe_url("mailto:a@b.c"));
        assert!(is_safe_url("page?next=javascript:x"));
        assert!(!is_safe_url("javascript:alert(1)"));
        assert!(!is_safe_url(" java\tscript:alert(1)"));
        assert!(!is_safe_url("data:text/html,x"));

        assert_eq!(
            clean(r#"<a href="javascript:alert(1)" target="_blank">x</a><img src="https://i/a.png" onerror="z">"#),
            r#"<a target="_blank" rel="noopener noreferrer">x</a><img src="https://i/a.png">"#
        );
    }

    #[test]
    fn test_style_attribute_is_filtered() {
        assert_eq!(
            clean(r#"<p style="color: red; behavior: url(x.htc); background: url(javascript:x)">t</p>"#),
            r#"<p style="color: red">t</p>"#
        );
        assert_eq!(clean(r#"<p style="position-anchor: --x">t</p>"#), "<p>t</p>");
    }

    #[test]
    fn test_control_surface_marker_is_not_accepted() {
        let (fragment, report) = sanitize_markup(r#"<div data-restyle-ui="root" data-kind="x">t</div>"#);
        assert_eq!(fragment.inner_html(fragment.root()), r#"<div data-kind="x">t</div>"#);
        assert_eq!(report.removed_attributes, 1);
    }
}
