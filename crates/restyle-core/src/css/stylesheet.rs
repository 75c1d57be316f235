//! Stylesheet discovery and rule parsing.
//!
//! Readable sheets are inline `<style>` elements and `<link rel="stylesheet">`
//! elements whose text the host registered on the document. Any other linked
//! sheet counts as cross-origin and is skipped.

use super::declaration::{Declaration, parse_valid_declarations};
use crate::dom::{Document, NodeId, SelectorList, Specificity};

/// At-rules whose blocks contain ordinary style rules.
const GROUPING_AT_RULES: &[&str] = &["media", "supports", "layer", "container", "document"];

/// One qualified style rule.
#[derive(Debug, Clone)]
pub struct StyleRule {
    pub selectors: SelectorList,
    pub declarations: Vec<Declaration>,
    /// Source text, `selector { declarations }`.
    pub text: String,
    /// Position across all readable sheets.
    pub order: usize,
}

/// Every parsable style rule reachable from a document, in cascade order.
#[derive(Debug, Clone, Default)]
pub struct StyleSheetSet {
    rules: Vec<StyleRule>,
}

impl StyleSheetSet {
    /// Collects rules from every readable sheet of `doc`.
    pub fn collect(doc: &Document) -> Self {
        let mut set = Self::default();
        for sheet in readable_sheets(doc) {
            set.add_sheet(&sheet);
        }
        set
    }

    /// Parses `css` and appends its rules.
    pub fn add_sheet(&mut self, css: &str) {
        let cleaned = strip_comments(css);
        let mut raw = Vec::new();
        parse_rule_list(&cleaned, &mut raw);
        for (prelude, body) in raw {
            let selectors = match SelectorList::parse(&prelude) {
                Ok(selectors) => selectors,
                Err(e) => {
                    tracing::debug!("[Stylesheet] Skipping rule: {}", e);
                    continue;
                }
            };
            let order = self.rules.len();
            self.rules.push(StyleRule {
                selectors,
                declarations: parse_valid_declarations(&body),
                text: format!("{} {{ {} }}", prelude, body.trim()),
                order,
            });
        }
    }

    pub fn rules(&self) -> &[StyleRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules matching `id` in source order, with the specificity they matched at.
    pub fn matching(&self, doc: &Document, id: NodeId) -> Vec<(&StyleRule, Specificity)> {
        self.rules
            .iter()
            .filter_map(|rule| {
                rule.selectors
                    .matching_specificity(doc, id)
                    .map(|spec| (rule, spec))
            })
            .collect()
    }
}

/// Texts of every readable stylesheet, in document order.
pub fn readable_sheets(doc: &Document) -> Vec<String> {
    let mut sheets = Vec::new();
    for id in doc.descendant_elements(doc.root()) {
        if doc.in_control_surface(id) {
            continue;
        }
        match doc.tag_name(id) {
            Some("style") => sheets.push(doc.text_content(id)),
            Some("link") => {
                let is_stylesheet = doc
                    .attr(id, "rel")
                    .is_some_and(|rel| {
                        rel.split_ascii_whitespace()
                            .any(|t| t.eq_ignore_ascii_case("stylesheet"))
                    });
                if !is_stylesheet {
                    continue;
                }
                let href = doc.attr(id, "href").unwrap_or("");
                match doc.loaded_stylesheet(href) {
                    Some(css) => sheets.push(css.to_string()),
                    None => {
                        tracing::debug!("[Stylesheet] Sheet '{}' is not readable, skipping", href)
                    }
                }
            }
            _ => {}
        }
    }
    sheets
}

fn strip_comments(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut rest = css;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        match rest[start + 2..].find("*/") {
            Some(end) => rest = &rest[start + 2 + end + 2..],
            None => {
                rest = "";
                break;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Byte index of the `}` closing a block whose body starts at `from`.
fn block_end(css: &str, from: usize) -> usize {
    let mut depth = 1usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (i, ch) in css[from..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match (quote, ch) {
            (_, '\\') => escaped = true,
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '{') => depth += 1,
            (None, '}') => {
                depth -= 1;
                if depth == 0 {
                    return from + i;
                }
            }
            _ => {}
        }
    }
    css.len()
}

/// Byte index and character of the first `{`, `;` or `}` outside quotes.
fn prelude_end(css: &str) -> Option<(usize, char)> {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (i, ch) in css.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match (quote, ch) {
            (_, '\\') => escaped = true,
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '{' | ';' | '}') => return Some((i, ch)),
            _ => {}
        }
    }
    None
}

/// Flattens a rule list into `(prelude, body)` pairs, descending into
/// grouping at-rules. Recursion depth follows at-rule nesting in the sheet.
fn parse_rule_list(css: &str, out: &mut Vec<(String, String)>) {
    let mut pos = 0;
    while pos < css.len() {
        let rest = &css[pos..];
        let Some((open, delimiter)) = prelude_end(rest) else {
            break;
        };
        let prelude = rest[..open].trim();
        if delimiter != '{' {
            // Statement at-rule (`@import ...;`) or stray token.
            pos += open + 1;
            continue;
        }
        let body_start = pos + open + 1;
        let body_end = block_end(css, body_start);
        let body = &css[body_start..body_end];

        if let Some(at_rule) = prelude.strip_prefix('@') {
            let name = at_rule
                .split(|c: char| c.is_whitespace() || c == '(')
                .next()
                .unwrap_or("")
                .to_ascii_lowercase();
            if GROUPING_AT_RULES.contains(&name.as_str()) {
                parse_rule_list(body, out);
            }
        } else if !prelude.is_empty() {
            out.push((prelude.to_string(), body.to_string()));
        }
        pos = body_end + 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_parsing_descends_into_groups() {
        let mut set = StyleSheetSet::default();
        set.add_sheet(
            r#"
@import url(other.css);
/* comment { with braces } */
p { color: red }
@media (min-width: 10px) { .a > p { margin: 0 } @supports (display: grid) { p { display: grid } } }
@font-face { font-family: X; src: url(x.woff) }
@keyframes spin { from { opacity: 0 } to { opacity: 1 } }
p:hover { color: blue }
a[title="}"] { color: green }
"#,
        );
        let texts: Vec<&str> = set.rules().iter().map(|r| r.text.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "p { color: red }",
                ".a > p { margin: 0 }",
                "p { display: grid }",
                "p:hover { color: blue }",
                "a[title=\"}\"] { color: green }",
            ]
        );
    }

    #[test]
    fn test_invalid_selectors_are_skipped() {
        let mut set = StyleSheetSet::default();
        set.add_sheet("p:unknown-thing { color: red } div { color: blue }");
        assert_eq!(set.len(), 1);
        assert_eq!(set.rules()[0].order, 0);
    }

    #[test]
    fn test_unregistered_links_are_not_readable() {
        let mut doc = Document::parse(
            r#"<html><head>
<style>p { color: red }</style>
<link rel="stylesheet" href="https://cdn.example/a.css">
<link rel="stylesheet" href="/local.css">
<link rel="icon" href="/favicon.ico">
</head><body><div data-restyle-ui="root"><style>p { color: pink }</style></div></body></html>"#,
        );
        doc.register_stylesheet("/local.css", "p { margin: 0 }");
        assert_eq!(
            readable_sheets(&doc),
            vec!["p { color: red }".to_string(), "p { margin: 0 }".to_string()]
        );
    }
}
