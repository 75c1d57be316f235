//! Context snapshots: the bounded description of a target sent with a
//! generative request.

pub mod excerpt;

pub use excerpt::{DEPTH_PLACEHOLDER, TRUNCATION_MARKER, markup_excerpt};

use crate::config::SnapshotLimits;
use crate::css::{SNAPSHOT_PROPERTIES, StyleSheetSet, effective_style};
use crate::dom::{Document, NodeId};
use crate::target::Target;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Values that carry no information for the generative service.
const NO_OP_VALUES: &[&str] = &["none", "normal", "auto"];

/// Immutable description of a target at capture time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextSnapshot {
    pub tag: String,
    pub address: String,
    pub markup_excerpt: String,
    pub effective_styles: BTreeMap<String, String>,
    pub matching_rule_text: String,
}

impl ContextSnapshot {
    /// Builds the snapshot for `target`. Reads the document only.
    pub fn capture(doc: &Document, target: &Target, limits: &SnapshotLimits) -> Self {
        let node = target.node();
        let sheets = StyleSheetSet::collect(doc);
        let snapshot = Self {
            tag: target.tag().to_string(),
            address: target.address().to_string(),
            markup_excerpt: markup_excerpt(doc, node, limits.markup_depth, limits.markup_char_cap),
            effective_styles: filtered_styles(doc, &sheets, node),
            matching_rule_text: matching_rule_text(doc, &sheets, node, limits.rule_cap),
        };
        tracing::debug!(
            "[Snapshot] <{}> excerpt={} chars, {} styles",
            snapshot.tag,
            snapshot.markup_excerpt.chars().count(),
            snapshot.effective_styles.len()
        );
        snapshot
    }
}

fn filtered_styles(doc: &Document, sheets: &StyleSheetSet, node: NodeId) -> BTreeMap<String, String> {
    effective_style(doc, sheets, node)
        .into_iter()
        .filter(|(prop, value)| {
            SNAPSHOT_PROPERTIES.contains(&prop.as_str())
                && !NO_OP_VALUES.iter().any(|v| value.eq_ignore_ascii_case(v))
        })
        .collect()
}

/// Source text of up to `cap` rules matching `node`, one per line.
fn matching_rule_text(doc: &Document, sheets: &StyleSheetSet, node: NodeId, cap: usize) -> String {
    sheets
        .matching(doc, node)
        .into_iter()
        .take(cap)
        .map(|(rule, _)| rule.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::TargetResolver;

    fn commit(doc: &mut Document, tag: &str) -> Target {
        let node = doc
            .descendant_elements(doc.root())
            .into_iter()
            .find(|n| doc.tag_name(*n) == Some(tag))
            .unwrap();
        let mut resolver = TargetResolver::default();
        resolver.enter_selection_mode(doc).unwrap();
        resolver.on_commit(doc, node).unwrap()
    }

    #[test]
    fn test_capture_collects_styles_and_rules() {
        let mut doc = Document::parse(
            r#"<html><head><style>
.cta { color: white; background-color: #f00; text-decoration: none }
button:hover { color: black }
div button { font-size: 18px; float: left }
</style></head><body><div><button class="cta" style="padding: 4px 8px">Buy</button></div></body></html>"#,
        );
        let target = commit(&mut doc, "button");
        let snapshot = ContextSnapshot::capture(&doc, &target, &SnapshotLimits::default());

        assert_eq!(snapshot.tag, "button");
        assert_eq!(snapshot.address, "div > button.cta");
        assert_eq!(snapshot.markup_excerpt, r#"<button class="cta" style="padding: 4px 8px">Buy</button>"#);
        assert_eq!(snapshot.effective_styles.get("color").map(String::as_str), Some("white"));
        assert_eq!(snapshot.effective_styles.get("padding").map(String::as_str), Some("4px 8px"));
        assert_eq!(snapshot.effective_styles.get("display").map(String::as_str), Some("inline-block"));
        assert!(!snapshot.effective_styles.contains_key("text-decoration"));
        assert!(!snapshot.effective_styles.contains_key("float"));
        assert_eq!(
            snapshot.matching_rule_text,
            ".cta { color: white; background-color: #f00; text-decoration: none }\ndiv button { font-size: 18px; float: left }"
        );
    }

    #[test]
    fn test_rule_cap() {
        let rules: String = (0..30).map(|i| format!("p {{ z-index: {} }}\n", i)).collect();
        let mut doc = Document::parse(&format!(
            "<html><head><style>{}</style></head><body><p>x</p></body></html>",
            rules
        ));
        let target = commit(&mut doc, "p");
        let snapshot = ContextSnapshot::capture(&doc, &target, &SnapshotLimits::default());
        assert_eq!(snapshot.matching_rule_text.lines().count(), 20);
    }

    #[test]
    fn test_serializes_camel_case() {
        let snapshot = ContextSnapshot {
            tag: "p".into(),
            address: "#a".into(),
            markup_excerpt: "<p></p>".into(),
            effective_styles: BTreeMap::new(),
            matching_rule_text: String::new(),
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert!(json.get("markupExcerpt").is_some());
        assert!(json.get("matchingRuleText").is_some());
    }
}
