//! Applies a validated patch to the live target.
//!
//! The patch always lands on the node behind the stored handle. The address is
//! never re-resolved here, so a document that changed shape since the snapshot
//! still gets the edit on the node the operator picked.

use super::model::Patch;
use super::sanitize::sanitize_markup;
use crate::css::{check_declaration, parse_declaration_block, parse_valid_declarations, serialize_declarations, upsert_declaration};
use crate::dom::{Document, NodeId};
use crate::error::{RestyleError, Result};

/// Result of applying a patch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchOutcome {
    /// Number of style declarations written.
    pub styles_applied: usize,
    /// Declarations skipped, with the reason.
    pub skipped: Vec<String>,
    /// Top-level nodes that replaced the target, when content changed.
    pub replacement: Vec<NodeId>,
    pub rationale: String,
}

impl PatchOutcome {
    pub fn content_replaced(&self) -> bool {
        !self.replacement.is_empty()
    }
}

/// Applies `patch` to `target`.
///
/// Content is applied first: the sanitized markup replaces the target in its
/// parent. Style declarations then go to the first element of the replacement,
/// or to the target itself when there was no content change. Bad declarations
/// are skipped with a warning and never abort the rest.
///
/// # Errors
///
/// Returns `RestyleError::PatchValidation` when `target` is not an element of
/// this document, or when content must replace a target that has no parent.
pub fn apply_patch(doc: &mut Document, target: NodeId, patch: &Patch) -> Result<PatchOutcome> {
    if !doc.contains(target) || doc.element(target).is_none() {
        return Err(RestyleError::patch_validation("target is not an element of this document"));
    }
    let mut outcome = PatchOutcome {
        rationale: patch.rationale.clone(),
        ..Default::default()
    };

    let mut style_target = Some(target);
    if !patch.content_text.trim().is_empty() {
        outcome.replacement = replace_content(doc, target, &patch.content_text)?;
        style_target = outcome
            .replacement
            .iter()
            .copied()
            .find(|n| doc.node(*n).is_element());
    }

    if !patch.style_text.trim().is_empty() {
        match style_target {
            Some(node) => apply_styles(doc, node, &patch.style_text, &mut outcome),
            None => {
                tracing::warn!("[Patch] Replacement has no element to style, dropping style changes");
                outcome.skipped.push(format!("{}: no element to style", patch.style_text.trim()));
            }
        }
    }

    tracing::info!(
        "[Patch] Applied {} declarations ({} skipped), content replaced: {}",
        outcome.styles_applied,
        outcome.skipped.len(),
        outcome.content_replaced()
    );
    Ok(outcome)
}

fn apply_styles(doc: &mut Document, node: NodeId, style_text: &str, outcome: &mut PatchOutcome) {
    let mut declarations = parse_valid_declarations(doc.attr(node, "style").unwrap_or(""));

    for parsed in parse_declaration_block(style_text) {
        let decl = match parsed {
            Ok(decl) => decl,
            Err(e) => {
                tracing::warn!("[Patch] Skipping unparseable declaration {}", e);
                outcome.skipped.push(e.to_string());
                continue;
            }
        };
        if let Err(e) = check_declaration(&decl) {
            tracing::warn!("[Patch] Skipping declaration '{}': {}", decl, e);
            outcome.skipped.push(format!("'{}': {}", decl, e));
            continue;
        }
        upsert_declaration(&mut declarations, decl);
        outcome.styles_applied += 1;
    }

    if outcome.styles_applied > 0 {
        doc.set_attr(node, "style", serialize_declarations(&declarations));
    }
}

fn replace_content(doc: &mut Document, target: NodeId, markup: &str) -> Result<Vec<NodeId>> {
    if doc.parent(target).is_none() {
        return Err(RestyleError::patch_validation(
            "target has no parent, its content cannot be replaced",
        ));
    }
    let (fragment, _report) = sanitize_markup(markup);
    let imported: Vec<NodeId> = fragment
        .children(fragment.root())
        .iter()
        .map(|child| doc.import_subtree(&fragment, *child))
        .collect();
    doc.replace_with(target, &imported);
    Ok(imported)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Document, NodeId) {
        let doc = Document::parse(
            r#"<html><body><div class="hero"><h1 style="margin: 0">Hi</h1></div></body></html>"#,
        );
        let h1 = doc
            .descendant_elements(doc.root())
            .into_iter()
            .find(|n| doc.tag_name(*n) == Some("h1"))
            .unwrap();
        (doc, h1)
    }

    fn style_patch(style: &str) -> Patch {
        Patch {
            style_text: style.into(),
            content_text: String::new(),
            rationale: "why".into(),
        }
    }

    #[test]
    fn test_bad_declaration_is_skipped() {
        let (mut doc, h1) = setup();
        let outcome = apply_patch(&mut doc, h1, &style_patch("color: red; bogus-prop purple")).unwrap();
        assert_eq!(doc.attr(h1, "style"), Some("margin: 0; color: red"));
        assert_eq!(outcome.styles_applied, 1);
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.rationale, "why");
    }

    #[test]
    fn test_disallowed_values_are_skipped() {
        let (mut doc, h1) = setup();
        apply_patch(
            &mut doc,
            h1,
            &style_patch("background: url(javascript:alert(1)); -moz-binding: url(x); margin: 4px"),
        )
        .unwrap();
        assert_eq!(doc.attr(h1, "style"), Some("margin: 4px"));
    }

    #[test]
    fn test_content_replaces_target_in_place() {
        let (mut doc, h1) = setup();
        let patch = Patch {
            style_text: "color: navy".into(),
            content_text: r#"<h2 onclick="x()">New<script>bad()</script></h2>"#.into(),
            rationale: String::new(),
        };
        let outcome = apply_patch(&mut doc, h1, &patch).unwrap();
        assert!(outcome.content_replaced());
        assert!(!doc.is_attached(h1));

        let hero = doc.parent(outcome.replacement[0]).unwrap();
        assert_eq!(
            doc.inner_html(hero),
            r#"<h2 style="color: navy">New</h2>"#
        );
    }

    #[test]
    fn test_detached_target_still_receives_styles() {
        let (mut doc, h1) = setup();
        doc.detach(h1);
        apply_patch(&mut doc, h1, &style_patch("color: red")).unwrap();
        assert_eq!(doc.attr(h1, "style"), Some("margin: 0; color: red"));

        let patch = Patch {
            content_text: "<p>x</p>".into(),
            ..Default::default()
        };
        assert!(matches!(
            apply_patch(&mut doc, h1, &patch),
            Err(RestyleError::PatchValidation(_))
        ));
    }

    #[test]
    fn test_non_element_target_is_rejected() {
        let (mut doc, h1) = setup();
        let text = doc.children(h1)[0];
        assert!(apply_patch(&mut doc, text, &style_patch("color: red")).is_err());
    }
}
