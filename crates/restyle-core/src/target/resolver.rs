//! Hover/click driven target selection.

use super::address::generate_address;
use super::highlight::{HighlightKind, LayoutProbe, NoLayout, clear_highlight, render_highlight};
use super::safety::check_target;
use super::Target;
use crate::dom::{Cursor, Document, NodeId};
use crate::error::{RestyleError, Result};
use std::sync::Arc;

/// Pointer-capture owner name used by the resolver.
pub const RESOLVER_CAPTURE: &str = "target-resolver";

/// Turns selection mode plus pointer activity into a committed [`Target`].
///
/// While selection mode is active the resolver holds the document's pointer
/// capture; no other component may listen for hover or click at that time.
pub struct TargetResolver {
    probe: Arc<dyn LayoutProbe>,
    active: bool,
    hovered: Option<NodeId>,
    /// Node under the frozen "selected" highlight.
    selected: Option<NodeId>,
}

impl Default for TargetResolver {
    fn default() -> Self {
        Self::new(Arc::new(NoLayout))
    }
}

impl std::fmt::Debug for TargetResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TargetResolver")
            .field("active", &self.active)
            .field("hovered", &self.hovered)
            .field("selected", &self.selected)
            .finish()
    }
}

impl TargetResolver {
    pub fn new(probe: Arc<dyn LayoutProbe>) -> Self {
        Self {
            probe,
            active: false,
            hovered: None,
            selected: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn hovered(&self) -> Option<NodeId> {
        self.hovered
    }

    /// Takes the pointer capture and shows the crosshair. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns `RestyleError::InvalidState` when another owner holds the capture.
    pub fn enter_selection_mode(&mut self, doc: &mut Document) -> Result<()> {
        if self.active {
            return Ok(());
        }
        doc.capture_pointer(RESOLVER_CAPTURE)?;
        doc.set_cursor(Some(Cursor::Crosshair));
        self.active = true;
        tracing::info!("[Resolver] Selection mode on");
        Ok(())
    }

    /// Releases the pointer capture and clears the hover outline. Idempotent.
    pub fn exit_selection_mode(&mut self, doc: &mut Document) {
        if !self.active {
            return;
        }
        self.on_hover_out(doc);
        doc.release_pointer(RESOLVER_CAPTURE);
        doc.set_cursor(None);
        self.active = false;
        tracing::info!("[Resolver] Selection mode off");
    }

    /// Outlines `node` when it is a safe target. Returns whether it was outlined.
    pub fn on_hover(&mut self, doc: &mut Document, node: NodeId) -> bool {
        if !self.active || check_target(doc, node).is_err() {
            return false;
        }
        let rect = self.probe.bounding_box(doc, node);
        render_highlight(doc, HighlightKind::Hover, rect);
        self.hovered = Some(node);
        true
    }

    /// Clears the transient hover outline.
    pub fn on_hover_out(&mut self, doc: &mut Document) {
        if self.hovered.take().is_some() {
            clear_highlight(doc, HighlightKind::Hover);
        }
    }

    /// Commits `node` as the target.
    ///
    /// On success the selected outline is frozen around the node and selection
    /// mode ends. An unsafe node is rejected and selection mode stays active.
    ///
    /// # Errors
    ///
    /// - `RestyleError::InvalidState` when selection mode is off
    /// - `RestyleError::UnsafeTarget` when `node` fails the safety predicate
    /// - `RestyleError::AddressResolution` when no unique address exists
    pub fn on_commit(&mut self, doc: &mut Document, node: NodeId) -> Result<Target> {
        if !self.active {
            return Err(RestyleError::invalid_state("selection mode is off", "commit target"));
        }
        if let Err(e) = check_target(doc, node) {
            tracing::debug!("[Resolver] Rejected commit: {}", e);
            return Err(e);
        }
        let address = generate_address(doc, node)?;
        let tag = doc.tag_name(node).unwrap_or_default().to_string();

        self.on_hover_out(doc);
        self.selected = Some(node);
        let rect = self.probe.bounding_box(doc, node);
        render_highlight(doc, HighlightKind::Selected, rect);
        self.exit_selection_mode(doc);

        tracing::info!("[Resolver] Committed <{}> at '{}'", tag, address);
        Ok(Target { node, address, tag })
    }

    /// Repositions the selected outline after scroll or resize.
    pub fn on_viewport_change(&mut self, doc: &mut Document) {
        if let Some(node) = self.selected {
            let rect = self.probe.bounding_box(doc, node);
            render_highlight(doc, HighlightKind::Selected, rect);
        }
    }

    /// Drops the selected outline.
    pub fn clear_selection(&mut self, doc: &mut Document) {
        if self.selected.take().is_some() {
            clear_highlight(doc, HighlightKind::Selected);
        }
    }

    /// Forgets every node handle, for when the document content was replaced.
    pub fn reset(&mut self, doc: &mut Document) {
        self.exit_selection_mode(doc);
        self.clear_selection(doc);
        self.hovered = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::highlight::Rect;
    use std::sync::Mutex;

    struct FixedProbe {
        calls: Mutex<usize>,
    }

    impl LayoutProbe for FixedProbe {
        fn bounding_box(&self, _doc: &Document, _id: NodeId) -> Option<Rect> {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            Some(Rect { x: *calls as f64, y: 0.0, width: 10.0, height: 10.0 })
        }
    }

    fn doc() -> Document {
        Document::parse(r#"<html><body><main><p class="lead">x</p></main></body></html>"#)
    }

    fn find(doc: &Document, tag: &str) -> NodeId {
        doc.descendant_elements(doc.root())
            .into_iter()
            .find(|n| doc.tag_name(*n) == Some(tag))
            .unwrap()
    }

    #[test]
    fn test_selection_mode_is_idempotent() {
        let mut doc = doc();
        let mut resolver = TargetResolver::default();
        resolver.enter_selection_mode(&mut doc).unwrap();
        resolver.enter_selection_mode(&mut doc).unwrap();
        assert_eq!(doc.cursor(), Some(Cursor::Crosshair));
        assert_eq!(doc.pointer_owner(), Some(RESOLVER_CAPTURE));

        resolver.exit_selection_mode(&mut doc);
        resolver.exit_selection_mode(&mut doc);
        assert_eq!(doc.cursor(), None);
        assert_eq!(doc.pointer_owner(), None);
    }

    #[test]
    fn test_competing_capture_is_rejected() {
        let mut doc = doc();
        doc.capture_pointer("someone-else").unwrap();
        let mut resolver = TargetResolver::default();
        assert!(resolver.enter_selection_mode(&mut doc).is_err());
        assert!(!resolver.is_active());
    }

    #[test]
    fn test_hover_only_outlines_safe_nodes() {
        let mut doc = doc();
        let mut resolver = TargetResolver::default();
        let p = find(&doc, "p");
        let body = doc.body().unwrap();

        assert!(!resolver.on_hover(&mut doc, p), "inactive resolver ignores hover");
        resolver.enter_selection_mode(&mut doc).unwrap();
        assert!(!resolver.on_hover(&mut doc, body));
        assert!(doc.control_element("highlight-hover").is_none());
        assert!(resolver.on_hover(&mut doc, p));
        assert!(doc.control_element("highlight-hover").is_some());
        resolver.on_hover_out(&mut doc);
        assert!(doc.control_element("highlight-hover").is_none());
    }

    #[test]
    fn test_commit_unsafe_keeps_selection_mode() {
        let mut doc = doc();
        let mut resolver = TargetResolver::default();
        resolver.enter_selection_mode(&mut doc).unwrap();
        let body = doc.body().unwrap();
        let err = resolver.on_commit(&mut doc, body).unwrap_err();
        assert!(matches!(err, RestyleError::UnsafeTarget { .. }));
        assert!(resolver.is_active());
    }

    #[test]
    fn test_commit_freezes_highlight_and_tracks_viewport() {
        let mut doc = doc();
        let probe = Arc::new(FixedProbe { calls: Mutex::new(0) });
        let mut resolver = TargetResolver::new(probe);
        resolver.enter_selection_mode(&mut doc).unwrap();
        let p = find(&doc, "p");
        resolver.on_hover(&mut doc, p);

        let target = resolver.on_commit(&mut doc, p).unwrap();
        assert_eq!(target.node(), p);
        assert_eq!(target.address(), "main > p.lead");
        assert!(!resolver.is_active());
        assert!(doc.control_element("highlight-hover").is_none());

        let selected = doc.control_element("highlight-selected").unwrap();
        let before = doc.attr(selected, "style").unwrap().to_string();
        resolver.on_viewport_change(&mut doc);
        let after = doc.attr(selected, "style").unwrap().to_string();
        assert_ne!(before, after);

        resolver.clear_selection(&mut doc);
        assert!(doc.control_element("highlight-selected").is_none());
    }
}
