//! Highlight overlays and the layout seam.
//!
//! Overlays are control-surface elements appended to the body. They never
//! intercept pointer events and are excluded from addressing and snapshots
//! like every other control-surface element.

use crate::dom::{CONTROL_SURFACE_ATTR, Document, NodeId};
use serde::{Deserialize, Serialize};

/// Viewport-relative bounding box in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Source of element geometry. The host's layout engine implements this.
pub trait LayoutProbe: Send + Sync {
    /// Returns the current bounding box of `id`, or `None` when unknown.
    fn bounding_box(&self, doc: &Document, id: NodeId) -> Option<Rect>;
}

/// Probe for hosts without layout information.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLayout;

impl LayoutProbe for NoLayout {
    fn bounding_box(&self, _doc: &Document, _id: NodeId) -> Option<Rect> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightKind {
    /// Transient outline following the pointer.
    Hover,
    /// Frozen outline around the committed target.
    Selected,
}

impl HighlightKind {
    /// Value of the control-surface marker on the overlay element.
    pub fn role(self) -> &'static str {
        match self {
            HighlightKind::Hover => "highlight-hover",
            HighlightKind::Selected => "highlight-selected",
        }
    }

    fn outline(self) -> &'static str {
        match self {
            HighlightKind::Hover => "2px dashed #2563eb",
            HighlightKind::Selected => "2px solid #f97316",
        }
    }
}

/// Creates or updates the overlay of `kind` to cover `rect`.
pub fn render_highlight(doc: &mut Document, kind: HighlightKind, rect: Option<Rect>) -> Option<NodeId> {
    let overlay = match doc.control_element(kind.role()) {
        Some(existing) => existing,
        None => {
            let body = doc.body()?;
            let overlay = doc.create_element("div");
            doc.set_attr(overlay, CONTROL_SURFACE_ATTR, kind.role());
            doc.append_child(body, overlay);
            overlay
        }
    };

    let mut style = format!(
        "position: fixed; pointer-events: none; box-sizing: border-box; z-index: 2147483646; outline: {}",
        kind.outline()
    );
    if let Some(r) = rect {
        style.push_str(&format!(
            "; left: {}px; top: {}px; width: {}px; height: {}px",
            r.x, r.y, r.width, r.height
        ));
    }
    doc.set_attr(overlay, "style", style);
    Some(overlay)
}

/// Removes the overlay of `kind`, if present.
pub fn clear_highlight(doc: &mut Document, kind: HighlightKind) {
    if let Some(overlay) = doc.control_element(kind.role()) {
        doc.detach(overlay);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_reuses_overlay_and_clears() {
        let mut doc = Document::parse("<html><body><p>x</p></body></html>");
        let rect = Rect { x: 1.0, y: 2.0, width: 30.0, height: 4.5 };
        let first = render_highlight(&mut doc, HighlightKind::Hover, Some(rect)).unwrap();
        let second = render_highlight(&mut doc, HighlightKind::Hover, None).unwrap();
        assert_eq!(first, second);
        assert!(doc.in_control_surface(first));
        assert!(!doc.attr(first, "style").unwrap().contains("left"));

        render_highlight(&mut doc, HighlightKind::Selected, Some(rect));
        let selected = doc.control_element("highlight-selected").unwrap();
        assert!(doc.attr(selected, "style").unwrap().contains("width: 30px"));

        clear_highlight(&mut doc, HighlightKind::Hover);
        assert!(doc.control_element("highlight-hover").is_none());
        assert!(doc.control_element("highlight-selected").is_some());
    }
}
