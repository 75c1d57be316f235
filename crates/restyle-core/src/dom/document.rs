//! Arena-backed live document.

use super::node::{ElementData, Node, NodeData, NodeId};
use crate::error::{RestyleError, Result};
use std::collections::HashMap;

/// Marker attribute carried by every element of the engine's own control surface.
pub const CONTROL_SURFACE_ATTR: &str = "data-restyle-ui";

/// Pointer affordance shown while selection mode is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cursor {
    Crosshair,
}

/// The live document tree.
///
/// Nodes live in an append-only arena. Detaching a node only unlinks it from
/// its parent; its slot (and every [`NodeId`] pointing at it) stays valid
/// until [`Document::compact`] drops the unreachable slots.
///
/// Besides the tree, the document carries the few pieces of host state the
/// engine needs and that never appear in serialized markup: the pointer
/// affordance, the owner of the hover/click capture, and stylesheet bodies the
/// host was able to load for `<link>` elements.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    cursor: Option<Cursor>,
    pointer_capture: Option<String>,
    loaded_stylesheets: HashMap<String, String>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Creates an empty document containing only the document node.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(NodeData::Document)],
            root: NodeId(0),
            cursor: None,
            pointer_capture: None,
            loaded_stylesheets: HashMap::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Arena slots in use, orphaned nodes included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true when `id` was produced by this document.
    pub fn contains(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    /// Returns the node behind `id`.
    ///
    /// # Panics
    ///
    /// Panics when `id` belongs to another document; use [`Document::contains`]
    /// to check handles received from the host.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    // ============================================================================
    // Construction
    // ============================================================================

    fn push(&mut self, data: NodeData) -> NodeId {
        self.nodes.push(Node::new(data));
        NodeId(self.nodes.len() - 1)
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeData::Element(ElementData::new(tag)))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeData::Text(text.into()))
    }

    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeData::Comment(text.into()))
    }

    pub(crate) fn create_node(&mut self, data: NodeData) -> NodeId {
        self.push(data)
    }

    // ============================================================================
    // Tree mutation
    // ============================================================================

    /// Unlinks `id` from its parent. The node and its subtree stay in the arena.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.node(id).parent {
            self.node_mut(parent).children.retain(|c| *c != id);
            self.node_mut(id).parent = None;
        }
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.node_mut(child).parent = Some(parent);
        self.node_mut(parent).children.push(child);
    }

    /// Inserts `child` before `reference`, or appends when `reference` is not a child.
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: NodeId) {
        self.detach(child);
        let pos = self
            .node(parent)
            .children
            .iter()
            .position(|c| *c == reference);
        self.node_mut(child).parent = Some(parent);
        match pos {
            Some(pos) => self.node_mut(parent).children.insert(pos, child),
            None => self.node_mut(parent).children.push(child),
        }
    }

    /// Replaces `id` in its parent with `replacements`, keeping position.
    ///
    /// A node without a parent cannot be replaced in place; its replacements are
    /// left detached and `false` is returned.
    pub fn replace_with(&mut self, id: NodeId, replacements: &[NodeId]) -> bool {
        let Some(parent) = self.node(id).parent else {
            return false;
        };
        for r in replacements {
            self.insert_before(parent, *r, id);
        }
        self.detach(id);
        true
    }

    /// Detaches every child of `id` and returns them in order.
    pub fn take_children(&mut self, id: NodeId) -> Vec<NodeId> {
        let children = std::mem::take(&mut self.node_mut(id).children);
        for child in &children {
            self.node_mut(*child).parent = None;
        }
        children
    }

    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        if let NodeData::Text(existing) = &mut self.node_mut(id).data {
            *existing = text.into();
        }
    }

    // ============================================================================
    // Navigation
    // ============================================================================

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id).filter(|p| self.node(*p).is_element())
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.node(id)
            .children
            .iter()
            .copied()
            .filter(|c| self.node(*c).is_element())
    }

    /// Ancestors from the parent up to the document node.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), |p| self.parent(*p))
    }

    /// True when `id` is connected to the document node.
    pub fn is_attached(&self, id: NodeId) -> bool {
        id == self.root || self.ancestors(id).any(|a| a == self.root)
    }

    /// Pre-order traversal of the subtree rooted at `id`, including `id`.
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.node(current).children.iter().rev().copied());
        }
        out
    }

    /// Element descendants of `id` in document order, excluding `id` itself.
    pub fn descendant_elements(&self, id: NodeId) -> Vec<NodeId> {
        self.subtree(id)
            .into_iter()
            .skip(1)
            .filter(|n| self.node(*n).is_element())
            .collect()
    }

    /// Number of element ancestors; the document element has depth 0.
    pub fn depth(&self, id: NodeId) -> usize {
        self.ancestors(id)
            .filter(|a| self.node(*a).is_element())
            .count()
    }

    // ============================================================================
    // Element access
    // ============================================================================

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        self.node(id).as_element()
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match &mut self.node_mut(id).data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|el| el.tag.as_str())
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|el| el.attr(name))
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        if let Some(el) = self.element_mut(id) {
            el.set_attr(name, value);
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Option<String> {
        self.element_mut(id).and_then(|el| el.remove_attr(name))
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, id: NodeId) -> String {
        self.subtree(id)
            .into_iter()
            .filter_map(|n| match &self.node(n).data {
                NodeData::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn document_element(&self) -> Option<NodeId> {
        self.element_children(self.root).next()
    }

    pub fn head(&self) -> Option<NodeId> {
        self.child_with_tag("head")
    }

    pub fn body(&self) -> Option<NodeId> {
        self.child_with_tag("body")
    }

    fn child_with_tag(&self, tag: &str) -> Option<NodeId> {
        let html = self.document_element()?;
        self.element_children(html)
            .find(|c| self.tag_name(*c) == Some(tag))
    }

    /// First element in document order carrying `id="value"`.
    pub fn element_by_id(&self, value: &str) -> Option<NodeId> {
        self.descendant_elements(self.root)
            .into_iter()
            .find(|n| self.attr(*n, "id") == Some(value))
    }

    // ============================================================================
    // Control surface
    // ============================================================================

    /// True when `id` is a control-surface element or sits inside one.
    pub fn in_control_surface(&self, id: NodeId) -> bool {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .any(|n| {
                self.element(n)
                    .is_some_and(|el| el.has_attr(CONTROL_SURFACE_ATTR))
            })
    }

    /// Control-surface roots directly under `parent`.
    pub fn control_surface_children(&self, parent: NodeId) -> Vec<NodeId> {
        self.element_children(parent)
            .filter(|c| self.attr(*c, CONTROL_SURFACE_ATTR).is_some())
            .collect()
    }

    /// Detaches every control-surface element below `scope`. Returns how many
    /// subtrees were removed.
    pub fn strip_control_surface(&mut self, scope: NodeId) -> usize {
        let marked: Vec<NodeId> = self
            .descendant_elements(scope)
            .into_iter()
            .filter(|n| self.attr(*n, CONTROL_SURFACE_ATTR).is_some())
            .collect();
        let mut removed = 0;
        for id in marked {
            // Nested markers go with their outer subtree.
            if self.is_attached_below(id, scope) {
                self.detach(id);
                removed += 1;
            }
        }
        removed
    }

    fn is_attached_below(&self, id: NodeId, scope: NodeId) -> bool {
        self.ancestors(id).any(|a| a == scope)
    }

    /// Control-surface element with `data-restyle-ui="role"` anywhere in the tree.
    pub fn control_element(&self, role: &str) -> Option<NodeId> {
        self.descendant_elements(self.root)
            .into_iter()
            .find(|n| self.attr(*n, CONTROL_SURFACE_ATTR) == Some(role))
    }

    /// Rebuilds the arena with only the nodes reachable from the document node,
    /// in document order.
    ///
    /// Every [`NodeId`] taken before the call is invalidated; callers must drop
    /// their handles first and look nodes up again afterwards.
    ///
    /// # Returns
    ///
    /// The number of orphaned slots reclaimed.
    pub fn compact(&mut self) -> usize {
        let before = self.nodes.len();
        let order = self.subtree(self.root);
        if order.len() == before {
            return 0;
        }

        let mut remap: Vec<Option<NodeId>> = vec![None; before];
        for (new_index, old) in order.iter().enumerate() {
            remap[old.0] = Some(NodeId(new_index));
        }
        let lookup = |id: NodeId| remap[id.0];

        let mut nodes = Vec::with_capacity(order.len());
        for old in &order {
            let node = &self.nodes[old.0];
            nodes.push(Node {
                parent: node.parent.and_then(lookup),
                children: node.children.iter().filter_map(|c| lookup(*c)).collect(),
                data: node.data.clone(),
            });
        }
        self.nodes = nodes;
        self.root = NodeId(0);

        let reclaimed = before - self.nodes.len();
        tracing::debug!("[Document] Compacted arena, reclaimed {} slots", reclaimed);
        reclaimed
    }

    // ============================================================================
    // Cross-document copies
    // ============================================================================

    /// Deep-copies `source_id` from `source` into this arena. The copy is detached.
    pub fn import_subtree(&mut self, source: &Document, source_id: NodeId) -> NodeId {
        let top = self.push(source.node(source_id).data.clone());
        let mut stack: Vec<(NodeId, NodeId)> = vec![(source_id, top)];
        while let Some((from, to)) = stack.pop() {
            for child in source.children(from) {
                let copy = self.push(source.node(*child).data.clone());
                self.append_child(to, copy);
                stack.push((*child, copy));
            }
        }
        top
    }

    /// Copies the subtree at `id` into a fresh standalone document.
    ///
    /// The copy becomes the only child of the new document node.
    pub fn clone_subtree(&self, id: NodeId) -> Document {
        let mut fragment = Document::new();
        let copy = fragment.import_subtree(self, id);
        let root = fragment.root;
        fragment.append_child(root, copy);
        fragment
    }

    // ============================================================================
    // Host state
    // ============================================================================

    pub fn cursor(&self) -> Option<Cursor> {
        self.cursor
    }

    pub fn set_cursor(&mut self, cursor: Option<Cursor>) {
        self.cursor = cursor;
    }

    /// Takes the document-wide hover/click capture for `owner`.
    ///
    /// Re-acquiring by the current owner is a no-op; a competing owner is rejected.
    pub fn capture_pointer(&mut self, owner: &str) -> Result<()> {
        match &self.pointer_capture {
            Some(current) if current != owner => Err(RestyleError::invalid_state(
                format!("pointer captured by {}", current),
                format!("capture pointer for {}", owner),
            )),
            _ => {
                self.pointer_capture = Some(owner.to_string());
                Ok(())
            }
        }
    }

    pub fn release_pointer(&mut self, owner: &str) {
        if self.pointer_capture.as_deref() == Some(owner) {
            self.pointer_capture = None;
        }
    }

    pub fn pointer_owner(&self) -> Option<&str> {
        self.pointer_capture.as_deref()
    }

    /// Makes the body of a linked stylesheet readable to the engine.
    pub fn register_stylesheet(&mut self, href: impl Into<String>, css: impl Into<String>) {
        self.loaded_stylesheets.insert(href.into(), css.into());
    }

    pub fn loaded_stylesheet(&self, href: &str) -> Option<&str> {
        self.loaded_stylesheets.get(href).map(String::as_str)
    }
}
