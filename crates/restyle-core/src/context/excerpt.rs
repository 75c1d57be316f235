//! Bounded markup excerpts.

use crate::dom::{Document, NodeId};

/// Replaces children pruned below the depth limit.
pub const DEPTH_PLACEHOLDER: &str = " … ";

/// Appended when the excerpt hits the character cap.
pub const TRUNCATION_MARKER: &str = "<!-- [truncated] -->";

/// Elements removed from excerpts together with their content.
const STRIPPED_TAGS: &[&str] = &["script", "noscript", "template"];

/// Serializes a copy of the subtree at `id`.
///
/// Script-bearing elements and control-surface elements are removed, elements
/// at `max_depth` below `id` lose their element children to a comment
/// placeholder, and output longer than `char_cap` characters is cut and marked.
pub fn markup_excerpt(doc: &Document, id: NodeId, max_depth: usize, char_cap: usize) -> String {
    let mut copy = doc.clone_subtree(id);
    let Some(top) = copy.children(copy.root()).first().copied() else {
        return String::new();
    };

    let root = copy.root();
    copy.strip_control_surface(root);
    let doomed: Vec<NodeId> = copy
        .descendant_elements(top)
        .into_iter()
        .filter(|n| copy.tag_name(*n).is_some_and(|t| STRIPPED_TAGS.contains(&t)))
        .collect();
    for node in doomed {
        copy.detach(node);
    }

    let mut stack = vec![(top, 0usize)];
    while let Some((node, depth)) = stack.pop() {
        let has_element_children = copy.element_children(node).next().is_some();
        if depth >= max_depth && has_element_children {
            copy.take_children(node);
            let placeholder = copy.create_comment(DEPTH_PLACEHOLDER);
            copy.append_child(node, placeholder);
            continue;
        }
        let children: Vec<NodeId> = copy.element_children(node).collect();
        stack.extend(children.into_iter().map(|c| (c, depth + 1)));
    }

    truncate_chars(copy.outer_html(top), char_cap)
}

fn truncate_chars(text: String, cap: usize) -> String {
    match text.char_indices().nth(cap) {
        Some((cut, _)) => {
            let mut out = text[..cut].to_string();
            out.push_str(TRUNCATION_MARKER);
            out
        }
        None => text,
    }
}
