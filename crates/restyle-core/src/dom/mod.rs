//! Live document model.
//!
//! # Module Structure
//!
//! - `node`: node payloads and the `NodeId` handle
//! - `document`: the arena tree, control-surface helpers and host state
//! - `parse` / `serialize`: HTML in and out (html5ever for parsing)
//! - `selector`: selector parsing, matching and specificity

mod document;
mod node;
mod parse;
pub mod selector;
mod serialize;

pub use document::{CONTROL_SURFACE_ATTR, Cursor, Document};
pub use node::{Attribute, ElementData, Node, NodeData, NodeId};
pub use selector::{SelectorError, SelectorList, Specificity, escape_ident};
pub use serialize::{VOID_ELEMENTS, is_void};
