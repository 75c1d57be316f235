//! Target selection.
//!
//! # Module Structure
//!
//! - `safety`: which nodes may be targeted
//! - `address`: stable selector generation and resolution
//! - `highlight`: overlay rendering and the `LayoutProbe` seam
//! - `resolver`: the selection-mode state machine

pub mod address;
pub mod highlight;
pub mod resolver;
pub mod safety;

pub use address::{count_matches, generate_address, resolve_address};
pub use highlight::{HighlightKind, LayoutProbe, NoLayout, Rect};
pub use resolver::TargetResolver;
pub use safety::{check_target, is_safe_target};

use crate::dom::NodeId;
use serde::{Deserialize, Serialize};

/// Handle to the single live node selected for editing, plus its address.
///
/// The handle is what edits are applied to; the address is informational and
/// may stop resolving once the document changes shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    node: NodeId,
    address: String,
    tag: String,
}

impl Target {
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Serializable reference recorded in history.
    pub fn to_ref(&self) -> TargetRef {
        TargetRef {
            address: self.address.clone(),
            tag: self.tag.clone(),
        }
    }
}

/// Persistable description of a target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetRef {
    pub address: String,
    pub tag: String,
}
