//! Patches proposed by the generative service and their application.

pub mod applier;
pub mod model;
pub mod sanitize;

pub use applier::{PatchOutcome, apply_patch};
pub use model::{Patch, PatchResponse};
pub use sanitize::{SanitizeReport, is_safe_url, sanitize_fragment, sanitize_markup};
