//! Snapshot/version store.
//!
//! # Module Structure
//!
//! - `model`: `Project`, `DocumentSnapshot`, `SiteRecord` and listing types
//! - `store`: the `VersionStore` manager and body restoration

mod model;
mod store;

pub use model::{BASELINE_ID, DocumentSnapshot, Project, ProjectSummary, SiteRecord, SnapshotRef};
pub use store::{VersionStore, restore_body};
