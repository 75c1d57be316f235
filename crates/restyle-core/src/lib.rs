//! Core domain of the Restyle in-page editing engine.
//!
//! The engine lets an operator pick a node in a live document, describe a
//! change, and apply the style/content patch a generative service proposes,
//! with per-site projects to save, discard and switch between.
//!
//! This crate holds the document model and every component that works on it
//! directly (target resolution, context snapshots, patch application, version
//! store, history), plus the traits the outer layers implement.

pub mod config;
pub mod context;
pub mod css;
pub mod dom;
pub mod error;
pub mod generative;
pub mod history;
pub mod origin;
pub mod patch;
pub mod project;
pub mod secret;
pub mod session;
pub mod storage;
pub mod target;

// Re-export common types
pub use error::{RestyleError, Result};
pub use origin::OriginKey;
