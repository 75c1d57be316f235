//! Generative service client.
//!
//! # Module Structure
//!
//! - `http_patch_service`: [`GenerativeService`] over the messages HTTP API
//! - `prompt`: system and user prompt templates
//! - `response`: extraction and validation of the patch JSON
//!
//! [`GenerativeService`]: restyle_core::generative::GenerativeService

pub mod http_patch_service;
pub mod prompt;
pub mod response;

pub use http_patch_service::HttpPatchService;
pub use prompt::PromptRenderer;
pub use response::extract_patch_response;
