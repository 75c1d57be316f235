//! Generative service contract.

use crate::context::ContextSnapshot;
use crate::error::Result;
use crate::patch::PatchResponse;
use crate::secret::Credential;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Outbound request: the operator's instruction plus the target description.
///
/// `context` is `null` for chat-mode requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchRequest {
    pub instruction: String,
    pub context: Option<ContextSnapshot>,
}

/// The external service that proposes patches.
///
/// The session coordinator is the only caller.
#[async_trait]
pub trait GenerativeService: Send + Sync {
    /// Sends `request` and returns the validated response.
    ///
    /// # Errors
    ///
    /// - `RestyleError::Transport` / `TransportTimeout`: the call did not complete
    /// - `RestyleError::PatchValidation`: the response does not match the contract
    async fn request_patch(&self, credential: &Credential, request: &PatchRequest) -> Result<PatchResponse>;
}
