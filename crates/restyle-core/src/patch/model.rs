//! Patch model and the generative-service response contract.

use crate::error::{RestyleError, Result};
use serde::{Deserialize, Serialize};

/// A proposed change to the target.
///
/// `content_text` may be empty for a style-only change; both may be empty for
/// a chat answer that carries only a rationale.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patch {
    pub style_text: String,
    pub content_text: String,
    pub rationale: String,
}

impl Patch {
    pub fn has_changes(&self) -> bool {
        !self.style_text.trim().is_empty() || !self.content_text.trim().is_empty()
    }
}

/// Wire shape returned by the generative service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PatchResponse {
    pub style_changes: String,
    pub content_changes: String,
    pub rationale: String,
}

impl From<PatchResponse> for Patch {
    fn from(response: PatchResponse) -> Self {
        Patch {
            style_text: response.style_changes,
            content_text: response.content_changes,
            rationale: response.rationale,
        }
    }
}

impl PatchResponse {
    /// Validates a decoded JSON value against the response contract.
    ///
    /// # Errors
    ///
    /// Returns `RestyleError::PatchValidation` when a field is missing, is not
    /// a string, or an unexpected field is present.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        if !value.is_object() {
            return Err(RestyleError::patch_validation(
                "response is not a JSON object",
            ));
        }
        serde_json::from_value(value)
            .map_err(|e| RestyleError::patch_validation(format!("unexpected response shape: {}", e)))
    }

    /// Parses and validates response text.
    pub fn parse(text: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| RestyleError::patch_validation(format!("response is not JSON: {}", e)))?;
        Self::from_value(value)
    }
}
