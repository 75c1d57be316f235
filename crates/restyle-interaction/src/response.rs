//! Patch extraction from model output.
//!
//! Models sometimes wrap the JSON object in a Markdown code fence or add a
//! sentence around it. The outermost `{ ... }` span is taken and validated
//! against the strict response shape.

use once_cell::sync::Lazy;
use regex::Regex;
use restyle_core::patch::PatchResponse;
use restyle_core::{RestyleError, Result};

static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:json|JSON)?\s*\n(.*?)\n\s*```").expect("valid regex"));

/// Extracts and validates the patch object in `text`.
///
/// # Errors
///
/// Returns `RestyleError::PatchValidation` when no JSON object is found or the
/// object does not match the response contract.
pub fn extract_patch_response(text: &str) -> Result<PatchResponse> {
    let body = CODE_FENCE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(text);

    let start = body.find('{');
    let end = body.rfind('}');
    let json = match (start, end) {
        (Some(start), Some(end)) if start < end => &body[start..=end],
        _ => {
            return Err(RestyleError::patch_validation(
                "response contains no JSON object",
            ));
        }
    };
    PatchResponse::parse(json)
}
