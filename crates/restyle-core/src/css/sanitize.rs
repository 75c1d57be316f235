//! Style allow-list and value sanitizer.
//!
//! Patches may only touch visual properties, and values must not carry script
//! or remote-resource loading vectors.

use super::declaration::Declaration;
use crate::error::{RestyleError, Result};

/// Visual properties reported in context snapshots.
pub const SNAPSHOT_PROPERTIES: &[&str] = &[
    "display",
    "position",
    "top",
    "right",
    "bottom",
    "left",
    "width",
    "height",
    "margin",
    "padding",
    "border",
    "border-radius",
    "box-shadow",
    "color",
    "background-color",
    "background-image",
    "opacity",
    "font-family",
    "font-size",
    "font-weight",
    "font-style",
    "line-height",
    "letter-spacing",
    "text-align",
    "text-decoration",
    "text-transform",
    "flex-direction",
    "justify-content",
    "align-items",
    "gap",
    "grid-template-columns",
];

/// Additional properties a patch may set.
const PATCH_EXTRA_PROPERTIES: &[&str] = &[
    "z-index",
    "min-width",
    "max-width",
    "min-height",
    "max-height",
    "background",
    "background-size",
    "background-position",
    "background-repeat",
    "outline",
    "outline-offset",
    "overflow",
    "overflow-x",
    "overflow-y",
    "visibility",
    "white-space",
    "word-spacing",
    "word-break",
    "text-shadow",
    "text-indent",
    "vertical-align",
    "list-style",
    "list-style-type",
    "cursor",
    "transform",
    "transition",
    "filter",
    "flex",
    "flex-wrap",
    "flex-grow",
    "flex-shrink",
    "flex-basis",
    "align-self",
    "align-content",
    "justify-items",
    "order",
    "row-gap",
    "column-gap",
    "grid-template-rows",
    "grid-column",
    "grid-row",
    "aspect-ratio",
    "object-fit",
    "box-sizing",
];

/// Property families allowed through their longhands (`margin-top`, ...).
const PATCH_PROPERTY_FAMILIES: &[&str] = &["margin-", "padding-", "border-", "font-", "text-decoration-"];

/// Substrings that are never allowed in a value, matched case-insensitively.
const FORBIDDEN_VALUE_FRAGMENTS: &[&str] = &[
    "expression(",
    "javascript:",
    "vbscript:",
    "@import",
    "behavior",
    "-moz-binding",
    "/*",
];

/// True when a patch may set `property`.
pub fn is_allowed_property(property: &str) -> bool {
    let property = property.to_ascii_lowercase();
    SNAPSHOT_PROPERTIES.contains(&property.as_str())
        || PATCH_EXTRA_PROPERTIES.contains(&property.as_str())
        || PATCH_PROPERTY_FAMILIES
            .iter()
            .any(|family| property.starts_with(family) && property.len() > family.len())
}

/// Checks a value for script-bearing or remote-loading content.
///
/// # Errors
///
/// Returns `RestyleError::PatchValidation` naming the first violation.
pub fn check_value(value: &str) -> Result<()> {
    let lower = value.to_ascii_lowercase();
    if lower.chars().any(|c| c.is_control()) {
        return Err(RestyleError::patch_validation("control character in value"));
    }
    if lower.contains('\\') {
        return Err(RestyleError::patch_validation("escape sequence in value"));
    }
    if lower.contains('<') || lower.contains('>') {
        return Err(RestyleError::patch_validation("markup in value"));
    }
    if let Some(fragment) = FORBIDDEN_VALUE_FRAGMENTS.iter().find(|f| lower.contains(*f)) {
        return Err(RestyleError::patch_validation(format!(
            "forbidden fragment '{}' in value",
            fragment
        )));
    }
    for target in url_arguments(&lower) {
        check_url(&target)?;
    }
    Ok(())
}

/// Validates a declaration against the allow-list and the value sanitizer.
pub fn check_declaration(decl: &Declaration) -> Result<()> {
    if !is_allowed_property(&decl.property) {
        return Err(RestyleError::patch_validation(format!(
            "property '{}' is not allowed",
            decl.property
        )));
    }
    check_value(&decl.value)
}

/// Arguments of every `url(...)` / `image-set(...)`-style string in `value`.
fn url_arguments(value: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut rest = value;
    while let Some(start) = rest.find("url(") {
        let after = &rest[start + 4..];
        let end = after.find(')').unwrap_or(after.len());
        out.push(
            after[..end]
                .trim()
                .trim_matches(|c| c == '"' || c == '\'')
                .trim()
                .to_string(),
        );
        rest = &after[end..];
    }
    out
}

fn check_url(target: &str) -> Result<()> {
    if let Some(data) = target.strip_prefix("data:") {
        let allowed = data.starts_with("image/") && !data.starts_with("image/svg");
        return if allowed {
            Ok(())
        } else {
            Err(RestyleError::patch_validation("non-image data url"))
        };
    }
    let scheme = target
        .split_once(':')
        .map(|(scheme, _)| scheme)
        .filter(|scheme| !scheme.contains('/'));
    match scheme {
        None | Some("http") | Some("https") => Ok(()),
        Some(other) => Err(RestyleError::patch_validation(format!(
            "url scheme '{}' is not allowed",
            other
        ))),
    }
}
