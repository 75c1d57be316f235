//! Error types for the Restyle engine.

use serde::Serialize;
use thiserror::Error;

/// A shared error type for the entire Restyle engine.
///
/// The first group of variants is the operator-facing taxonomy; the rest are
/// plumbing errors raised by the session and storage layers.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
pub enum RestyleError {
    /// The operator tried to target a protected node.
    #[error("Unsafe target: {reason}")]
    UnsafeTarget { reason: String },

    /// An address no longer resolves to exactly one node.
    #[error("Address '{address}' resolved to {matches} nodes")]
    AddressResolution { address: String, matches: usize },

    /// Malformed patch or generative-service response.
    #[error("Patch validation error: {0}")]
    PatchValidation(String),

    /// The external call did not complete within its budget.
    #[error("Transport timed out after {elapsed_ms} ms")]
    TransportTimeout { elapsed_ms: u64 },

    /// The external call failed.
    #[error("Transport failure: {0}")]
    Transport(String),

    /// Persistent store read/write failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// No credential configured for the generative service.
    #[error("No credential configured")]
    CredentialMissing,

    /// Attempted write to the per-origin baseline.
    #[error("The baseline snapshot cannot be modified")]
    BaselineImmutable,

    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// Operation not allowed in the current session state.
    #[error("Operation '{operation}' is not allowed while {state}")]
    InvalidState { state: String, operation: String },

    /// A generative request is already outstanding.
    #[error("A request is already in flight")]
    RequestInFlight,

    /// A project switch or discard is rewriting the document.
    #[error("A project switch is in progress")]
    SwitchInProgress,

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RestyleError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates an UnsafeTarget error
    pub fn unsafe_target(reason: impl Into<String>) -> Self {
        Self::UnsafeTarget {
            reason: reason.into(),
        }
    }

    /// Creates a NotFound error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates a PatchValidation error
    pub fn patch_validation(message: impl Into<String>) -> Self {
        Self::PatchValidation(message.into())
    }

    /// Creates a Storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Creates a Transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an InvalidState error
    pub fn invalid_state(state: impl ToString, operation: impl Into<String>) -> Self {
        Self::InvalidState {
            state: state.to_string(),
            operation: operation.into(),
        }
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a storage error
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    /// Check if the external call failed or timed out.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::TransportTimeout { .. })
    }

    /// Errors that are reported to the operator as a dismissible notice.
    ///
    /// Everything else is returned to the caller as a plain rejection.
    pub fn is_operator_notice(&self) -> bool {
        matches!(
            self,
            Self::CredentialMissing
                | Self::Transport(_)
                | Self::TransportTimeout { .. }
                | Self::PatchValidation(_)
        )
    }

    /// Stable machine-readable code used in shell responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnsafeTarget { .. } => "unsafe_target",
            Self::AddressResolution { .. } => "address_resolution",
            Self::PatchValidation(_) => "patch_validation",
            Self::TransportTimeout { .. } => "transport_timeout",
            Self::Transport(_) => "transport",
            Self::Storage(_) => "storage",
            Self::CredentialMissing => "credential_missing",
            Self::BaselineImmutable => "baseline_immutable",
            Self::NotFound { .. } => "not_found",
            Self::InvalidState { .. } => "invalid_state",
            Self::RequestInFlight => "request_in_flight",
            Self::SwitchInProgress => "switch_in_progress",
            Self::Serialization { .. } => "serialization",
            Self::Config(_) => "config",
            Self::Internal(_) => "internal",
        }
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for RestyleError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(format!("{} (kind: {:?})", err, err.kind()))
    }
}

impl From<serde_json::Error> for RestyleError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for RestyleError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for RestyleError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// Conversion from anyhow::Error (used at the infrastructure boundary)
impl From<anyhow::Error> for RestyleError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A type alias for `Result<T, RestyleError>`.
pub type Result<T> = std::result::Result<T, RestyleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_notice_classification() {
        assert!(RestyleError::CredentialMissing.is_operator_notice());
        assert!(RestyleError::transport("connection reset").is_operator_notice());
        assert!(RestyleError::TransportTimeout { elapsed_ms: 5000 }.is_operator_notice());
        assert!(RestyleError::patch_validation("missing rationale").is_operator_notice());
        assert!(!RestyleError::RequestInFlight.is_operator_notice());
        assert!(!RestyleError::BaselineImmutable.is_operator_notice());
    }

    #[test]
    fn test_io_error_maps_to_storage() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: RestyleError = io.into();
        assert!(err.is_storage());
    }

    #[test]
    fn test_display_messages() {
        let err = RestyleError::AddressResolution {
            address: "#title".to_string(),
            matches: 2,
        };
        assert_eq!(err.to_string(), "Address '#title' resolved to 2 nodes");
        assert_eq!(
            RestyleError::not_found("project", "p-1").to_string(),
            "Entity not found: project 'p-1'"
        );
    }
}
