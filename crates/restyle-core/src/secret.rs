//! Generative-service credential.
//!
//! One credential is stored process-wide. It is validated by format only and
//! never appears in logs or error messages.

use crate::error::{RestyleError, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

static CREDENTIAL_FORMAT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._-]{16,256}$").expect("valid regex"));

/// An API credential that passed format validation.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Credential(String);

impl Credential {
    /// Validates `raw` (after trimming) against the credential format.
    ///
    /// # Errors
    ///
    /// Returns `RestyleError::Config` when the format does not match. The
    /// message never includes the rejected value.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if CREDENTIAL_FORMAT.is_match(trimmed) {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(RestyleError::config(format!(
                "credential must be 16-256 characters of letters, digits, '.', '_' or '-' (got {} characters)",
                trimmed.chars().count()
            )))
        }
    }

    /// The raw secret, for the transport layer only.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tail: String = self.0.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
        write!(f, "Credential(****{})", tail)
    }
}

impl TryFrom<String> for Credential {
    type Error = RestyleError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Credential> for String {
    fn from(credential: Credential) -> Self {
        credential.0
    }
}

/// Storage for the process-wide credential.
///
/// # Security Note
///
/// Implementations should restrict file permissions where applicable and must
/// not log the credential.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Loads the stored credential, if any.
    async fn load(&self) -> Result<Option<Credential>>;

    /// Stores `credential`, replacing any previous one.
    async fn save(&self, credential: &Credential) -> Result<()>;

    /// Removes the stored credential.
    async fn clear(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_validation() {
        assert!(Credential::parse("sk-ant-0123456789abcdef").is_ok());
        assert!(Credential::parse("  sk-ant-0123456789abcdef \n").is_ok());
        assert!(Credential::parse("short").is_err());
        assert!(Credential::parse("has spaces in the middle of it").is_err());
        assert!(Credential::parse(&"a".repeat(257)).is_err());
    }

    #[test]
    fn test_debug_and_errors_never_leak() {
        let credential = Credential::parse("sk-ant-0123456789abcdef").unwrap();
        assert_eq!(format!("{:?}", credential), "Credential(****cdef)");

        let err = Credential::parse("secret value!").unwrap_err();
        assert!(!err.to_string().contains("secret"));
    }

    #[test]
    fn test_serde_validates() {
        let json = serde_json::to_string(&Credential::parse("abcdefghijklmnop").unwrap()).unwrap();
        assert_eq!(json, "\"abcdefghijklmnop\"");
        assert!(serde_json::from_str::<Credential>("\"bad\"").is_err());
    }
}
