//! Origin normalization.
//!
//! Every per-site storage key is derived from an [`OriginKey`]. The rules:
//! keep scheme, host, explicit non-default port and path; drop userinfo,
//! query and fragment; strip trailing slashes (the bare root path becomes
//! empty).

use crate::error::{RestyleError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Normalized `scheme://host[:port]/path` identifying a site.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OriginKey(String);

impl OriginKey {
    /// Normalizes a navigated URL into an origin key.
    ///
    /// # Errors
    ///
    /// Returns `RestyleError::Storage` when the URL cannot be parsed or has no
    /// host (for example `about:blank` or `data:` URLs).
    pub fn parse(raw: &str) -> Result<Self> {
        let url = Url::parse(raw.trim())
            .map_err(|e| RestyleError::storage(format!("invalid origin url '{}': {}", raw, e)))?;
        let host = url
            .host_str()
            .ok_or_else(|| RestyleError::storage(format!("url '{}' has no host", raw)))?;

        let mut key = format!("{}://{}", url.scheme(), host.to_ascii_lowercase());
        if let Some(port) = url.port() {
            key.push_str(&format!(":{}", port));
        }
        key.push_str(url.path().trim_end_matches('/'));
        Ok(Self(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Storage key for the origin's baseline/project record.
    pub fn site_key(&self) -> String {
        format!("site:{}", self.0)
    }

    /// Storage key for the origin's chat history.
    pub fn history_key(&self) -> String {
        format!("chat:{}", self.0)
    }
}

impl fmt::Display for OriginKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for OriginKey {
    type Err = RestyleError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_query_fragment_and_trailing_slash() {
        let key = OriginKey::parse("https://Example.com/blog/post/?page=2#comments").unwrap();
        assert_eq!(key.as_str(), "https://example.com/blog/post");
    }

    #[test]
    fn test_root_path_and_ports() {
        assert_eq!(
            OriginKey::parse("https://example.com/").unwrap().as_str(),
            "https://example.com"
        );
        assert_eq!(
            OriginKey::parse("https://example.com:443/a").unwrap().as_str(),
            "https://example.com/a"
        );
        assert_eq!(
            OriginKey::parse("http://localhost:8080/a//").unwrap().as_str(),
            "http://localhost:8080/a"
        );
    }

    #[test]
    fn test_same_page_variants_share_a_key() {
        let a = OriginKey::parse("https://example.com/docs").unwrap();
        let b = OriginKey::parse("https://user:pw@example.com/docs/#top").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.history_key(), "chat:https://example.com/docs");
    }

    #[test]
    fn test_rejects_hostless_urls() {
        let err = OriginKey::parse("about:blank").unwrap_err();
        assert!(err.is_storage());
        assert!(OriginKey::parse("not a url").is_err());
    }
}
