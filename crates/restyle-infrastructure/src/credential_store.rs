//! Credential storage.
//!
//! The credential lives in `~/.config/restyle/credential.json`, written with
//! owner-only permissions. It is never logged.

use crate::paths::RestylePaths;
use crate::storage::AtomicJsonFile;
use async_trait::async_trait;
use restyle_core::secret::{Credential, CredentialStore};
use restyle_core::{RestyleError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tokio::task;

#[derive(Debug, Default, Serialize, Deserialize)]
struct CredentialFile {
    #[serde(default)]
    credential: Option<String>,
}

/// File-backed [`CredentialStore`].
///
/// # Security Note
///
/// The file is plaintext JSON protected only by file permissions (600 on Unix).
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    file: AtomicJsonFile<CredentialFile>,
}

impl FileCredentialStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            file: AtomicJsonFile::new(path).private(),
        }
    }

    /// Uses `~/.config/restyle/credential.json`.
    pub fn default_location() -> Result<Self> {
        Ok(Self::new(RestylePaths::credential_file()?))
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

fn join_error(e: task::JoinError) -> RestyleError {
    RestyleError::internal(format!("Failed to spawn blocking task: {}", e))
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self) -> Result<Option<Credential>> {
        let file = self.file.clone();
        let stored = task::spawn_blocking(move || file.load())
            .await
            .map_err(join_error)??;

        match stored.and_then(|f| f.credential) {
            Some(raw) => match Credential::parse(&raw) {
                Ok(credential) => Ok(Some(credential)),
                Err(_) => {
                    tracing::warn!("[CredentialStore] Stored credential has an invalid format, ignoring it");
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    async fn save(&self, credential: &Credential) -> Result<()> {
        let file = self.file.clone();
        let contents = CredentialFile {
            credential: Some(credential.expose().to_string()),
        };
        task::spawn_blocking(move || file.save(&contents))
            .await
            .map_err(join_error)??;
        tracing::info!("[CredentialStore] Credential saved to {}", self.path().display());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let file = self.file.clone();
        task::spawn_blocking(move || file.remove())
            .await
            .map_err(join_error)??;
        tracing::info!("[CredentialStore] Credential cleared");
        Ok(())
    }
}

/// In-memory [`CredentialStore`].
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    credential: RwLock<Option<Credential>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds `credential`.
    pub fn with_credential(credential: Credential) -> Self {
        Self {
            credential: RwLock::new(Some(credential)),
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn load(&self) -> Result<Option<Credential>> {
        Ok(self.credential.read().await.clone())
    }

    async fn save(&self, credential: &Credential) -> Result<()> {
        *self.credential.write().await = Some(credential.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.credential.write().await = None;
        Ok(())
    }
}
