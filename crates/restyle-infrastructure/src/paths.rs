//! Unified path management for restyle files.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/restyle/
//! ├── config.toml        # Engine configuration
//! ├── credential.json    # Generative-service credential
//! └── store.json         # Key-value store (sites, chat history)
//! ```

use std::path::PathBuf;

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// The platform config directory could not be determined.
    ConfigDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::ConfigDirNotFound => write!(f, "Cannot find config directory"),
        }
    }
}

impl std::error::Error for PathError {}

impl From<PathError> for restyle_core::RestyleError {
    fn from(e: PathError) -> Self {
        restyle_core::RestyleError::config(e.to_string())
    }
}

/// Resolves restyle paths below the platform config directory.
pub struct RestylePaths;

impl RestylePaths {
    const APP_DIR: &'static str = "restyle";

    /// Returns `~/.config/restyle/` (or the platform equivalent).
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join(Self::APP_DIR))
            .ok_or(PathError::ConfigDirNotFound)
    }

    /// Returns the path to `config.toml`.
    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Returns the path to the credential file.
    ///
    /// # Security Note
    ///
    /// The file is written with mode 600 on Unix.
    pub fn credential_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("credential.json"))
    }

    /// Returns the path to the key-value store file.
    pub fn store_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("store.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_files_live_in_config_dir() {
        // Headless CI machines may not have a config dir.
        let Ok(dir) = RestylePaths::config_dir() else {
            return;
        };
        assert!(dir.ends_with("restyle"));
        assert_eq!(RestylePaths::config_file().unwrap(), dir.join("config.toml"));
        assert_eq!(RestylePaths::store_file().unwrap(), dir.join("store.json"));
        assert_eq!(
            RestylePaths::credential_file().unwrap(),
            dir.join("credential.json")
        );
    }
}
