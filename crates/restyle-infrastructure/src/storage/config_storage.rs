//! Engine configuration file storage.
//!
//! Loads and saves [`EngineConfig`] as TOML. A missing or blank file yields the
//! defaults; missing keys inside a file fall back field by field.

use restyle_core::config::EngineConfig;
use std::fs::{self, File};
use std::io::Write as IoWrite;
use std::path::{Path, PathBuf};

/// Errors that can occur during config storage operations.
#[derive(Debug)]
pub enum ConfigStorageError {
    /// File I/O error.
    IoError(std::io::Error),
    /// TOML parsing error.
    TomlParseError(toml::de::Error),
    /// TOML serialization error.
    TomlSerError(toml::ser::Error),
}

impl std::fmt::Display for ConfigStorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigStorageError::IoError(e) => write!(f, "I/O error: {}", e),
            ConfigStorageError::TomlParseError(e) => write!(f, "TOML parse error: {}", e),
            ConfigStorageError::TomlSerError(e) => write!(f, "TOML serialization error: {}", e),
        }
    }
}

impl std::error::Error for ConfigStorageError {}

impl From<std::io::Error> for ConfigStorageError {
    fn from(e: std::io::Error) -> Self {
        ConfigStorageError::IoError(e)
    }
}

impl From<toml::de::Error> for ConfigStorageError {
    fn from(e: toml::de::Error) -> Self {
        ConfigStorageError::TomlParseError(e)
    }
}

impl From<toml::ser::Error> for ConfigStorageError {
    fn from(e: toml::ser::Error) -> Self {
        ConfigStorageError::TomlSerError(e)
    }
}

impl From<ConfigStorageError> for restyle_core::RestyleError {
    fn from(e: ConfigStorageError) -> Self {
        restyle_core::RestyleError::config(e.to_string())
    }
}

/// Reads and writes `config.toml`.
///
/// Writes use a temp file + rename so a crash never leaves a half-written
/// config behind.
pub struct ConfigStorage {
    path: PathBuf,
}

impl ConfigStorage {
    /// # Arguments
    ///
    /// * `path` - The path to the TOML file
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the configuration.
    ///
    /// # Returns
    ///
    /// - `Ok(EngineConfig)`: Parsed file, or defaults when the file is missing
    /// - `Err`: The file exists but cannot be read or parsed
    pub fn load(&self) -> Result<EngineConfig, ConfigStorageError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("[ConfigStorage] {} not found, using defaults", self.path.display());
                return Ok(EngineConfig::default());
            }
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(EngineConfig::default());
        }
        let config = toml::from_str(&content)?;
        tracing::info!("[ConfigStorage] Loaded {}", self.path.display());
        Ok(config)
    }

    /// Saves the configuration atomically.
    pub fn save(&self, config: &EngineConfig) -> Result<(), ConfigStorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let toml_string = toml::to_string_pretty(config)?;

        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "config.toml".to_string());
        let tmp_path = self.path.with_file_name(format!(".{}.tmp", file_name));

        let mut tmp_file = File::create(&tmp_path)?;
        tmp_file.write_all(toml_string.as_bytes())?;
        tmp_file.sync_all()?;
        drop(tmp_file);
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}
