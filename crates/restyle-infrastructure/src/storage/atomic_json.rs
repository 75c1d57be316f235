//! Atomic JSON file handle.
//!
//! Writes go to a hidden sibling temp file that is fsynced and renamed over the
//! target. Read-modify-write cycles hold an exclusive `fs2` lock on a sibling
//! `.lock` file so concurrent processes never interleave updates.

use serde::{Serialize, de::DeserializeOwned};
use std::fs::{self, File, OpenOptions};
use std::io::Write as IoWrite;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// Errors that can occur during atomic JSON operations.
#[derive(Debug)]
pub enum AtomicJsonError {
    /// File I/O error.
    IoError(std::io::Error),
    /// JSON serialization/deserialization error.
    JsonError(serde_json::Error),
    /// File locking error.
    LockError(String),
}

impl std::fmt::Display for AtomicJsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AtomicJsonError::IoError(e) => write!(f, "I/O error: {}", e),
            AtomicJsonError::JsonError(e) => write!(f, "JSON error: {}", e),
            AtomicJsonError::LockError(e) => write!(f, "Lock error: {}", e),
        }
    }
}

impl std::error::Error for AtomicJsonError {}

impl From<std::io::Error> for AtomicJsonError {
    fn from(e: std::io::Error) -> Self {
        AtomicJsonError::IoError(e)
    }
}

impl From<serde_json::Error> for AtomicJsonError {
    fn from(e: serde_json::Error) -> Self {
        AtomicJsonError::JsonError(e)
    }
}

impl From<AtomicJsonError> for restyle_core::RestyleError {
    fn from(e: AtomicJsonError) -> Self {
        restyle_core::RestyleError::storage(e.to_string())
    }
}

/// A JSON file read and written whole, atomically.
#[derive(Debug)]
pub struct AtomicJsonFile<T> {
    path: PathBuf,
    private: bool,
    _phantom: PhantomData<fn() -> T>,
}

// Cloning copies the handle only, so `T` needs no `Clone` bound.
impl<T> Clone for AtomicJsonFile<T> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            private: self.private,
            _phantom: PhantomData,
        }
    }
}

impl<T> AtomicJsonFile<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Creates a handle for `path`. Nothing is touched on disk.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            private: false,
            _phantom: PhantomData,
        }
    }

    /// Restricts written files to the owner (mode 600 on Unix).
    pub fn private(mut self) -> Self {
        self.private = true;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads and decodes the file.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(T))`: File decoded
    /// - `Ok(None)`: File missing or blank
    /// - `Err`: File unreadable or not valid JSON for `T`
    pub fn load(&self) -> Result<Option<T>, AtomicJsonError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Serializes `data` and replaces the file atomically.
    pub fn save(&self, data: &T) -> Result<(), AtomicJsonError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(data)?;

        let tmp_path = self.temp_path()?;
        let mut tmp_file = File::create(&tmp_path)?;
        self.restrict(&tmp_file)?;
        tmp_file.write_all(json.as_bytes())?;
        tmp_file.sync_all()?;
        drop(tmp_file);

        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    /// Runs a locked read-modify-write cycle.
    ///
    /// `f` receives the current contents (or `default_value` when the file is
    /// missing). The file is rewritten only when `f` returns `Ok`.
    ///
    /// # Returns
    ///
    /// Whatever `f` returned.
    pub fn update<R, F>(&self, default_value: T, f: F) -> Result<R, AtomicJsonError>
    where
        F: FnOnce(&mut T) -> Result<R, AtomicJsonError>,
    {
        let _lock = FileLock::acquire(&self.path)?;
        let mut data = self.load()?.unwrap_or(default_value);
        let result = f(&mut data)?;
        self.save(&data)?;
        Ok(result)
    }

    /// Deletes the file. A missing file is not an error.
    pub fn remove(&self) -> Result<(), AtomicJsonError> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    fn temp_path(&self) -> Result<PathBuf, AtomicJsonError> {
        let invalid = |what: &str| {
            AtomicJsonError::IoError(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("Path has no {}", what),
            ))
        };
        let parent = self.path.parent().ok_or_else(|| invalid("parent directory"))?;
        let file_name = self.path.file_name().ok_or_else(|| invalid("file name"))?;
        Ok(parent.join(format!(".{}.tmp", file_name.to_string_lossy())))
    }

    #[cfg(unix)]
    fn restrict(&self, file: &File) -> Result<(), AtomicJsonError> {
        use std::os::unix::fs::PermissionsExt;
        if self.private {
            file.set_permissions(fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn restrict(&self, _file: &File) -> Result<(), AtomicJsonError> {
        Ok(())
    }
}

/// Exclusive advisory lock, released on drop.
///
/// The `.lock` file is left in place. Deleting it would let a waiter holding
/// the old inode and a newcomer creating a new one both acquire "the" lock.
struct FileLock {
    file: File,
}

impl FileLock {
    fn acquire(path: &Path) -> Result<Self, AtomicJsonError> {
        use fs2::FileExt;

        let lock_path = path.with_extension("lock");
        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;
        file.lock_exclusive()
            .map_err(|e| AtomicJsonError::LockError(format!("{}: {}", lock_path.display(), e)))?;
        Ok(FileLock { file })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Counter {
        hits: u32,
        tags: BTreeMap<String, String>,
    }

    #[test]
    fn test_missing_and_blank_files_load_as_none() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("counter.json");
        let file = AtomicJsonFile::<Counter>::new(path.clone());
        assert!(file.load().unwrap().is_none());

        fs::write(&path, "  \n").unwrap();
        assert!(file.load().unwrap().is_none());

        fs::write(&path, "{not json").unwrap();
        assert!(matches!(file.load(), Err(AtomicJsonError::JsonError(_))));
    }

    #[test]
    fn test_update_returns_closure_result() {
        let temp_dir = TempDir::new().unwrap();
        let file = AtomicJsonFile::<Counter>::new(temp_dir.path().join("nested/counter.json"));

        for expected in 1..=3 {
            let hits = file
                .update(Counter::default(), |c| {
                    c.hits += 1;
                    Ok(c.hits)
                })
                .unwrap();
            assert_eq!(hits, expected);
        }
        assert_eq!(file.load().unwrap().unwrap().hits, 3);
        assert!(!temp_dir.path().join("nested/.counter.json.tmp").exists());
        // The lock file outlives the guard and is reused by the next update.
        assert!(temp_dir.path().join("nested/counter.lock").exists());
    }

    #[test]
    fn test_concurrent_updates_never_lose_increments() {
        let temp_dir = TempDir::new().unwrap();
        let file = AtomicJsonFile::<Counter>::new(temp_dir.path().join("counter.json"));

        let workers: Vec<_> = (0..8)
            .map(|_| {
                let file = file.clone();
                std::thread::spawn(move || {
                    for _ in 0..10 {
                        file.update(Counter::default(), |c| {
                            c.hits += 1;
                            Ok(())
                        })
                        .unwrap();
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }
        assert_eq!(file.load().unwrap().unwrap().hits, 80);
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct NotClone {
        value: String,
    }

    #[test]
    fn test_handle_clones_without_clonable_contents() {
        let temp_dir = TempDir::new().unwrap();
        let file = AtomicJsonFile::<NotClone>::new(temp_dir.path().join("value.json")).private();
        let copy = file.clone();
        copy.save(&NotClone { value: "kept".into() }).unwrap();
        assert_eq!(file.load().unwrap().unwrap().value, "kept");
        assert_eq!(copy.path(), file.path());
    }

    #[test]
    fn test_failed_update_leaves_file_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let file = AtomicJsonFile::<Counter>::new(temp_dir.path().join("counter.json"));
        file.save(&Counter { hits: 7, ..Default::default() }).unwrap();

        let result: Result<(), _> = file.update(Counter::default(), |c| {
            c.hits = 0;
            Err(AtomicJsonError::LockError("abort".into()))
        });
        assert!(result.is_err());
        assert_eq!(file.load().unwrap().unwrap().hits, 7);
    }

    #[cfg(unix)]
    #[test]
    fn test_private_files_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("secret.json");
        let file = AtomicJsonFile::<Counter>::new(path.clone()).private();
        file.save(&Counter::default()).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);

        file.remove().unwrap();
        file.remove().unwrap();
        assert!(!path.exists());
    }
}
