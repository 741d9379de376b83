//! JSON persistence in the `.storage/` directory
//!
//! Each key is one file holding a version envelope:
//!
//! ```json
//! {
//!   "version": 1,
//!   "minor_version": 1,
//!   "key": "core.config_entries",
//!   "data": { ... }
//! }
//! ```

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::debug;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{key} was written by a newer version ({found} > {supported})")]
    UnsupportedVersion {
        key: String,
        found: u32,
        supported: u32,
    },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Types persisted under a fixed storage key
pub trait Storable: Serialize + DeserializeOwned {
    /// File name under `.storage/`
    const KEY: &'static str;
    /// Major version written by this build
    const VERSION: u32;
    /// Minor version written by this build
    const MINOR_VERSION: u32;
}

/// Version envelope around stored data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageFile<T> {
    pub version: u32,
    pub minor_version: u32,
    pub key: String,
    pub data: T,
}

/// Handle on a config directory's `.storage/` folder
#[derive(Debug, Clone)]
pub struct Storage {
    storage_dir: PathBuf,
}

impl Storage {
    /// Create a storage handle for a config directory
    pub fn new(config_dir: impl AsRef<Path>) -> Self {
        Self {
            storage_dir: config_dir.as_ref().join(".storage"),
        }
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    /// Path of the file backing `key`
    pub fn file_path(&self, key: &str) -> PathBuf {
        self.storage_dir.join(key)
    }

    /// Load `T` from its key
    ///
    /// Returns `None` when nothing was saved yet. Files from a newer major
    /// version are refused rather than misread.
    pub async fn load<T: Storable>(&self) -> StorageResult<Option<StorageFile<T>>> {
        let path = self.file_path(T::KEY);

        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Storage file not found: {}", T::KEY);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let file: StorageFile<T> = serde_json::from_str(&content)?;
        if file.version > T::VERSION {
            return Err(StorageError::UnsupportedVersion {
                key: T::KEY.to_string(),
                found: file.version,
                supported: T::VERSION,
            });
        }

        debug!(
            "Loaded storage file: {} (v{}.{})",
            T::KEY,
            file.version,
            file.minor_version
        );
        Ok(Some(file))
    }

    /// Save `data` under its key
    ///
    /// Writes to a temp file first, then renames over the target.
    pub async fn save<T: Storable>(&self, data: &T) -> StorageResult<()> {
        fs::create_dir_all(&self.storage_dir).await?;

        let file = StorageFile {
            version: T::VERSION,
            minor_version: T::MINOR_VERSION,
            key: T::KEY.to_string(),
            data,
        };
        let content = serde_json::to_string_pretty(&file)?;

        let path = self.file_path(T::KEY);
        let temp_path = self.file_path(&format!("{}.tmp", T::KEY));
        fs::write(&temp_path, &content).await?;
        fs::rename(&temp_path, &path).await?;

        debug!("Saved storage file: {}", T::KEY);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct Snapshot {
        name: String,
        count: u32,
    }

    impl Storable for Snapshot {
        const KEY: &'static str = "test.snapshot";
        const VERSION: u32 = 1;
        const MINOR_VERSION: u32 = 2;
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path());

        let data = Snapshot {
            name: "UCI Recife".to_string(),
            count: 9,
        };
        storage.save(&data).await.unwrap();
        assert!(storage.file_path("test.snapshot").exists());
        assert!(!storage.file_path("test.snapshot.tmp").exists());

        let file = storage.load::<Snapshot>().await.unwrap().unwrap();
        assert_eq!(file.data, data);
        assert_eq!(file.version, 1);
        assert_eq!(file.minor_version, 2);
    }

    #[tokio::test]
    async fn test_load_missing() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path());
        assert!(storage.load::<Snapshot>().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_newer_version_refused() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path());
        std::fs::create_dir_all(storage.storage_dir()).unwrap();
        std::fs::write(
            storage.file_path("test.snapshot"),
            r#"{"version": 2, "minor_version": 1, "key": "test.snapshot", "data": {"name": "x", "count": 1}}"#,
        )
        .unwrap();

        let err = storage.load::<Snapshot>().await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::UnsupportedVersion { found: 2, supported: 1, .. }
        ));
    }
}
