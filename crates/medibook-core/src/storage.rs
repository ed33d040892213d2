//! Durable key-value storage.
//!
//! Favorites and the auth session are stored as string values under string
//! keys. [`FileStore`] keeps one file per key in a data directory;
//! [`MemoryStore`] keeps everything in process memory.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::{MedibookError, Result};

/// Asynchronous string key-value store.
pub trait KeyValueStore: Send + Sync {
    /// Read a value; `Ok(None)` when the key is absent.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>>> + Send;

    /// Write a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> impl Future<Output = Result<()>> + Send;

    /// Delete a key. Deleting an absent key succeeds.
    fn remove(&self, key: &str) -> impl Future<Output = Result<()>> + Send;
}

impl<T: KeyValueStore> KeyValueStore for Arc<T> {
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>>> + Send {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> impl Future<Output = Result<()>> + Send {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> impl Future<Output = Result<()>> + Send {
        (**self).remove(key)
    }
}

/// Default data directory.
///
/// `~/.local/share/medibook` on Linux, the platform equivalent elsewhere,
/// `./medibook-data` when no home directory can be determined.
#[must_use]
pub fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "medibook").map_or_else(
        || PathBuf::from("./medibook-data"),
        |dirs| dirs.data_dir().to_path_buf(),
    )
}

/// One JSON/text file per key under a data directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    data_dir: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `data_dir`. The directory is created on first write.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// The directory holding the value files.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// File backing `key`. Characters outside `[A-Za-z0-9_-]` become `%XX`.
    fn key_path(&self, key: &str) -> PathBuf {
        let mut name = String::with_capacity(key.len() + 6);
        for byte in key.bytes() {
            if byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-' {
                name.push(char::from(byte));
            } else {
                name.push_str(&format!("%{byte:02X}"));
            }
        }
        name.push_str(".value");
        self.data_dir.join(name)
    }
}

fn storage_error(action: &str, path: &Path, err: &std::io::Error) -> MedibookError {
    MedibookError::StorageError(format!("Failed to {action} {}: {err}", path.display()))
}

impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_path(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(storage_error("read", &path, &e)),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.key_path(key);
        tokio::fs::create_dir_all(&self.data_dir)
            .await
            .map_err(|e| storage_error("create", &self.data_dir, &e))?;

        // Write-then-rename so a crash never leaves a half-written value.
        let tmp = path.with_extension("value.tmp");
        tokio::fs::write(&tmp, value)
            .await
            .map_err(|e| storage_error("write", &tmp, &e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| storage_error("replace", &path, &e))
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let path = self.key_path(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(storage_error("remove", &path, &e)),
        }
    }
}

/// In-process store for tests and ephemeral sessions.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.values.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_file_store_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("data"));

        assert_eq!(store.get("favorites_0771234567").await.unwrap(), None);

        store.set("favorites_0771234567", "[]").await.unwrap();
        assert_eq!(
            store.get("favorites_0771234567").await.unwrap().as_deref(),
            Some("[]")
        );

        store.set("favorites_0771234567", "[1]").await.unwrap();
        assert_eq!(
            store.get("favorites_0771234567").await.unwrap().as_deref(),
            Some("[1]")
        );

        store.remove("favorites_0771234567").await.unwrap();
        assert_eq!(store.get("favorites_0771234567").await.unwrap(), None);
        store.remove("favorites_0771234567").await.unwrap();
    }

    #[tokio::test]
    async fn test_file_store_sanitizes_keys() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());

        store.set("favorites_+94 77/../x", "v").await.unwrap();
        assert_eq!(
            store.get("favorites_+94 77/../x").await.unwrap().as_deref(),
            Some("v")
        );

        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_collide() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());

        store.set("a/b", "slash").await.unwrap();
        store.set("a%2Fb", "literal").await.unwrap();
        assert_eq!(store.get("a/b").await.unwrap().as_deref(), Some("slash"));
        assert_eq!(store.get("a%2Fb").await.unwrap().as_deref(), Some("literal"));
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryStore::new();
        store.set("authToken", "t").await.unwrap();
        let shared = store.clone();
        assert_eq!(shared.get("authToken").await.unwrap().as_deref(), Some("t"));
        shared.remove("authToken").await.unwrap();
        assert_eq!(store.get("authToken").await.unwrap(), None);
    }

    #[test]
    fn test_default_data_dir_is_not_empty() {
        assert!(!default_data_dir().as_os_str().is_empty());
    }
}
