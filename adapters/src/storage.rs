//! Persistence for the current session between runs.
//!
//! Values are opaque strings stored under a key, mirroring the key/value
//! storage the hosted platform's clients use.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::errors::AdapterError;

#[async_trait]
pub trait SessionStorage: Send + Sync {
    async fn get_item(&self, key: &str) -> Result<Option<String>, AdapterError>;
    async fn set_item(&self, key: &str, value: &str) -> Result<(), AdapterError>;
    async fn remove_item(&self, key: &str) -> Result<(), AdapterError>;
}

/// In-process storage; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStorage for MemorySessionStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>, AdapterError> {
        let items = self
            .items
            .lock()
            .map_err(|e| AdapterError::Storage(e.to_string()))?;
        Ok(items.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), AdapterError> {
        self.items
            .lock()
            .map_err(|e| AdapterError::Storage(e.to_string()))?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<(), AdapterError> {
        self.items
            .lock()
            .map_err(|e| AdapterError::Storage(e.to_string()))?
            .remove(key);
        Ok(())
    }
}

#[cfg(unix)]
const SESSION_FILE_MODE: u32 = 0o600;

/// One JSON object on disk holding every key.
#[derive(Debug, Clone)]
pub struct FileSessionStorage {
    path: PathBuf,
}

impl FileSessionStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<HashMap<String, String>, AdapterError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) if raw.trim().is_empty() => Ok(HashMap::new()),
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| {
                AdapterError::Storage(format!("corrupt session file {}: {e}", self.path.display()))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(AdapterError::Storage(e.to_string())),
        }
    }

    async fn save(&self, items: &HashMap<String, String>) -> Result<(), AdapterError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| AdapterError::Storage(e.to_string()))?;
            }
        }
        let raw = serde_json::to_string_pretty(items)?;
        let io = |e: std::io::Error| AdapterError::Storage(format!("{}: {e}", self.path.display()));

        // Tokens live in this file: owner-only on Unix.
        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(SESSION_FILE_MODE);
        let mut file = options.open(&self.path).await.map_err(io)?;
        file.write_all(raw.as_bytes()).await.map_err(io)?;
        file.flush().await.map_err(io)?;

        // Opening an existing file keeps its old mode.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(SESSION_FILE_MODE))
                .await
                .map_err(io)?;
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStorage for FileSessionStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>, AdapterError> {
        let item = self.load().await?.remove(key);
        debug!(key, found = item.is_some(), "storage get");
        Ok(item)
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), AdapterError> {
        debug!(key, "storage set");
        let mut items = self.load().await?;
        items.insert(key.to_string(), value.to_string());
        self.save(&items).await
    }

    async fn remove_item(&self, key: &str) -> Result<(), AdapterError> {
        debug!(key, "storage remove");
        let mut items = self.load().await?;
        if items.remove(key).is_some() {
            self.save(&items).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_storage_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let storage = FileSessionStorage::new(&path);
        storage.set_item("k", "v").await.unwrap();
        storage.set_item("other", "w").await.unwrap();

        let reopened = FileSessionStorage::new(&path);
        assert_eq!(reopened.get_item("k").await.unwrap().as_deref(), Some("v"));

        reopened.remove_item("k").await.unwrap();
        assert_eq!(reopened.get_item("k").await.unwrap(), None);
        assert_eq!(reopened.get_item("other").await.unwrap().as_deref(), Some("w"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn session_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{}").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let storage = FileSessionStorage::new(&path);
        storage.set_item("k", "v").await.unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);

        let fresh = dir.path().join("fresh.json");
        FileSessionStorage::new(&fresh).set_item("k", "v").await.unwrap();
        let mode = std::fs::metadata(&fresh).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[tokio::test]
    async fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileSessionStorage::new(dir.path().join("absent.json"));
        assert_eq!(storage.get_item("k").await.unwrap(), None);
        storage.remove_item("k").await.unwrap();
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        tokio::fs::write(&path, "{not json").await.unwrap();
        let storage = FileSessionStorage::new(&path);
        assert!(matches!(
            storage.get_item("k").await,
            Err(AdapterError::Storage(_))
        ));
    }

    #[tokio::test]
    async fn memory_storage_round_trip() {
        let storage = MemorySessionStorage::new();
        storage.set_item("k", "v").await.unwrap();
        assert_eq!(storage.get_item("k").await.unwrap().as_deref(), Some("v"));
        storage.remove_item("k").await.unwrap();
        assert_eq!(storage.get_item("k").await.unwrap(), None);
    }
}
