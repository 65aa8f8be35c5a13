use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use log::debug;

use crate::{Deferred, Error};

/// Resolves an external handle (a path, a URL, a picker result) to bytes.
pub trait StorageLoader: Send + Sync {
    /// Fails with [`Error::NotFound`] when the handle cannot be resolved.
    fn load(&self, handle: &str) -> Deferred<Vec<u8>>;
}

/// Reads plain paths and `file://` URLs from the local file system.
#[derive(Debug, Clone, Default)]
pub struct FileStorageLoader;

impl FileStorageLoader {
    pub fn new() -> Self {
        Self
    }

    fn path_of(handle: &str) -> PathBuf {
        PathBuf::from(handle.strip_prefix("file://").unwrap_or(handle))
    }
}

impl StorageLoader for FileStorageLoader {
    fn load(&self, handle: &str) -> Deferred<Vec<u8>> {
        let path = Self::path_of(handle);
        Deferred::new(async move {
            debug!("Loading attachment from {}", path.display());
            tokio::fs::read(&path).await.map_err(Error::from)
        })
    }
}

/// Serves bytes registered up front, keyed by handle.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorageLoader {
    entries: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryStorageLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(self, handle: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.register(handle, bytes);
        self
    }

    pub fn register(&self, handle: impl Into<String>, bytes: Vec<u8>) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(handle.into(), bytes);
    }
}

impl StorageLoader for MemoryStorageLoader {
    fn load(&self, handle: &str) -> Deferred<Vec<u8>> {
        let bytes = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(handle)
            .cloned();
        match bytes {
            Some(bytes) => Deferred::ok(bytes),
            None => Deferred::err(Error::not_found(format!("Handle {handle}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_loader_serves_registered_handles() {
        let loader = MemoryStorageLoader::new().with_entry("content://avatar", vec![1, 2, 3]);

        assert_eq!(loader.load("content://avatar").await.unwrap(), vec![1, 2, 3]);
        assert!(matches!(
            loader.load("content://other").await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_file_loader_reads_paths_and_file_urls() {
        let path = std::env::temp_dir().join(format!("roster-loader-{}.bin", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, [7_u8, 8, 9]).await.unwrap();

        let loader = FileStorageLoader::new();
        let plain = loader.load(&path.display().to_string()).await.unwrap();
        let url = loader
            .load(&format!("file://{}", path.display()))
            .await
            .unwrap();

        assert_eq!(plain, vec![7, 8, 9]);
        assert_eq!(url, plain);
        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_file_loader_missing_file_is_not_found() {
        let result = FileStorageLoader::new()
            .load("/definitely/not/here/roster.bin")
            .await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }
}
