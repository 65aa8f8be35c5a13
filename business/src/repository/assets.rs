use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use log::debug;
use tokio::runtime::Handle;

use crate::{Deferred, Error, Latency};

/// Asynchronous key to blob table for avatars and ID scans.
pub trait AssetStore: Send + Sync {
    fn get(&self, key: &str) -> Deferred<Vec<u8>>;

    /// Inserts or atomically replaces the blob under `key`.
    fn save(&self, key: &str, bytes: Vec<u8>) -> Deferred<()>;

    /// Fails with [`Error::InvalidArgument`] when `key` holds nothing.
    fn delete(&self, key: &str) -> Deferred<()>;
}

/// In-memory [`AssetStore`]. Clones share the same table.
#[derive(Debug, Clone, Default)]
pub struct MemoryAssetStore {
    assets: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    latency: Latency,
    io: Option<Handle>,
}

impl MemoryAssetStore {
    pub fn new(latency: Latency) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    pub fn with_io(mut self, io: Handle) -> Self {
        self.io = Some(io);
        self
    }

    pub fn len(&self) -> usize {
        self.assets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &str) -> bool {
        self.assets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    fn deferred<T: Send + 'static>(
        &self,
        work: impl FnOnce(&RwLock<HashMap<String, Vec<u8>>>) -> crate::Result<T> + Send + 'static,
    ) -> Deferred<T> {
        let assets = Arc::clone(&self.assets);
        let work = self.latency.defer(async move { work(&assets) });
        match &self.io {
            Some(io) => work.subscribe_on(io),
            None => work,
        }
    }
}

impl AssetStore for MemoryAssetStore {
    fn get(&self, key: &str) -> Deferred<Vec<u8>> {
        let key = key.to_owned();
        self.deferred(move |assets| {
            assets
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .get(&key)
                .cloned()
                .ok_or_else(|| Error::not_found(format!("Asset {key}")))
        })
    }

    fn save(&self, key: &str, bytes: Vec<u8>) -> Deferred<()> {
        let key = key.to_owned();
        self.deferred(move |assets| {
            debug!("Saving {} bytes under {key}", bytes.len());
            assets
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(key, bytes);
            Ok(())
        })
    }

    fn delete(&self, key: &str) -> Deferred<()> {
        let key = key.to_owned();
        self.deferred(move |assets| {
            assets
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&key)
                .map(|_| debug!("Deleted asset {key}"))
                .ok_or_else(|| Error::invalid_argument(format!("No asset under {key}")))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MemoryAssetStore {
        MemoryAssetStore::new(Latency::none())
    }

    #[tokio::test]
    async fn test_save_then_get() {
        let store = store();
        store.save("u1-avatar", vec![1, 2, 3]).await.unwrap();

        assert_eq!(store.get("u1-avatar").await.unwrap(), vec![1, 2, 3]);
        assert!(store.contains("u1-avatar"));
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let store = store();
        store.save("k", vec![1]).await.unwrap();
        store.save("k", vec![2, 2]).await.unwrap();

        assert_eq!(store.get("k").await.unwrap(), vec![2, 2]);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_key_is_not_found() {
        assert!(matches!(
            store().get("nope").await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_missing_key_is_invalid_argument() {
        let store = store();
        assert!(matches!(
            store.delete("nope").await,
            Err(Error::InvalidArgument(_))
        ));

        store.save("k", vec![0]).await.unwrap();
        store.delete("k").await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_writers_leave_one_whole_blob() {
        let store = store();
        let mut tasks = tokio::task::JoinSet::new();
        for n in 0..16_u8 {
            let store = store.clone();
            tasks.spawn(async move { store.save("shared", vec![n; 64]).await });
        }
        while let Some(joined) = tasks.join_next().await {
            joined.unwrap().unwrap();
        }

        let blob = store.get("shared").await.unwrap();
        assert_eq!(blob.len(), 64);
        assert!(blob.iter().all(|byte| *byte == blob[0]));
    }
}
