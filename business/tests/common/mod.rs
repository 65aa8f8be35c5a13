//! Shared harness for the integration tests: memory stores behind counting
//! wrappers, a storage loader with a few registered handles, and the use-cases
//! built on top of them.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use roster_business::{
    AssetStore, Deferred, Latency, MemoryAssetStore, MemoryStorageLoader, MemoryUserStore,
    UserDetails, UserStore, UserUseCases,
};

pub const U1: &str = "u1";
pub const PICKED_HANDLE: &str = "picked.png";

pub fn init_logger() {
    env_logger::builder().is_test(true).try_init().ok();
}

#[derive(Debug, Default)]
pub struct Calls {
    pub list: AtomicUsize,
    pub get: AtomicUsize,
    pub insert: AtomicUsize,
    pub update: AtomicUsize,
    pub update_password: AtomicUsize,
    pub delete: AtomicUsize,
    pub asset_get: AtomicUsize,
    pub asset_save: AtomicUsize,
    pub asset_delete: AtomicUsize,
}

impl Calls {
    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

fn hit(counter: &AtomicUsize) {
    counter.fetch_add(1, Ordering::SeqCst);
}

pub struct CountingUserStore {
    inner: MemoryUserStore,
    calls: Arc<Calls>,
}

impl UserStore for CountingUserStore {
    fn list(&self) -> Deferred<Vec<UserDetails>> {
        hit(&self.calls.list);
        self.inner.list()
    }

    fn get(&self, id: &str) -> Deferred<UserDetails> {
        hit(&self.calls.get);
        self.inner.get(id)
    }

    fn insert(&self, user: UserDetails) -> Deferred<String> {
        hit(&self.calls.insert);
        self.inner.insert(user)
    }

    fn update(&self, user: UserDetails) -> Deferred<()> {
        hit(&self.calls.update);
        self.inner.update(user)
    }

    fn update_password(&self, id: &str, password: &str) -> Deferred<()> {
        hit(&self.calls.update_password);
        self.inner.update_password(id, password)
    }

    fn delete(&self, id: &str) -> Deferred<()> {
        hit(&self.calls.delete);
        self.inner.delete(id)
    }
}

pub struct CountingAssetStore {
    inner: MemoryAssetStore,
    calls: Arc<Calls>,
}

impl AssetStore for CountingAssetStore {
    fn get(&self, key: &str) -> Deferred<Vec<u8>> {
        hit(&self.calls.asset_get);
        self.inner.get(key)
    }

    fn save(&self, key: &str, bytes: Vec<u8>) -> Deferred<()> {
        hit(&self.calls.asset_save);
        self.inner.save(key, bytes)
    }

    fn delete(&self, key: &str) -> Deferred<()> {
        hit(&self.calls.asset_delete);
        self.inner.delete(key)
    }
}

pub struct Harness {
    pub users: MemoryUserStore,
    pub assets: MemoryAssetStore,
    pub loader: MemoryStorageLoader,
    pub calls: Arc<Calls>,
    pub use_cases: Arc<UserUseCases>,
}

impl Harness {
    /// Store seeded with the single user `u1`, no latency.
    pub fn new() -> Self {
        Self::with_latency(Latency::none())
    }

    pub fn with_latency(latency: Latency) -> Self {
        let users = MemoryUserStore::new(latency).with_users([UserDetails::new(
            U1,
            "Nickname1",
            "nickname1@test.com",
            "Test description 1",
        )]);
        Self::build(users, MemoryAssetStore::new(latency))
    }

    pub fn empty() -> Self {
        Self::build(
            MemoryUserStore::new(Latency::none()),
            MemoryAssetStore::new(Latency::none()),
        )
    }

    fn build(users: MemoryUserStore, assets: MemoryAssetStore) -> Self {
        init_logger();
        let calls = Arc::new(Calls::default());
        let loader = MemoryStorageLoader::new().with_entry(PICKED_HANDLE, vec![1, 2, 3]);
        let use_cases = UserUseCases::new(
            Arc::new(CountingUserStore {
                inner: users.clone(),
                calls: Arc::clone(&calls),
            }),
            Arc::new(CountingAssetStore {
                inner: assets.clone(),
                calls: Arc::clone(&calls),
            }),
            Arc::new(loader.clone()),
        );

        Self {
            users,
            assets,
            loader,
            calls,
            use_cases: Arc::new(use_cases),
        }
    }
}
