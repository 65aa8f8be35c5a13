mod assets;
mod storage;
mod users;

pub use assets::{AssetStore, MemoryAssetStore};
pub use storage::{FileStorageLoader, MemoryStorageLoader, StorageLoader};
pub use users::{DEMO_USER_IDS, MemoryUserStore, UserStore, demo_users};
