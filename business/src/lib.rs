//! User management: in-memory stores, use-cases and the reactive state of
//! the list, edit and password-change screens.
//!
//! Storage calls return [`Deferred`] values that do nothing until awaited or
//! subscribed. Screens are [`roster_states::StateCtx`] graphs driven by
//! commands that call [`UserUseCases`].

mod app;
mod config;
mod error;
mod latency;
mod model;
mod repository;
mod usecase;

pub mod screens;
pub mod validation;

pub use app::AppContext;
pub use config::BusinessConfig;
pub use error::{Deferred, Error, FieldError, Result};
pub use latency::Latency;
pub use model::{AttachmentKind, User, UserDetails, asset_key};
pub use repository::{
    AssetStore, DEMO_USER_IDS, FileStorageLoader, MemoryAssetStore, MemoryStorageLoader,
    MemoryUserStore, StorageLoader, UserStore, demo_users,
};
pub use usecase::{AcceptAll, FieldRulesValidator, UpdateValidator, UserUseCases};
