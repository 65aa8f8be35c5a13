//! User use-cases.
//!
//! `UserUseCases` orchestrates the stores and holds no state of its own. Store
//! calls that depend on each other are chained, never raced; the only
//! concurrency is the independent avatar / ID scan fetch in `show_details`.

use std::sync::Arc;

use log::{debug, info};

use crate::validation;
use crate::{
    AssetStore, AttachmentKind, Deferred, Error, Result, StorageLoader, User, UserDetails,
    UserStore, asset_key,
};

/// Server-side check run before `update` touches any store.
pub trait UpdateValidator: Send + Sync {
    /// Fails with [`Error::ValidationFailed`] to reject the user.
    fn validate(&self, user: &User) -> Result<()>;
}

/// Lets every user through.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl UpdateValidator for AcceptAll {
    fn validate(&self, _user: &User) -> Result<()> {
        Ok(())
    }
}

/// Applies the nickname, email and description field rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldRulesValidator;

impl UpdateValidator for FieldRulesValidator {
    fn validate(&self, user: &User) -> Result<()> {
        let errors = validation::user_fields(&user.details());
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::ValidationFailed(errors))
        }
    }
}

#[derive(Clone)]
pub struct UserUseCases {
    users: Arc<dyn UserStore>,
    assets: Arc<dyn AssetStore>,
    loader: Arc<dyn StorageLoader>,
    validator: Arc<dyn UpdateValidator>,
}

impl UserUseCases {
    pub fn new(
        users: Arc<dyn UserStore>,
        assets: Arc<dyn AssetStore>,
        loader: Arc<dyn StorageLoader>,
    ) -> Self {
        Self {
            users,
            assets,
            loader,
            validator: Arc::new(AcceptAll),
        }
    }

    pub fn with_validator(mut self, validator: Arc<dyn UpdateValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn show_list(&self) -> Deferred<Vec<UserDetails>> {
        self.users.list()
    }

    /// The user with both attachments. A missing attachment becomes `None`,
    /// a missing user is an error and skips the attachment fetch.
    pub fn show_details(&self, id: &str) -> Deferred<User> {
        let assets = Arc::clone(&self.assets);
        self.users.get(id).and_then(move |details| {
            let photo = optional_asset(&*assets, &asset_key(&details.id, AttachmentKind::Avatar));
            let id_scan = optional_asset(&*assets, &asset_key(&details.id, AttachmentKind::IdScan));
            photo
                .zip(id_scan)
                .map(move |(photo, id_scan)| User::from_details(details, photo, id_scan))
        })
    }

    /// Inserts (no id) or updates the user, then stores its attachments.
    /// Resolves to the user's id.
    pub fn update(&self, user: User) -> Deferred<String> {
        if let Err(e) = self.validator.validate(&user) {
            info!("Rejected user update: {e}");
            return Deferred::err(e);
        }

        let saved = match user.stored_id() {
            None => self.users.insert(user.details()),
            Some(id) => {
                let id = id.to_owned();
                self.users.update(user.details()).map(move |()| id)
            }
        };

        let assets = Arc::clone(&self.assets);
        let User { photo, id_scan, .. } = user;
        saved.and_then(move |id| {
            info!("Saved user {id}");
            save_attachments(assets, id, photo, id_scan)
        })
    }

    /// Loads `handle` and stores it as the user's attachment. Resolves to the asset key.
    pub fn add_attachment(
        &self,
        user_id: &str,
        handle: &str,
        kind: AttachmentKind,
    ) -> Deferred<String> {
        let key = asset_key(user_id, kind);
        let assets = Arc::clone(&self.assets);
        self.loader.load(handle).and_then(move |bytes| {
            debug!("Attaching {} bytes as {key}", bytes.len());
            assets.save(&key, bytes).map(move |()| key)
        })
    }

    /// Reads `handle` without storing anything, for users that do not exist yet.
    pub fn load_attachment(&self, handle: &str) -> Deferred<Vec<u8>> {
        self.loader.load(handle)
    }

    pub fn get_attachment(&self, key: &str) -> Deferred<Vec<u8>> {
        self.assets.get(key)
    }

    pub fn delete_user(&self, id: &str) -> Deferred<()> {
        self.users.delete(id)
    }

    pub fn update_password(&self, id: &str, password: &str) -> Deferred<()> {
        self.users.update_password(id, password)
    }
}

impl std::fmt::Debug for UserUseCases {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserUseCases").finish_non_exhaustive()
    }
}

fn optional_asset(assets: &dyn AssetStore, key: &str) -> Deferred<Option<Vec<u8>>> {
    let key = key.to_owned();
    assets.get(&key).map(Some).or_else_value(move |e| {
        debug!("No asset under {key}: {e}");
        None
    })
}

fn save_attachments(
    assets: Arc<dyn AssetStore>,
    id: String,
    photo: Option<Vec<u8>>,
    id_scan: Option<Vec<u8>>,
) -> Deferred<String> {
    let mut chain = Deferred::complete();
    for (kind, bytes) in [
        (AttachmentKind::Avatar, photo),
        (AttachmentKind::IdScan, id_scan),
    ] {
        let Some(bytes) = bytes else {
            continue;
        };
        let assets = Arc::clone(&assets);
        let key = asset_key(&id, kind);
        chain = chain.and_then(move |()| assets.save(&key, bytes));
    }
    chain.map(move |()| id)
}
