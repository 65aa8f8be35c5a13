//! Wiring of stores, use-cases and screens.

use std::sync::Arc;

use log::info;
use roster_states::Schedulers;

use crate::screens::{
    password_change::PasswordChangeScreen, user_edit::UserEditScreen, user_list::UserListScreen,
};
use crate::{
    BusinessConfig, FieldRulesValidator, FileStorageLoader, MemoryAssetStore, MemoryUserStore,
    UserUseCases,
};

/// Everything a front end needs: the shared use-cases plus factories for the screens.
///
/// Screens created from one context share its stores, so a user saved on the edit
/// screen shows up on the next list load.
#[derive(Debug, Clone)]
pub struct AppContext {
    users: MemoryUserStore,
    assets: MemoryAssetStore,
    use_cases: Arc<UserUseCases>,
    schedulers: Option<Schedulers>,
}

impl AppContext {
    pub fn from_config(config: &BusinessConfig) -> Self {
        Self::build(config, None)
    }

    /// Like [`Self::from_config`], with store work and commands pinned to
    /// `schedulers.io()`.
    pub fn with_schedulers(config: &BusinessConfig, schedulers: Schedulers) -> Self {
        Self::build(config, Some(schedulers))
    }

    fn build(config: &BusinessConfig, schedulers: Option<Schedulers>) -> Self {
        let mut users = if config.seed_demo_users {
            MemoryUserStore::seeded(config.user_latency())
        } else {
            MemoryUserStore::new(config.user_latency())
        };
        let mut assets = MemoryAssetStore::new(config.asset_latency());
        if let Some(schedulers) = &schedulers {
            users = users.with_io(schedulers.io().clone());
            assets = assets.with_io(schedulers.io().clone());
        }

        let mut use_cases = UserUseCases::new(
            Arc::new(users.clone()),
            Arc::new(assets.clone()),
            Arc::new(FileStorageLoader::new()),
        );
        if config.strict_validation {
            use_cases = use_cases.with_validator(Arc::new(FieldRulesValidator));
        }

        info!(
            "AppContext: {} users, strict validation {}",
            users.len(),
            config.strict_validation
        );

        Self {
            users,
            assets,
            use_cases: Arc::new(use_cases),
            schedulers,
        }
    }

    pub fn use_cases(&self) -> &Arc<UserUseCases> {
        &self.use_cases
    }

    pub fn users(&self) -> &MemoryUserStore {
        &self.users
    }

    pub fn assets(&self) -> &MemoryAssetStore {
        &self.assets
    }

    pub fn user_list(&self) -> roster_states::Result<UserListScreen> {
        let use_cases = Arc::clone(&self.use_cases);
        match &self.schedulers {
            Some(schedulers) => UserListScreen::with_schedulers(use_cases, schedulers.clone()),
            None => UserListScreen::new(use_cases),
        }
    }

    pub fn user_edit(&self, user_id: Option<&str>) -> roster_states::Result<UserEditScreen> {
        let use_cases = Arc::clone(&self.use_cases);
        match &self.schedulers {
            Some(schedulers) => {
                UserEditScreen::with_schedulers(use_cases, user_id, schedulers.clone())
            }
            None => UserEditScreen::new(use_cases, user_id),
        }
    }

    pub fn password_change(
        &self,
        user_id: Option<&str>,
    ) -> roster_states::Result<PasswordChangeScreen> {
        let use_cases = Arc::clone(&self.use_cases);
        match &self.schedulers {
            Some(schedulers) => {
                PasswordChangeScreen::with_schedulers(use_cases, user_id, schedulers.clone())
            }
            None => PasswordChangeScreen::new(use_cases, user_id),
        }
    }
}
