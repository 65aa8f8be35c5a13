//! User list with edit / delete / change-password actions.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use flume::Receiver;
use log::{info, warn};
use roster_states::{
    Command, CommandFuture, CommandSnapshot, EventChannel, Schedulers, StateCtx, TaskHandle,
    Updater, impl_state,
};
use tokio_util::sync::CancellationToken;
use ustr::Ustr;

use super::{
    COMMUNICATION_ERROR, Navigation, ScreenStatus, USER_DELETED, UseCases, UserMessage, emit,
    emit_now, screen_ctx,
};
use crate::{UserDetails, UserUseCases};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserList(pub Vec<UserDetails>);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListBusy(pub bool);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListStatus(pub ScreenStatus);

/// When the list was last fetched successfully.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LastLoaded(pub Option<DateTime<Utc>>);

/// Input of [`DeleteUserCommand`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingDelete(pub Option<Ustr>);

/// Asks the user to confirm deleting this user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteConfirmation(pub Ustr);

impl_state!(UserList, ListBusy, ListStatus, LastLoaded, PendingDelete);

#[derive(Debug, Default)]
pub struct LoadUsersCommand;

impl Command for LoadUsersCommand {
    fn run(&self, snap: CommandSnapshot, updater: Updater, _cancel: CancellationToken) -> CommandFuture {
        let use_cases = Arc::clone(&snap.state::<UseCases>().0);

        updater.set(ListBusy(true));
        updater.set(ListStatus(ScreenStatus::Loading));

        Box::pin(async move {
            match use_cases.show_list().await {
                Ok(users) => {
                    info!("LoadUsersCommand: {} users", users.len());
                    loaded(&updater, users);
                }
                Err(e) => {
                    warn!("LoadUsersCommand: {e}");
                    updater.set(ListBusy(false));
                    updater.set(ListStatus(ScreenStatus::Failed));
                    emit(&updater, UserMessage::new(COMMUNICATION_ERROR));
                }
            }
        })
    }
}

/// Deletes the pending user, then reloads the list.
#[derive(Debug, Default)]
pub struct DeleteUserCommand;

impl Command for DeleteUserCommand {
    fn run(&self, snap: CommandSnapshot, updater: Updater, _cancel: CancellationToken) -> CommandFuture {
        let Some(id) = snap.state::<PendingDelete>().0 else {
            info!("DeleteUserCommand: nothing to delete, skipping");
            return Box::pin(async {});
        };
        let use_cases = Arc::clone(&snap.state::<UseCases>().0);

        updater.set(ListBusy(true));
        updater.set(PendingDelete(None));

        Box::pin(async move {
            let result = use_cases
                .delete_user(&id)
                .then(use_cases.show_list())
                .await;

            match result {
                Ok(users) => {
                    info!("DeleteUserCommand: deleted {id}");
                    loaded(&updater, users);
                    emit(&updater, UserMessage::new(USER_DELETED));
                }
                Err(e) => {
                    warn!("DeleteUserCommand: failed to delete {id}: {e}");
                    updater.set(ListBusy(false));
                    emit(&updater, UserMessage::new(COMMUNICATION_ERROR));
                }
            }
        })
    }
}

fn loaded(updater: &Updater, users: Vec<UserDetails>) {
    updater.set(UserList(users));
    updater.set(LastLoaded(Some(Utc::now())));
    updater.set(ListBusy(false));
    updater.set(ListStatus(ScreenStatus::Ready));
}

#[derive(Debug)]
pub struct UserListScreen {
    ctx: StateCtx,
}

impl UserListScreen {
    pub fn new(use_cases: Arc<UserUseCases>) -> roster_states::Result<Self> {
        Self::build(use_cases, None)
    }

    pub fn with_schedulers(
        use_cases: Arc<UserUseCases>,
        schedulers: Schedulers,
    ) -> roster_states::Result<Self> {
        Self::build(use_cases, Some(schedulers))
    }

    fn build(
        use_cases: Arc<UserUseCases>,
        schedulers: Option<Schedulers>,
    ) -> roster_states::Result<Self> {
        let mut ctx = screen_ctx(use_cases, schedulers);
        ctx.add_state(UserList::default());
        ctx.add_state(ListBusy::default());
        ctx.add_state(ListStatus::default());
        ctx.add_state(LastLoaded::default());
        ctx.add_state(PendingDelete::default());
        ctx.add_state(EventChannel::<DeleteConfirmation>::new());

        ctx.record_command(LoadUsersCommand);
        ctx.record_command(DeleteUserCommand);

        ctx.validate()?;
        Ok(Self { ctx })
    }

    pub fn load(&mut self) -> roster_states::Result<TaskHandle> {
        self.ctx.dispatch::<LoadUsersCommand>()
    }

    pub fn edit_user(&mut self, id: &str) -> roster_states::Result<()> {
        emit_now(&mut self.ctx, Navigation::UserEdit(Some(Ustr::from(id))))
    }

    pub fn add_new_user(&mut self) -> roster_states::Result<()> {
        emit_now(&mut self.ctx, Navigation::UserEdit(None))
    }

    pub fn change_user_password(&mut self, id: &str) -> roster_states::Result<()> {
        emit_now(&mut self.ctx, Navigation::PasswordChange(Ustr::from(id)))
    }

    /// Only asks for confirmation; see [`Self::delete_user_confirmed`].
    pub fn delete_user(&mut self, id: &str) -> roster_states::Result<()> {
        emit_now(&mut self.ctx, DeleteConfirmation(Ustr::from(id)))
    }

    pub fn delete_user_confirmed(&mut self, id: &str) -> roster_states::Result<TaskHandle> {
        self.ctx.set(PendingDelete(Some(Ustr::from(id))))?;
        self.ctx.dispatch::<DeleteUserCommand>()
    }

    pub fn close(&mut self) {
        self.ctx.close();
    }

    pub fn navigation(&mut self) -> roster_states::Result<Receiver<Navigation>> {
        self.ctx.attach_events::<Navigation>()
    }

    pub fn messages(&mut self) -> roster_states::Result<Receiver<UserMessage>> {
        self.ctx.attach_events::<UserMessage>()
    }

    pub fn confirmations(&mut self) -> roster_states::Result<Receiver<DeleteConfirmation>> {
        self.ctx.attach_events::<DeleteConfirmation>()
    }

    pub fn watch_users(&mut self) -> roster_states::Result<Receiver<UserList>> {
        self.ctx.watch::<UserList>()
    }

    pub fn sync(&mut self) {
        self.ctx.sync_computes();
    }

    pub async fn settle(&mut self) {
        self.ctx.flush_and_await().await;
    }

    pub fn users(&self) -> &[UserDetails] {
        self.ctx.state::<UserList>().map_or(&[], |list| list.0.as_slice())
    }

    pub fn busy(&self) -> bool {
        self.ctx.state::<ListBusy>().is_some_and(|v| v.0)
    }

    pub fn status(&self) -> ScreenStatus {
        self.ctx.state::<ListStatus>().map(|v| v.0).unwrap_or_default()
    }

    pub fn last_loaded(&self) -> Option<DateTime<Utc>> {
        self.ctx.state::<LastLoaded>().and_then(|v| v.0)
    }

    pub fn ctx(&self) -> &StateCtx {
        &self.ctx
    }

    pub fn ctx_mut(&mut self) -> &mut StateCtx {
        &mut self.ctx
    }
}
