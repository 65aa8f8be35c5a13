//! Password change form: password, confirmation, submit.

use std::any::TypeId;
use std::sync::Arc;

use flume::Receiver;
use log::{info, warn};
use roster_states::{
    Command, CommandFuture, CommandSnapshot, Compute, Dep, Schedulers, StateCtx, TaskHandle,
    Updater, deps, impl_state,
};
use tokio_util::sync::CancellationToken;
use ustr::Ustr;

use super::{
    COMMUNICATION_ERROR, Navigation, ScreenStatus, UseCases, UserMessage, emit, screen_ctx,
};
use crate::{UserUseCases, validation};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PasswordTarget(pub Option<Ustr>);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Password(pub String);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PasswordConfirmation(pub String);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PasswordBusy(pub bool);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PasswordStatus(pub ScreenStatus);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PasswordValidation(pub String);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfirmationValidation(pub String);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PasswordSubmitEnabled(pub bool);

impl_state!(
    PasswordTarget,
    Password,
    PasswordConfirmation,
    PasswordBusy,
    PasswordStatus,
    PasswordValidation,
    ConfirmationValidation,
    PasswordSubmitEnabled,
);

impl Compute for PasswordValidation {
    fn deps(&self) -> Vec<TypeId> {
        deps!(Password)
    }

    fn compute(&mut self, deps: Dep<'_>) {
        self.0 = validation::password(&deps.state::<Password>().0).to_owned();
    }
}

impl Compute for ConfirmationValidation {
    fn deps(&self) -> Vec<TypeId> {
        deps!(Password, PasswordConfirmation)
    }

    fn compute(&mut self, deps: Dep<'_>) {
        self.0 = validation::password_confirmation(
            &deps.state::<Password>().0,
            &deps.state::<PasswordConfirmation>().0,
        )
        .to_owned();
    }
}

impl Compute for PasswordSubmitEnabled {
    fn deps(&self) -> Vec<TypeId> {
        deps!(
            Password,
            PasswordConfirmation,
            PasswordValidation,
            ConfirmationValidation,
        )
    }

    fn compute(&mut self, deps: Dep<'_>) {
        self.0 = !deps.state::<Password>().0.is_empty()
            && !deps.state::<PasswordConfirmation>().0.is_empty()
            && deps.compute::<PasswordValidation>().0.is_empty()
            && deps.compute::<ConfirmationValidation>().0.is_empty();
    }
}

/// Stores the new password. Without a target user it only navigates back.
#[derive(Debug, Default)]
pub struct UpdatePasswordCommand;

impl Command for UpdatePasswordCommand {
    fn run(&self, snap: CommandSnapshot, updater: Updater, _cancel: CancellationToken) -> CommandFuture {
        let Some(id) = snap.state::<PasswordTarget>().0 else {
            info!("UpdatePasswordCommand: no target user, leaving");
            updater.set(PasswordStatus(ScreenStatus::Closed));
            emit(&updater, Navigation::Back);
            return Box::pin(async {});
        };
        if snap.state::<PasswordBusy>().0 {
            info!("UpdatePasswordCommand: busy, skipping");
            return Box::pin(async {});
        }
        if !snap.state::<PasswordSubmitEnabled>().0 {
            info!("UpdatePasswordCommand: form not submittable, skipping");
            return Box::pin(async {});
        }

        let use_cases = Arc::clone(&snap.state::<UseCases>().0);
        let password = snap.state::<Password>().0.clone();

        updater.set(PasswordBusy(true));
        updater.set(PasswordStatus(ScreenStatus::Submitting));

        Box::pin(async move {
            match use_cases.update_password(&id, &password).await {
                Ok(()) => {
                    info!("UpdatePasswordCommand: password of {id} changed");
                    updater.set(PasswordStatus(ScreenStatus::Closed));
                    emit(&updater, Navigation::Back);
                }
                Err(e) => {
                    warn!("UpdatePasswordCommand: {e}");
                    updater.set(PasswordBusy(false));
                    updater.set(PasswordStatus(ScreenStatus::Ready));
                    emit(&updater, UserMessage::new(COMMUNICATION_ERROR));
                }
            }
        })
    }
}

#[derive(Debug)]
pub struct PasswordChangeScreen {
    ctx: StateCtx,
}

impl PasswordChangeScreen {
    pub fn new(use_cases: Arc<UserUseCases>, user_id: Option<&str>) -> roster_states::Result<Self> {
        Self::build(use_cases, user_id, None)
    }

    pub fn with_schedulers(
        use_cases: Arc<UserUseCases>,
        user_id: Option<&str>,
        schedulers: Schedulers,
    ) -> roster_states::Result<Self> {
        Self::build(use_cases, user_id, Some(schedulers))
    }

    fn build(
        use_cases: Arc<UserUseCases>,
        user_id: Option<&str>,
        schedulers: Option<Schedulers>,
    ) -> roster_states::Result<Self> {
        let mut ctx = screen_ctx(use_cases, schedulers);

        let target = user_id.filter(|id| !id.is_empty()).map(Ustr::from);
        ctx.add_state(PasswordTarget(target));
        ctx.add_state(Password::default());
        ctx.add_state(PasswordConfirmation::default());
        ctx.add_state(PasswordBusy::default());
        ctx.add_state(PasswordStatus(ScreenStatus::Ready));

        ctx.record_compute(PasswordValidation::default());
        ctx.record_compute(ConfirmationValidation::default());
        ctx.record_compute(PasswordSubmitEnabled::default());

        ctx.record_command(UpdatePasswordCommand);

        ctx.validate()?;
        ctx.run_computed();
        Ok(Self { ctx })
    }

    pub fn set_password(&mut self, value: impl Into<String>) -> roster_states::Result<()> {
        self.ctx.set(Password(value.into()))
    }

    pub fn set_confirmation(&mut self, value: impl Into<String>) -> roster_states::Result<()> {
        self.ctx.set(PasswordConfirmation(value.into()))
    }

    pub fn submit(&mut self) -> roster_states::Result<TaskHandle> {
        self.ctx.dispatch::<UpdatePasswordCommand>()
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

    pub fn watch_submit_enabled(
        &mut self,
    ) -> roster_states::Result<Receiver<PasswordSubmitEnabled>> {
        self.ctx.watch::<PasswordSubmitEnabled>()
    }

    pub fn sync(&mut self) {
        self.ctx.sync_computes();
    }

    pub async fn settle(&mut self) {
        self.ctx.flush_and_await().await;
    }

    pub fn password_validation(&self) -> &str {
        self.ctx.cached::<PasswordValidation>().map_or("", |v| v.0.as_str())
    }

    pub fn confirmation_validation(&self) -> &str {
        self.ctx
            .cached::<ConfirmationValidation>()
            .map_or("", |v| v.0.as_str())
    }

    pub fn submit_enabled(&self) -> bool {
        self.ctx.cached::<PasswordSubmitEnabled>().is_some_and(|v| v.0)
    }

    pub fn busy(&self) -> bool {
        self.ctx.state::<PasswordBusy>().is_some_and(|v| v.0)
    }

    pub fn status(&self) -> ScreenStatus {
        self.ctx.state::<PasswordStatus>().map(|v| v.0).unwrap_or_default()
    }

    pub fn ctx(&self) -> &StateCtx {
        &self.ctx
    }

    pub fn ctx_mut(&mut self) -> &mut StateCtx {
        &mut self.ctx
    }
}
