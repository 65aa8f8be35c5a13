//! Add / edit user form.
//!
//! ## Cells
//! - inputs: [`Nickname`], [`Email`], [`Description`], [`Avatar`], [`IdScan`]
//! - derived: one validation message per text field, [`EditSubmitEnabled`], [`EditHeader`]
//! - async: [`EditBusy`], [`EditStatus`]
//!
//! ## Flow
//! 1. `UserEditScreen::new(use_cases, Some(id))` then `load()` fills the form.
//! 2. Field setters recompute validation and submit readiness synchronously.
//! 3. `submit()` dispatches [`SubmitUserCommand`]; on success the screen closes
//!    and emits [`Navigation::Back`], keeping the busy flag set.
//!
//! Attachments picked for a user that does not exist yet are only read into the
//! draft; submit stores them under the new id. Attaching is refused while busy.

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
    COMMUNICATION_ERROR, Navigation, ScreenStatus, UseCases, UserMessage, emit, emit_now,
    screen_ctx,
};
use crate::{AttachmentKind, User, UserUseCases, validation};

pub const ADD_USER_HEADER: &str = "Add user";
pub const EDIT_USER_HEADER: &str = "Edit user";

/// The user being edited; `None` while adding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditTarget(pub Option<Ustr>);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Nickname(pub String);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Email(pub String);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Description(pub String);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Avatar(pub Option<Vec<u8>>);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdScan(pub Option<Vec<u8>>);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditBusy(pub bool);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditStatus(pub ScreenStatus);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentRequest {
    pub handle: String,
    pub kind: AttachmentKind,
}

/// Input of [`AttachFileCommand`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingAttachment(pub Option<AttachmentRequest>);

impl_state!(
    EditTarget,
    Nickname,
    Email,
    Description,
    Avatar,
    IdScan,
    EditBusy,
    EditStatus,
    PendingAttachment,
);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NicknameValidation(pub String);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmailValidation(pub String);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescriptionValidation(pub String);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditSubmitEnabled(pub bool);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditHeader(pub &'static str);

impl_state!(
    NicknameValidation,
    EmailValidation,
    DescriptionValidation,
    EditSubmitEnabled,
    EditHeader,
);

impl Compute for NicknameValidation {
    fn deps(&self) -> Vec<TypeId> {
        deps!(Nickname)
    }

    fn compute(&mut self, deps: Dep<'_>) {
        self.0 = validation::nickname(&deps.state::<Nickname>().0).to_owned();
    }
}

impl Compute for EmailValidation {
    fn deps(&self) -> Vec<TypeId> {
        deps!(Email)
    }

    fn compute(&mut self, deps: Dep<'_>) {
        self.0 = validation::email(&deps.state::<Email>().0).to_owned();
    }
}

impl Compute for DescriptionValidation {
    fn deps(&self) -> Vec<TypeId> {
        deps!(Description)
    }

    fn compute(&mut self, deps: Dep<'_>) {
        self.0 = validation::description(&deps.state::<Description>().0).to_owned();
    }
}

impl Compute for EditSubmitEnabled {
    fn deps(&self) -> Vec<TypeId> {
        deps!(
            Nickname,
            Email,
            Description,
            NicknameValidation,
            EmailValidation,
            DescriptionValidation,
        )
    }

    fn compute(&mut self, deps: Dep<'_>) {
        let filled = !deps.state::<Nickname>().0.is_empty()
            && !deps.state::<Email>().0.is_empty()
            && !deps.state::<Description>().0.is_empty();
        let valid = deps.compute::<NicknameValidation>().0.is_empty()
            && deps.compute::<EmailValidation>().0.is_empty()
            && deps.compute::<DescriptionValidation>().0.is_empty();
        self.0 = filled && valid;
    }
}

impl Compute for EditHeader {
    fn deps(&self) -> Vec<TypeId> {
        deps!(EditTarget)
    }

    fn compute(&mut self, deps: Dep<'_>) {
        self.0 = if deps.state::<EditTarget>().0.is_some() {
            EDIT_USER_HEADER
        } else {
            ADD_USER_HEADER
        };
    }
}

/// Fills the form from the stored user. A user that cannot be loaded closes the form.
#[derive(Debug, Default)]
pub struct LoadUserCommand;

impl Command for LoadUserCommand {
    fn run(&self, snap: CommandSnapshot, updater: Updater, _cancel: CancellationToken) -> CommandFuture {
        let Some(id) = snap.state::<EditTarget>().0 else {
            updater.set(EditStatus(ScreenStatus::Ready));
            return Box::pin(async {});
        };
        let use_cases = Arc::clone(&snap.state::<UseCases>().0);

        updater.set(EditBusy(true));
        updater.set(EditStatus(ScreenStatus::Loading));

        Box::pin(async move {
            match use_cases.show_details(&id).await {
                Ok(user) => {
                    info!("LoadUserCommand: loaded user {id}");
                    updater.set(Nickname(user.nickname));
                    updater.set(Email(user.email));
                    updater.set(Description(user.description));
                    updater.set(Avatar(user.photo));
                    updater.set(IdScan(user.id_scan));
                    updater.set(EditBusy(false));
                    updater.set(EditStatus(ScreenStatus::Ready));
                }
                Err(e) => {
                    warn!("LoadUserCommand: failed to load user {id}: {e}");
                    updater.set(EditBusy(false));
                    updater.set(EditStatus(ScreenStatus::Failed));
                    emit(&updater, Navigation::Back);
                }
            }
        })
    }
}

/// Saves the draft. Success closes the form; failure reports and stays editable.
#[derive(Debug, Default)]
pub struct SubmitUserCommand;

impl Command for SubmitUserCommand {
    fn run(&self, snap: CommandSnapshot, updater: Updater, _cancel: CancellationToken) -> CommandFuture {
        if snap.state::<EditBusy>().0 {
            info!("SubmitUserCommand: busy, skipping");
            return Box::pin(async {});
        }
        if !snap.state::<EditSubmitEnabled>().0 {
            info!("SubmitUserCommand: form not submittable, skipping");
            return Box::pin(async {});
        }

        let use_cases = Arc::clone(&snap.state::<UseCases>().0);
        let user = User {
            id: snap.state::<EditTarget>().0.map(|id| id.to_string()),
            nickname: snap.state::<Nickname>().0.clone(),
            email: snap.state::<Email>().0.clone(),
            description: snap.state::<Description>().0.clone(),
            photo: snap.state::<Avatar>().0.clone(),
            id_scan: snap.state::<IdScan>().0.clone(),
        };

        updater.set(EditBusy(true));
        updater.set(EditStatus(ScreenStatus::Submitting));

        Box::pin(async move {
            match use_cases.update(user).await {
                Ok(id) => {
                    info!("SubmitUserCommand: saved user {id}");
                    updater.set(EditStatus(ScreenStatus::Closed));
                    emit(&updater, Navigation::Back);
                }
                Err(e) => {
                    warn!("SubmitUserCommand: {e}");
                    updater.set(EditBusy(false));
                    updater.set(EditStatus(ScreenStatus::Ready));
                    emit(&updater, UserMessage(e.user_message(COMMUNICATION_ERROR)));
                }
            }
        })
    }
}

/// Loads a picked file into the draft. For an existing user it is stored first.
#[derive(Debug, Default)]
pub struct AttachFileCommand;

impl Command for AttachFileCommand {
    fn run(&self, snap: CommandSnapshot, updater: Updater, _cancel: CancellationToken) -> CommandFuture {
        let Some(request) = snap.state::<PendingAttachment>().0.clone() else {
            info!("AttachFileCommand: nothing picked, skipping");
            return Box::pin(async {});
        };
        updater.set(PendingAttachment(None));
        if snap.state::<EditBusy>().0 {
            info!("AttachFileCommand: busy, dropping {}", request.handle);
            return Box::pin(async {});
        }
        let use_cases = Arc::clone(&snap.state::<UseCases>().0);
        let target = snap.state::<EditTarget>().0;

        updater.set(EditBusy(true));

        Box::pin(async move {
            let attached = match target {
                Some(id) => {
                    let read_back = Arc::clone(&use_cases);
                    use_cases
                        .add_attachment(&id, &request.handle, request.kind)
                        .and_then(move |key| read_back.get_attachment(&key))
                        .await
                }
                None => use_cases.load_attachment(&request.handle).await,
            };

            match attached {
                Ok(bytes) => {
                    info!("AttachFileCommand: attached {} as {}", request.handle, request.kind);
                    match request.kind {
                        AttachmentKind::Avatar => updater.set(Avatar(Some(bytes))),
                        AttachmentKind::IdScan => updater.set(IdScan(Some(bytes))),
                    }
                }
                Err(e) => {
                    warn!("AttachFileCommand: {e}");
                    emit(&updater, UserMessage(e.user_message(COMMUNICATION_ERROR)));
                }
            }
            updater.set(EditBusy(false));
        })
    }
}

/// Add / edit user form.
#[derive(Debug)]
pub struct UserEditScreen {
    ctx: StateCtx,
}

impl UserEditScreen {
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
        ctx.add_state(EditTarget(target));
        ctx.add_state(Nickname::default());
        ctx.add_state(Email::default());
        ctx.add_state(Description::default());
        ctx.add_state(Avatar::default());
        ctx.add_state(IdScan::default());
        ctx.add_state(EditBusy::default());
        ctx.add_state(EditStatus::default());
        ctx.add_state(PendingAttachment::default());

        ctx.record_compute(NicknameValidation::default());
        ctx.record_compute(EmailValidation::default());
        ctx.record_compute(DescriptionValidation::default());
        ctx.record_compute(EditSubmitEnabled::default());
        ctx.record_compute(EditHeader::default());

        ctx.record_command(LoadUserCommand);
        ctx.record_command(SubmitUserCommand);
        ctx.record_command(AttachFileCommand);

        ctx.validate()?;
        ctx.run_computed();
        Ok(Self { ctx })
    }

    pub fn set_nickname(&mut self, value: impl Into<String>) -> roster_states::Result<()> {
        self.ctx.set(Nickname(value.into()))
    }

    pub fn set_email(&mut self, value: impl Into<String>) -> roster_states::Result<()> {
        self.ctx.set(Email(value.into()))
    }

    pub fn set_description(&mut self, value: impl Into<String>) -> roster_states::Result<()> {
        self.ctx.set(Description(value.into()))
    }

    pub fn load(&mut self) -> roster_states::Result<TaskHandle> {
        self.ctx.dispatch::<LoadUserCommand>()
    }

    pub fn submit(&mut self) -> roster_states::Result<TaskHandle> {
        self.ctx.dispatch::<SubmitUserCommand>()
    }

    pub fn attach(
        &mut self,
        handle: impl Into<String>,
        kind: AttachmentKind,
    ) -> roster_states::Result<TaskHandle> {
        self.ctx.set(PendingAttachment(Some(AttachmentRequest {
            handle: handle.into(),
            kind,
        })))?;
        self.ctx.dispatch::<AttachFileCommand>()
    }

    /// Leaves without saving.
    pub fn cancel(&mut self) -> roster_states::Result<()> {
        emit_now(&mut self.ctx, Navigation::Back)
    }

    /// Cancels in-flight work; nothing it produces reaches the form afterwards.
    pub fn close(&mut self) {
        self.ctx.close();
    }

    pub fn navigation(&mut self) -> roster_states::Result<Receiver<Navigation>> {
        self.ctx.attach_events::<Navigation>()
    }

    pub fn messages(&mut self) -> roster_states::Result<Receiver<UserMessage>> {
        self.ctx.attach_events::<UserMessage>()
    }

    pub fn watch_submit_enabled(&mut self) -> roster_states::Result<Receiver<EditSubmitEnabled>> {
        self.ctx.watch::<EditSubmitEnabled>()
    }

    /// Applies completed work. Call from the presentation loop.
    pub fn sync(&mut self) {
        self.ctx.sync_computes();
    }

    /// Waits for every in-flight command and applies its results.
    pub async fn settle(&mut self) {
        self.ctx.flush_and_await().await;
    }

    pub fn header(&self) -> &'static str {
        self.ctx.cached::<EditHeader>().map_or(ADD_USER_HEADER, |h| h.0)
    }

    pub fn nickname(&self) -> &str {
        self.ctx.state::<Nickname>().map_or("", |v| v.0.as_str())
    }

    pub fn email(&self) -> &str {
        self.ctx.state::<Email>().map_or("", |v| v.0.as_str())
    }

    pub fn description(&self) -> &str {
        self.ctx.state::<Description>().map_or("", |v| v.0.as_str())
    }

    pub fn avatar(&self) -> Option<&[u8]> {
        self.ctx.state::<Avatar>().and_then(|v| v.0.as_deref())
    }

    pub fn id_scan(&self) -> Option<&[u8]> {
        self.ctx.state::<IdScan>().and_then(|v| v.0.as_deref())
    }

    pub fn nickname_validation(&self) -> &str {
        self.ctx.cached::<NicknameValidation>().map_or("", |v| v.0.as_str())
    }

    pub fn email_validation(&self) -> &str {
        self.ctx.cached::<EmailValidation>().map_or("", |v| v.0.as_str())
    }

    pub fn description_validation(&self) -> &str {
        self.ctx.cached::<DescriptionValidation>().map_or("", |v| v.0.as_str())
    }

    pub fn submit_enabled(&self) -> bool {
        self.ctx.cached::<EditSubmitEnabled>().is_some_and(|v| v.0)
    }

    pub fn busy(&self) -> bool {
        self.ctx.state::<EditBusy>().is_some_and(|v| v.0)
    }

    pub fn status(&self) -> ScreenStatus {
        self.ctx.state::<EditStatus>().map(|v| v.0).unwrap_or_default()
    }

    pub fn ctx(&self) -> &StateCtx {
        &self.ctx
    }

    pub fn ctx_mut(&mut self) -> &mut StateCtx {
        &mut self.ctx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Latency, MemoryAssetStore, MemoryStorageLoader, MemoryUserStore};

    fn use_cases() -> Arc<UserUseCases> {
        Arc::new(UserUseCases::new(
            Arc::new(MemoryUserStore::new(Latency::none())),
            Arc::new(MemoryAssetStore::new(Latency::none())),
            Arc::new(MemoryStorageLoader::new()),
        ))
    }

    fn fill(screen: &mut UserEditScreen, nickname: &str, email: &str, description: &str) {
        screen.set_nickname(nickname).unwrap();
        screen.set_email(email).unwrap();
        screen.set_description(description).unwrap();
    }

    #[test]
    fn test_header_depends_on_target() {
        let add = UserEditScreen::new(use_cases(), None).unwrap();
        assert_eq!(add.header(), ADD_USER_HEADER);

        let blank = UserEditScreen::new(use_cases(), Some("")).unwrap();
        assert_eq!(blank.header(), ADD_USER_HEADER);

        let edit = UserEditScreen::new(use_cases(), Some("u1")).unwrap();
        assert_eq!(edit.header(), EDIT_USER_HEADER);
    }

    #[test]
    fn test_valid_fields_enable_submit() {
        let mut screen = UserEditScreen::new(use_cases(), None).unwrap();
        assert!(!screen.submit_enabled());

        fill(&mut screen, "Nick", "nick@test.com", "Some text");
        assert!(screen.submit_enabled());
    }

    #[test]
    fn test_any_single_violation_disables_submit() {
        let cases = [
            ("Nickname_way_too_long", "nick@test.com", "Some text"),
            ("Nick", "not-an-email", "Some text"),
            ("Nick", "nick@test.com", "No punctuation!"),
            ("", "nick@test.com", "Some text"),
            ("Nick", "", "Some text"),
            ("Nick", "nick@test.com", ""),
        ];

        for (nickname, email, description) in cases {
            let mut screen = UserEditScreen::new(use_cases(), None).unwrap();
            fill(&mut screen, nickname, email, description);
            assert!(
                !screen.submit_enabled(),
                "submit enabled for {nickname:?} / {email:?} / {description:?}"
            );
        }
    }

    #[test]
    fn test_validation_messages_follow_each_field() {
        let mut screen = UserEditScreen::new(use_cases(), None).unwrap();

        screen.set_nickname("Nickname_way_too_long").unwrap();
        assert_eq!(screen.nickname_validation(), validation::NICKNAME_MESSAGE);
        assert_eq!(screen.email_validation(), "");

        screen.set_nickname("Short").unwrap();
        assert_eq!(screen.nickname_validation(), "");
    }

    #[test]
    fn test_submit_enabled_is_recomputed_continuously() {
        let mut screen = UserEditScreen::new(use_cases(), None).unwrap();
        let recv = screen.watch_submit_enabled().unwrap();

        fill(&mut screen, "Nick", "nick@test.com", "Some text");
        screen.set_email("broken").unwrap();
        screen.set_email("nick@test.com").unwrap();

        let seen: Vec<bool> = recv.try_iter().map(|v| v.0).collect();
        assert_eq!(seen, vec![false, true, false, true]);
    }

    #[tokio::test]
    async fn test_cancel_emits_back() {
        let mut screen = UserEditScreen::new(use_cases(), None).unwrap();
        let navigation = screen.navigation().unwrap();

        screen.cancel().unwrap();

        assert_eq!(navigation.try_recv().ok(), Some(Navigation::Back));
    }

    #[tokio::test]
    async fn test_load_without_target_is_ready_immediately() {
        let mut screen = UserEditScreen::new(use_cases(), None).unwrap();
        let _task = screen.load().unwrap();

        assert_eq!(screen.status(), ScreenStatus::Ready);
        assert!(!screen.busy());
    }
}
