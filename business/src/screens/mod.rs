//! Presentation state of the three screens.
//!
//! Each screen owns a [`StateCtx`]: primitive cells for the form fields,
//! computes for validation and submit readiness, and commands that call the
//! use-cases on the `io` context. Navigation and user messages are one-shot
//! events, never stored values.

use std::sync::Arc;

use log::trace;
use roster_states::{EventChannel, Schedulers, StateCtx, Updater, impl_state};
use ustr::Ustr;

use crate::UserUseCases;

pub mod password_change;
pub mod user_edit;
pub mod user_list;

pub const COMMUNICATION_ERROR: &str = "Communication error, please try again";
pub const USER_DELETED: &str = "User deleted.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Back,
    /// `None` opens the form for a new user.
    UserEdit(Option<Ustr>),
    PasswordChange(Ustr),
}

/// A message shown once to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserMessage(pub String);

impl UserMessage {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Lifecycle shared by all screens.
///
/// `Idle -> Loading -> Ready | Failed`, `Ready -> Submitting -> Closed | Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScreenStatus {
    #[default]
    Idle,
    Loading,
    Ready,
    Failed,
    Submitting,
    Closed,
}

/// The use-cases, carried as a cell so commands find them in their snapshot.
#[derive(Debug, Clone)]
pub struct UseCases(pub Arc<UserUseCases>);

impl_state!(UseCases);

pub(crate) fn screen_ctx(use_cases: Arc<UserUseCases>, schedulers: Option<Schedulers>) -> StateCtx {
    let mut ctx = schedulers.map_or_else(StateCtx::new, StateCtx::with_schedulers);
    ctx.add_state(UseCases(use_cases));
    ctx.add_state(EventChannel::<Navigation>::new());
    ctx.add_state(EventChannel::<UserMessage>::new());
    ctx
}

/// Queues `event` for the consumer attached when the updater's batch is applied.
pub(crate) fn emit<T: Send + 'static>(updater: &Updater, event: T) {
    trace!("Emitting {}", std::any::type_name::<T>());
    updater.update::<EventChannel<T>>(move |channel| {
        channel.emit(event);
    });
}

/// Same as [`emit`], from the presentation context.
pub(crate) fn emit_now<T: Send + 'static>(
    ctx: &mut StateCtx,
    event: T,
) -> roster_states::Result<()> {
    ctx.update::<EventChannel<T>>(move |channel| {
        channel.emit(event);
    })
}
