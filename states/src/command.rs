use std::future::Future;
use std::pin::Pin;

use tokio_util::sync::CancellationToken;

use crate::{CommandSnapshot, Updater};

pub type CommandFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// A manually dispatched side effect.
///
/// `run` is called on the presentation context with an owned snapshot of the
/// cells. Anything pushed through `updater` before the future is returned is
/// applied as part of the dispatch itself, so a command flips its busy flag
/// synchronously and does the rest inside the future.
///
/// The returned future runs on the `io` context and is dropped as soon as
/// `cancel` fires.
pub trait Command: Send + Sync + 'static {
    fn run(
        &self,
        snap: CommandSnapshot,
        updater: Updater,
        cancel: CancellationToken,
    ) -> CommandFuture;
}
