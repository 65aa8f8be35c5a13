use std::any::{Any, TypeId, type_name};

use flume::{Receiver, Sender};
use log::trace;
use tokio_util::sync::CancellationToken;

use crate::State;

type Apply = Box<dyn FnOnce(&mut dyn Any) + Send>;

/// A deferred mutation of one cell, produced off the presentation context.
pub(crate) struct Envelope {
    pub(crate) id: TypeId,
    pub(crate) name: &'static str,
    pub(crate) apply: Apply,
    pub(crate) token: CancellationToken,
}

/// Channel carrying cell mutations back to the context that owns the cells.
#[derive(Debug)]
pub struct StateRuntime {
    send: Sender<Envelope>,
    recv: Receiver<Envelope>,
}

impl Default for StateRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl StateRuntime {
    pub fn new() -> Self {
        let (send, recv) = flume::unbounded();
        Self { send, recv }
    }

    pub fn updater(&self, token: CancellationToken) -> Updater {
        Updater {
            send: self.send.clone(),
            token,
        }
    }

    pub(crate) fn drain(&self) -> impl Iterator<Item = Envelope> + '_ {
        self.recv.try_iter()
    }

    pub fn pending(&self) -> usize {
        self.recv.len()
    }
}

impl std::fmt::Debug for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Envelope")
            .field("cell", &self.name)
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}

/// Sends cell mutations to the owning [`StateCtx`](crate::StateCtx).
///
/// Nothing is applied until the owner calls `sync_computes()`. An updater is
/// bound to the cancellation token of the task that received it: once that
/// token is cancelled, its mutations are dropped on both ends of the channel.
#[derive(Clone)]
pub struct Updater {
    send: Sender<Envelope>,
    token: CancellationToken,
}

impl Updater {
    pub fn update<T: State>(&self, f: impl FnOnce(&mut T) + Send + 'static) {
        if self.token.is_cancelled() {
            trace!("Dropping update of {} from a cancelled task", type_name::<T>());
            return;
        }

        let apply: Apply = Box::new(move |any: &mut dyn Any| {
            if let Some(state) = any.downcast_mut::<T>() {
                f(state);
            }
        });

        let envelope = Envelope {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
            apply,
            token: self.token.clone(),
        };

        // The receiver lives as long as the context; a send error means the screen is gone.
        if self.send.send(envelope).is_err() {
            trace!("State context dropped before update of {}", type_name::<T>());
        }
    }

    pub fn set<T: State>(&self, value: T) {
        self.update(move |state: &mut T| *state = value);
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl std::fmt::Debug for Updater {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Updater")
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impl_state;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Flag(bool);

    impl_state!(Flag);

    #[test]
    fn test_set_is_delivered_through_the_channel() {
        let runtime = StateRuntime::new();
        let updater = runtime.updater(CancellationToken::new());

        updater.set(Flag(true));
        assert_eq!(runtime.pending(), 1);

        let mut flag = Flag(false);
        for envelope in runtime.drain() {
            assert_eq!(envelope.id, TypeId::of::<Flag>());
            (envelope.apply)(flag.as_any_mut());
        }
        assert_eq!(flag, Flag(true));
    }

    #[test]
    fn test_cancelled_updater_sends_nothing() {
        let runtime = StateRuntime::new();
        let token = CancellationToken::new();
        let updater = runtime.updater(token.clone());

        token.cancel();
        updater.set(Flag(true));

        assert!(updater.is_cancelled());
        assert_eq!(runtime.pending(), 0);
    }
}
