//! One-shot events.
//!
//! Navigation commands and user-facing messages are not state: they must reach
//! the consumer that is attached right now, exactly once, and must not be replayed
//! to whoever attaches later. `EventChannel` is a cell holding the sender side of
//! the current consumer's channel.

use std::any::Any;

use flume::{Receiver, Sender};
use log::debug;

use crate::State;

pub struct EventChannel<T> {
    consumer: Option<Sender<T>>,
}

impl<T> Default for EventChannel<T> {
    fn default() -> Self {
        Self { consumer: None }
    }
}

impl<T: Send + 'static> EventChannel<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a new consumer. The previous consumer, if any, stops receiving.
    pub fn attach(&mut self) -> Receiver<T> {
        let (send, recv) = flume::unbounded();
        self.consumer = Some(send);
        recv
    }

    pub fn detach(&mut self) {
        self.consumer = None;
    }

    pub fn is_attached(&self) -> bool {
        self.consumer
            .as_ref()
            .is_some_and(|consumer| !consumer.is_disconnected())
    }

    /// Delivers `event` to the attached consumer.
    ///
    /// Returns `false` when nobody is listening; the event is dropped.
    pub fn emit(&mut self, event: T) -> bool {
        let Some(consumer) = &self.consumer else {
            debug!(
                "No consumer attached, dropping {} event",
                std::any::type_name::<T>()
            );
            return false;
        };

        if consumer.send(event).is_ok() {
            true
        } else {
            self.consumer = None;
            false
        }
    }
}

impl<T: Send + 'static> State for EventChannel<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl<T> std::fmt::Debug for EventChannel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventChannel")
            .field("event", &std::any::type_name::<T>())
            .field("attached", &self.consumer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_without_consumer_is_dropped() {
        let mut channel = EventChannel::<u32>::new();
        assert!(!channel.emit(1));

        let recv = channel.attach();
        assert!(recv.try_recv().is_err());
    }

    #[test]
    fn test_event_is_delivered_once() {
        let mut channel = EventChannel::<&'static str>::new();
        let recv = channel.attach();

        assert!(channel.emit("back"));

        assert_eq!(recv.try_recv().ok(), Some("back"));
        assert!(recv.try_recv().is_err());
    }

    #[test]
    fn test_late_consumer_does_not_see_earlier_events() {
        let mut channel = EventChannel::<u32>::new();
        let first = channel.attach();
        channel.emit(1);

        let second = channel.attach();
        channel.emit(2);

        assert_eq!(first.try_iter().collect::<Vec<_>>(), vec![1]);
        assert_eq!(second.try_iter().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn test_dropped_consumer_detaches() {
        let mut channel = EventChannel::<u32>::new();
        let recv = channel.attach();
        assert!(channel.is_attached());

        drop(recv);

        assert!(!channel.emit(3));
        assert!(!channel.is_attached());
    }
}
