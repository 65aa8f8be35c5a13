use std::future::Future;
use std::time::Duration;

use crate::Deferred;

/// Simulated storage latency applied to every store call, success or failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Latency(Duration);

impl Latency {
    pub const fn new(delay: Duration) -> Self {
        Self(delay)
    }

    pub const fn from_millis(millis: u64) -> Self {
        Self(Duration::from_millis(millis))
    }

    pub const fn none() -> Self {
        Self(Duration::ZERO)
    }

    pub fn duration(self) -> Duration {
        self.0
    }

    pub fn defer<T, F>(self, work: F) -> Deferred<T>
    where
        T: Send + 'static,
        F: Future<Output = crate::Result<T>> + Send + 'static,
    {
        Deferred::delayed(self.0, work)
    }
}
