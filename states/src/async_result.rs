//! `AsyncResult`: a lazy, composable unit of deferred work.
//!
//! Resolves exactly once to a value, an empty completion (`AsyncResult<(), E>`)
//! or an error. Nothing runs until it is awaited or subscribed.

use std::any::TypeId;
use std::fmt::{Debug, Formatter};
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;

use crate::{TaskHandle, TaskId};

pub type BoxResultFuture<T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'static>>;

#[must_use = "an AsyncResult does nothing unless awaited or subscribed"]
pub struct AsyncResult<T, E> {
    inner: BoxResultFuture<T, E>,
}

impl<T, E> AsyncResult<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
    {
        Self {
            inner: Box::pin(future),
        }
    }

    pub fn ok(value: T) -> Self {
        Self::new(async move { Ok(value) })
    }

    pub fn err(error: E) -> Self {
        Self::new(async move { Err(error) })
    }

    /// Waits `delay` before running `future`. A zero delay does not touch the timer.
    pub fn delayed<F>(delay: Duration, future: F) -> Self
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
    {
        Self::new(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            future.await
        })
    }

    pub fn map<U, F>(self, f: F) -> AsyncResult<U, E>
    where
        U: Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        AsyncResult::new(async move { self.inner.await.map(f) })
    }

    pub fn map_err<E2, F>(self, f: F) -> AsyncResult<T, E2>
    where
        E2: Send + 'static,
        F: FnOnce(E) -> E2 + Send + 'static,
    {
        AsyncResult::new(async move { self.inner.await.map_err(f) })
    }

    /// Chains dependent work on the value (flat-map).
    pub fn and_then<U, F>(self, f: F) -> AsyncResult<U, E>
    where
        U: Send + 'static,
        F: FnOnce(T) -> AsyncResult<U, E> + Send + 'static,
    {
        AsyncResult::new(async move {
            let value = self.inner.await?;
            f(value).inner.await
        })
    }

    /// Runs `next` after `self` succeeds, discarding `self`'s value.
    pub fn then<U>(self, next: AsyncResult<U, E>) -> AsyncResult<U, E>
    where
        U: Send + 'static,
    {
        AsyncResult::new(async move {
            self.inner.await?;
            next.inner.await
        })
    }

    /// Runs both concurrently; the first error wins.
    pub fn zip<U>(self, other: AsyncResult<U, E>) -> AsyncResult<(T, U), E>
    where
        U: Send + 'static,
    {
        AsyncResult::new(async move { tokio::try_join!(self.inner, other.inner) })
    }

    /// Recovers from any error with a fallback value.
    pub fn or_else_value<F>(self, fallback: F) -> Self
    where
        F: FnOnce(E) -> T + Send + 'static,
    {
        Self::new(async move { Ok(self.inner.await.unwrap_or_else(fallback)) })
    }

    /// Runs the work on `handle`'s runtime instead of wherever it is awaited.
    pub fn subscribe_on(self, handle: &Handle) -> Self
    where
        E: From<JoinError>,
    {
        let handle = handle.clone();
        Self::new(async move {
            match handle.spawn(self.inner).await {
                Ok(result) => result,
                Err(join_error) => Err(E::from(join_error)),
            }
        })
    }

    /// Starts the work on `handle` and reports the outcome to exactly one callback.
    ///
    /// Once the returned handle is cancelled neither callback runs.
    pub fn subscribe<S, F>(self, handle: &Handle, on_success: S, on_error: F) -> TaskHandle
    where
        S: FnOnce(T) + Send + 'static,
        F: FnOnce(E) + Send + 'static,
    {
        let token = CancellationToken::new();
        let task = TaskHandle::new(TaskId::next(TypeId::of::<Self>()), token.clone());

        drop(handle.spawn(async move {
            tokio::select! {
                biased;
                () = token.cancelled() => {}
                result = self.inner => {
                    if token.is_cancelled() {
                        return;
                    }
                    match result {
                        Ok(value) => on_success(value),
                        Err(error) => on_error(error),
                    }
                }
            }
        }));

        task
    }
}

impl<E> AsyncResult<(), E>
where
    E: Send + 'static,
{
    /// An already-finished empty completion.
    pub fn complete() -> Self {
        Self::ok(())
    }
}

impl<T, E> IntoFuture for AsyncResult<T, E> {
    type Output = Result<T, E>;
    type IntoFuture = BoxResultFuture<T, E>;

    fn into_future(self) -> Self::IntoFuture {
        self.inner
    }
}

impl<T, E> Debug for AsyncResult<T, E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncResult")
            .field("output", &std::any::type_name::<Result<T, E>>())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[derive(Debug, PartialEq)]
    enum TestError {
        Boom,
        Join,
    }

    impl From<JoinError> for TestError {
        fn from(_: JoinError) -> Self {
            Self::Join
        }
    }

    type Res<T> = AsyncResult<T, TestError>;

    #[tokio::test]
    async fn test_map_and_then_chain() {
        let result = Res::ok(2)
            .map(|v| v * 10)
            .and_then(|v| Res::ok(v + 1))
            .await;
        assert_eq!(result, Ok(21));
    }

    #[tokio::test]
    async fn test_and_then_is_skipped_on_error() {
        let called = Arc::new(AtomicUsize::new(0));
        let counter = called.clone();

        let result = Res::<u32>::err(TestError::Boom)
            .and_then(move |v| {
                counter.fetch_add(1, Ordering::SeqCst);
                Res::ok(v)
            })
            .await;

        assert_eq!(result, Err(TestError::Boom));
        assert_eq!(called.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_then_discards_previous_value() {
        let result = Res::ok("ignored").then(Res::ok(7)).await;
        assert_eq!(result, Ok(7));

        let result = Res::<()>::err(TestError::Boom).then(Res::ok(7)).await;
        assert_eq!(result, Err(TestError::Boom));
    }

    #[tokio::test]
    async fn test_zip_joins_both_values() {
        let result = Res::ok(1).zip(Res::ok("one")).await;
        assert_eq!(result, Ok((1, "one")));

        let result = Res::ok(1).zip(Res::<u8>::err(TestError::Boom)).await;
        assert_eq!(result, Err(TestError::Boom));
    }

    #[tokio::test]
    async fn test_or_else_value_recovers() {
        let result = Res::<Option<u8>>::err(TestError::Boom)
            .or_else_value(|_| None)
            .await;
        assert_eq!(result, Ok(None));
    }

    #[tokio::test]
    async fn test_map_err_converts_error() {
        let result = Res::<u8>::err(TestError::Boom)
            .map_err(|_| "converted")
            .await;
        assert_eq!(result, Err("converted"));
    }

    #[tokio::test]
    async fn test_complete_resolves_empty() {
        assert_eq!(Res::<()>::complete().await, Ok(()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_waits_for_the_latency() {
        let start = tokio::time::Instant::now();
        let result = Res::delayed(Duration::from_millis(300), async { Ok(5) }).await;

        assert_eq!(result, Ok(5));
        assert!(start.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test]
    async fn test_lazy_until_awaited() {
        let called = Arc::new(AtomicUsize::new(0));
        let counter = called.clone();

        let pending = Res::new(async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        tokio::task::yield_now().await;
        assert_eq!(called.load(Ordering::SeqCst), 0);

        pending.await.unwrap();
        assert_eq!(called.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_subscribe_on_runs_on_the_given_runtime() {
        let handle = Handle::current();
        let result = Res::ok(3).subscribe_on(&handle).await;
        assert_eq!(result, Ok(3));
    }

    #[tokio::test]
    async fn test_subscribe_delivers_success() {
        let (send, recv) = flume::bounded(1);
        let _task = Res::ok(9).subscribe(
            &Handle::current(),
            move |v| {
                let _sent = send.send(v);
            },
            |_| {},
        );

        assert_eq!(recv.recv_async().await.ok(), Some(9));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_subscription_never_calls_back() {
        let calls = Arc::new(AtomicUsize::new(0));
        let on_ok = calls.clone();
        let on_err = calls.clone();

        let task = Res::delayed(Duration::from_millis(50), async { Ok(1) }).subscribe(
            &Handle::current(),
            move |_| {
                on_ok.fetch_add(1, Ordering::SeqCst);
            },
            move |_| {
                on_err.fetch_add(1, Ordering::SeqCst);
            },
        );
        task.cancel();

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
