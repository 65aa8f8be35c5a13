//! Execution contexts.
//!
//! Store and use-case work runs on the `io` context, CPU-bound transforms on the
//! `computation` context. The presentation context is not a runtime at all: it is
//! whoever owns the [`StateCtx`](crate::StateCtx) and calls `sync_computes()`.

use tokio::runtime::{Builder, Handle, Runtime};

#[derive(Debug, Clone)]
pub struct Schedulers {
    io: Handle,
    computation: Handle,
}

impl Schedulers {
    pub fn new(io: Handle, computation: Handle) -> Self {
        Self { io, computation }
    }

    /// Both contexts on the ambient runtime. `None` outside a tokio runtime.
    pub fn current() -> Option<Self> {
        Handle::try_current().ok().map(|handle| Self {
            io: handle.clone(),
            computation: handle,
        })
    }

    pub fn io(&self) -> &Handle {
        &self.io
    }

    pub fn computation(&self) -> &Handle {
        &self.computation
    }
}

/// Owns dedicated runtimes for the `io` and `computation` contexts.
///
/// Must be dropped outside of any async context.
#[derive(Debug)]
pub struct DedicatedRuntimes {
    io: Runtime,
    computation: Runtime,
}

impl DedicatedRuntimes {
    pub fn build(io_threads: usize, computation_threads: usize) -> std::io::Result<Self> {
        let io = Builder::new_multi_thread()
            .worker_threads(io_threads.max(1))
            .thread_name("roster-io")
            .enable_time()
            .build()?;
        let computation = Builder::new_multi_thread()
            .worker_threads(computation_threads.max(1))
            .thread_name("roster-computation")
            .enable_time()
            .build()?;

        Ok(Self { io, computation })
    }

    pub fn schedulers(&self) -> Schedulers {
        Schedulers::new(self.io.handle().clone(), self.computation.handle().clone())
    }
}
