//! Reactive cells, derived computes and cancellable commands.
//!
//! A [`StateCtx`] owns the cells of one screen. Primitive cells are [`State`]s,
//! derived cells are [`Compute`]s recomputed in topological order whenever an
//! upstream cell changes, and side effects are [`Command`]s dispatched onto the
//! `io` context that report back through an [`Updater`].

mod async_result;
mod command;
mod compute;
mod ctx;
mod dep;
mod error;
mod event;
mod graph;
mod runtime;
mod schedulers;
mod snapshot;
mod state;
mod state_sync_status;
mod task;

pub use async_result::{AsyncResult, BoxResultFuture};
pub use command::{Command, CommandFuture};
pub use compute::Compute;
pub use ctx::StateCtx;
pub use dep::Dep;
pub use error::{Error, Result};
pub use event::EventChannel;
pub use graph::{DepRoute, Graph, TopologyError};
pub use runtime::{StateRuntime, Updater};
pub use schedulers::{DedicatedRuntimes, Schedulers};
pub use snapshot::CommandSnapshot;
pub use state::State;
pub use state_sync_status::StateSyncStatus;
pub use task::{TaskHandle, TaskId};
