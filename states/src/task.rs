//! Handles for dispatched async work.
//!
//! Every command dispatch and every [`AsyncResult::subscribe`](crate::AsyncResult::subscribe)
//! yields a [`TaskHandle`]. Cancellation is cooperative: the task races its work
//! against the token, and updates coming from a cancelled task are discarded
//! before they reach any cell.

use std::any::TypeId;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio_util::sync::CancellationToken;

static GENERATION: AtomicU64 = AtomicU64::new(1);

/// Identifies a spawned task: the command (or result) type plus a generation.
///
/// Generations grow monotonically across the process, so a newer task of the
/// same type always compares greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId {
    type_id: TypeId,
    generation: u64,
}

impl TaskId {
    pub fn new(type_id: TypeId, generation: u64) -> Self {
        Self {
            type_id,
            generation,
        }
    }

    /// Allocates the next generation for `type_id`.
    pub fn next(type_id: TypeId) -> Self {
        Self::new(type_id, GENERATION.fetch_add(1, Ordering::Relaxed))
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Cancellable handle to a spawned task. Clones share the same token.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    id: TaskId,
    cancel_token: CancellationToken,
}

impl TaskHandle {
    pub fn new(id: TaskId, cancel_token: CancellationToken) -> Self {
        Self { id, cancel_token }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// After this returns, no callback or cell update of the task is delivered.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_id_new_and_accessors() {
        let type_id = TypeId::of::<String>();
        let task_id = TaskId::new(type_id, 42);

        assert_eq!(task_id.type_id(), type_id);
        assert_eq!(task_id.generation(), 42);
    }

    #[test]
    fn test_next_generation_is_increasing() {
        let type_id = TypeId::of::<String>();
        let first = TaskId::next(type_id);
        let second = TaskId::next(type_id);

        assert_eq!(first.type_id(), second.type_id());
        assert!(second.generation() > first.generation());
        assert_ne!(first, second);
    }

    #[test]
    fn test_task_handle_cancel_is_shared_by_clones() {
        let handle = TaskHandle::new(TaskId::next(TypeId::of::<u8>()), CancellationToken::new());
        let cloned = handle.clone();
        let token = handle.cancellation_token();

        assert!(!cloned.is_cancelled());
        handle.cancel();

        assert!(cloned.is_cancelled());
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_child_token_follows_parent() {
        let parent = CancellationToken::new();
        let handle = TaskHandle::new(TaskId::next(TypeId::of::<u8>()), parent.child_token());

        parent.cancel();
        assert!(handle.is_cancelled());
    }
}
