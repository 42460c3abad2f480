//! Global injection queue.
//!
//! A thread-safe unbounded FIFO of runnable task ids. Spawns and wakeups
//! push here; idle workers pop. Entries are ids, not records, so a stale
//! entry for a task that completed in the meantime is harmless: the worker
//! that pops it finds no stored future and moves on.

use crate::types::TaskId;
use crossbeam_queue::SegQueue;

/// The shared run queue.
#[derive(Debug, Default)]
pub(crate) struct RunQueue {
    inner: SegQueue<TaskId>,
}

impl RunQueue {
    /// Creates an empty queue.
    pub(crate) fn new() -> Self {
        Self {
            inner: SegQueue::new(),
        }
    }

    /// Pushes a runnable task.
    pub(crate) fn push(&self, task: TaskId) {
        self.inner.push(task);
    }

    /// Pops the oldest runnable task.
    pub(crate) fn pop(&self) -> Option<TaskId> {
        self.inner.pop()
    }

    /// Returns the number of queued tasks.
    pub(crate) fn len(&self) -> usize {
        self.inner.len()
    }
}
