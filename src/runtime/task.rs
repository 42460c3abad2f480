//! Task records for the worker pool and lab runtimes.
//!
//! A task record owns everything the scheduler needs between polls: the
//! stored future, the task's [`FlowCx`] handle, and the wake flag that
//! dedups wakeups. Records live in a generational arena keyed by
//! [`TaskId`]; removing the record at completion is what releases the
//! task's context storage.

use crate::cx::FlowCx;
use crate::types::TaskId;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// The future type stored in task records.
pub(crate) type StoredFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// The state of a task in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TaskState {
    /// Spawned but not yet polled.
    Created,
    /// Actively being polled on some worker.
    Running,
    /// Returned `Pending`; waiting for its waker to fire.
    Suspended,
}

/// Dedups wakeups between polls.
///
/// A task can be woken many times while suspended (or even while running),
/// but it must be queued at most once. `notify` reports whether this call
/// was the one that armed the flag; only that caller pushes the task.
#[derive(Debug, Default)]
pub(crate) struct WakeFlag {
    notified: AtomicBool,
}

impl WakeFlag {
    pub(crate) fn new() -> Self {
        Self {
            notified: AtomicBool::new(false),
        }
    }

    /// Marks the task notified. Returns true if the flag was previously clear.
    pub(crate) fn notify(&self) -> bool {
        !self.notified.swap(true, Ordering::AcqRel)
    }

    /// Re-arms the flag. Called at the start of a poll so wakeups that
    /// arrive during the poll are observed afterwards.
    pub(crate) fn clear(&self) {
        self.notified.store(false, Ordering::Release);
    }

    /// Reads the flag without changing it.
    pub(crate) fn is_notified(&self) -> bool {
        self.notified.load(Ordering::Acquire)
    }
}

/// Internal record for a live task.
pub(crate) struct TaskRecord {
    /// Unique identifier for this task.
    pub(crate) id: TaskId,
    /// The task's context handle. Clones of this are installed around polls.
    pub(crate) cx: FlowCx,
    /// Current lifecycle state.
    pub(crate) state: TaskState,
    /// The stored future; `None` while a worker holds it for polling.
    pub(crate) future: Option<StoredFuture>,
    /// Wakeup dedup flag shared with this task's wakers.
    pub(crate) wake_state: Arc<WakeFlag>,
    /// Index of the worker that last polled this task.
    pub(crate) last_worker: Option<usize>,
    /// Number of polls so far.
    pub(crate) polls: u64,
}

impl TaskRecord {
    pub(crate) fn new(id: TaskId, cx: FlowCx, future: StoredFuture) -> Self {
        Self {
            id,
            cx,
            state: TaskState::Created,
            future: Some(future),
            wake_state: Arc::new(WakeFlag::new()),
            last_worker: None,
            polls: 0,
        }
    }

    /// Marks the task running and accounts the poll.
    ///
    /// Returns true if the task was not already running.
    pub(crate) fn start_running(&mut self, worker: usize) -> bool {
        self.polls += 1;
        self.last_worker = Some(worker);
        match self.state {
            TaskState::Created | TaskState::Suspended => {
                self.state = TaskState::Running;
                true
            }
            TaskState::Running => false,
        }
    }

    /// Marks the task suspended after a `Pending` poll.
    pub(crate) fn suspend(&mut self) {
        self.state = TaskState::Suspended;
    }

    /// Takes the stored future for polling.
    pub(crate) fn take_future(&mut self) -> Option<StoredFuture> {
        self.future.take()
    }

    /// Puts the future back after a `Pending` poll.
    pub(crate) fn store_future(&mut self, future: StoredFuture) {
        self.future = Some(future);
    }
}

impl fmt::Debug for TaskRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRecord")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("polls", &self.polls)
            .field("last_worker", &self.last_worker)
            .field("has_future", &self.future.is_some())
            .finish()
    }
}

/// Renders a `catch_unwind` payload for the panic log line.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string())
}
