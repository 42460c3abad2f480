//! Worker threads for the pool runtime.
//!
//! Each worker loops over the shared run queue: pop a task id, move its
//! stored future out of the pool state, poll it with the task's [`FlowCx`]
//! installed on the thread, then put the future back (or retire the record).
//! The pool state lock is never held across a poll, so a slow future cannot
//! serialize unrelated tasks' bookkeeping, and `get()`/`set()` on other
//! workers proceed untouched.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Condvar, Mutex};
use std::task::{Context, Poll, Wake, Waker};

use crate::cx::FlowCx;
use crate::runtime::pool::PoolShared;
use crate::runtime::task::{panic_message, WakeFlag};
use crate::tracing_compat::{debug, trace, warn};
use crate::types::TaskId;

/// A single pool worker, owned by its OS thread.
pub(crate) struct Worker {
    /// Position in the pool's worker (and parker) vectors.
    index: usize,
    shared: Arc<PoolShared>,
}

impl Worker {
    pub(crate) fn new(index: usize, shared: Arc<PoolShared>) -> Self {
        Self { index, shared }
    }

    fn parker(&self) -> &Parker {
        &self.shared.parkers[self.index]
    }

    /// Runs until the pool signals shutdown.
    ///
    /// Queued tasks that have not started when shutdown is observed are
    /// dropped by the shutdown drain, which releases their context storage.
    pub(crate) fn run_loop(&self) {
        trace!(worker = self.index, "worker started");
        while !self.shared.shutdown.load(Ordering::Acquire) {
            if let Some(task) = self.shared.queue.pop() {
                self.execute(task);
                continue;
            }
            self.parker().park();
        }
        trace!(worker = self.index, "worker stopped");
    }

    /// Polls one task once.
    #[cfg_attr(not(feature = "tracing-integration"), allow(unused_variables))]
    fn execute(&self, task: TaskId) {
        let (mut future, task_cx, wake_state) = {
            let mut state = self.shared.state.lock().expect("pool state lock poisoned");
            let Some(record) = state.tasks.get_mut(task.arena_index()) else {
                // Stale queue entry: the task already completed and its
                // record (context included) is gone.
                return;
            };
            let Some(future) = record.take_future() else {
                // Another worker holds the future right now. Its wake flag
                // is armed, so that worker will requeue the task when the
                // poll returns pending.
                return;
            };
            record.start_running(self.index);
            record.wake_state.clear();
            (future, record.cx.clone(), Arc::clone(&record.wake_state))
        };

        let waker = Waker::from(Arc::new(PoolWaker {
            task,
            wake_state: Arc::clone(&wake_state),
            shared: Arc::clone(&self.shared),
        }));
        let mut poll_cx = Context::from_waker(&waker);

        trace!(task = %task, worker = self.index, "polling task");
        let _cx_guard = FlowCx::install(Some(task_cx));
        let outcome = catch_unwind(AssertUnwindSafe(|| future.as_mut().poll(&mut poll_cx)));

        match outcome {
            Ok(Poll::Ready(())) => {
                let mut state = self.shared.state.lock().expect("pool state lock poisoned");
                state.tasks.remove(task.arena_index());
                state.completed += 1;
                drop(state);
                debug!(task = %task, worker = self.index, "task completed");
            }
            Ok(Poll::Pending) => {
                let woken_during_poll = {
                    let mut state =
                        self.shared.state.lock().expect("pool state lock poisoned");
                    let Some(record) = state.tasks.get_mut(task.arena_index()) else {
                        return;
                    };
                    record.store_future(future);
                    record.suspend();
                    record.wake_state.is_notified()
                };
                // A wake that landed while we were polling found no stored
                // future to run; requeue now that the future is back.
                if woken_during_poll {
                    self.shared.queue.push(task);
                    self.shared.unpark_one();
                }
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                let mut state = self.shared.state.lock().expect("pool state lock poisoned");
                state.tasks.remove(task.arena_index());
                state.panicked += 1;
                drop(state);
                warn!(
                    task = %task,
                    worker = self.index,
                    panic = %message,
                    "task panicked; record and context released"
                );
            }
        }
    }
}

/// Waker that requeues its task on the shared run queue.
struct PoolWaker {
    task: TaskId,
    wake_state: Arc<WakeFlag>,
    shared: Arc<PoolShared>,
}

impl PoolWaker {
    fn schedule(&self) {
        // First notification wins; later wakes before the next poll are
        // deduplicated by the flag.
        if self.wake_state.notify() {
            self.shared.queue.push(self.task);
            self.shared.unpark_one();
        }
    }
}

impl Wake for PoolWaker {
    fn wake(self: Arc<Self>) {
        self.schedule();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.schedule();
    }
}

/// Blocking park/unpark for idle workers.
///
/// The flag is sticky: an unpark delivered while the worker is busy makes
/// its next park return immediately, so a queue push is never missed.
#[derive(Clone)]
pub(crate) struct Parker {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl Parker {
    pub(crate) fn new() -> Self {
        Self {
            inner: Arc::new((Mutex::new(false), Condvar::new())),
        }
    }

    /// Blocks the current thread until notified.
    pub(crate) fn park(&self) {
        let (lock, cvar) = &*self.inner;
        let mut notified = lock.lock().unwrap();
        while !*notified {
            notified = cvar.wait(notified).unwrap();
        }
        *notified = false;
    }

    /// Wakes the parked thread, or makes its next park return immediately.
    pub(crate) fn unpark(&self) {
        let (lock, cvar) = &*self.inner;
        let mut notified = lock.lock().unwrap();
        *notified = true;
        drop(notified);
        cvar.notify_one();
    }
}

impl std::fmt::Debug for Parker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parker").finish_non_exhaustive()
    }
}
