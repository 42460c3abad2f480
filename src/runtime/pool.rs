//! The thread-backed worker pool.
//!
//! [`WorkerPool`] owns a fixed set of worker threads that pull task ids
//! from a shared injection queue. Every spawned task gets a [`TaskRecord`]
//! in a generational arena; the record owns the task's future and its
//! [`FlowCx`], so retiring the record when the future completes (or
//! panics) releases the task's context storage without any cleanup call
//! from user code.
//!
//! The state mutex guards spawn and retire bookkeeping only. Context reads
//! and writes go through each task's own slot and never touch it.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crate::config::PoolConfig;
use crate::cx::FlowCx;
use crate::error::{Error, Result, ResultExt};
use crate::runtime::queue::RunQueue;
use crate::runtime::task::TaskRecord;
use crate::runtime::worker::{Parker, Worker};
use crate::tracing_compat::{debug, info, warn};
use crate::types::{AmbientContext, TaskId};
use crate::util::Arena;

/// Bookkeeping shared by every worker and handle.
pub(crate) struct PoolShared {
    pub(crate) state: Mutex<PoolState>,
    pub(crate) queue: RunQueue,
    pub(crate) shutdown: AtomicBool,
    pub(crate) parkers: Vec<Parker>,
    next_unpark: AtomicUsize,
    pub(crate) config: PoolConfig,
}

impl PoolShared {
    /// Wakes one worker, rotating so repeated pushes spread across the pool.
    pub(crate) fn unpark_one(&self) {
        if self.parkers.is_empty() {
            return;
        }
        let target = self.next_unpark.fetch_add(1, Ordering::Relaxed) % self.parkers.len();
        self.parkers[target].unpark();
    }

    fn unpark_all(&self) {
        for parker in &self.parkers {
            parker.unpark();
        }
    }
}

/// Mutable pool state behind the shared mutex.
pub(crate) struct PoolState {
    pub(crate) tasks: Arena<TaskRecord>,
    pub(crate) completed: u64,
    pub(crate) panicked: u64,
}

/// A pool of worker threads that run spawned futures to completion.
///
/// Each task carries its own ambient context; see the crate docs for the
/// isolation guarantees. Dropping the pool (or calling
/// [`shutdown`](WorkerPool::shutdown)) stops the workers and discards any
/// tasks that have not finished.
///
/// ```no_run
/// use flowcx::{PoolConfig, WorkerPool};
///
/// let pool = WorkerPool::new(PoolConfig::new().with_workers(2))?;
/// pool.spawn(async {
///     flowcx::set(flowcx::AmbientContext::for_request("req-1"));
///     // ... the context follows this task, not the thread ...
/// })?;
/// pool.shutdown();
/// # Ok::<(), flowcx::Error>(())
/// ```
pub struct WorkerPool {
    shared: Arc<PoolShared>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Validates `config`, starts the worker threads, and returns the pool.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidConfig`](crate::ErrorKind::InvalidConfig)
    /// when the configuration is rejected and
    /// [`ErrorKind::WorkerSpawnFailed`](crate::ErrorKind::WorkerSpawnFailed)
    /// when the OS refuses a thread; workers already started are joined
    /// before the error is returned.
    pub fn new(config: PoolConfig) -> Result<Self> {
        config.validate().context("pool configuration rejected")?;

        let worker_count = config.workers;
        let shared = Arc::new(PoolShared {
            state: Mutex::new(PoolState {
                tasks: Arena::new(),
                completed: 0,
                panicked: 0,
            }),
            queue: RunQueue::new(),
            shutdown: AtomicBool::new(false),
            parkers: (0..worker_count).map(|_| Parker::new()).collect(),
            next_unpark: AtomicUsize::new(0),
            config,
        });

        let mut workers = Vec::with_capacity(worker_count);
        for index in 0..worker_count {
            let worker = Worker::new(index, Arc::clone(&shared));
            let name = format!("{}-{index}", shared.config.thread_name_prefix);
            let spawned = thread::Builder::new()
                .name(name)
                .spawn(move || worker.run_loop());
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(source) => {
                    shared.shutdown.store(true, Ordering::Release);
                    shared.unpark_all();
                    for handle in workers {
                        let _ = handle.join();
                    }
                    return Err(Error::worker_spawn_failed(index).with_source(source));
                }
            }
        }

        info!(workers = worker_count, "worker pool started");
        Ok(Self { shared, workers })
    }

    /// Returns a cloneable handle for spawning from other threads or tasks.
    #[must_use]
    pub fn handle(&self) -> PoolHandle {
        PoolHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Spawns a task with an empty ambient context.
    ///
    /// # Errors
    ///
    /// See [`PoolHandle::spawn`].
    pub fn spawn<F>(&self, future: F) -> Result<TaskId>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handle().spawn(future)
    }

    /// Spawns a task whose context starts as `context`.
    ///
    /// # Errors
    ///
    /// See [`PoolHandle::spawn`].
    pub fn spawn_with_context<F>(&self, context: AmbientContext, future: F) -> Result<TaskId>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handle().spawn_with_context(context, future)
    }

    /// Current task and completion counters.
    #[must_use]
    pub fn metrics(&self) -> PoolMetrics {
        self.handle().metrics()
    }

    /// Stops the workers and joins them.
    ///
    /// Tasks still queued or suspended are dropped before this returns;
    /// their context storage goes with them.
    pub fn shutdown(mut self) {
        self.shutdown_inner();
    }

    fn shutdown_inner(&mut self) {
        if !self.shared.shutdown.swap(true, Ordering::AcqRel) {
            info!("worker pool shutting down");
            self.shared.unpark_all();
        }
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                warn!("worker thread panicked during shutdown");
            }
        }

        // Unfinished records are dropped here rather than with the last
        // Arc<PoolShared>: a suspended future may hold a cloned waker, and
        // the waker holds the shared state, so waiting for the Arc to
        // collapse would leak both. Dropped outside the lock; a future's
        // drop glue may call back into the pool.
        let abandoned = {
            let mut state = self.shared.state.lock().expect("pool state lock poisoned");
            state.tasks.drain()
        };
        if !abandoned.is_empty() {
            debug!(
                count = abandoned.len(),
                queued = self.shared.queue.len(),
                "dropping unfinished task records"
            );
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown_inner();
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.workers.len())
            .finish_non_exhaustive()
    }
}

/// Cloneable spawning handle onto a [`WorkerPool`].
///
/// Handles stay valid after the pool shuts down; spawns then fail with
/// [`ErrorKind::PoolShutDown`](crate::ErrorKind::PoolShutDown).
#[derive(Clone)]
pub struct PoolHandle {
    shared: Arc<PoolShared>,
}

impl PoolHandle {
    /// Spawns a task with an empty ambient context.
    ///
    /// The task starts with no context value: `get()` inside it returns
    /// `None` until the task calls `set(..)`, no matter what previous
    /// tasks did on the same worker thread.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::PoolShutDown`](crate::ErrorKind::PoolShutDown) after
    /// shutdown, [`ErrorKind::TaskLimitExceeded`](crate::ErrorKind::TaskLimitExceeded)
    /// when `max_tasks` live tasks already exist.
    pub fn spawn<F>(&self, future: F) -> Result<TaskId>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.spawn_record(None, future)
    }

    /// Spawns a task whose context starts as `context`.
    ///
    /// # Errors
    ///
    /// See [`spawn`](Self::spawn).
    pub fn spawn_with_context<F>(&self, context: AmbientContext, future: F) -> Result<TaskId>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.spawn_record(Some(context), future)
    }

    /// Spawns a task that inherits a copy of the caller's task context.
    ///
    /// The snapshot is taken at the call site: the child starts with the
    /// spawning task's current task-scoped value (if any) and diverges
    /// from there. Writes on either side are invisible to the other.
    /// Called outside a task, or before the parent ever wrote a value,
    /// the child starts empty; legacy thread-local values never carry
    /// over into children.
    ///
    /// # Errors
    ///
    /// See [`spawn`](Self::spawn).
    pub fn spawn_branch<F>(&self, future: F) -> Result<TaskId>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let inherited = FlowCx::current().and_then(|cx| cx.get());
        self.spawn_record(inherited, future)
    }

    fn spawn_record<F>(&self, context: Option<AmbientContext>, future: F) -> Result<TaskId>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.shared.shutdown.load(Ordering::Acquire) {
            return Err(Error::pool_shut_down());
        }

        let task = {
            let mut state = self.shared.state.lock().expect("pool state lock poisoned");
            let limit = self.shared.config.max_tasks;
            if state.tasks.len() >= limit {
                return Err(Error::task_limit_exceeded(limit));
            }
            let index = state.tasks.insert_with(|index| {
                let id = TaskId::from_arena(index);
                let cx = match context {
                    Some(initial) => FlowCx::with_context(id, initial),
                    None => FlowCx::new(id),
                };
                TaskRecord::new(id, cx, Box::pin(future))
            });
            TaskId::from_arena(index)
        };

        debug!(task = %task, "task spawned");
        self.shared.queue.push(task);
        self.shared.unpark_one();
        Ok(task)
    }

    /// Current task and completion counters.
    #[must_use]
    pub fn metrics(&self) -> PoolMetrics {
        let state = self.shared.state.lock().expect("pool state lock poisoned");
        PoolMetrics {
            live_tasks: state.tasks.len(),
            completed: state.completed,
            panicked: state.panicked,
        }
    }

    /// Whether the pool has been told to stop.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shared.shutdown.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for PoolHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolHandle").finish_non_exhaustive()
    }
}

/// Counter snapshot from a pool or handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolMetrics {
    /// Tasks spawned but not yet completed or panicked.
    pub live_tasks: usize,
    /// Tasks that ran to completion.
    pub completed: u64,
    /// Tasks retired because their future panicked.
    pub panicked: u64,
}
