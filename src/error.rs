//! Error types and error handling strategy for flowcx.
//!
//! Two situations that look like errors deliberately are not:
//!
//! - **Absent context.** A task that reads its ambient context before
//!   setting one gets `None` from [`crate::cx::get`]. That is the normal
//!   starting state of every task, so it is modelled as an `Option`, not an
//!   `Error`.
//! - **Stale context.** There is no "stale value observed" error because the
//!   situation cannot be represented: a task's context lives in a slot that
//!   only that task's handle reaches, and the slot is freed with the task.
//!
//! What remains are real faults: spawning on a pool that has shut down,
//! exceeding the task limit, rejected configuration, and lab runs that
//! stall or exhaust their step budget. Those are explicit and typed here,
//! and classified by [`Recoverability`] so callers can decide whether a
//! retry is worth attempting.

use crate::types::TaskId;
use core::fmt;
use std::sync::Arc;

/// The kind of error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    // === Pool lifecycle ===
    /// Spawn was attempted after the pool shut down.
    PoolShutDown,
    /// A worker thread could not be started.
    WorkerSpawnFailed,

    // === Capacity ===
    /// The live-task limit was reached.
    TaskLimitExceeded,

    // === Configuration ===
    /// Configuration was rejected by validation.
    InvalidConfig,

    // === Lab runtime ===
    /// A lab run stopped making progress with tasks still live.
    Stalled,
    /// A lab run hit its step limit before reaching quiescence.
    StepLimitExceeded,

    // === Internal / state machine ===
    /// Internal runtime error (bug).
    Internal,
}

impl ErrorKind {
    /// Returns the error category for this kind.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::PoolShutDown | Self::WorkerSpawnFailed => ErrorCategory::Lifecycle,
            Self::TaskLimitExceeded => ErrorCategory::Capacity,
            Self::InvalidConfig => ErrorCategory::Config,
            Self::Stalled | Self::StepLimitExceeded => ErrorCategory::Lab,
            Self::Internal => ErrorCategory::Internal,
        }
    }

    /// Returns the recoverability classification for this error kind.
    ///
    /// This helps retry logic decide whether to attempt recovery.
    #[must_use]
    pub const fn recoverability(&self) -> Recoverability {
        match self {
            // Capacity frees up as live tasks complete.
            Self::TaskLimitExceeded => Recoverability::Transient,

            // A shut-down pool stays down; a stalled deterministic run
            // stalls again on replay.
            Self::PoolShutDown
            | Self::WorkerSpawnFailed
            | Self::InvalidConfig
            | Self::Stalled
            | Self::Internal => Recoverability::Permanent,

            // The workload may legitimately need a larger limit.
            Self::StepLimitExceeded => Recoverability::Unknown,
        }
    }

    /// Returns true if this error is typically retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self.recoverability(), Recoverability::Transient)
    }
}

/// Classification of error recoverability for retry logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Recoverability {
    /// Temporary failure that may succeed on retry.
    Transient,
    /// Permanent failure that will not succeed on retry.
    Permanent,
    /// Recoverability depends on context and cannot be determined
    /// from the error kind alone.
    Unknown,
}

impl Recoverability {
    /// Returns true if this error is safe to retry.
    #[must_use]
    pub const fn should_retry(&self) -> bool {
        matches!(self, Self::Transient)
    }

    /// Returns true if this error should never be retried.
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::Permanent)
    }
}

/// High-level error category for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Pool startup and shutdown failures.
    Lifecycle,
    /// Task admission limit failures.
    Capacity,
    /// Configuration failures.
    Config,
    /// Lab runtime failures.
    Lab,
    /// Internal runtime errors.
    Internal,
}

/// The main error type for flowcx operations.
#[derive(Debug, Clone)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    source: Option<Arc<dyn std::error::Error + Send + Sync>>,
    task: Option<TaskId>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub const fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            source: None,
            task: None,
        }
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Adds a message description to the error.
    #[must_use]
    pub fn with_message(mut self, msg: impl Into<String>) -> Self {
        self.message = Some(msg.into());
        self
    }

    /// Adds a source error to the chain.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    /// Records the task involved in the error.
    #[must_use]
    pub const fn with_task(mut self, task: TaskId) -> Self {
        self.task = Some(task);
        self
    }

    /// Returns the error message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Returns the task involved in the error, if known.
    #[must_use]
    pub const fn task(&self) -> Option<TaskId> {
        self.task
    }

    /// Returns the error category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        self.kind.category()
    }

    /// Returns the recoverability classification.
    #[must_use]
    pub const fn recoverability(&self) -> Recoverability {
        self.kind.recoverability()
    }

    /// Returns true if this error is typically retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    /// Returns true if this error means the pool rejected the spawn for good.
    #[must_use]
    pub const fn is_shutdown(&self) -> bool {
        matches!(self.kind, ErrorKind::PoolShutDown)
    }

    /// Creates a pool-shut-down error.
    #[must_use]
    pub fn pool_shut_down() -> Self {
        Self::new(ErrorKind::PoolShutDown).with_message("pool is shut down")
    }

    /// Creates a task-limit error.
    #[must_use]
    pub fn task_limit_exceeded(limit: usize) -> Self {
        Self::new(ErrorKind::TaskLimitExceeded)
            .with_message(format!("live task limit {limit} reached"))
    }

    /// Creates a worker-spawn error for the worker at `index`.
    #[must_use]
    pub fn worker_spawn_failed(index: usize) -> Self {
        Self::new(ErrorKind::WorkerSpawnFailed)
            .with_message(format!("failed to start worker thread {index}"))
    }

    /// Creates a stalled-run error.
    #[must_use]
    pub fn stalled(live_tasks: usize) -> Self {
        Self::new(ErrorKind::Stalled).with_message(format!(
            "no runnable tasks and no pending timers, {live_tasks} task(s) still live"
        ))
    }

    /// Creates a step-limit error.
    #[must_use]
    pub fn step_limit_exceeded(limit: u64) -> Self {
        Self::new(ErrorKind::StepLimitExceeded)
            .with_message(format!("run exceeded {limit} steps without quiescing"))
    }

    /// Creates an internal error (runtime bug).
    #[must_use]
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal).with_message(detail)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(msg) = &self.message {
            write!(f, ": {msg}")?;
        }
        if let Some(task) = self.task {
            write!(f, " (task {task})")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as _)
    }
}

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Attach a context message on error.
    fn context(self, msg: impl Into<String>) -> Result<T>;
    /// Attach context message computed lazily on error.
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for core::result::Result<T, E> {
    fn context(self, msg: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_message(msg))
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| e.into().with_message(f()))
    }
}

/// A specialized Result type for flowcx operations.
pub type Result<T> = core::result::Result<T, Error>;
