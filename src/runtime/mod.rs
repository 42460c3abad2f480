//! The thread-backed runtime: worker pool, run queue, and task records.
//!
//! - [`pool`]: [`WorkerPool`], [`PoolHandle`], and the shared pool state
//! - [`yield_now`]: cooperative yield point
//! - `worker`, `queue`, `task` (crate-private): worker threads and parking,
//!   the lock-free run queue of task ids, and per-task records
//!
//! # Quick start
//!
//! ```no_run
//! use flowcx::{AmbientContext, PoolConfig, WorkerPool};
//!
//! let pool = WorkerPool::new(PoolConfig::default())?;
//! pool.spawn(async {
//!     flowcx::set(AmbientContext::for_request("req-1"));
//!     // await points may move this task between workers; the
//!     // context moves with it.
//! })?;
//! pool.shutdown();
//! # Ok::<(), flowcx::Error>(())
//! ```
//!
//! For deterministic scheduling in tests, use [`crate::lab`] instead: it
//! runs the same task records under virtual time with a seeded scheduler.

/// The worker pool and its spawning handles.
pub mod pool;
pub(crate) mod queue;
pub(crate) mod task;
pub(crate) mod worker;
/// Yield points for cooperative multitasking.
pub mod yield_now;

pub use pool::{PoolHandle, PoolMetrics, WorkerPool};
pub use yield_now::yield_now;
