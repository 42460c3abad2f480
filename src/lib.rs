//! Flowcx: task-scoped ambient context for concurrent request processing.
//!
//! # Overview
//!
//! Flowcx carries request-scoped values (request id, user, tenant) with the
//! logical task that is processing the request, not with the OS thread that
//! happens to be running it. Worker threads are reused across requests and
//! a suspended task may resume on a different worker; thread-locals leak or
//! lose values under both. Here every task owns a context slot, handles to
//! that slot travel with the task, and the slot is discarded with the
//! task's record when it finishes.
//!
//! # Core Guarantees
//!
//! - **Isolation**: a task only ever observes values it set (or was
//!   explicitly seeded with); worker reuse never bleeds values between tasks
//! - **Affinity**: the context follows the task across suspension points,
//!   even when it resumes on a different worker thread
//! - **Absent is not an error**: [`get`] returns `None` before the first
//!   [`set`]; no value is never a failure state
//! - **Structural release**: context storage is dropped with the task's
//!   record on completion; there is no cleanup API to forget to call
//! - **No global choke point**: reads and writes go through the task's own
//!   slot, so unrelated tasks never contend on a shared lock
//! - **Deterministic testing**: the [`lab`] runtime reproduces scheduling,
//!   migration, and worker reuse from a seed
//!
//! # Module Structure
//!
//! - [`cx`]: the context surface ([`FlowCx`], [`get`], [`set`], legacy store)
//! - [`types`]: core types ([`AmbientContext`], identifiers, virtual time)
//! - [`runtime`]: the thread-backed worker pool
//! - [`lab`]: deterministic lab runtime for testing
//! - [`config`]: pool configuration and environment overrides
//! - [`error`]: error types
//! - [`util`]: internal utilities (deterministic RNG, arenas)
//!
//! # Quick Start
//!
//! ```no_run
//! use flowcx::{AmbientContext, PoolConfig, WorkerPool};
//!
//! let pool = WorkerPool::new(PoolConfig::default())?;
//! pool.spawn(async {
//!     flowcx::set(AmbientContext::for_request("req-42"));
//!     handle_request().await;
//! })?;
//! pool.shutdown();
//!
//! async fn handle_request() {
//!     // Deep in the call stack, with no parameter threading:
//!     let request = flowcx::get().and_then(|cx| cx.request_id().map(String::from));
//!     assert_eq!(request.as_deref(), Some("req-42"));
//! }
//! # Ok::<(), flowcx::Error>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::module_inception)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_possible_truncation)]

pub mod config;
pub mod cx;
pub mod error;
pub mod lab;
pub mod runtime;
pub mod tracing_compat;
pub mod types;
pub mod util;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-exports for convenient access to core types
pub use config::{ConfigError, PoolConfig};
pub use cx::{get, get_strict, set, FlowCx};
pub use error::{Error, ErrorCategory, ErrorKind, Recoverability, Result, ResultExt};
pub use lab::{LabConfig, LabHandle, LabReport, LabRuntime};
pub use runtime::{yield_now, PoolHandle, PoolMetrics, WorkerPool};
pub use types::{AmbientContext, TaskId, Time};
