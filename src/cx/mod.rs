//! Task-scoped ambient context.
//!
//! This module is the user-facing surface of flowcx. The free functions
//! [`get`] and [`set`] read and write the ambient context of the *logical
//! task* calling them, not of the worker thread executing the call. The
//! runtime installs the right [`FlowCx`] handle around every poll, so the
//! same value is visible before and after a suspension even when the task
//! resumes on a different worker, and no other task ever observes it.
//!
//! # Module contents
//!
//! - [`cx`](self::cx): the [`FlowCx`] handle and the free `get`/`set` functions
//! - [`scope`]: the [`Attached`] adapter for driving futures outside the
//!   bundled runtimes
//! - [`legacy`]: the old thread-local store, kept as a read fallback for
//!   partially migrated code
//!
//! # Absent is not an error
//!
//! A task that never called [`set`] reads `None`. That is the normal
//! starting state of every task, including tasks running on a worker thread
//! that previously ran a task which *did* set a context.

pub mod cx;
pub mod legacy;
pub mod scope;

pub use cx::{get, get_strict, set, FlowCx, InstallGuard};
pub use scope::Attached;
