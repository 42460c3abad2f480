//! Deterministic lab runtime for testing.
//!
//! The lab runtime provides:
//!
//! - Virtual time (no wall-clock dependencies)
//! - Deterministic scheduling (same seed → same execution)
//! - Modeled workers, so task migration and worker reuse reproduce exactly
//! - Run reports for regression comparison
//!
//! Context semantics are identical to the thread-backed pool; the lab is
//! the place to pin down scheduling-sensitive behavior in tests.

pub mod config;
pub mod report;
pub mod runtime;

pub use config::LabConfig;
pub use report::LabReport;
pub use runtime::{LabHandle, LabRuntime, Sleep};
