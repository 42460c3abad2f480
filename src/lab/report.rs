//! Run reports from the lab runtime.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Summary of a finished (or halted) lab run.
///
/// Reports are a pure function of the spawned tasks and the seed, so two
/// runs with the same inputs produce identical reports. They serialize
/// with serde for regression fixtures and external tooling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabReport {
    /// Seed the scheduler was driven by.
    pub seed: u64,
    /// Number of modeled workers.
    pub worker_count: usize,
    /// Total scheduling steps executed.
    pub steps: u64,
    /// Tasks that ran to completion.
    pub completed: u64,
    /// Tasks retired because their future panicked.
    pub panicked: u64,
    /// Polls that resumed a task on a different worker than its last poll.
    pub migrations: u64,
    /// Poll count per modeled worker, indexed by worker.
    pub polls_by_worker: Vec<u64>,
    /// Virtual time at the end of the run, in nanoseconds.
    pub virtual_time_ns: u64,
}

impl fmt::Display for LabReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "lab run: seed={} workers={} steps={} completed={} panicked={} migrations={} vt={}ns",
            self.seed,
            self.worker_count,
            self.steps,
            self.completed,
            self.panicked,
            self.migrations,
            self.virtual_time_ns
        )
    }
}
