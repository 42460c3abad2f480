//! Configuration for the lab runtime.
//!
//! The lab configuration controls deterministic execution:
//! - Random seed for scheduling decisions
//! - How many workers the scheduler models
//! - Step budget before a run is forcibly terminated

use crate::util::DetRng;
use serde::{Deserialize, Serialize};

/// Configuration for the lab runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabConfig {
    /// Random seed for deterministic scheduling.
    pub seed: u64,
    /// Number of modeled workers.
    ///
    /// Each step assigns the polled task to one of these. More than one
    /// worker makes task migration observable in reports and keeps
    /// worker-reuse bugs reproducible; the scheduling itself is still a
    /// pure function of the seed.
    pub worker_count: usize,
    /// Maximum number of steps before forced termination.
    pub max_steps: Option<u64>,
}

impl LabConfig {
    /// Creates a new lab configuration with the given seed.
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self {
            seed,
            worker_count: 4,
            max_steps: Some(100_000),
        }
    }

    /// Creates a lab configuration from the current time (for quick testing).
    #[must_use]
    pub fn from_time() -> Self {
        use std::time::{SystemTime, UNIX_EPOCH};
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(42);
        Self::new(seed)
    }

    /// Sets the number of modeled workers (minimum 1).
    #[must_use]
    pub const fn worker_count(mut self, workers: usize) -> Self {
        self.worker_count = if workers == 0 { 1 } else { workers };
        self
    }

    /// Sets the maximum number of steps.
    #[must_use]
    pub const fn max_steps(mut self, steps: u64) -> Self {
        self.max_steps = Some(steps);
        self
    }

    /// Disables the step limit.
    #[must_use]
    pub const fn no_step_limit(mut self) -> Self {
        self.max_steps = None;
        self
    }

    /// Creates a deterministic RNG from this configuration.
    #[must_use]
    pub fn rng(&self) -> DetRng {
        DetRng::new(self.seed)
    }
}

impl Default for LabConfig {
    fn default() -> Self {
        Self::new(42)
    }
}
