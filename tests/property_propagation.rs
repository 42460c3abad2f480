//! Property-based tests for context propagation invariants.
//!
//! Three families of randomized inputs:
//!
//! - Arbitrary seeds and workload shapes, checking that a lab run is a
//!   pure function of its inputs (identical reports and observation logs
//!   on replay).
//! - The same workloads, checking that no interleaving the scheduler can
//!   produce lets one task observe another task's context.
//! - Random insert/remove sequences against the generational arena,
//!   checking that a retired identity never resolves to a later occupant.

mod common;

use common::{init_test_logging, test_proptest_config};
use flowcx::types::USER_KEY;
use flowcx::util::{Arena, ArenaIndex};
use flowcx::{yield_now, AmbientContext, LabConfig, LabReport, LabRuntime};
use proptest::prelude::*;
use std::sync::{Arc, Mutex};
use std::time::Duration;

type ObservationLog = Vec<(usize, Option<String>)>;

/// Runs `tasks` yielding tasks (plus one sleeper when `sleep_us > 0`)
/// under the given seed and returns the report with every observation.
fn run_workload(
    seed: u64,
    workers: usize,
    tasks: usize,
    yields: usize,
    sleep_us: u64,
) -> (LabReport, ObservationLog) {
    let mut lab = LabRuntime::new(LabConfig::new(seed).worker_count(workers));
    let log: Arc<Mutex<ObservationLog>> = Arc::new(Mutex::new(Vec::new()));

    for i in 0..tasks {
        let sink = Arc::clone(&log);
        lab.spawn(async move {
            flowcx::set(AmbientContext::new().with(USER_KEY, format!("user-{i}")));
            for _ in 0..yields {
                yield_now().await;
                sink.lock().unwrap().push((i, observed_user()));
            }
            sink.lock().unwrap().push((i, observed_user()));
        });
    }
    if sleep_us > 0 {
        let handle = lab.handle();
        let sink = Arc::clone(&log);
        lab.spawn(async move {
            flowcx::set(AmbientContext::new().with(USER_KEY, "sleeper"));
            handle.sleep(Duration::from_micros(sleep_us)).await;
            sink.lock().unwrap().push((usize::MAX, observed_user()));
        });
    }

    lab.run_until_quiescent().expect("workload must quiesce");
    let observations = log.lock().unwrap().clone();
    (lab.report(), observations)
}

fn observed_user() -> Option<String> {
    flowcx::get().and_then(|c| c.user().map(String::from))
}

proptest! {
    #![proptest_config(test_proptest_config(100))]

    /// Replaying a seed reproduces the full run, observations included.
    #[test]
    fn same_seed_reproduces_the_run(
        seed in any::<u64>(),
        workers in 1usize..5,
        tasks in 1usize..5,
        yields in 0usize..6,
        sleep_us in 0u64..50,
    ) {
        init_test_logging();
        let first = run_workload(seed, workers, tasks, yields, sleep_us);
        let second = run_workload(seed, workers, tasks, yields, sleep_us);
        prop_assert_eq!(first.0, second.0, "reports must match on replay");
        prop_assert_eq!(first.1, second.1, "observations must match on replay");
    }

    /// No schedule the seed can produce lets a task read a value it did
    /// not set itself.
    #[test]
    fn no_interleaving_leaks_context_between_tasks(
        seed in any::<u64>(),
        workers in 1usize..5,
        tasks in 2usize..6,
        yields in 1usize..6,
    ) {
        init_test_logging();
        let (report, observations) = run_workload(seed, workers, tasks, yields, 0);
        prop_assert_eq!(report.completed, tasks as u64);
        for (owner, seen) in &observations {
            let expected = format!("user-{owner}");
            prop_assert_eq!(
                seen.as_deref(),
                Some(expected.as_str()),
                "task {} observed a foreign context",
                owner
            );
        }
    }

    /// A retired arena identity never resolves, even after its slot is
    /// recycled by later inserts.
    #[test]
    fn stale_arena_identities_never_resolve(
        ops in proptest::collection::vec(any::<u8>(), 1..64),
    ) {
        init_test_logging();
        let mut arena: Arena<u32> = Arena::new();
        let mut live: Vec<(ArenaIndex, u32)> = Vec::new();
        let mut retired: Vec<ArenaIndex> = Vec::new();
        let mut next_value = 0u32;

        for op in ops {
            if op % 3 == 2 && !live.is_empty() {
                let victim = (op as usize / 3) % live.len();
                let (index, value) = live.swap_remove(victim);
                prop_assert_eq!(arena.remove(index), Some(value));
                retired.push(index);
            } else {
                let index = arena.insert(next_value);
                live.push((index, next_value));
                next_value += 1;
            }
        }

        prop_assert_eq!(arena.len(), live.len());
        for (index, value) in &live {
            prop_assert_eq!(arena.get(*index), Some(value));
        }
        for index in &retired {
            prop_assert!(arena.get(*index).is_none(), "stale identity resolved");
            prop_assert!(!arena.contains(*index));
        }
    }
}
