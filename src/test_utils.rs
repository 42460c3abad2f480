//! Test utilities for flowcx.
//!
//! This module provides shared helpers for unit tests:
//! - Consistent tracing-based logging initialization
//! - Phase/section macros for readable test output
//! - Lab runtime constructors
//! - A [`Gate`] future for suspending a task at a controlled point
//! - An environment lock for tests that mutate `FLOWCX_*` variables
//!
//! # Example
//! ```
//! use flowcx::test_utils::{init_test_logging, test_lab};
//!
//! fn my_lab_test() {
//!     init_test_logging();
//!     let lab = test_lab();
//!     // drive tasks deterministically
//! }
//! ```

use crate::lab::{LabConfig, LabRuntime};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::task::{Context, Poll, Waker};
use tracing_subscriber::fmt::format::FmtSpan;

static INIT_LOGGING: Once = Once::new();
static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Default seed used by test lab helpers.
pub const DEFAULT_TEST_SEED: u64 = 0xDEAD_BEEF;

/// Initialize test logging with trace-level output.
///
/// Safe to call multiple times; only initializes once.
pub fn init_test_logging() {
    init_test_logging_with_level(tracing::Level::TRACE);
}

/// Initialize test logging with a custom level.
///
/// The first call wins; later calls are no-ops.
pub fn init_test_logging_with_level(level: tracing::Level) {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_test_writer()
            .with_file(true)
            .with_line_number(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_ansi(false)
            .try_init();
    });
}

/// Acquire the global environment lock for tests that mutate env vars.
///
/// Process environment is global; tests that set `FLOWCX_*` variables hold
/// this lock so parallel tests do not interleave mutations.
#[must_use]
pub fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK.lock().expect("env lock poisoned")
}

/// Create a deterministic lab runtime for testing.
#[must_use]
pub fn test_lab() -> LabRuntime {
    LabRuntime::new(LabConfig::new(DEFAULT_TEST_SEED))
}

/// Create a lab runtime with a specific seed.
#[must_use]
pub fn test_lab_with_seed(seed: u64) -> LabRuntime {
    LabRuntime::new(LabConfig::new(seed))
}

/// Creates a linked trigger/future pair.
///
/// The [`Gate`] stays pending until [`Trigger::open`] is called, which makes
/// it easy to hold a task suspended at a known point and release it from the
/// test body. The trigger can be fired from any thread, before or after the
/// gate is first polled.
#[must_use]
pub fn gate() -> (Trigger, Gate) {
    let core = Arc::new(GateCore {
        opened: AtomicBool::new(false),
        waker: Mutex::new(None),
    });
    (Trigger { core: core.clone() }, Gate { core })
}

struct GateCore {
    opened: AtomicBool,
    waker: Mutex<Option<Waker>>,
}

/// Opens the paired [`Gate`], waking the task awaiting it.
#[derive(Clone)]
pub struct Trigger {
    core: Arc<GateCore>,
}

impl Trigger {
    /// Releases the gate. Idempotent.
    pub fn open(&self) {
        self.core.opened.store(true, Ordering::SeqCst);
        let waker = self.core.waker.lock().expect("gate waker lock poisoned").take();
        if let Some(waker) = waker {
            waker.wake();
        }
    }
}

impl std::fmt::Debug for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Trigger")
            .field("opened", &self.core.opened.load(Ordering::SeqCst))
            .finish()
    }
}

/// A future that stays pending until its [`Trigger`] fires.
pub struct Gate {
    core: Arc<GateCore>,
}

impl Future for Gate {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.core.opened.load(Ordering::SeqCst) {
            return Poll::Ready(());
        }
        *self.core.waker.lock().expect("gate waker lock poisoned") =
            Some(cx.waker().clone());
        // Re-check after publishing the waker so an open() racing with this
        // poll cannot be lost.
        if self.core.opened.load(Ordering::SeqCst) {
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    }
}

impl std::fmt::Debug for Gate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gate")
            .field("opened", &self.core.opened.load(Ordering::SeqCst))
            .finish()
    }
}

/// Log a test phase transition with a visual separator.
#[macro_export]
macro_rules! test_phase {
    ($name:expr) => {
        tracing::info!(phase = %$name, "========================================");
        tracing::info!(phase = %$name, "TEST PHASE: {}", $name);
        tracing::info!(phase = %$name, "========================================");
    };
}

/// Log a section within a test phase.
#[macro_export]
macro_rules! test_section {
    ($name:expr) => {
        tracing::debug!(section = %$name, "--- {} ---", $name);
    };
}

/// Log test completion with summary.
#[macro_export]
macro_rules! test_complete {
    ($name:expr) => {
        tracing::info!(test = %$name, "test completed successfully: {}", $name);
    };
    ($name:expr, $($key:ident = $value:expr),* $(,)?) => {
        tracing::info!(
            test = %$name,
            $($key = %$value,)*
            "test completed successfully: {}",
            $name
        );
    };
}

/// Log before assertions for context.
#[macro_export]
macro_rules! assert_with_log {
    ($cond:expr, $msg:expr, $expected:expr, $actual:expr) => {
        tracing::debug!(
            expected = ?$expected,
            actual = ?$actual,
            "Asserting: {}",
            $msg
        );
        assert!($cond, "{}: expected {:?}, got {:?}", $msg, $expected, $actual);
    };
}
