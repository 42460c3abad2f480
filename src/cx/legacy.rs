//! Thread-local legacy context store.
//!
//! Before task-scoped propagation existed, callers stashed the request
//! context in plain thread-local storage. That works only while a request
//! is pinned to one thread: under a worker pool the thread is an arbitrary
//! carrier, and a thread-local value set during one poll may be read by a
//! completely unrelated task polled on the same worker later.
//!
//! This module keeps that old store available as a migration aid. The free
//! function [`crate::cx::get`] consults it only when the current task has
//! no task-scoped value, so partially converted code keeps limping along.
//! The store is best-effort by design: values do not follow a task across
//! suspension, and nothing here prevents bleed-through between tasks that
//! share a worker. New code should not write to it.

use crate::types::AmbientContext;
use std::cell::RefCell;

thread_local! {
    static LEGACY_STORE: RefCell<Option<AmbientContext>> = const { RefCell::new(None) };
}

/// Stores `context` in this thread's legacy slot, returning the previous value.
pub fn set(context: AmbientContext) -> Option<AmbientContext> {
    LEGACY_STORE.with(|slot| slot.borrow_mut().replace(context))
}

/// Reads this thread's legacy slot.
#[must_use]
pub fn get() -> Option<AmbientContext> {
    LEGACY_STORE.with(|slot| slot.borrow().clone())
}

/// Clears this thread's legacy slot, returning the value it held.
pub fn clear() -> Option<AmbientContext> {
    LEGACY_STORE.with(|slot| slot.borrow_mut().take())
}
