//! The per-task context handle.
//!
//! `FlowCx` is the handle that ties an [`AmbientContext`] to one logical task.
//! The runtime installs the handle into a thread-local slot for exactly the
//! duration of a poll, so `get`/`set` called from anywhere inside the task's
//! future resolve to that task's own storage, no matter which worker thread
//! happens to be running the poll.
//!
//! # Ownership model
//!
//! The handle owns an `Arc` to a single shared slot. Clones of the handle
//! (the runtime keeps one, the install guard briefly holds one) all point at
//! the same slot, so a value written while running on worker 3 is visible
//! when the task resumes on worker 7. When the runtime drops the last handle
//! at task completion, the slot and its context are freed with it. There is
//! no unregister step to forget.
//!
//! # Thread safety
//!
//! `FlowCx` is `Send + Sync`; the slot is guarded by its own `RwLock`.
//! Distinct tasks own distinct slots, so `get`/`set` on unrelated tasks
//! never contend on a shared lock. The thread-local install slot is
//! per-thread state and needs no locking at all.

use crate::cx::legacy;
use crate::types::{AmbientContext, TaskId};
use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, RwLock};

thread_local! {
    /// The handle of the task currently being polled on this thread, if any.
    static CURRENT_FLOW: RefCell<Option<FlowCx>> = const { RefCell::new(None) };
}

/// Handle to one task's ambient context slot.
///
/// Created by the runtime when a task is spawned. User code normally never
/// holds a `FlowCx` directly; it calls the free functions [`get`] and [`set`],
/// which operate on whichever handle is installed on the current thread.
#[derive(Clone)]
pub struct FlowCx {
    task: TaskId,
    slot: Arc<RwLock<Option<AmbientContext>>>,
}

impl FlowCx {
    /// Creates a handle with an empty slot for `task`.
    pub(crate) fn new(task: TaskId) -> Self {
        Self {
            task,
            slot: Arc::new(RwLock::new(None)),
        }
    }

    /// Creates a handle whose slot is pre-seeded with `context`.
    ///
    /// Used for spawn-with-context and for branch spawns, where the child
    /// starts from a copy of the parent's context.
    pub(crate) fn with_context(task: TaskId, context: AmbientContext) -> Self {
        Self {
            task,
            slot: Arc::new(RwLock::new(Some(context))),
        }
    }

    /// Creates a standalone handle with a fresh ephemeral task id.
    ///
    /// For tests and examples that want context semantics without standing
    /// up a pool or lab runtime.
    #[must_use]
    pub fn for_testing() -> Self {
        Self::new(TaskId::new_ephemeral())
    }

    /// The id of the task this handle belongs to.
    #[must_use]
    pub fn task(&self) -> TaskId {
        self.task
    }

    /// Reads the task-scoped context, if one has been set.
    #[must_use]
    pub fn get(&self) -> Option<AmbientContext> {
        self.slot.read().expect("context slot lock poisoned").clone()
    }

    /// Replaces the task-scoped context, returning the previous value.
    pub fn set(&self, context: AmbientContext) -> Option<AmbientContext> {
        self.slot
            .write()
            .expect("context slot lock poisoned")
            .replace(context)
    }

    /// Returns the handle installed on the current thread, if any.
    ///
    /// Inside a poll this is the handle of the task being polled; outside
    /// of any task it is `None`.
    #[must_use]
    pub fn current() -> Option<FlowCx> {
        CURRENT_FLOW.with(|slot| slot.borrow().clone())
    }

    /// Installs `cx` as the current handle for this thread.
    ///
    /// The previous handle (usually `None`) is restored when the returned
    /// guard drops, so installs nest correctly and a panic during a poll
    /// still leaves the thread clean for the next task.
    pub(crate) fn install(cx: Option<FlowCx>) -> InstallGuard {
        let prev = CURRENT_FLOW.with(|slot| std::mem::replace(&mut *slot.borrow_mut(), cx));
        InstallGuard {
            prev,
            _not_send: PhantomData,
        }
    }

    /// Installs this handle on the current thread until the guard drops.
    ///
    /// Mostly useful in tests and in adapters that drive a future outside
    /// the bundled runtimes; see [`FlowCx::attach`] for the future-wrapping
    /// form.
    ///
    /// [`FlowCx::attach`]: crate::cx::scope::Attached
    #[must_use = "the context is uninstalled when the guard drops"]
    pub fn enter(&self) -> InstallGuard {
        Self::install(Some(self.clone()))
    }
}

impl fmt::Debug for FlowCx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowCx")
            .field("task", &self.task)
            .finish_non_exhaustive()
    }
}

/// Restores the previously installed handle when dropped.
///
/// Returned by [`FlowCx::enter`]. Must stay on the thread it was created on;
/// it is deliberately `!Send` (it captures thread-local state).
#[must_use = "the context is uninstalled when the guard drops"]
pub struct InstallGuard {
    prev: Option<FlowCx>,
    _not_send: PhantomData<*const ()>,
}

impl Drop for InstallGuard {
    fn drop(&mut self) {
        let prev = self.prev.take();
        CURRENT_FLOW.with(|slot| *slot.borrow_mut() = prev);
    }
}

impl fmt::Debug for InstallGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstallGuard").finish_non_exhaustive()
    }
}

/// Reads the ambient context for the current logical task.
///
/// Returns the task-scoped value when one has been [`set`]; otherwise falls
/// back to this thread's [legacy store](crate::cx::legacy), and returns
/// `None` when neither holds a value. An absent context is an ordinary
/// outcome, not an error: a task that never called [`set`] observes `None`.
///
/// The fallback exists so code migrating from plain thread-local storage
/// keeps working while call sites are converted. It is best-effort only:
/// legacy values belong to the *thread*, never follow a task across
/// suspension, and should not be relied on in new code. Use [`get_strict`]
/// to skip it.
#[must_use]
pub fn get() -> Option<AmbientContext> {
    get_strict().or_else(legacy::get)
}

/// Reads the task-scoped context only, with no legacy fallback.
///
/// Returns `None` both outside any task and inside a task that has not
/// called [`set`].
#[must_use]
pub fn get_strict() -> Option<AmbientContext> {
    FlowCx::current().and_then(|cx| cx.get())
}

/// Sets the ambient context for the current logical task.
///
/// Inside a task this writes the task-scoped slot: the value follows the
/// task across suspension and worker migration, is visible to later `get`
/// calls from the same task, and is never observed by any other task. The
/// previous task-scoped value, if any, is returned; the last write wins.
///
/// Outside any task there is no task-scoped slot, so the value goes to this
/// thread's [legacy store](crate::cx::legacy) with plain thread-local
/// semantics.
pub fn set(context: AmbientContext) -> Option<AmbientContext> {
    match FlowCx::current() {
        Some(cx) => cx.set(context),
        None => legacy::set(context),
    }
}
