//! Attaching a context handle to a future.
//!
//! The bundled runtimes install a task's [`FlowCx`] around every poll
//! themselves. Code that drives futures some other way (a hand-rolled
//! executor, a test harness, an FFI callback loop) can get the same
//! behavior by wrapping the future in [`Attached`]: each poll runs with the
//! handle installed, and the thread is restored to its previous state before
//! the poll returns, even if the inner future panics.

use crate::cx::cx::FlowCx;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// A future that polls its inner future with a [`FlowCx`] installed.
///
/// Created by [`FlowCx::attach`]. The inner future is boxed, so `Attached`
/// is `Unpin` regardless of the future it wraps.
pub struct Attached<F> {
    cx: FlowCx,
    inner: Pin<Box<F>>,
}

impl FlowCx {
    /// Wraps `future` so that every poll runs with this handle installed.
    ///
    /// Context reads and writes inside the future resolve to this handle's
    /// slot, exactly as if the future were running on one of the bundled
    /// runtimes.
    pub fn attach<F: Future>(&self, future: F) -> Attached<F> {
        Attached {
            cx: self.clone(),
            inner: Box::pin(future),
        }
    }
}

impl<F: Future> Future for Attached<F> {
    type Output = F::Output;

    fn poll(mut self: Pin<&mut Self>, task_cx: &mut Context<'_>) -> Poll<Self::Output> {
        let _guard = self.cx.enter();
        self.inner.as_mut().poll(task_cx)
    }
}

impl<F> std::fmt::Debug for Attached<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attached").field("cx", &self.cx).finish()
    }
}
