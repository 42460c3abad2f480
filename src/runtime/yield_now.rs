//! Yield points for cooperative multitasking.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Suspends the current task once and reschedules it immediately.
///
/// The task goes back through the run queue, so on a multi-worker pool it
/// may resume on a different thread. Its ambient context follows it either
/// way.
///
/// ```ignore
/// flowcx::set(AmbientContext::for_request("req-1"));
/// flowcx::runtime::yield_now().await;
/// assert!(flowcx::get().is_some()); // same task, same context
/// ```
pub async fn yield_now() {
    YieldNow { yielded: false }.await;
}

struct YieldNow {
    yielded: bool,
}

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            return Poll::Ready(());
        }
        self.yielded = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}
