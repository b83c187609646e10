//! The overridable task body.
//!
//! [`Work`] is the strategy a [`Task`] executes when dispatched, plus the
//! completion hooks invoked on its private serial queue. Every method has a
//! no-op default, so implementers override only what they need; `()` is the
//! canonical do-nothing body.
//!
//! [`WorkFn`] adapts a plain closure into a `Work`, handing the body the
//! task's cancellation token for cooperative abort:
//!
//! ```no_run
//! use gantry_task::{Task, WorkFn};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let task = Task::new("poll", WorkFn::new(|token| async move {
//!     loop {
//!         tokio::select! {
//!             _ = tokio::time::sleep(std::time::Duration::from_millis(100)) => {}
//!             _ = token.cancelled() => break,
//!         }
//!     }
//! }));
//! # });
//! ```

use crate::task::Task;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// The body of a [`Task`].
///
/// [`run`](Work::run) is invoked on the task's private serial queue once the
/// task transitions to `Executing`; the future completing is the completion
/// signal, after which the task finishes automatically. Bodies that hand
/// their work elsewhere may call [`Task::finish`] early; it is idempotent.
///
/// Cancellation is cooperative: a running body is never interrupted, it must
/// observe [`Task::cancel_token`] itself.
#[async_trait]
pub trait Work: Send + Sync {
    /// The body proper. The base implementation does nothing.
    async fn run(&self, task: &Arc<Task>) {
        let _ = task;
    }

    /// Invoked on the serial queue when the task is cancelled, before any
    /// observer's `on_cancel`.
    fn on_cancelled(&self, task: &Task) {
        let _ = task;
    }

    /// Invoked on the serial queue when the task finishes, before any
    /// observer's `on_finish`.
    fn on_finished(&self, task: &Task) {
        let _ = task;
    }
}

/// The do-nothing body.
#[async_trait]
impl Work for () {}

/// Adapts a closure into a [`Work`].
///
/// The closure receives a clone of the task's cancellation token each time
/// the body runs.
pub struct WorkFn<F> {
    f: F,
}

impl<F> WorkFn<F> {
    pub fn new<Fut>(f: F) -> Self
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync,
        Fut: Future<Output = ()> + Send,
    {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> Work for WorkFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync,
    Fut: Future<Output = ()> + Send,
{
    async fn run(&self, task: &Arc<Task>) {
        (self.f)(task.cancel_token().clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn work_fn_runs_the_closure() {
        let ran = Arc::new(AtomicBool::new(false));
        let probe = ran.clone();

        let task = Task::new(
            "t",
            WorkFn::new(move |_token| {
                let probe = probe.clone();
                async move {
                    probe.store(true, Ordering::SeqCst);
                }
            }),
        );
        task.mark_enqueued();
        task.review_readiness();
        task.start();

        for _ in 0..200 {
            if task.is_finished() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(task.is_finished());
        assert!(ran.load(Ordering::SeqCst));
    }
}
