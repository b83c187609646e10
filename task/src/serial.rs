//! The task-private serial execution context.
//!
//! Each [`Task`](crate::Task) owns one `SerialQueue`: an unbounded channel of
//! boxed futures drained by a single consumer. Everything that must be
//! serialized relative to the rest of the task's lifecycle runs here:
//! condition-result aggregation, the dispatched body, and the cancel/finish
//! notification callbacks. Submitting a job is a non-blocking handoff; the
//! caller never waits for the job to run.
//!
//! The drainer exits once the owning task (and every queued job still holding
//! it) has been dropped, closing the channel.

use futures::FutureExt;
use futures::future::BoxFuture;
use std::future::Future;
use tracing::Instrument;

pub(crate) struct SerialQueue {
    tx: flume::Sender<BoxFuture<'static, ()>>,
}

impl SerialQueue {
    /// Spawns the drainer. Must be called from within a tokio runtime.
    pub(crate) fn new(name: &str) -> Self {
        let (tx, rx) = flume::unbounded::<BoxFuture<'static, ()>>();

        let span = tracing::trace_span!(parent: None, "task_queue", task = name);
        span.follows_from(tracing::Span::current());
        tokio::spawn(
            async move {
                while let Ok(job) = rx.recv_async().await {
                    job.await;
                }
            }
            .instrument(span),
        );

        Self { tx }
    }

    /// Submits a job to run after every previously submitted job completes.
    pub(crate) fn submit(&self, job: impl Future<Output = ()> + Send + 'static) {
        // Fails only once the runtime has torn the drainer down; nothing can
        // observe the notification at that point.
        _ = self.tx.send(job.boxed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn jobs_run_in_submission_order() {
        let queue = SerialQueue::new("test");
        let log = Arc::new(std::sync::Mutex::new(Vec::new()));

        for i in 0..10 {
            let log = log.clone();
            queue.submit(async move {
                // Yield so an out-of-order drainer would interleave.
                tokio::task::yield_now().await;
                log.lock().unwrap().push(i);
            });
        }

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(*log.lock().unwrap(), (0..10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn later_jobs_wait_for_earlier_ones() {
        let queue = SerialQueue::new("test");
        let running = Arc::new(AtomicUsize::new(0));
        let overlap = Arc::new(AtomicUsize::new(0));

        for _ in 0..4 {
            let running = running.clone();
            let overlap = overlap.clone();
            queue.submit(async move {
                if running.fetch_add(1, Ordering::SeqCst) > 0 {
                    overlap.fetch_add(1, Ordering::SeqCst);
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
                running.fetch_sub(1, Ordering::SeqCst);
            });
        }

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(overlap.load(Ordering::SeqCst), 0);
    }
}
