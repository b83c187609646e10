//! Pluggable lifecycle observers.
//!
//! An [`Observer`] is notified as a [`Task`] moves through its lifecycle.
//! All hooks are side-effect only and default to no-ops. `on_attach` fires
//! synchronously inside [`Task::add_observer`]; the remaining hooks fire on
//! the task's private serial queue, in attachment order, so notifications
//! for one task never interleave.
//!
//! The task owns its observers (`Arc`); an observer must hold at most a
//! non-owning back-reference to the task.

use crate::task::Task;
use tracing::debug;

/// Lifecycle notification hooks for a [`Task`].
pub trait Observer: Send + Sync {
    /// The observer was attached via [`Task::add_observer`].
    fn on_attach(&self, task: &Task) {
        let _ = task;
    }

    /// The task transitioned to `Executing` and is about to run its body.
    fn on_start(&self, task: &Task) {
        let _ = task;
    }

    /// Cancellation was requested. Fires at most once per task.
    fn on_cancel(&self, task: &Task) {
        let _ = task;
    }

    /// The task reached `Finished`. Fires at most once per task, even after
    /// cancellation.
    fn on_finish(&self, task: &Task) {
        let _ = task;
    }
}

/// Logs lifecycle events through `tracing` at debug level.
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn on_attach(&self, task: &Task) {
        debug!(task = task.name(), "observer attached");
    }

    fn on_start(&self, task: &Task) {
        debug!(task = task.name(), "started");
    }

    fn on_cancel(&self, task: &Task) {
        debug!(task = task.name(), "cancel observed");
    }

    fn on_finish(&self, task: &Task) {
        debug!(task = task.name(), "finish observed");
    }
}

/// Counts lifecycle outcomes through the `metrics` facade.
#[cfg(feature = "metrics")]
pub struct MetricsObserver;

#[cfg(feature = "metrics")]
impl Observer for MetricsObserver {
    fn on_start(&self, _task: &Task) {
        metrics::counter!("task_started").increment(1);
    }

    fn on_cancel(&self, _task: &Task) {
        metrics::counter!("task_cancelled").increment(1);
    }

    fn on_finish(&self, _task: &Task) {
        metrics::counter!("task_finished").increment(1);
    }
}
