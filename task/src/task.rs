//! The cancellable task state machine.
//!
//! # Locking discipline
//!
//! Two guarded regions, never collapsed into one:
//!
//! 1. The *state lock* (`spin::Mutex<Lifecycle>`) guards only the `state`
//!    and `cancelled` fields. Critical sections are O(1) field access; the
//!    guard is never held across an observer/work callback or an await
//!    point. A callback may be invoked from another thread that
//!    synchronously re-reads these fields, so holding the lock across one
//!    would deadlock.
//!
//! 2. The *operation lock* (`parking_lot::ReentrantMutex<()>`) makes each
//!    composite read-then-write operation (enqueue, readiness review, the
//!    start/cancel/finish transitions, the readiness check, list mutation)
//!    atomic as a whole relative to the others. It is reentrant because
//!    [`Task::cancel`] is invoked from inside guarded condition aggregation
//!    and [`Task::finish`] from inside the guarded pre-cancelled dispatch
//!    path. Like the state lock, it is never held across an
//!    externally-visible callback or an await point.
//!
//! All asynchronous lifecycle work (condition aggregation, the dispatched
//! body, cancel/finish notification) runs on the task's private
//! [`SerialQueue`], which serializes it without blocking callers.

use crate::condition::Condition;
use crate::observer::Observer;
use crate::serial::SerialQueue;
use crate::state::{Lifecycle, TaskState};
use crate::work::Work;
use std::sync::{Arc, Mutex, Weak};
use tokio_util::sync::CancellationToken;
use trace_err::*;
use tracing::{debug, trace};

/// An asynchronous unit of work with explicit lifecycle states, pluggable
/// readiness conditions, dependency gating, and observer notification.
///
/// A `Task` does not schedule itself: it is driven by an external host
/// scheduler, which admits it ([`mark_enqueued`](Task::mark_enqueued)),
/// signals dependency satisfaction ([`review_readiness`](Task::review_readiness)),
/// polls [`is_ready`](Task::is_ready), and dispatches it ([`start`](Task::start)).
///
/// # Example
///
/// ```no_run
/// use gantry_task::{Task, WorkFn};
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let task = Task::new("greet", WorkFn::new(|_token| async {
///     println!("hello");
/// }));
///
/// // Normally the host scheduler drives these.
/// task.mark_enqueued();
/// task.review_readiness();
/// assert!(task.is_ready());
/// task.start();
/// # });
/// ```
///
/// Must be created from within a tokio runtime: construction spawns the
/// task's private serial execution context.
pub struct Task {
    name: Box<str>,
    work: Box<dyn Work>,

    /// State lock. See the module header.
    lifecycle: spin::Mutex<Lifecycle>,

    /// Operation lock. See the module header.
    op_lock: parking_lot::ReentrantMutex<()>,

    /// The native cancellation machinery: mirrors `Lifecycle::cancelled` for
    /// asynchronous observation by the host scheduler and cooperative bodies.
    cancel_token: CancellationToken,

    conditions: Mutex<Vec<Arc<dyn Condition>>>,
    observers: Mutex<Vec<Arc<dyn Observer>>>,
    dependencies: Mutex<Vec<Weak<Task>>>,

    queue: SerialQueue,
}

impl Task {
    /// Creates a task in the `Initialized` state with the given body.
    ///
    /// `name` is a diagnostic label carried through tracing spans and
    /// observer log lines. Use `()` as the body for a task that does nothing
    /// when executed.
    pub fn new(name: &str, work: impl Work + 'static) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            work: Box::new(work),
            lifecycle: spin::Mutex::new(Lifecycle::new()),
            op_lock: parking_lot::ReentrantMutex::new(()),
            cancel_token: CancellationToken::new(),
            conditions: Mutex::new(Vec::new()),
            observers: Mutex::new(Vec::new()),
            dependencies: Mutex::new(Vec::new()),
            queue: SerialQueue::new(name),
        })
    }

    /// The diagnostic label given at construction.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The current lifecycle state.
    pub fn state(&self) -> TaskState {
        self.lifecycle.lock().state
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.lifecycle.lock().cancelled
    }

    /// Whether the task has reached its terminal state.
    pub fn is_finished(&self) -> bool {
        self.state().is_terminal()
    }

    /// The token fired when this task is cancelled.
    ///
    /// Bodies select against it for cooperative abort; the host scheduler
    /// may watch it to fast-path cancelled tasks out of its queue.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel_token
    }

    /// Attaches a lifecycle observer and synchronously invokes its
    /// [`on_attach`](Observer::on_attach) hook.
    ///
    /// Observers are notified in attachment order.
    ///
    /// # Panics
    ///
    /// Panics if execution has already begun: the observer list is fixed
    /// once `state >= Executing`.
    pub fn add_observer(&self, observer: Arc<dyn Observer>) {
        {
            let _op = self.op_lock.lock();
            assert!(
                self.state() < TaskState::Executing,
                "task '{}': observers may not be attached once execution has begun",
                self.name
            );
            self.observers
                .lock()
                .trace_expect("Failed to lock observer list")
                .push(observer.clone());
        }
        observer.on_attach(self);
    }

    /// Attaches a readiness condition.
    ///
    /// # Panics
    ///
    /// Panics if condition evaluation has already begun: the condition list
    /// is fixed once `state >= EvaluatingConditions`.
    pub fn add_condition(&self, condition: Arc<dyn Condition>) {
        let _op = self.op_lock.lock();
        assert!(
            self.state() < TaskState::EvaluatingConditions,
            "task '{}': conditions may not be attached once evaluation has begun",
            self.name
        );
        self.conditions
            .lock()
            .trace_expect("Failed to lock condition list")
            .push(condition);
    }

    /// Records a scheduling dependency on another task.
    ///
    /// The relation is non-owning: dropping the other task counts as
    /// satisfaction. Multiple calls record multiple edges. Dependency
    /// resolution itself belongs to the host scheduler, which signals
    /// changes via [`review_readiness`](Task::review_readiness).
    pub fn add_dependency(&self, other: &Arc<Task>) {
        let _op = self.op_lock.lock();
        self.dependencies
            .lock()
            .trace_expect("Failed to lock dependency list")
            .push(Arc::downgrade(other));
    }

    /// A snapshot of the task's dependency edges.
    pub fn dependencies(&self) -> Vec<Weak<Task>> {
        self.dependencies
            .lock()
            .trace_expect("Failed to lock dependency list")
            .clone()
    }

    /// Called once by the host scheduler when the task is admitted to its
    /// queue. No-op unless the task is still `Initialized`.
    pub fn mark_enqueued(&self) {
        let _op = self.op_lock.lock();
        if self.state() == TaskState::Initialized {
            self.transition_to(TaskState::Pending);
        }
    }

    /// The dependency-satisfaction callback: the host scheduler calls this
    /// whenever inter-task ordering may have changed (typically after any
    /// task finishes).
    ///
    /// If the task is `Pending`, not cancelled, and every dependency has
    /// finished, condition evaluation begins, exactly once; redundant
    /// signals are suppressed. A task with no conditions moves straight to
    /// `Ready` before this method returns.
    ///
    /// Signals delivered before [`mark_enqueued`](Task::mark_enqueued) are
    /// no-ops: the scheduler must review readiness after admission.
    #[cfg_attr(
        feature = "instrument",
        tracing::instrument(skip_all, fields(task = %self.name))
    )]
    pub fn review_readiness(self: &Arc<Self>) {
        let _op = self.op_lock.lock();

        {
            let lifecycle = self.lifecycle.lock();
            if lifecycle.state != TaskState::Pending || lifecycle.cancelled {
                return;
            }
        }
        if !self.dependencies_satisfied() {
            return;
        }

        let conditions = self
            .conditions
            .lock()
            .trace_expect("Failed to lock condition list")
            .clone();
        if conditions.is_empty() {
            self.transition_to(TaskState::Ready);
            return;
        }

        self.transition_to(TaskState::EvaluatingConditions);

        let task = self.clone();
        self.queue.submit(async move {
            // Evaluated concurrently; results land in attachment order
            // regardless of completion order.
            let results =
                futures::future::join_all(conditions.iter().map(|c| c.evaluate(&task))).await;

            let _op = task.op_lock.lock();
            if results.contains(&false) {
                debug!(task = %task.name, "readiness condition unsatisfied");
                task.cancel();
            }
            task.transition_to(TaskState::Ready);
        });
    }

    /// Dispatches the task, redirecting execution onto its private serial
    /// queue (a non-blocking handoff). Called by the host scheduler's worker
    /// dispatch.
    ///
    /// If cancellation preceded dispatch the task completes via
    /// [`finish`](Task::finish) without running the body. Otherwise it
    /// transitions to `Executing`, notifies every observer's
    /// [`on_start`](Observer::on_start) in attachment order, runs the body,
    /// and finishes when the body's future completes.
    #[cfg_attr(
        feature = "instrument",
        tracing::instrument(skip_all, fields(task = %self.name))
    )]
    pub fn start(self: &Arc<Self>) {
        let task = self.clone();
        self.queue.submit(async move {
            let proceed = {
                let _op = task.op_lock.lock();
                if task.is_cancelled() {
                    // Fast-path completion: the body never runs.
                    task.finish();
                    false
                } else {
                    task.transition_to(TaskState::Executing);
                    true
                }
            };

            if proceed {
                for observer in task.observers_snapshot() {
                    observer.on_start(&task);
                }
                task.work.run(&task).await;
                task.finish();
            }
        });
    }

    /// Requests cancellation. Idempotent: only the first call has effect.
    ///
    /// Sets the cancelled flag, fires the cancellation token, and
    /// asynchronously (on the serial queue) invokes the body's
    /// [`on_cancelled`](Work::on_cancelled) hook followed by every
    /// observer's [`on_cancel`](Observer::on_cancel).
    ///
    /// Cancellation is cooperative: a body already executing is never
    /// interrupted, it must observe [`cancel_token`](Task::cancel_token)
    /// itself. The task still finishes afterwards; cancellation never skips
    /// the finish notification.
    #[cfg_attr(
        feature = "instrument",
        tracing::instrument(skip_all, fields(task = %self.name))
    )]
    pub fn cancel(self: &Arc<Self>) {
        {
            let _op = self.op_lock.lock();
            let mut lifecycle = self.lifecycle.lock();
            if lifecycle.cancelled {
                return;
            }
            lifecycle.cancelled = true;
        }

        debug!(task = %self.name, "cancelled");
        self.cancel_token.cancel();

        let task = self.clone();
        self.queue.submit(async move {
            task.work.on_cancelled(&task);
            for observer in task.observers_snapshot() {
                observer.on_cancel(&task);
            }
        });
    }

    /// Completes the task. Idempotent: effective only while
    /// `state < Finished`.
    ///
    /// Transitions to `Finished`, then asynchronously (on the serial queue)
    /// invokes the body's [`on_finished`](Work::on_finished) hook followed
    /// by every observer's [`on_finish`](Observer::on_finish).
    ///
    /// Called automatically when the body's future completes; bodies that
    /// hand their work elsewhere may call it early.
    #[cfg_attr(
        feature = "instrument",
        tracing::instrument(skip_all, fields(task = %self.name))
    )]
    pub fn finish(self: &Arc<Self>) {
        {
            let _op = self.op_lock.lock();
            if self.state() == TaskState::Finished {
                return;
            }
            self.transition_to(TaskState::Finished);
        }

        debug!(task = %self.name, "finished");

        let task = self.clone();
        self.queue.submit(async move {
            task.work.on_finished(&task);
            for observer in task.observers_snapshot() {
                observer.on_finish(&task);
            }
        });
    }

    /// Whether the host scheduler may dispatch this task.
    ///
    /// True once cancelled, regardless of dependencies or conditions, so
    /// the scheduler can pull the task off its queue for fast-path
    /// completion. Otherwise true only when every dependency has finished
    /// and the task has reached `Ready`.
    pub fn is_ready(&self) -> bool {
        let _op = self.op_lock.lock();
        {
            let lifecycle = self.lifecycle.lock();
            if lifecycle.cancelled {
                return true;
            }
            if lifecycle.state < TaskState::Ready {
                return false;
            }
        }
        self.dependencies_satisfied()
    }

    /// The native dependency check: every still-live dependency has
    /// finished. Dropped dependencies count as satisfied.
    fn dependencies_satisfied(&self) -> bool {
        self.dependencies
            .lock()
            .trace_expect("Failed to lock dependency list")
            .iter()
            .all(|dep| dep.upgrade().is_none_or(|dep| dep.is_finished()))
    }

    fn observers_snapshot(&self) -> Vec<Arc<dyn Observer>> {
        self.observers
            .lock()
            .trace_expect("Failed to lock observer list")
            .clone()
    }

    /// Advances `state`. Must be called under the operation lock.
    ///
    /// # Panics
    ///
    /// Panics if `next` is not strictly greater than the current state.
    fn transition_to(&self, next: TaskState) {
        let mut lifecycle = self.lifecycle.lock();
        assert!(
            next > lifecycle.state,
            "task '{}': state may only advance, not {:?} -> {:?}",
            self.name,
            lifecycle.state,
            next
        );
        trace!(task = %self.name, from = ?lifecycle.state, to = ?next, "state advance");
        lifecycle.state = next;
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let lifecycle = self.lifecycle.lock();
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("state", &lifecycle.state)
            .field("cancelled", &lifecycle.cancelled)
            .finish()
    }
}
