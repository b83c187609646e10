//! Task lifecycle states.
//!
//! A [`Task`](crate::Task) moves through a strict total order of states:
//!
//! ```text
//!     Initialized ──► Pending ──► EvaluatingConditions ──► Ready ──► Executing ──► Finished
//!                         │                                  ▲                        ▲
//!                         │  (no conditions attached)        │                        │
//!                         └──────────────────────────────────┘     (cancelled before dispatch)
//! ```
//!
//! Transitions only ever move forward in this order. Forward skips are legal
//! (a task cancelled before dispatch completes `Pending → Finished` without
//! executing); any backward move is a caller bug and aborts via `assert!`.
//!
//! Cancellation is an independent axis: it never changes `state` by itself,
//! and is set at most once.

/// Lifecycle state of a [`Task`](crate::Task).
///
/// The derived [`Ord`] follows the declaration order, which is the only legal
/// direction of travel: a transition to state `S` is valid only if `S` is
/// strictly greater than the current state.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TaskState {
    /// Created, not yet admitted to a host scheduler queue.
    Initialized = 0,

    /// Admitted to the queue, waiting for dependency satisfaction.
    Pending = 1,

    /// Readiness conditions are being evaluated. Skipped entirely when the
    /// task has no conditions.
    EvaluatingConditions = 2,

    /// Eligible for dispatch by the host scheduler.
    Ready = 3,

    /// The body is running on a worker.
    Executing = 4,

    /// Terminal. The finish notification has been (or is being) delivered.
    Finished = 5,
}

impl TaskState {
    /// Returns `true` for the terminal state.
    pub const fn is_terminal(self) -> bool {
        matches!(self, TaskState::Finished)
    }
}

/// The fields guarded by the state lock: nothing else may live under it, and
/// it is never held across a notification hook or an await point.
pub(crate) struct Lifecycle {
    pub state: TaskState,
    pub cancelled: bool,
}

impl Lifecycle {
    pub(crate) const fn new() -> Self {
        Self {
            state: TaskState::Initialized,
            cancelled: false,
        }
    }
}
