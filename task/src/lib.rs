//! Cancellable, condition-gated, observable task primitive.
//!
//! This crate provides [`Task`], an asynchronous unit of work with an
//! explicit lifecycle, built to be driven by an external host scheduler:
//! the scheduler admits the task to its queue, signals when inter-task
//! dependencies are satisfied, polls readiness, and dispatches the task
//! onto a worker once it reports ready.
//!
//! # Pieces
//!
//! - **[`Task`]**: the lifecycle state machine (`Initialized` through
//!   `Finished`, strictly forward-only) with idempotent cancel/finish
//! - **[`Condition`]**: pluggable asynchronous readiness predicates,
//!   evaluated concurrently before execution
//! - **[`Observer`]**: pluggable lifecycle callbacks, notified in
//!   attachment order
//! - **[`Work`]** / **[`WorkFn`]**: the overridable body, with cooperative
//!   cancellation via [`CancellationToken`]
//!
//! # Example
//!
//! ```no_run
//! use gantry_task::{Task, TracingObserver, WorkFn};
//! use std::sync::Arc;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let fetch = Task::new("fetch", WorkFn::new(|token| async move {
//!     tokio::select! {
//!         _ = do_fetch() => {}
//!         _ = token.cancelled() => {}
//!     }
//! }));
//! fetch.add_observer(Arc::new(TracingObserver));
//!
//! let publish = Task::new("publish", ());
//! publish.add_dependency(&fetch);
//!
//! // The host scheduler drives admission, readiness review and dispatch:
//! fetch.mark_enqueued();
//! fetch.review_readiness();
//! if fetch.is_ready() {
//!     fetch.start();
//! }
//! # });
//! # async fn do_fetch() {}
//! ```

pub mod state;

#[cfg(feature = "tokio")]
pub mod condition;
#[cfg(feature = "tokio")]
pub mod observer;
#[cfg(feature = "tokio")]
mod serial;
#[cfg(feature = "tokio")]
pub mod task;
#[cfg(feature = "tokio")]
pub mod work;

// Re-export commonly used types at crate root
pub use async_trait::async_trait;
pub use state::TaskState;

#[cfg(feature = "tokio")]
pub use condition::Condition;
#[cfg(feature = "tokio")]
pub use observer::{Observer, TracingObserver};
#[cfg(feature = "tokio")]
pub use task::Task;
#[cfg(feature = "tokio")]
pub use work::{Work, WorkFn};

/// The token fired when a task is cancelled.
///
/// Currently an alias for `tokio_util::sync::CancellationToken`; bodies
/// select against it for cooperative abort, and host schedulers may watch
/// it to fast-path cancelled tasks out of their queues.
#[cfg(feature = "tokio")]
pub type CancellationToken = tokio_util::sync::CancellationToken;
