//! Pluggable readiness conditions.
//!
//! A [`Condition`] is an asynchronous predicate that must hold before a
//! [`Task`] may execute. Once the host scheduler signals that a pending
//! task's dependencies are satisfied, all attached conditions are evaluated
//! concurrently; if any reports unsatisfied, the task is cancelled. Either
//! way the task then becomes ready, so a rejected task still flows through
//! the scheduler's dispatch for fast-path completion.

use crate::task::Task;
use async_trait::async_trait;
use std::sync::Arc;

/// An asynchronous readiness predicate, evaluated once per task before
/// execution.
///
/// The future resolving is the condition's single report: it must resolve
/// exactly once. There is no timeout at this layer; a condition that never
/// resolves leaves its task in `EvaluatingConditions` indefinitely.
#[async_trait]
pub trait Condition: Send + Sync {
    /// Returns whether the task may proceed to execution.
    async fn evaluate(&self, task: &Task) -> bool;
}

/// Satisfied after a minimum delay has elapsed.
///
/// Non-positive durations report satisfied immediately.
pub struct Delay {
    delay: time::Duration,
}

impl Delay {
    pub fn new(delay: time::Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl Condition for Delay {
    async fn evaluate(&self, _task: &Task) -> bool {
        if self.delay.is_positive() {
            let delay: std::time::Duration =
                self.delay.try_into().unwrap_or(std::time::Duration::MAX);
            tokio::time::sleep(delay).await;
        }
        true
    }
}

/// Inverts an inner condition.
pub struct Negated {
    inner: Arc<dyn Condition>,
}

impl Negated {
    pub fn new(inner: Arc<dyn Condition>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl Condition for Negated {
    async fn evaluate(&self, task: &Task) -> bool {
        !self.inner.evaluate(task).await
    }
}

/// Unsatisfied if any dependency of the task was cancelled.
///
/// Dependencies that have been dropped are ignored.
pub struct NoCancelledDependencies;

#[async_trait]
impl Condition for NoCancelledDependencies {
    async fn evaluate(&self, task: &Task) -> bool {
        !task
            .dependencies()
            .iter()
            .any(|dep| dep.upgrade().is_some_and(|dep| dep.is_cancelled()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delay_reports_satisfied() {
        let task = Task::new("t", ());
        assert!(
            Delay::new(time::Duration::milliseconds(5))
                .evaluate(&task)
                .await
        );
    }

    #[tokio::test]
    async fn negative_delay_is_immediate() {
        let task = Task::new("t", ());
        assert!(
            Delay::new(time::Duration::seconds(-1))
                .evaluate(&task)
                .await
        );
    }

    #[tokio::test]
    async fn negated_inverts() {
        let task = Task::new("t", ());
        let negated = Negated::new(Arc::new(Delay::new(time::Duration::ZERO)));
        assert!(!negated.evaluate(&task).await);
    }

    #[tokio::test]
    async fn cancelled_dependency_rejects() {
        let dep = Task::new("dep", ());
        dep.cancel();

        let task = Task::new("t", ());
        task.add_dependency(&dep);
        assert!(!NoCancelledDependencies.evaluate(&task).await);
    }

    #[tokio::test]
    async fn live_dependencies_pass() {
        let dep = Task::new("dep", ());
        let task = Task::new("t", ());
        task.add_dependency(&dep);
        assert!(NoCancelledDependencies.evaluate(&task).await);
    }
}
