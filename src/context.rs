use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::{CancellationToken, DropGuard};
use tokio_util::task::TaskTracker;

/// Why a [`Context`] stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Canceled,
    DeadlineExceeded,
}

/// Cancellation signal shared by a session's coordinator and all of its fetchers.
///
/// A context ends either when [`Context::cancel`] is called (on it or on a parent)
/// or when its deadline passes. Clones observe the same signal. Clones and
/// children also share one task tracker, so [`Context::active_tasks`] counts
/// every fetcher spawned under this context that has not exited yet.
#[derive(Debug, Clone, Default)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
    tasks: TaskTracker,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Some(deadline),
            tasks: TaskTracker::new(),
        }
    }

    /// A context that ends with this one but can also be cancelled on its own.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
            tasks: self.tasks.clone(),
        }
    }

    /// Spawns a task counted by [`Context::active_tasks`] until it exits.
    pub(crate) fn spawn<F>(&self, task: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.tasks.spawn(task)
    }

    /// Tasks spawned under this context (or its children) that are still running.
    pub fn active_tasks(&self) -> usize {
        self.tasks.len()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Cancels this context when the returned guard is dropped.
    pub fn cancel_on_drop(&self) -> DropGuard {
        self.token.clone().drop_guard()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_done(&self) -> bool {
        self.termination().is_some()
    }

    /// Explicit cancellation takes precedence over an elapsed deadline.
    pub fn termination(&self) -> Option<Termination> {
        if self.token.is_cancelled() {
            return Some(Termination::Canceled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(Termination::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolves once the context has ended.
    pub async fn done(&self) -> Termination {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    biased;
                    _ = self.token.cancelled() => Termination::Canceled,
                    _ = sleep_until(deadline) => Termination::DeadlineExceeded,
                }
            }
            None => {
                self.token.cancelled().await;
                Termination::Canceled
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cancel_reports_canceled() {
        let ctx = Context::new();
        assert_eq!(ctx.termination(), None);
        ctx.cancel();
        assert!(ctx.is_done());
        assert_eq!(ctx.done().await, Termination::Canceled);
    }

    #[tokio::test]
    async fn elapsed_deadline_reports_deadline_exceeded() {
        let ctx = Context::with_timeout(Duration::from_millis(50));
        assert!(!ctx.is_done());
        assert_eq!(ctx.done().await, Termination::DeadlineExceeded);
        assert_eq!(ctx.termination(), Some(Termination::DeadlineExceeded));
    }

    #[tokio::test]
    async fn child_follows_parent_but_not_the_reverse() {
        let parent = Context::with_timeout(Duration::from_secs(60));
        let child = parent.child();
        assert_eq!(child.deadline(), parent.deadline());

        child.cancel();
        assert!(child.is_done());
        assert!(!parent.is_done());

        let other = parent.child();
        parent.cancel();
        assert_eq!(other.done().await, Termination::Canceled);
    }

    #[tokio::test]
    async fn children_share_the_task_count() {
        let parent = Context::new();
        let child = parent.child();
        let gate = child.clone();
        let handle = child.spawn(async move {
            gate.done().await;
        });
        assert_eq!(parent.active_tasks(), 1);

        parent.cancel();
        handle.await.unwrap();
        while parent.active_tasks() > 0 {
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn guard_cancels_on_drop() {
        let ctx = Context::new();
        {
            let _guard = ctx.cancel_on_drop();
            assert!(!ctx.is_done());
        }
        assert_eq!(ctx.termination(), Some(Termination::Canceled));
    }
}
