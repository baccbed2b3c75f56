//! Task lifetime shared by everything an experiment spawns.

use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Owns the cancellation token and the set of tasks of one experiment.
///
/// Consumers and actors all watch the same token, so one `cancel` reaches
/// every long-running task.
#[derive(Debug, Clone, Default)]
pub struct TaskScope {
    cancel: CancellationToken,
    tracker: TaskTracker,
}

impl TaskScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// A clone of the shared token, for tasks to watch.
    pub fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Spawn a tracked task on the current runtime.
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tracker.spawn(task);
    }

    /// Signal every task to stop. Idempotent.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Number of tasks still running.
    pub fn active(&self) -> usize {
        self.tracker.len()
    }

    /// Wait up to `grace` for every task to finish.
    ///
    /// Closes the scope to new tasks. Returns `true` if all tasks finished in
    /// time.
    pub async fn wait(&self, grace: Duration) -> bool {
        self.tracker.close();
        tokio::time::timeout(grace, self.tracker.wait()).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cancel_reaches_spawned_tasks() {
        let scope = TaskScope::new();
        for _ in 0..4 {
            let token = scope.token();
            scope.spawn(async move { token.cancelled().await });
        }
        assert_eq!(scope.active(), 4);

        scope.cancel();
        assert!(scope.is_cancelled());
        assert!(scope.wait(Duration::from_secs(1)).await);
        assert_eq!(scope.active(), 0);
    }

    #[tokio::test]
    async fn test_wait_times_out_on_stuck_task() {
        let scope = TaskScope::new();
        scope.spawn(std::future::pending());
        assert!(!scope.wait(Duration::from_millis(20)).await);
    }
}
