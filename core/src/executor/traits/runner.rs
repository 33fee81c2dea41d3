use async_trait::async_trait;

use crate::document::Task;
use crate::executor::cancel::CancelToken;
use crate::executor::scheduler::run_bounded;
use crate::executor::types::TaskResult;

/// Executes tasks on behalf of the engine.
///
/// Runners report failures through `TaskResult::success`; they never abort
/// the run themselves. When `cancel` fires a runner should stop its work and
/// return a failed result promptly.
#[async_trait]
pub trait TaskRunner: Send + Sync {
    fn name(&self) -> &str;

    async fn run_one(&self, task: &Task, cancel: &CancelToken) -> TaskResult;

    /// Runs `tasks` concurrently with at most `max_workers` in flight and
    /// returns one result per task, ordered by task id.
    async fn run_batch(
        &self,
        tasks: &[Task],
        max_workers: usize,
        cancel: &CancelToken,
    ) -> Vec<TaskResult> {
        run_bounded(tasks, max_workers, cancel, |task| self.run_one(task, cancel)).await
    }
}
