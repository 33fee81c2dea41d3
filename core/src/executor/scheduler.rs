use std::future::Future;
use std::sync::Arc;

use futures::stream::FuturesUnordered;
use futures::StreamExt;
use tokio::sync::Semaphore;

use crate::document::Task;

use super::cancel::CancelToken;
use super::types::TaskResult;

/// Run `tasks` with at most `max_workers` in flight.
///
/// Tasks that have not acquired a slot when `cancel` fires are reported as
/// failed without being started. Results are returned sorted by task id.
pub async fn run_bounded<'a, F, Fut>(
    tasks: &'a [Task],
    max_workers: usize,
    cancel: &CancelToken,
    run: F,
) -> Vec<TaskResult>
where
    F: Fn(&'a Task) -> Fut,
    Fut: Future<Output = TaskResult>,
{
    let sem = Arc::new(Semaphore::new(max_workers.max(1)));
    let mut futs = FuturesUnordered::new();

    for task in tasks {
        let sem = sem.clone();
        let cancel = cancel.clone();
        let fut = run(task);

        futs.push(async move {
            let _permit = match sem.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    return TaskResult::failed(task.id, "", "worker pool closed unexpectedly", 0.0)
                }
            };
            if cancel.is_cancelled() {
                return TaskResult::failed(task.id, "", "cancelled before start", 0.0);
            }
            fut.await
        });
    }

    let mut results = Vec::with_capacity(tasks.len());
    while let Some(result) = futs.next().await {
        results.push(result);
    }
    results.sort_by_key(|r| r.task_id);
    results
}
