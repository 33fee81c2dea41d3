use std::sync::Arc;
use std::time::Instant;

use uuid::Uuid;

use crate::document::Task;

use super::cancel::CancelToken;
use super::progress::ProgressMonitor;
use super::traits::{OutputRendererPlugin, RenderEvent, TaskRunner};
use super::types::{ExecutionOpts, ExecutionResult, RunStatus, StageTaskResult, TaskResult};

/// Flat task lists are reported as a single implicit stage.
const LIST_STAGE: usize = 0;

/// Runs a flat task list (a document without stages).
///
/// Every task runs even when an earlier one fails; there is no checkpoint
/// and no conflict planning. With more than one worker and more than one
/// task the list runs as one bounded batch, otherwise serially. The run is
/// `AllCompleted` only when every task succeeded.
pub async fn execute_task_list(
    tasks: &[Task],
    runner: Arc<dyn TaskRunner>,
    opts: ExecutionOpts,
    renderer: Option<Arc<dyn OutputRendererPlugin>>,
    task_file: &str,
    cancel: CancelToken,
) -> ExecutionResult {
    let start = Instant::now();
    let run_id = Uuid::new_v4().to_string();
    let emit = |event: RenderEvent| {
        if let Some(renderer) = &renderer {
            renderer.render(&event);
        }
    };

    let workers = opts.worker_count(opts.max_parallel);
    tracing::info!(run_id = %run_id, tasks = tasks.len(), workers, "task list run started");
    emit(RenderEvent::RunStart {
        run_id: run_id.clone(),
        task_file: task_file.to_string(),
        total_stages: 1,
        total_tasks: tasks.len(),
        resume_from: None,
    });

    let mut progress = ProgressMonitor::new(tasks.len(), opts.progress_bar);
    let mut results: Vec<TaskResult> = Vec::with_capacity(tasks.len());

    if workers > 1 && tasks.len() > 1 {
        for task in tasks {
            progress.add_task(LIST_STAGE, task.id, &task.description);
            emit(task_start(&run_id, task));
        }
        let mut batch = runner.run_batch(tasks, workers, &cancel).await;
        batch.sort_by_key(|r| r.task_id);
        for task in tasks {
            let result = match batch.iter().position(|r| r.task_id == task.id) {
                Some(index) => batch.remove(index),
                None => TaskResult::failed(task.id, "", "runner returned no result", 0.0),
            };
            progress.complete_task(LIST_STAGE, task.id, result.success, result.duration_secs);
            emit(task_complete(&run_id, &result));
            results.push(result);
        }
    } else {
        for task in tasks {
            if cancel.is_cancelled() {
                break;
            }
            progress.add_task(LIST_STAGE, task.id, &task.description);
            emit(task_start(&run_id, task));
            let result = runner.run_one(task, &cancel).await;
            progress.complete_task(LIST_STAGE, task.id, result.success, result.duration_secs);
            emit(task_complete(&run_id, &result));
            results.push(result);
        }
    }

    for result in results.iter().filter(|r| !r.success) {
        tracing::warn!(
            task_id = result.task_id,
            error = result.error_message.as_deref().unwrap_or(""),
            "task failed"
        );
    }

    let all_succeeded = results.len() == tasks.len() && results.iter().all(|r| r.success);
    let status = if cancel.is_cancelled() {
        progress.finish("⏹ Cancelled");
        RunStatus::Cancelled
    } else if all_succeeded {
        progress.finish("✅ All tasks completed");
        RunStatus::AllCompleted
    } else {
        progress.finish("❌ Some tasks failed");
        RunStatus::Failed
    };

    let result = ExecutionResult {
        run_id: run_id.clone(),
        status,
        total_stages: 1,
        total_tasks: tasks.len(),
        resumed_from: 0,
        skipped_tasks: 0,
        failed_stage: (status == RunStatus::Failed).then_some(LIST_STAGE),
        duration_ms: start.elapsed().as_millis() as u64,
        task_results: results
            .into_iter()
            .map(|result| StageTaskResult {
                stage_id: LIST_STAGE,
                result,
            })
            .collect(),
    };

    tracing::info!(
        run_id = %run_id,
        status = status.as_str(),
        executed = result.executed(),
        failed = result.failed(),
        "task list run finished"
    );
    emit(RenderEvent::RunEnd {
        run_id,
        result: result.clone(),
    });
    result
}

fn task_start(run_id: &str, task: &Task) -> RenderEvent {
    RenderEvent::TaskStart {
        run_id: run_id.to_string(),
        stage_id: LIST_STAGE,
        task_id: task.id,
        description: task.description.clone(),
    }
}

fn task_complete(run_id: &str, result: &TaskResult) -> RenderEvent {
    RenderEvent::TaskComplete {
        run_id: run_id.to_string(),
        stage_id: LIST_STAGE,
        result: result.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Fails tasks whose description starts with "fail"; tracks peak concurrency.
    #[derive(Default)]
    struct ListRunner {
        calls: Mutex<Vec<String>>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl TaskRunner for ListRunner {
        fn name(&self) -> &str {
            "list"
        }

        async fn run_one(&self, task: &Task, _cancel: &CancelToken) -> TaskResult {
            self.calls.lock().unwrap().push(task.description.clone());
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            if task.description.starts_with("fail") {
                TaskResult::failed(task.id, &task.description, "exit status 1", 0.0)
            } else {
                TaskResult::succeeded(task.id, &task.description, String::new(), 0.0)
            }
        }
    }

    #[derive(Default)]
    struct Collect(Mutex<Vec<&'static str>>);

    impl OutputRendererPlugin for Collect {
        fn name(&self) -> &str {
            "collect"
        }
        fn format(&self) -> &str {
            "test"
        }
        fn render(&self, event: &RenderEvent) {
            self.0.lock().unwrap().push(event.kind());
        }
    }

    fn tasks(descriptions: &[&str]) -> Vec<Task> {
        descriptions
            .iter()
            .enumerate()
            .map(|(i, d)| Task::new(i as u32 + 1, *d))
            .collect()
    }

    fn opts(single: bool) -> ExecutionOpts {
        ExecutionOpts {
            max_parallel: 4,
            single,
            progress_bar: false,
            cpu_count: 4,
        }
    }

    #[tokio::test]
    async fn serial_list_runs_every_task_despite_failures() {
        let runner = Arc::new(ListRunner::default());
        let list = tasks(&["one", "fail two", "three"]);

        let result = execute_task_list(
            &list,
            runner.clone(),
            opts(true),
            None,
            "tasks.md",
            CancelToken::new(),
        )
        .await;

        assert_eq!(*runner.calls.lock().unwrap(), vec!["one", "fail two", "three"]);
        assert_eq!(runner.peak.load(Ordering::SeqCst), 1);
        assert_eq!(result.status, RunStatus::Failed);
        assert_eq!(result.executed(), 3);
        assert_eq!(result.failed(), 1);
    }

    #[tokio::test]
    async fn parallel_list_uses_bounded_workers() {
        let runner = Arc::new(ListRunner::default());
        let list = tasks(&["a", "b", "c", "d", "e", "f"]);
        let renderer = Arc::new(Collect::default());

        let result = execute_task_list(
            &list,
            runner.clone(),
            ExecutionOpts {
                max_parallel: 3,
                ..opts(false)
            },
            Some(renderer.clone()),
            "tasks.md",
            CancelToken::new(),
        )
        .await;

        assert!(result.is_success());
        assert_eq!(result.executed(), 6);
        let peak = runner.peak.load(Ordering::SeqCst);
        assert!(peak > 1 && peak <= 3, "peak concurrency {peak}");

        let kinds = renderer.0.lock().unwrap().clone();
        assert_eq!(kinds.first(), Some(&"run.start"));
        assert_eq!(kinds.last(), Some(&"run.end"));
        assert_eq!(kinds.iter().filter(|k| **k == "task.complete").count(), 6);
    }

    #[tokio::test]
    async fn single_task_runs_serially() {
        let runner = Arc::new(ListRunner::default());
        let result = execute_task_list(
            &tasks(&["only"]),
            runner.clone(),
            opts(false),
            None,
            "tasks.md",
            CancelToken::new(),
        )
        .await;
        assert!(result.is_success());
        assert_eq!(*runner.calls.lock().unwrap(), vec!["only"]);
    }

    #[tokio::test]
    async fn cancelled_before_start_runs_nothing() {
        let runner = Arc::new(ListRunner::default());
        let cancel = CancelToken::new();
        cancel.cancel();

        let result = execute_task_list(
            &tasks(&["one", "two"]),
            runner.clone(),
            opts(true),
            None,
            "tasks.md",
            cancel,
        )
        .await;

        assert_eq!(result.status, RunStatus::Cancelled);
        assert!(runner.calls.lock().unwrap().is_empty());
    }
}
