use std::sync::Arc;
use std::time::Instant;

use uuid::Uuid;

use crate::checkpoint::{CheckpointStore, LoadOutcome};
use crate::document::{Stage, StageMode, Task};
use crate::error::ExecutorError;

use super::batch::{create_batches, ExecutionPlan};
use super::cancel::CancelToken;
use super::conflict::detect_conflicts;
use super::progress::ProgressMonitor;
use super::traits::{OutputRendererPlugin, RenderEvent, TaskRunner};
use super::types::{ExecutionOpts, ExecutionResult, RunStatus, StageTaskResult, TaskResult};

/// How a stage (or a single task) ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Succeeded,
    Failed,
    Interrupted,
}

impl Outcome {
    fn from_success(success: bool) -> Self {
        if success {
            Self::Succeeded
        } else {
            Self::Failed
        }
    }
}

/// Sequences stages against a checkpoint, fail-stop.
///
/// Stages and batches are strict barriers: nothing from stage N+1 starts
/// before stage N has finished, and batches inside a parallel stage run one
/// after another.
pub struct ExecutionEngine {
    runner: Arc<dyn TaskRunner>,
    checkpoint: CheckpointStore,
    opts: ExecutionOpts,
    renderer: Option<Arc<dyn OutputRendererPlugin>>,
    cancel: CancelToken,
    status: RunStatus,
    run_id: String,
    progress: ProgressMonitor,
    results: Vec<StageTaskResult>,
    skipped_tasks: usize,
}

impl ExecutionEngine {
    pub fn new(runner: Arc<dyn TaskRunner>, checkpoint: CheckpointStore, opts: ExecutionOpts) -> Self {
        Self {
            runner,
            checkpoint,
            opts,
            renderer: None,
            cancel: CancelToken::new(),
            status: RunStatus::NotStarted,
            run_id: Uuid::new_v4().to_string(),
            progress: ProgressMonitor::disabled(),
            results: Vec::new(),
            skipped_tasks: 0,
        }
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn OutputRendererPlugin>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn checkpoint(&self) -> &CheckpointStore {
        &self.checkpoint
    }

    pub fn into_checkpoint(self) -> CheckpointStore {
        self.checkpoint
    }

    /// Runs `stages`, resuming from the checkpoint when it matches.
    pub async fn run(&mut self, stages: &[Stage]) -> Result<ExecutionResult, ExecutorError> {
        let start = Instant::now();
        self.status = RunStatus::Running;
        self.results.clear();
        self.skipped_tasks = 0;

        let resume_from = self.resume_index(stages)?;
        let total_tasks: usize = stages.iter().map(|s| s.tasks.len()).sum();
        tracing::info!(
            run_id = %self.run_id,
            stages = stages.len(),
            tasks = total_tasks,
            resume_from,
            "run started"
        );

        self.emit(RenderEvent::RunStart {
            run_id: self.run_id.clone(),
            task_file: self.checkpoint.state().task_file.clone(),
            total_stages: stages.len(),
            total_tasks,
            resume_from: (resume_from > 0).then_some(resume_from),
        });
        self.emit(RenderEvent::Plan {
            run_id: self.run_id.clone(),
            plan: ExecutionPlan::build(stages),
        });

        self.progress = ProgressMonitor::new(total_tasks, self.opts.progress_bar);
        let already_done: usize = stages
            .iter()
            .flat_map(|s| s.tasks.iter().map(move |t| (s.id, t.id)))
            .filter(|(sid, tid)| self.checkpoint.should_skip_task(*sid, *tid))
            .count();
        self.progress.skip_tasks(already_done);

        let mut failed_stage = None;
        let mut interrupted = false;

        for stage in stages.iter().skip(resume_from) {
            if self.cancel.is_cancelled() {
                interrupted = true;
                break;
            }

            if self.checkpoint.should_skip_stage(stage.id) {
                tracing::info!(stage = stage.id, name = %stage.name, "stage already completed, skipping");
                self.emit(RenderEvent::StageSkipped {
                    run_id: self.run_id.clone(),
                    stage_id: stage.id,
                    name: stage.name.clone(),
                });
                continue;
            }

            match self.run_stage(stage, stages.len()).await? {
                Outcome::Succeeded => {}
                Outcome::Failed => {
                    failed_stage = Some(stage.id);
                    break;
                }
                Outcome::Interrupted => {
                    interrupted = true;
                    break;
                }
            }
        }

        self.status = if interrupted {
            tracing::warn!(run_id = %self.run_id, "run cancelled; in-flight work will be retried on resume");
            self.progress.finish("⏹ Cancelled");
            RunStatus::Cancelled
        } else {
            let success = failed_stage.is_none();
            self.checkpoint.complete_all(success)?;
            if success {
                self.progress.finish("✅ All stages completed");
                RunStatus::AllCompleted
            } else {
                self.progress.finish("❌ Execution failed");
                RunStatus::Failed
            }
        };

        let result = ExecutionResult {
            run_id: self.run_id.clone(),
            status: self.status,
            total_stages: stages.len(),
            total_tasks,
            resumed_from: resume_from,
            skipped_tasks: self.skipped_tasks,
            failed_stage,
            duration_ms: start.elapsed().as_millis() as u64,
            task_results: std::mem::take(&mut self.results),
        };

        tracing::info!(
            run_id = %self.run_id,
            status = self.status.as_str(),
            executed = result.executed(),
            failed = result.failed(),
            "run finished"
        );
        self.emit(RenderEvent::RunEnd {
            run_id: self.run_id.clone(),
            result: result.clone(),
        });

        Ok(result)
    }

    /// Stage index to start from; initializes fresh state when the
    /// checkpoint is absent, corrupt, mismatched or fully settled.
    fn resume_index(&mut self, stages: &[Stage]) -> Result<usize, ExecutorError> {
        match self.checkpoint.load() {
            LoadOutcome::Loaded if !self.checkpoint.matches(stages) => {
                tracing::warn!(
                    path = %self.checkpoint.path().display(),
                    "checkpoint does not match the document; starting fresh"
                );
            }
            LoadOutcome::Loaded => {
                if let Some(index) = self.checkpoint.resume_stage_index() {
                    tracing::info!(stage = index, "resuming from checkpoint");
                    return Ok(index);
                }
                tracing::info!("previous run completed; starting fresh");
            }
            LoadOutcome::Missing => {}
            LoadOutcome::Corrupt(reason) => {
                tracing::warn!(reason = %reason, "checkpoint unreadable; starting fresh");
            }
        }

        self.checkpoint.initialize(stages)?;
        Ok(0)
    }

    async fn run_stage(&mut self, stage: &Stage, total_stages: usize) -> Result<Outcome, ExecutorError> {
        let stage_start = Instant::now();
        tracing::info!(stage = stage.id, name = %stage.name, mode = stage.mode.as_str(), "stage started");

        self.checkpoint.start_stage(stage.id)?;
        self.progress.update_stage(stage.id, total_stages, &stage.name);
        self.emit(RenderEvent::StageStart {
            run_id: self.run_id.clone(),
            stage_id: stage.id,
            name: stage.name.clone(),
            mode: stage.mode,
            task_ids: stage.tasks.iter().map(|t| t.id).collect(),
        });

        let outcome = match stage.mode {
            StageMode::Serial => self.run_serial(stage).await?,
            StageMode::Parallel { max_workers } => self.run_parallel(stage, max_workers).await?,
        };

        if outcome == Outcome::Interrupted {
            tracing::info!(stage = stage.id, "stage interrupted");
            return Ok(outcome);
        }

        let success = outcome == Outcome::Succeeded;
        self.checkpoint.complete_stage(stage.id, success)?;
        if success {
            tracing::info!(stage = stage.id, "stage completed");
        } else {
            tracing::error!(stage = stage.id, name = %stage.name, "stage failed; stopping");
        }
        self.emit(RenderEvent::StageEnd {
            run_id: self.run_id.clone(),
            stage_id: stage.id,
            success,
            duration_secs: stage_start.elapsed().as_secs_f64(),
        });
        Ok(outcome)
    }

    async fn run_serial(&mut self, stage: &Stage) -> Result<Outcome, ExecutorError> {
        for task in &stage.tasks {
            if self.cancel.is_cancelled() {
                return Ok(Outcome::Interrupted);
            }
            if self.skip_if_completed(stage.id, task) {
                continue;
            }

            match self.run_single(stage, task).await? {
                Outcome::Succeeded => {}
                other => return Ok(other),
            }
        }
        Ok(Outcome::Succeeded)
    }

    async fn run_parallel(&mut self, stage: &Stage, max_workers: usize) -> Result<Outcome, ExecutorError> {
        // Planned over every task so that batch membership is stable across
        // resumes; completed tasks are filtered per batch.
        let conflicts = detect_conflicts(&stage.tasks);
        let batches = create_batches(&stage.tasks, &conflicts);
        let workers = self.opts.worker_count(max_workers);
        tracing::debug!(stage = stage.id, batches = batches.len(), workers, "parallel plan");

        for (batch_index, batch) in batches.iter().enumerate() {
            if self.cancel.is_cancelled() {
                return Ok(Outcome::Interrupted);
            }

            let pending: Vec<&Task> = batch
                .iter()
                .copied()
                .filter(|task| !self.skip_if_completed(stage.id, task))
                .collect();
            if pending.is_empty() {
                continue;
            }

            self.emit(RenderEvent::BatchStart {
                run_id: self.run_id.clone(),
                stage_id: stage.id,
                batch_index,
                task_ids: pending.iter().map(|t| t.id).collect(),
                workers,
            });

            let outcome = if let [task] = pending.as_slice() {
                self.run_single(stage, task).await?
            } else {
                self.run_concurrent(stage, &pending, workers).await?
            };

            if outcome == Outcome::Interrupted {
                return Ok(outcome);
            }

            self.emit(RenderEvent::BatchEnd {
                run_id: self.run_id.clone(),
                stage_id: stage.id,
                batch_index,
                success: outcome == Outcome::Succeeded,
            });

            if outcome == Outcome::Failed {
                return Ok(outcome);
            }
        }
        Ok(Outcome::Succeeded)
    }

    async fn run_single(&mut self, stage: &Stage, task: &Task) -> Result<Outcome, ExecutorError> {
        self.begin_task(stage.id, task)?;
        let result = self.runner.run_one(task, &self.cancel).await;
        self.record(stage, result)
    }

    async fn run_concurrent(
        &mut self,
        stage: &Stage,
        tasks: &[&Task],
        workers: usize,
    ) -> Result<Outcome, ExecutorError> {
        for task in tasks {
            self.begin_task(stage.id, task)?;
        }

        let owned: Vec<Task> = tasks.iter().map(|t| (*t).clone()).collect();
        let mut results = self.runner.run_batch(&owned, workers, &self.cancel).await;
        results.sort_by_key(|r| r.task_id);

        let mut all_succeeded = true;
        let mut interrupted = false;
        for task in &owned {
            let result = match results.iter().position(|r| r.task_id == task.id) {
                Some(index) => results.remove(index),
                None => TaskResult::failed(task.id, "", "runner returned no result", 0.0),
            };
            match self.record(stage, result)? {
                Outcome::Succeeded => {}
                Outcome::Failed => all_succeeded = false,
                Outcome::Interrupted => interrupted = true,
            }
        }
        for stray in results {
            tracing::warn!(stage = stage.id, task_id = stray.task_id, "ignoring result for task outside the batch");
        }

        Ok(if interrupted {
            Outcome::Interrupted
        } else {
            Outcome::from_success(all_succeeded)
        })
    }

    fn skip_if_completed(&mut self, stage_id: usize, task: &Task) -> bool {
        if !self.checkpoint.should_skip_task(stage_id, task.id) {
            return false;
        }
        tracing::debug!(stage = stage_id, task_id = task.id, "task already completed, skipping");
        self.skipped_tasks += 1;
        self.emit(RenderEvent::TaskSkipped {
            run_id: self.run_id.clone(),
            stage_id,
            task_id: task.id,
        });
        true
    }

    fn begin_task(&mut self, stage_id: usize, task: &Task) -> Result<(), ExecutorError> {
        tracing::info!(stage = stage_id, task_id = task.id, description = %task.description, "task started");
        self.checkpoint.start_task(stage_id, task.id)?;
        self.progress.add_task(stage_id, task.id, &task.description);
        self.emit(RenderEvent::TaskStart {
            run_id: self.run_id.clone(),
            stage_id,
            task_id: task.id,
            description: task.description.clone(),
        });
        Ok(())
    }

    /// Checkpoints a finished task. A failure observed after cancellation is
    /// treated as an interruption and the task stays in progress.
    fn record(&mut self, stage: &Stage, result: TaskResult) -> Result<Outcome, ExecutorError> {
        if stage.task(result.task_id).is_none() {
            return Err(ExecutorError::UnknownTask {
                stage: stage.id,
                task_id: result.task_id,
            });
        }

        if !result.success && self.cancel.is_cancelled() {
            tracing::info!(stage = stage.id, task_id = result.task_id, "task interrupted");
            self.progress.abandon_task(stage.id, result.task_id);
            return Ok(Outcome::Interrupted);
        }

        self.checkpoint.complete_task(
            stage.id,
            result.task_id,
            result.success,
            result.error_message.as_deref(),
        )?;
        if result.success {
            tracing::info!(stage = stage.id, task_id = result.task_id, duration_secs = result.duration_secs, "task completed");
        } else {
            tracing::warn!(
                stage = stage.id,
                task_id = result.task_id,
                error = result.error_message.as_deref().unwrap_or(""),
                "task failed"
            );
        }
        self.progress
            .complete_task(stage.id, result.task_id, result.success, result.duration_secs);

        let outcome = Outcome::from_success(result.success);
        self.emit(RenderEvent::TaskComplete {
            run_id: self.run_id.clone(),
            stage_id: stage.id,
            result: result.clone(),
        });
        self.results.push(StageTaskResult {
            stage_id: stage.id,
            result,
        });
        Ok(outcome)
    }

    fn emit(&self, event: RenderEvent) {
        if let Some(renderer) = &self.renderer {
            renderer.render(&event);
        }
    }
}

/// Convenience wrapper: run `stages` with a fresh engine.
pub async fn execute_stages(
    stages: &[Stage],
    runner: Arc<dyn TaskRunner>,
    checkpoint: CheckpointStore,
    opts: ExecutionOpts,
    renderer: Option<Arc<dyn OutputRendererPlugin>>,
    cancel: CancelToken,
) -> Result<ExecutionResult, ExecutorError> {
    let mut engine = ExecutionEngine::new(runner, checkpoint, opts).with_cancel_token(cancel);
    if let Some(renderer) = renderer {
        engine = engine.with_renderer(renderer);
    }
    engine.run(stages).await
}
