use std::path::{Path, PathBuf};

use crate::document::Stage;
use crate::error::CheckpointError;

use super::transitions::StatusTransition;
use super::types::{
    elapsed_secs, now_timestamp, CheckpointState, FailedTask, ResumeSummary, StageState,
    StageSummary, Status, TaskState,
};

/// Result of reading the checkpoint file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded,
    Missing,
    /// Unreadable or not valid checkpoint JSON; treated as missing.
    Corrupt(String),
}

/// Durable stage/task progress for one task document.
///
/// Every mutating call rewrites the whole snapshot before returning.
#[derive(Debug)]
pub struct CheckpointStore {
    path: PathBuf,
    state: CheckpointState,
}

impl CheckpointStore {
    /// Checkpoint for `document`, stored at `<document><suffix>`.
    pub fn open(document: &Path, suffix: &str) -> Self {
        let task_file = document.display().to_string();
        Self {
            path: PathBuf::from(format!("{task_file}{suffix}")),
            state: CheckpointState::new(task_file),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> &CheckpointState {
        &self.state
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn load(&mut self) -> LoadOutcome {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return LoadOutcome::Missing,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to read checkpoint");
                return LoadOutcome::Corrupt(e.to_string());
            }
        };

        match serde_json::from_str::<CheckpointState>(&raw) {
            Ok(state) => {
                self.state = state;
                LoadOutcome::Loaded
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "ignoring corrupt checkpoint");
                self.state = CheckpointState::new(self.state.task_file.clone());
                LoadOutcome::Corrupt(e.to_string())
            }
        }
    }

    /// Whether the loaded snapshot describes exactly this stage list.
    pub fn matches(&self, stages: &[Stage]) -> bool {
        if self.state.stages.len() != stages.len() {
            return false;
        }
        self.state.stages.iter().zip(stages).all(|(saved, stage)| {
            saved.stage_id == stage.id
                && saved.name == stage.name
                && saved.tasks.len() == stage.tasks.len()
                && saved
                    .tasks
                    .iter()
                    .zip(&stage.tasks)
                    .all(|(st, t)| st.task_id == t.id && st.description == t.description)
        })
    }

    /// Fresh snapshot with every stage and task pending.
    pub fn initialize(&mut self, stages: &[Stage]) -> Result<(), CheckpointError> {
        self.state.start_time = Some(now_timestamp());
        self.state.overall_status = Status::InProgress;
        self.state.stages = stages
            .iter()
            .map(|stage| StageState {
                stage_id: stage.id,
                name: stage.name.clone(),
                mode: stage.mode.as_str().to_string(),
                status: Status::Pending,
                start_time: None,
                end_time: None,
                duration: None,
                tasks: stage
                    .tasks
                    .iter()
                    .map(|task| TaskState {
                        task_id: task.id,
                        description: task.description.clone(),
                        status: Status::Pending,
                        start_time: None,
                        end_time: None,
                        error: None,
                        duration: None,
                    })
                    .collect(),
            })
            .collect();
        self.save()
    }

    pub fn stage_status(&self, stage_id: usize) -> Option<Status> {
        self.state.stage(stage_id).map(|s| s.status)
    }

    pub fn task_status(&self, stage_id: usize, task_id: u32) -> Option<Status> {
        self.state
            .stage(stage_id)
            .and_then(|s| s.task(task_id))
            .map(|t| t.status)
    }

    pub fn should_skip_stage(&self, stage_id: usize) -> bool {
        self.stage_status(stage_id) == Some(Status::Completed)
    }

    pub fn should_skip_task(&self, stage_id: usize, task_id: u32) -> bool {
        self.task_status(stage_id, task_id) == Some(Status::Completed)
    }

    pub fn start_stage(&mut self, stage_id: usize) -> Result<(), CheckpointError> {
        let Some(stage) = self.state.stage_mut(stage_id) else {
            tracing::debug!(stage_id, "start_stage: unknown stage");
            return Ok(());
        };
        if !apply(&mut stage.status, Status::InProgress) {
            return Ok(());
        }
        stage.start_time = Some(now_timestamp());
        stage.end_time = None;
        stage.duration = None;
        self.save()
    }

    pub fn complete_stage(&mut self, stage_id: usize, success: bool) -> Result<(), CheckpointError> {
        let Some(stage) = self.state.stage_mut(stage_id) else {
            tracing::debug!(stage_id, "complete_stage: unknown stage");
            return Ok(());
        };
        if !apply(&mut stage.status, Status::from_success(success)) {
            return Ok(());
        }
        let end = now_timestamp();
        stage.duration = stage
            .start_time
            .as_deref()
            .and_then(|start| elapsed_secs(start, &end));
        stage.end_time = Some(end);
        self.save()
    }

    pub fn start_task(&mut self, stage_id: usize, task_id: u32) -> Result<(), CheckpointError> {
        let Some(task) = self
            .state
            .stage_mut(stage_id)
            .and_then(|s| s.task_mut(task_id))
        else {
            tracing::debug!(stage_id, task_id, "start_task: unknown task");
            return Ok(());
        };
        if !apply(&mut task.status, Status::InProgress) {
            return Ok(());
        }
        task.start_time = Some(now_timestamp());
        task.end_time = None;
        task.duration = None;
        task.error = None;
        self.save()
    }

    pub fn complete_task(
        &mut self,
        stage_id: usize,
        task_id: u32,
        success: bool,
        error: Option<&str>,
    ) -> Result<(), CheckpointError> {
        let Some(task) = self
            .state
            .stage_mut(stage_id)
            .and_then(|s| s.task_mut(task_id))
        else {
            tracing::debug!(stage_id, task_id, "complete_task: unknown task");
            return Ok(());
        };
        if !apply(&mut task.status, Status::from_success(success)) {
            return Ok(());
        }
        let end = now_timestamp();
        task.duration = task
            .start_time
            .as_deref()
            .and_then(|start| elapsed_secs(start, &end));
        task.end_time = Some(end);
        task.error = error.filter(|e| !e.is_empty()).map(str::to_string);
        self.save()
    }

    pub fn complete_all(&mut self, success: bool) -> Result<(), CheckpointError> {
        self.state.overall_status = Status::from_success(success);
        self.save()
    }

    /// First stage that is neither completed nor skipped.
    pub fn resume_stage_index(&self) -> Option<usize> {
        self.state
            .stages
            .iter()
            .find(|s| !s.status.is_settled())
            .map(|s| s.stage_id)
    }

    pub fn has_incomplete_stages(&self) -> bool {
        self.resume_stage_index().is_some()
    }

    /// Deletes the checkpoint file. Returns whether a file was removed.
    pub fn clear(&mut self) -> Result<bool, CheckpointError> {
        self.state = CheckpointState::new(self.state.task_file.clone());
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::info!(path = %self.path.display(), "checkpoint cleared");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(CheckpointError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }

    pub fn summary(&self) -> ResumeSummary {
        ResumeSummary {
            task_file: self.state.task_file.clone(),
            start_time: self.state.start_time.clone(),
            last_update: self.state.last_update.clone(),
            overall_status: self.state.overall_status,
            stages: self
                .state
                .stages
                .iter()
                .map(|s| StageSummary {
                    stage_id: s.stage_id,
                    name: s.name.clone(),
                    status: s.status,
                    completed_tasks: s.completed_tasks(),
                    total_tasks: s.tasks.len(),
                    failed_tasks: s
                        .tasks
                        .iter()
                        .filter(|t| t.status == Status::Failed)
                        .map(|t| FailedTask {
                            task_id: t.task_id,
                            description: t.description.clone(),
                            error: t.error.clone(),
                        })
                        .collect(),
                })
                .collect(),
            resume_stage: self.resume_stage_index(),
        }
    }

    fn save(&mut self) -> Result<(), CheckpointError> {
        self.state.last_update = Some(now_timestamp());
        let json = serde_json::to_string_pretty(&self.state)?;

        let tmp = PathBuf::from(format!("{}.tmp", self.path.display()));
        let io_err = |source| CheckpointError::Io {
            path: self.path.clone(),
            source,
        };
        std::fs::write(&tmp, json).map_err(io_err)?;
        std::fs::rename(&tmp, &self.path).map_err(io_err)?;
        Ok(())
    }
}

fn apply(current: &mut Status, next: Status) -> bool {
    match StatusTransition::validate(*current, next) {
        Ok(()) => {
            *current = next;
            true
        }
        Err(e) => {
            tracing::warn!(error = %e, "status change ignored");
            false
        }
    }
}
