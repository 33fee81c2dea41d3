use thiserror::Error;

use super::checkpoint::CheckpointError;
use super::document::ErrorCode;

/// Executor-specific errors for planning and running a task document
#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    #[error("stage {stage} has no task with id {task_id}")]
    UnknownTask { stage: usize, task_id: u32 },}

impl ExecutorError {
    /// Map executor error to process exit code
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Checkpoint(e) => e.error_code(),
            Self::UnknownTask { .. } => ErrorCode::ValidationError,
        }
    }
}
