use std::path::PathBuf;

use thiserror::Error;

use super::document::ErrorCode;

/// Errors raised while persisting or removing a checkpoint file.
///
/// Load-time problems are not errors: an unreadable or mismatched checkpoint
/// is reported through `LoadOutcome` and treated as a fresh run.
#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("checkpoint io error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("checkpoint serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl CheckpointError {
    pub fn error_code(&self) -> ErrorCode {
        ErrorCode::StateError
    }
}
