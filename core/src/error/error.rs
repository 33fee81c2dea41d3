use thiserror::Error;

use super::checkpoint::CheckpointError;
use super::document::{ErrorCode, ParseError};
use super::executor::ExecutorError;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Parse(#[from] ParseError),
    #[error("execution failed: {0}")]
    Executor(#[from] ExecutorError),
    #[error("{0}")]
    Checkpoint(#[from] CheckpointError),
    #[error("command failed: {0}")]
    Command(String),
    #[error("runner setup failed: {0}")]
    Runner(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

impl CliError {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Parse(e) => e.error_code(),
            Self::Executor(e) => e.error_code(),
            Self::Checkpoint(e) => e.error_code(),
            Self::Command(_) => ErrorCode::GeneralError,
            Self::Runner(_) => ErrorCode::RunnerError,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Io(_) => ErrorCode::GeneralError,
            Self::Anyhow(_) => ErrorCode::GeneralError,
        }
    }
}
