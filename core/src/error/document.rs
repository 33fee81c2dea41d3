use std::path::PathBuf;

use thiserror::Error;

/// Process exit codes shared by every error type in the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrorCode {
    Success = 0,
    GeneralError = 1,
    ParseError = 2,
    ValidationError = 3,
    TaskFailed = 10,
    ConfigError = 11,
    StateError = 20,
    RunnerError = 30,
    FileNotFound = 60,
    IncludeFailed = 61,
    Cancelled = 130,
}

impl ErrorCode {
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    pub fn as_exit_code(self) -> i32 {
        self as i32
    }
}

/// Failure to resolve a single `@path` inclusion directive.
///
/// Non-fatal unless strict includes are enabled: the parser replaces the
/// directive with an inline diagnostic and keeps going.
#[derive(Error, Debug)]
pub enum InclusionError {
    #[error("file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("read failed: {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("inclusion cycle: {chain}")]
    Cycle { chain: String },
}

impl InclusionError {
    /// Short reason used in the inline diagnostic line.
    pub fn reason(&self) -> String {
        match self {
            Self::NotFound { .. } => "file not found".to_string(),
            Self::Read { source, .. } => format!("read error: {source}"),
            Self::Cycle { chain } => format!("cycle: {chain}"),
        }
    }
}

/// Fatal document errors; nothing is executed when one is raised.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("cannot read task document {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("no '## STAGE ##' definitions found")]
    NoStages,

    #[error("no '## TASK ##' content found")]
    NoTasks,

    #[error("stage {stage}: missing required attribute '{attribute}'")]
    MissingAttribute {
        stage: usize,
        attribute: &'static str,
    },

    #[error("stage {stage}: mode must be 'serial' or 'parallel', got '{mode}'")]
    InvalidMode { stage: usize, mode: String },

    #[error("stage {stage}: invalid value for {attribute}: '{value}'")]
    InvalidAttribute {
        stage: usize,
        attribute: &'static str,
        value: String,
    },

    #[error("include failed: {0}")]
    Inclusion(#[from] InclusionError),
}

impl ParseError {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Io { .. } => ErrorCode::FileNotFound,
            Self::NoStages | Self::NoTasks => ErrorCode::ParseError,
            Self::MissingAttribute { .. } => ErrorCode::ParseError,
            Self::InvalidMode { .. } => ErrorCode::ValidationError,
            Self::InvalidAttribute { .. } => ErrorCode::ValidationError,
            Self::Inclusion(_) => ErrorCode::IncludeFailed,
        }
    }
}
