//! Stable re-exports for consumers (`cli`, `plugins`, and external crates).
//!
//! Prefer importing from `batchflow_core::api` instead of reaching into internal modules.

pub use crate::checkpoint::{
    CheckpointState, CheckpointStore, FailedTask, LoadOutcome, ResumeSummary, StageSummary,
    Status,
};
pub use crate::config::{
    get_batchflow_data_dir, load_default, load_from_path, AppConfig, ExecutorConfig,
    LoggingConfig, OutputConfig, RunnerConfig,
};
pub use crate::document::{
    parse_document, parse_str, DocumentProtocolParser, FormatValidation, ParseOptions,
    ParsedDocument, Stage, StageMode, StandardDocumentParser, Task,
};
pub use crate::error::{CheckpointError, CliError, ErrorCode, ExecutorError, ParseError};
pub use crate::executor::{
    execute_task_list, CancelToken, ExecutionEngine, ExecutionOpts, ExecutionPlan,
    ExecutionResult, OutputRendererPlugin, RenderEvent, RunStatus, StagePlan, TaskResult, TaskRunner,
};
