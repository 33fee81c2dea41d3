//! Durable progress record enabling resume.

mod store;
mod transitions;
mod types;

pub use store::{CheckpointStore, LoadOutcome};
pub use transitions::{StatusTransition, TransitionError};
pub use types::{
    elapsed_secs, now_timestamp, CheckpointState, FailedTask, ResumeSummary, StageState,
    StageSummary, Status, TaskState, TIMESTAMP_FORMAT,
};
