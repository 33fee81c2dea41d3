//! Stage execution engine
//!
//! ```text
//! Vec<Stage>
//!   ↓
//! CheckpointStore::load() → resume stage index (or fresh initialize)
//!   ↓
//! for each stage:   serial  → run_one per task
//!                   parallel → detect_conflicts() → create_batches()
//!                              → run_batch(batch, workers) per batch
//!   ↓
//! CheckpointStore updated after every task and stage → ExecutionResult
//! ```
//!
//! Documents without stages skip all of this: `execute_task_list` runs the
//! flat list with no checkpoint.

mod batch;
mod cancel;
mod conflict;
mod engine;
mod flat;
mod progress;
mod scheduler;
pub mod traits;
pub mod types;

pub use batch::{create_batches, ExecutionPlan, StagePlan};
pub use cancel::CancelToken;
pub use conflict::{detect_conflicts, effective_scope, patterns_overlap, tasks_conflict, ConflictMap};
pub use engine::{execute_stages, ExecutionEngine};
pub use flat::execute_task_list;
pub use progress::ProgressMonitor;
pub use scheduler::run_bounded;
pub use traits::{OutputRendererPlugin, RenderEvent, TaskRunner};
pub use types::{ExecutionOpts, ExecutionResult, RunStatus, StageTaskResult, TaskResult};
