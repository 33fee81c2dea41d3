use crate::document::StageMode;
use crate::executor::batch::ExecutionPlan;
use crate::executor::types::{ExecutionResult, TaskResult};

/// Output renderer plugin (controls console output format)
pub trait OutputRendererPlugin: Send + Sync {
    fn name(&self) -> &str;
    fn format(&self) -> &str;
    fn render(&self, event: &RenderEvent);
}

/// Engine lifecycle events, emitted in order
#[derive(Debug, Clone)]
pub enum RenderEvent {
    RunStart {
        run_id: String,
        task_file: String,
        total_stages: usize,
        total_tasks: usize,
        resume_from: Option<usize>,
    },
    Plan {
        run_id: String,
        plan: ExecutionPlan,
    },
    StageStart {
        run_id: String,
        stage_id: usize,
        name: String,
        mode: StageMode,
        task_ids: Vec<u32>,
    },
    StageSkipped {
        run_id: String,
        stage_id: usize,
        name: String,
    },
    BatchStart {
        run_id: String,
        stage_id: usize,
        batch_index: usize,
        task_ids: Vec<u32>,
        workers: usize,
    },
    BatchEnd {
        run_id: String,
        stage_id: usize,
        batch_index: usize,
        success: bool,
    },
    TaskStart {
        run_id: String,
        stage_id: usize,
        task_id: u32,
        description: String,
    },
    TaskSkipped {
        run_id: String,
        stage_id: usize,
        task_id: u32,
    },
    TaskComplete {
        run_id: String,
        stage_id: usize,
        result: TaskResult,
    },
    StageEnd {
        run_id: String,
        stage_id: usize,
        success: bool,
        duration_secs: f64,
    },
    RunEnd {
        run_id: String,
        result: ExecutionResult,
    },
}

impl RenderEvent {
    /// Dotted event name used by structured renderers.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RunStart { .. } => "run.start",
            Self::Plan { .. } => "run.plan",
            Self::StageStart { .. } => "stage.start",
            Self::StageSkipped { .. } => "stage.skipped",
            Self::BatchStart { .. } => "batch.start",
            Self::BatchEnd { .. } => "batch.end",
            Self::TaskStart { .. } => "task.start",
            Self::TaskSkipped { .. } => "task.skipped",
            Self::TaskComplete { .. } => "task.complete",
            Self::StageEnd { .. } => "stage.end",
            Self::RunEnd { .. } => "run.end",
        }
    }

    pub fn run_id(&self) -> &str {
        match self {
            Self::RunStart { run_id, .. }
            | Self::Plan { run_id, .. }
            | Self::StageStart { run_id, .. }
            | Self::StageSkipped { run_id, .. }
            | Self::BatchStart { run_id, .. }
            | Self::BatchEnd { run_id, .. }
            | Self::TaskStart { run_id, .. }
            | Self::TaskSkipped { run_id, .. }
            | Self::TaskComplete { run_id, .. }
            | Self::StageEnd { run_id, .. }
            | Self::RunEnd { run_id, .. } => run_id,
        }
    }
}
