use serde::Serialize;

/// Outcome of executing a single task, produced once by the runner.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskResult {
    pub task_id: u32,

    /// Command line (or label) that was executed
    pub command: String,

    pub success: bool,

    pub duration_secs: f64,

    /// Captured output (may be truncated)
    pub output: String,

    pub error_message: Option<String>,
}

impl TaskResult {
    pub fn succeeded(task_id: u32, command: impl Into<String>, output: String, duration_secs: f64) -> Self {
        Self {
            task_id,
            command: command.into(),
            success: true,
            duration_secs,
            output,
            error_message: None,
        }
    }

    pub fn failed(
        task_id: u32,
        command: impl Into<String>,
        error: impl Into<String>,
        duration_secs: f64,
    ) -> Self {
        Self {
            task_id,
            command: command.into(),
            success: false,
            duration_secs,
            output: String::new(),
            error_message: Some(error.into()),
        }
    }

    pub fn with_output(mut self, output: String) -> Self {
        self.output = output;
        self
    }
}

/// Lifecycle of one `ExecutionEngine::run` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    NotStarted,
    Running,
    AllCompleted,
    Failed,
    Cancelled,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::Running => "running",
            Self::AllCompleted => "all_completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageTaskResult {
    pub stage_id: usize,
    #[serde(flatten)]
    pub result: TaskResult,
}

/// Summary of a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionResult {
    pub run_id: String,

    pub status: RunStatus,

    pub total_stages: usize,

    pub total_tasks: usize,

    /// Stage the run resumed from (0 for a fresh run)
    pub resumed_from: usize,

    /// Tasks skipped because the checkpoint already had them completed
    pub skipped_tasks: usize,

    /// First stage that failed, if any
    pub failed_stage: Option<usize>,

    pub duration_ms: u64,

    /// Results of tasks executed during this run, in completion order
    pub task_results: Vec<StageTaskResult>,
}

impl ExecutionResult {
    pub fn executed(&self) -> usize {
        self.task_results.len()
    }

    pub fn failed(&self) -> usize {
        self.task_results
            .iter()
            .filter(|r| !r.result.success)
            .count()
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::AllCompleted
    }
}
