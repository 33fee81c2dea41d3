use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Timestamp layout used in checkpoint files (local time, second precision).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Lifecycle status shared by stages and tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Pending,
    InProgress,
    Completed,
    Failed,
    Skipped,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }

    /// Completed or skipped: nothing left to run.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Completed | Self::Skipped)
    }

    pub fn from_success(success: bool) -> Self {
        if success {
            Self::Completed
        } else {
            Self::Failed
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskState {
    pub task_id: u32,
    pub description: String,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageState {
    pub stage_id: usize,
    pub name: String,
    pub mode: String,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default)]
    pub tasks: Vec<TaskState>,
}

impl StageState {
    pub fn task(&self, task_id: u32) -> Option<&TaskState> {
        self.tasks.iter().find(|t| t.task_id == task_id)
    }

    pub fn task_mut(&mut self, task_id: u32) -> Option<&mut TaskState> {
        self.tasks.iter_mut().find(|t| t.task_id == task_id)
    }

    pub fn completed_tasks(&self) -> usize {
        self.tasks
            .iter()
            .filter(|t| t.status == Status::Completed)
            .count()
    }
}

/// Whole-run snapshot persisted next to the task document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointState {
    pub task_file: String,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub last_update: Option<String>,
    #[serde(default)]
    pub overall_status: Status,
    #[serde(default)]
    pub stages: Vec<StageState>,
}

impl CheckpointState {
    pub fn new(task_file: impl Into<String>) -> Self {
        Self {
            task_file: task_file.into(),
            start_time: None,
            last_update: None,
            overall_status: Status::Pending,
            stages: Vec::new(),
        }
    }

    pub fn stage(&self, stage_id: usize) -> Option<&StageState> {
        self.stages.iter().find(|s| s.stage_id == stage_id)
    }

    pub fn stage_mut(&mut self, stage_id: usize) -> Option<&mut StageState> {
        self.stages.iter_mut().find(|s| s.stage_id == stage_id)
    }
}

/// Per-stage progress as shown by `status` and on resume.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageSummary {
    pub stage_id: usize,
    pub name: String,
    pub status: Status,
    pub completed_tasks: usize,
    pub total_tasks: usize,
    pub failed_tasks: Vec<FailedTask>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedTask {
    pub task_id: u32,
    pub description: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResumeSummary {
    pub task_file: String,
    pub start_time: Option<String>,
    pub last_update: Option<String>,
    pub overall_status: Status,
    pub stages: Vec<StageSummary>,
    pub resume_stage: Option<usize>,
}

impl ResumeSummary {
    pub fn completed_stages(&self) -> usize {
        self.stages
            .iter()
            .filter(|s| s.status == Status::Completed)
            .count()
    }
}

pub fn now_timestamp() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Seconds between two checkpoint timestamps; `None` if either fails to parse.
pub fn elapsed_secs(start: &str, end: &str) -> Option<f64> {
    let start = NaiveDateTime::parse_from_str(start, TIMESTAMP_FORMAT).ok()?;
    let end = NaiveDateTime::parse_from_str(end, TIMESTAMP_FORMAT).ok()?;
    Some((end - start).num_milliseconds() as f64 / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&Status::InProgress).unwrap(),
            "\"in_progress\""
        );
        let s: Status = serde_json::from_str("\"skipped\"").unwrap();
        assert_eq!(s, Status::Skipped);
    }

    #[test]
    fn optional_fields_are_omitted() {
        let task = TaskState {
            task_id: 1,
            description: "build".to_string(),
            status: Status::Pending,
            start_time: None,
            end_time: None,
            error: None,
            duration: None,
        };
        let json = serde_json::to_value(&task).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 3);
        assert!(!obj.contains_key("error"));
    }

    #[test]
    fn elapsed_between_timestamps() {
        assert_eq!(
            elapsed_secs("2026-01-02T10:00:00", "2026-01-02T10:01:30"),
            Some(90.0)
        );
        assert_eq!(elapsed_secs("garbage", "2026-01-02T10:01:30"), None);
    }

    #[test]
    fn now_timestamp_round_trips_through_format() {
        let now = now_timestamp();
        assert!(NaiveDateTime::parse_from_str(&now, TIMESTAMP_FORMAT).is_ok());
    }
}
