use serde::Serialize;

/// A single unit of work parsed from a `## TASK ##` segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    /// 1-based, dense within its stage.
    pub id: u32,
    pub description: String,
    pub file_scope: Vec<String>,
    pub exclude_scope: Vec<String>,
    pub verify_command: Option<String>,
    /// Trimmed segment text after inclusion resolution.
    pub body: String,
}

impl Task {
    pub fn new(id: u32, description: impl Into<String>) -> Self {
        let description = description.into();
        Self {
            id,
            body: description.clone(),
            description,
            file_scope: Vec::new(),
            exclude_scope: Vec::new(),
            verify_command: None,
        }
    }

    pub fn with_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.file_scope = files.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_excludes<I, S>(mut self, excludes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_scope = excludes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_verify(mut self, command: impl Into<String>) -> Self {
        self.verify_command = Some(command.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageMode {
    Serial,
    Parallel { max_workers: usize },
}

impl StageMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Serial => "serial",
            Self::Parallel { .. } => "parallel",
        }
    }

    /// Worker ceiling declared by the document; serial stages run one at a time.
    pub fn max_workers(&self) -> usize {
        match self {
            Self::Serial => 1,
            Self::Parallel { max_workers } => *max_workers,
        }
    }

    pub fn is_parallel(&self) -> bool {
        matches!(self, Self::Parallel { .. })
    }
}

/// An ordered phase of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stage {
    /// 0-based, document order.
    pub id: usize,
    pub name: String,
    pub mode: StageMode,
    pub tasks: Vec<Task>,
}

impl Stage {
    pub fn task(&self, task_id: u32) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == task_id)
    }
}
