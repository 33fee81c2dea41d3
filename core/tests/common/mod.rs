#![allow(dead_code)]

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use batchflow_core::api::{
    CancelToken, CheckpointStore, ExecutionOpts, OutputRendererPlugin, RenderEvent, Task,
    TaskResult, TaskRunner,
};

/// Runner that succeeds unless a task description is listed as failing and
/// records every description it was asked to run.
#[derive(Default)]
pub struct RecordingRunner {
    failing: HashSet<String>,
    calls: Mutex<Vec<String>>,
    batches: Mutex<Vec<Vec<u32>>>,
}

impl RecordingRunner {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing(descriptions: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            failing: descriptions.iter().map(|d| d.to_string()).collect(),
            ..Default::default()
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Task ids handed to `run_batch`, per call.
    pub fn batches(&self) -> Vec<Vec<u32>> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl TaskRunner for RecordingRunner {
    fn name(&self) -> &str {
        "recording"
    }

    async fn run_one(&self, task: &Task, _cancel: &CancelToken) -> TaskResult {
        self.calls.lock().unwrap().push(task.description.clone());
        if self.failing.contains(&task.description) {
            TaskResult::failed(task.id, &task.description, "exit status 1", 0.0)
        } else {
            TaskResult::succeeded(task.id, &task.description, format!("done: {}", task.description), 0.0)
        }
    }

    async fn run_batch(
        &self,
        tasks: &[Task],
        max_workers: usize,
        cancel: &CancelToken,
    ) -> Vec<TaskResult> {
        self.batches
            .lock()
            .unwrap()
            .push(tasks.iter().map(|t| t.id).collect());
        batchflow_core::executor::run_bounded(tasks, max_workers, cancel, |task| {
            self.run_one(task, cancel)
        })
        .await
    }
}

/// Renderer that keeps every event kind it sees.
#[derive(Default)]
pub struct CollectingRenderer {
    events: Mutex<Vec<RenderEvent>>,
}

impl CollectingRenderer {
    pub fn kinds(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().iter().map(|e| e.kind()).collect()
    }

    pub fn events(&self) -> Vec<RenderEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl OutputRendererPlugin for CollectingRenderer {
    fn name(&self) -> &str {
        "collecting"
    }

    fn format(&self) -> &str {
        "memory"
    }

    fn render(&self, event: &RenderEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

pub fn opts() -> ExecutionOpts {
    ExecutionOpts {
        max_parallel: 4,
        single: false,
        progress_bar: false,
        cpu_count: 4,
    }
}

pub fn write_document(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    path
}

pub fn checkpoint_for(document: &Path) -> CheckpointStore {
    CheckpointStore::open(document, ".state.json")
}
