use batchflow_core::executor::traits::{OutputRendererPlugin, RenderEvent};
use chrono::Local;
use serde_json::{json, Value};

/// One JSON object per engine event: `{"v", "event_type", "ts", "run_id", "metadata"}`.
/// Always compact: one line per event.
#[derive(Debug, Default)]
pub struct JsonlRendererPlugin;

impl JsonlRendererPlugin {
    pub fn new() -> Self {
        Self
    }

    fn metadata(event: &RenderEvent) -> Value {
        match event {
            RenderEvent::RunStart {
                task_file,
                total_stages,
                total_tasks,
                resume_from,
                ..
            } => json!({
                "task_file": task_file,
                "total_stages": total_stages,
                "total_tasks": total_tasks,
                "resume_from": resume_from,
            }),
            RenderEvent::Plan { plan, .. } => json!({
                "stages": plan.stages,
                "total_tasks": plan.total_tasks(),
                "total_steps": plan.total_steps(),
            }),
            RenderEvent::StageStart {
                stage_id,
                name,
                mode,
                task_ids,
                ..
            } => json!({
                "stage_id": stage_id,
                "name": name,
                "mode": mode.as_str(),
                "max_workers": mode.max_workers(),
                "task_ids": task_ids,
            }),
            RenderEvent::StageSkipped { stage_id, name, .. } => json!({
                "stage_id": stage_id,
                "name": name,
            }),
            RenderEvent::BatchStart {
                stage_id,
                batch_index,
                task_ids,
                workers,
                ..
            } => json!({
                "stage_id": stage_id,
                "batch_index": batch_index,
                "task_ids": task_ids,
                "workers": workers,
            }),
            RenderEvent::BatchEnd {
                stage_id,
                batch_index,
                success,
                ..
            } => json!({
                "stage_id": stage_id,
                "batch_index": batch_index,
                "success": success,
            }),
            RenderEvent::TaskStart {
                stage_id,
                task_id,
                description,
                ..
            } => json!({
                "stage_id": stage_id,
                "task_id": task_id,
                "description": description,
            }),
            RenderEvent::TaskSkipped {
                stage_id, task_id, ..
            } => json!({
                "stage_id": stage_id,
                "task_id": task_id,
            }),
            RenderEvent::TaskComplete {
                stage_id, result, ..
            } => json!({
                "stage_id": stage_id,
                "task_id": result.task_id,
                "command": result.command,
                "success": result.success,
                "duration_secs": result.duration_secs,
                "output": result.output,
                "error": result.error_message,
            }),
            RenderEvent::StageEnd {
                stage_id,
                success,
                duration_secs,
                ..
            } => json!({
                "stage_id": stage_id,
                "success": success,
                "duration_secs": duration_secs,
            }),
            RenderEvent::RunEnd { result, .. } => json!({
                "status": result.status,
                "total_stages": result.total_stages,
                "total_tasks": result.total_tasks,
                "executed": result.executed(),
                "failed": result.failed(),
                "skipped": result.skipped_tasks,
                "resumed_from": result.resumed_from,
                "failed_stage": result.failed_stage,
                "duration_ms": result.duration_ms,
            }),
        }
    }

    fn event_to_json(&self, event: &RenderEvent) -> Value {
        json!({
            "v": 1,
            "event_type": event.kind(),
            "ts": Local::now().to_rfc3339(),
            "run_id": event.run_id(),
            "metadata": Self::metadata(event),
        })
    }
}

impl OutputRendererPlugin for JsonlRendererPlugin {
    fn name(&self) -> &str {
        "jsonl-renderer"
    }

    fn format(&self) -> &str {
        "jsonl"
    }

    fn render(&self, event: &RenderEvent) {
        let value = self.event_to_json(event);
        println!("{}", serde_json::to_string(&value).unwrap_or_else(|_| "{}".into()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use batchflow_core::executor::{ExecutionResult, RunStatus, TaskResult};

    #[test]
    fn envelope_carries_kind_and_run_id() {
        let renderer = JsonlRendererPlugin::new();
        let value = renderer.event_to_json(&RenderEvent::StageSkipped {
            run_id: "run-1".to_string(),
            stage_id: 2,
            name: "Release".to_string(),
        });
        assert_eq!(value["v"], 1);
        assert_eq!(value["event_type"], "stage.skipped");
        assert_eq!(value["run_id"], "run-1");
        assert_eq!(value["metadata"]["stage_id"], 2);
        assert!(value["ts"].is_string());
    }

    #[test]
    fn task_complete_reports_error() {
        let renderer = JsonlRendererPlugin::new();
        let value = renderer.event_to_json(&RenderEvent::TaskComplete {
            run_id: "run".to_string(),
            stage_id: 0,
            result: TaskResult::failed(4, "make build", "exit status 2", 1.5),
        });
        assert_eq!(value["event_type"], "task.complete");
        assert_eq!(value["metadata"]["task_id"], 4);
        assert_eq!(value["metadata"]["success"], false);
        assert_eq!(value["metadata"]["error"], "exit status 2");
    }

    #[test]
    fn run_end_serializes_status() {
        let renderer = JsonlRendererPlugin::new();
        let value = renderer.event_to_json(&RenderEvent::RunEnd {
            run_id: "run".to_string(),
            result: ExecutionResult {
                run_id: "run".to_string(),
                status: RunStatus::Failed,
                total_stages: 3,
                total_tasks: 6,
                resumed_from: 0,
                skipped_tasks: 0,
                failed_stage: Some(1),
                duration_ms: 120,
                task_results: Vec::new(),
            },
        });
        assert_eq!(value["metadata"]["status"], "failed");
        assert_eq!(value["metadata"]["failed_stage"], 1);
        assert_eq!(value["metadata"]["executed"], 0);
    }
}
