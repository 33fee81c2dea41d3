use batchflow_core::executor::traits::{OutputRendererPlugin, RenderEvent};

pub struct TextRendererPlugin {
    ascii_only: bool,
}

impl TextRendererPlugin {
    pub fn new(ascii_only: bool) -> Self {
        Self { ascii_only }
    }

    fn mark(&self, success: bool) -> &'static str {
        match (success, self.ascii_only) {
            (true, true) => "OK",
            (false, true) => "FAIL",
            (true, false) => "✅",
            (false, false) => "❌",
        }
    }

    fn format_event(&self, event: &RenderEvent) -> String {
        match event {
            RenderEvent::RunStart {
                run_id,
                task_file,
                total_stages,
                total_tasks,
                resume_from,
            } => {
                let mut line = format!(
                    "RUN START {} {} (stages: {}, tasks: {})",
                    run_id, task_file, total_stages, total_tasks
                );
                if let Some(stage) = resume_from {
                    line.push_str(&format!(", resuming at stage {}", stage));
                }
                line
            }
            RenderEvent::Plan { run_id, plan } => {
                let mut out = format!("PLAN {}:", run_id);
                for stage in &plan.stages {
                    let batches: Vec<String> = stage
                        .batches
                        .iter()
                        .map(|batch| {
                            let ids: Vec<String> = batch.iter().map(u32::to_string).collect();
                            format!("{{{}}}", ids.join(", "))
                        })
                        .collect();
                    out.push_str(&format!(
                        "\n  stage {} {} [{}, workers {}]: {}",
                        stage.stage_id,
                        stage.name,
                        stage.mode.as_str(),
                        stage.workers,
                        batches.join(" | ")
                    ));
                }
                out
            }
            RenderEvent::StageStart {
                stage_id,
                name,
                mode,
                task_ids,
                ..
            } => format!(
                "STAGE START {} {} ({}, tasks: {})",
                stage_id,
                name,
                mode.as_str(),
                task_ids.len()
            ),
            RenderEvent::StageSkipped { stage_id, name, .. } => {
                format!("STAGE SKIP {} {} (already completed)", stage_id, name)
            }
            RenderEvent::BatchStart {
                stage_id,
                batch_index,
                task_ids,
                workers,
                ..
            } => format!(
                "BATCH START stage {} batch {} tasks {:?} (workers {})",
                stage_id, batch_index, task_ids, workers
            ),
            RenderEvent::BatchEnd {
                stage_id,
                batch_index,
                success,
                ..
            } => format!(
                "BATCH END stage {} batch {} {}",
                stage_id,
                batch_index,
                self.mark(*success)
            ),
            RenderEvent::TaskStart {
                stage_id,
                task_id,
                description,
                ..
            } => format!("TASK START [{}.{}] {}", stage_id, task_id, description),
            RenderEvent::TaskSkipped {
                stage_id, task_id, ..
            } => format!("TASK SKIP [{}.{}] (already completed)", stage_id, task_id),
            RenderEvent::TaskComplete {
                stage_id, result, ..
            } => {
                let mut line = format!(
                    "TASK END [{}.{}] {} {:.2}s",
                    stage_id,
                    result.task_id,
                    self.mark(result.success),
                    result.duration_secs
                );
                if let Some(err) = &result.error_message {
                    line.push_str(&format!("\n     error: {}", err));
                }
                line
            }
            RenderEvent::StageEnd {
                stage_id,
                success,
                duration_secs,
                ..
            } => format!(
                "STAGE END {} {} {:.2}s",
                stage_id,
                self.mark(*success),
                duration_secs
            ),
            RenderEvent::RunEnd { run_id, result } => format!(
                "RUN END {} {} (executed {}, failed {}, skipped {}, duration {}ms)",
                run_id,
                result.status.as_str(),
                result.executed(),
                result.failed(),
                result.skipped_tasks,
                result.duration_ms
            ),
        }
    }
}

impl OutputRendererPlugin for TextRendererPlugin {
    fn name(&self) -> &str {
        "text-renderer"
    }

    fn format(&self) -> &str {
        "text"
    }

    fn render(&self, event: &RenderEvent) {
        println!("{}", self.format_event(event));
    }
}
