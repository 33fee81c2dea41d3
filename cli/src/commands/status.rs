use batchflow_core::api as core_api;

use crate::app;
use crate::commands::cli::StatusArgs;

pub fn handle_status(args: StatusArgs, cfg: &core_api::AppConfig) -> Result<i32, core_api::CliError> {
    let mut store = app::checkpoint_for(&args.file, cfg);
    match store.load() {
        core_api::LoadOutcome::Loaded => {}
        core_api::LoadOutcome::Missing => {
            println!("No checkpoint for {}", args.file.display());
            return Ok(core_api::ErrorCode::Success.as_exit_code());
        }
        core_api::LoadOutcome::Corrupt(reason) => {
            println!(
                "Checkpoint {} is unreadable and will be ignored: {}",
                store.path().display(),
                reason
            );
            return Ok(core_api::ErrorCode::StateError.as_exit_code());
        }
    }

    let summary = store.summary();
    if args.json {
        let json = serde_json::to_string_pretty(&summary)
            .map_err(|e| core_api::CliError::Command(format!("failed to encode summary: {e}")))?;
        println!("{json}");
    } else {
        print!("{}", format_summary(&summary));
    }
    Ok(core_api::ErrorCode::Success.as_exit_code())
}

fn format_summary(summary: &core_api::ResumeSummary) -> String {
    let mut out = format!("Task file: {}\n", summary.task_file);
    out.push_str(&format!("Status:    {}\n", summary.overall_status));
    if let Some(start) = &summary.start_time {
        out.push_str(&format!("Started:   {}\n", start));
    }
    if let Some(update) = &summary.last_update {
        out.push_str(&format!("Updated:   {}\n", update));
    }
    out.push_str(&format!(
        "Stages:    {}/{} completed\n",
        summary.completed_stages(),
        summary.stages.len()
    ));

    for stage in &summary.stages {
        out.push_str(&format!(
            "  [{}] {} - {} ({}/{} tasks)\n",
            stage.stage_id, stage.name, stage.status, stage.completed_tasks, stage.total_tasks
        ));
        for failed in &stage.failed_tasks {
            out.push_str(&format!(
                "      task {} failed: {} ({})\n",
                failed.task_id,
                failed.description,
                failed.error.as_deref().unwrap_or("no error recorded")
            ));
        }
    }

    match summary.resume_stage {
        Some(stage) => out.push_str(&format!("Next run resumes at stage {}\n", stage)),
        None => out.push_str("Nothing left to run\n"),
    }
    out
}
