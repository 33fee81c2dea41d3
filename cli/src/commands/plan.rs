//! Dry run: parse, plan batches, print.
use batchflow_core::api as core_api;
use batchflow_plugins::factory::build_renderer;

use crate::app;
use crate::commands::cli::PlanArgs;

pub fn handle_plan(args: PlanArgs, cfg: &core_api::AppConfig) -> Result<i32, core_api::CliError> {
    let options = app::parse_options(&cfg.executor, args.strict);
    let document = app::load_document(&args.file, options)?;
    let warnings = document.validation().warnings.len();
    let stages = match document {
        core_api::ParsedDocument::Staged { stages, .. } => stages,
        core_api::ParsedDocument::TaskList { tasks, .. } => {
            vec![task_list_stage(tasks, cfg.executor.max_parallel)]
        }
    };
    let plan = core_api::ExecutionPlan::build(&stages);
    tracing::info!(
        stages = plan.stages.len(),
        tasks = plan.total_tasks(),
        steps = plan.total_steps(),
        warnings,
        "planned task document"
    );

    let renderer = build_renderer(&cfg.output, args.format.as_deref())?;
    renderer.render(&core_api::RenderEvent::Plan {
        run_id: "dry-run".to_string(),
        plan,
    });
    Ok(core_api::ErrorCode::Success.as_exit_code())
}

/// A flat task list runs as one parallel stage with no file scopes.
fn task_list_stage(tasks: Vec<core_api::Task>, max_workers: usize) -> core_api::Stage {
    core_api::Stage {
        id: 0,
        name: "Tasks".to_string(),
        mode: core_api::StageMode::Parallel {
            max_workers: max_workers.max(1),
        },
        tasks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_succeeds_without_touching_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("tasks.md");
        std::fs::write(&file, "## STAGE ## name=\"Build\" mode=\"serial\"\n## TASK ##\nbuild\n").unwrap();
        let cfg = core_api::AppConfig::default();

        let args = PlanArgs {
            file: file.clone(),
            format: Some("jsonl".to_string()),
            strict: false,
        };
        assert_eq!(handle_plan(args, &cfg).unwrap(), 0);
        assert!(!app::checkpoint_for(&file, &cfg).exists());
    }

    #[test]
    fn stage_less_document_plans_as_one_batch() {
        let stage = task_list_stage(
            vec![core_api::Task::new(1, "a"), core_api::Task::new(2, "b")],
            8,
        );
        let plan = core_api::ExecutionPlan::build(&[stage]);
        assert_eq!(plan.stages.len(), 1);
        assert_eq!(plan.total_tasks(), 2);
        assert_eq!(plan.total_steps(), 1);

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("tasks.md");
        std::fs::write(&file, "just prose\n").unwrap();
        let args = PlanArgs {
            file,
            format: Some("jsonl".to_string()),
            strict: false,
        };
        assert_eq!(handle_plan(args, &core_api::AppConfig::default()).unwrap(), 0);
    }

    #[test]
    fn plan_rejects_document_without_tasks() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("tasks.md");
        std::fs::write(&file, "\n## TASK ##\n\n").unwrap();
        let args = PlanArgs {
            file,
            format: None,
            strict: false,
        };
        let err = handle_plan(args, &core_api::AppConfig::default()).unwrap_err();
        assert_eq!(err.error_code().as_exit_code(), 2);
    }
}
