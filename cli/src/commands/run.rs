use batchflow_core::api as core_api;
use batchflow_core::executor::execute_stages;
use batchflow_plugins::factory::{build_renderer, build_runner};
use tokio::task::JoinHandle;

use crate::app;
use crate::commands::cli::RunArgs;

#[tracing::instrument(name = "cli.run", skip(args, cfg), fields(file = %args.file.display()))]
pub async fn handle_run(args: RunArgs, cfg: &core_api::AppConfig) -> Result<i32, core_api::CliError> {
    let options = app::parse_options(&cfg.executor, args.strict);
    let document = app::load_document(&args.file, options)?;

    let mut checkpoint = app::checkpoint_for(&args.file, cfg);
    let staged = matches!(document, core_api::ParsedDocument::Staged { .. });
    if args.restart && staged && checkpoint.clear()? {
        tracing::info!(path = %checkpoint.path().display(), "discarded checkpoint");
    }

    let format = args
        .format
        .clone()
        .unwrap_or_else(|| cfg.output.format.clone());
    let renderer = build_renderer(&cfg.output, Some(&format))?;
    let runner = build_runner(&cfg.runner)
        .map_err(|e| core_api::CliError::Runner(format!("{e:#}")))?;

    let mut opts = core_api::ExecutionOpts::from_config(&cfg.executor)
        .limit_parallel(args.parallel, args.max_parallel);
    opts.single = args.single;
    opts.progress_bar &= !(args.quiet || args.no_progress || format == "jsonl");
    let renderer = (!args.quiet).then_some(renderer);

    let cancel = core_api::CancelToken::new();
    let watcher = spawn_interrupt_watcher(cancel.clone());
    let result = match document {
        core_api::ParsedDocument::Staged { stages, .. } => {
            execute_stages(&stages, runner, checkpoint, opts, renderer, cancel).await
        }
        core_api::ParsedDocument::TaskList { tasks, .. } => {
            tracing::info!(tasks = tasks.len(), "no stage markers; running as a flat task list");
            let task_file = args.file.display().to_string();
            Ok(core_api::execute_task_list(&tasks, runner, opts, renderer, &task_file, cancel).await)
        }
    };
    watcher.abort();
    let result = result?;

    for failed in result.task_results.iter().filter(|r| !r.result.success) {
        tracing::error!(
            stage = failed.stage_id,
            task = failed.result.task_id,
            error = failed.result.error_message.as_deref().unwrap_or("unknown"),
            "task failed"
        );
    }
    Ok(exit_code(result.status))
}

fn exit_code(status: core_api::RunStatus) -> i32 {
    let code = match status {
        core_api::RunStatus::AllCompleted => core_api::ErrorCode::Success,
        core_api::RunStatus::Cancelled => core_api::ErrorCode::Cancelled,
        _ => core_api::ErrorCode::TaskFailed,
    };
    code.as_exit_code()
}

/// First Ctrl-C cancels the run; the engine keeps the checkpoint resumable.
fn spawn_interrupt_watcher(cancel: core_api::CancelToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling run");
            cancel.cancel();
        }
    })
}
