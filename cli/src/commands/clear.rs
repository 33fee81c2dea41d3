use batchflow_core::api as core_api;

use crate::app;
use crate::commands::cli::ClearArgs;

pub fn handle_clear(args: ClearArgs, cfg: &core_api::AppConfig) -> Result<i32, core_api::CliError> {
    let mut store = app::checkpoint_for(&args.file, cfg);
    if store.clear()? {
        println!("Removed {}", store.path().display());
    } else {
        println!("No checkpoint for {}", args.file.display());
    }
    Ok(core_api::ErrorCode::Success.as_exit_code())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_removes_checkpoint_and_tolerates_absence() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("tasks.md");
        let ckpt = dir.path().join("tasks.md.state.json");
        std::fs::write(&ckpt, "{}").unwrap();
        let cfg = core_api::AppConfig::default();

        let args = ClearArgs { file: file.clone() };
        assert_eq!(handle_clear(args.clone(), &cfg).unwrap(), 0);
        assert!(!ckpt.exists());
        assert_eq!(handle_clear(args, &cfg).unwrap(), 0);
    }
}
