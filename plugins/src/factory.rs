use std::sync::Arc;

use anyhow::{bail, Result};

use batchflow_core::config::{OutputConfig, RunnerConfig};
use batchflow_core::executor::{OutputRendererPlugin, TaskRunner};

use crate::executor::renderers::{JsonlRendererPlugin, TextRendererPlugin};
use crate::runner::ShellTaskRunner;

pub fn build_runner(cfg: &RunnerConfig) -> Result<Arc<dyn TaskRunner>> {
    if cfg.program.trim().is_empty() {
        bail!("runner.program must not be empty");
    }
    if cfg.timeout_secs == 0 {
        bail!("runner.timeout_secs must be at least 1");
    }
    Ok(Arc::new(ShellTaskRunner::new(cfg)))
}

/// Renderer for `format`, falling back to the configured output format.
pub fn build_renderer(
    cfg: &OutputConfig,
    format: Option<&str>,
) -> Result<Arc<dyn OutputRendererPlugin>> {
    match format.unwrap_or(cfg.format.as_str()) {
        "text" => Ok(Arc::new(TextRendererPlugin::new(cfg.ascii_only))),
        "jsonl" => Ok(Arc::new(JsonlRendererPlugin::new())),
        other => bail!("unknown output format: {other} (expected text or jsonl)"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renderer_follows_override_then_config() {
        let cfg = OutputConfig::default();
        assert_eq!(build_renderer(&cfg, None).unwrap().format(), "text");
        assert_eq!(build_renderer(&cfg, Some("jsonl")).unwrap().format(), "jsonl");
        assert!(build_renderer(&cfg, Some("xml")).is_err());
    }

    #[test]
    fn runner_rejects_unusable_config() {
        let mut cfg = RunnerConfig::default();
        assert_eq!(build_runner(&cfg).unwrap().name(), "shell");
        cfg.timeout_secs = 0;
        assert!(build_runner(&cfg).is_err());
        cfg.timeout_secs = 10;
        cfg.program = "  ".to_string();
        assert!(build_runner(&cfg).is_err());
    }
}
