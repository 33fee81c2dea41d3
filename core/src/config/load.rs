use std::path::{Path, PathBuf};

use anyhow::Context;

use super::types::AppConfig;

/// Get the default batchflow data directory: ~/.batchflow
pub fn get_batchflow_data_dir() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(PathBuf::from(home).join(".batchflow"))
}

/// Load configuration from an explicit file.
pub fn load_from_path(path: &Path) -> anyhow::Result<AppConfig> {
    let s = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let mut cfg = toml::from_str::<AppConfig>(&s)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    apply_env_overrides(&mut cfg)?;
    Ok(cfg)
}

pub fn load_default() -> anyhow::Result<AppConfig> {
    // Priority 1: ~/.batchflow/config.toml
    let user_config = get_batchflow_data_dir().ok().map(|d| d.join("config.toml"));

    // Priority 2: ./batchflow.toml (current directory)
    let local_config = Path::new("batchflow.toml");

    let mut cfg: AppConfig = match user_config.filter(|p| p.exists()) {
        Some(path) => {
            let s = std::fs::read_to_string(&path)?;
            toml::from_str::<AppConfig>(&s)
                .with_context(|| format!("failed to parse config {}", path.display()))?
        }
        None if local_config.exists() => {
            let s = std::fs::read_to_string(local_config)?;
            toml::from_str::<AppConfig>(&s).context("failed to parse ./batchflow.toml")?
        }
        None => AppConfig::default(),
    };

    apply_env_overrides(&mut cfg)?;
    Ok(cfg)
}

/// Environment variable overrides (highest priority).
fn apply_env_overrides(cfg: &mut AppConfig) -> anyhow::Result<()> {
    if let Ok(v) = std::env::var("BATCHFLOW_MAX_PARALLEL") {
        if !v.trim().is_empty() {
            cfg.executor.max_parallel = v
                .trim()
                .parse()
                .with_context(|| format!("BATCHFLOW_MAX_PARALLEL is not a number: {v}"))?;
        }
    }
    if let Ok(v) = std::env::var("BATCHFLOW_RUNNER_PROGRAM") {
        if !v.trim().is_empty() {
            cfg.runner.program = v;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_from_path_reads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batchflow.toml");
        std::fs::write(
            &path,
            "[executor]\ncheckpoint_suffix = \".ckpt.json\"\n[output]\nformat = \"jsonl\"\n",
        )
        .unwrap();

        let cfg = load_from_path(&path).unwrap();
        assert_eq!(cfg.executor.checkpoint_suffix, ".ckpt.json");
        assert_eq!(cfg.output.format, "jsonl");
    }

    #[test]
    fn load_from_path_reports_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[executor\nmax_parallel = ").unwrap();

        let err = load_from_path(&path).unwrap_err();
        assert!(err.to_string().contains("failed to parse config"));
    }
}
