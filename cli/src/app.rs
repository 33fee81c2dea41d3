//! CLI assembly layer: resolves configuration and loads task documents.
use std::path::Path;

use batchflow_core::api as core_api;

/// `--config` wins over the default search; env overrides apply either way.
pub fn load_config(path: Option<&Path>) -> Result<core_api::AppConfig, core_api::CliError> {
    let loaded = match path {
        Some(path) => core_api::load_from_path(path),
        None => core_api::load_default(),
    };
    loaded.map_err(|e| core_api::CliError::Config(format!("{e:#}")))
}

pub fn parse_options(cfg: &core_api::ExecutorConfig, strict: bool) -> core_api::ParseOptions {
    let mut options = core_api::ParseOptions::from(cfg);
    options.strict_includes |= strict;
    options
}

/// Reads and parses `file`, resolving inclusions once. Format warnings are
/// logged here and returned with the document.
#[tracing::instrument(name = "cli.load_document", skip(options))]
pub fn load_document(
    file: &Path,
    options: core_api::ParseOptions,
) -> Result<core_api::ParsedDocument, core_api::CliError> {
    let input = std::fs::read_to_string(file).map_err(|source| core_api::ParseError::Io {
        path: file.to_path_buf(),
        source,
    })?;
    let parsed =
        core_api::StandardDocumentParser::for_document(file, options).parse_with_validation(&input)?;
    for warning in &parsed.validation().warnings {
        tracing::warn!(stage = ?warning.stage, "{}", warning.message);
    }
    Ok(parsed)
}

pub fn checkpoint_for(file: &Path, cfg: &core_api::AppConfig) -> core_api::CheckpointStore {
    core_api::CheckpointStore::open(file, &cfg.executor.checkpoint_suffix)
}
