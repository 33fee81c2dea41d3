//! Standard task document parser
//!
//! # Format
//!
//! ```text
//! ## STAGE ## name="Build" mode="parallel" max_workers="4"
//!
//! ## TASK ##
//! Implement the user module
//! files: src/modules/user/**
//! exclude: src/modules/user/legacy.ts
//! verify: npm test -- user
//!
//! ## TASK ##
//! @prompts/order.md
//! ```

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use crate::config::ExecutorConfig;
use crate::document::include::{IncludeDiagnostic, IncludeResolver};
use crate::document::protocol::{
    DocumentProtocolParser, FormatError, FormatValidation, FormatWarning,
};
use crate::document::types::{Stage, StageMode, Task};
use crate::error::ParseError;

pub const DEFAULT_MAX_WORKERS: usize = 4;

#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Base directory for top-level `@path` directives. Defaults to the
    /// current working directory.
    pub include_base_dir: Option<PathBuf>,
    /// Fail the parse on any unresolvable inclusion.
    pub strict_includes: bool,
}

impl From<&ExecutorConfig> for ParseOptions {
    fn from(cfg: &ExecutorConfig) -> Self {
        Self {
            include_base_dir: cfg
                .include_base_dir
                .as_deref()
                .filter(|d| !d.trim().is_empty())
                .map(PathBuf::from),
            strict_includes: cfg.strict_includes,
        }
    }
}

impl ParseOptions {
    fn base_dir(&self) -> PathBuf {
        self.include_base_dir
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

fn stage_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^## STAGE ##").expect("valid stage marker regex"))
}

fn task_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^## TASK\s*##\s*:?|^## TASK\s*:").expect("valid task marker regex")
    })
}

fn attribute_regex(name: &'static str) -> &'static Regex {
    static NAME: OnceLock<Regex> = OnceLock::new();
    static MODE: OnceLock<Regex> = OnceLock::new();
    static WORKERS: OnceLock<Regex> = OnceLock::new();
    let (cell, pattern) = match name {
        "name" => (&NAME, r#"\bname="([^"]*)""#),
        "mode" => (&MODE, r#"\bmode="([^"]*)""#),
        _ => (&WORKERS, r#"\bmax_workers="([^"]*)""#),
    };
    cell.get_or_init(|| Regex::new(pattern).expect("valid attribute regex"))
}

/// Parses the stage list from a document on disk.
pub fn parse_document(path: &Path, options: &ParseOptions) -> Result<Vec<Stage>, ParseError> {
    let input = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    StandardDocumentParser::for_document(path, options.clone()).parse_stages(&input)
}

/// Parses the stage list from in-memory text; `base_dir` anchors top-level
/// inclusions.
pub fn parse_str(
    input: &str,
    base_dir: &Path,
    options: &ParseOptions,
) -> Result<Vec<Stage>, ParseError> {
    let mut options = options.clone();
    options.include_base_dir = Some(base_dir.to_path_buf());
    StandardDocumentParser::new(options).parse_stages(input)
}

/// Default parser for `## STAGE ##` documents.
#[derive(Debug, Clone, Default)]
pub struct StandardDocumentParser {
    options: ParseOptions,
    document: Option<PathBuf>,
}

impl StandardDocumentParser {
    pub fn new(options: ParseOptions) -> Self {
        Self {
            options,
            document: None,
        }
    }

    /// Parser for a document read from `path`; the document takes part in
    /// inclusion cycle detection.
    pub fn for_document(path: &Path, options: ParseOptions) -> Self {
        Self {
            options,
            document: Some(path.to_path_buf()),
        }
    }

    fn resolve(&self, input: &str) -> Result<(String, Vec<IncludeDiagnostic>), ParseError> {
        let mut resolver = IncludeResolver::new(self.options.strict_includes);
        if let Some(doc) = &self.document {
            resolver = resolver.with_root(doc);
        }
        let text = resolver.resolve(input, &self.options.base_dir())?;
        Ok((text, resolver.into_diagnostics()))
    }

    /// Resolves inclusions once and returns the parsed document together with
    /// its format warnings. Text without a stage marker is read as a flat
    /// task list.
    pub fn parse_with_validation(&self, input: &str) -> Result<ParsedDocument, ParseError> {
        let (text, diagnostics) = self.resolve(input)?;

        if !stage_marker().is_match(&text) {
            let tasks = parse_task_list(&text)?;
            tracing::debug!(tasks = tasks.len(), "parsed flat task list");
            return Ok(ParsedDocument::TaskList {
                tasks,
                validation: validation_from(include_warnings(diagnostics)),
            });
        }

        let parsed = parse_sections(&text)?;
        let validation = validation_from(collect_warnings(diagnostics, &parsed));
        let stages = parsed
            .into_iter()
            .map(|(stage, _)| stage)
            .collect::<Vec<_>>();
        tracing::debug!(stages = stages.len(), "parsed task document");
        Ok(ParsedDocument::Staged { stages, validation })
    }
}

/// A document in one of the two accepted layouts.
#[derive(Debug, Clone)]
pub enum ParsedDocument {
    Staged {
        stages: Vec<Stage>,
        validation: FormatValidation,
    },
    /// No `## STAGE ##` marker: every `## TASK ##` segment is a standalone task.
    TaskList {
        tasks: Vec<Task>,
        validation: FormatValidation,
    },
}

impl ParsedDocument {
    pub fn validation(&self) -> &FormatValidation {
        match self {
            Self::Staged { validation, .. } | Self::TaskList { validation, .. } => validation,
        }
    }
}

impl DocumentProtocolParser for StandardDocumentParser {
    fn name(&self) -> &str {
        "standard"
    }

    fn parse_stages(&self, input: &str) -> Result<Vec<Stage>, ParseError> {
        let (text, _) = self.resolve(input)?;
        let stages = parse_sections(&text)?
            .into_iter()
            .map(|(stage, _)| stage)
            .collect::<Vec<_>>();
        tracing::debug!(stages = stages.len(), "parsed task document");
        Ok(stages)
    }

    fn validate_format(&self, input: &str) -> FormatValidation {
        let (text, diagnostics) = match self.resolve(input) {
            Ok(resolved) => resolved,
            Err(e) => return FormatValidation::with_errors(vec![FormatError::from_parse_error(&e)]),
        };

        if !stage_marker().is_match(&text) {
            return FormatValidation::with_errors(vec![FormatError::parse_error(
                "No '## STAGE ##' marker found".to_string(),
            )]);
        }

        let parsed = match parse_sections(&text) {
            Ok(parsed) => parsed,
            Err(e) => return FormatValidation::with_errors(vec![FormatError::from_parse_error(&e)]),
        };

        validation_from(collect_warnings(diagnostics, &parsed))
    }

    fn format_identifier(&self) -> &str {
        "## STAGE ##"
    }
}

fn include_warnings(diagnostics: Vec<IncludeDiagnostic>) -> Vec<FormatWarning> {
    diagnostics
        .into_iter()
        .map(|d| {
            FormatWarning::new(
                None,
                format!("include failed: {} ({})", d.path, d.reason),
                Some("check the path relative to the including file".to_string()),
            )
        })
        .collect()
}

fn collect_warnings(
    diagnostics: Vec<IncludeDiagnostic>,
    parsed: &[(Stage, StageHeader)],
) -> Vec<FormatWarning> {
    let mut warnings = include_warnings(diagnostics);
    for (stage, header) in parsed {
        if stage.tasks.is_empty() {
            warnings.push(FormatWarning::new(
                Some(stage.id),
                format!("stage '{}' has no tasks", stage.name),
                Some("add a '## TASK ##' block or remove the stage".to_string()),
            ));
        }
        if !stage.mode.is_parallel() && header.declared_max_workers {
            warnings.push(FormatWarning::new(
                Some(stage.id),
                format!("stage '{}' is serial; max_workers is ignored", stage.name),
                None,
            ));
        }
    }
    warnings
}

fn validation_from(warnings: Vec<FormatWarning>) -> FormatValidation {
    if warnings.is_empty() {
        FormatValidation::valid()
    } else {
        FormatValidation::with_warnings(warnings)
    }
}

/// Every segment between task markers, including text before the first one,
/// becomes a task whose non-empty lines are joined with single spaces.
fn parse_task_list(text: &str) -> Result<Vec<Task>, ParseError> {
    let mut tasks = Vec::new();
    for segment in task_marker().split(text) {
        let joined = segment
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if joined.is_empty() {
            continue;
        }
        tasks.push(Task::new(tasks.len() as u32 + 1, joined));
    }
    if tasks.is_empty() {
        return Err(ParseError::NoTasks);
    }
    Ok(tasks)
}

struct StageHeader {
    declared_max_workers: bool,
}

fn parse_sections(text: &str) -> Result<Vec<(Stage, StageHeader)>, ParseError> {
    let mut stages = Vec::new();

    // Text before the first marker is preamble.
    for section in stage_marker().split(text).skip(1) {
        let section = section.trim();
        if section.is_empty() {
            tracing::debug!("skipping empty stage marker");
            continue;
        }
        stages.push(parse_stage(stages.len(), section)?);
    }

    if stages.is_empty() {
        return Err(ParseError::NoStages);
    }
    Ok(stages)
}

fn parse_stage(id: usize, section: &str) -> Result<(Stage, StageHeader), ParseError> {
    let header = section.lines().next().unwrap_or_default();

    let name = extract_attribute(header, "name").ok_or(ParseError::MissingAttribute {
        stage: id,
        attribute: "name",
    })?;
    let mode = extract_attribute(header, "mode").ok_or(ParseError::MissingAttribute {
        stage: id,
        attribute: "mode",
    })?;
    let max_workers_attr = extract_attribute(header, "max_workers");

    let max_workers = match max_workers_attr {
        None => DEFAULT_MAX_WORKERS,
        Some(raw) => match raw.trim().parse::<usize>() {
            Ok(n) if n >= 1 => n,
            _ => {
                return Err(ParseError::InvalidAttribute {
                    stage: id,
                    attribute: "max_workers",
                    value: raw.to_string(),
                })
            }
        },
    };

    let mode = match mode {
        "serial" => StageMode::Serial,
        "parallel" => StageMode::Parallel { max_workers },
        other => {
            return Err(ParseError::InvalidMode {
                stage: id,
                mode: other.to_string(),
            })
        }
    };

    let stage = Stage {
        id,
        name: name.to_string(),
        mode,
        tasks: parse_tasks(section),
    };
    Ok((
        stage,
        StageHeader {
            declared_max_workers: max_workers_attr.is_some(),
        },
    ))
}

fn extract_attribute<'a>(header: &'a str, name: &'static str) -> Option<&'a str> {
    attribute_regex(name)
        .captures(header)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

fn parse_tasks(section: &str) -> Vec<Task> {
    let mut tasks = Vec::new();
    // The first segment holds the stage header and any stage-level prose.
    for segment in task_marker().split(section).skip(1) {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        let id = tasks.len() as u32 + 1;
        tasks.push(parse_task(id, segment));
    }
    tasks
}

enum Field {
    Files,
    Exclude,
    Verify,
}

fn field_line(line: &str) -> Option<(Field, &str)> {
    let (label, value) = line.split_once(':')?;
    let field = match label.trim() {
        "文件" => Field::Files,
        "排除" => Field::Exclude,
        "验证" => Field::Verify,
        other => match other.to_ascii_lowercase().as_str() {
            "files" => Field::Files,
            "exclude" | "excludes" => Field::Exclude,
            "verify" => Field::Verify,
            _ => return None,
        },
    };
    Some((field, value.trim()))
}

fn split_list(value: &str) -> impl Iterator<Item = String> + '_ {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn parse_task(id: u32, segment: &str) -> Task {
    let mut description: Option<String> = None;
    let mut file_scope = Vec::new();
    let mut exclude_scope = Vec::new();
    let mut verify_command = None;

    for line in segment.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        // The first content line is the description even if it looks like a field.
        if description.is_none() {
            description = Some(line.to_string());
            continue;
        }
        match field_line(line) {
            Some((Field::Files, value)) => file_scope.extend(split_list(value)),
            Some((Field::Exclude, value)) => exclude_scope.extend(split_list(value)),
            Some((Field::Verify, value)) => {
                verify_command = (!value.is_empty()).then(|| value.to_string());
            }
            None => {}
        }
    }

    Task {
        id,
        description: description.unwrap_or_else(|| format!("Task {id}")),
        file_scope,
        exclude_scope,
        verify_command,
        body: segment.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(input: &str) -> Result<Vec<Stage>, ParseError> {
        parse_str(input, Path::new("."), &ParseOptions::default())
    }

    const DOC: &str = r#"# Release plan
Preamble text is ignored.

## STAGE ## name="Prepare" mode="serial"

## TASK ##
Install dependencies
verify: npm ci

## STAGE ## name="Modules" mode="parallel" max_workers="2"
Stage notes before the first task.

## TASK ##
Implement user module
files: src/modules/user/**, src/shared/user.ts
exclude: src/modules/user/legacy.ts

## TASK ##:
# comment lines never become the description
Implement order module
Files: src/modules/order/**
文件: src/modules/order/index.ts

## TASK:
Update docs
files: docs/

## TASK ##
# only a comment here
"#;

    #[test]
    fn parses_stages_and_tasks() {
        let stages = parse(DOC).unwrap();
        assert_eq!(stages.len(), 2);

        let prepare = &stages[0];
        assert_eq!(prepare.id, 0);
        assert_eq!(prepare.name, "Prepare");
        assert_eq!(prepare.mode, StageMode::Serial);
        assert_eq!(prepare.tasks.len(), 1);
        assert_eq!(prepare.tasks[0].description, "Install dependencies");
        assert_eq!(prepare.tasks[0].verify_command.as_deref(), Some("npm ci"));

        let modules = &stages[1];
        assert_eq!(modules.id, 1);
        assert_eq!(modules.mode, StageMode::Parallel { max_workers: 2 });
        let ids: Vec<u32> = modules.tasks.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);

        let user = &modules.tasks[0];
        assert_eq!(
            user.file_scope,
            vec!["src/modules/user/**", "src/shared/user.ts"]
        );
        assert_eq!(user.exclude_scope, vec!["src/modules/user/legacy.ts"]);
        assert_eq!(user.verify_command, None);

        let order = &modules.tasks[1];
        assert_eq!(order.description, "Implement order module");
        assert_eq!(
            order.file_scope,
            vec!["src/modules/order/**", "src/modules/order/index.ts"]
        );

        let docs = &modules.tasks[2];
        assert_eq!(docs.description, "Update docs");
        assert_eq!(docs.file_scope, vec!["docs/"]);

        let placeholder = &modules.tasks[3];
        assert_eq!(placeholder.id, 4);
        assert_eq!(placeholder.description, "Task 4");
    }

    #[test]
    fn first_line_is_description_even_with_field_label() {
        let stages = parse(
            "## STAGE ## name=\"s\" mode=\"serial\"\n## TASK ##\nVerify: the checkout page renders the cart total\nverify: npm test -- checkout\n",
        )
        .unwrap();
        let task = &stages[0].tasks[0];
        assert_eq!(
            task.description,
            "Verify: the checkout page renders the cart total"
        );
        assert_eq!(task.verify_command.as_deref(), Some("npm test -- checkout"));
    }

    #[test]
    fn parsing_is_deterministic() {
        assert_eq!(parse(DOC).unwrap(), parse(DOC).unwrap());
    }

    #[test]
    fn max_workers_defaults_to_four() {
        let stages = parse("## STAGE ## name=\"s\" mode=\"parallel\"\n## TASK ##\nx").unwrap();
        assert_eq!(stages[0].mode.max_workers(), DEFAULT_MAX_WORKERS);
    }

    #[test]
    fn empty_task_segments_are_dropped() {
        let stages =
            parse("## STAGE ## name=\"s\" mode=\"serial\"\n## TASK ##\n\n## TASK ##\nreal task")
                .unwrap();
        assert_eq!(stages[0].tasks.len(), 1);
        assert_eq!(stages[0].tasks[0].id, 1);
        assert_eq!(stages[0].tasks[0].description, "real task");
    }

    #[test]
    fn no_stage_marker_is_an_error() {
        assert!(matches!(parse("just text"), Err(ParseError::NoStages)));
    }

    #[test]
    fn missing_and_invalid_attributes_are_errors() {
        assert!(matches!(
            parse("## STAGE ## mode=\"serial\""),
            Err(ParseError::MissingAttribute {
                attribute: "name",
                ..
            })
        ));
        assert!(matches!(
            parse("## STAGE ## name=\"a\""),
            Err(ParseError::MissingAttribute {
                attribute: "mode",
                ..
            })
        ));
        assert!(matches!(
            parse("## STAGE ## name=\"a\" mode=\"fast\""),
            Err(ParseError::InvalidMode { .. })
        ));
        assert!(matches!(
            parse("## STAGE ## name=\"a\" mode=\"parallel\" max_workers=\"0\""),
            Err(ParseError::InvalidAttribute { .. })
        ));
        assert!(matches!(
            parse("## STAGE ## name=\"a\" mode=\"parallel\" max_workers=\"many\""),
            Err(ParseError::InvalidAttribute { .. })
        ));
    }

    #[test]
    fn missing_inclusion_keeps_diagnostic_in_body() {
        let dir = tempfile::tempdir().unwrap();
        let doc = "## STAGE ## name=\"s\" mode=\"serial\"\n## TASK ##\nDo it\n@missing.md\n";
        let stages = parse_str(doc, dir.path(), &ParseOptions::default()).unwrap();

        let task = &stages[0].tasks[0];
        assert_eq!(task.description, "Do it");
        assert!(task
            .body
            .contains("# ⚠️ include failed: missing.md (file not found)"));
        assert!(task.body.contains("@missing.md"));
    }

    #[test]
    fn strict_inclusion_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let options = ParseOptions {
            strict_includes: true,
            ..Default::default()
        };
        let doc = "## STAGE ## name=\"s\" mode=\"serial\"\n## TASK ##\n@missing.md\n";
        assert!(matches!(
            parse_str(doc, dir.path(), &options),
            Err(ParseError::Inclusion(_))
        ));
    }

    #[test]
    fn included_content_can_carry_stages() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("stage.md"),
            "## STAGE ## name=\"Included\" mode=\"serial\"\n## TASK ##\nfrom include",
        )
        .unwrap();
        let stages = parse_str("@stage.md", dir.path(), &ParseOptions::default()).unwrap();
        assert_eq!(stages[0].name, "Included");
        assert_eq!(stages[0].tasks[0].description, "from include");
    }

    #[test]
    fn parse_document_reads_file_and_reports_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.md");
        std::fs::write(&path, "## STAGE ## name=\"s\" mode=\"serial\"\n## TASK ##\nx").unwrap();
        assert_eq!(parse_document(&path, &ParseOptions::default()).unwrap().len(), 1);

        let missing = dir.path().join("nope.md");
        assert!(matches!(
            parse_document(&missing, &ParseOptions::default()),
            Err(ParseError::Io { .. })
        ));
    }

    #[test]
    fn validate_format_reports_warnings() {
        let parser = StandardDocumentParser::default();
        let v = parser.validate_format(
            "## STAGE ## name=\"empty\" mode=\"parallel\"\n\n## STAGE ## name=\"s\" mode=\"serial\" max_workers=\"3\"\n## TASK ##\nx",
        );
        assert!(v.is_valid);
        assert_eq!(v.warnings.len(), 2);
        assert_eq!(v.warnings[0].stage, Some(0));
        assert_eq!(v.warnings[1].stage, Some(1));
    }

    #[test]
    fn parse_with_validation_resolves_inclusions_once() {
        let dir = tempfile::tempdir().unwrap();
        let parser = StandardDocumentParser::new(ParseOptions {
            include_base_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        });
        let doc = "## STAGE ## name=\"s\" mode=\"serial\"\n## TASK ##\nDo it\n@missing.md\n";

        let parsed = parser.parse_with_validation(doc).unwrap();
        let ParsedDocument::Staged { stages, validation } = parsed else {
            panic!("expected a staged document");
        };
        assert_eq!(stages[0].tasks[0].description, "Do it");
        assert_eq!(validation.warnings.len(), 1);
        assert!(validation.warnings[0].message.contains("missing.md"));
    }

    #[test]
    fn document_without_stage_marker_is_a_task_list() {
        let parser = StandardDocumentParser::default();
        let doc = "Refactor the\n  logging setup\n\n## TASK ##\nAdd retries\nto the client\n## TASK ##\n\n## TASK ##\nfiles: not a field here\n";

        let parsed = parser.parse_with_validation(doc).unwrap();
        let ParsedDocument::TaskList { tasks, validation } = parsed else {
            panic!("expected a task list");
        };
        assert!(validation.warnings.is_empty());
        let descriptions: Vec<&str> = tasks.iter().map(|t| t.description.as_str()).collect();
        assert_eq!(
            descriptions,
            vec![
                "Refactor the logging setup",
                "Add retries to the client",
                "files: not a field here",
            ]
        );
        assert_eq!(tasks.iter().map(|t| t.id).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(tasks.iter().all(|t| t.file_scope.is_empty()));
    }

    #[test]
    fn empty_task_list_is_an_error() {
        let parser = StandardDocumentParser::default();
        assert!(matches!(
            parser.parse_with_validation("\n## TASK ##\n   \n"),
            Err(ParseError::NoTasks)
        ));
    }

    #[test]
    fn validate_format_reports_errors() {
        let parser = StandardDocumentParser::default();
        let v = parser.validate_format("nothing here");
        assert!(!v.is_valid);
        assert_eq!(v.errors[0].code, 2);

        let v = parser.validate_format("## STAGE ## name=\"s\" mode=\"sideways\"");
        assert!(!v.is_valid);
        assert_eq!(v.errors[0].code, 3);
    }
}
