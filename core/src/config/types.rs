use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub executor: ExecutorConfig,

    #[serde(default)]
    pub runner: RunnerConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// If true, log to stderr.
    #[serde(default = "default_logging_console")]
    pub console: bool,

    /// If true, log to a file under `directory` (or OS temp dir if unset).
    #[serde(default)]
    pub file: bool,

    /// EnvFilter string, e.g. "info" or "batchflow_core=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,

    /// Optional directory for log files. If empty or unset, uses OS temp dir.
    #[serde(default)]
    pub directory: Option<String>,
}

fn default_logging_enabled() -> bool {
    true
}

fn default_logging_console() -> bool {
    true
}

fn default_logging_level() -> String {
    "warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            console: default_logging_console(),
            file: false,
            level: default_logging_level(),
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Upper bound on concurrent tasks in a parallel batch. The effective
    /// worker count is also capped by the stage's `max_workers` and the host
    /// CPU count.
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,

    /// Appended to the document path to locate its checkpoint file.
    #[serde(default = "default_checkpoint_suffix")]
    pub checkpoint_suffix: String,

    /// Turn unresolvable `@path` inclusions into hard parse errors.
    #[serde(default)]
    pub strict_includes: bool,

    /// Base directory for top-level `@path` inclusions. Defaults to the
    /// current working directory.
    #[serde(default)]
    pub include_base_dir: Option<String>,

    #[serde(default = "default_progress_bar")]
    pub progress_bar: bool,
}

fn default_max_parallel() -> usize {
    8
}

fn default_checkpoint_suffix() -> String {
    ".state.json".to_string()
}

fn default_progress_bar() -> bool {
    true
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_parallel: default_max_parallel(),
            checkpoint_suffix: default_checkpoint_suffix(),
            strict_includes: false,
            include_base_dir: None,
            progress_bar: default_progress_bar(),
        }
    }
}

/// Settings for the shell task runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Program invoked once per task.
    #[serde(default = "default_runner_program")]
    pub program: String,

    /// Argument template; `{prompt}` is replaced with the task prompt and
    /// `{description}` with the task description.
    #[serde(default = "default_runner_args")]
    pub args: Vec<String>,

    /// Text prepended to every task prompt.
    #[serde(default)]
    pub prompt_prefix: Option<String>,

    /// Send the whole task body instead of only the description line.
    #[serde(default)]
    pub use_task_body: bool,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Bytes of stdout/stderr kept per task.
    #[serde(default = "default_capture_bytes")]
    pub capture_bytes: usize,

    /// Run the task's `verify:` command after a successful task.
    #[serde(default = "default_run_verify")]
    pub run_verify: bool,

    /// Shell used for verify commands.
    #[serde(default = "default_shell")]
    pub shell: String,

    /// Working directory for spawned commands. Defaults to the current
    /// directory.
    #[serde(default)]
    pub workdir: Option<String>,
}

fn default_runner_program() -> String {
    "claude".to_string()
}

fn default_runner_args() -> Vec<String> {
    vec!["-p".to_string(), "{prompt}".to_string()]
}

fn default_timeout_secs() -> u64 {
    1800
}

fn default_capture_bytes() -> usize {
    65536
}

fn default_run_verify() -> bool {
    true
}

fn default_shell() -> String {
    "sh".to_string()
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            program: default_runner_program(),
            args: default_runner_args(),
            prompt_prefix: None,
            use_task_body: false,
            timeout_secs: default_timeout_secs(),
            capture_bytes: default_capture_bytes(),
            run_verify: default_run_verify(),
            shell: default_shell(),
            workdir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_format")]
    pub format: String,
    #[serde(default)]
    pub ascii_only: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_output_format(),
            ascii_only: false,
        }
    }
}

fn default_output_format() -> String {
    "text".to_string()
}
