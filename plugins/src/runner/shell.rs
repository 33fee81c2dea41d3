use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use batchflow_core::config::RunnerConfig;
use batchflow_core::document::Task;
use batchflow_core::executor::{CancelToken, TaskResult, TaskRunner};
use tokio::process::Command;

/// Runs each task as an external program built from the `[runner]` template.
///
/// The child is spawned with `kill_on_drop`, so abandoning the wait on
/// timeout or cancellation also terminates the process.
pub struct ShellTaskRunner {
    program: String,
    args: Vec<String>,
    prompt_prefix: Option<String>,
    use_task_body: bool,
    timeout: Duration,
    capture_bytes: usize,
    run_verify: bool,
    shell: String,
    workdir: Option<PathBuf>,
}

/// What a finished child process left behind.
struct ProcessOutput {
    success: bool,
    code: Option<i32>,
    stdout: String,
    stderr: String,
}

impl ShellTaskRunner {
    pub fn new(config: &RunnerConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            prompt_prefix: config.prompt_prefix.clone(),
            use_task_body: config.use_task_body,
            timeout: Duration::from_secs(config.timeout_secs),
            capture_bytes: config.capture_bytes,
            run_verify: config.run_verify,
            shell: config.shell.clone(),
            workdir: config.workdir.as_ref().map(PathBuf::from),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Prompt text sent for `task`.
    pub fn prompt_for(&self, task: &Task) -> String {
        let text = if self.use_task_body {
            task.body.as_str()
        } else {
            task.description.as_str()
        };
        match self.prompt_prefix.as_deref() {
            Some(prefix) if !prefix.is_empty() => format!("{prefix}{text}"),
            _ => text.to_string(),
        }
    }

    /// Program arguments with `{prompt}` and `{description}` substituted.
    pub fn args_for(&self, task: &Task) -> Vec<String> {
        let prompt = self.prompt_for(task);
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{prompt}", &prompt)
                    .replace("{description}", &task.description)
            })
            .collect()
    }

    /// Human-readable command line, used as `TaskResult::command`.
    pub fn display_command(&self, task: &Task) -> String {
        let mut line = self.program.clone();
        for arg in self.args_for(task) {
            line.push(' ');
            if arg.is_empty() || arg.contains(char::is_whitespace) || arg.contains('\'') {
                line.push('\'');
                line.push_str(&arg.replace('\'', "'\\''"));
                line.push('\'');
            } else {
                line.push_str(&arg);
            }
        }
        line
    }

    fn command(&self, program: &str, args: &[String]) -> Command {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.workdir {
            cmd.current_dir(dir);
        }
        cmd
    }

    async fn spawn_and_wait(
        &self,
        mut cmd: Command,
        cancel: &CancelToken,
    ) -> Result<ProcessOutput, String> {
        if cancel.is_cancelled() {
            return Err("cancelled".to_string());
        }
        let child = cmd.spawn().map_err(|e| format!("failed to spawn: {e}"))?;
        let wait = tokio::time::timeout(self.timeout, child.wait_with_output());

        tokio::select! {
            res = wait => match res {
                Ok(Ok(out)) => Ok(ProcessOutput {
                    success: out.status.success(),
                    code: out.status.code(),
                    stdout: tail(&String::from_utf8_lossy(&out.stdout), self.capture_bytes),
                    stderr: tail(&String::from_utf8_lossy(&out.stderr), self.capture_bytes),
                }),
                Ok(Err(e)) => Err(format!("wait failed: {e}")),
                Err(_) => Err(format!("timed out after {}s", self.timeout.as_secs())),
            },
            _ = cancel.cancelled() => Err("cancelled".to_string()),
        }
    }

    async fn verify(&self, task: &Task, command: &str, cancel: &CancelToken) -> Result<(), String> {
        tracing::debug!(task_id = task.id, verify = %command, "running verify command");
        let cmd = self.command(&self.shell, &["-c".to_string(), command.to_string()]);
        let out = self.spawn_and_wait(cmd, cancel).await?;
        if out.success {
            Ok(())
        } else {
            Err(format!(
                "verify `{command}` failed ({}){}",
                exit_label(out.code),
                stderr_suffix(&out.stderr)
            ))
        }
    }
}

#[async_trait]
impl TaskRunner for ShellTaskRunner {
    fn name(&self) -> &str {
        "shell"
    }

    async fn run_one(&self, task: &Task, cancel: &CancelToken) -> TaskResult {
        let started = Instant::now();
        let display_cmd = self.display_command(task);
        tracing::debug!(task_id = task.id, command = %display_cmd, "starting task");

        let cmd = self.command(&self.program, &self.args_for(task));
        let out = match self.spawn_and_wait(cmd, cancel).await {
            Ok(out) => out,
            Err(e) => {
                tracing::warn!(task_id = task.id, error = %e, "task did not finish");
                return TaskResult::failed(task.id, display_cmd, e, started.elapsed().as_secs_f64());
            }
        };

        if !out.success {
            let message = format!("{}{}", exit_label(out.code), stderr_suffix(&out.stderr));
            return TaskResult::failed(task.id, display_cmd, message, started.elapsed().as_secs_f64())
                .with_output(out.stdout);
        }

        if self.run_verify {
            if let Some(verify) = task.verify_command.as_deref() {
                if let Err(e) = self.verify(task, verify, cancel).await {
                    return TaskResult::failed(task.id, display_cmd, e, started.elapsed().as_secs_f64())
                        .with_output(out.stdout);
                }
            }
        }

        TaskResult::succeeded(task.id, display_cmd, out.stdout, started.elapsed().as_secs_f64())
    }
}

fn exit_label(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit status {code}"),
        None => "terminated by signal".to_string(),
    }
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {trimmed}")
    }
}

/// Last `max_bytes` of `text`, cut on a char boundary.
fn tail(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let mut start = text.len() - max_bytes;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    text[start..].to_string()
}
