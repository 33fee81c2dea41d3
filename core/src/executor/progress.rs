use std::collections::HashMap;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Visual progress for a run: one overall bar plus a spinner per running task.
pub struct ProgressMonitor {
    multi: MultiProgress,
    overall: ProgressBar,
    task_bars: HashMap<(usize, u32), ProgressBar>,
    enabled: bool,
}

impl ProgressMonitor {
    /// `enabled` is false for jsonl output and quiet mode.
    pub fn new(total_tasks: usize, enabled: bool) -> Self {
        if !enabled {
            return Self::disabled();
        }

        let multi = MultiProgress::new();
        let overall = multi.add(ProgressBar::new(total_tasks as u64));
        if let Ok(style) = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} tasks ({percent}%) {msg}")
        {
            overall.set_style(style.progress_chars("█▓▒░  "));
        }
        overall.set_message("Starting...");

        Self {
            multi,
            overall,
            task_bars: HashMap::new(),
            enabled: true,
        }
    }

    pub fn disabled() -> Self {
        Self {
            multi: MultiProgress::new(),
            overall: ProgressBar::hidden(),
            task_bars: HashMap::new(),
            enabled: false,
        }
    }

    /// Count tasks already completed by an earlier run.
    pub fn skip_tasks(&self, count: usize) {
        if self.enabled {
            self.overall.inc(count as u64);
        }
    }

    pub fn add_task(&mut self, stage_id: usize, task_id: u32, description: &str) {
        if !self.enabled {
            return;
        }

        let bar = self.multi.add(ProgressBar::new_spinner());
        if let Ok(style) = ProgressStyle::default_spinner().template("  {spinner:.green} {msg}") {
            bar.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
        }
        bar.set_message(format!("⏳ [{}.{}] {}", stage_id + 1, task_id, description));
        bar.enable_steady_tick(Duration::from_millis(100));

        self.task_bars.insert((stage_id, task_id), bar);
    }

    pub fn complete_task(&mut self, stage_id: usize, task_id: u32, success: bool, duration_secs: f64) {
        if !self.enabled {
            return;
        }

        if let Some(bar) = self.task_bars.remove(&(stage_id, task_id)) {
            let icon = if success { "✅" } else { "❌" };
            bar.finish_with_message(format!(
                "{} [{}.{}] ({:.1}s)",
                icon,
                stage_id + 1,
                task_id,
                duration_secs
            ));
        }

        self.overall.inc(1);
    }

    /// Drop the spinner of a task interrupted by cancellation.
    pub fn abandon_task(&mut self, stage_id: usize, task_id: u32) {
        if let Some(bar) = self.task_bars.remove(&(stage_id, task_id)) {
            bar.abandon_with_message(format!("⏹ [{}.{}] interrupted", stage_id + 1, task_id));
        }
    }

    pub fn update_stage(&self, stage_id: usize, total_stages: usize, name: &str) {
        if self.enabled {
            self.overall
                .set_message(format!("Stage {}/{}: {}", stage_id + 1, total_stages, name));
        }
    }

    pub fn finish(&self, message: &str) {
        if self.enabled {
            self.overall.finish_with_message(message.to_string());
        }
    }
}

impl Drop for ProgressMonitor {
    fn drop(&mut self) {
        for (_, bar) in self.task_bars.drain() {
            bar.finish_and_clear();
        }
    }
}
