use crate::config::ExecutorConfig;

/// Execution options for one run.
#[derive(Debug, Clone)]
pub struct ExecutionOpts {
    /// Upper bound on concurrent tasks in a batch
    pub max_parallel: usize,

    /// Force one worker for every batch
    pub single: bool,

    /// Enable visual progress bar (disabled for jsonl output and quiet mode)
    pub progress_bar: bool,

    /// Host CPU count used as the final worker cap
    pub cpu_count: usize,
}

impl Default for ExecutionOpts {
    fn default() -> Self {
        Self {
            max_parallel: 8,
            single: false,
            progress_bar: false,
            cpu_count: num_cpus::get(),
        }
    }
}

impl ExecutionOpts {
    pub fn from_config(cfg: &ExecutorConfig) -> Self {
        Self {
            max_parallel: cfg.max_parallel,
            progress_bar: cfg.progress_bar,
            ..Self::default()
        }
    }

    /// Applies the command-line caps; the smallest of the configured value,
    /// `parallel` and `max_parallel` wins.
    pub fn limit_parallel(mut self, parallel: Option<usize>, max_parallel: Option<usize>) -> Self {
        self.max_parallel = [parallel, max_parallel]
            .into_iter()
            .flatten()
            .fold(self.max_parallel, usize::min)
            .max(1);
        self
    }

    /// Workers for a batch in a stage declaring `stage_max_workers`.
    pub fn worker_count(&self, stage_max_workers: usize) -> usize {
        if self.single {
            return 1;
        }
        self.max_parallel
            .min(stage_max_workers)
            .min(self.cpu_count)
            .max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_count_takes_smallest_cap() {
        let opts = ExecutionOpts {
            max_parallel: 8,
            single: false,
            progress_bar: false,
            cpu_count: 6,
        };
        assert_eq!(opts.worker_count(4), 4);
        assert_eq!(opts.worker_count(16), 6);

        let narrow = ExecutionOpts {
            max_parallel: 2,
            ..opts.clone()
        };
        assert_eq!(narrow.worker_count(4), 2);

        let zero = ExecutionOpts {
            max_parallel: 0,
            ..opts.clone()
        };
        assert_eq!(zero.worker_count(4), 1);
    }

    #[test]
    fn command_line_caps_take_the_minimum() {
        let base = ExecutionOpts {
            max_parallel: 8,
            ..Default::default()
        };
        assert_eq!(base.clone().limit_parallel(None, None).max_parallel, 8);
        assert_eq!(base.clone().limit_parallel(Some(3), None).max_parallel, 3);
        assert_eq!(base.clone().limit_parallel(Some(6), Some(2)).max_parallel, 2);
        assert_eq!(base.clone().limit_parallel(Some(16), None).max_parallel, 8);
        assert_eq!(base.limit_parallel(Some(0), None).max_parallel, 1);
    }

    #[test]
    fn single_forces_one_worker() {
        let opts = ExecutionOpts {
            single: true,
            cpu_count: 32,
            ..Default::default()
        };
        assert_eq!(opts.worker_count(8), 1);
    }
}
