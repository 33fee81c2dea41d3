use serde::Serialize;

use crate::document::{Stage, StageMode, Task};

use super::conflict::{detect_conflicts, ConflictMap};

fn conflicts_with(conflicts: &ConflictMap, a: u32, b: u32) -> bool {
    conflicts.get(&a).is_some_and(|s| s.contains(&b))
        || conflicts.get(&b).is_some_and(|s| s.contains(&a))
}

/// Greedy first-fit partition of `tasks` into conflict-free batches.
///
/// Each scan walks the remaining tasks in input order and admits every task
/// that conflicts with nobody already admitted. Batches run one after another.
pub fn create_batches<'a>(tasks: &'a [Task], conflicts: &ConflictMap) -> Vec<Vec<&'a Task>> {
    if tasks.is_empty() {
        return Vec::new();
    }
    if conflicts.is_empty() {
        return vec![tasks.iter().collect()];
    }

    let mut remaining: Vec<&Task> = tasks.iter().collect();
    let mut batches = Vec::new();

    while !remaining.is_empty() {
        let mut batch: Vec<&Task> = Vec::new();
        let mut rest: Vec<&Task> = Vec::new();

        for task in remaining {
            if batch
                .iter()
                .any(|admitted| conflicts_with(conflicts, task.id, admitted.id))
            {
                rest.push(task);
            } else {
                batch.push(task);
            }
        }

        if batch.is_empty() {
            // Unreachable with a consistent map; keeps the loop finite.
            batch.push(rest.remove(0));
        }

        batches.push(batch);
        remaining = rest;
    }

    batches
}

/// Planned execution of one stage, for dry runs and the plan event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StagePlan {
    pub stage_id: usize,
    pub name: String,
    pub mode: StageMode,
    pub workers: usize,
    pub conflicts: ConflictMap,
    /// Task ids per step; steps run in order.
    pub batches: Vec<Vec<u32>>,
}

impl StagePlan {
    pub fn build(stage: &Stage) -> Self {
        match stage.mode {
            StageMode::Serial => Self {
                stage_id: stage.id,
                name: stage.name.clone(),
                mode: stage.mode,
                workers: 1,
                conflicts: ConflictMap::new(),
                batches: stage.tasks.iter().map(|t| vec![t.id]).collect(),
            },
            StageMode::Parallel { max_workers } => {
                let conflicts = detect_conflicts(&stage.tasks);
                let batches = create_batches(&stage.tasks, &conflicts)
                    .into_iter()
                    .map(|b| b.into_iter().map(|t| t.id).collect())
                    .collect();
                Self {
                    stage_id: stage.id,
                    name: stage.name.clone(),
                    mode: stage.mode,
                    workers: max_workers,
                    conflicts,
                    batches,
                }
            }
        }
    }

    pub fn task_count(&self) -> usize {
        self.batches.iter().map(Vec::len).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionPlan {
    pub stages: Vec<StagePlan>,
}

impl ExecutionPlan {
    pub fn build(stages: &[Stage]) -> Self {
        Self {
            stages: stages.iter().map(StagePlan::build).collect(),
        }
    }

    pub fn total_tasks(&self) -> usize {
        self.stages.iter().map(StagePlan::task_count).sum()
    }

    pub fn total_steps(&self) -> usize {
        self.stages.iter().map(|s| s.batches.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeSet;

    fn task(id: u32, files: &[&str]) -> Task {
        Task::new(id, format!("task {id}")).with_files(files.iter().copied())
    }

    fn ids(batches: &[Vec<&Task>]) -> Vec<Vec<u32>> {
        batches
            .iter()
            .map(|b| b.iter().map(|t| t.id).collect())
            .collect()
    }

    #[test]
    fn repeated_file_splits_batches() {
        let tasks = vec![
            task(1, &["src/a.ts"]),
            task(2, &["src/b.ts"]),
            task(3, &["src/a.ts"]),
        ];
        let conflicts = detect_conflicts(&tasks);
        assert_eq!(conflicts[&1], BTreeSet::from([3]));
        assert_eq!(conflicts[&3], BTreeSet::from([1]));

        let batches = create_batches(&tasks, &conflicts);
        assert_eq!(ids(&batches), vec![vec![1, 2], vec![3]]);
    }

    #[test]
    fn empty_conflicts_yield_single_batch() {
        let tasks = vec![task(1, &["a"]), task(2, &["b"]), task(3, &[])];
        let batches = create_batches(&tasks, &ConflictMap::new());
        assert_eq!(ids(&batches), vec![vec![1, 2, 3]]);
    }

    #[test]
    fn empty_input_yields_no_batches() {
        assert!(create_batches(&[], &ConflictMap::new()).is_empty());
    }

    #[test]
    fn batches_partition_tasks_without_conflicts_inside() {
        let tasks = vec![
            task(1, &["src/**"]),
            task(2, &["src/a.ts"]),
            task(3, &["docs/x.md"]),
            task(4, &["src/b.ts"]),
            task(5, &["docs/**"]),
            task(6, &["lib/c.rs"]),
        ];
        let conflicts = detect_conflicts(&tasks);
        let batches = create_batches(&tasks, &conflicts);

        let mut seen: Vec<u32> = batches.iter().flatten().map(|t| t.id).collect();
        seen.sort_unstable();
        assert_eq!(seen, vec![1, 2, 3, 4, 5, 6]);

        for batch in &batches {
            for a in batch {
                for b in batch {
                    assert!(a.id == b.id || !conflicts_with(&conflicts, a.id, b.id));
                }
            }
        }
        assert_eq!(ids(&batches), vec![vec![1, 3, 6], vec![2, 4, 5]]);
    }

    #[test]
    fn one_directional_map_is_still_respected() {
        let tasks = vec![task(1, &[]), task(2, &[])];
        let mut conflicts = ConflictMap::new();
        conflicts.entry(2).or_default().insert(1);

        let batches = create_batches(&tasks, &conflicts);
        assert_eq!(ids(&batches), vec![vec![1], vec![2]]);
    }

    #[test]
    fn stage_plan_for_serial_and_parallel() {
        let serial = Stage {
            id: 0,
            name: "prep".to_string(),
            mode: StageMode::Serial,
            tasks: vec![task(1, &["a"]), task(2, &["b"])],
        };
        let parallel = Stage {
            id: 1,
            name: "work".to_string(),
            mode: StageMode::Parallel { max_workers: 3 },
            tasks: vec![task(1, &["src/a.ts"]), task(2, &["src/b.ts"]), task(3, &["src/a.ts"])],
        };

        let plan = ExecutionPlan::build(&[serial, parallel]);
        assert_eq!(plan.stages[0].batches, vec![vec![1], vec![2]]);
        assert_eq!(plan.stages[0].workers, 1);
        assert_eq!(plan.stages[1].batches, vec![vec![1, 2], vec![3]]);
        assert_eq!(plan.stages[1].workers, 3);
        assert_eq!(plan.total_tasks(), 5);
        assert_eq!(plan.total_steps(), 4);
    }
}
