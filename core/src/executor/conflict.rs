//! File-scope conflict detection.
//!
//! The overlap test is a conservative textual heuristic, not a glob
//! intersection: two scopes conflict when their literal prefixes nest.

use std::collections::{BTreeMap, BTreeSet};

use crate::document::Task;

/// Task id to the ids it must not share a batch with.
pub type ConflictMap = BTreeMap<u32, BTreeSet<u32>>;

const WILDCARDS: &[char] = &['*', '?', '['];

/// Declared file patterns minus the excluded ones (exact pattern match).
pub fn effective_scope(task: &Task) -> BTreeSet<&str> {
    let excluded: BTreeSet<&str> = task.exclude_scope.iter().map(String::as_str).collect();
    task.file_scope
        .iter()
        .map(String::as_str)
        .filter(|p| !excluded.contains(p))
        .collect()
}

fn has_wildcard(pattern: &str) -> bool {
    pattern.contains(WILDCARDS)
}

fn literal_prefix(pattern: &str) -> &str {
    let end = pattern.find(WILDCARDS).unwrap_or(pattern.len());
    pattern[..end].trim_end_matches('/')
}

pub fn patterns_overlap(a: &str, b: &str) -> bool {
    let a = a.trim_end_matches('/');
    let b = b.trim_end_matches('/');
    if a == b {
        return true;
    }

    if has_wildcard(a) || has_wildcard(b) {
        let prefix_a = literal_prefix(a);
        let prefix_b = literal_prefix(b);
        return prefix_a.starts_with(prefix_b) || prefix_b.starts_with(prefix_a);
    }

    false
}

pub fn tasks_conflict(a: &Task, b: &Task) -> bool {
    let scope_b = effective_scope(b);
    effective_scope(a)
        .iter()
        .any(|pa| scope_b.iter().any(|pb| patterns_overlap(pa, pb)))
}

/// Symmetric conflict relation over `tasks`. Tasks without conflicts are
/// absent from the map.
pub fn detect_conflicts(tasks: &[Task]) -> ConflictMap {
    let mut conflicts = ConflictMap::new();

    for (i, a) in tasks.iter().enumerate() {
        for b in &tasks[i + 1..] {
            if a.id != b.id && tasks_conflict(a, b) {
                conflicts.entry(a.id).or_default().insert(b.id);
                conflicts.entry(b.id).or_default().insert(a.id);
            }
        }
    }

    conflicts
}
