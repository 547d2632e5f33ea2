//! Demand relaxation for overloaded requests.
//!
//! Before any evolution starts, a cheap pre-flight heuristic estimates
//! whether the request can be satisfied at all. It is not a
//! feasibility proof, just three structural checks that catch the
//! common dead ends: demand close to nominal capacity, tasks owned by
//! departments nobody works in, and qualifications nobody holds. When
//! the check fails, the lowest-priority slice of the demand is dropped
//! so the search optimizes a problem it can actually win, and the
//! caller tags the resulting plan so the trimming is visible.

use std::collections::HashSet;

use crate::model::{RosterSnapshot, Staff, Task};

/// Demand above this fraction of nominal capacity is treated as
/// unsatisfiable.
pub const OVERLOAD_THRESHOLD: f64 = 0.95;

/// Fraction of tasks dropped per relaxation.
const RELAXATION_FRACTION: f64 = 0.2;

/// Relaxation never shrinks the demand below this many tasks (or the
/// original count, whichever is smaller).
pub const MIN_TASKS_KEPT: usize = 5;

// ==== Pre-flight check ====

/// A structural reason the request looks unsatisfiable.
#[derive(Debug, Clone, PartialEq)]
pub enum InfeasibilitySign {
    /// Task-hours exceed `OVERLOAD_THRESHOLD` of nominal capacity.
    Overloaded { load: f64 },
    /// Departments with tasks but no planned staff.
    UnknownDepartments(Vec<String>),
    /// Required qualifications no planned staff member holds.
    MissingQualifications(Vec<String>),
}

impl InfeasibilitySign {
    /// Short tag for plan metadata.
    pub fn label(&self) -> String {
        match self {
            Self::Overloaded { load } => format!("overloaded ({:.0}% of capacity)", load * 100.0),
            Self::UnknownDepartments(d) => format!("unknown departments: {}", d.join(", ")),
            Self::MissingQualifications(q) => format!("missing qualifications: {}", q.join(", ")),
        }
    }
}

/// Result of relaxing an overloaded snapshot.
#[derive(Debug)]
pub struct Relaxation {
    /// Snapshot rebuilt around the reduced task list.
    pub snapshot: RosterSnapshot,
    /// Ids of the dropped tasks, least important first.
    pub dropped: Vec<String>,
}

/// Pre-flight infeasibility heuristic and minimal relaxation.
pub struct RelaxationEngine<'a> {
    snapshot: &'a RosterSnapshot,
}

impl<'a> RelaxationEngine<'a> {
    pub fn new(snapshot: &'a RosterSnapshot) -> Self {
        Self { snapshot }
    }

    /// Runs every structural check and returns the signs found, empty
    /// when the request looks satisfiable.
    pub fn check(&self) -> Vec<InfeasibilitySign> {
        let mut signs = Vec::new();

        let capacity = self.snapshot.capacity_hours();
        if capacity > 0.0 {
            let load = self.snapshot.total_task_hours() / capacity;
            if load > OVERLOAD_THRESHOLD {
                signs.push(InfeasibilitySign::Overloaded { load });
            }
        } else if self.snapshot.total_task_hours() > 0.0 {
            signs.push(InfeasibilitySign::Overloaded { load: f64::INFINITY });
        }

        let staffed: HashSet<&str> = self
            .planned()
            .map(|s| s.department.as_str())
            .collect();
        let mut unknown: Vec<String> = self
            .snapshot
            .tasks
            .iter()
            .filter(|t| !staffed.contains(t.department.as_str()))
            .map(|t| t.department.clone())
            .collect();
        unknown.sort();
        unknown.dedup();
        if !unknown.is_empty() {
            signs.push(InfeasibilitySign::UnknownDepartments(unknown));
        }

        let held: HashSet<&str> = self
            .planned()
            .flat_map(|s| s.qualifications.iter().map(String::as_str))
            .collect();
        let mut missing: Vec<String> = self
            .snapshot
            .tasks
            .iter()
            .flat_map(|t| t.required_qualifications.iter())
            .filter(|q| !held.contains(q.as_str()))
            .cloned()
            .collect();
        missing.sort();
        missing.dedup();
        if !missing.is_empty() {
            signs.push(InfeasibilitySign::MissingQualifications(missing));
        }

        signs
    }

    /// Drops the least important ~20% of tasks and rebuilds the
    /// snapshot, keeping at least `MIN_TASKS_KEPT` (or all of a
    /// smaller demand). Priority 1 tasks survive the longest.
    pub fn relax(&self) -> Relaxation {
        let mut ranked: Vec<&Task> = self.snapshot.tasks.iter().collect();
        ranked.sort_by(|a, b| a.priority.cmp(&b.priority));

        let total = ranked.len();
        let drop = (total as f64 * RELAXATION_FRACTION).round() as usize;
        let keep = total.saturating_sub(drop).max(MIN_TASKS_KEPT.min(total));

        let kept: Vec<Task> = ranked[..keep].iter().map(|t| (*t).clone()).collect();
        let mut dropped: Vec<String> = ranked[keep..].iter().map(|t| t.id.clone()).collect();
        dropped.reverse();

        Relaxation {
            snapshot: self.snapshot.with_tasks(kept),
            dropped,
        }
    }

    fn planned(&self) -> impl Iterator<Item = &Staff> {
        self.snapshot
            .planned_staff()
            .iter()
            .map(|&idx| &self.snapshot.staff[idx])
    }
}
