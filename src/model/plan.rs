//! Roster plan output model.
//!
//! The plan is the only value that crosses the engine boundary back to
//! the caller: one assignment row per worked staff-day, the tasks that
//! could not be placed, violation counts, and the run's statistics and
//! metadata maps.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::snapshot::DateRange;

/// One staff member's assignment on one date.
///
/// Day-off genes produce no assignment row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterAssignment {
    /// Assigned staff member.
    pub staff_id: String,
    /// Date of the assignment.
    pub date: NaiveDate,
    /// Assigned shift.
    pub shift_id: String,
    /// Tasks covered during the shift, possibly empty.
    pub task_ids: Vec<String>,
}

/// A complete roster produced by one optimization call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterPlan {
    /// Plan identifier, assigned when the plan is finalized.
    pub id: String,
    /// Planning horizon.
    pub range: DateRange,
    /// Name of the algorithm that produced the plan.
    pub algorithm: String,
    /// Shift assignments, one per worked staff-day.
    pub assignments: Vec<RosterAssignment>,
    /// Tasks left uncovered.
    pub unassigned_tasks: Vec<String>,
    /// Number of hard-constraint violations.
    pub hard_violations: usize,
    /// Number of soft-constraint violations.
    pub soft_violations: usize,
    /// Final fitness of the winning chromosome.
    pub fitness: f64,
    /// Wall-clock time of the optimization call in milliseconds.
    pub execution_time_ms: u64,
    /// Numeric run statistics (coverage rate, fairness, cache hit rate).
    pub statistics: HashMap<String, f64>,
    /// Free-form run annotations (relaxation, cancellation, fallback).
    pub metadata: HashMap<String, String>,
}

impl RosterPlan {
    /// Creates an empty draft plan over a horizon.
    pub fn draft(range: DateRange, algorithm: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            range,
            algorithm: algorithm.into(),
            assignments: Vec::new(),
            unassigned_tasks: Vec::new(),
            hard_violations: 0,
            soft_violations: 0,
            fitness: 0.0,
            execution_time_ms: 0,
            statistics: HashMap::new(),
            metadata: HashMap::new(),
        }
    }

    /// Whether the plan satisfies every hard constraint.
    pub fn is_feasible(&self) -> bool {
        self.hard_violations == 0
    }

    /// Assignments belonging to one staff member, in date order.
    ///
    /// Assignment rows are produced in (staff, date) iteration order, so
    /// the filtered rows are already sorted by date.
    pub fn assignments_for(&self, staff_id: &str) -> Vec<&RosterAssignment> {
        self.assignments
            .iter()
            .filter(|a| a.staff_id == staff_id)
            .collect()
    }

    /// Number of task placements across all assignments.
    pub fn assigned_task_count(&self) -> usize {
        self.assignments.iter().map(|a| a.task_ids.len()).sum()
    }

    /// Records a numeric statistic.
    pub fn set_statistic(&mut self, key: impl Into<String>, value: f64) {
        self.statistics.insert(key.into(), value);
    }

    /// Records a metadata annotation.
    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(key.into(), value.into());
    }
}
