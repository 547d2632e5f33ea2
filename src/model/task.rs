//! Task model.
//!
//! A task is a dated piece of work with a time window, a priority, and a
//! required-qualification set. Tasks are matched to staff who belong to
//! the same department and hold every required qualification. Priority 1
//! is the most important; larger numbers matter less and are dropped
//! first under relaxation.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// A dated task to be covered by some shift assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique task identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Department the task belongs to.
    pub department: String,
    /// The date the task must be performed on.
    pub date: NaiveDate,
    /// Window start time.
    pub start: NaiveTime,
    /// Window end time (same-day; task windows do not cross midnight).
    pub end: NaiveTime,
    /// Priority, 1 = most important.
    pub priority: u32,
    /// Qualifications the assignee must hold.
    pub required_qualifications: Vec<String>,
}

impl Task {
    /// Creates a priority-1 task with an empty qualification set.
    pub fn new(
        id: impl Into<String>,
        department: impl Into<String>,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
    ) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            department: department.into(),
            date,
            start,
            end,
            priority: 1,
            required_qualifications: Vec::new(),
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the priority (clamped to at least 1).
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority.max(1);
        self
    }

    /// Adds a required qualification.
    pub fn with_required_qualification(mut self, qualification: impl Into<String>) -> Self {
        self.required_qualifications.push(qualification.into());
        self
    }

    /// Task length in hours.
    pub fn duration_hours(&self) -> f64 {
        let span = self.end.signed_duration_since(self.start);
        span.num_seconds().max(0) as f64 / 3600.0
    }
}
