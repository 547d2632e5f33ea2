//! Immutable optimization input.
//!
//! A snapshot bundles everything one optimization call reads: staff,
//! tasks, shifts, constraints, and the planning horizon. It is built
//! once per call and never mutated; relaxation produces a *new* snapshot
//! via [`RosterSnapshot::with_tasks`]. Construction precomputes the
//! index maps the genome and evaluator address entities through, so the
//! hot path never searches by id.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::constraint::ConstraintDef;
use super::shift::Shift;
use super::staff::Staff;
use super::task::Task;

/// Inclusive planning horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// First planned date.
    pub start: NaiveDate,
    /// Last planned date, inclusive.
    pub end: NaiveDate,
}

impl DateRange {
    /// Creates a range. Callers validate ordering before building one.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Number of days in the range, inclusive of both endpoints.
    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// All dates in the range, in order.
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.start
            .iter_days()
            .take(self.num_days().max(0) as usize)
            .collect()
    }

    /// Whether a date falls inside the range.
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// The immutable input to one optimization call.
///
/// Entity lists keep their caller-provided order; the genome addresses
/// entities by index into these lists. Only active staff and active
/// shifts participate in the search space.
#[derive(Debug, Clone)]
pub struct RosterSnapshot {
    /// All staff records, active or not.
    pub staff: Vec<Staff>,
    /// All tasks in the horizon.
    pub tasks: Vec<Task>,
    /// All shift records, active or not.
    pub shifts: Vec<Shift>,
    /// Configured constraints.
    pub constraints: Vec<ConstraintDef>,
    /// Planning horizon.
    pub range: DateRange,

    dates: Vec<NaiveDate>,
    planned_staff: Vec<usize>,
    active_shifts: Vec<usize>,
    tasks_by_date: HashMap<NaiveDate, Vec<usize>>,
    staff_by_id: HashMap<String, usize>,
    task_by_id: HashMap<String, usize>,
    shift_by_id: HashMap<String, usize>,
}

impl RosterSnapshot {
    /// Builds a snapshot and its index maps.
    pub fn new(
        staff: Vec<Staff>,
        tasks: Vec<Task>,
        shifts: Vec<Shift>,
        constraints: Vec<ConstraintDef>,
        range: DateRange,
    ) -> Self {
        let dates = range.dates();
        let planned_staff = staff
            .iter()
            .enumerate()
            .filter(|(_, s)| s.active)
            .map(|(i, _)| i)
            .collect();
        let active_shifts = shifts
            .iter()
            .enumerate()
            .filter(|(_, s)| s.active)
            .map(|(i, _)| i)
            .collect();

        let mut tasks_by_date: HashMap<NaiveDate, Vec<usize>> = HashMap::new();
        for (i, task) in tasks.iter().enumerate() {
            tasks_by_date.entry(task.date).or_default().push(i);
        }

        let staff_by_id = staff
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id.clone(), i))
            .collect();
        let task_by_id = tasks
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.clone(), i))
            .collect();
        let shift_by_id = shifts
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id.clone(), i))
            .collect();

        Self {
            staff,
            tasks,
            shifts,
            constraints,
            range,
            dates,
            planned_staff,
            active_shifts,
            tasks_by_date,
            staff_by_id,
            task_by_id,
            shift_by_id,
        }
    }

    /// Rebuilds the snapshot with a different task list.
    ///
    /// Used by relaxation; all index maps are recomputed.
    pub fn with_tasks(&self, tasks: Vec<Task>) -> Self {
        Self::new(
            self.staff.clone(),
            tasks,
            self.shifts.clone(),
            self.constraints.clone(),
            self.range,
        )
    }

    /// Dates of the horizon, in order.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Indices of active staff, in input order.
    pub fn planned_staff(&self) -> &[usize] {
        &self.planned_staff
    }

    /// Indices of active shifts, in input order.
    pub fn active_shifts(&self) -> &[usize] {
        &self.active_shifts
    }

    /// Indices of tasks dated on `date`.
    pub fn tasks_on(&self, date: NaiveDate) -> &[usize] {
        self.tasks_by_date
            .get(&date)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Number of genome slots: active staff times horizon days.
    pub fn slot_count(&self) -> usize {
        self.planned_staff.len() * self.dates.len()
    }

    /// Index of a staff member by id.
    pub fn staff_index(&self, id: &str) -> Option<usize> {
        self.staff_by_id.get(id).copied()
    }

    /// Index of a task by id.
    pub fn task_index(&self, id: &str) -> Option<usize> {
        self.task_by_id.get(id).copied()
    }

    /// Index of a shift by id.
    pub fn shift_index(&self, id: &str) -> Option<usize> {
        self.shift_by_id.get(id).copied()
    }

    /// Summed duration of all tasks, in hours.
    pub fn total_task_hours(&self) -> f64 {
        self.tasks.iter().map(|t| t.duration_hours()).sum()
    }

    /// Nominal capacity of the active workforce over the horizon,
    /// assuming 8 working hours per staff-day.
    pub fn capacity_hours(&self) -> f64 {
        self.planned_staff.len() as f64 * self.dates.len() as f64 * 8.0
    }
}
