//! Gene: one staff member's assignment for one day.
//!
//! Genes address shifts and tasks by snapshot index, never by id, so
//! copying and comparing them is cheap. A task-bearing gene keeps its
//! task indices sorted and deduplicated; an emptied task list collapses
//! the gene back to a plain shift assignment.

use crate::model::RosterSnapshot;

/// Most tasks a single gene may carry.
pub const MAX_TASKS_PER_GENE: usize = 3;

/// One (staff, date) assignment choice.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Gene {
    /// No work this day.
    DayOff,
    /// Work a shift with no tasks attached.
    Shift {
        /// Snapshot index of the shift.
        shift: usize,
    },
    /// Work a shift and cover one to three tasks.
    ShiftWithTasks {
        /// Snapshot index of the shift.
        shift: usize,
        /// Snapshot indices of the tasks, sorted, deduplicated,
        /// never empty.
        tasks: Vec<usize>,
    },
}

impl Gene {
    /// Builds a task-bearing gene, normalizing the task list.
    ///
    /// Tasks are sorted and deduplicated, then truncated to
    /// [`MAX_TASKS_PER_GENE`]. An empty list yields a plain shift gene.
    pub fn shift_with_tasks(shift: usize, mut tasks: Vec<usize>) -> Self {
        tasks.sort_unstable();
        tasks.dedup();
        tasks.truncate(MAX_TASKS_PER_GENE);
        if tasks.is_empty() {
            Self::Shift { shift }
        } else {
            Self::ShiftWithTasks { shift, tasks }
        }
    }

    /// Whether this gene represents a working day.
    pub fn is_working(&self) -> bool {
        !matches!(self, Self::DayOff)
    }

    /// The shift index, if working.
    pub fn shift_index(&self) -> Option<usize> {
        match self {
            Self::DayOff => None,
            Self::Shift { shift } | Self::ShiftWithTasks { shift, .. } => Some(*shift),
        }
    }

    /// The task indices carried by this gene.
    pub fn task_indices(&self) -> &[usize] {
        match self {
            Self::ShiftWithTasks { tasks, .. } => tasks,
            _ => &[],
        }
    }

    /// Whether this gene carries any task.
    pub fn has_tasks(&self) -> bool {
        !self.task_indices().is_empty()
    }

    /// Working hours contributed by this gene.
    pub fn working_hours(&self, snapshot: &RosterSnapshot) -> f64 {
        match self.shift_index() {
            Some(shift) => snapshot.shifts[shift].duration_hours(),
            None => 0.0,
        }
    }

    /// Appends this gene's canonical encoding to a signature buffer.
    pub fn encode_into(&self, out: &mut String) {
        use std::fmt::Write;
        match self {
            Self::DayOff => out.push('-'),
            Self::Shift { shift } => {
                let _ = write!(out, "s{shift}");
            }
            Self::ShiftWithTasks { shift, tasks } => {
                let _ = write!(out, "s{shift}t");
                for (i, task) in tasks.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    let _ = write!(out, "{task}");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DateRange, Shift, Staff};
    use chrono::{NaiveDate, NaiveTime};

    fn snapshot() -> RosterSnapshot {
        let t = |h| NaiveTime::from_hms_opt(h, 0, 0).unwrap();
        let d = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        RosterSnapshot::new(
            vec![Staff::new("S1", "ops")],
            vec![],
            vec![Shift::new("D", t(9), t(17))],
            vec![],
            DateRange::new(d, d),
        )
    }

    #[test]
    fn test_normalization_sorts_and_dedups() {
        let g = Gene::shift_with_tasks(0, vec![5, 2, 5, 9]);
        assert_eq!(g.task_indices(), &[2, 5, 9]);
    }

    #[test]
    fn test_empty_task_list_collapses_to_shift() {
        let g = Gene::shift_with_tasks(0, vec![]);
        assert_eq!(g, Gene::Shift { shift: 0 });
        assert!(!g.has_tasks());
    }

    #[test]
    fn test_truncates_to_task_limit() {
        let g = Gene::shift_with_tasks(0, vec![1, 2, 3, 4, 5]);
        assert_eq!(g.task_indices().len(), MAX_TASKS_PER_GENE);
    }

    #[test]
    fn test_working_hours() {
        let snap = snapshot();
        assert!((Gene::DayOff.working_hours(&snap) - 0.0).abs() < 1e-9);
        assert!((Gene::Shift { shift: 0 }.working_hours(&snap) - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_encoding_is_canonical() {
        let mut a = String::new();
        Gene::shift_with_tasks(1, vec![7, 3]).encode_into(&mut a);
        let mut b = String::new();
        Gene::shift_with_tasks(1, vec![3, 7]).encode_into(&mut b);
        assert_eq!(a, b);
        assert_eq!(a, "s1t3,7");

        let mut c = String::new();
        Gene::DayOff.encode_into(&mut c);
        assert_eq!(c, "-");
    }
}
