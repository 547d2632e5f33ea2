//! Chromosome to roster plan decoding.
//!
//! The decoder turns a chromosome into a draft [`RosterPlan`]: one
//! assignment row per working gene, ids resolved from snapshot indices,
//! plus the uncovered-task list. Violation counts, fitness, and run
//! statistics are filled in by later stages.

use crate::genome::Chromosome;
use crate::model::{RosterAssignment, RosterPlan, RosterSnapshot};

/// Builds draft plans from chromosomes of one snapshot.
pub struct PlanDecoder<'a> {
    snapshot: &'a RosterSnapshot,
}

impl<'a> PlanDecoder<'a> {
    /// Creates a decoder over a snapshot.
    pub fn new(snapshot: &'a RosterSnapshot) -> Self {
        Self { snapshot }
    }

    /// Decodes a chromosome into a draft plan.
    ///
    /// Assignment rows come out in (staff, date) order. Day-off genes
    /// produce no row. The algorithm name is left empty until the plan
    /// is finalized.
    pub fn decode(&self, chromosome: &Chromosome) -> RosterPlan {
        let dates = self.snapshot.dates();
        let mut plan = RosterPlan::draft(self.snapshot.range, "");

        for (staff_pos, &staff_idx) in self.snapshot.planned_staff().iter().enumerate() {
            let staff = &self.snapshot.staff[staff_idx];
            for (date_pos, &date) in dates.iter().enumerate() {
                let slot = staff_pos * dates.len() + date_pos;
                let Some(gene) = chromosome.genes.get(slot) else {
                    continue;
                };
                let Some(shift_idx) = gene.shift_index() else {
                    continue;
                };
                plan.assignments.push(RosterAssignment {
                    staff_id: staff.id.clone(),
                    date,
                    shift_id: self.snapshot.shifts[shift_idx].id.clone(),
                    task_ids: gene
                        .task_indices()
                        .iter()
                        .map(|&ti| self.snapshot.tasks[ti].id.clone())
                        .collect(),
                });
            }
        }

        plan.unassigned_tasks = chromosome
            .unassigned_tasks(self.snapshot)
            .into_iter()
            .map(|ti| self.snapshot.tasks[ti].id.clone())
            .collect();
        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::Gene;
    use crate::model::{DateRange, Shift, Staff, Task};
    use chrono::{NaiveDate, NaiveTime};

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    fn t(h: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, 0, 0).unwrap()
    }

    fn snapshot() -> RosterSnapshot {
        RosterSnapshot::new(
            vec![Staff::new("S1", "ops"), Staff::new("S2", "ops")],
            vec![
                Task::new("T1", "ops", date(1), t(9), t(12)),
                Task::new("T2", "ops", date(2), t(9), t(12)),
            ],
            vec![Shift::new("D", t(9), t(17))],
            vec![],
            DateRange::new(date(1), date(2)),
        )
    }

    #[test]
    fn test_decode_produces_rows_for_working_genes_only() {
        let snap = snapshot();
        let chromosome = Chromosome::new(vec![
            Gene::shift_with_tasks(0, vec![0]),
            Gene::DayOff,
            Gene::DayOff,
            Gene::Shift { shift: 0 },
        ]);
        let plan = PlanDecoder::new(&snap).decode(&chromosome);

        assert_eq!(plan.assignments.len(), 2);
        assert_eq!(plan.assignments[0].staff_id, "S1");
        assert_eq!(plan.assignments[0].date, date(1));
        assert_eq!(plan.assignments[0].task_ids, vec!["T1".to_string()]);
        assert_eq!(plan.assignments[1].staff_id, "S2");
        assert_eq!(plan.assignments[1].date, date(2));
        assert!(plan.assignments[1].task_ids.is_empty());
    }

    #[test]
    fn test_decode_lists_uncovered_tasks() {
        let snap = snapshot();
        let chromosome = Chromosome::new(vec![
            Gene::shift_with_tasks(0, vec![0]),
            Gene::DayOff,
            Gene::DayOff,
            Gene::DayOff,
        ]);
        let plan = PlanDecoder::new(&snap).decode(&chromosome);

        assert_eq!(plan.unassigned_tasks, vec!["T2".to_string()]);
    }

    #[test]
    fn test_all_day_off_decodes_to_empty_plan() {
        let snap = snapshot();
        let chromosome = Chromosome::new(vec![Gene::DayOff; 4]);
        let plan = PlanDecoder::new(&snap).decode(&chromosome);

        assert!(plan.assignments.is_empty());
        assert_eq!(plan.unassigned_tasks.len(), 2);
    }
}
