//! Gene-space generation.
//!
//! For every (active staff, date) slot the generator enumerates the
//! assignment choices every operator draws from: a day off, each active
//! shift bare, each eligible (shift, task) pair, and 2..=3-task bundles
//! whose summed duration fits the shift with half an hour of slack.
//! Eligibility requires a department match and that the staff member
//! hold every qualification the task demands.
//!
//! Slots are dense: `slot = staff_pos * num_dates + date_pos`, with
//! `staff_pos` indexing the snapshot's planned staff and `date_pos` the
//! horizon dates.

use itertools::Itertools;
use rand::prelude::IndexedRandom;
use rand::Rng;

use super::gene::{Gene, MAX_TASKS_PER_GENE};
use crate::model::{RosterSnapshot, Staff, Task};

/// Extra hours a task bundle may exceed its shift by.
const TASK_SLACK_HOURS: f64 = 0.5;

/// The enumerated candidate genes for every slot.
#[derive(Debug, Clone)]
pub struct GeneSpace {
    slots: Vec<Vec<Gene>>,
    num_dates: usize,
}

impl GeneSpace {
    /// Enumerates candidates for every slot of the snapshot.
    pub fn build(snapshot: &RosterSnapshot) -> Self {
        let dates = snapshot.dates();
        let mut slots = Vec::with_capacity(snapshot.slot_count());

        for &staff_idx in snapshot.planned_staff() {
            let staff = &snapshot.staff[staff_idx];
            for &date in dates {
                slots.push(Self::slot_candidates(snapshot, staff, date));
            }
        }

        Self {
            slots,
            num_dates: dates.len(),
        }
    }

    fn slot_candidates(
        snapshot: &RosterSnapshot,
        staff: &Staff,
        date: chrono::NaiveDate,
    ) -> Vec<Gene> {
        let mut genes = vec![Gene::DayOff];
        for &shift_idx in snapshot.active_shifts() {
            genes.push(Gene::Shift { shift: shift_idx });
        }

        let eligible: Vec<usize> = snapshot
            .tasks_on(date)
            .iter()
            .copied()
            .filter(|&ti| Self::eligible(staff, &snapshot.tasks[ti]))
            .collect();
        if eligible.is_empty() {
            return genes;
        }

        for &shift_idx in snapshot.active_shifts() {
            let shift_len = snapshot.shifts[shift_idx].duration_hours();

            for &ti in &eligible {
                genes.push(Gene::shift_with_tasks(shift_idx, vec![ti]));
            }

            for k in 2..=MAX_TASKS_PER_GENE {
                if eligible.len() < k {
                    break;
                }
                for combo in eligible.iter().copied().combinations(k) {
                    let total: f64 = combo
                        .iter()
                        .map(|&ti| snapshot.tasks[ti].duration_hours())
                        .sum();
                    if total <= shift_len + TASK_SLACK_HOURS {
                        genes.push(Gene::shift_with_tasks(shift_idx, combo));
                    }
                }
            }
        }

        genes
    }

    fn eligible(staff: &Staff, task: &Task) -> bool {
        staff.department == task.department && staff.holds_all(&task.required_qualifications)
    }

    /// Candidate genes for a slot.
    pub fn candidates(&self, slot: usize) -> &[Gene] {
        &self.slots[slot]
    }

    /// Uniform random candidate for a slot.
    pub fn random_gene<R: Rng + ?Sized>(&self, slot: usize, rng: &mut R) -> Gene {
        self.slots[slot].choose(rng).cloned().unwrap_or(Gene::DayOff)
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the space has no slots.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Days in the horizon this space was built over.
    pub fn num_dates(&self) -> usize {
        self.num_dates
    }

    /// Slot index for a (staff position, date position) pair.
    pub fn slot_of(&self, staff_pos: usize, date_pos: usize) -> usize {
        staff_pos * self.num_dates + date_pos
    }

    /// Staff position a slot belongs to.
    pub fn staff_pos(&self, slot: usize) -> usize {
        slot / self.num_dates
    }

    /// Date position a slot belongs to.
    pub fn date_pos(&self, slot: usize) -> usize {
        slot % self.num_dates
    }
}
