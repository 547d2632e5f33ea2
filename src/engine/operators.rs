//! Gene-level genetic operators over roster chromosomes.
//!
//! Crossover adapts to parent similarity: near-identical parents are
//! recombined uniformly, highly divergent parents are merged by
//! preserving the fitter one, and everything in between uses
//! single-point crossover at a workload-balancing cut. Mutation draws
//! replacements from the per-slot candidate lists, and repair restores
//! the no-duplicate-task invariant after every edit.
//!
//! # References
//!
//! - Syswerda (1989), "Uniform Crossover in Genetic Algorithms"
//! - Srinivas & Patnaik (1994), "Adaptive Probabilities of Crossover
//!   and Mutation in Genetic Algorithms"

use std::collections::HashSet;

use rand::prelude::IndexedRandom;
use rand::Rng;

use crate::genome::{Chromosome, Gene, GeneSpace};
use crate::model::RosterSnapshot;

/// Parent similarity above which uniform crossover is used.
const HIGH_SIMILARITY: f64 = 0.8;

/// Parent similarity below which preserve-best crossover is used.
const LOW_SIMILARITY: f64 = 0.3;

/// Interior cut points scanned by single-point crossover.
const CUT_CANDIDATES: usize = 9;

/// Crossover, mutation, and repair over one gene space.
pub struct GeneticOperators<'a> {
    space: &'a GeneSpace,
    snapshot: &'a RosterSnapshot,
}

impl<'a> GeneticOperators<'a> {
    /// Binds the operators to a gene space and its snapshot.
    pub fn new(space: &'a GeneSpace, snapshot: &'a RosterSnapshot) -> Self {
        Self { space, snapshot }
    }

    // ========================================================================
    // Crossover
    // ========================================================================

    /// Produces one child, picking the strategy from parent similarity.
    ///
    /// - similarity > 0.8: [uniform](Self::uniform_crossover)
    /// - similarity < 0.3: [preserve-best](Self::preserve_best)
    /// - otherwise: [single-point](Self::single_point)
    ///
    /// # Panics
    /// Panics if parents have different lengths or are empty.
    pub fn crossover<R: Rng + ?Sized>(
        &self,
        a: &Chromosome,
        b: &Chromosome,
        rng: &mut R,
    ) -> Chromosome {
        assert_eq!(
            a.genes.len(),
            b.genes.len(),
            "parents must have equal length"
        );
        assert!(!a.genes.is_empty(), "parents must not be empty");

        let similarity = a.similarity(b);
        if similarity > HIGH_SIMILARITY {
            self.uniform_crossover(a, b, rng)
        } else if similarity < LOW_SIMILARITY {
            self.preserve_best(a, b)
        } else {
            self.single_point(a, b, rng)
        }
    }

    /// Uniform crossover for near-identical parents.
    ///
    /// Slot by slot the child takes one parent's gene, preferring a
    /// task-bearing choice whose tasks are not yet covered. When both
    /// or neither qualify the pick is random; clashing task indices are
    /// stripped from the picked gene.
    fn uniform_crossover<R: Rng + ?Sized>(
        &self,
        a: &Chromosome,
        b: &Chromosome,
        rng: &mut R,
    ) -> Chromosome {
        let mut used: HashSet<usize> = HashSet::new();
        let mut genes = Vec::with_capacity(a.genes.len());

        for (ga, gb) in a.genes.iter().zip(&b.genes) {
            let a_adds = adds_new_tasks(ga, &used);
            let b_adds = adds_new_tasks(gb, &used);
            let pick = match (a_adds, b_adds) {
                (true, false) => ga,
                (false, true) => gb,
                _ => {
                    if rng.random_bool(0.5) {
                        ga
                    } else {
                        gb
                    }
                }
            };
            let gene = strip_clashes(pick, &used);
            for &task in gene.task_indices() {
                used.insert(task);
            }
            genes.push(gene);
        }

        Chromosome::new(genes)
    }

    /// Preserve-best crossover for highly divergent parents.
    ///
    /// The child starts as the fitter parent. A donor gene replaces a
    /// slot only when it covers strictly more tasks than the slot does
    /// now and none of them clash with coverage elsewhere in the child.
    fn preserve_best(&self, a: &Chromosome, b: &Chromosome) -> Chromosome {
        let (base, donor) = if fitness_or_worst(a) >= fitness_or_worst(b) {
            (a, b)
        } else {
            (b, a)
        };

        let mut genes = base.genes.clone();
        let mut used = base.assigned_tasks();

        for (i, donor_gene) in donor.genes.iter().enumerate() {
            let current_tasks: Vec<usize> = genes[i].task_indices().to_vec();
            let donor_tasks = donor_gene.task_indices();
            if donor_tasks.len() <= current_tasks.len() {
                continue;
            }
            let conflict_free = donor_tasks
                .iter()
                .all(|t| !used.contains(t) || current_tasks.contains(t));
            if !conflict_free {
                continue;
            }

            for &task in &current_tasks {
                used.remove(&task);
            }
            for &task in donor_tasks {
                used.insert(task);
            }
            genes[i] = donor_gene.clone();
        }

        Chromosome::new(genes)
    }

    /// Single-point crossover for moderately similar parents.
    ///
    /// Scans evenly spaced interior cuts and splices at one whose child
    /// has the lowest per-staff workload variance (ties broken at
    /// random). Tail genes whose tasks are already covered by the head
    /// lose the clashing indices and fall back to a day off when
    /// nothing task-bearing remains.
    fn single_point<R: Rng + ?Sized>(
        &self,
        a: &Chromosome,
        b: &Chromosome,
        rng: &mut R,
    ) -> Chromosome {
        let n = a.genes.len();
        if n < 2 {
            return Chromosome::new(a.genes.clone());
        }

        let hours_a: Vec<f64> = a
            .genes
            .iter()
            .map(|g| g.working_hours(self.snapshot))
            .collect();
        let hours_b: Vec<f64> = b
            .genes
            .iter()
            .map(|g| g.working_hours(self.snapshot))
            .collect();

        let mut cuts: Vec<usize> = (1..=CUT_CANDIDATES)
            .map(|i| i * n / (CUT_CANDIDATES + 1))
            .filter(|&c| c >= 1 && c < n)
            .collect();
        cuts.dedup();

        let mut best_cuts: Vec<usize> = Vec::new();
        let mut best_variance = f64::INFINITY;
        for &cut in &cuts {
            let variance = self.spliced_variance(&hours_a, &hours_b, cut);
            if variance < best_variance - 1e-12 {
                best_variance = variance;
                best_cuts.clear();
                best_cuts.push(cut);
            } else if (variance - best_variance).abs() <= 1e-12 {
                best_cuts.push(cut);
            }
        }
        let cut = best_cuts.choose(rng).copied().unwrap_or(n / 2).max(1);

        let mut genes: Vec<Gene> = a.genes[..cut].to_vec();
        let mut used: HashSet<usize> = genes
            .iter()
            .flat_map(|g| g.task_indices().iter().copied())
            .collect();

        for gene in &b.genes[cut..] {
            let resolved = match gene {
                Gene::ShiftWithTasks { shift, tasks }
                    if tasks.iter().any(|t| used.contains(t)) =>
                {
                    let kept: Vec<usize> = tasks
                        .iter()
                        .copied()
                        .filter(|t| !used.contains(t))
                        .collect();
                    if kept.is_empty() {
                        Gene::DayOff
                    } else {
                        Gene::shift_with_tasks(*shift, kept)
                    }
                }
                other => other.clone(),
            };
            for &task in resolved.task_indices() {
                used.insert(task);
            }
            genes.push(resolved);
        }

        Chromosome::new(genes)
    }

    /// Per-staff workload variance of the child spliced at `cut`.
    fn spliced_variance(&self, hours_a: &[f64], hours_b: &[f64], cut: usize) -> f64 {
        let num_dates = self.space.num_dates();
        if num_dates == 0 {
            return 0.0;
        }
        let staff_hours: Vec<f64> = hours_a
            .chunks(num_dates)
            .zip(hours_b.chunks(num_dates))
            .enumerate()
            .map(|(staff_pos, (row_a, row_b))| {
                let row_start = staff_pos * num_dates;
                row_a
                    .iter()
                    .zip(row_b)
                    .enumerate()
                    .map(|(d, (&ha, &hb))| if row_start + d < cut { ha } else { hb })
                    .sum()
            })
            .collect();

        let n = staff_hours.len() as f64;
        if n == 0.0 {
            return 0.0;
        }
        let mean = staff_hours.iter().sum::<f64>() / n;
        staff_hours.iter().map(|h| (h - mean).powi(2)).sum::<f64>() / n
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Replaces each gene with probability `rate` by another candidate
    /// from its slot.
    ///
    /// The caller scales the base rate by the island specialization
    /// before calling. Slots with a single candidate keep their gene.
    pub fn mutate<R: Rng + ?Sized>(&self, chromosome: &mut Chromosome, rate: f64, rng: &mut R) {
        if rate <= 0.0 {
            return;
        }
        let mut changed = false;
        for slot in 0..chromosome.genes.len() {
            if rng.random_range(0.0..1.0) < rate {
                let replacement = self.alternative_gene(slot, &chromosome.genes[slot], rng);
                if replacement != chromosome.genes[slot] {
                    chromosome.genes[slot] = replacement;
                    changed = true;
                }
            }
        }
        if changed {
            chromosome.clear_fitness();
        }
    }

    /// A candidate for `slot` that differs from `current` when the slot
    /// offers one.
    fn alternative_gene<R: Rng + ?Sized>(&self, slot: usize, current: &Gene, rng: &mut R) -> Gene {
        for _ in 0..4 {
            let gene = self.space.random_gene(slot, rng);
            if gene != *current {
                return gene;
            }
        }
        current.clone()
    }

    // ========================================================================
    // Repair
    // ========================================================================

    /// Restores representation invariants after gene edits.
    ///
    /// Genes referencing an out-of-range shift become a day off, task
    /// indices past the snapshot's task list are dropped, and every
    /// task keeps only its first covering gene in slot order. Returns
    /// whether anything changed.
    pub fn repair_basic(&self, chromosome: &mut Chromosome) -> bool {
        let mut used: HashSet<usize> = HashSet::new();
        let mut changed = false;

        for gene in chromosome.genes.iter_mut() {
            if let Some(repaired) = self.repair_gene(gene, &mut used) {
                *gene = repaired;
                changed = true;
            }
        }
        if changed {
            chromosome.clear_fitness();
        }
        changed
    }

    /// The repaired replacement for a gene, or `None` if it is sound.
    /// Registers every kept task index in `used`.
    fn repair_gene(&self, gene: &Gene, used: &mut HashSet<usize>) -> Option<Gene> {
        let num_shifts = self.snapshot.shifts.len();
        let num_tasks = self.snapshot.tasks.len();
        match gene {
            Gene::DayOff => None,
            Gene::Shift { shift } => (*shift >= num_shifts).then_some(Gene::DayOff),
            Gene::ShiftWithTasks { shift, tasks } => {
                if *shift >= num_shifts {
                    return Some(Gene::DayOff);
                }
                let kept: Vec<usize> = tasks
                    .iter()
                    .copied()
                    .filter(|&t| t < num_tasks && used.insert(t))
                    .collect();
                if kept.len() == tasks.len() {
                    None
                } else {
                    Some(Gene::shift_with_tasks(*shift, kept))
                }
            }
        }
    }

    /// Basic repair plus a bounded workload-rebalancing sweep.
    ///
    /// Moves bare shift genes from the most-loaded staff row to a
    /// same-date day-off slot of the least-loaded row while the move
    /// narrows the hour gap. Task-bearing genes stay put so coverage
    /// and eligibility are untouched.
    pub fn repair_advanced<R: Rng + ?Sized>(
        &self,
        chromosome: &mut Chromosome,
        rng: &mut R,
    ) -> bool {
        let mut changed = self.repair_basic(chromosome);
        let num_dates = self.space.num_dates();
        if num_dates == 0 {
            return changed;
        }
        let num_staff = chromosome.genes.len() / num_dates;
        if num_staff < 2 {
            return changed;
        }

        for _ in 0..num_dates {
            let hours = chromosome.staff_hours(self.snapshot, num_dates);
            let (max_staff, max_hours) = argmax(&hours);
            let (min_staff, min_hours) = argmin(&hours);
            let gap = max_hours - min_hours;
            if max_staff == min_staff || gap <= 0.0 {
                break;
            }

            let offset = rng.random_range(0..num_dates);
            let mut moved = false;
            for i in 0..num_dates {
                let date_pos = (offset + i) % num_dates;
                let from = self.space.slot_of(max_staff, date_pos);
                let to = self.space.slot_of(min_staff, date_pos);

                if let Gene::Shift { shift } = chromosome.genes[from] {
                    let duration = self.snapshot.shifts[shift].duration_hours();
                    if duration < gap && chromosome.genes[to] == Gene::DayOff {
                        chromosome.genes[from] = Gene::DayOff;
                        chromosome.genes[to] = Gene::Shift { shift };
                        moved = true;
                        changed = true;
                        break;
                    }
                }
            }
            if !moved {
                break;
            }
        }

        if changed {
            chromosome.clear_fitness();
        }
        changed
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn fitness_or_worst(chromosome: &Chromosome) -> f64 {
    chromosome.fitness().unwrap_or(f64::NEG_INFINITY)
}

/// Whether the gene carries tasks and none of them is in `used`.
fn adds_new_tasks(gene: &Gene, used: &HashSet<usize>) -> bool {
    gene.has_tasks() && gene.task_indices().iter().all(|t| !used.contains(t))
}

/// The gene with any task index in `used` removed.
fn strip_clashes(gene: &Gene, used: &HashSet<usize>) -> Gene {
    match gene {
        Gene::ShiftWithTasks { shift, tasks } if tasks.iter().any(|t| used.contains(t)) => {
            let kept: Vec<usize> = tasks
                .iter()
                .copied()
                .filter(|t| !used.contains(t))
                .collect();
            Gene::shift_with_tasks(*shift, kept)
        }
        other => other.clone(),
    }
}

fn argmax(values: &[f64]) -> (usize, f64) {
    values
        .iter()
        .copied()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |acc, (i, v)| {
            if v > acc.1 {
                (i, v)
            } else {
                acc
            }
        })
}

fn argmin(values: &[f64]) -> (usize, f64) {
    values
        .iter()
        .copied()
        .enumerate()
        .fold((0, f64::INFINITY), |acc, (i, v)| {
            if v < acc.1 {
                (i, v)
            } else {
                acc
            }
        })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DateRange, Shift, Staff, Task};
    use chrono::{NaiveDate, NaiveTime};
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    fn t(h: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, 0, 0).unwrap()
    }

    /// Two staff, four days, one shift, one 3h task per day.
    fn snapshot() -> RosterSnapshot {
        RosterSnapshot::new(
            vec![Staff::new("S1", "ops"), Staff::new("S2", "ops")],
            (1..=4)
                .map(|d| Task::new(format!("T{d}"), "ops", date(d), t(9), t(12)))
                .collect(),
            vec![Shift::new("D", t(9), t(17))],
            vec![],
            DateRange::new(date(1), date(4)),
        )
    }

    fn day_off_chromosome(n: usize) -> Chromosome {
        Chromosome::new(vec![Gene::DayOff; n])
    }

    // ---- Adaptive dispatch ----

    #[test]
    fn test_crossover_child_has_parent_length() {
        let snap = snapshot();
        let space = GeneSpace::build(&snap);
        let ops = GeneticOperators::new(&space, &snap);
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..50 {
            let mut a = Chromosome::random(&space, &mut rng);
            let mut b = Chromosome::random(&space, &mut rng);
            ops.repair_basic(&mut a);
            ops.repair_basic(&mut b);
            a.set_fitness(1.0);
            b.set_fitness(2.0);

            let child = ops.crossover(&a, &b, &mut rng);
            assert_eq!(child.genes.len(), space.len());
            assert!(child.fitness().is_none(), "child must be unevaluated");
            assert!(
                !child.has_duplicate_tasks(),
                "crossover of repaired parents must not duplicate tasks"
            );
        }
    }

    #[test]
    #[should_panic(expected = "parents must have equal length")]
    fn test_crossover_rejects_length_mismatch() {
        let snap = snapshot();
        let space = GeneSpace::build(&snap);
        let ops = GeneticOperators::new(&space, &snap);
        let mut rng = StdRng::seed_from_u64(42);

        let a = day_off_chromosome(8);
        let b = day_off_chromosome(7);
        ops.crossover(&a, &b, &mut rng);
    }

    // ---- Uniform crossover ----

    #[test]
    fn test_uniform_prefers_task_bearing_genes() {
        let snap = snapshot();
        let space = GeneSpace::build(&snap);
        let ops = GeneticOperators::new(&space, &snap);
        let mut rng = StdRng::seed_from_u64(42);

        let a = day_off_chromosome(8);
        let mut b = day_off_chromosome(8);
        b.genes[0] = Gene::shift_with_tasks(0, vec![0]);
        b.genes[1] = Gene::shift_with_tasks(0, vec![1]);

        let child = ops.uniform_crossover(&a, &b, &mut rng);
        assert_eq!(child.genes[0], b.genes[0]);
        assert_eq!(child.genes[1], b.genes[1]);
    }

    #[test]
    fn test_uniform_never_duplicates_tasks() {
        let snap = snapshot();
        let space = GeneSpace::build(&snap);
        let ops = GeneticOperators::new(&space, &snap);
        let mut rng = StdRng::seed_from_u64(42);

        // Both parents cover task 0, on different staff rows.
        let mut a = day_off_chromosome(8);
        a.genes[0] = Gene::shift_with_tasks(0, vec![0]);
        let mut b = day_off_chromosome(8);
        b.genes[4] = Gene::shift_with_tasks(0, vec![0]);

        for _ in 0..20 {
            let child = ops.uniform_crossover(&a, &b, &mut rng);
            assert!(!child.has_duplicate_tasks());
        }
    }

    // ---- Preserve-best crossover ----

    #[test]
    fn test_preserve_best_starts_from_fitter_parent() {
        let snap = snapshot();
        let space = GeneSpace::build(&snap);
        let ops = GeneticOperators::new(&space, &snap);

        let mut strong = day_off_chromosome(8);
        strong.genes[0] = Gene::shift_with_tasks(0, vec![0]);
        strong.set_fitness(100.0);

        let mut weak = day_off_chromosome(8);
        weak.genes[2] = Gene::Shift { shift: 0 };
        weak.set_fitness(10.0);

        let child = ops.preserve_best(&strong, &weak);
        assert_eq!(child.genes[0], strong.genes[0]);
        // A bare shift is no coverage improvement, so it is not spliced.
        assert_eq!(child.genes[2], Gene::DayOff);
    }

    #[test]
    fn test_preserve_best_splices_strict_improvements() {
        let snap = snapshot();
        let space = GeneSpace::build(&snap);
        let ops = GeneticOperators::new(&space, &snap);

        let mut strong = day_off_chromosome(8);
        strong.genes[0] = Gene::shift_with_tasks(0, vec![0]);
        strong.set_fitness(100.0);

        let mut weak = day_off_chromosome(8);
        weak.genes[1] = Gene::shift_with_tasks(0, vec![1]);
        weak.set_fitness(10.0);

        let child = ops.preserve_best(&strong, &weak);
        assert_eq!(child.genes[0], strong.genes[0], "base coverage kept");
        assert_eq!(child.genes[1], weak.genes[1], "new coverage spliced in");
    }

    #[test]
    fn test_preserve_best_rejects_conflicting_donors() {
        let snap = snapshot();
        let space = GeneSpace::build(&snap);
        let ops = GeneticOperators::new(&space, &snap);

        let mut strong = day_off_chromosome(8);
        strong.genes[0] = Gene::shift_with_tasks(0, vec![0]);
        strong.set_fitness(100.0);

        // Donor covers task 0 again on the other staff row.
        let mut weak = day_off_chromosome(8);
        weak.genes[4] = Gene::shift_with_tasks(0, vec![0]);
        weak.set_fitness(10.0);

        let child = ops.preserve_best(&strong, &weak);
        assert_eq!(child.genes[4], Gene::DayOff, "conflicting donor rejected");
        assert!(!child.has_duplicate_tasks());
    }

    // ---- Single-point crossover ----

    #[test]
    fn test_single_point_splices_head_and_tail() {
        let snap = snapshot();
        let space = GeneSpace::build(&snap);
        let ops = GeneticOperators::new(&space, &snap);
        let mut rng = StdRng::seed_from_u64(42);

        let a = Chromosome::new(vec![Gene::Shift { shift: 0 }; 8]);
        let b = day_off_chromosome(8);

        let child = ops.single_point(&a, &b, &mut rng);
        assert_eq!(child.genes[0], a.genes[0], "head comes from first parent");
        assert_eq!(child.genes[7], b.genes[7], "tail comes from second parent");
        for (i, gene) in child.genes.iter().enumerate() {
            assert!(
                *gene == a.genes[i] || *gene == b.genes[i],
                "slot {i} must come from a parent"
            );
        }
    }

    #[test]
    fn test_single_point_conflicted_tail_gene_becomes_day_off() {
        let snap = snapshot();
        let space = GeneSpace::build(&snap);
        let ops = GeneticOperators::new(&space, &snap);
        let mut rng = StdRng::seed_from_u64(42);

        // Head always includes slot 0; every tail gene of b re-covers
        // task 0 and must lose it.
        let mut a = day_off_chromosome(8);
        a.genes[0] = Gene::shift_with_tasks(0, vec![0]);
        let b = Chromosome::new(vec![Gene::shift_with_tasks(0, vec![0]); 8]);

        for _ in 0..10 {
            let child = ops.single_point(&a, &b, &mut rng);
            let covering = child
                .genes
                .iter()
                .filter(|g| g.task_indices().contains(&0))
                .count();
            assert_eq!(covering, 1, "task 0 covered exactly once");
            assert!(!child.has_duplicate_tasks());
        }
    }

    #[test]
    fn test_single_point_picks_balancing_cut() {
        let snap = snapshot();
        let space = GeneSpace::build(&snap);
        let ops = GeneticOperators::new(&space, &snap);
        let mut rng = StdRng::seed_from_u64(42);

        // First parent loads staff 1 only, second loads staff 2 only.
        // Any mid-chromosome cut balances; a cut at the edges does not.
        let mut a = day_off_chromosome(8);
        for slot in 0..4 {
            a.genes[slot] = Gene::Shift { shift: 0 };
        }
        let mut b = day_off_chromosome(8);
        for slot in 4..8 {
            b.genes[slot] = Gene::Shift { shift: 0 };
        }

        let child = ops.single_point(&a, &b, &mut rng);
        let hours = child.staff_hours(&snap, 4);
        assert!(
            (hours[0] - hours[1]).abs() < 1e-9,
            "cut should balance staff hours, got {hours:?}"
        );
    }

    // ---- Mutation ----

    #[test]
    fn test_mutation_rate_zero_changes_nothing() {
        let snap = snapshot();
        let space = GeneSpace::build(&snap);
        let ops = GeneticOperators::new(&space, &snap);
        let mut rng = StdRng::seed_from_u64(42);

        let mut c = Chromosome::random(&space, &mut rng);
        c.set_fitness(5.0);
        let before = c.genes.clone();

        ops.mutate(&mut c, 0.0, &mut rng);
        assert_eq!(c.genes, before);
        assert_eq!(c.fitness(), Some(5.0), "untouched fitness survives");
    }

    #[test]
    fn test_mutation_rate_one_draws_from_candidates() {
        let snap = snapshot();
        let space = GeneSpace::build(&snap);
        let ops = GeneticOperators::new(&space, &snap);
        let mut rng = StdRng::seed_from_u64(42);

        let mut c = Chromosome::random(&space, &mut rng);
        c.set_fitness(5.0);
        ops.mutate(&mut c, 1.0, &mut rng);

        for (slot, gene) in c.genes.iter().enumerate() {
            assert!(
                space.candidates(slot).contains(gene),
                "slot {slot} gene must come from its candidate list"
            );
        }
        assert!(c.fitness().is_none(), "mutation clears fitness");
    }

    // ---- Repair ----

    #[test]
    fn test_repair_basic_removes_duplicate_tasks() {
        let snap = snapshot();
        let space = GeneSpace::build(&snap);
        let ops = GeneticOperators::new(&space, &snap);

        let mut c = day_off_chromosome(8);
        c.genes[0] = Gene::shift_with_tasks(0, vec![0]);
        c.genes[4] = Gene::shift_with_tasks(0, vec![0]);
        c.set_fitness(5.0);

        assert!(ops.repair_basic(&mut c));
        assert!(!c.has_duplicate_tasks());
        assert_eq!(c.genes[0], Gene::shift_with_tasks(0, vec![0]), "first wins");
        assert_eq!(c.genes[4], Gene::Shift { shift: 0 }, "duplicate stripped");
        assert!(c.fitness().is_none());
    }

    #[test]
    fn test_repair_basic_drops_out_of_range_references() {
        let snap = snapshot();
        let space = GeneSpace::build(&snap);
        let ops = GeneticOperators::new(&space, &snap);

        let mut c = day_off_chromosome(8);
        c.genes[0] = Gene::Shift { shift: 99 };
        c.genes[1] = Gene::shift_with_tasks(0, vec![0, 99]);

        assert!(ops.repair_basic(&mut c));
        assert_eq!(c.genes[0], Gene::DayOff);
        assert_eq!(c.genes[1], Gene::shift_with_tasks(0, vec![0]));
    }

    #[test]
    fn test_repair_basic_leaves_sound_chromosomes_alone() {
        let snap = snapshot();
        let space = GeneSpace::build(&snap);
        let ops = GeneticOperators::new(&space, &snap);

        let mut c = day_off_chromosome(8);
        c.genes[0] = Gene::shift_with_tasks(0, vec![0]);
        c.set_fitness(5.0);

        assert!(!ops.repair_basic(&mut c));
        assert_eq!(c.fitness(), Some(5.0), "no edit, fitness kept");
    }

    #[test]
    fn test_repair_advanced_rebalances_bare_shifts() {
        let snap = snapshot();
        let space = GeneSpace::build(&snap);
        let ops = GeneticOperators::new(&space, &snap);
        let mut rng = StdRng::seed_from_u64(42);

        // Staff 1 works all four days, staff 2 none.
        let mut c = day_off_chromosome(8);
        for slot in 0..4 {
            c.genes[slot] = Gene::Shift { shift: 0 };
        }

        assert!(ops.repair_advanced(&mut c, &mut rng));
        let hours = c.staff_hours(&snap, 4);
        assert!(
            (hours[0] - hours[1]).abs() < 1e-9,
            "expected an even split, got {hours:?}"
        );
    }

    #[test]
    fn test_repair_advanced_never_moves_task_genes() {
        let snap = snapshot();
        let space = GeneSpace::build(&snap);
        let ops = GeneticOperators::new(&space, &snap);
        let mut rng = StdRng::seed_from_u64(42);

        let mut c = day_off_chromosome(8);
        for (slot, task) in [(0usize, 0usize), (1, 1), (2, 2), (3, 3)] {
            c.genes[slot] = Gene::shift_with_tasks(0, vec![task]);
        }
        let before = c.genes.clone();

        ops.repair_advanced(&mut c, &mut rng);
        assert_eq!(c.genes, before, "task-bearing genes stay put");
    }

    // ---- Representation properties ----

    proptest! {
        #[test]
        fn test_crossover_sound_for_any_seed(seed in any::<u64>()) {
            let snap = snapshot();
            let space = GeneSpace::build(&snap);
            let ops = GeneticOperators::new(&space, &snap);
            let mut rng = StdRng::seed_from_u64(seed);

            let mut a = Chromosome::random(&space, &mut rng);
            let mut b = Chromosome::random(&space, &mut rng);
            ops.repair_basic(&mut a);
            ops.repair_basic(&mut b);
            a.set_fitness(1.0);
            b.set_fitness(2.0);

            let child = ops.crossover(&a, &b, &mut rng);
            prop_assert_eq!(child.genes.len(), space.len());
            prop_assert!(!child.has_duplicate_tasks());
        }

        #[test]
        fn test_mutate_then_repair_sound_for_any_rate(
            seed in any::<u64>(),
            rate in 0.0f64..=1.0,
        ) {
            let snap = snapshot();
            let space = GeneSpace::build(&snap);
            let ops = GeneticOperators::new(&space, &snap);
            let mut rng = StdRng::seed_from_u64(seed);

            let mut c = Chromosome::random(&space, &mut rng);
            ops.mutate(&mut c, rate, &mut rng);
            ops.repair_basic(&mut c);

            prop_assert!(!c.has_duplicate_tasks());
            for gene in &c.genes {
                for &task in gene.task_indices() {
                    prop_assert!(task < snap.tasks.len());
                }
            }
        }
    }
}
