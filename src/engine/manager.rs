//! Population seeding and maintenance.
//!
//! The manager builds the initial population as a mixture of
//! constraint-aware, greedy, and uniform-random chromosomes, and runs
//! the periodic upkeep islands schedule into their generation loop:
//! repair sweeps, diversity injection, and a temporary expansion when
//! diversity collapses.

use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::Rng;

use super::operators::GeneticOperators;
use crate::genome::{Chromosome, Gene, GeneSpace, Population, MAX_TASKS_PER_GENE};
use crate::model::RosterSnapshot;

/// Share of the initial population built constraint-aware.
const CONSTRAINT_AWARE_FRACTION: f64 = 0.3;

/// Share of the initial population built greedily.
const GREEDY_FRACTION: f64 = 0.2;

/// Diversity below which injection replaces the worst chromosomes.
const DIVERSITY_THRESHOLD: f64 = 0.2;

/// Diversity below which the population temporarily expands.
const EXPANSION_THRESHOLD: f64 = 0.1;

/// Generations between repair sweeps.
const REPAIR_SWEEP_INTERVAL: usize = 50;

/// Generations between diversity checks.
const INJECTION_INTERVAL: usize = 25;

/// Fraction of the population replaced by one injection.
const INJECTION_FRACTION: f64 = 0.1;

/// Extra fraction added by one temporary expansion.
const EXPANSION_FRACTION: f64 = 0.2;

/// Seeds and maintains island populations over one gene space.
pub struct PopulationManager<'a> {
    space: &'a GeneSpace,
    snapshot: &'a RosterSnapshot,
}

impl<'a> PopulationManager<'a> {
    /// Binds the manager to a gene space and its snapshot.
    pub fn new(space: &'a GeneSpace, snapshot: &'a RosterSnapshot) -> Self {
        Self { space, snapshot }
    }

    // ========================================================================
    // Seeding
    // ========================================================================

    /// Seeds the initial mixture: ~30% constraint-aware, ~20% greedy,
    /// the rest uniform-random draws.
    pub fn seed<R: Rng + ?Sized>(&self, size: usize, rng: &mut R) -> Population {
        let constraint_count = (size as f64 * CONSTRAINT_AWARE_FRACTION).round() as usize;
        let greedy_count = (size as f64 * GREEDY_FRACTION).round() as usize;

        let mut chromosomes = Vec::with_capacity(size);
        while chromosomes.len() < constraint_count.min(size) {
            chromosomes.push(self.constraint_aware(rng));
        }
        while chromosomes.len() < (constraint_count + greedy_count).min(size) {
            chromosomes.push(self.greedy(rng));
        }
        while chromosomes.len() < size {
            chromosomes.push(Chromosome::random(self.space, rng));
        }
        Population::from_chromosomes(chromosomes)
    }

    /// A chromosome built to keep hard constraints satisfied.
    ///
    /// Staff work staggered five-on two-off cycles, which keeps weekly
    /// hours and consecutive days inside the default limits; working
    /// days pick the candidate covering the most still-uncovered tasks.
    fn constraint_aware<R: Rng + ?Sized>(&self, rng: &mut R) -> Chromosome {
        let num_dates = self.space.num_dates();
        let num_staff = if num_dates == 0 {
            0
        } else {
            self.space.len() / num_dates
        };

        let mut genes = vec![Gene::DayOff; self.space.len()];
        let mut used: HashSet<usize> = HashSet::new();

        let mut staff_order: Vec<usize> = (0..num_staff).collect();
        staff_order.shuffle(rng);

        for staff_pos in staff_order {
            let offset = rng.random_range(0..7);
            for date_pos in 0..num_dates {
                if (date_pos + offset) % 7 >= 5 {
                    continue;
                }
                let slot = self.space.slot_of(staff_pos, date_pos);
                genes[slot] = self.most_covering_gene(slot, &mut used);
            }
        }
        Chromosome::new(genes)
    }

    /// The working candidate covering the most still-uncovered tasks.
    /// Registers the picked tasks in `used`.
    fn most_covering_gene(&self, slot: usize, used: &mut HashSet<usize>) -> Gene {
        let pick = self
            .space
            .candidates(slot)
            .iter()
            .filter(|g| g.is_working())
            .filter(|g| g.task_indices().iter().all(|t| !used.contains(t)))
            .max_by_key(|g| g.task_indices().len());

        match pick {
            Some(gene) => {
                for &task in gene.task_indices() {
                    used.insert(task);
                }
                gene.clone()
            }
            None => Gene::DayOff,
        }
    }

    /// A greedy coverage seed.
    ///
    /// Tasks are assigned highest priority first (longest first within
    /// a priority), each to the least-loaded staff member whose slot
    /// offers a gene extending its current assignment with the task.
    fn greedy<R: Rng + ?Sized>(&self, rng: &mut R) -> Chromosome {
        let num_dates = self.space.num_dates();
        let num_staff = if num_dates == 0 {
            0
        } else {
            self.space.len() / num_dates
        };

        let mut genes = vec![Gene::DayOff; self.space.len()];
        let mut hours = vec![0.0f64; num_staff];

        let mut task_order: Vec<usize> = (0..self.snapshot.tasks.len()).collect();
        task_order.sort_by(|&a, &b| {
            let ta = &self.snapshot.tasks[a];
            let tb = &self.snapshot.tasks[b];
            ta.priority
                .cmp(&tb.priority)
                .then_with(|| tb.duration_hours().total_cmp(&ta.duration_hours()))
        });

        let dates = self.snapshot.dates();
        for task_idx in task_order {
            let task = &self.snapshot.tasks[task_idx];
            let Some(date_pos) = dates.iter().position(|&d| d == task.date) else {
                continue;
            };

            let mut staff_order: Vec<usize> = (0..num_staff).collect();
            staff_order.shuffle(rng);
            staff_order.sort_by(|&a, &b| hours[a].total_cmp(&hours[b]));

            for &staff_pos in &staff_order {
                let slot = self.space.slot_of(staff_pos, date_pos);
                if let Some(gene) = self.merge_task(slot, &genes[slot], task_idx) {
                    hours[staff_pos] +=
                        gene.working_hours(self.snapshot) - genes[slot].working_hours(self.snapshot);
                    genes[slot] = gene;
                    break;
                }
            }
        }
        Chromosome::new(genes)
    }

    /// The slot candidate equal to the current gene plus `task`, if the
    /// space offers one. A gene already carrying a shift keeps it.
    fn merge_task(&self, slot: usize, current: &Gene, task: usize) -> Option<Gene> {
        let mut tasks: Vec<usize> = current.task_indices().to_vec();
        if tasks.contains(&task) || tasks.len() >= MAX_TASKS_PER_GENE {
            return None;
        }
        tasks.push(task);
        tasks.sort_unstable();

        let required_shift = current.shift_index();
        self.space
            .candidates(slot)
            .iter()
            .find(|g| {
                g.task_indices() == tasks.as_slice()
                    && required_shift.map_or(true, |s| g.shift_index() == Some(s))
            })
            .cloned()
    }

    // ========================================================================
    // Maintenance
    // ========================================================================

    /// Runs the periodic maintenance due at `generation`.
    ///
    /// Repair sweep every 50 generations; diversity check every 25,
    /// injecting fresh randoms below the threshold and temporarily
    /// expanding the population when diversity collapses below 0.1.
    /// Expansion is transient: the next evolve step rebuilds the
    /// population at its configured size.
    pub fn maintain<R: Rng + ?Sized>(
        &self,
        population: &mut Population,
        operators: &GeneticOperators<'_>,
        generation: usize,
        rng: &mut R,
    ) {
        if generation == 0 {
            return;
        }
        if generation % REPAIR_SWEEP_INTERVAL == 0 {
            for chromosome in population.chromosomes.iter_mut() {
                operators.repair_basic(chromosome);
            }
        }
        if generation % INJECTION_INTERVAL == 0 {
            let diversity = population.diversity(rng);
            if diversity < DIVERSITY_THRESHOLD {
                self.inject(population, rng);
            }
            if diversity < EXPANSION_THRESHOLD {
                self.expand(population, rng);
            }
        }
    }

    /// Replaces the worst ~10% of the population with fresh randoms.
    pub fn inject<R: Rng + ?Sized>(&self, population: &mut Population, rng: &mut R) {
        let count = ((population.len() as f64 * INJECTION_FRACTION).ceil() as usize).max(1);
        let fresh: Vec<Chromosome> = (0..count)
            .map(|_| Chromosome::random(self.space, rng))
            .collect();
        population.replace_worst_n(fresh);
    }

    /// Temporarily grows the population by ~20% with fresh randoms.
    pub fn expand<R: Rng + ?Sized>(&self, population: &mut Population, rng: &mut R) {
        let extra = ((population.len() as f64 * EXPANSION_FRACTION).ceil() as usize).max(1);
        for _ in 0..extra {
            population
                .chromosomes
                .push(Chromosome::random(self.space, rng));
        }
    }
}
