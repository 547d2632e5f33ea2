//! Single-island generation loop.
//!
//! Each island evolves one population under one fitness emphasis and
//! only interacts with the rest of the archipelago at migration
//! barriers (see [`crate::engine::migration`]). Per generation the
//! loop polls cancellation, scores unfitted chromosomes through the
//! shared fitness cache, sorts, updates the stagnation counter, checks
//! the early exits and breeds the next generation with profile-scaled
//! elitism and mutation. Quality-focused islands additionally run a
//! bounded hill climb over their elites at a fixed cadence.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::engine::config::EngineConfig;
use crate::engine::local_search::LocalSearch;
use crate::engine::manager::PopulationManager;
use crate::engine::migration::{IslandLink, IslandSignal, RetireGuard};
use crate::engine::operators::GeneticOperators;
use crate::eval::{FitnessCache, FitnessCalculator, FitnessProfile};
use crate::genome::{Chromosome, GeneSpace, Population};
use crate::model::RosterSnapshot;

// ==== Profile assignment ====

/// Fitness emphasis for island `island` out of `total`.
///
/// A single island runs balanced, two islands take the constraint and
/// quality extremes, three or more cycle through all profiles so every
/// emphasis stays represented.
pub fn profile_for(island: usize, total: usize) -> FitnessProfile {
    match total {
        1 => FitnessProfile::Balanced,
        2 => [
            FitnessProfile::ConstraintFocused,
            FitnessProfile::QualityFocused,
        ][island % 2],
        _ => [
            FitnessProfile::ConstraintFocused,
            FitnessProfile::Balanced,
            FitnessProfile::QualityFocused,
        ][island % 3],
    }
}

// ==== Outcome ====

/// Result of one island's run.
#[derive(Debug, Clone)]
pub struct IslandOutcome {
    pub id: usize,
    pub profile: FitnessProfile,
    /// Best chromosome found, scored under this island's profile.
    /// `None` only when the run was cancelled before the first
    /// evaluation pass.
    pub best: Option<Chromosome>,
    /// Generations actually executed.
    pub generations: usize,
    /// The stagnation limit tripped before `max_generations`.
    pub stagnated: bool,
    /// Constraint-focused early exit: the best chromosome is feasible.
    pub feasible_exit: bool,
    pub cancelled: bool,
    /// Best fitness after each generation.
    pub fitness_history: Vec<f64>,
}

impl IslandOutcome {
    pub fn best_fitness(&self) -> Option<f64> {
        self.best.as_ref().and_then(|c| c.fitness())
    }
}

// ==== Island ====

/// One independently evolving population.
pub struct Island<'a> {
    id: usize,
    profile: FitnessProfile,
    config: &'a EngineConfig,
    space: &'a GeneSpace,
    snapshot: &'a RosterSnapshot,
    cache: &'a FitnessCache,
}

impl<'a> Island<'a> {
    pub fn new(
        id: usize,
        profile: FitnessProfile,
        config: &'a EngineConfig,
        space: &'a GeneSpace,
        snapshot: &'a RosterSnapshot,
        cache: &'a FitnessCache,
    ) -> Self {
        Self {
            id,
            profile,
            config,
            space,
            snapshot,
            cache,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn profile(&self) -> FitnessProfile {
        self.profile
    }

    /// Runs the generation loop to completion.
    ///
    /// `link` connects the island to the migration coordinator: at
    /// every `migration_interval`-th generation the island checkpoints
    /// its elites and blocks until the coordinator answers with a
    /// possibly empty migrant batch. `progress` is raised to the
    /// highest generation reached and drives the caller's progress
    /// query. The retirement signal is sent on every exit path,
    /// including panics, so the other islands never stall on a dead
    /// one.
    pub fn run(
        &self,
        link: IslandLink,
        cancel: &AtomicBool,
        progress: &AtomicUsize,
        seed: u64,
    ) -> IslandOutcome {
        let _retire = RetireGuard::new(self.id, link.signals.clone());
        let mut rng = StdRng::seed_from_u64(seed);

        let calculator = FitnessCalculator::new(self.snapshot, self.profile);
        let operators = GeneticOperators::new(self.space, self.snapshot);
        let manager = PopulationManager::new(self.space, self.snapshot);
        let search = LocalSearch::new(self.space, self.snapshot);

        let mut population = manager.seed(self.config.population_size, &mut rng);
        let mut best: Option<Chromosome> = None;
        let mut stagnation = 0usize;
        let mut fitness_history = Vec::with_capacity(self.config.max_generations);
        let mut generations = 0usize;
        let mut stagnated = false;
        let mut feasible_exit = false;
        let mut cancelled = false;

        for generation in 0..self.config.max_generations {
            if cancel.load(Ordering::Relaxed) {
                cancelled = true;
                break;
            }

            self.evaluate(&mut population, &calculator);
            population.sort_by_fitness();
            generations = generation + 1;
            progress.fetch_max(generations, Ordering::Relaxed);

            let gen_best = match population.best() {
                Some(c) => c.clone(),
                None => break,
            };
            let gen_fitness = gen_best.fitness().unwrap_or(f64::NEG_INFINITY);
            match best.as_ref().and_then(|b| b.fitness()) {
                None => {
                    best = Some(gen_best.clone());
                    stagnation = 0;
                }
                Some(old) if gen_fitness > old => {
                    // Significance is relative so the threshold keeps
                    // meaning across fitness scales.
                    let scale = old.abs().max(1.0);
                    if (gen_fitness - old) / scale > self.config.convergence_threshold {
                        stagnation = 0;
                    } else {
                        stagnation += 1;
                    }
                    best = Some(gen_best.clone());
                }
                Some(_) => stagnation += 1,
            }
            fitness_history.push(
                best.as_ref()
                    .and_then(|b| b.fitness())
                    .unwrap_or(gen_fitness),
            );

            if self.profile == FitnessProfile::ConstraintFocused {
                let (_, report) = calculator.decode_and_report(&gen_best);
                if report.is_feasible() {
                    feasible_exit = true;
                    break;
                }
            }
            if self.config.stagnation_limit > 0 && stagnation >= self.config.stagnation_limit {
                stagnated = true;
                break;
            }

            population = self.evolve(&population, &operators, &mut rng);

            if self.wants_local_search(generation + 1) && !cancel.load(Ordering::Relaxed) {
                self.polish_elites(&mut population, &search, &calculator, &mut rng);
            }

            manager.maintain(&mut population, &operators, generation + 1, &mut rng);

            if (generation + 1) % self.config.migration_interval == 0 {
                self.exchange(&link, generations, &mut population, &best);
            }
        }

        // The loop evaluates at the top, so a natural exit leaves the
        // last brood unscored.
        if !cancelled {
            self.evaluate(&mut population, &calculator);
            population.sort_by_fitness();
            if let Some(candidate) = population.best() {
                let current = best
                    .as_ref()
                    .and_then(|b| b.fitness())
                    .unwrap_or(f64::NEG_INFINITY);
                if candidate.fitness().unwrap_or(f64::NEG_INFINITY) > current {
                    best = Some(candidate.clone());
                }
            }
        }

        IslandOutcome {
            id: self.id,
            profile: self.profile,
            best,
            generations,
            stagnated,
            feasible_exit,
            cancelled,
            fitness_history,
        }
    }

    // ==== Generation steps ====

    /// Scores every chromosome that lacks a fitness value.
    fn evaluate(&self, population: &mut Population, calculator: &FitnessCalculator) {
        if self.config.parallel {
            population
                .chromosomes
                .par_iter_mut()
                .filter(|c| c.fitness().is_none())
                .for_each(|c| {
                    let fitness = self.cached_fitness(calculator, c);
                    c.set_fitness(fitness);
                });
        } else {
            for c in population
                .chromosomes
                .iter_mut()
                .filter(|c| c.fitness().is_none())
            {
                let fitness = self.cached_fitness(calculator, c);
                c.set_fitness(fitness);
            }
        }
    }

    /// Cache-backed evaluation. The cache is shared by every island,
    /// so the key carries the profile the score was computed under.
    fn cached_fitness(&self, calculator: &FitnessCalculator, chromosome: &Chromosome) -> f64 {
        let key = format!("{}:{}", self.profile.name(), chromosome.signature());
        if let Some(hit) = self.cache.get(&key) {
            return hit;
        }
        let fitness = calculator.evaluate(chromosome);
        self.cache.put(key, fitness);
        fitness
    }

    fn elite_count(&self) -> usize {
        let rate = (self.config.elite_rate * self.profile.elite_rate_factor()).clamp(0.0, 0.9);
        ((self.config.population_size as f64 * rate).round() as usize)
            .min(self.config.population_size.saturating_sub(1))
    }

    /// Breeds the next generation: elites carried unchanged, the rest
    /// filled by selection, crossover, mutation and repair.
    fn evolve<R: Rng + ?Sized>(
        &self,
        population: &Population,
        operators: &GeneticOperators,
        rng: &mut R,
    ) -> Population {
        let size = self.config.population_size;
        let mutation_rate =
            (self.config.mutation_rate * self.profile.mutation_rate_factor()).min(1.0);

        let mut next = population.best_n(self.elite_count());
        while next.len() < size {
            let a = self.config.selection.select(&population.chromosomes, rng);
            let b = self.config.selection.select(&population.chromosomes, rng);
            let mut child = if rng.random_range(0.0..1.0) < self.config.crossover_rate {
                operators.crossover(
                    &population.chromosomes[a],
                    &population.chromosomes[b],
                    rng,
                )
            } else {
                population.chromosomes[a].clone()
            };
            operators.mutate(&mut child, mutation_rate, rng);
            operators.repair_basic(&mut child);
            next.push(child);
        }
        Population::from_chromosomes(next)
    }

    fn wants_local_search(&self, generation: usize) -> bool {
        self.config.enable_local_search
            && self.profile == FitnessProfile::QualityFocused
            && self.config.local_search_interval > 0
            && generation % self.config.local_search_interval == 0
    }

    /// Hill-climbs the elite block in place.
    fn polish_elites<R: Rng + ?Sized>(
        &self,
        population: &mut Population,
        search: &LocalSearch,
        calculator: &FitnessCalculator,
        rng: &mut R,
    ) {
        let count = self.elite_count().max(1);
        for chromosome in population.chromosomes.iter_mut().take(count) {
            search.improve(
                chromosome,
                self.config.local_search_iterations,
                |c| {
                    let fitness = self.cached_fitness(calculator, c);
                    c.set_fitness(fitness);
                    fitness
                },
                rng,
            );
        }
    }

    /// Checkpoints at a migration barrier and blocks for the round to
    /// finish. Incoming migrants were scored under another island's
    /// profile, so their fitness is cleared and they are rescored on
    /// the next evaluation pass.
    fn exchange(
        &self,
        link: &IslandLink,
        generation: usize,
        population: &mut Population,
        best: &Option<Chromosome>,
    ) {
        let best_fitness = best
            .as_ref()
            .and_then(|b| b.fitness())
            .unwrap_or(f64::NEG_INFINITY);
        let sent = link
            .signals
            .send(IslandSignal::Checkpoint {
                island: self.id,
                generation,
                best_fitness,
                elites: population.best_n(self.config.migration_size),
            })
            .is_ok();
        if !sent {
            return;
        }
        match link.mailbox.recv() {
            Ok(mut migrants) if !migrants.is_empty() => {
                for migrant in &mut migrants {
                    migrant.clear_fitness();
                }
                population.replace_worst_n(migrants);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::migration::build_topology;
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
            DateRange::new(date(1), date(4)),
        )
    }

    fn config() -> EngineConfig {
        EngineConfig::default()
            .with_population_size(14)
            .with_max_generations(20)
            .with_migration_interval(1000)
            .with_parallel(false)
            .with_stagnation_limit(0)
    }

    fn run_alone(island: &Island) -> IslandOutcome {
        let (mut links, _coordinator) = build_topology(1);
        let cancel = AtomicBool::new(false);
        let progress = AtomicUsize::new(0);
        island.run(links.pop().unwrap(), &cancel, &progress, 11)
    }

    // ---- Profile assignment ----

    #[test]
    fn test_profile_assignment() {
        assert_eq!(profile_for(0, 1), FitnessProfile::Balanced);
        assert_eq!(profile_for(0, 2), FitnessProfile::ConstraintFocused);
        assert_eq!(profile_for(1, 2), FitnessProfile::QualityFocused);
        assert_eq!(profile_for(0, 3), FitnessProfile::ConstraintFocused);
        assert_eq!(profile_for(1, 3), FitnessProfile::Balanced);
        assert_eq!(profile_for(2, 3), FitnessProfile::QualityFocused);
        assert_eq!(profile_for(3, 4), FitnessProfile::ConstraintFocused);
    }

    // ---- Generation loop ----

    #[test]
    fn test_island_runs_and_tracks_best() {
        let snapshot = snapshot();
        let space = GeneSpace::build(&snapshot);
        let cache = FitnessCache::new(1000);
        let config = config();
        let island = Island::new(0, FitnessProfile::Balanced, &config, &space, &snapshot, &cache);

        let outcome = run_alone(&island);

        assert!(outcome.best.is_some());
        assert!(outcome.generations > 0);
        assert!(!outcome.cancelled);
        assert_eq!(outcome.fitness_history.len(), outcome.generations);
        assert!(
            outcome
                .fitness_history
                .windows(2)
                .all(|w| w[1] >= w[0]),
            "the tracked best never regresses"
        );
        assert!(cache.len() > 0, "evaluations pass through the cache");
    }

    #[test]
    fn test_constraint_island_exits_once_feasible() {
        let snapshot = snapshot();
        let space = GeneSpace::build(&snapshot);
        let cache = FitnessCache::new(1000);
        let config = config();
        let island = Island::new(
            0,
            FitnessProfile::ConstraintFocused,
            &config,
            &space,
            &snapshot,
            &cache,
        );

        let outcome = run_alone(&island);

        // No registered constraints, so the very first best is feasible.
        assert!(outcome.feasible_exit);
        assert_eq!(outcome.generations, 1);
    }

    #[test]
    fn test_stagnation_limit_stops_the_run() {
        let snapshot = snapshot();
        let space = GeneSpace::build(&snapshot);
        let cache = FitnessCache::new(1000);
        let config = config()
            .with_max_generations(100)
            .with_stagnation_limit(3);
        let island = Island::new(0, FitnessProfile::Balanced, &config, &space, &snapshot, &cache);

        let outcome = run_alone(&island);

        assert!(outcome.stagnated);
        assert!(
            outcome.generations < 100,
            "stalled search must stop early, ran {} generations",
            outcome.generations
        );
    }

    #[test]
    fn test_cancelled_before_start_returns_empty_handed() {
        let snapshot = snapshot();
        let space = GeneSpace::build(&snapshot);
        let cache = FitnessCache::new(1000);
        let config = config();
        let island = Island::new(0, FitnessProfile::Balanced, &config, &space, &snapshot, &cache);

        let (mut links, _coordinator) = build_topology(1);
        let cancel = AtomicBool::new(true);
        let progress = AtomicUsize::new(0);
        let outcome = island.run(links.pop().unwrap(), &cancel, &progress, 11);

        assert!(outcome.cancelled);
        assert_eq!(outcome.generations, 0);
        assert!(outcome.best.is_none());
    }

    #[test]
    fn test_progress_follows_generations() {
        let snapshot = snapshot();
        let space = GeneSpace::build(&snapshot);
        let cache = FitnessCache::new(1000);
        let config = config().with_max_generations(5);
        let island = Island::new(0, FitnessProfile::Balanced, &config, &space, &snapshot, &cache);

        let (mut links, _coordinator) = build_topology(1);
        let cancel = AtomicBool::new(false);
        let progress = AtomicUsize::new(0);
        let outcome = island.run(links.pop().unwrap(), &cancel, &progress, 11);

        assert_eq!(progress.load(Ordering::Relaxed), outcome.generations);
    }

    // ---- Migration ----

    #[test]
    fn test_detached_link_skips_barriers() {
        let snapshot = snapshot();
        let space = GeneSpace::build(&snapshot);
        let cache = FitnessCache::new(1000);
        let config = config().with_max_generations(5).with_migration_interval(1);
        let island = Island::new(0, FitnessProfile::Balanced, &config, &space, &snapshot, &cache);

        let cancel = AtomicBool::new(false);
        let progress = AtomicUsize::new(0);
        let outcome = island.run(IslandLink::detached(), &cancel, &progress, 11);

        // Every generation hits a barrier, none of them blocks.
        assert_eq!(outcome.generations, 5);
        assert!(outcome.best.is_some());
    }

    #[test]
    fn test_two_islands_complete_with_migration() {
        let snapshot = snapshot();
        let space = GeneSpace::build(&snapshot);
        let cache = FitnessCache::new(1000);
        let config = config()
            .with_max_generations(6)
            .with_migration_interval(2)
            .with_migration_size(2);
        let cancel = AtomicBool::new(false);
        let progress = AtomicUsize::new(0);

        let islands: Vec<Island> = (0..2)
            .map(|i| {
                Island::new(
                    i,
                    profile_for(i, 2),
                    &config,
                    &space,
                    &snapshot,
                    &cache,
                )
            })
            .collect();
        let (mut links, coordinator) = build_topology(2);

        let mut outcomes = Vec::new();
        std::thread::scope(|scope| {
            let coordinator_handle =
                scope.spawn(move || crate::engine::migration::run_coordinator(coordinator));
            let handles: Vec<_> = islands
                .iter()
                .enumerate()
                .zip(links.drain(..))
                .map(|((i, island), link)| {
                    let cancel = &cancel;
                    let progress = &progress;
                    scope.spawn(move || island.run(link, cancel, progress, 100 + i as u64))
                })
                .collect();
            for handle in handles {
                outcomes.push(handle.join().unwrap());
            }
            coordinator_handle.join().unwrap();
        });

        assert_eq!(outcomes.len(), 2);
        for outcome in &outcomes {
            assert!(outcome.best.is_some());
            assert!(!outcome.cancelled);
        }
        assert!(progress.load(Ordering::Relaxed) >= 1);
    }
}
