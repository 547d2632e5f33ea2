//! Two-phase rostering strategy.
//!
//! One population evolved through two weight regimes in sequence. The
//! first phase leans on constraint pressure until the best candidate
//! is feasible or half the budget is spent; the second reseeds around
//! the phase-one front and spends the remaining budget on quality. The
//! finalists of both phases are compared under the quality weights so
//! the scales match.

use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::engine::{EngineConfig, GeneticOperators, PopulationManager};
use crate::error::OptimizeError;
use crate::eval::{FitnessCache, FitnessCalculator, FitnessWeights};
use crate::genome::{Chromosome, GeneSpace, Population};
use crate::model::{RosterPlan, RosterSnapshot};
use crate::optimizer::{
    evaluation_cost_us, finalize_plan, prepare, tag_relaxation, Optimizer, RunHandle,
};
use crate::request::{OptimizationRequest, ParameterDescriptor};

/// Fraction of the population carried from phase one into phase two.
const CARRY_FRACTION: f64 = 0.25;

/// Parameters that only steer the island-model strategy.
const ISLAND_ONLY: [&str; 4] = [
    "numberOfIslands",
    "migrationInterval",
    "migrationSize",
    "enableLocalSearch",
];

pub struct TwoPhaseOptimizer;

impl TwoPhaseOptimizer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TwoPhaseOptimizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Optimizer for TwoPhaseOptimizer {
    fn name(&self) -> &'static str {
        "two-phase-ga"
    }

    fn description(&self) -> &'static str {
        "Sequential genetic algorithm: a feasibility phase followed by a quality polish phase"
    }

    fn parameters(&self) -> Vec<ParameterDescriptor> {
        EngineConfig::descriptors()
            .into_iter()
            .filter(|d| !ISLAND_ONLY.contains(&d.name))
            .collect()
    }

    fn estimate_runtime(&self, request: &OptimizationRequest) -> Duration {
        let config = EngineConfig::from_params(&request.params);
        // Both phases together spend at most one full generation budget.
        let work = evaluation_cost_us(request)
            * config.population_size as u64
            * config.max_generations as u64;
        let estimate = Duration::from_micros(100_000 + work);
        match request.time_budget_ms {
            Some(budget) => estimate.min(Duration::from_millis(budget)),
            None => estimate,
        }
    }

    fn optimize(
        &self,
        request: &OptimizationRequest,
        handle: &RunHandle,
    ) -> Result<RosterPlan, OptimizeError> {
        let started = Instant::now();
        let prepared = prepare(request)?;
        let config = &prepared.config;
        let space = GeneSpace::build(&prepared.snapshot);
        let cache = FitnessCache::new(config.cache_capacity);
        handle.begin(config.max_generations);

        let mut rng = StdRng::seed_from_u64(config.seed.unwrap_or_else(rand::random));
        let deadline = config
            .time_limit_ms
            .map(|ms| started + Duration::from_millis(ms));

        let half = (config.max_generations / 2).max(1);
        let first = Phase {
            label: "constraint",
            config,
            space: &space,
            snapshot: &prepared.snapshot,
            cache: &cache,
            weights: FitnessWeights::two_phase_constraint(),
            stop_when_feasible: true,
            deadline,
        }
        .run(Vec::new(), half, 0, handle, &mut rng);

        let remaining = config.max_generations.saturating_sub(first.generations);
        let second = Phase {
            label: "quality",
            config,
            space: &space,
            snapshot: &prepared.snapshot,
            cache: &cache,
            weights: FitnessWeights::two_phase_quality(),
            stop_when_feasible: false,
            deadline,
        }
        .run(first.front, remaining, first.generations, handle, &mut rng);

        // The phase-one finalist is rescored under the quality weights
        // before the comparison; the phase-two finalist already carries
        // a quality score.
        let quality =
            FitnessCalculator::with_weights(&prepared.snapshot, FitnessWeights::two_phase_quality());
        let mut finalists: Vec<Chromosome> = Vec::new();
        if let Some(mut candidate) = first.best {
            let fitness = quality.evaluate(&candidate);
            candidate.set_fitness(fitness);
            finalists.push(candidate);
        }
        if let Some(candidate) = second.best {
            finalists.push(candidate);
        }
        let best = finalists.into_iter().max_by(|a, b| {
            let fa = a.fitness().unwrap_or(f64::NEG_INFINITY);
            let fb = b.fitness().unwrap_or(f64::NEG_INFINITY);
            fa.total_cmp(&fb)
        });
        let best_was_empty = best.is_none();

        let mut plan = finalize_plan(&prepared.snapshot, self.name(), best.as_ref());
        plan.execution_time_ms = started.elapsed().as_millis() as u64;
        plan.set_statistic("phase1Generations", first.generations as f64);
        plan.set_statistic("phase2Generations", second.generations as f64);
        plan.set_statistic("cacheHitRate", cache.hit_rate());

        tag_relaxation(&mut plan, &prepared.relaxation);
        if first.feasible {
            plan.set_metadata("feasibleAtGeneration", first.generations.to_string());
        }
        if first.cancelled || second.cancelled {
            plan.set_metadata("cancelled", "true");
        }
        if best_was_empty {
            plan.set_metadata("degraded", "no candidate survived; empty plan returned");
        }

        Ok(plan)
    }
}

// ==== Phase runner ====

/// One weight regime over the shared population budget.
struct Phase<'a> {
    /// Cache key prefix; the cache is shared across both phases.
    label: &'a str,
    config: &'a EngineConfig,
    space: &'a GeneSpace,
    snapshot: &'a RosterSnapshot,
    cache: &'a FitnessCache,
    weights: FitnessWeights,
    /// Stop as soon as the generation best has no hard violations.
    stop_when_feasible: bool,
    /// Wall-clock bound from the request's time budget, if any.
    deadline: Option<Instant>,
}

/// What a phase hands to its successor.
struct PhaseOutcome {
    best: Option<Chromosome>,
    /// Top slice of the final population, used to seed the next phase.
    front: Vec<Chromosome>,
    generations: usize,
    feasible: bool,
    cancelled: bool,
}

impl Phase<'_> {
    fn run(
        &self,
        seeded: Vec<Chromosome>,
        budget: usize,
        offset: usize,
        handle: &RunHandle,
        rng: &mut StdRng,
    ) -> PhaseOutcome {
        let calculator = FitnessCalculator::with_weights(self.snapshot, self.weights.clone());
        let operators = GeneticOperators::new(self.space, self.snapshot);
        let manager = PopulationManager::new(self.space, self.snapshot);

        let mut population = manager.seed(self.config.population_size, rng);
        if !seeded.is_empty() {
            // Carried chromosomes were scored under the previous
            // regime; clear so they are rescored under this one.
            let mut carried = seeded;
            for chromosome in &mut carried {
                chromosome.clear_fitness();
            }
            population.replace_worst_n(carried);
        }

        let mut best: Option<Chromosome> = None;
        let mut stagnation = 0usize;
        let mut generations = 0usize;
        let mut feasible = false;
        let mut cancelled = false;

        for generation in 0..budget {
            let out_of_time = self.deadline.is_some_and(|d| Instant::now() >= d);
            if handle.is_cancelled() || out_of_time {
                cancelled = true;
                break;
            }

            self.evaluate(&mut population, &calculator);
            population.sort_by_fitness();
            generations = generation + 1;
            handle
                .generation_counter()
                .fetch_max(offset + generations, Ordering::Relaxed);

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

            if self.stop_when_feasible {
                let (_, report) = calculator.decode_and_report(&gen_best);
                if report.is_feasible() {
                    feasible = true;
                    break;
                }
            }
            if self.config.stagnation_limit > 0 && stagnation >= self.config.stagnation_limit {
                break;
            }

            population = self.evolve(&population, &operators, rng);
            manager.maintain(&mut population, &operators, generation + 1, rng);
        }

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

        let carry = ((self.config.population_size as f64 * CARRY_FRACTION).round() as usize).max(1);
        PhaseOutcome {
            best,
            front: population.best_n(carry),
            generations,
            feasible,
            cancelled,
        }
    }

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

    fn cached_fitness(&self, calculator: &FitnessCalculator, chromosome: &Chromosome) -> f64 {
        let key = format!("{}:{}", self.label, chromosome.signature());
        if let Some(hit) = self.cache.get(&key) {
            return hit;
        }
        let fitness = calculator.evaluate(chromosome);
        self.cache.put(key, fitness);
        fitness
    }

    /// Breeds the next generation. Unlike the islands there is no
    /// profile scaling: the weight regime itself carries the emphasis.
    fn evolve<R: Rng + ?Sized>(
        &self,
        population: &Population,
        operators: &GeneticOperators,
        rng: &mut R,
    ) -> Population {
        let size = self.config.population_size;
        let elite = ((size as f64 * self.config.elite_rate).round() as usize)
            .min(size.saturating_sub(1));

        let mut next = population.best_n(elite);
        while next.len() < size {
            let a = self.config.selection.select(&population.chromosomes, rng);
            let b = self.config.selection.select(&population.chromosomes, rng);
            let mut child = if rng.random_range(0.0..1.0) < self.config.crossover_rate {
                operators.crossover(&population.chromosomes[a], &population.chromosomes[b], rng)
            } else {
                population.chromosomes[a].clone()
            };
            operators.mutate(&mut child, self.config.mutation_rate, rng);
            operators.repair_basic(&mut child);
            next.push(child);
        }
        Population::from_chromosomes(next)
    }
}

// ---- tests ----
