//! Island-model rostering strategy.
//!
//! The default strategy: several populations with different fitness
//! emphases evolve in parallel, elites migrate between them at
//! generation barriers, and a single-population fallback covers runs
//! where every island fails.

use std::time::{Duration, Instant};

use crate::engine::{EngineConfig, Orchestrator};
use crate::error::OptimizeError;
use crate::genome::GeneSpace;
use crate::model::RosterPlan;
use crate::optimizer::{
    evaluation_cost_us, finalize_plan, prepare, tag_relaxation, Optimizer, RunHandle,
};
use crate::request::{OptimizationRequest, ParameterDescriptor};

pub struct IslandModelOptimizer;

impl IslandModelOptimizer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for IslandModelOptimizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Optimizer for IslandModelOptimizer {
    fn name(&self) -> &'static str {
        "island-ga"
    }

    fn description(&self) -> &'static str {
        "Island-model genetic algorithm: specialized populations with periodic elite migration"
    }

    fn parameters(&self) -> Vec<ParameterDescriptor> {
        EngineConfig::descriptors()
    }

    fn estimate_runtime(&self, request: &OptimizationRequest) -> Duration {
        let config = EngineConfig::from_params(&request.params);
        let work = evaluation_cost_us(request)
            * config.population_size as u64
            * config.max_generations as u64
            * config.num_islands as u64;
        let estimate = Duration::from_micros(150_000 + work);
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
        let space = GeneSpace::build(&prepared.snapshot);
        handle.begin(prepared.config.max_generations);

        let run = Orchestrator::new(&prepared.config, &space, &prepared.snapshot)
            .run(handle.cancel_flag(), handle.generation_counter())?;

        let mut plan = finalize_plan(&prepared.snapshot, self.name(), run.best.as_ref());
        plan.execution_time_ms = started.elapsed().as_millis() as u64;

        let generations = run.islands.iter().map(|i| i.generations).max().unwrap_or(0);
        plan.set_statistic("generations", generations as f64);
        plan.set_statistic("numberOfIslands", run.islands.len() as f64);
        plan.set_statistic("cacheHitRate", run.cache_hit_rate());
        for outcome in &run.islands {
            if let Some(fitness) = outcome.best_fitness() {
                plan.set_statistic(format!("island{}BestFitness", outcome.id), fitness);
            }
            plan.set_statistic(
                format!("island{}Generations", outcome.id),
                outcome.generations as f64,
            );
            let exit = if outcome.cancelled {
                "cancelled"
            } else if outcome.feasible_exit {
                "feasible"
            } else if outcome.stagnated {
                "stagnated"
            } else {
                "completed"
            };
            plan.set_metadata(format!("island{}Exit", outcome.id), exit);
        }

        tag_relaxation(&mut plan, &prepared.relaxation);
        if run.cancelled {
            plan.set_metadata("cancelled", "true");
        }
        if run.fallback_used {
            plan.set_metadata("fallback", "single-population");
        }
        if !run.island_failures.is_empty() {
            let ids = run
                .island_failures
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            plan.set_metadata("islandFailures", ids);
        }
        if run.best.is_none() {
            plan.set_metadata("degraded", "no candidate survived; empty plan returned");
        }

        Ok(plan)
    }
}

// ---- tests ----
