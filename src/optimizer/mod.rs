//! Optimization strategies and the surface the outer layers call.
//!
//! Every strategy implements [`Optimizer`]: a name to select it by,
//! parameter descriptors for UI generation, request validation, a
//! runtime estimate, and the optimize call itself. The
//! [`OptimizerRegistry`] resolves algorithm names to strategies; a
//! [`RunHandle`] gives the caller best-effort cancellation and a
//! progress query while a run is in flight.

mod island_model;
mod two_phase;

pub use island_model::IslandModelOptimizer;
pub use two_phase::TwoPhaseOptimizer;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use crate::engine::{EngineConfig, RelaxationEngine};
use crate::error::{OptimizeError, RequestFault, RequestFaultKind};
use crate::eval::{ConstraintEvaluator, FitnessWeights, PlanDecoder, PlanMetrics};
use crate::genome::Chromosome;
use crate::model::{RosterPlan, RosterSnapshot};
use crate::request::{
    validate_request, AlgorithmParams, OptimizationRequest, ParameterDescriptor,
};

// ==== Run handle ====

/// Shared handle for one optimization call.
///
/// The caller keeps a reference (typically behind an `Arc`) and may
/// cancel the run or poll its progress from any thread.
#[derive(Debug, Default)]
pub struct RunHandle {
    cancel: AtomicBool,
    generation: AtomicUsize,
    max_generations: AtomicUsize,
}

impl RunHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Best effort: the run stops at the next
    /// generation boundary and returns the best plan found so far.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// Highest generation any worker has reached.
    pub fn generation(&self) -> usize {
        self.generation.load(Ordering::Relaxed)
    }

    /// Progress in percent, 0 to 100.
    pub fn progress(&self) -> u8 {
        let max = self.max_generations.load(Ordering::Relaxed);
        if max == 0 {
            return 0;
        }
        let generation = self.generation.load(Ordering::Relaxed).min(max);
        ((generation * 100) / max) as u8
    }

    pub(crate) fn cancel_flag(&self) -> &AtomicBool {
        &self.cancel
    }

    pub(crate) fn generation_counter(&self) -> &AtomicUsize {
        &self.generation
    }

    /// Resets the progress scale at the start of a run.
    pub(crate) fn begin(&self, max_generations: usize) {
        self.max_generations.store(max_generations, Ordering::Relaxed);
        self.generation.store(0, Ordering::Relaxed);
    }
}

// ==== Strategy trait ====

/// One interchangeable optimization strategy.
pub trait Optimizer: Send + Sync {
    /// Stable algorithm name requests select the strategy by.
    fn name(&self) -> &'static str;

    /// One-line human-readable description.
    fn description(&self) -> &'static str;

    /// Descriptors of every configurable parameter, for validation and
    /// UI generation.
    fn parameters(&self) -> Vec<ParameterDescriptor>;

    /// Default parameter bag, one entry per descriptor.
    fn default_params(&self) -> AlgorithmParams {
        let mut params = AlgorithmParams::new();
        for descriptor in self.parameters() {
            params.set(descriptor.name, descriptor.default);
        }
        params
    }

    /// Validates a request without running it. Collects every fault.
    fn validate(&self, request: &OptimizationRequest) -> Result<(), OptimizeError> {
        let faults = validate_request(request, &self.parameters());
        if faults.is_empty() {
            Ok(())
        } else {
            Err(OptimizeError::InvalidRequest(faults))
        }
    }

    /// Rough wall-clock estimate for planning purposes.
    fn estimate_runtime(&self, request: &OptimizationRequest) -> Duration;

    /// Runs the optimization. The request must have passed
    /// [`Optimizer::validate`] first.
    fn optimize(
        &self,
        request: &OptimizationRequest,
        handle: &RunHandle,
    ) -> Result<RosterPlan, OptimizeError>;
}

// ==== Registry ====

/// Name-indexed set of registered strategies.
pub struct OptimizerRegistry {
    optimizers: Vec<Box<dyn Optimizer>>,
}

impl OptimizerRegistry {
    /// Registry holding every built-in strategy.
    pub fn standard() -> Self {
        Self {
            optimizers: vec![
                Box::new(IslandModelOptimizer::new()),
                Box::new(TwoPhaseOptimizer::new()),
            ],
        }
    }

    /// Registered algorithm names, in registration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.optimizers.iter().map(|o| o.name()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&dyn Optimizer> {
        self.optimizers
            .iter()
            .find(|o| o.name() == name)
            .map(|b| b.as_ref())
    }

    /// Resolves a name or reports an unknown-algorithm fault.
    pub fn resolve(&self, name: &str) -> Result<&dyn Optimizer, OptimizeError> {
        self.get(name).ok_or_else(|| {
            OptimizeError::InvalidRequest(vec![RequestFault::new(
                RequestFaultKind::UnknownAlgorithm,
                format!(
                    "unknown algorithm '{name}', registered: {}",
                    self.names().join(", ")
                ),
            )])
        })
    }

    /// Validates and runs a request with the strategy it names.
    pub fn run(
        &self,
        request: &OptimizationRequest,
        handle: &RunHandle,
    ) -> Result<RosterPlan, OptimizeError> {
        let optimizer = self.resolve(&request.algorithm)?;
        optimizer.validate(request)?;
        optimizer.optimize(request, handle)
    }
}

impl Default for OptimizerRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

// ==== Shared run preparation ====

/// Everything a strategy needs before its first generation.
pub(crate) struct Prepared {
    pub config: EngineConfig,
    pub snapshot: RosterSnapshot,
    /// Set when the relaxation pre-pass trimmed the demand:
    /// (joined sign labels, dropped task ids).
    pub relaxation: Option<(String, Vec<String>)>,
}

/// Builds the engine configuration and snapshot for a request and runs
/// the relaxation pre-pass.
///
/// The request-level budget and parallel flag override the parameter
/// bag. Cross-parameter configuration faults (values individually in
/// bounds but inconsistent together) surface here as invalid-request
/// errors, still before any generation runs.
pub(crate) fn prepare(request: &OptimizationRequest) -> Result<Prepared, OptimizeError> {
    let mut config = EngineConfig::from_params(&request.params);
    if let Some(budget) = request.time_budget_ms {
        config = config.with_time_limit_ms(budget);
    }
    config = config.with_parallel(request.parallel);
    if let Err(message) = config.validate() {
        return Err(OptimizeError::InvalidRequest(vec![RequestFault::new(
            RequestFaultKind::InvalidParameter,
            message,
        )]));
    }

    let Some(snapshot) = request.snapshot() else {
        return Err(OptimizeError::InvalidRequest(vec![RequestFault::new(
            RequestFaultKind::InvalidDateRange,
            "start and end dates are required",
        )]));
    };

    let (signs, relaxed) = {
        let engine = RelaxationEngine::new(&snapshot);
        let signs = engine.check();
        let relaxed = if signs.is_empty() {
            None
        } else {
            Some(engine.relax())
        };
        (signs, relaxed)
    };
    let (snapshot, relaxation) = match relaxed {
        Some(result) => {
            let labels = signs
                .iter()
                .map(|s| s.label())
                .collect::<Vec<_>>()
                .join("; ");
            (result.snapshot, Some((labels, result.dropped)))
        }
        None => (snapshot, None),
    };

    Ok(Prepared {
        config,
        snapshot,
        relaxation,
    })
}

/// Writes the relaxation annotations shared by every strategy.
pub(crate) fn tag_relaxation(plan: &mut RosterPlan, relaxation: &Option<(String, Vec<String>)>) {
    if let Some((labels, dropped)) = relaxation {
        plan.set_metadata("relaxation", format!("applied: {labels}"));
        plan.set_metadata("relaxationDroppedTasks", dropped.join(", "));
    }
}

/// Rough microsecond cost of scoring one chromosome, derived from the
/// problem dimensions. Feeds the runtime estimates.
pub(crate) fn evaluation_cost_us(request: &OptimizationRequest) -> u64 {
    let staff = request.staff.iter().filter(|s| s.active).count().max(1) as u64;
    let tasks = request.tasks.len().max(1) as u64;
    let days = request
        .horizon()
        .map(|range| range.num_days().max(1) as u64)
        .unwrap_or(7);
    staff * days * tasks / 40 + 5
}

// ==== Shared plan finalization ====

/// Decodes the winning chromosome into a plan with violation counts,
/// fitness and quality statistics filled in. `None` produces an empty
/// plan over the horizon, used when a run was cancelled before any
/// result existed.
pub(crate) fn finalize_plan(
    snapshot: &RosterSnapshot,
    algorithm: &str,
    best: Option<&Chromosome>,
) -> RosterPlan {
    let mut plan = match best {
        Some(chromosome) => {
            let mut plan = PlanDecoder::new(snapshot).decode(chromosome);
            plan.fitness = chromosome.fitness().unwrap_or(0.0);
            plan
        }
        None => {
            let mut plan = RosterPlan::draft(snapshot.range, "");
            plan.unassigned_tasks = snapshot.tasks.iter().map(|t| t.id.clone()).collect();
            plan
        }
    };
    plan.algorithm = algorithm.to_string();
    plan.id = uuid::Uuid::new_v4().to_string();

    let report = ConstraintEvaluator::new(snapshot).evaluate(&plan);
    plan.hard_violations = report.hard_count;
    plan.soft_violations = report.soft_count;

    let metrics = PlanMetrics::compute(&plan, snapshot, FitnessWeights::balanced().min_hours_floor);
    plan.set_statistic("coverage", metrics.coverage);
    plan.set_statistic("fairness", metrics.fairness);
    plan.set_statistic("utilization", metrics.utilization);
    plan.set_statistic("prioritySatisfaction", metrics.priority_satisfaction);
    plan.set_statistic("patternCompliance", metrics.pattern_compliance);
    plan.set_statistic("efficiency", metrics.efficiency);

    let assigned = plan.assigned_task_count() as f64;
    let unassigned = plan.unassigned_tasks.len() as f64;
    plan.set_statistic("assignedTasks", assigned);
    plan.set_statistic("unassignedTasks", unassigned);
    let total_hours: f64 = metrics.staff_hours.iter().sum();
    plan.set_statistic("totalHours", total_hours);
    if !metrics.staff_hours.is_empty() {
        plan.set_statistic("meanHoursPerStaff", total_hours / metrics.staff_hours.len() as f64);
    }
    plan
}
