//! Multi-profile fitness calculation.
//!
//! A chromosome is scored by decoding it to a plan, running the
//! constraint evaluator, and folding violations and quality metrics
//! into one scalar under a weight profile. Fitness is maximized.
//!
//! Three island profiles exist: constraint-focused (steep hard
//! penalties, large feasibility bonus), balanced (all rewards open
//! regardless of feasibility), and quality-focused (quality rewards
//! gated on feasibility, quadratic coverage). The two-phase strategy
//! carries its own weight sets. All constants are tuning knobs; tests
//! assert direction, not values.

use crate::genome::Chromosome;
use crate::model::{RosterPlan, RosterSnapshot};

use super::decoder::PlanDecoder;
use super::violations::{ConstraintEvaluator, EvaluationReport};

/// Island fitness emphases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FitnessProfile {
    /// Drive hard violations to zero first.
    ConstraintFocused,
    /// Default profile; every reward stays open.
    Balanced,
    /// Polish feasible plans; quality rewards gated on feasibility.
    QualityFocused,
}

impl FitnessProfile {
    /// Stable profile name for statistics keys.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ConstraintFocused => "constraint-focused",
            Self::Balanced => "balanced",
            Self::QualityFocused => "quality-focused",
        }
    }

    /// The island weight set for this profile.
    pub fn weights(&self) -> FitnessWeights {
        match self {
            Self::ConstraintFocused => FitnessWeights::constraint_focused(),
            Self::Balanced => FitnessWeights::balanced(),
            Self::QualityFocused => FitnessWeights::quality_focused(),
        }
    }

    /// Multiplier applied to the configured mutation rate.
    ///
    /// Constraint islands explore harder, quality islands exploit.
    pub fn mutation_rate_factor(&self) -> f64 {
        match self {
            Self::ConstraintFocused => 2.0,
            Self::Balanced => 1.0,
            Self::QualityFocused => 0.5,
        }
    }

    /// Multiplier applied to the configured elite rate.
    pub fn elite_rate_factor(&self) -> f64 {
        match self {
            Self::ConstraintFocused => 0.5,
            Self::Balanced => 1.0,
            Self::QualityFocused => 1.5,
        }
    }
}

/// Tunable weight set for one fitness formula.
#[derive(Debug, Clone)]
pub struct FitnessWeights {
    /// Flat base score.
    pub base: f64,
    /// Penalty per hard violation.
    pub hard_penalty: f64,
    /// Multiplier on the weighted soft-penalty total.
    pub soft_scale: f64,
    /// Flat bonus once no hard violation remains.
    pub feasible_bonus: f64,
    /// Reward weight on the coverage rate.
    pub coverage_weight: f64,
    /// Square the coverage rate before weighting.
    pub quadratic_coverage: bool,
    /// Open quality rewards only for feasible plans.
    pub quality_gated: bool,
    /// Reward weight on workload fairness.
    pub fairness_weight: f64,
    /// Reward weight on the minimum-hours utilization fraction.
    pub utilization_weight: f64,
    /// Reward weight on working-pattern compliance.
    pub pattern_weight: f64,
    /// Reward weight on priority satisfaction.
    pub priority_weight: f64,
    /// Reward weight on task-hours-per-worked-hours efficiency.
    pub efficiency_weight: f64,
    /// Penalty per unit of inverse-priority-weighted unassigned burden.
    pub unassigned_penalty: f64,
    /// Total-hours floor used by utilization and underwork.
    pub min_hours_floor: f64,
    /// Penalty weight on the badly-underworked staff fraction.
    pub underwork_penalty: f64,
    /// Penalty weight on extreme workload imbalance.
    pub imbalance_penalty: f64,
}

impl FitnessWeights {
    /// Island weights: constraint-focused.
    pub fn constraint_focused() -> Self {
        Self {
            base: 1000.0,
            hard_penalty: 1000.0,
            soft_scale: 1.0,
            feasible_bonus: 500.0,
            coverage_weight: 200.0,
            quadratic_coverage: false,
            quality_gated: false,
            fairness_weight: 100.0,
            utilization_weight: 0.0,
            pattern_weight: 0.0,
            priority_weight: 0.0,
            efficiency_weight: 0.0,
            unassigned_penalty: 50.0,
            min_hours_floor: 20.0,
            underwork_penalty: 0.0,
            imbalance_penalty: 0.0,
        }
    }

    /// Island weights: balanced.
    pub fn balanced() -> Self {
        Self {
            base: 1000.0,
            hard_penalty: 1500.0,
            soft_scale: 3.0,
            feasible_bonus: 200.0,
            coverage_weight: 300.0,
            quadratic_coverage: false,
            quality_gated: false,
            fairness_weight: 150.0,
            utilization_weight: 100.0,
            pattern_weight: 50.0,
            priority_weight: 100.0,
            efficiency_weight: 50.0,
            unassigned_penalty: 30.0,
            min_hours_floor: 20.0,
            underwork_penalty: 0.0,
            imbalance_penalty: 0.0,
        }
    }

    /// Island weights: quality-focused.
    pub fn quality_focused() -> Self {
        Self {
            base: 500.0,
            hard_penalty: 2000.0,
            soft_scale: 2.0,
            feasible_bonus: 0.0,
            coverage_weight: 400.0,
            quadratic_coverage: true,
            quality_gated: true,
            fairness_weight: 200.0,
            utilization_weight: 150.0,
            pattern_weight: 100.0,
            priority_weight: 150.0,
            efficiency_weight: 100.0,
            unassigned_penalty: 0.0,
            min_hours_floor: 20.0,
            underwork_penalty: 100.0,
            imbalance_penalty: 100.0,
        }
    }

    /// Two-phase weights: feasibility phase.
    pub fn two_phase_constraint() -> Self {
        Self {
            base: 1000.0,
            hard_penalty: 1200.0,
            soft_scale: 1.5,
            feasible_bonus: 600.0,
            coverage_weight: 150.0,
            quadratic_coverage: false,
            quality_gated: false,
            fairness_weight: 80.0,
            utilization_weight: 0.0,
            pattern_weight: 0.0,
            priority_weight: 0.0,
            efficiency_weight: 0.0,
            unassigned_penalty: 60.0,
            min_hours_floor: 20.0,
            underwork_penalty: 0.0,
            imbalance_penalty: 0.0,
        }
    }

    /// Two-phase weights: polish phase.
    pub fn two_phase_quality() -> Self {
        Self {
            base: 500.0,
            hard_penalty: 1800.0,
            soft_scale: 2.5,
            feasible_bonus: 0.0,
            coverage_weight: 350.0,
            quadratic_coverage: true,
            quality_gated: true,
            fairness_weight: 180.0,
            utilization_weight: 120.0,
            pattern_weight: 80.0,
            priority_weight: 120.0,
            efficiency_weight: 80.0,
            unassigned_penalty: 0.0,
            min_hours_floor: 20.0,
            underwork_penalty: 80.0,
            imbalance_penalty: 80.0,
        }
    }
}

/// Coefficient-of-variation fairness: `max(0, 1 - stddev/mean)`.
///
/// An empty or all-zero series counts as perfectly fair.
pub fn fairness(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 1.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    if mean.abs() < 1e-12 {
        return 1.0;
    }
    let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    (1.0 - variance.sqrt() / mean).max(0.0)
}

/// Quality metrics shared by every fitness profile.
#[derive(Debug, Clone)]
pub struct PlanMetrics {
    /// Assigned tasks over total tasks; 1.0 with no tasks.
    pub coverage: f64,
    /// Workload fairness over per-staff hours.
    pub fairness: f64,
    /// Fraction of planned staff at or above the hours floor.
    pub utilization: f64,
    /// Fraction of assignments matching the staff working pattern.
    pub pattern_compliance: f64,
    /// Inverse-priority-weighted fraction of covered task importance.
    pub priority_satisfaction: f64,
    /// Assigned task hours over total worked hours.
    pub efficiency: f64,
    /// Fraction of planned staff far below the hours floor.
    pub underwork_fraction: f64,
    /// Total worked hours per planned staff member.
    pub staff_hours: Vec<f64>,
}

impl PlanMetrics {
    /// Computes every metric for a plan.
    pub fn compute(plan: &RosterPlan, snapshot: &RosterSnapshot, min_hours_floor: f64) -> Self {
        let total_tasks = snapshot.tasks.len();
        let assigned_count = plan.assigned_task_count();
        let coverage = if total_tasks == 0 {
            1.0
        } else {
            assigned_count as f64 / total_tasks as f64
        };

        let mut staff_hours = vec![0.0; snapshot.planned_staff().len()];
        let mut pos_of_staff = std::collections::HashMap::new();
        for (pos, &idx) in snapshot.planned_staff().iter().enumerate() {
            pos_of_staff.insert(snapshot.staff[idx].id.as_str(), pos);
        }

        let mut worked_hours = 0.0;
        let mut task_hours = 0.0;
        let mut compliant = 0usize;
        let mut importance_covered = 0.0;
        for a in &plan.assignments {
            let Some(shift_idx) = snapshot.shift_index(&a.shift_id) else {
                continue;
            };
            let shift = &snapshot.shifts[shift_idx];
            let hours = shift.duration_hours();
            worked_hours += hours;
            if let Some(&pos) = pos_of_staff.get(a.staff_id.as_str()) {
                staff_hours[pos] += hours;
            }

            let pattern_ok = match snapshot.staff_index(&a.staff_id) {
                Some(staff_idx) => {
                    let staff = &snapshot.staff[staff_idx];
                    match (&staff.working_pattern, &shift.working_period) {
                        (Some(pattern), Some(period)) => pattern == period,
                        _ => true,
                    }
                }
                None => true,
            };
            if pattern_ok {
                compliant += 1;
            }

            for task_id in &a.task_ids {
                if let Some(task_idx) = snapshot.task_index(task_id) {
                    let task = &snapshot.tasks[task_idx];
                    task_hours += task.duration_hours();
                    importance_covered += 1.0 / task.priority as f64;
                }
            }
        }

        let total_importance: f64 = snapshot
            .tasks
            .iter()
            .map(|t| 1.0 / t.priority as f64)
            .sum();
        let priority_satisfaction = if total_importance < 1e-12 {
            1.0
        } else {
            (importance_covered / total_importance).min(1.0)
        };

        let pattern_compliance = if plan.assignments.is_empty() {
            1.0
        } else {
            compliant as f64 / plan.assignments.len() as f64
        };

        let efficiency = if worked_hours < 1e-12 {
            0.0
        } else {
            (task_hours / worked_hours).min(1.0)
        };

        let n_staff = staff_hours.len();
        let utilization = if n_staff == 0 {
            0.0
        } else {
            staff_hours.iter().filter(|&&h| h >= min_hours_floor).count() as f64 / n_staff as f64
        };
        let underwork_fraction = if n_staff == 0 {
            0.0
        } else {
            staff_hours
                .iter()
                .filter(|&&h| h < min_hours_floor * 0.5)
                .count() as f64
                / n_staff as f64
        };

        Self {
            coverage,
            fairness: fairness(&staff_hours),
            utilization,
            pattern_compliance,
            priority_satisfaction,
            efficiency,
            underwork_fraction,
            staff_hours,
        }
    }
}

/// Scores chromosomes of one snapshot under one weight set.
pub struct FitnessCalculator<'a> {
    snapshot: &'a RosterSnapshot,
    weights: FitnessWeights,
}

impl<'a> FitnessCalculator<'a> {
    /// Creates a calculator with a profile's island weights.
    pub fn new(snapshot: &'a RosterSnapshot, profile: FitnessProfile) -> Self {
        Self::with_weights(snapshot, profile.weights())
    }

    /// Creates a calculator with an explicit weight set.
    pub fn with_weights(snapshot: &'a RosterSnapshot, weights: FitnessWeights) -> Self {
        Self { snapshot, weights }
    }

    /// The weight set in use.
    pub fn weights(&self) -> &FitnessWeights {
        &self.weights
    }

    /// Decodes, evaluates, and scores a chromosome.
    pub fn evaluate(&self, chromosome: &Chromosome) -> f64 {
        let (plan, report) = self.decode_and_report(chromosome);
        self.score(&plan, &report)
    }

    /// Decoded plan and constraint report for a chromosome.
    pub fn decode_and_report(&self, chromosome: &Chromosome) -> (RosterPlan, EvaluationReport) {
        let plan = PlanDecoder::new(self.snapshot).decode(chromosome);
        let report = ConstraintEvaluator::new(self.snapshot).evaluate(&plan);
        (plan, report)
    }

    /// Folds a plan and its report into one scalar.
    pub fn score(&self, plan: &RosterPlan, report: &EvaluationReport) -> f64 {
        let w = &self.weights;
        let metrics = PlanMetrics::compute(plan, self.snapshot, w.min_hours_floor);

        let mut score = w.base
            - w.hard_penalty * report.hard_count as f64
            - w.soft_scale * report.soft_penalty
            - w.unassigned_penalty * self.unassigned_burden(plan);

        if report.is_feasible() {
            score += w.feasible_bonus;
        }

        if !w.quality_gated || report.is_feasible() {
            let coverage = if w.quadratic_coverage {
                metrics.coverage * metrics.coverage
            } else {
                metrics.coverage
            };
            score += w.coverage_weight * coverage
                + w.fairness_weight * metrics.fairness
                + w.utilization_weight * metrics.utilization
                + w.pattern_weight * metrics.pattern_compliance
                + w.priority_weight * metrics.priority_satisfaction
                + w.efficiency_weight * metrics.efficiency;
            score -= w.underwork_penalty * metrics.underwork_fraction;
            let extreme_imbalance = ((1.0 - metrics.fairness) - 0.5).max(0.0) * 2.0;
            score -= w.imbalance_penalty * extreme_imbalance;
        }

        score
    }

    /// Inverse-priority-weighted unassigned burden.
    fn unassigned_burden(&self, plan: &RosterPlan) -> f64 {
        plan.unassigned_tasks
            .iter()
            .filter_map(|id| self.snapshot.task_index(id))
            .map(|idx| 1.0 / self.snapshot.tasks[idx].priority as f64)
            .sum()
    }
}
