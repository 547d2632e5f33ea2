//! Constraint model.
//!
//! A constraint pairs a named rule with a kind (hard or soft), a default
//! numeric value, and optional per-staff overrides. The evaluator always
//! asks for the *effective value* of a (staff, constraint) pair: the
//! override wins when present, otherwise the default applies.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Constraint kind.
///
/// Hard constraints gate feasibility; soft constraints only cost penalty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstraintKind {
    /// Must hold for the plan to be feasible.
    Hard,
    /// Violation is penalized but does not block feasibility.
    Soft,
}

/// Named roster rules the evaluator understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstraintRule {
    /// Total working hours per calendar week must not exceed the value.
    MaxWeeklyHours,
    /// Consecutive working days must not exceed the value.
    MaxConsecutiveWorkDays,
    /// Rest between the end of one shift and the start of the next must
    /// be at least the value, in hours.
    MinRestHours,
    /// Night shifts per calendar week must not exceed the value.
    MaxNightShiftsPerWeek,
    /// Days off per calendar week must be at least the value.
    MinWeeklyRestDays,
    /// Every task assignee must hold the task's required qualifications.
    /// The value is ignored.
    RequiredQualifications,
    /// Every task assignee must belong to the task's department.
    /// The value is ignored.
    DepartmentMatch,
    /// Every task in the snapshot must be assigned. The value is ignored.
    /// Without this rule, coverage is rewarded by fitness but not
    /// enforced.
    FullTaskCoverage,
}

impl ConstraintRule {
    /// Stable rule name for violation descriptions and metadata.
    pub fn name(&self) -> &'static str {
        match self {
            Self::MaxWeeklyHours => "max-weekly-hours",
            Self::MaxConsecutiveWorkDays => "max-consecutive-work-days",
            Self::MinRestHours => "min-rest-hours",
            Self::MaxNightShiftsPerWeek => "max-night-shifts-per-week",
            Self::MinWeeklyRestDays => "min-weekly-rest-days",
            Self::RequiredQualifications => "required-qualifications",
            Self::DepartmentMatch => "department-match",
            Self::FullTaskCoverage => "full-task-coverage",
        }
    }
}

/// One configured constraint with per-staff overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstraintDef {
    /// The rule being configured.
    pub rule: ConstraintRule,
    /// Hard or soft.
    pub kind: ConstraintKind,
    /// Default numeric value; meaning depends on the rule.
    pub value: f64,
    /// Per-staff overrides keyed by staff id.
    pub overrides: HashMap<String, f64>,
    /// Penalty weight charged per violation.
    pub weight: f64,
}

impl ConstraintDef {
    /// Creates a hard constraint with the default weight for its kind.
    pub fn hard(rule: ConstraintRule, value: f64) -> Self {
        Self {
            rule,
            kind: ConstraintKind::Hard,
            value,
            overrides: HashMap::new(),
            weight: 100.0,
        }
    }

    /// Creates a soft constraint with the default weight for its kind.
    pub fn soft(rule: ConstraintRule, value: f64) -> Self {
        Self {
            rule,
            kind: ConstraintKind::Soft,
            value,
            overrides: HashMap::new(),
            weight: 10.0,
        }
    }

    /// Sets the penalty weight.
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Adds a per-staff override.
    pub fn with_override(mut self, staff_id: impl Into<String>, value: f64) -> Self {
        self.overrides.insert(staff_id.into(), value);
        self
    }

    /// Resolves the value that applies to a given staff member.
    pub fn effective_value(&self, staff_id: &str) -> f64 {
        self.overrides.get(staff_id).copied().unwrap_or(self.value)
    }

    /// Whether this constraint gates feasibility.
    pub fn is_hard(&self) -> bool {
        self.kind == ConstraintKind::Hard
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_value_override_wins() {
        let c = ConstraintDef::hard(ConstraintRule::MaxWeeklyHours, 40.0)
            .with_override("S1", 20.0);

        assert!((c.effective_value("S1") - 20.0).abs() < 1e-9);
        assert!((c.effective_value("S2") - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_kind_defaults() {
        let hard = ConstraintDef::hard(ConstraintRule::MinRestHours, 11.0);
        let soft = ConstraintDef::soft(ConstraintRule::MinWeeklyRestDays, 1.0);

        assert!(hard.is_hard());
        assert!(!soft.is_hard());
        assert!(hard.weight > soft.weight);
    }

    #[test]
    fn test_rule_names_are_stable() {
        assert_eq!(ConstraintRule::MaxWeeklyHours.name(), "max-weekly-hours");
        assert_eq!(ConstraintRule::FullTaskCoverage.name(), "full-task-coverage");
    }
}
