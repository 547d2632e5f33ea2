//! Constraint evaluation over roster plans.
//!
//! The evaluator walks every configured constraint, resolves the
//! effective value per staff member (override wins over default), and
//! emits one [`Violation`] per broken rule instance. Feasibility is
//! exactly "zero hard violations". An early-termination mode answers
//! only the feasibility question and stops at the first hard hit.
//!
//! Weekly rules group by ISO week. Partial weeks at the horizon edges
//! are skipped by the minimum-rest-days rule, which would otherwise
//! flag staff for days outside the plan.

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime};
use std::collections::BTreeMap;

use crate::model::{
    ConstraintDef, ConstraintKind, ConstraintRule, RosterAssignment, RosterPlan, RosterSnapshot,
};

/// Tolerance for floating-point hour comparisons.
const HOURS_EPSILON: f64 = 1e-9;

/// One broken rule instance.
#[derive(Debug, Clone)]
pub struct Violation {
    /// The rule that was broken.
    pub rule: ConstraintRule,
    /// Hard or soft.
    pub kind: ConstraintKind,
    /// Offending staff member, when attributable.
    pub staff_id: Option<String>,
    /// Offending date, when attributable.
    pub date: Option<NaiveDate>,
    /// Human-readable description.
    pub description: String,
    /// Penalty charged for this instance.
    pub penalty: f64,
}

impl Violation {
    fn new(def: &ConstraintDef, description: String) -> Self {
        Self {
            rule: def.rule,
            kind: def.kind,
            staff_id: None,
            date: None,
            description,
            penalty: def.weight,
        }
    }

    fn for_staff(mut self, staff_id: &str) -> Self {
        self.staff_id = Some(staff_id.to_string());
        self
    }

    fn on_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }
}

/// Aggregated evaluation result for one plan.
#[derive(Debug, Clone, Default)]
pub struct EvaluationReport {
    /// Every violation found.
    pub violations: Vec<Violation>,
    /// Number of hard violations.
    pub hard_count: usize,
    /// Number of soft violations.
    pub soft_count: usize,
    /// Summed hard penalties.
    pub hard_penalty: f64,
    /// Summed soft penalties.
    pub soft_penalty: f64,
}

impl EvaluationReport {
    fn from_violations(violations: Vec<Violation>) -> Self {
        let mut report = Self {
            violations,
            ..Self::default()
        };
        for v in &report.violations {
            match v.kind {
                ConstraintKind::Hard => {
                    report.hard_count += 1;
                    report.hard_penalty += v.penalty;
                }
                ConstraintKind::Soft => {
                    report.soft_count += 1;
                    report.soft_penalty += v.penalty;
                }
            }
        }
        report
    }

    /// Whether the plan satisfies every hard constraint.
    pub fn is_feasible(&self) -> bool {
        self.hard_count == 0
    }
}

/// Evaluates plans against a snapshot's constraints.
pub struct ConstraintEvaluator<'a> {
    snapshot: &'a RosterSnapshot,
}

impl<'a> ConstraintEvaluator<'a> {
    /// Creates an evaluator over a snapshot.
    pub fn new(snapshot: &'a RosterSnapshot) -> Self {
        Self { snapshot }
    }

    /// Checks every constraint and aggregates the violations.
    pub fn evaluate(&self, plan: &RosterPlan) -> EvaluationReport {
        let by_staff = self.assignments_by_staff(plan);
        let mut violations = Vec::new();
        for def in &self.snapshot.constraints {
            violations.extend(self.check(def, plan, &by_staff));
        }
        EvaluationReport::from_violations(violations)
    }

    /// Whether the plan breaks any hard constraint.
    ///
    /// Stops at the first offending constraint; use when only the
    /// feasibility bit matters.
    pub fn has_hard_violation(&self, plan: &RosterPlan) -> bool {
        let by_staff = self.assignments_by_staff(plan);
        self.snapshot
            .constraints
            .iter()
            .filter(|def| def.is_hard())
            .any(|def| !self.check(def, plan, &by_staff).is_empty())
    }

    fn check(
        &self,
        def: &ConstraintDef,
        plan: &RosterPlan,
        by_staff: &BTreeMap<String, Vec<&RosterAssignment>>,
    ) -> Vec<Violation> {
        match def.rule {
            ConstraintRule::MaxWeeklyHours => self.check_weekly_hours(def, by_staff),
            ConstraintRule::MaxConsecutiveWorkDays => self.check_consecutive_days(def, by_staff),
            ConstraintRule::MinRestHours => self.check_rest_hours(def, by_staff),
            ConstraintRule::MaxNightShiftsPerWeek => self.check_night_shifts(def, by_staff),
            ConstraintRule::MinWeeklyRestDays => self.check_weekly_rest_days(def, by_staff),
            ConstraintRule::RequiredQualifications => self.check_qualifications(def, plan),
            ConstraintRule::DepartmentMatch => self.check_departments(def, plan),
            ConstraintRule::FullTaskCoverage => self.check_coverage(def, plan),
        }
    }

    /// Groups assignment rows per staff member, date-sorted.
    fn assignments_by_staff<'p>(
        &self,
        plan: &'p RosterPlan,
    ) -> BTreeMap<String, Vec<&'p RosterAssignment>> {
        let mut by_staff: BTreeMap<String, Vec<&RosterAssignment>> = BTreeMap::new();
        for assignment in &plan.assignments {
            by_staff
                .entry(assignment.staff_id.clone())
                .or_default()
                .push(assignment);
        }
        for rows in by_staff.values_mut() {
            rows.sort_by_key(|a| a.date);
        }
        by_staff
    }

    fn shift_hours(&self, shift_id: &str) -> f64 {
        self.snapshot
            .shift_index(shift_id)
            .map(|i| self.snapshot.shifts[i].duration_hours())
            .unwrap_or(0.0)
    }

    fn is_night_shift(&self, shift_id: &str) -> bool {
        self.snapshot
            .shift_index(shift_id)
            .map(|i| self.snapshot.shifts[i].night)
            .unwrap_or(false)
    }

    /// Start and end instants of an assignment, end on the next day for
    /// shifts that cross midnight.
    fn shift_bounds(&self, assignment: &RosterAssignment) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let idx = self.snapshot.shift_index(&assignment.shift_id)?;
        let shift = &self.snapshot.shifts[idx];
        let start = assignment.date.and_time(shift.start);
        let end_date = if shift.crosses_midnight() {
            assignment.date + Days::new(1)
        } else {
            assignment.date
        };
        Some((start, end_date.and_time(shift.end)))
    }

    fn week_of(date: NaiveDate) -> (i32, u32) {
        let iso = date.iso_week();
        (iso.year(), iso.week())
    }

    fn check_weekly_hours(
        &self,
        def: &ConstraintDef,
        by_staff: &BTreeMap<String, Vec<&RosterAssignment>>,
    ) -> Vec<Violation> {
        let mut violations = Vec::new();
        for (staff_id, rows) in by_staff {
            let limit = def.effective_value(staff_id);
            let mut weekly: BTreeMap<(i32, u32), f64> = BTreeMap::new();
            for a in rows {
                *weekly.entry(Self::week_of(a.date)).or_insert(0.0) +=
                    self.shift_hours(&a.shift_id);
            }
            for ((year, week), hours) in weekly {
                if hours > limit + HOURS_EPSILON {
                    violations.push(
                        Violation::new(
                            def,
                            format!(
                                "{staff_id} works {hours:.1}h in week {week}/{year}, limit {limit:.1}h"
                            ),
                        )
                        .for_staff(staff_id),
                    );
                }
            }
        }
        violations
    }

    fn check_consecutive_days(
        &self,
        def: &ConstraintDef,
        by_staff: &BTreeMap<String, Vec<&RosterAssignment>>,
    ) -> Vec<Violation> {
        let mut violations = Vec::new();
        for (staff_id, rows) in by_staff {
            let limit = def.effective_value(staff_id);
            let mut run_start: Option<NaiveDate> = None;
            let mut run_len = 0i64;
            let mut prev: Option<NaiveDate> = None;

            let mut flush = |start: Option<NaiveDate>, len: i64, out: &mut Vec<Violation>| {
                if let Some(start) = start {
                    if (len as f64) > limit {
                        out.push(
                            Violation::new(
                                def,
                                format!(
                                    "{staff_id} works {len} consecutive days from {start}, limit {limit:.0}"
                                ),
                            )
                            .for_staff(staff_id)
                            .on_date(start),
                        );
                    }
                }
            };

            for a in rows {
                match prev {
                    Some(p) if (a.date - p).num_days() == 1 => run_len += 1,
                    _ => {
                        flush(run_start, run_len, &mut violations);
                        run_start = Some(a.date);
                        run_len = 1;
                    }
                }
                prev = Some(a.date);
            }
            flush(run_start, run_len, &mut violations);
        }
        violations
    }

    fn check_rest_hours(
        &self,
        def: &ConstraintDef,
        by_staff: &BTreeMap<String, Vec<&RosterAssignment>>,
    ) -> Vec<Violation> {
        let mut violations = Vec::new();
        for (staff_id, rows) in by_staff {
            let limit = def.effective_value(staff_id);
            for pair in rows.windows(2) {
                let (Some((_, prev_end)), Some((next_start, _))) =
                    (self.shift_bounds(pair[0]), self.shift_bounds(pair[1]))
                else {
                    continue;
                };
                let rest = (next_start - prev_end).num_minutes() as f64 / 60.0;
                if rest < limit - HOURS_EPSILON {
                    violations.push(
                        Violation::new(
                            def,
                            format!(
                                "{staff_id} rests {rest:.1}h before {}, minimum {limit:.1}h",
                                pair[1].date
                            ),
                        )
                        .for_staff(staff_id)
                        .on_date(pair[1].date),
                    );
                }
            }
        }
        violations
    }

    fn check_night_shifts(
        &self,
        def: &ConstraintDef,
        by_staff: &BTreeMap<String, Vec<&RosterAssignment>>,
    ) -> Vec<Violation> {
        let mut violations = Vec::new();
        for (staff_id, rows) in by_staff {
            let limit = def.effective_value(staff_id);
            let mut weekly: BTreeMap<(i32, u32), usize> = BTreeMap::new();
            for a in rows {
                if self.is_night_shift(&a.shift_id) {
                    *weekly.entry(Self::week_of(a.date)).or_insert(0) += 1;
                }
            }
            for ((year, week), count) in weekly {
                if (count as f64) > limit {
                    violations.push(
                        Violation::new(
                            def,
                            format!(
                                "{staff_id} has {count} night shifts in week {week}/{year}, limit {limit:.0}"
                            ),
                        )
                        .for_staff(staff_id),
                    );
                }
            }
        }
        violations
    }

    fn check_weekly_rest_days(
        &self,
        def: &ConstraintDef,
        by_staff: &BTreeMap<String, Vec<&RosterAssignment>>,
    ) -> Vec<Violation> {
        // Only weeks fully inside the horizon are checked.
        let mut week_days: BTreeMap<(i32, u32), usize> = BTreeMap::new();
        for &d in self.snapshot.dates() {
            *week_days.entry(Self::week_of(d)).or_insert(0) += 1;
        }
        let full_weeks: Vec<(i32, u32)> = week_days
            .into_iter()
            .filter(|&(_, days)| days == 7)
            .map(|(week, _)| week)
            .collect();
        if full_weeks.is_empty() {
            return Vec::new();
        }

        let mut violations = Vec::new();
        for (staff_id, rows) in by_staff {
            let limit = def.effective_value(staff_id);
            let mut worked: BTreeMap<(i32, u32), usize> = BTreeMap::new();
            for a in rows {
                *worked.entry(Self::week_of(a.date)).or_insert(0) += 1;
            }
            for &(year, week) in &full_weeks {
                let rest = 7 - worked.get(&(year, week)).copied().unwrap_or(0).min(7);
                if (rest as f64) < limit {
                    violations.push(
                        Violation::new(
                            def,
                            format!(
                                "{staff_id} has {rest} rest days in week {week}/{year}, minimum {limit:.0}"
                            ),
                        )
                        .for_staff(staff_id),
                    );
                }
            }
        }
        violations
    }

    fn check_qualifications(&self, def: &ConstraintDef, plan: &RosterPlan) -> Vec<Violation> {
        let mut violations = Vec::new();
        for a in &plan.assignments {
            let Some(staff_idx) = self.snapshot.staff_index(&a.staff_id) else {
                continue;
            };
            let staff = &self.snapshot.staff[staff_idx];
            for task_id in &a.task_ids {
                let Some(task_idx) = self.snapshot.task_index(task_id) else {
                    continue;
                };
                let task = &self.snapshot.tasks[task_idx];
                if !staff.holds_all(&task.required_qualifications) {
                    violations.push(
                        Violation::new(
                            def,
                            format!(
                                "{} lacks a qualification required by task {task_id}",
                                a.staff_id
                            ),
                        )
                        .for_staff(&a.staff_id)
                        .on_date(a.date),
                    );
                }
            }
        }
        violations
    }

    fn check_departments(&self, def: &ConstraintDef, plan: &RosterPlan) -> Vec<Violation> {
        let mut violations = Vec::new();
        for a in &plan.assignments {
            let Some(staff_idx) = self.snapshot.staff_index(&a.staff_id) else {
                continue;
            };
            let staff = &self.snapshot.staff[staff_idx];
            for task_id in &a.task_ids {
                let Some(task_idx) = self.snapshot.task_index(task_id) else {
                    continue;
                };
                let task = &self.snapshot.tasks[task_idx];
                if staff.department != task.department {
                    violations.push(
                        Violation::new(
                            def,
                            format!(
                                "{} ({}) assigned task {task_id} of department {}",
                                a.staff_id, staff.department, task.department
                            ),
                        )
                        .for_staff(&a.staff_id)
                        .on_date(a.date),
                    );
                }
            }
        }
        violations
    }

    fn check_coverage(&self, def: &ConstraintDef, plan: &RosterPlan) -> Vec<Violation> {
        plan.unassigned_tasks
            .iter()
            .map(|task_id| Violation::new(def, format!("task {task_id} is not assigned")))
            .collect()
    }
}
