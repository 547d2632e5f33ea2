//! Optimization request and algorithm parameter bag.
//!
//! The surrounding service assembles an [`OptimizationRequest`] from its
//! records and hands it to an optimizer. Algorithm parameters travel as
//! a loosely typed bag; each algorithm publishes a
//! [`ParameterDescriptor`] list that doubles as UI metadata and as the
//! source of defaults, bounds, and type checks.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{RequestFault, RequestFaultKind};
use crate::model::{ConstraintDef, DateRange, RosterSnapshot, Shift, Staff, Task};

/// Longest supported planning horizon, in days.
pub const MAX_HORIZON_DAYS: i64 = 31;

/// One loosely typed parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Integer parameter (counts, sizes, intervals).
    Int(i64),
    /// Floating-point parameter (rates in 0..=1).
    Float(f64),
    /// Boolean parameter (feature toggles).
    Bool(bool),
}

/// Parameter type tag for descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    Int,
    Float,
    Bool,
}

impl ParamValue {
    /// Integer view. Integral floats coerce.
    pub fn as_int(&self) -> Option<i64> {
        match *self {
            Self::Int(i) => Some(i),
            Self::Float(f) if f.is_finite() && f.fract() == 0.0 => Some(f as i64),
            _ => None,
        }
    }

    /// Floating-point view. Integers coerce.
    pub fn as_float(&self) -> Option<f64> {
        match *self {
            Self::Float(f) => Some(f),
            Self::Int(i) => Some(i as f64),
            Self::Bool(_) => None,
        }
    }

    /// Boolean view. No coercion.
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Self::Bool(b) => Some(b),
            _ => None,
        }
    }
}

/// Metadata for one configurable parameter: its name in the bag, its
/// type, its default, and optional inclusive bounds.
///
/// Descriptor lists are produced by the engine and serialized for UI
/// generation; they are never parsed back.
#[derive(Debug, Clone, Serialize)]
pub struct ParameterDescriptor {
    /// Key in the parameter bag (camelCase, e.g. `populationSize`).
    pub name: &'static str,
    /// Expected type.
    pub kind: ParamKind,
    /// Value used when the bag omits the key.
    pub default: ParamValue,
    /// Inclusive lower bound for numeric parameters.
    pub min: Option<f64>,
    /// Inclusive upper bound for numeric parameters.
    pub max: Option<f64>,
}

impl ParameterDescriptor {
    /// Describes an integer parameter.
    pub fn int(name: &'static str, default: i64, min: i64, max: i64) -> Self {
        Self {
            name,
            kind: ParamKind::Int,
            default: ParamValue::Int(default),
            min: Some(min as f64),
            max: Some(max as f64),
        }
    }

    /// Describes a float parameter.
    pub fn float(name: &'static str, default: f64, min: f64, max: f64) -> Self {
        Self {
            name,
            kind: ParamKind::Float,
            default: ParamValue::Float(default),
            min: Some(min),
            max: Some(max),
        }
    }

    /// Describes a boolean parameter.
    pub fn bool(name: &'static str, default: bool) -> Self {
        Self {
            name,
            kind: ParamKind::Bool,
            default: ParamValue::Bool(default),
            min: None,
            max: None,
        }
    }

    /// Checks a provided value against this descriptor.
    pub fn check(&self, value: &ParamValue) -> Result<(), String> {
        match self.kind {
            ParamKind::Int => {
                let v = value
                    .as_int()
                    .ok_or_else(|| format!("{}: expected an integer", self.name))?;
                self.check_bounds(v as f64)
            }
            ParamKind::Float => {
                let v = value
                    .as_float()
                    .ok_or_else(|| format!("{}: expected a number", self.name))?;
                if !v.is_finite() {
                    return Err(format!("{}: must be finite", self.name));
                }
                self.check_bounds(v)
            }
            ParamKind::Bool => value
                .as_bool()
                .map(|_| ())
                .ok_or_else(|| format!("{}: expected a boolean", self.name)),
        }
    }

    fn check_bounds(&self, v: f64) -> Result<(), String> {
        if let Some(min) = self.min {
            if v < min {
                return Err(format!("{}: {v} is below the minimum {min}", self.name));
            }
        }
        if let Some(max) = self.max {
            if v > max {
                return Err(format!("{}: {v} is above the maximum {max}", self.name));
            }
        }
        Ok(())
    }

    /// Clamps a value into this descriptor's bounds, coercing to the
    /// declared type. Unusable values fall back to the default.
    pub fn clamp(&self, value: &ParamValue) -> ParamValue {
        match self.kind {
            ParamKind::Int => match value.as_int() {
                Some(v) => {
                    let lo = self.min.map(|m| m as i64).unwrap_or(i64::MIN);
                    let hi = self.max.map(|m| m as i64).unwrap_or(i64::MAX);
                    ParamValue::Int(v.clamp(lo, hi))
                }
                None => self.default,
            },
            ParamKind::Float => match value.as_float() {
                Some(v) if v.is_finite() => {
                    let lo = self.min.unwrap_or(f64::NEG_INFINITY);
                    let hi = self.max.unwrap_or(f64::INFINITY);
                    ParamValue::Float(v.clamp(lo, hi))
                }
                _ => self.default,
            },
            ParamKind::Bool => match value.as_bool() {
                Some(v) => ParamValue::Bool(v),
                None => self.default,
            },
        }
    }
}

/// Loosely typed parameter bag keyed by camelCase names.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlgorithmParams {
    values: HashMap<String, ParamValue>,
}

impl AlgorithmParams {
    /// Creates an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a parameter.
    pub fn set(&mut self, name: impl Into<String>, value: ParamValue) -> &mut Self {
        self.values.insert(name.into(), value);
        self
    }

    /// Builder-style set.
    pub fn with(mut self, name: impl Into<String>, value: ParamValue) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    /// Raw value lookup.
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    /// Integer lookup with coercion.
    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.values.get(name).and_then(ParamValue::as_int)
    }

    /// Float lookup with coercion.
    pub fn get_float(&self, name: &str) -> Option<f64> {
        self.values.get(name).and_then(ParamValue::as_float)
    }

    /// Boolean lookup.
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.values.get(name).and_then(ParamValue::as_bool)
    }

    /// Iterates over all entries.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.values.iter()
    }

    /// Whether the bag is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// One optimization request, assembled by the external layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationRequest {
    /// First planned date. Required; validation rejects `None`.
    pub start_date: Option<NaiveDate>,
    /// Last planned date, inclusive. Required; validation rejects `None`.
    pub end_date: Option<NaiveDate>,
    /// Staff records.
    pub staff: Vec<Staff>,
    /// Tasks in the horizon.
    pub tasks: Vec<Task>,
    /// Shift records.
    pub shifts: Vec<Shift>,
    /// Configured constraints.
    pub constraints: Vec<ConstraintDef>,
    /// Name of the algorithm to run.
    pub algorithm: String,
    /// Algorithm parameter bag.
    pub params: AlgorithmParams,
    /// Wall-clock budget for the run, in milliseconds.
    pub time_budget_ms: Option<u64>,
    /// Whether the engine may use worker threads.
    pub parallel: bool,
}

impl OptimizationRequest {
    /// Creates an empty request for an algorithm.
    pub fn new(algorithm: impl Into<String>) -> Self {
        Self {
            start_date: None,
            end_date: None,
            staff: Vec::new(),
            tasks: Vec::new(),
            shifts: Vec::new(),
            constraints: Vec::new(),
            algorithm: algorithm.into(),
            params: AlgorithmParams::new(),
            time_budget_ms: None,
            parallel: true,
        }
    }

    /// Sets the planning horizon.
    pub fn with_range(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start_date = Some(start);
        self.end_date = Some(end);
        self
    }

    /// Sets the staff list.
    pub fn with_staff(mut self, staff: Vec<Staff>) -> Self {
        self.staff = staff;
        self
    }

    /// Sets the task list.
    pub fn with_tasks(mut self, tasks: Vec<Task>) -> Self {
        self.tasks = tasks;
        self
    }

    /// Sets the shift list.
    pub fn with_shifts(mut self, shifts: Vec<Shift>) -> Self {
        self.shifts = shifts;
        self
    }

    /// Sets the constraint list.
    pub fn with_constraints(mut self, constraints: Vec<ConstraintDef>) -> Self {
        self.constraints = constraints;
        self
    }

    /// Sets one algorithm parameter.
    pub fn with_param(mut self, name: impl Into<String>, value: ParamValue) -> Self {
        self.params.set(name, value);
        self
    }

    /// Sets the time budget.
    pub fn with_time_budget_ms(mut self, budget: u64) -> Self {
        self.time_budget_ms = Some(budget);
        self
    }

    /// Disables worker threads for this run.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// The horizon, when both dates are present and ordered.
    pub fn horizon(&self) -> Option<DateRange> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) if start <= end => Some(DateRange::new(start, end)),
            _ => None,
        }
    }

    /// Builds the immutable snapshot this request describes.
    ///
    /// Returns `None` when the horizon is missing or inverted; run
    /// validation first.
    pub fn snapshot(&self) -> Option<RosterSnapshot> {
        let range = self.horizon()?;
        Some(RosterSnapshot::new(
            self.staff.clone(),
            self.tasks.clone(),
            self.shifts.clone(),
            self.constraints.clone(),
            range,
        ))
    }
}

/// Validates a request against structural rules and a descriptor list.
///
/// Collects every fault instead of stopping at the first. Parameter
/// names without a descriptor are ignored; recognized names are checked
/// for type and bounds.
pub fn validate_request(
    request: &OptimizationRequest,
    descriptors: &[ParameterDescriptor],
) -> Vec<RequestFault> {
    let mut faults = Vec::new();

    match (request.start_date, request.end_date) {
        (None, _) | (_, None) => {
            faults.push(RequestFault::new(
                RequestFaultKind::InvalidDateRange,
                "start and end dates are required",
            ));
        }
        (Some(start), Some(end)) if end < start => {
            faults.push(RequestFault::new(
                RequestFaultKind::InvalidDateRange,
                format!("end date {end} precedes start date {start}"),
            ));
        }
        (Some(start), Some(end)) => {
            let days = (end - start).num_days() + 1;
            if days > MAX_HORIZON_DAYS {
                faults.push(RequestFault::new(
                    RequestFaultKind::HorizonTooLong,
                    format!("horizon of {days} days exceeds the {MAX_HORIZON_DAYS}-day maximum"),
                ));
            }
        }
    }

    if !request.staff.iter().any(|s| s.active) {
        faults.push(RequestFault::new(
            RequestFaultKind::NoStaff,
            "no active staff members",
        ));
    }

    if !request.shifts.iter().any(|s| s.active) {
        faults.push(RequestFault::new(
            RequestFaultKind::NoActiveShifts,
            "no active shifts",
        ));
    }

    for (name, value) in request.params.iter() {
        if let Some(descriptor) = descriptors.iter().find(|d| d.name == name) {
            if let Err(message) = descriptor.check(value) {
                faults.push(RequestFault::new(RequestFaultKind::InvalidParameter, message));
            }
        }
    }

    faults
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    fn t(h: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, 0, 0).unwrap()
    }

    fn valid_request() -> OptimizationRequest {
        OptimizationRequest::new("island-ga")
            .with_range(date(1), date(7))
            .with_staff(vec![Staff::new("S1", "ops")])
            .with_shifts(vec![Shift::new("D", t(9), t(17))])
    }

    fn descriptors() -> Vec<ParameterDescriptor> {
        vec![
            ParameterDescriptor::int("populationSize", 50, 10, 500),
            ParameterDescriptor::float("mutationRate", 0.1, 0.0, 1.0),
            ParameterDescriptor::bool("enableLocalSearch", true),
        ]
    }

    #[test]
    fn test_valid_request_has_no_faults() {
        assert!(validate_request(&valid_request(), &descriptors()).is_empty());
    }

    #[test]
    fn test_missing_dates_fault() {
        let request = OptimizationRequest::new("island-ga")
            .with_staff(vec![Staff::new("S1", "ops")])
            .with_shifts(vec![Shift::new("D", t(9), t(17))]);
        let faults = validate_request(&request, &[]);
        assert!(faults
            .iter()
            .any(|f| f.kind == RequestFaultKind::InvalidDateRange));
        assert!(request.snapshot().is_none());
    }

    #[test]
    fn test_zero_active_shifts_fault() {
        let mut request = valid_request();
        request.shifts = vec![Shift::new("X", t(9), t(17)).inactive()];
        let faults = validate_request(&request, &[]);
        assert!(faults
            .iter()
            .any(|f| f.kind == RequestFaultKind::NoActiveShifts));
    }

    #[test]
    fn test_horizon_limit() {
        let request = valid_request().with_range(date(1), NaiveDate::from_ymd_opt(2025, 4, 15).unwrap());
        let faults = validate_request(&request, &[]);
        assert!(faults
            .iter()
            .any(|f| f.kind == RequestFaultKind::HorizonTooLong));
    }

    #[test]
    fn test_param_type_and_bounds_checks() {
        let request = valid_request()
            .with_param("populationSize", ParamValue::Int(5))
            .with_param("mutationRate", ParamValue::Bool(true))
            .with_param("unknownKnob", ParamValue::Int(999));
        let faults = validate_request(&request, &descriptors());

        let param_faults: Vec<_> = faults
            .iter()
            .filter(|f| f.kind == RequestFaultKind::InvalidParameter)
            .collect();
        assert_eq!(param_faults.len(), 2, "unknown keys are ignored: {faults:?}");
    }

    #[test]
    fn test_param_coercion() {
        let params = AlgorithmParams::new()
            .with("populationSize", ParamValue::Float(80.0))
            .with("mutationRate", ParamValue::Int(1));

        assert_eq!(params.get_int("populationSize"), Some(80));
        assert_eq!(params.get_float("mutationRate"), Some(1.0));
        assert_eq!(params.get_bool("populationSize"), None);
    }

    #[test]
    fn test_descriptor_clamp() {
        let d = ParameterDescriptor::int("populationSize", 50, 10, 500);
        assert_eq!(d.clamp(&ParamValue::Int(5)), ParamValue::Int(10));
        assert_eq!(d.clamp(&ParamValue::Int(1000)), ParamValue::Int(500));
        assert_eq!(d.clamp(&ParamValue::Bool(true)), ParamValue::Int(50));

        let f = ParameterDescriptor::float("mutationRate", 0.1, 0.0, 1.0);
        assert_eq!(f.clamp(&ParamValue::Float(1.5)), ParamValue::Float(1.0));
    }

    #[test]
    fn test_params_serde_round_trip() {
        let params = AlgorithmParams::new()
            .with("populationSize", ParamValue::Int(100))
            .with("mutationRate", ParamValue::Float(0.15))
            .with("enableLocalSearch", ParamValue::Bool(false));

        let json = serde_json::to_string(&params).expect("serialize");
        let back: AlgorithmParams = serde_json::from_str(&json).expect("deserialize");

        assert_eq!(back.get_int("populationSize"), Some(100));
        assert_eq!(back.get_float("mutationRate"), Some(0.15));
        assert_eq!(back.get_bool("enableLocalSearch"), Some(false));
    }
}
