//! Shift model.
//!
//! A shift is a named daily time window that staff can be assigned to.
//! Night shifts may cross midnight; their duration is computed on the
//! 24-hour wrap. Inactive shifts are excluded from the search space.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// A daily shift window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shift {
    /// Unique shift identifier.
    pub id: String,
    /// Human-readable name (e.g. "Day", "Night").
    pub name: String,
    /// Shift start time.
    pub start: NaiveTime,
    /// Shift end time. May be earlier than `start`, meaning the shift
    /// crosses midnight into the next day.
    pub end: NaiveTime,
    /// Optional working-period reference used by pattern constraints.
    pub working_period: Option<String>,
    /// Whether this is a night shift (for night-shift-count rules).
    pub night: bool,
    /// Whether this shift is assignable.
    pub active: bool,
}

impl Shift {
    /// Creates an active day shift.
    pub fn new(id: impl Into<String>, start: NaiveTime, end: NaiveTime) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            start,
            end,
            working_period: None,
            night: false,
            active: true,
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the working-period reference.
    pub fn with_working_period(mut self, period: impl Into<String>) -> Self {
        self.working_period = Some(period.into());
        self
    }

    /// Marks this shift as a night shift.
    pub fn night(mut self) -> Self {
        self.night = true;
        self
    }

    /// Marks this shift inactive.
    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// Whether the window crosses midnight.
    pub fn crosses_midnight(&self) -> bool {
        self.end <= self.start
    }

    /// Shift length in hours, handling the midnight wrap.
    ///
    /// A window with equal start and end is treated as a full 24 hours.
    pub fn duration_hours(&self) -> f64 {
        let start_s = self.start.signed_duration_since(NaiveTime::MIN).num_seconds();
        let end_s = self.end.signed_duration_since(NaiveTime::MIN).num_seconds();
        let span_s = if end_s > start_s {
            end_s - start_s
        } else {
            86_400 - start_s + end_s
        };
        span_s as f64 / 3600.0
    }
}
