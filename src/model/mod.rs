//! Domain model for staff rostering.
//!
//! Plain immutable value types assembled by the caller: staff, shifts,
//! tasks, constraints, the snapshot that bundles them for one run, and
//! the roster plan the run produces.

mod constraint;
mod plan;
mod shift;
mod snapshot;
mod staff;
mod task;

pub use constraint::{ConstraintDef, ConstraintKind, ConstraintRule};
pub use plan::{RosterAssignment, RosterPlan};
pub use shift::Shift;
pub use snapshot::{DateRange, RosterSnapshot};
pub use staff::Staff;
pub use task::Task;
