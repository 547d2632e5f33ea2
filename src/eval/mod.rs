//! Plan evaluation: decoding, constraint checking, fitness, caching.

mod cache;
mod decoder;
mod fitness;
mod violations;

pub use cache::{FitnessCache, DEFAULT_CACHE_CAPACITY};
pub use decoder::PlanDecoder;
pub use fitness::{fairness, FitnessCalculator, FitnessProfile, FitnessWeights, PlanMetrics};
pub use violations::{ConstraintEvaluator, EvaluationReport, Violation};
