//! Candidate-solution representation.
//!
//! Genes encode one staff-day choice, chromosomes one complete roster,
//! populations the evolving sets the islands work on. The gene space
//! enumerates every candidate gene the operators may draw from.

mod chromosome;
mod gene;
mod population;
mod space;

pub use chromosome::Chromosome;
pub use gene::{Gene, MAX_TASKS_PER_GENE};
pub use population::Population;
pub use space::GeneSpace;
