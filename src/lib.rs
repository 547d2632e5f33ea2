//! Staff rostering optimization engine.
//!
//! Builds duty rosters over a planning horizon by assigning staff to
//! shifts and in-shift tasks, searching with an island-model genetic
//! algorithm:
//!
//! - **model**: the planning domain. Staff, shifts, tasks, constraint
//!   definitions, the immutable input snapshot, and the output roster
//!   plan.
//! - **request**: the call surface. Optimization request, typed
//!   parameter bag with descriptors, and request validation.
//! - **genome**: the search representation. One gene per staff-day
//!   slot (a day off, a bare shift, or a shift with up to three
//!   tasks), chromosomes over those slots, and the gene-space
//!   generator that enumerates the candidates each slot may take.
//! - **eval**: chromosome decoding, constraint evaluation,
//!   multi-profile fitness scoring, and the shared fitness cache.
//! - **engine**: the search machinery. Configuration, selection,
//!   adaptive genetic operators, population management, local search,
//!   islands with barrier migration, run orchestration, and demand
//!   relaxation.
//! - **optimizer**: the strategy layer. The
//!   [`optimizer::Optimizer`] trait, the island-model and two-phase
//!   strategies, and the registry that resolves algorithm names.
//!
//! # Architecture
//!
//! One optimization call validates the request, runs the relaxation
//! pre-flight, builds the gene space, evolves and finally decodes the
//! winning chromosome into a plan. Under the island-model strategy
//! several populations evolve in parallel with different fitness
//! emphases and exchange elites at generation barriers. A deadline
//! watchdog and a cooperative cancel flag bound the run; a cancelled
//! run is not an error and still returns the best plan found so far.

pub mod engine;
pub mod error;
pub mod eval;
pub mod genome;
pub mod model;
pub mod optimizer;
pub mod request;
