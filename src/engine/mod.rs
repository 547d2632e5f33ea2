//! The evolutionary engine.
//!
//! Configuration, genetic operators, population management and the
//! island-model machinery: per-island generation loops, barrier-based
//! migration, the archipelago orchestrator with its deadline watchdog,
//! and the demand-relaxation pre-pass.

mod config;
mod island;
mod local_search;
mod manager;
mod migration;
mod operators;
mod orchestrator;
mod relaxation;
mod selection;

pub use config::EngineConfig;
pub use island::{profile_for, Island, IslandOutcome};
pub use local_search::LocalSearch;
pub use manager::PopulationManager;
pub use migration::{
    build_topology, run_coordinator, CoordinatorLink, IslandLink, IslandSignal, RetireGuard,
};
pub use operators::GeneticOperators;
pub use orchestrator::{Orchestrator, OrchestratorRun};
pub use relaxation::{InfeasibilitySign, Relaxation, RelaxationEngine, OVERLOAD_THRESHOLD};
pub use selection::Selection;
