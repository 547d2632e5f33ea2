//! Archipelago orchestration.
//!
//! Spawns one worker thread per island plus the migration coordinator
//! and, when a time budget is set, a deadline watchdog that trips the
//! shared cancellation flag. Island panics are contained at the join:
//! a dead island is recorded and the survivors finish their runs. Only
//! when no island produced any chromosome at all does the orchestrator
//! retry once with a single balanced population; if that also fails the
//! call is given up as lost.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crate::engine::config::EngineConfig;
use crate::engine::island::{profile_for, Island, IslandOutcome};
use crate::engine::migration::{build_topology, run_coordinator, IslandLink};
use crate::error::OptimizeError;
use crate::eval::{FitnessCache, FitnessProfile};
use crate::genome::{Chromosome, GeneSpace};
use crate::model::RosterSnapshot;

// ==== Run summary ====

/// Aggregated result of one archipelago run.
#[derive(Debug)]
pub struct OrchestratorRun {
    /// Fittest chromosome across every island (and the fallback, if it
    /// ran). `None` only when the run was cancelled before any island
    /// finished an evaluation pass.
    pub best: Option<Chromosome>,
    /// Per-island outcomes, including the fallback outcome when used.
    pub islands: Vec<IslandOutcome>,
    /// Ids of islands whose worker panicked.
    pub island_failures: Vec<usize>,
    pub cancelled: bool,
    pub fallback_used: bool,
    /// Fitness-cache hits and misses over the whole run.
    pub cache_counters: (u64, u64),
}

impl OrchestratorRun {
    pub fn best_fitness(&self) -> Option<f64> {
        self.best.as_ref().and_then(|c| c.fitness())
    }

    pub fn cache_hit_rate(&self) -> f64 {
        let (hits, misses) = self.cache_counters;
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

// ==== Orchestrator ====

/// Runs the configured number of islands to completion.
pub struct Orchestrator<'a> {
    config: &'a EngineConfig,
    space: &'a GeneSpace,
    snapshot: &'a RosterSnapshot,
}

impl<'a> Orchestrator<'a> {
    pub fn new(config: &'a EngineConfig, space: &'a GeneSpace, snapshot: &'a RosterSnapshot) -> Self {
        Self {
            config,
            space,
            snapshot,
        }
    }

    /// Executes the full island run.
    ///
    /// `cancel` is shared with the caller, who may trip it at any time;
    /// the deadline watchdog trips the same flag when the configured
    /// time budget runs out. `progress` is raised to the highest
    /// generation any island has reached. The fitness cache lives for
    /// exactly this call.
    pub fn run(
        &self,
        cancel: &AtomicBool,
        progress: &AtomicUsize,
    ) -> Result<OrchestratorRun, OptimizeError> {
        let cache = FitnessCache::new(self.config.cache_capacity);
        let num_islands = self.config.num_islands;
        let islands: Vec<Island> = (0..num_islands)
            .map(|i| {
                Island::new(
                    i,
                    profile_for(i, num_islands),
                    self.config,
                    self.space,
                    self.snapshot,
                    &cache,
                )
            })
            .collect();
        let (links, coordinator) = build_topology(num_islands);
        let release = (Mutex::new(false), Condvar::new());
        let deadline = self.config.time_limit_ms.map(Duration::from_millis);

        let mut outcomes: Vec<IslandOutcome> = Vec::with_capacity(num_islands);
        let mut failures: Vec<usize> = Vec::new();

        thread::scope(|scope| {
            let watchdog = deadline.map(|limit| {
                let release = &release;
                scope.spawn(move || watch_deadline(limit, cancel, release))
            });
            let coordinator = scope.spawn(move || run_coordinator(coordinator));

            let workers: Vec<_> = islands
                .iter()
                .zip(links)
                .enumerate()
                .map(|(i, (island, link))| {
                    let seed = self.seed_for(i);
                    scope.spawn(move || island.run(link, cancel, progress, seed))
                })
                .collect();

            for (i, worker) in workers.into_iter().enumerate() {
                match worker.join() {
                    Ok(outcome) => outcomes.push(outcome),
                    Err(_) => failures.push(i),
                }
            }
            // Every island has retired by now, so the coordinator is done.
            let _ = coordinator.join();

            if let Some(watchdog) = watchdog {
                let (lock, cvar) = &release;
                let mut finished = lock.lock().unwrap_or_else(|e| e.into_inner());
                *finished = true;
                cvar.notify_all();
                drop(finished);
                let _ = watchdog.join();
            }
        });

        let cancelled = cancel.load(Ordering::Relaxed) || outcomes.iter().any(|o| o.cancelled);

        let mut fallback_used = false;
        if !cancelled && outcomes.iter().all(|o| o.best.is_none()) {
            let seed = self.seed_for(num_islands);
            let fallback = thread::scope(|scope| {
                scope
                    .spawn(|| self.run_fallback(&cache, cancel, progress, seed))
                    .join()
            });
            match fallback {
                Ok(outcome) => {
                    fallback_used = true;
                    outcomes.push(outcome);
                }
                Err(_) => {
                    return Err(OptimizeError::wrapping(
                        "single-population fallback failed as well",
                        OptimizeError::run_failed(format!(
                            "all {num_islands} islands failed without a result"
                        )),
                    ));
                }
            }
        }

        let fitness = |c: &Chromosome| c.fitness().unwrap_or(f64::NEG_INFINITY);
        let best = outcomes
            .iter()
            .filter_map(|o| o.best.as_ref())
            .max_by(|a, b| fitness(a).total_cmp(&fitness(b)))
            .cloned();

        Ok(OrchestratorRun {
            best,
            islands: outcomes,
            island_failures: failures,
            cancelled,
            fallback_used,
            cache_counters: cache.counters(),
        })
    }

    /// Deterministic per-island seed when the run is seeded, fresh
    /// entropy otherwise.
    fn seed_for(&self, island: usize) -> u64 {
        match self.config.seed {
            Some(seed) => seed.wrapping_add(island as u64),
            None => rand::random(),
        }
    }

    /// One balanced population with migration disabled.
    fn run_fallback(
        &self,
        cache: &FitnessCache,
        cancel: &AtomicBool,
        progress: &AtomicUsize,
        seed: u64,
    ) -> IslandOutcome {
        let island = Island::new(
            0,
            FitnessProfile::Balanced,
            self.config,
            self.space,
            self.snapshot,
            cache,
        );
        island.run(IslandLink::detached(), cancel, progress, seed)
    }
}

// ==== Watchdog ====

/// Trips `cancel` once `limit` elapses, unless released first.
///
/// Sleeps on the condvar so an early release wakes it immediately; it
/// never polls.
fn watch_deadline(limit: Duration, cancel: &AtomicBool, release: &(Mutex<bool>, Condvar)) {
    let (lock, cvar) = release;
    let start = Instant::now();
    let mut finished = lock.lock().unwrap_or_else(|e| e.into_inner());
    while !*finished {
        let elapsed = start.elapsed();
        if elapsed >= limit {
            cancel.store(true, Ordering::Relaxed);
            return;
        }
        let (guard, _) = match cvar.wait_timeout(finished, limit - elapsed) {
            Ok(woken) => woken,
            Err(poisoned) => poisoned.into_inner(),
        };
        finished = guard;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DateRange, Shift, Staff, Task};
    use chrono::{NaiveDate, NaiveTime};

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    fn t(h: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, 0, 0).unwrap()
    }

    fn snapshot() -> RosterSnapshot {
        RosterSnapshot::new(
            vec![Staff::new("S1", "ops"), Staff::new("S2", "ops")],
            vec![
                Task::new("T1", "ops", date(1), t(9), t(12)),
                Task::new("T2", "ops", date(2), t(9), t(12)),
                Task::new("T3", "ops", date(3), t(13), t(16)),
            ],
            vec![Shift::new("D", t(9), t(17))],
            vec![],
            DateRange::new(date(1), date(4)),
        )
    }

    fn config() -> EngineConfig {
        EngineConfig::default()
            .with_population_size(12)
            .with_max_generations(8)
            .with_num_islands(3)
            .with_migration_interval(3)
            .with_migration_size(2)
            .with_stagnation_limit(0)
            .with_parallel(false)
            .with_seed(42)
    }

    // ---- Full runs ----

    #[test]
    fn test_run_produces_a_global_best() {
        let snapshot = snapshot();
        let space = GeneSpace::build(&snapshot);
        let config = config();
        let orchestrator = Orchestrator::new(&config, &space, &snapshot);

        let cancel = AtomicBool::new(false);
        let progress = AtomicUsize::new(0);
        let run = orchestrator.run(&cancel, &progress).unwrap();

        assert!(run.best.is_some());
        assert!(run.best_fitness().is_some());
        assert_eq!(run.islands.len(), 3);
        assert!(run.island_failures.is_empty());
        assert!(!run.fallback_used);
        assert!(!run.cancelled);

        // The global best is at least as fit as every island best.
        let global = run.best_fitness().unwrap();
        for island in &run.islands {
            if let Some(f) = island.best_fitness() {
                assert!(global >= f);
            }
        }
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let snapshot = snapshot();
        let space = GeneSpace::build(&snapshot);
        let config = config().with_num_islands(1);
        let orchestrator = Orchestrator::new(&config, &space, &snapshot);

        let run_once = || {
            let cancel = AtomicBool::new(false);
            let progress = AtomicUsize::new(0);
            orchestrator.run(&cancel, &progress).unwrap()
        };
        let first = run_once();
        let second = run_once();

        assert_eq!(first.best_fitness(), second.best_fitness());
        assert_eq!(
            first.best.as_ref().map(|c| c.signature()),
            second.best.as_ref().map(|c| c.signature())
        );
    }

    #[test]
    fn test_cache_is_shared_across_islands() {
        let snapshot = snapshot();
        let space = GeneSpace::build(&snapshot);
        let config = config();
        let orchestrator = Orchestrator::new(&config, &space, &snapshot);

        let cancel = AtomicBool::new(false);
        let progress = AtomicUsize::new(0);
        let run = orchestrator.run(&cancel, &progress).unwrap();

        let (hits, misses) = run.cache_counters;
        assert!(misses > 0, "every first evaluation is a miss");
        let rate = run.cache_hit_rate();
        assert!((0.0..=1.0).contains(&rate));
        assert_eq!(rate > 0.0, hits > 0);
    }

    // ---- Cancellation ----

    #[test]
    fn test_pre_cancelled_run_returns_empty_handed() {
        let snapshot = snapshot();
        let space = GeneSpace::build(&snapshot);
        let config = config();
        let orchestrator = Orchestrator::new(&config, &space, &snapshot);

        let cancel = AtomicBool::new(true);
        let progress = AtomicUsize::new(0);
        let run = orchestrator.run(&cancel, &progress).unwrap();

        assert!(run.cancelled);
        assert!(run.best.is_none());
        assert!(!run.fallback_used, "a cancelled run is not retried");
    }

    #[test]
    fn test_deadline_watchdog_trips_cancellation() {
        let snapshot = snapshot();
        let space = GeneSpace::build(&snapshot);
        let config = config()
            .with_max_generations(200_000)
            .with_time_limit_ms(5);
        let orchestrator = Orchestrator::new(&config, &space, &snapshot);

        let cancel = AtomicBool::new(false);
        let progress = AtomicUsize::new(0);
        let started = Instant::now();
        let run = orchestrator.run(&cancel, &progress).unwrap();

        assert!(run.cancelled);
        assert!(
            started.elapsed() < Duration::from_secs(30),
            "the watchdog must stop a run that would otherwise churn"
        );
    }

    // ---- Watchdog release ----

    #[test]
    fn test_watchdog_released_early_does_not_cancel() {
        let cancel = AtomicBool::new(false);
        let release = (Mutex::new(false), Condvar::new());

        thread::scope(|scope| {
            let handle = {
                let release = &release;
                let cancel = &cancel;
                scope.spawn(move || watch_deadline(Duration::from_secs(60), cancel, release))
            };
            let (lock, cvar) = &release;
            let mut finished = lock.lock().unwrap();
            *finished = true;
            cvar.notify_all();
            drop(finished);
            handle.join().unwrap();
        });

        assert!(!cancel.load(Ordering::Relaxed));
    }
}
