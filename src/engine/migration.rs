//! Generation-barrier migration between islands.
//!
//! Island models periodically exchange their best chromosomes so that
//! progress made under one fitness emphasis can seed the others
//! (Whitley, Rana & Heckendorn, "The Island Model Genetic Algorithm: On
//! Separability, Population Size and Convergence", 1999). The exchange
//! here is coordinated purely by message passing: an island that
//! reaches a migration generation sends [`IslandSignal::Checkpoint`]
//! with a copy of its elites and then blocks until the coordinator
//! replies with the migrants destined for it. A population is only
//! ever touched by its own island thread, at a known point between two
//! generations, which removes the data race a timer-driven coordinator
//! mutating island state from outside would have.
//!
//! Each round the coordinator collects one signal per live island,
//! sorts the checkpointing islands by best fitness descending and
//! forwards every island's elites to the next island in that order,
//! wrapping around, so the strongest island seeds the runner-up and
//! the weakest seeds the strongest. Islands that finish early retire
//! from the barrier; a round completes as soon as every still-live
//! island has reported.

use std::sync::mpsc::{channel, Receiver, Sender};

use crate::genome::Chromosome;

// ==== Signals ====

/// Message from an island worker to the migration coordinator.
#[derive(Debug)]
pub enum IslandSignal {
    /// The island completed a migration-interval generation and is now
    /// blocked on its mailbox waiting for incoming migrants.
    Checkpoint {
        island: usize,
        generation: usize,
        best_fitness: f64,
        elites: Vec<Chromosome>,
    },
    /// The island finished its run (or died) and leaves the barrier.
    Retired { island: usize },
}

/// Channel endpoints handed to one island worker.
pub struct IslandLink {
    /// Checkpoint/retire signals towards the coordinator.
    pub signals: Sender<IslandSignal>,
    /// Migrant batches pushed back by the coordinator.
    pub mailbox: Receiver<Vec<Chromosome>>,
}

impl IslandLink {
    /// Link with no coordinator behind it.
    ///
    /// Checkpoints fail to send and the island skips its barriers,
    /// which is what a single-population fallback run needs.
    pub fn detached() -> Self {
        let (signals, _) = channel();
        let (_, mailbox) = channel();
        Self { signals, mailbox }
    }
}

/// Channel endpoints kept by the coordinator.
pub struct CoordinatorLink {
    pub signals: Receiver<IslandSignal>,
    pub mailboxes: Vec<Sender<Vec<Chromosome>>>,
}

/// Builds the channel topology for `num_islands` workers plus one
/// coordinator.
pub fn build_topology(num_islands: usize) -> (Vec<IslandLink>, CoordinatorLink) {
    let (signal_tx, signal_rx) = channel();
    let mut links = Vec::with_capacity(num_islands);
    let mut mailboxes = Vec::with_capacity(num_islands);
    for _ in 0..num_islands {
        let (mailbox_tx, mailbox_rx) = channel();
        links.push(IslandLink {
            signals: signal_tx.clone(),
            mailbox: mailbox_rx,
        });
        mailboxes.push(mailbox_tx);
    }
    (
        links,
        CoordinatorLink {
            signals: signal_rx,
            mailboxes,
        },
    )
}

// ==== Retirement guard ====

/// Sends [`IslandSignal::Retired`] when dropped.
///
/// Constructed at the top of an island run so that every exit path,
/// including a panic inside the generation loop, retires the island
/// instead of stalling the others at the next barrier.
pub struct RetireGuard {
    island: usize,
    signals: Sender<IslandSignal>,
}

impl RetireGuard {
    pub fn new(island: usize, signals: Sender<IslandSignal>) -> Self {
        Self { island, signals }
    }
}

impl Drop for RetireGuard {
    fn drop(&mut self) {
        let _ = self.signals.send(IslandSignal::Retired {
            island: self.island,
        });
    }
}

// ==== Coordinator ====

/// Runs migration rounds until every island has retired.
///
/// A blocked island can only be released by this function, so the
/// round loop never waits on anything except the signal channel:
/// either a checkpoint arrives and joins the round, or a retirement
/// shrinks the barrier. Send failures are ignored, the only way a
/// mailbox receiver can be gone is that its island already died, and
/// the matching retirement signal is in flight behind it.
pub fn run_coordinator(link: CoordinatorLink) {
    let mut live = vec![true; link.mailboxes.len()];
    let mut live_count = live.len();

    while live_count > 0 {
        // One entry per checkpointing island: (island, best fitness, elites).
        let mut round: Vec<(usize, f64, Vec<Chromosome>)> = Vec::with_capacity(live_count);
        while round.len() < live_count {
            match link.signals.recv() {
                Ok(IslandSignal::Checkpoint {
                    island,
                    best_fitness,
                    elites,
                    ..
                }) => round.push((island, best_fitness, elites)),
                Ok(IslandSignal::Retired { island }) => {
                    if live[island] {
                        live[island] = false;
                        live_count -= 1;
                    }
                }
                Err(_) => return,
            }
        }

        if round.len() >= 2 {
            round.sort_by(|a, b| b.1.total_cmp(&a.1));
            let targets: Vec<usize> = (0..round.len())
                .map(|i| round[(i + 1) % round.len()].0)
                .collect();
            for (i, target) in targets.into_iter().enumerate() {
                let elites = std::mem::take(&mut round[i].2);
                let _ = link.mailboxes[target].send(elites);
            }
        } else if let Some((island, _, _)) = round.pop() {
            // A lone island has nobody to trade with; release it.
            let _ = link.mailboxes[island].send(Vec::new());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::Gene;
    use std::thread;

    fn scored(fitness: f64) -> Chromosome {
        let mut c = Chromosome::new(vec![Gene::DayOff]);
        c.set_fitness(fitness);
        c
    }

    fn checkpoint(island: usize, generation: usize, fitness: f64) -> IslandSignal {
        IslandSignal::Checkpoint {
            island,
            generation,
            best_fitness: fitness,
            elites: vec![scored(fitness)],
        }
    }

    // ---- Rounds ----

    #[test]
    fn test_elites_flow_down_the_fitness_ranking() {
        let (mut links, coordinator) = build_topology(2);
        let strong = links.pop().unwrap();
        let weak = links.pop().unwrap();
        let handle = thread::spawn(move || run_coordinator(coordinator));

        strong.signals.send(checkpoint(1, 10, 9.0)).unwrap();
        weak.signals.send(checkpoint(0, 10, 2.0)).unwrap();

        let to_weak = weak.mailbox.recv().unwrap();
        let to_strong = strong.mailbox.recv().unwrap();
        assert_eq!(
            to_weak[0].fitness(),
            Some(9.0),
            "the strongest island's elites land on the next island down"
        );
        assert_eq!(
            to_strong[0].fitness(),
            Some(2.0),
            "the ring wraps the weakest island's elites to the strongest"
        );

        drop(weak);
        drop(strong);
        handle.join().unwrap();
    }

    #[test]
    fn test_round_ordering_follows_fitness_not_island_id() {
        let (mut links, coordinator) = build_topology(3);
        let c = links.pop().unwrap();
        let b = links.pop().unwrap();
        let a = links.pop().unwrap();
        let handle = thread::spawn(move || run_coordinator(coordinator));

        // Island 0 is the fittest, island 2 the weakest.
        a.signals.send(checkpoint(0, 5, 30.0)).unwrap();
        b.signals.send(checkpoint(1, 5, 10.0)).unwrap();
        c.signals.send(checkpoint(2, 5, 20.0)).unwrap();

        // Sorted order is 0, 2, 1: elites chain 0 -> 2 -> 1 -> 0.
        assert_eq!(a.mailbox.recv().unwrap()[0].fitness(), Some(10.0));
        assert_eq!(b.mailbox.recv().unwrap()[0].fitness(), Some(20.0));
        assert_eq!(c.mailbox.recv().unwrap()[0].fitness(), Some(30.0));

        drop(a);
        drop(b);
        drop(c);
        handle.join().unwrap();
    }

    #[test]
    fn test_retirement_shrinks_the_barrier() {
        let (mut links, coordinator) = build_topology(3);
        let c = links.pop().unwrap();
        let b = links.pop().unwrap();
        let a = links.pop().unwrap();
        let handle = thread::spawn(move || run_coordinator(coordinator));

        c.signals
            .send(IslandSignal::Retired { island: 2 })
            .unwrap();
        a.signals.send(checkpoint(0, 4, 5.0)).unwrap();
        b.signals.send(checkpoint(1, 4, 7.0)).unwrap();

        // The round completes with the two remaining islands.
        assert_eq!(a.mailbox.recv().unwrap()[0].fitness(), Some(7.0));
        assert_eq!(b.mailbox.recv().unwrap()[0].fitness(), Some(5.0));

        drop(a);
        drop(b);
        drop(c);
        handle.join().unwrap();
    }

    #[test]
    fn test_lone_island_is_released_with_no_migrants() {
        let (mut links, coordinator) = build_topology(1);
        let link = links.pop().unwrap();
        let handle = thread::spawn(move || run_coordinator(coordinator));

        link.signals.send(checkpoint(0, 3, 1.0)).unwrap();
        let batch = link.mailbox.recv().unwrap();
        assert!(batch.is_empty());

        drop(link);
        handle.join().unwrap();
    }

    #[test]
    fn test_coordinator_ends_when_all_islands_retire() {
        let (links, coordinator) = build_topology(2);
        let handle = thread::spawn(move || run_coordinator(coordinator));
        drop(links);
        handle.join().unwrap();
    }

    // ---- Retirement guard ----

    #[test]
    fn test_retire_guard_fires_on_panic() {
        let (tx, rx) = channel();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _guard = RetireGuard::new(3, tx);
            panic!("island died");
        }));
        assert!(result.is_err());
        match rx.recv() {
            Ok(IslandSignal::Retired { island }) => assert_eq!(island, 3),
            other => panic!("expected a retirement, got {other:?}"),
        }
    }
}
