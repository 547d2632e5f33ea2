//! Bounded local search over elite chromosomes.
//!
//! A small hill climber quality islands run between generations. Each
//! iteration proposes either a workload-balancing move or a one-slot
//! mutation; the proposal is kept only when its fitness strictly
//! improves on the incumbent.

use rand::Rng;

use super::operators::GeneticOperators;
use crate::genome::{Chromosome, GeneSpace};
use crate::model::RosterSnapshot;

/// Hill climber bound to one gene space.
pub struct LocalSearch<'a> {
    space: &'a GeneSpace,
    operators: GeneticOperators<'a>,
}

impl<'a> LocalSearch<'a> {
    /// Binds the search to a gene space and its snapshot.
    pub fn new(space: &'a GeneSpace, snapshot: &'a RosterSnapshot) -> Self {
        Self {
            space,
            operators: GeneticOperators::new(space, snapshot),
        }
    }

    /// Hill-climbs a chromosome for at most `iterations` proposals.
    ///
    /// `evaluate` must score the chromosome and store the fitness on
    /// it. Returns the number of accepted improvements.
    pub fn improve<R, F>(
        &self,
        chromosome: &mut Chromosome,
        iterations: usize,
        mut evaluate: F,
        rng: &mut R,
    ) -> usize
    where
        R: Rng + ?Sized,
        F: FnMut(&mut Chromosome) -> f64,
    {
        let mut current = match chromosome.fitness() {
            Some(fitness) => fitness,
            None => evaluate(chromosome),
        };
        let mut accepted = 0;

        for _ in 0..iterations {
            let mut proposal = chromosome.clone();
            let changed = if rng.random_bool(0.5) {
                self.operators.repair_advanced(&mut proposal, rng)
            } else {
                self.nudge(&mut proposal, rng)
            };
            if !changed {
                continue;
            }

            let fitness = evaluate(&mut proposal);
            if fitness > current {
                *chromosome = proposal;
                current = fitness;
                accepted += 1;
            }
        }
        accepted
    }

    /// Replaces one random slot with a different candidate and repairs.
    fn nudge<R: Rng + ?Sized>(&self, chromosome: &mut Chromosome, rng: &mut R) -> bool {
        let n = chromosome.genes.len();
        if n == 0 {
            return false;
        }
        let slot = rng.random_range(0..n);
        for _ in 0..4 {
            let gene = self.space.random_gene(slot, rng);
            if gene != chromosome.genes[slot] {
                chromosome.genes[slot] = gene;
                chromosome.clear_fitness();
                self.operators.repair_basic(chromosome);
                return true;
            }
        }
        false
    }
}
