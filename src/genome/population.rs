//! Population: an ordered set of chromosomes under evolution.
//!
//! After [`Population::sort_by_fitness`] index 0 holds the fittest
//! chromosome. Unevaluated chromosomes sort last. Migration works
//! through [`Population::best_n`] and [`Population::replace_worst_n`],
//! which preserve population size.

use rand::Rng;

use super::chromosome::Chromosome;

/// Most chromosome pairs sampled by the diversity metric.
const MAX_DIVERSITY_PAIRS: usize = 100;

/// An ordered collection of candidate rosters.
#[derive(Debug, Clone, Default)]
pub struct Population {
    /// The chromosomes, fittest first once sorted.
    pub chromosomes: Vec<Chromosome>,
}

impl Population {
    /// Creates an empty population.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing chromosome vector.
    pub fn from_chromosomes(chromosomes: Vec<Chromosome>) -> Self {
        Self { chromosomes }
    }

    /// Number of chromosomes.
    pub fn len(&self) -> usize {
        self.chromosomes.len()
    }

    /// Whether the population is empty.
    pub fn is_empty(&self) -> bool {
        self.chromosomes.is_empty()
    }

    /// Sorts descending by fitness; unevaluated chromosomes go last.
    pub fn sort_by_fitness(&mut self) {
        self.chromosomes.sort_by(|a, b| {
            let fa = a.fitness().unwrap_or(f64::NEG_INFINITY);
            let fb = b.fitness().unwrap_or(f64::NEG_INFINITY);
            fb.total_cmp(&fa)
        });
    }

    /// The fittest chromosome, ignoring order.
    pub fn best(&self) -> Option<&Chromosome> {
        self.chromosomes.iter().max_by(|a, b| {
            let fa = a.fitness().unwrap_or(f64::NEG_INFINITY);
            let fb = b.fitness().unwrap_or(f64::NEG_INFINITY);
            fa.total_cmp(&fb)
        })
    }

    /// Fitness of the fittest chromosome, when any is evaluated.
    pub fn best_fitness(&self) -> Option<f64> {
        self.best().and_then(|c| c.fitness())
    }

    /// Clones of the `n` fittest chromosomes, fittest first.
    pub fn best_n(&self, n: usize) -> Vec<Chromosome> {
        let mut ordered: Vec<&Chromosome> = self.chromosomes.iter().collect();
        ordered.sort_by(|a, b| {
            let fa = a.fitness().unwrap_or(f64::NEG_INFINITY);
            let fb = b.fitness().unwrap_or(f64::NEG_INFINITY);
            fb.total_cmp(&fa)
        });
        ordered.into_iter().take(n).cloned().collect()
    }

    /// Replaces the worst chromosomes with `incoming`, keeping size.
    ///
    /// Sorts first, then overwrites the tail. Surplus incoming
    /// chromosomes beyond the population size are dropped.
    pub fn replace_worst_n(&mut self, incoming: Vec<Chromosome>) {
        self.sort_by_fitness();
        let len = self.chromosomes.len();
        let k = incoming.len().min(len);
        for (offset, chromosome) in incoming.into_iter().take(k).enumerate() {
            self.chromosomes[len - k + offset] = chromosome;
        }
    }

    /// Drops the worst chromosomes until `target` remain.
    pub fn shrink_to(&mut self, target: usize) {
        if self.chromosomes.len() > target {
            self.sort_by_fitness();
            self.chromosomes.truncate(target);
        }
    }

    /// Average pairwise fraction of differing gene choices, sampled
    /// over at most 100 pairs. 0.0 for fewer than two chromosomes.
    pub fn diversity<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let n = self.chromosomes.len();
        if n < 2 {
            return 0.0;
        }
        let total_pairs = n * (n - 1) / 2;

        if total_pairs <= MAX_DIVERSITY_PAIRS {
            let mut sum = 0.0;
            for i in 0..n {
                for j in (i + 1)..n {
                    sum += 1.0 - self.chromosomes[i].similarity(&self.chromosomes[j]);
                }
            }
            return sum / total_pairs as f64;
        }

        let mut sum = 0.0;
        for _ in 0..MAX_DIVERSITY_PAIRS {
            let i = rng.random_range(0..n);
            let mut j = rng.random_range(0..n - 1);
            if j >= i {
                j += 1;
            }
            sum += 1.0 - self.chromosomes[i].similarity(&self.chromosomes[j]);
        }
        sum / MAX_DIVERSITY_PAIRS as f64
    }
}
