//! Parent selection strategies.
//!
//! Selection determines which chromosomes are chosen as parents for
//! crossover. Different strategies provide different selection pressure.
//! All strategies assume **maximization** (higher fitness = better) and
//! treat unevaluated chromosomes as worst.
//!
//! # References
//!
//! - Blickle & Thiele (1996), "A Comparison of Selection Schemes used in
//!   Evolutionary Algorithms"
//! - Baker (1985), "Adaptive Selection Methods for Genetic Algorithms"

use rand::Rng;

use crate::genome::Chromosome;

/// Selection strategy for choosing parents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Tournament selection: pick `k` chromosomes at random, keep the
    /// fittest.
    ///
    /// Higher `k` = stronger selection pressure.
    /// - k=2: light pressure (good for diversity)
    /// - k=3-5: moderate pressure (typical default)
    /// - k>5: strong pressure (risk of premature convergence)
    Tournament(usize),

    /// Fitness-proportionate (roulette wheel) selection.
    ///
    /// Weights are shifted so the worst chromosome still gets a sliver
    /// of probability; susceptible to super-individual dominance when
    /// fitness variance is high.
    Roulette,

    /// Rank-based selection with linear weights.
    ///
    /// Selection probability follows rank position, not raw fitness,
    /// which avoids the scaling problems of roulette selection.
    Rank,
}

impl Default for Selection {
    fn default() -> Self {
        Selection::Tournament(3)
    }
}

impl Selection {
    /// Selects a parent index from the population slice.
    ///
    /// # Panics
    /// Panics if `population` is empty.
    pub fn select<R: Rng + ?Sized>(&self, population: &[Chromosome], rng: &mut R) -> usize {
        assert!(
            !population.is_empty(),
            "cannot select from empty population"
        );

        match self {
            Selection::Tournament(k) => tournament(population, *k, rng),
            Selection::Roulette => roulette(population, rng),
            Selection::Rank => rank(population, rng),
        }
    }
}

fn fitness_of(chromosome: &Chromosome) -> f64 {
    chromosome.fitness().unwrap_or(f64::NEG_INFINITY)
}

/// Tournament selection: sample k chromosomes, return the fittest.
fn tournament<R: Rng + ?Sized>(population: &[Chromosome], k: usize, rng: &mut R) -> usize {
    let k = k.max(1);
    let n = population.len();

    let mut best_idx = rng.random_range(0..n);
    for _ in 1..k {
        let idx = rng.random_range(0..n);
        if fitness_of(&population[idx]) > fitness_of(&population[best_idx]) {
            best_idx = idx;
        }
    }
    best_idx
}

/// Roulette wheel selection.
///
/// Weights are `fitness - min_fitness + epsilon` so every chromosome
/// keeps a positive weight and the fittest gets the largest.
fn roulette<R: Rng + ?Sized>(population: &[Chromosome], rng: &mut R) -> usize {
    let n = population.len();
    if n == 1 {
        return 0;
    }

    let fitnesses: Vec<f64> = population.iter().map(fitness_of).collect();
    let min_fitness = fitnesses
        .iter()
        .cloned()
        .filter(|f| f.is_finite())
        .fold(f64::INFINITY, f64::min);
    if !min_fitness.is_finite() {
        return rng.random_range(0..n);
    }

    let epsilon = 1e-10;
    let weights: Vec<f64> = fitnesses
        .iter()
        .map(|&f| {
            if f.is_finite() {
                f - min_fitness + epsilon
            } else {
                epsilon
            }
        })
        .collect();

    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return rng.random_range(0..n);
    }

    let threshold = rng.random_range(0.0..total);
    let mut cumulative = 0.0;
    for (i, &w) in weights.iter().enumerate() {
        cumulative += w;
        if cumulative > threshold {
            return i;
        }
    }

    n - 1 // floating-point fallback
}

/// Rank-based selection using linear ranking.
///
/// Chromosomes are sorted by fitness (best first), then selection
/// probability is proportional to `n - rank`.
fn rank<R: Rng + ?Sized>(population: &[Chromosome], rng: &mut R) -> usize {
    let n = population.len();
    if n == 1 {
        return 0;
    }

    let mut indexed: Vec<(usize, f64)> = population
        .iter()
        .enumerate()
        .map(|(i, c)| (i, fitness_of(c)))
        .collect();
    indexed.sort_by(|a, b| b.1.total_cmp(&a.1));

    let total: f64 = (n * (n + 1)) as f64 / 2.0;
    let threshold = rng.random_range(0.0..total);
    let mut cumulative = 0.0;

    for (rank, &(original_idx, _)) in indexed.iter().enumerate() {
        let weight = (n - rank) as f64;
        cumulative += weight;
        if cumulative > threshold {
            return original_idx;
        }
    }

    indexed[n - 1].0 // fallback
}
