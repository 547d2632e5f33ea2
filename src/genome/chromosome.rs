//! Chromosome: one complete candidate roster.
//!
//! A chromosome holds exactly one gene per (staff, date) slot, in slot
//! order. Fitness is computed lazily and cached on the chromosome; any
//! operator that edits genes must clear it so the next evaluation pass
//! recomputes. Representation invariants:
//!
//! - every slot holds exactly one gene (enforced by construction),
//! - no task index appears in more than one gene (restored by repair),
//! - a gene's working hours follow from its shift's window.

use std::collections::{HashMap, HashSet};

use rand::Rng;

use super::gene::Gene;
use super::space::GeneSpace;
use crate::model::RosterSnapshot;

/// One candidate roster.
#[derive(Debug, Clone, PartialEq)]
pub struct Chromosome {
    /// One gene per slot, in slot order.
    pub genes: Vec<Gene>,
    fitness: Option<f64>,
}

impl Chromosome {
    /// Wraps a gene vector. The caller supplies one gene per slot.
    pub fn new(genes: Vec<Gene>) -> Self {
        Self {
            genes,
            fitness: None,
        }
    }

    /// Draws a uniform random candidate per slot.
    pub fn random<R: Rng + ?Sized>(space: &GeneSpace, rng: &mut R) -> Self {
        let genes = (0..space.len())
            .map(|slot| space.random_gene(slot, rng))
            .collect();
        Self::new(genes)
    }

    /// Cached fitness, if evaluated.
    pub fn fitness(&self) -> Option<f64> {
        self.fitness
    }

    /// Stores an evaluated fitness.
    pub fn set_fitness(&mut self, fitness: f64) {
        self.fitness = Some(fitness);
    }

    /// Clears the cached fitness after a gene edit.
    pub fn clear_fitness(&mut self) {
        self.fitness = None;
    }

    /// Canonical encoding of every gene choice, used as the cache key.
    pub fn signature(&self) -> String {
        let mut out = String::with_capacity(self.genes.len() * 4);
        for (i, gene) in self.genes.iter().enumerate() {
            if i > 0 {
                out.push('|');
            }
            gene.encode_into(&mut out);
        }
        out
    }

    /// Fraction of slots where both chromosomes chose the same gene.
    ///
    /// Chromosomes of different lengths compare over the shorter prefix.
    pub fn similarity(&self, other: &Self) -> f64 {
        let n = self.genes.len().min(other.genes.len());
        if n == 0 {
            return 1.0;
        }
        let matching = self
            .genes
            .iter()
            .zip(&other.genes)
            .filter(|(a, b)| a == b)
            .count();
        matching as f64 / n as f64
    }

    /// Total working hours per staff row.
    ///
    /// Slot order groups each staff member's days contiguously, so the
    /// gene vector chunks by horizon length.
    pub fn staff_hours(&self, snapshot: &RosterSnapshot, num_dates: usize) -> Vec<f64> {
        if num_dates == 0 {
            return Vec::new();
        }
        self.genes
            .chunks(num_dates)
            .map(|row| row.iter().map(|g| g.working_hours(snapshot)).sum())
            .collect()
    }

    /// Snapshot indices of every task assigned anywhere in the roster.
    pub fn assigned_tasks(&self) -> HashSet<usize> {
        self.genes
            .iter()
            .flat_map(|g| g.task_indices().iter().copied())
            .collect()
    }

    /// Task indices assigned by more than one gene.
    pub fn duplicate_tasks(&self) -> Vec<usize> {
        let mut counts: HashMap<usize, usize> = HashMap::new();
        for gene in &self.genes {
            for &task in gene.task_indices() {
                *counts.entry(task).or_insert(0) += 1;
            }
        }
        let mut dups: Vec<usize> = counts
            .into_iter()
            .filter(|&(_, n)| n > 1)
            .map(|(task, _)| task)
            .collect();
        dups.sort_unstable();
        dups
    }

    /// Whether any task is assigned twice.
    pub fn has_duplicate_tasks(&self) -> bool {
        let mut seen = HashSet::new();
        for gene in &self.genes {
            for &task in gene.task_indices() {
                if !seen.insert(task) {
                    return true;
                }
            }
        }
        false
    }

    /// Snapshot indices of tasks no gene covers, in snapshot order.
    pub fn unassigned_tasks(&self, snapshot: &RosterSnapshot) -> Vec<usize> {
        let assigned = self.assigned_tasks();
        (0..snapshot.tasks.len())
            .filter(|i| !assigned.contains(i))
            .collect()
    }
}
