//! Within-host population growth.
//!
//! An `IntrahostModel` bundles the fixed mutation and recombination parameters of a run with one
//! of three population regulation policies (`GrowthModel`). Models are built once and then only
//! read, so a single model can be shared between all hosts and threads.

use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::fitness::{Basis, FitnessLandscape};
use crate::encoding::{Allele, EncodedSequence};
use crate::errors::Result;

/// Allele-to-allele substitution rates. Rows are not normalized.
#[derive(Clone, Debug, PartialEq)]
pub struct TransitionMatrix {
    rows: Vec<Vec<f64>>,
}

impl TransitionMatrix {
    pub fn new(rows: Vec<Vec<f64>>) -> Self {
        Self { rows }
    }

    pub fn n_states(&self) -> usize {
        self.rows.len()
    }

    pub fn row(&self, state: usize) -> Option<&[f64]> {
        self.rows.get(state).map(Vec::as_slice)
    }

    pub fn get(&self, from: usize, to: usize) -> Option<f64> {
        self.rows.get(from)?.get(to).copied()
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }
}

/// Log fitness of every pathogen currently in a host.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FitnessContext {
    log_fitness: Vec<f64>,
}

impl FitnessContext {
    pub fn new(log_fitness: Vec<f64>) -> Self {
        Self { log_fitness }
    }

    /// Evaluate every sequence of a host on a multiplicative landscape.
    pub fn from_population(
        landscape: &FitnessLandscape,
        sequences: &[EncodedSequence],
    ) -> Result<Self> {
        let log_fitness = sequences
            .iter()
            .map(|sequence| landscape.log_fitness(sequence))
            .collect::<Result<Vec<f64>>>()?;
        Ok(Self { log_fitness })
    }

    pub fn log_fitness(&self) -> &[f64] {
        &self.log_fitness
    }

    pub fn is_empty(&self) -> bool {
        self.log_fitness.is_empty()
    }

    /// Mean decimal fitness, the expected number of offspring per pathogen.
    pub fn mean_fitness(&self) -> Option<f64> {
        if self.log_fitness.is_empty() {
            return None;
        }
        let total: f64 = self
            .log_fitness
            .iter()
            .map(|&f| Basis::Log.convert(f, Basis::Decimal))
            .sum();
        Some(total / self.log_fitness.len() as f64)
    }
}

/// Population regulation policy.
#[derive(Clone, Debug, PartialEq)]
pub enum GrowthModel {
    /// The population is held at `pop_size` every generation.
    Constant { pop_size: usize },

    /// Geometric growth at `growth_rate` per generation, capped at `max_pop_size`.
    BevertonHoltThreshold {
        max_pop_size: usize,
        growth_rate: f64,
    },

    /// Beverton-Holt growth whose rate is the mean fitness of the current population.
    FitnessDependent { max_pop_size: usize },
}

impl GrowthModel {
    pub fn max_pathogen_pop_size(&self) -> usize {
        match self {
            GrowthModel::Constant { pop_size } => *pop_size,
            GrowthModel::BevertonHoltThreshold { max_pop_size, .. } => *max_pop_size,
            GrowthModel::FitnessDependent { max_pop_size } => *max_pop_size,
        }
    }

    /// Population size of the next generation given the current size `n`.
    ///
    /// Returns `None` when the size cannot be computed, which happens for the fitness dependent
    /// model without a (non-empty) fitness context. Callers should then leave the host's
    /// population as it is for this generation.
    pub fn next_pathogen_pop_size(
        &self,
        n: usize,
        context: Option<&FitnessContext>,
    ) -> Option<usize> {
        match self {
            GrowthModel::Constant { pop_size } => Some(*pop_size),
            GrowthModel::BevertonHoltThreshold {
                max_pop_size,
                growth_rate,
            } => {
                let next = (growth_rate * n as f64).round() as usize;
                Some(next.min(*max_pop_size))
            }
            GrowthModel::FitnessDependent { max_pop_size } => {
                let r = context?.mean_fitness()?;
                Some(beverton_holt(n, r, *max_pop_size))
            }
        }
    }
}

/// Beverton-Holt map with carrying capacity `k`. Populations above `k` are treated as `k`, which
/// keeps the denominator positive.
fn beverton_holt(n: usize, r: f64, k: usize) -> usize {
    let n = n.min(k);
    if n == 0 || r.is_nan() || r <= 0. {
        return 0;
    }
    if r.is_infinite() {
        return k;
    }
    let n64 = n as f64;
    let k64 = k as f64;
    let next = ((r * n64 * k64) / (k64 + (r - 1.) * n64)).ceil() as usize;
    next.min(k)
}

/// Fixed within-host parameters of a simulation run.
#[derive(Clone, Debug, PartialEq)]
pub struct IntrahostModel {
    name: String,
    mutation_rate: f64,
    transition_matrix: TransitionMatrix,
    recombination_rate: f64,
    growth: GrowthModel,
}

impl IntrahostModel {
    pub fn new(
        name: impl Into<String>,
        mutation_rate: f64,
        transition_matrix: TransitionMatrix,
        recombination_rate: f64,
        growth: GrowthModel,
    ) -> Self {
        Self {
            name: name.into(),
            mutation_rate,
            transition_matrix,
            recombination_rate,
            growth,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mutation_rate(&self) -> f64 {
        self.mutation_rate
    }

    pub fn transition_matrix(&self) -> &TransitionMatrix {
        &self.transition_matrix
    }

    pub fn recombination_rate(&self) -> f64 {
        self.recombination_rate
    }

    pub fn growth(&self) -> &GrowthModel {
        &self.growth
    }

    pub fn max_pathogen_pop_size(&self) -> usize {
        self.growth.max_pathogen_pop_size()
    }

    /// Next population size without any knowledge of the population's fitness.
    pub fn next_pathogen_pop_size(&self, n: usize) -> Option<usize> {
        self.growth.next_pathogen_pop_size(n, None)
    }

    pub fn next_pathogen_pop_size_with(
        &self,
        n: usize,
        context: &FitnessContext,
    ) -> Option<usize> {
        self.growth.next_pathogen_pop_size(n, Some(context))
    }

    /// Next population sizes of many hosts, given as current size and optional fitness context.
    #[cfg(feature = "parallel")]
    pub fn next_pathogen_pop_sizes(
        &self,
        hosts: &[(usize, Option<FitnessContext>)],
    ) -> Vec<Option<usize>> {
        hosts
            .par_iter()
            .map(|(n, context)| self.growth.next_pathogen_pop_size(*n, context.as_ref()))
            .collect()
    }

    /// Next population sizes of many hosts, given as current size and optional fitness context.
    #[cfg(not(feature = "parallel"))]
    pub fn next_pathogen_pop_sizes(
        &self,
        hosts: &[(usize, Option<FitnessContext>)],
    ) -> Vec<Option<usize>> {
        hosts
            .iter()
            .map(|(n, context)| self.growth.next_pathogen_pop_size(*n, context.as_ref()))
            .collect()
    }

    /// Allele codes covered by the transition matrix.
    pub fn states(&self) -> Vec<Allele> {
        (0..self.transition_matrix.n_states())
            .map(|state| state as Allele)
            .collect()
    }

    pub fn transition_probs(&self, state: Allele) -> Option<&[f64]> {
        self.transition_matrix.row(state as usize)
    }

    /// Draw the allele that `state` mutates into, weighted by its row of the transition matrix.
    pub fn sample_transition<R: Rng + ?Sized>(
        &self,
        state: Allele,
        rng: &mut R,
    ) -> Option<Allele> {
        let row = self.transition_probs(state)?;
        let distribution = WeightedIndex::new(row).ok()?;
        Some(distribution.sample(rng) as Allele)
    }
}
