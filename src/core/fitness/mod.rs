//! This module contains the fitness landscape and the evaluation of genotype fitness on it.

pub(crate) mod landscape;

pub use landscape::{Basis, FitnessLandscape, selection_weights};
