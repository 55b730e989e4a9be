use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::encoding::Allele;
use crate::errors::{ContagionError, Result};

/// Numeric representation of fitness values.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Basis {
    /// Natural logarithm of the decimal fitness.
    #[display("log")]
    #[serde(alias = "ln")]
    Log,
    #[display("dec")]
    #[serde(alias = "dec", alias = "base10")]
    Decimal,
}

impl Basis {
    /// Express `value`, given in this basis, in the `target` basis.
    #[inline]
    pub fn convert(self, value: f64, target: Basis) -> f64 {
        match (self, target) {
            (Basis::Log, Basis::Decimal) => value.exp(),
            (Basis::Decimal, Basis::Log) => value.ln(),
            _ => value,
        }
    }

    /// Value of a site that has no effect on fitness.
    pub fn neutral(self) -> f64 {
        match self {
            Basis::Log => 0.,
            Basis::Decimal => 1.,
        }
    }
}

impl FromStr for Basis {
    type Err = ContagionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "log" | "ln" => Ok(Basis::Log),
            "dec" | "base10" | "decimal" => Ok(Basis::Decimal),
            other => Err(ContagionError::ConfigError(format!(
                "Unknown fitness basis: {other}"
            ))),
        }
    }
}

/// Per-site, per-allele fitness values.
///
/// Values are stored row-major with one row of `n_alleles` values per site, so every site in
/// `0..n_sites` has a value for every allele. A landscape is never modified after it has been
/// built; basis conversions produce a new landscape.
#[derive(Clone, Debug, PartialEq)]
pub struct FitnessLandscape {
    n_sites: usize,
    n_alleles: usize,
    basis: Basis,
    table: Vec<f64>,
}

impl FitnessLandscape {
    pub fn new(n_sites: usize, n_alleles: usize, basis: Basis, table: Vec<f64>) -> Result<Self> {
        if n_alleles == 0 {
            return Err(ContagionError::ValidationError(
                "Fitness landscape has no alleles".to_string(),
            ));
        }
        if table.len() != n_sites * n_alleles {
            return Err(ContagionError::ValidationError(format!(
                "Fitness landscape has wrong size: {} instead of {}",
                table.len(),
                n_sites * n_alleles
            )));
        }
        Ok(Self {
            n_sites,
            n_alleles,
            basis,
            table,
        })
    }

    /// Landscape in which every allele at every site is neutral.
    pub fn neutral(n_sites: usize, n_alleles: usize, basis: Basis) -> Result<Self> {
        Self::new(
            n_sites,
            n_alleles,
            basis,
            vec![basis.neutral(); n_sites * n_alleles],
        )
    }

    pub fn n_sites(&self) -> usize {
        self.n_sites
    }

    pub fn n_alleles(&self) -> usize {
        self.n_alleles
    }

    pub fn basis(&self) -> Basis {
        self.basis
    }

    /// Fitness of `allele` at `site` in the basis of this landscape.
    #[inline]
    pub fn value(&self, site: usize, allele: Allele) -> Result<f64> {
        let allele = allele as usize;
        if site >= self.n_sites || allele >= self.n_alleles {
            return Err(ContagionError::LookupError(format!(
                "No fitness value for site {site} and allele {allele} in a landscape of {} sites and {} alleles",
                self.n_sites, self.n_alleles
            )));
        }
        Ok(self.table[site * self.n_alleles + allele])
    }

    pub fn site_values(&self, site: usize) -> Option<&[f64]> {
        if site >= self.n_sites {
            return None;
        }
        let start = site * self.n_alleles;
        Some(&self.table[start..start + self.n_alleles])
    }

    /// Copy of this landscape with all values expressed in `basis`.
    pub fn to_basis(&self, basis: Basis) -> FitnessLandscape {
        let table = self
            .table
            .iter()
            .map(|&value| self.basis.convert(value, basis))
            .collect();
        Self {
            n_sites: self.n_sites,
            n_alleles: self.n_alleles,
            basis,
            table,
        }
    }

    /// Log fitness of a genotype where site effects multiply, i.e. the sum of the per-site log
    /// fitness values.
    pub fn log_fitness(&self, sequence: &[Allele]) -> Result<f64> {
        sequence
            .iter()
            .enumerate()
            .try_fold(0., |acc, (site, &allele)| {
                let value = self.value(site, allele)?;
                Ok::<f64, ContagionError>(acc + self.basis.convert(value, Basis::Log))
            })
    }

    /// Decimal fitness of a genotype where site effects add up. Negative totals are clamped to 0.
    pub fn additive_fitness(&self, sequence: &[Allele]) -> Result<f64> {
        let fitness = sequence
            .iter()
            .enumerate()
            .try_fold(0., |acc, (site, &allele)| {
                let value = self.value(site, allele)?;
                Ok::<f64, ContagionError>(acc + self.basis.convert(value, Basis::Decimal))
            })?;
        Ok(fitness.max(0.))
    }
}

/// Turn log fitness values into selection probabilities that sum to one.
///
/// Values are shifted by their maximum before exponentiation. If every genotype is lethal all
/// weights are zero.
pub fn selection_weights(log_fitness: &[f64]) -> Vec<f64> {
    let max = log_fitness.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        return vec![0.; log_fitness.len()];
    }
    let shifted: Vec<f64> = log_fitness.iter().map(|&f| (f - max).exp()).collect();
    let total: f64 = shifted.iter().sum();
    shifted.into_iter().map(|w| w / total).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_site_landscape() -> FitnessLandscape {
        FitnessLandscape::new(
            2,
            4,
            Basis::Decimal,
            vec![1., 2., 3., 4., 5., 6., 7., 8.],
        )
        .unwrap()
    }

    #[test]
    fn value_indexing() {
        let landscape = two_site_landscape();
        assert_eq!(landscape.value(0, 0).unwrap(), 1.);
        assert_eq!(landscape.value(0, 3).unwrap(), 4.);
        assert_eq!(landscape.value(1, 0).unwrap(), 5.);
        assert_eq!(landscape.value(1, 3).unwrap(), 8.);
        assert_eq!(landscape.site_values(1).unwrap(), &[5., 6., 7., 8.]);
        assert!(landscape.site_values(2).is_none());
    }

    #[test]
    fn value_out_of_range() {
        let landscape = two_site_landscape();
        assert!(matches!(
            landscape.value(2, 0),
            Err(ContagionError::LookupError(_))
        ));
        assert!(matches!(
            landscape.value(0, 4),
            Err(ContagionError::LookupError(_))
        ));
    }

    #[test]
    fn wrong_size_is_rejected() {
        let result = FitnessLandscape::new(2, 4, Basis::Log, vec![0.; 7]);
        assert!(matches!(result, Err(ContagionError::ValidationError(_))));
        let result = FitnessLandscape::new(0, 0, Basis::Log, Vec::new());
        assert!(matches!(result, Err(ContagionError::ValidationError(_))));
    }

    #[test]
    fn basis_conversion_is_invertible() {
        let landscape = two_site_landscape();
        let log = landscape.to_basis(Basis::Log);
        assert_eq!(log.basis(), Basis::Log);
        assert!((log.value(1, 1).unwrap() - 6f64.ln()).abs() < 1e-12);

        let back = log.to_basis(Basis::Decimal);
        for site in 0..2 {
            for allele in 0..4 {
                let original = landscape.value(site, allele).unwrap();
                assert!((back.value(site, allele).unwrap() - original).abs() < 1e-12);
            }
        }
        // the source landscape is untouched
        assert_eq!(landscape.basis(), Basis::Decimal);
        assert_eq!(landscape.value(1, 1).unwrap(), 6.);
    }

    #[test]
    fn basis_from_str() {
        assert_eq!("ln".parse::<Basis>().unwrap(), Basis::Log);
        assert_eq!("base10".parse::<Basis>().unwrap(), Basis::Decimal);
        assert!("binary".parse::<Basis>().is_err());
        assert_eq!(Basis::Log.to_string(), "log");
    }

    #[test]
    fn log_fitness_multiplies_sites() {
        let landscape = two_site_landscape();
        let fitness = landscape.log_fitness(&[1, 2]).unwrap();
        assert!((fitness - (2f64 * 7.).ln()).abs() < 1e-12);

        let log = landscape.to_basis(Basis::Log);
        assert!((log.log_fitness(&[1, 2]).unwrap() - fitness).abs() < 1e-12);

        assert!(landscape.log_fitness(&[0, 0, 0]).is_err());
    }

    #[test]
    fn additive_fitness_clamps_at_zero() {
        let landscape =
            FitnessLandscape::new(2, 2, Basis::Decimal, vec![1., -3., 0.5, 0.25]).unwrap();
        assert_eq!(landscape.additive_fitness(&[0, 1]).unwrap(), 1.25);
        assert_eq!(landscape.additive_fitness(&[1, 1]).unwrap(), 0.);
    }

    #[test]
    fn neutral_landscape() {
        let landscape = FitnessLandscape::neutral(100, 4, Basis::Log).unwrap();
        assert_eq!(landscape.log_fitness(&[3; 100]).unwrap(), 0.);
    }

    #[test]
    fn selection_weights_sum_to_one() {
        let weights = selection_weights(&[0., 2f64.ln(), 1000.]);
        assert!((weights.iter().sum::<f64>() - 1.).abs() < 1e-12);
        assert!(weights[2] > 0.999);

        let weights = selection_weights(&[0., 2f64.ln()]);
        assert!((weights[0] - 1. / 3.).abs() < 1e-12);
        assert!((weights[1] - 2. / 3.).abs() < 1e-12);
    }

    #[test]
    fn selection_weights_all_lethal() {
        let weights = selection_weights(&[f64::NEG_INFINITY, f64::NEG_INFINITY]);
        assert_eq!(weights, vec![0., 0.]);
        assert!(selection_weights(&[]).is_empty());
    }
}
