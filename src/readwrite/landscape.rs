use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fs;
use std::io::{BufRead, BufReader};

use crate::core::fitness::{Basis, FitnessLandscape};
use crate::errors::{ContagionError, Result};

pub trait LandscapeIO: Sized {
    fn read(reader: &mut dyn BufRead, basis: Basis) -> Result<Self>;
    fn read_from_file(path: &str, basis: Basis) -> Result<Self>;
}

impl LandscapeIO for FitnessLandscape {
    /// Reads a fitness landscape from its text description and returns it in `basis`.
    ///
    /// ```text
    /// # comment
    /// log
    /// default-> 1.0, 1.0, 1.0, 1.0
    /// 0: 1.0, 1.0, 1.0, 0.5
    /// 2: 1.0, 1.0, 1.0, 0.9
    /// ```
    ///
    /// Values are read in the basis declared by the latest `log`/`ln` or `dec`/`base10` line
    /// (decimal if none) and converted to `basis`. Sites up to the largest declared position
    /// that are not listed take the default values.
    fn read(reader: &mut dyn BufRead, basis: Basis) -> Result<Self> {
        let mut declared = Basis::Decimal;
        let mut n_alleles: Option<usize> = None;
        let mut default: Option<Vec<f64>> = None;
        let mut sites: BTreeMap<usize, Vec<f64>> = BTreeMap::new();

        for (idx, line) in reader.lines().enumerate() {
            let line_no = idx + 1;
            let line = line?;
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if line.starts_with("dec") || line.starts_with("base10") {
                declared = Basis::Decimal;
                continue;
            }
            if line.starts_with("log") || line.starts_with("ln") {
                declared = Basis::Log;
                continue;
            }

            if line.starts_with("default") {
                let (_, values) = line.split_once("->").ok_or_else(|| {
                    ContagionError::parse(line_no, "missing '->' delimiter in default values")
                })?;
                let values = parse_values(values, line_no, declared, basis)?;
                check_allele_count(&mut n_alleles, values.len(), line_no, "default values")?;
                default = Some(values);
                continue;
            }

            let (position, values) = line
                .split_once(':')
                .ok_or_else(|| ContagionError::parse(line_no, "missing colon delimiter"))?;
            let position: usize = position.trim().parse().map_err(|_| {
                let position = position.trim();
                ContagionError::parse(line_no, format!("invalid site position '{position}'"))
            })?;
            let values = parse_values(values, line_no, declared, basis)?;
            check_allele_count(
                &mut n_alleles,
                values.len(),
                line_no,
                &format!("site {position}"),
            )?;
            match sites.entry(position) {
                Entry::Occupied(_) => {
                    return Err(ContagionError::parse(
                        line_no,
                        format!("duplicate site position {position}"),
                    ));
                }
                Entry::Vacant(entry) => {
                    entry.insert(values);
                }
            }
        }

        let n_alleles = n_alleles.ok_or_else(|| {
            ContagionError::ValidationError("Fitness landscape declares no values".to_string())
        })?;
        let n_sites = sites.keys().next_back().map_or(0, |last| last + 1);

        let mut table = Vec::with_capacity(n_sites * n_alleles);
        for site in 0..n_sites {
            let values = match (sites.get(&site), &default) {
                (Some(values), _) => values,
                (None, Some(values)) => values,
                (None, None) => {
                    return Err(ContagionError::ValidationError(format!(
                        "Site {site} has no fitness values and no default values were declared"
                    )));
                }
            };
            table.extend_from_slice(values);
        }

        log::info!(
            "Loaded fitness landscape: {} sites ({} declared), {} alleles, {} values converted to {}",
            n_sites,
            sites.len(),
            n_alleles,
            declared,
            basis
        );
        FitnessLandscape::new(n_sites, n_alleles, basis, table)
    }

    fn read_from_file(path: &str, basis: Basis) -> Result<Self> {
        let file = fs::File::open(path)
            .map_err(|err| ContagionError::IoError(format!("Failed to read from {path}: {err}")))?;
        let mut reader = BufReader::new(file);
        Self::read(&mut reader, basis)
    }
}

fn parse_values(text: &str, line_no: usize, declared: Basis, basis: Basis) -> Result<Vec<f64>> {
    let values = text
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .map(|token| {
            token
                .parse::<f64>()
                .map(|value| declared.convert(value, basis))
                .map_err(|_| {
                    ContagionError::parse(line_no, format!("invalid fitness value '{token}'"))
                })
        })
        .collect::<Result<Vec<f64>>>()?;
    if values.is_empty() {
        return Err(ContagionError::parse(line_no, "no fitness values"));
    }
    Ok(values)
}

fn check_allele_count(
    n_alleles: &mut Option<usize>,
    count: usize,
    line_no: usize,
    what: &str,
) -> Result<()> {
    match n_alleles {
        Some(expected) if *expected != count => Err(ContagionError::parse(
            line_no,
            format!("number of alleles in {what} ({count}) is not equal to the previous count ({expected})"),
        )),
        Some(_) => Ok(()),
        None => {
            *n_alleles = Some(count);
            Ok(())
        }
    }
}
