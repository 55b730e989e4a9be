use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::core::fitness::Basis;
use crate::core::growth::{GrowthModel, IntrahostModel, TransitionMatrix};
use crate::encoding::{Allele, TranslationTable};
use crate::errors::{ContagionError, Result};

/// Settings of a run: the within-host model and the text inputs it is combined with.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Parameters {
    pub model: ModelParameters,

    /// Fitness landscape file and the basis the values should be used in.
    #[serde(default)]
    pub fitness: Option<FitnessInput>,

    /// Host network file with one `from to weight` edge per line.
    #[serde(default)]
    pub network: Option<String>,

    /// Host-tagged sequence file.
    #[serde(default)]
    pub sequences: Option<String>,

    /// Initial character to allele code translation for the sequence file.
    #[serde(default)]
    pub translation: BTreeMap<String, Allele>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FitnessInput {
    pub path: String,
    #[serde(default = "default_basis")]
    pub basis: Basis,
}

fn default_basis() -> Basis {
    Basis::Log
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ModelParameters {
    #[serde(default = "default_model_name")]
    pub name: String,

    /// Probability of a mutation per site and replication.
    pub mutation_rate: f64,

    /// Probability of recombination between two pathogens.
    pub recombination_rate: f64,

    /// Allele-to-allele substitution rates, one row per allele.
    pub transition_matrix: Vec<Vec<f64>>,

    pub replication: ReplicationModel,
}

fn default_model_name() -> String {
    "default".to_string()
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReplicationModel {
    Constant {
        pop_size: usize,
    },
    #[serde(alias = "bht")]
    BevertonHoltThreshold {
        max_pop_size: usize,
        growth_rate: f64,
    },
    #[serde(alias = "fitness")]
    FitnessDependent {
        max_pop_size: usize,
    },
}

impl ModelParameters {
    pub fn validate(&self) -> Result<()> {
        match &self.replication {
            ReplicationModel::Constant { pop_size } => {
                check(*pop_size >= 1, "pop_size", *pop_size, "must be at least 1")?
            }
            ReplicationModel::BevertonHoltThreshold {
                max_pop_size,
                growth_rate,
            } => {
                check(*max_pop_size >= 1, "max_pop_size", *max_pop_size, "must be at least 1")?;
                check(
                    growth_rate.is_finite() && *growth_rate >= 0.,
                    "growth_rate",
                    *growth_rate,
                    "must be a non-negative number",
                )?;
            }
            ReplicationModel::FitnessDependent { max_pop_size } => {
                check(*max_pop_size >= 1, "max_pop_size", *max_pop_size, "must be at least 1")?
            }
        }
        check(
            (0. ..=1.).contains(&self.mutation_rate),
            "mutation_rate",
            self.mutation_rate,
            "must be between 0 and 1",
        )?;
        check(
            (0. ..=1.).contains(&self.recombination_rate),
            "recombination_rate",
            self.recombination_rate,
            "must be between 0 and 1",
        )?;

        let n_states = self.transition_matrix.len();
        check(n_states > 0, "transition_matrix", "[]", "must not be empty")?;
        for (i, row) in self.transition_matrix.iter().enumerate() {
            check(
                row.len() == n_states,
                "transition_matrix row",
                i,
                "must have as many columns as the matrix has rows",
            )?;
            for (j, rate) in row.iter().enumerate() {
                check(
                    rate.is_finite() && *rate >= 0.,
                    "transition rate",
                    format!("{i} -> {j} ({rate})"),
                    "must be a non-negative number",
                )?;
            }
        }
        Ok(())
    }

    /// Validate the parameters and build the model they describe.
    pub fn create_model(&self) -> Result<IntrahostModel> {
        self.validate()?;
        let growth = match self.replication {
            ReplicationModel::Constant { pop_size } => GrowthModel::Constant { pop_size },
            ReplicationModel::BevertonHoltThreshold {
                max_pop_size,
                growth_rate,
            } => GrowthModel::BevertonHoltThreshold {
                max_pop_size,
                growth_rate,
            },
            ReplicationModel::FitnessDependent { max_pop_size } => {
                GrowthModel::FitnessDependent { max_pop_size }
            }
        };
        Ok(IntrahostModel::new(
            self.name.clone(),
            self.mutation_rate,
            TransitionMatrix::new(self.transition_matrix.clone()),
            self.recombination_rate,
            growth,
        ))
    }
}

fn check(valid: bool, name: &str, value: impl std::fmt::Display, reason: &str) -> Result<()> {
    if valid {
        return Ok(());
    }
    Err(ContagionError::ConfigError(format!(
        "invalid {name} {value}, {reason}"
    )))
}

impl Parameters {
    pub fn translation_table(&self) -> Result<TranslationTable> {
        let mut table = TranslationTable::new();
        for (symbol, &code) in &self.translation {
            let mut chars = symbol.chars();
            match (chars.next(), chars.next()) {
                (Some(symbol), None) => table.insert(symbol, code),
                _ => {
                    return Err(ContagionError::ConfigError(format!(
                        "invalid translation symbol '{symbol}', must be a single character"
                    )));
                }
            }
        }
        Ok(table)
    }

    /// Resolve relative input paths against `base`, usually the directory of the settings file.
    pub fn prepend_path(&mut self, base: &Path) {
        let resolve = |path: &mut String| {
            if Path::new(path.as_str()).is_relative() {
                *path = base.join(path.as_str()).to_string_lossy().into_owned();
            }
        };
        if let Some(fitness) = &mut self.fitness {
            resolve(&mut fitness.path);
        }
        if let Some(network) = &mut self.network {
            resolve(network);
        }
        if let Some(sequences) = &mut self.sequences {
            resolve(sequences);
        }
    }

    pub fn write(&self, writer: &mut dyn std::io::Write) -> Result<()> {
        serde_yaml::to_writer(writer, self)
            .map_err(|err| ContagionError::ConfigError(format!("YAML error: {err}")))
    }

    pub fn read(reader: &mut dyn std::io::Read) -> Result<Parameters> {
        serde_yaml::from_reader(reader)
            .map_err(|err| ContagionError::ConfigError(format!("YAML error: {err}")))
    }

    pub fn write_to_file(&self, filename: &str) -> Result<()> {
        let file = fs::File::create(filename)?;
        let mut writer = std::io::BufWriter::new(file);
        self.write(&mut writer)
    }

    /// Read settings from a file and resolve their input paths relative to it.
    pub fn read_from_file(filename: &str) -> Result<Parameters> {
        let file = fs::File::open(filename).map_err(|err| {
            ContagionError::ConfigError(format!("Failed to read from {filename}: {err}"))
        })?;
        let mut reader = std::io::BufReader::new(file);
        let mut parameters = Self::read(&mut reader)?;
        if let Some(base) = Path::new(filename).parent() {
            parameters.prepend_path(base);
        }
        Ok(parameters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const SETTINGS: &str = "
model:
  name: bht
  mutation_rate: 1.0e-5
  recombination_rate: 0.0
  transition_matrix:
    - [0.0, 1.0]
    - [1.0, 0.0]
  replication:
    type: bht
    max_pop_size: 1000
    growth_rate: 2.0
fitness:
  path: fitness.txt
  basis: ln
network: /data/network.txt
sequences: sequences.txt
translation:
  U: 0
  P: 1
";

    fn model_parameters(replication: ReplicationModel) -> ModelParameters {
        ModelParameters {
            name: "test".to_string(),
            mutation_rate: 1e-5,
            recombination_rate: 0.,
            transition_matrix: vec![vec![0., 1.], vec![1., 0.]],
            replication,
        }
    }

    #[test]
    fn read_settings() {
        let parameters = Parameters::read(&mut SETTINGS.as_bytes()).unwrap();
        assert_eq!(
            parameters.model.replication,
            ReplicationModel::BevertonHoltThreshold {
                max_pop_size: 1000,
                growth_rate: 2.
            }
        );
        assert_eq!(parameters.fitness.as_ref().unwrap().basis, Basis::Log);

        let table = parameters.translation_table().unwrap();
        assert_eq!(table.translate('P'), Some(1));

        let model = parameters.model.create_model().unwrap();
        assert_eq!(model.name(), "bht");
        assert_eq!(model.next_pathogen_pop_size(10), Some(20));
    }

    #[test]
    fn read_write() {
        let parameters = Parameters {
            model: model_parameters(ReplicationModel::FitnessDependent { max_pop_size: 100 }),
            fitness: Some(FitnessInput {
                path: "fitness.txt".to_string(),
                basis: Basis::Decimal,
            }),
            network: None,
            sequences: Some("sequences.txt".to_string()),
            translation: BTreeMap::from([("A".to_string(), 0)]),
        };
        let mut buffer = Vec::new();
        parameters.write(&mut buffer).unwrap();
        let read_parameters = Parameters::read(&mut buffer.as_slice()).unwrap();
        assert_eq!(read_parameters, parameters);
    }

    #[test]
    fn prepend_relative_paths() {
        let mut parameters = Parameters::read(&mut SETTINGS.as_bytes()).unwrap();
        parameters.prepend_path(Path::new("/runs/a"));
        assert_eq!(
            Path::new(&parameters.fitness.unwrap().path),
            Path::new("/runs/a/fitness.txt")
        );
        assert_eq!(parameters.network.unwrap(), "/data/network.txt");
        assert_eq!(
            Path::new(&parameters.sequences.unwrap()),
            Path::new("/runs/a/sequences.txt")
        );
    }

    #[test]
    fn create_each_model() {
        let constant = model_parameters(ReplicationModel::Constant { pop_size: 7 })
            .create_model()
            .unwrap();
        assert_eq!(constant.growth(), &GrowthModel::Constant { pop_size: 7 });

        let fitness = model_parameters(ReplicationModel::FitnessDependent { max_pop_size: 9 })
            .create_model()
            .unwrap();
        assert_eq!(fitness.max_pathogen_pop_size(), 9);
        assert_eq!(fitness.next_pathogen_pop_size(3), None);
    }

    #[test]
    fn reject_invalid_models() {
        let invalid = [
            ReplicationModel::Constant { pop_size: 0 },
            ReplicationModel::BevertonHoltThreshold {
                max_pop_size: 10,
                growth_rate: -1.,
            },
            ReplicationModel::FitnessDependent { max_pop_size: 0 },
        ];
        for replication in invalid {
            assert!(matches!(
                model_parameters(replication).create_model(),
                Err(ContagionError::ConfigError(_))
            ));
        }

        let mut parameters = model_parameters(ReplicationModel::Constant { pop_size: 1 });
        parameters.mutation_rate = -0.1;
        assert!(parameters.validate().is_err());

        let mut parameters = model_parameters(ReplicationModel::Constant { pop_size: 1 });
        parameters.transition_matrix = vec![vec![0., 1., 1.], vec![1., 0., 1.]];
        assert!(parameters.validate().is_err());

        let mut parameters = model_parameters(ReplicationModel::Constant { pop_size: 1 });
        parameters.transition_matrix = vec![vec![0., -1.], vec![1., 0.]];
        assert!(parameters.validate().is_err());
    }

    #[test]
    fn reject_long_translation_symbol() {
        let mut parameters = Parameters::read(&mut SETTINGS.as_bytes()).unwrap();
        parameters.translation.insert("AT".to_string(), 2);
        assert!(parameters.translation_table().is_err());
    }

    #[test]
    #[serial]
    fn read_write_file() {
        let path = std::env::temp_dir().join("contagion_test_settings.yaml");
        let path = path.to_str().unwrap();
        let parameters = Parameters::read(&mut SETTINGS.as_bytes()).unwrap();
        parameters.write_to_file(path).unwrap();
        let read_parameters = Parameters::read_from_file(path).unwrap();
        assert_eq!(read_parameters.model, parameters.model);
        assert!(Path::new(&read_parameters.sequences.unwrap()).is_absolute());
        std::fs::remove_file(path).unwrap();
    }
}
