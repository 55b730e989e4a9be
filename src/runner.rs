use indicatif::{ProgressBar, ProgressStyle};
use itertools::Itertools;
use std::collections::BTreeMap;

use crate::args::Args;
use crate::config::Parameters;
use crate::core::{FitnessContext, FitnessLandscape, HostId, HostNetwork, IntrahostModel};
use crate::errors::Result;
use crate::readwrite::{Inoculum, LandscapeIO, NetworkIO, read_sequences_from_file};

/// Loads a simulation setup and projects the pathogen population size of every inoculated host.
pub struct Runner {
    args: Args,
    model: IntrahostModel,
    network: HostNetwork,
    hosts: BTreeMap<HostId, HostState>,
}

struct HostState {
    pop_size: usize,
    context: Option<FitnessContext>,
}

impl Runner {
    pub fn new(args: Args) -> Result<Runner> {
        Self::setup_logger(&args);
        #[cfg(feature = "parallel")]
        Self::setup_rayon(&args);

        let parameters = Parameters::read_from_file(&args.settings)?;
        log::info!("Loaded settings from {}", args.settings);

        let model = parameters.model.create_model()?;
        let landscape = match &parameters.fitness {
            Some(input) => Some(FitnessLandscape::read_from_file(&input.path, input.basis)?),
            None => None,
        };
        let network = match &parameters.network {
            Some(path) => HostNetwork::read_from_file(path)?,
            None => HostNetwork::new(),
        };
        let inoculum = match &parameters.sequences {
            Some(path) => read_sequences_from_file(path, &parameters.translation_table()?)?,
            None => Inoculum::new(),
        };
        let hosts = Self::create_hosts(inoculum, landscape.as_ref())?;

        Ok(Self {
            args,
            model,
            network,
            hosts,
        })
    }

    pub fn start(&mut self) {
        self.run();
        self.finish();
    }

    fn create_hosts(
        inoculum: Inoculum,
        landscape: Option<&FitnessLandscape>,
    ) -> Result<BTreeMap<HostId, HostState>> {
        inoculum
            .into_iter()
            .map(|(host, sequences)| {
                let context = landscape
                    .map(|landscape| FitnessContext::from_population(landscape, &sequences))
                    .transpose()?;
                let state = HostState {
                    pop_size: sequences.len(),
                    context,
                };
                Ok((host, state))
            })
            .collect()
    }

    fn run(&mut self) {
        let bar = match self.args.disable_progress_bar {
            true => None,
            false => {
                let bar = ProgressBar::new(self.args.generations as u64);
                bar.set_style(
                    ProgressStyle::default_bar()
                        .template("[{bar:40}] {pos:>7}/{len:7} [{elapsed_precise}] {msg}")
                        .expect("Unable to create template.")
                        .progress_chars("=> "),
                );
                Some(bar)
            }
        };

        for generation in 1..=self.args.generations {
            let inputs: Vec<(usize, Option<FitnessContext>)> = self
                .hosts
                .values()
                .map(|state| (state.pop_size, state.context.clone()))
                .collect();
            let next_sizes = self.model.next_pathogen_pop_sizes(&inputs);

            for ((host, state), next) in self.hosts.iter_mut().zip(next_sizes) {
                match next {
                    Some(size) => state.pop_size = size,
                    None => log::debug!(
                        "generation={generation} host={host}: next population size not computable, keeping {}",
                        state.pop_size
                    ),
                }
            }

            let pop_sizes = self.hosts.values().map(|state| state.pop_size).collect_vec();
            log::info!(
                r###"
    generation={generation}
    population_sizes={pop_sizes:?}"###
            );

            if let Some(bar) = &bar {
                bar.set_position(generation as u64);
                bar.set_message(format!("{pop_sizes:?}"));
            }
        }

        if let Some(bar) = bar {
            bar.finish_with_message("Done.");
        }
    }

    fn finish(&self) {
        println!(
            "Model '{}' (max population {}), {} hosts in network",
            self.model.name(),
            self.model.max_pathogen_pop_size(),
            self.network.connected_pop_size()
        );
        for (host, state) in &self.hosts {
            let neighbors = self
                .network
                .neighbors(*host)
                .into_iter()
                .map(|(to, weight)| format!("{to}:{weight}"))
                .join(", ");
            println!(
                "host {host}: population {} -> [{neighbors}]",
                state.pop_size
            );
        }
    }

    /// Setup logging level and file
    fn setup_logger(args: &Args) {
        let log_level = match args.verbose {
            0 => log::LevelFilter::Info,
            1 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        };
        simple_logging::log_to_file(args.log_file.as_str(), log_level).unwrap_or_else(|_| {
            eprintln!("Unable to open log file.");
            std::process::exit(1);
        });
    }

    /// Setup rayon thread pool
    #[cfg(feature = "parallel")]
    fn setup_rayon(args: &Args) {
        if let Some(n_threads) = args.threads {
            println!("Setting number of threads to {}.", n_threads);
            rayon::ThreadPoolBuilder::new()
                .num_threads(n_threads)
                .build_global()
                .unwrap_or_else(|_| {
                    eprintln!("Unable to set number of threads.");
                    std::process::exit(1);
                });
        }
    }
}
