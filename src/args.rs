use clap::Parser;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// Path to settings (yaml file).
    #[clap(long)]
    pub settings: String,

    /// Number of generations to project.
    #[clap(short, long, default_value_t = 10)]
    pub generations: usize,

    /// Path to the log file.
    #[clap(long, default_value = "contagion.log")]
    pub log_file: String,

    /// Increase log verbosity.
    #[clap(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Number of threads used for per-host computations.
    #[clap(long)]
    pub threads: Option<usize>,

    /// Hide the progress bar.
    #[clap(long)]
    pub disable_progress_bar: bool,
}
