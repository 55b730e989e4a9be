use clap::Parser;

use contagion::args::Args;
use contagion::runner::Runner;

fn main() {
    let args = Args::parse();
    let mut runner = Runner::new(args).unwrap_or_else(|err| {
        eprintln!("{err}");
        std::process::exit(1);
    });
    runner.start();
}
