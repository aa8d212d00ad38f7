//! opchain CLI — declarative operation-pipeline runner.

use clap::Parser;
use opchain::cli::Cli;

fn main() {
    let cli = Cli::parse();
    opchain::cli::init_logging(cli.verbose);
    if let Err(e) = opchain::cli::dispatch(cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
