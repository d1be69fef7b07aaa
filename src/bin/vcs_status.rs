//! vcs-status CLI Binary
//!
//! Command-line front end for the version-control status cache.

use clap::Parser;
use std::process;
use vcs_status_cache::cli::{run, Cli};

fn main() {
    let cli = Cli::parse();

    match run(&cli) {
        Ok(output) => {
            println!("{}", output);
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}
