//! up-restutil CLI: put, copy, dump, diff and sync resources of REST collections.

use clap::Parser;
use log::{debug, error};
use std::process::ExitCode;
use std::time::Instant;
use up_restutil::engine::arg_parser::Cli;
use up_restutil::engine::handle_run;

fn main() -> ExitCode {
    let start_time = Instant::now();
    let cli = Cli::parse();
    match handle_run(&cli) {
        Ok(()) => {
            debug!("Total time: {:?}", start_time.elapsed());
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
