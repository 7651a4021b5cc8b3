//! # grabpack CLI
//!
//! This is the binary entry point for the `grabpack` command-line tool.
//!
//! Its primary responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Running the configuration through the library.
//! - Translating the outcome into a process exit code (see
//!   [`grabpack::exit_codes`]).

mod cli;

use std::process::ExitCode;

use clap::Parser;
use grabpack::exit_codes;

fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    match cli.execute() {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS),
        Err(e) => {
            let code = match e.downcast_ref::<grabpack::Error>() {
                Some(err) if err.is_up_to_date() => return ExitCode::from(err.exit_code()),
                Some(err) => err.exit_code(),
                None => exit_codes::FAILURE,
            };
            eprintln!("error: {:#}", e);
            ExitCode::from(code)
        }
    }
}
