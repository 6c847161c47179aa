//! Binary entrypoint for the `sitecloak` CLI.

use std::process::ExitCode;

fn main() -> ExitCode {
    match sitecloak::run(std::env::args_os()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
