//! Binary entrypoint for the `repo-intel` CLI.

use std::process::ExitCode;

fn main() -> ExitCode {
    repo_intel::logging::init_logger();
    match repo_intel::run(std::env::args()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("repo-intel failed: {err}");
            ExitCode::FAILURE
        }
    }
}
