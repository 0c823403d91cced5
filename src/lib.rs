//! Core library entry for the `repo-intel` CLI.
//!
//! `repo-intel` walks a workspace of JavaScript/TypeScript repositories,
//! extracts structured facts about each one (API surface, data model,
//! dependencies, environment, quality, domain vocabulary) and persists them
//! as a current view plus immutable, diffable snapshots under
//! `<root>/.repo-intel`.

pub mod adapters;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod diff;
pub mod error;
pub mod extract;
pub mod graph;
pub mod logging;
pub mod model;
pub mod ports;
pub mod snapshot;
pub mod store;
pub mod summarize;
pub mod survey;

use clap::Parser;

/// Run the CLI with the provided arguments.
///
/// # Errors
///
/// Returns an error string when argument parsing fails or command execution fails.
pub fn run<I, T>(args: I) -> Result<(), String>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = cli::Cli::try_parse_from(args).map_err(|err| err.to_string())?;
    commands::dispatch(&cli.command)
}
