//! # git-mirror CLI
//!
//! This is the binary entry point for the `git-mirror` command-line tool.
//!
//! Its primary responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Setting up logging and colour once, before any command runs.
//! - Resolving configuration and credentials, and turning failures there into
//!   actionable errors with a non-zero exit.
//!
//! Everything else lives in the `git_mirror` library; the binary is a thin
//! wrapper around it.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}
