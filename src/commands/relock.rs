//! # Poetry Relock Command
//!
//! For every local repository with a `pyproject.toml`, refresh `poetry.lock`
//! on a `dependency-update` branch and open a pull or merge request when the
//! lock file changed.

use anyhow::Result;
use clap::Args;

use git_mirror::relock::{RelockPlan, SystemRunner};

use super::{Context, HostArgs, RunOptions};

/// Refresh Poetry lock files and open pull requests for changes
#[derive(Args, Debug)]
pub struct PoetryRelockArgs {
    #[command(flatten)]
    pub host: HostArgs,

    #[command(flatten)]
    pub run: RunOptions,

    /// Reviewer for the pull requests (overrides reviewer in the config)
    #[arg(long, value_name = "LOGIN")]
    pub reviewer: Option<String>,
}

pub fn execute(args: PoetryRelockArgs, ctx: &Context) -> Result<()> {
    let resolved = args.host.resolve(ctx)?;
    let reviewer = args.reviewer.or_else(|| resolved.config.reviewer.clone());
    let manager = resolved.manager(ctx, &args.run)?;
    manager.relock(&RelockPlan::poetry(), &SystemRunner, reviewer.as_deref());
    Ok(())
}
