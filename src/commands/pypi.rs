//! # PyPI Status Command
//!
//! Lists local repositories that are published on PyPI and how far the
//! latest commit is ahead of the latest release.

use anyhow::Result;
use clap::Args;

use git_mirror::pypi::PyPiClient;

use super::{Context, HostArgs, RunOptions};

/// Compare local commits with the latest PyPI releases
#[derive(Args, Debug)]
pub struct PypiStatusArgs {
    #[command(flatten)]
    pub host: HostArgs,

    /// Only report packages whose PyPI author matches (overrides pypi_owner_name)
    #[arg(long, value_name = "NAME")]
    pub owner: Option<String>,
}

pub fn execute(args: PypiStatusArgs, ctx: &Context) -> Result<()> {
    let resolved = args.host.resolve(ctx)?;
    let owner = args.owner.or_else(|| resolved.config.pypi_owner_name.clone());
    let workspace = resolved.workspace(ctx, &RunOptions::default())?;
    let registry = PyPiClient::new()?;
    let show_progress = console::Term::stdout().is_term();
    workspace.pypi_status(&registry, owner.as_deref(), show_progress);
    Ok(())
}
