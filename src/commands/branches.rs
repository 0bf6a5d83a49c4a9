//! # Branch Commands
//!
//! `update-from-main` brings every non-default local branch up to date with
//! the default branch. `prune-all` deletes local branches that the host no
//! longer has, using git's safe delete so unmerged work is kept.

use anyhow::Result;
use clap::Args;

use super::{Context, HostArgs, RunOptions};

/// Merge or rebase the default branch into every other local branch
#[derive(Args, Debug)]
pub struct UpdateFromMainArgs {
    #[command(flatten)]
    pub host: HostArgs,

    #[command(flatten)]
    pub run: RunOptions,

    /// Rebase onto the default branch instead of merging it
    #[arg(long)]
    pub prefer_rebase: bool,
}

/// Delete local branches that no longer exist on the host
#[derive(Args, Debug)]
pub struct PruneAllArgs {
    #[command(flatten)]
    pub host: HostArgs,

    #[command(flatten)]
    pub run: RunOptions,

    /// Ask before each deletion instead of once for the whole batch
    #[arg(short, long)]
    pub interactive: bool,
}

pub fn update_from_main(args: UpdateFromMainArgs, ctx: &Context) -> Result<()> {
    let resolved = args.host.resolve(ctx)?;
    resolved
        .manager(ctx, &args.run)?
        .update_from_main(args.prefer_rebase);
    Ok(())
}

pub fn prune_all(args: PruneAllArgs, ctx: &Context) -> Result<()> {
    let resolved = args.host.resolve(ctx)?;
    resolved.manager(ctx, &args.run)?.prune_all(args.interactive);
    Ok(())
}
