//! # Repository Commands
//!
//! The commands that work on the whole set of repositories at once:
//! listing, cloning, pulling, reporting local changes, reconciling local
//! directories with the host, CI status, account summary and `sync-config`.
//!
//! `local-changes` and `pull-all` need no host credentials. Every other
//! command here builds a [`git_mirror::manager::MirrorManager`] and so needs
//! a user name and an access token.

use anyhow::Result;
use clap::Args;

use super::{Context, HostArgs, RunOptions};

/// Commands that only need a host section.
#[derive(Args, Debug)]
pub struct HostOnlyArgs {
    #[command(flatten)]
    pub host: HostArgs,
}

/// Batch commands over local repositories.
#[derive(Args, Debug)]
pub struct BatchArgs {
    #[command(flatten)]
    pub host: HostArgs,

    #[command(flatten)]
    pub run: RunOptions,
}

/// Clone every repository into the target directory
#[derive(Args, Debug)]
pub struct CloneAllArgs {
    #[command(flatten)]
    pub batch: BatchArgs,

    /// GitLab group whose projects (including subgroups) to clone instead
    #[arg(long, value_name = "ID")]
    pub group_id: Option<u64>,
}

pub fn list_repos(args: HostOnlyArgs, ctx: &Context) -> Result<()> {
    let resolved = args.host.resolve(ctx)?;
    let manager = resolved.manager(ctx, &RunOptions::default())?;
    manager.list_repos();
    Ok(())
}

pub fn clone_all(args: CloneAllArgs, ctx: &Context) -> Result<()> {
    let resolved = args.batch.host.resolve(ctx)?;
    let group = args
        .group_id
        .filter(|id| *id != 0)
        .or_else(|| resolved.config.group());
    let manager = resolved.manager_creating_base(ctx, &args.batch.run)?;
    manager.clone_all(group);
    Ok(())
}

pub fn pull_all(args: BatchArgs, ctx: &Context) -> Result<()> {
    let resolved = args.host.resolve(ctx)?;
    resolved.workspace(ctx, &args.run)?.pull_all();
    Ok(())
}

pub fn local_changes(args: HostOnlyArgs, ctx: &Context) -> Result<()> {
    let resolved = args.host.resolve(ctx)?;
    resolved
        .workspace(ctx, &RunOptions::default())?
        .local_changes();
    Ok(())
}

pub fn not_repo(args: HostOnlyArgs, ctx: &Context) -> Result<()> {
    let resolved = args.host.resolve(ctx)?;
    resolved.manager(ctx, &RunOptions::default())?.not_repo();
    Ok(())
}

pub fn build_status(args: HostOnlyArgs, ctx: &Context) -> Result<()> {
    let resolved = args.host.resolve(ctx)?;
    resolved.manager(ctx, &RunOptions::default())?.build_status();
    Ok(())
}

pub fn show_account(args: HostOnlyArgs, ctx: &Context) -> Result<()> {
    let resolved = args.host.resolve(ctx)?;
    resolved
        .manager(ctx, &RunOptions::default())?
        .show_account()?;
    Ok(())
}

pub fn sync_config(args: HostOnlyArgs, ctx: &Context) -> Result<()> {
    let resolved = args.host.resolve(ctx)?;
    let manager = resolved.manager(ctx, &RunOptions::default())?;
    manager.sync_config(&ctx.store(), &resolved.host_name)?;
    Ok(())
}
