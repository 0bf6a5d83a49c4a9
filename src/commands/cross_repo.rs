//! # Cross-Repository Template Commands
//!
//! Keep shared files (CI config, lint settings, licence) in step across
//! projects. Templates live under `global_template_dir`, one folder per
//! template, and `template_map.txt` assigns a template to each project.
//!
//! - `cross-repo-init` adds every local project missing from the map.
//! - `cross-repo-report` prints missing and differing files with diffs.
//! - `cross-repo-sync` copies template files into the projects.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use git_mirror::suggestions;

use super::{Context, HostArgs, Resolved, RunOptions};

/// Show how each project differs from its template
#[derive(Args, Debug)]
pub struct CrossRepoArgs {
    #[command(flatten)]
    pub host: HostArgs,

    /// Template directory (overrides global_template_dir)
    #[arg(long, value_name = "DIR")]
    pub template_dir: Option<PathBuf>,
}

/// Copy template files into each project
#[derive(Args, Debug)]
pub struct CrossRepoSyncArgs {
    #[command(flatten)]
    pub templates: CrossRepoArgs,

    #[command(flatten)]
    pub run: RunOptions,
}

/// Add missing projects to the template map
#[derive(Args, Debug)]
pub struct CrossRepoInitArgs {
    #[command(flatten)]
    pub templates: CrossRepoArgs,

    /// Assign the `default` template instead of leaving entries blank
    #[arg(long)]
    pub use_default: bool,
}

impl CrossRepoArgs {
    fn template_dir(&self, resolved: &Resolved) -> Result<PathBuf> {
        self.template_dir
            .clone()
            .or_else(|| resolved.config.template_dir())
            .ok_or_else(|| suggestions::template_dir_not_configured(&resolved.host_name))
    }
}

pub fn report(args: CrossRepoArgs, ctx: &Context) -> Result<()> {
    let resolved = args.host.resolve(ctx)?;
    let template_dir = args.template_dir(&resolved)?;
    resolved
        .workspace(ctx, &RunOptions::default())?
        .cross_repo_report(&template_dir)?;
    Ok(())
}

pub fn sync(args: CrossRepoSyncArgs, ctx: &Context) -> Result<()> {
    let resolved = args.templates.host.resolve(ctx)?;
    let template_dir = args.templates.template_dir(&resolved)?;
    resolved
        .workspace(ctx, &args.run)?
        .cross_repo_sync(&template_dir)?;
    Ok(())
}

pub fn init(args: CrossRepoInitArgs, ctx: &Context) -> Result<()> {
    let resolved = args.templates.host.resolve(ctx)?;
    let template_dir = args.templates.template_dir(&resolved)?;
    resolved
        .workspace(ctx, &RunOptions::default())?
        .cross_repo_init(&template_dir, args.use_default)?;
    Ok(())
}
