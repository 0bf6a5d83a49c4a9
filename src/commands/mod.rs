//! # CLI Command Implementations
//!
//! Each subcommand of `git-mirror` is implemented in one of these modules.
//!
//! ## Structure
//!
//! Each command module typically contains:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function (or one function per related subcommand) that
//!   takes the parsed `Args` and the shared [`Context`].
//!
//! Shared flags live here. [`HostArgs`] names the host and overrides its
//! config file section; [`RunOptions`] carries `--dry-run`, `--yes` and
//! `--single-threaded`. [`HostArgs::resolve`] merges both with the config
//! file and fails early, with a hint, when something required is missing.
//! This is the only place credentials are read.

pub mod branches;
pub mod completions;
pub mod cross_repo;
pub mod init;
pub mod list_config;
pub mod pypi;
pub mod relock;
pub mod repos;

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;

use git_mirror::config::{ConfigStore, HostConfig, TomlConfigStore};
use git_mirror::confirm::{Confirmer, FixedAnswer, TerminalConfirmer};
use git_mirror::defaults::token_variable;
use git_mirror::host::{self, HostKind, HostSettings};
use git_mirror::manager::{MirrorManager, Settings, Workspace};
use git_mirror::output::{Console, OutputConfig};
use git_mirror::repository::SystemGit;
use git_mirror::suggestions;

/// Global state every command receives.
#[derive(Debug, Clone)]
pub struct Context {
    pub config_path: PathBuf,
    pub output: OutputConfig,
}

impl Context {
    pub fn store(&self) -> TomlConfigStore {
        TomlConfigStore::new(&self.config_path)
    }

    pub fn console(&self) -> Console {
        Console::stdout(self.output.clone())
    }
}

/// Which host to work with, and per-run overrides of its config section.
#[derive(Args, Debug, Clone)]
pub struct HostArgs {
    /// Host section name in the config file (github, gitlab, selfhosted, ...)
    #[arg(long, value_name = "NAME", default_value = "github")]
    pub host: String,

    /// Account name on the host
    #[arg(long, value_name = "NAME")]
    pub user_name: Option<String>,

    /// Directory holding one clone per repository
    #[arg(long, value_name = "DIR")]
    pub target_dir: Option<PathBuf>,

    /// API flavour of the host (inferred from the host name by default)
    #[arg(long, value_enum)]
    pub host_type: Option<HostKind>,

    /// Base URL for self-hosted instances
    #[arg(long, value_name = "URL")]
    pub host_url: Option<String>,

    /// Include private repositories
    #[arg(long)]
    pub include_private: bool,

    /// Include forks
    #[arg(long)]
    pub include_forks: bool,
}

/// Behaviour flags for commands that change things.
#[derive(Args, Debug, Clone, Default)]
pub struct RunOptions {
    /// Show what would be done without changing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Do not ask for confirmation
    #[arg(short, long)]
    pub yes: bool,

    /// Process repositories one at a time
    #[arg(long)]
    pub single_threaded: bool,
}

/// A host section after flags and config file are merged.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub host_name: String,
    pub config: HostConfig,
    pub base_dir: PathBuf,
}

impl HostArgs {
    pub fn resolve(&self, ctx: &Context) -> Result<Resolved> {
        let loaded = ctx.store().load(&self.host)?;
        if loaded.is_none() && (self.user_name.is_none() || self.target_dir.is_none()) {
            return Err(suggestions::host_not_configured(&self.host, &ctx.config_path));
        }

        let mut config = loaded.unwrap_or_default();
        if let Some(user) = &self.user_name {
            config.user_name = Some(user.clone());
        }
        if let Some(dir) = &self.target_dir {
            config.target_dir = Some(dir.clone());
        }
        if let Some(kind) = self.host_type {
            config.host_type = Some(kind);
        }
        if let Some(url) = &self.host_url {
            config.host_url = Some(url.clone());
        }
        config.include_private |= self.include_private;
        config.include_forks |= self.include_forks;

        let base_dir = config
            .target_dir()
            .ok_or_else(|| suggestions::missing_setting(&self.host, "target directory", "--target-dir"))?;

        Ok(Resolved {
            host_name: self.host.clone(),
            config,
            base_dir,
        })
    }
}

impl Resolved {
    fn settings(&self, run: &RunOptions) -> Settings {
        Settings {
            base_dir: self.base_dir.clone(),
            user_login: self.config.user_name.clone().unwrap_or_default(),
            include_private: self.config.include_private,
            include_forks: self.config.include_forks,
            dry_run: run.dry_run,
            prompt_for_changes: !run.yes,
            single_threaded: run.single_threaded,
        }
    }

    /// Local-only commands. The base directory must exist.
    pub fn workspace(&self, ctx: &Context, run: &RunOptions) -> Result<Workspace> {
        if !self.base_dir.is_dir() {
            return Err(suggestions::target_dir_missing(&self.base_dir));
        }
        Ok(self.build_workspace(ctx, run))
    }

    fn build_workspace(&self, ctx: &Context, run: &RunOptions) -> Workspace {
        let confirmer: Arc<dyn Confirmer> = if run.yes {
            Arc::new(FixedAnswer(true))
        } else {
            Arc::new(TerminalConfirmer)
        };
        Workspace::new(
            Arc::new(SystemGit),
            ctx.console(),
            confirmer,
            self.settings(run),
        )
    }

    /// Commands that talk to the host. Needs a user name and a token.
    pub fn manager(&self, ctx: &Context, run: &RunOptions) -> Result<MirrorManager> {
        let workspace = self.workspace(ctx, run)?;
        self.connect(workspace)
    }

    /// Like [`Resolved::manager`] but tolerates a missing base directory,
    /// for `clone-all`.
    pub fn manager_creating_base(&self, ctx: &Context, run: &RunOptions) -> Result<MirrorManager> {
        if !run.dry_run && !self.base_dir.exists() {
            std::fs::create_dir_all(&self.base_dir)?;
        }
        self.connect(self.build_workspace(ctx, run))
    }

    fn connect(&self, workspace: Workspace) -> Result<MirrorManager> {
        if self.config.user_name.as_deref().unwrap_or_default().is_empty() {
            return Err(suggestions::missing_setting(
                &self.host_name,
                "user name",
                "--user-name",
            ));
        }
        let variable = token_variable(&self.host_name);
        let token = match env::var(&variable) {
            Ok(token) if !token.trim().is_empty() => token,
            _ => return Err(suggestions::missing_token(&self.host_name, &variable)),
        };

        let kind = self.config.kind(&self.host_name);
        let api_url = self
            .config
            .host_url
            .clone()
            .unwrap_or_else(|| kind.default_api_url().to_string());
        let client = host::connect(&HostSettings {
            kind,
            api_url,
            token,
        })?;
        Ok(MirrorManager::new(workspace, client))
    }
}
