//! CLI argument parsing and command dispatch

use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

use git_mirror::defaults::{default_config_path, CONFIG_PATH_ENV};
use git_mirror::output::OutputConfig;

use crate::commands::{self, Context};

/// git-mirror - Keep a local mirror of every repository you own on GitHub or GitLab
#[derive(Parser, Debug)]
#[command(name = "git-mirror")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace, off)
    #[arg(long, global = true, value_name = "LEVEL", default_value = "warn")]
    log_level: String,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Path to the configuration file (default: ~/git_mirror.toml)
    #[arg(long, global = true, value_name = "FILE", env = CONFIG_PATH_ENV)]
    config_path: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create or update a host's section in the config file
    Init(commands::init::InitArgs),

    /// Show configured hosts and available external tools
    ListConfig(commands::list_config::ListConfigArgs),

    /// Show a summary of the account
    ShowAccount(commands::repos::HostOnlyArgs),

    /// List repositories on the host
    ListRepos(commands::repos::HostOnlyArgs),

    /// Clone every repository into the target directory
    CloneAll(commands::repos::CloneAllArgs),

    /// Pull the latest changes in every local repository
    PullAll(commands::repos::BatchArgs),

    /// Report uncommitted changes and unpushed commits
    LocalChanges(commands::repos::HostOnlyArgs),

    /// Find local directories that do not match a repository you own
    NotRepo(commands::repos::HostOnlyArgs),

    /// Merge or rebase the default branch into every other local branch
    UpdateFromMain(commands::branches::UpdateFromMainArgs),

    /// Delete local branches that no longer exist on the host
    PruneAll(commands::branches::PruneAllArgs),

    /// Show the latest CI result for each repository
    BuildStatus(commands::repos::HostOnlyArgs),

    /// Record the account's repositories in the config file
    SyncConfig(commands::repos::HostOnlyArgs),

    /// Compare local commits with the latest PyPI releases
    PypiStatus(commands::pypi::PypiStatusArgs),

    /// Show how each project differs from its template
    CrossRepoReport(commands::cross_repo::CrossRepoArgs),

    /// Copy template files into each project
    CrossRepoSync(commands::cross_repo::CrossRepoSyncArgs),

    /// Add missing projects to the template map
    CrossRepoInit(commands::cross_repo::CrossRepoInitArgs),

    /// Refresh Poetry lock files and open pull requests for changes
    PoetryRelock(commands::relock::PoetryRelockArgs),

    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        self.init_logging();
        let ctx = Context {
            config_path: self.config_path.clone().unwrap_or_else(default_config_path),
            output: OutputConfig::from_env_and_flag(&self.color),
        };

        match self.command {
            Commands::Init(args) => commands::init::execute(args, &ctx),
            Commands::ListConfig(args) => commands::list_config::execute(args, &ctx),
            Commands::ShowAccount(args) => commands::repos::show_account(args, &ctx),
            Commands::ListRepos(args) => commands::repos::list_repos(args, &ctx),
            Commands::CloneAll(args) => commands::repos::clone_all(args, &ctx),
            Commands::PullAll(args) => commands::repos::pull_all(args, &ctx),
            Commands::LocalChanges(args) => commands::repos::local_changes(args, &ctx),
            Commands::NotRepo(args) => commands::repos::not_repo(args, &ctx),
            Commands::UpdateFromMain(args) => commands::branches::update_from_main(args, &ctx),
            Commands::PruneAll(args) => commands::branches::prune_all(args, &ctx),
            Commands::BuildStatus(args) => commands::repos::build_status(args, &ctx),
            Commands::SyncConfig(args) => commands::repos::sync_config(args, &ctx),
            Commands::PypiStatus(args) => commands::pypi::execute(args, &ctx),
            Commands::CrossRepoReport(args) => commands::cross_repo::report(args, &ctx),
            Commands::CrossRepoSync(args) => commands::cross_repo::sync(args, &ctx),
            Commands::CrossRepoInit(args) => commands::cross_repo::init(args, &ctx),
            Commands::PoetryRelock(args) => commands::relock::execute(args, &ctx),
            Commands::Completions(args) => commands::completions::execute(args),
        }
    }

    /// `-v` wins over `--log-level`; `RUST_LOG` wins over both.
    fn init_logging(&self) {
        let level = match self.verbose {
            0 => self.log_level.as_str(),
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        let env = env_logger::Env::default().default_filter_or(level);
        // A logger may already be installed when embedded in tests.
        let _ = env_logger::Builder::from_env(env)
            .format_timestamp(None)
            .try_init();
    }
}
