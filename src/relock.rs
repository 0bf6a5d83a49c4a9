//! # Dependency Relock
//!
//! Refreshes a repository's lock file on a throwaway branch and opens a
//! pull/merge request when the result differs from the default branch.
//!
//! Per repository:
//!
//! 1. check out the default branch and pull
//! 2. create the update branch, deleting a stale one first if needed
//! 3. run the lock commands, stage the lock file and commit
//! 4. fetch, then compare with `origin/<default>`: push and request a
//!    review when different, delete the branch otherwise
//!
//! Returning to the default branch is owned by a drop guard, so it also
//! happens when a lock command fails or a step panics.

use std::path::Path;
use std::process::Command;

use log::{debug, info, warn};

use crate::defaults::{DEFAULT_REMOTE, DEPENDENCY_UPDATE_BRANCH};
use crate::error::{Error, Result};
use crate::executor::Status;
use crate::host::{HostClient, MergeRequest};
use crate::output::Report;
use crate::repository::{dir_name, GitOperations};

/// Runs external programs inside a working copy.
pub trait CommandRunner: Send + Sync {
    fn run(&self, dir: &Path, program: &str, args: &[String]) -> Result<()>;
}

/// Spawns the program as a child process and waits for it.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, dir: &Path, program: &str, args: &[String]) -> Result<()> {
        debug!("{} {} (in {})", program, args.join(" "), dir.display());
        let output = Command::new(program)
            .args(args)
            .current_dir(dir)
            .output()
            .map_err(|e| Error::Subprocess {
                program: program.to_string(),
                message: e.to_string(),
            })?;
        if output.status.success() {
            Ok(())
        } else {
            Err(Error::Subprocess {
                program: format!("{} {}", program, args.join(" ")),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

/// What to run and what to call things.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelockPlan {
    /// Commands run in order; each is program followed by arguments.
    pub commands: Vec<Vec<String>>,
    pub lock_file: String,
    /// Marks a repository as eligible when present at its root.
    pub manifest: String,
    pub branch: String,
    pub commit_message: String,
    pub title: String,
}

impl RelockPlan {
    pub fn poetry() -> Self {
        Self {
            commands: vec![
                vec!["poetry".to_string(), "install".to_string()],
                vec!["poetry".to_string(), "update".to_string()],
            ],
            lock_file: "poetry.lock".to_string(),
            manifest: "pyproject.toml".to_string(),
            branch: DEPENDENCY_UPDATE_BRANCH.to_string(),
            commit_message: "Update dependencies".to_string(),
            title: "Update Poetry lock file".to_string(),
        }
    }
}

/// Checks out `branch` when dropped.
struct ReturnToBranch<'a> {
    git: &'a dyn GitOperations,
    repo: &'a Path,
    branch: &'a str,
}

impl Drop for ReturnToBranch<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.git.checkout(self.repo, self.branch) {
            warn!(
                "Could not return {} to '{}': {}",
                self.repo.display(),
                self.branch,
                e
            );
        }
    }
}

pub struct DependencyRelocker<'a> {
    git: &'a dyn GitOperations,
    host: &'a dyn HostClient,
    runner: &'a dyn CommandRunner,
    plan: &'a RelockPlan,
    owner: &'a str,
    reviewer: Option<&'a str>,
    dry_run: bool,
}

impl<'a> DependencyRelocker<'a> {
    pub fn new(
        git: &'a dyn GitOperations,
        host: &'a dyn HostClient,
        runner: &'a dyn CommandRunner,
        plan: &'a RelockPlan,
        owner: &'a str,
    ) -> Self {
        Self {
            git,
            host,
            runner,
            plan,
            owner,
            reviewer: None,
            dry_run: false,
        }
    }

    pub fn reviewer(mut self, reviewer: Option<&'a str>) -> Self {
        self.reviewer = reviewer;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn relock(&self, repo: &Path, report: &mut Report) -> Result<Status> {
        let full_name = format!("{}/{}", self.owner, dir_name(repo));
        let main = match self.host.default_branch(&full_name) {
            Ok(branch) => branch,
            Err(e) => {
                report.danger(format!(
                    "Failed to retrieve info on repository {full_name}: {e}"
                ));
                return Ok(Status::Failed);
            }
        };

        if self.dry_run {
            report.plain(format!(
                "Would have updated {} in {} on branch '{}'.",
                self.plan.lock_file,
                repo.display(),
                self.plan.branch
            ));
            return Ok(Status::Success);
        }

        self.git.checkout(repo, &main)?;
        let _restore = ReturnToBranch {
            git: self.git,
            repo,
            branch: &main,
        };
        self.git.pull(repo)?;

        if let Err(e) = self.git.create_branch(repo, &self.plan.branch) {
            debug!("Recreating {}: {}", self.plan.branch, e);
            self.git.delete_branch(repo, &self.plan.branch, true)?;
            self.git.create_branch(repo, &self.plan.branch)?;
        }

        for command in &self.plan.commands {
            if let Some((program, args)) = command.split_first() {
                self.runner.run(repo, program, args)?;
            }
        }
        self.git.add(repo, &self.plan.lock_file)?;
        self.git.commit(repo, &self.plan.commit_message)?;
        self.git.fetch_all(repo)?;

        let upstream_main = format!("{DEFAULT_REMOTE}/{main}");
        if self.git.differs_from(repo, &upstream_main)? {
            self.git.force_push(repo, DEFAULT_REMOTE, &self.plan.branch)?;
            let url = self.host.create_pull_or_merge_request(&MergeRequest {
                repo: full_name,
                source_branch: self.plan.branch.clone(),
                target_branch: main.clone(),
                title: self.plan.title.clone(),
                reviewer: self.reviewer.map(str::to_string),
            })?;
            info!("Opened {} for {}", url, repo.display());
            report.success(format!("Pull request created: {url}"));
            Ok(Status::Success)
        } else {
            self.git.checkout(repo, &main)?;
            self.git.delete_branch(repo, &self.plan.branch, true)?;
            report.plain(format!(
                "No dependency changes for {full_name}; removed branch '{}'.",
                self.plan.branch
            ));
            Ok(Status::Skipped)
        }
    }
}
