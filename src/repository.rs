//! # Local Repository Access
//!
//! Everything the engine does to a working copy goes through the
//! [`GitOperations`] trait. [`SystemGit`] implements it with the system `git`
//! executable (see [`crate::git`]); tests substitute mocks that record calls
//! instead of touching disk.
//!
//! [`LocalRepo`] is the snapshot of one working copy: its remotes in config
//! order, its local branches with their upstreams, and the checked-out
//! branch. It is discovered fresh on every scan and never persisted.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::git;

/// A configured remote, in the order it appears in the repository config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remote {
    pub name: String,
    pub url: String,
}

/// A local branch and the remote-tracking ref it follows, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalBranch {
    pub name: String,
    pub upstream: Option<String>,
}

/// Snapshot of one local working copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalRepo {
    pub path: PathBuf,
    pub remotes: Vec<Remote>,
    pub branches: Vec<LocalBranch>,
    /// `None` when HEAD is detached.
    pub current_branch: Option<String>,
}

impl LocalRepo {
    pub fn branch_names(&self) -> impl Iterator<Item = &str> {
        self.branches.iter().map(|b| b.name.as_str())
    }
}

/// Last path component as an owned string.
pub fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Trait for git operations - allows mocking in tests
///
/// Every method takes the working-copy root. Mutating methods are only
/// called on the non-dry-run path; callers are responsible for that gate.
pub trait GitOperations: Send + Sync {
    /// Fails with [`Error::InvalidRepository`] unless `repo` is a working copy.
    fn open(&self, repo: &Path) -> Result<()>;

    fn clone_repo(&self, url: &str, target_dir: &Path) -> Result<()>;

    fn remotes(&self, repo: &Path) -> Result<Vec<Remote>>;

    fn local_branches(&self, repo: &Path) -> Result<Vec<LocalBranch>>;

    fn current_branch(&self, repo: &Path) -> Result<Option<String>>;

    /// True when there are staged, unstaged or untracked changes.
    fn is_dirty(&self, repo: &Path) -> Result<bool>;

    /// Commits reachable from `branch` but not from `upstream`.
    fn ahead_count(&self, repo: &Path, branch: &str, upstream: &str) -> Result<usize>;

    fn fetch_all(&self, repo: &Path) -> Result<()>;

    fn pull(&self, repo: &Path) -> Result<()>;

    fn checkout(&self, repo: &Path, branch: &str) -> Result<()>;

    /// Create `branch` from HEAD and check it out.
    fn create_branch(&self, repo: &Path, branch: &str) -> Result<()>;

    fn merge(&self, repo: &Path, rev: &str) -> Result<()>;

    fn rebase(&self, repo: &Path, onto: &str) -> Result<()>;

    /// `force == false` refuses to delete branches that are not fully merged.
    fn delete_branch(&self, repo: &Path, branch: &str, force: bool) -> Result<()>;

    fn add(&self, repo: &Path, path: &str) -> Result<()>;

    /// Commit the index; an empty index still produces a commit.
    fn commit(&self, repo: &Path, message: &str) -> Result<()>;

    /// Force-push `branch` to `remote` and set it as upstream.
    fn force_push(&self, repo: &Path, remote: &str, branch: &str) -> Result<()>;

    /// True when HEAD's tree differs from `rev`.
    fn differs_from(&self, repo: &Path, rev: &str) -> Result<bool>;

    fn last_commit_time(&self, repo: &Path) -> Result<DateTime<Utc>>;

    /// Load a full snapshot of the working copy.
    fn load(&self, repo: &Path) -> Result<LocalRepo> {
        self.open(repo)?;
        Ok(LocalRepo {
            path: repo.to_path_buf(),
            remotes: self.remotes(repo)?,
            branches: self.local_branches(repo)?,
            current_branch: self.current_branch(repo)?,
        })
    }
}

/// The default implementation of `GitOperations`, which uses the system's
/// `git` command to perform real Git operations.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemGit;

impl GitOperations for SystemGit {
    fn open(&self, repo: &Path) -> Result<()> {
        git::verify_repository(repo)
    }

    fn clone_repo(&self, url: &str, target_dir: &Path) -> Result<()> {
        git::clone(url, target_dir)
    }

    fn remotes(&self, repo: &Path) -> Result<Vec<Remote>> {
        // Exit code 1 means no remote.*.url keys at all.
        let output = git::run_unchecked(repo, &["config", "--get-regexp", r"^remote\..*\.url$"])?;
        match output.code {
            Some(0) => Ok(parse_remotes(&output.stdout)),
            Some(1) => Ok(Vec::new()),
            _ => Err(Error::VcsOperation {
                command: "config --get-regexp".to_string(),
                path: repo.to_path_buf(),
                branch: None,
                stderr: output.stderr,
            }),
        }
    }

    fn local_branches(&self, repo: &Path) -> Result<Vec<LocalBranch>> {
        let raw = git::run(
            repo,
            &[
                "for-each-ref",
                "--format=%(refname:short)%09%(upstream:short)",
                "refs/heads",
            ],
        )?;
        Ok(parse_branches(&raw))
    }

    fn current_branch(&self, repo: &Path) -> Result<Option<String>> {
        let output = git::run_unchecked(repo, &["symbolic-ref", "--quiet", "--short", "HEAD"])?;
        Ok(output
            .success()
            .then_some(output.stdout)
            .filter(|name| !name.is_empty()))
    }

    fn is_dirty(&self, repo: &Path) -> Result<bool> {
        let status = git::run(repo, &["status", "--porcelain", "--untracked-files=normal"])?;
        Ok(!status.is_empty())
    }

    fn ahead_count(&self, repo: &Path, branch: &str, upstream: &str) -> Result<usize> {
        let range = format!("{upstream}..{branch}");
        let raw = git::run(repo, &["rev-list", "--count", &range])
            .map_err(|e| e.on_branch(branch))?;
        raw.parse().map_err(|_| Error::VcsOperation {
            command: format!("rev-list --count {range}"),
            path: repo.to_path_buf(),
            branch: Some(branch.to_string()),
            stderr: format!("unexpected count '{raw}'"),
        })
    }

    fn fetch_all(&self, repo: &Path) -> Result<()> {
        git::run(repo, &["fetch", "--all"]).map(drop)
    }

    fn pull(&self, repo: &Path) -> Result<()> {
        git::run(repo, &["pull"]).map(drop)
    }

    fn checkout(&self, repo: &Path, branch: &str) -> Result<()> {
        git::run(repo, &["checkout", branch])
            .map(drop)
            .map_err(|e| e.on_branch(branch))
    }

    fn create_branch(&self, repo: &Path, branch: &str) -> Result<()> {
        git::run(repo, &["checkout", "-b", branch])
            .map(drop)
            .map_err(|e| e.on_branch(branch))
    }

    fn merge(&self, repo: &Path, rev: &str) -> Result<()> {
        git::run(repo, &["merge", "--no-edit", rev]).map(drop).map_err(|e| {
            // Leave the working copy usable for the next branch.
            let _ = git::run(repo, &["merge", "--abort"]);
            e
        })
    }

    fn rebase(&self, repo: &Path, onto: &str) -> Result<()> {
        git::run(repo, &["rebase", onto]).map(drop).map_err(|e| {
            let _ = git::run(repo, &["rebase", "--abort"]);
            e
        })
    }

    fn delete_branch(&self, repo: &Path, branch: &str, force: bool) -> Result<()> {
        let flag = if force { "-D" } else { "-d" };
        git::run(repo, &["branch", flag, branch])
            .map(drop)
            .map_err(|e| e.on_branch(branch))
    }

    fn add(&self, repo: &Path, path: &str) -> Result<()> {
        git::run(repo, &["add", path]).map(drop)
    }

    fn commit(&self, repo: &Path, message: &str) -> Result<()> {
        git::run(repo, &["commit", "--allow-empty", "-m", message]).map(drop)
    }

    fn force_push(&self, repo: &Path, remote: &str, branch: &str) -> Result<()> {
        git::run(repo, &["push", "--force", "--set-upstream", remote, branch])
            .map(drop)
            .map_err(|e| e.on_branch(branch))
    }

    fn differs_from(&self, repo: &Path, rev: &str) -> Result<bool> {
        let output = git::run_unchecked(repo, &["diff", "--quiet", rev, "HEAD"])?;
        match output.code {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(Error::VcsOperation {
                command: format!("diff --quiet {rev} HEAD"),
                path: repo.to_path_buf(),
                branch: None,
                stderr: output.stderr,
            }),
        }
    }

    fn last_commit_time(&self, repo: &Path) -> Result<DateTime<Utc>> {
        let raw = git::run(repo, &["log", "-1", "--format=%ct"])?;
        git::parse_commit_time(&raw, repo)
    }
}

/// Parse `git config --get-regexp ^remote\..*\.url$` output.
///
/// Lines look like `remote.origin.url https://host/user/repo.git`; remote
/// names may themselves contain dots.
pub fn parse_remotes(raw: &str) -> Vec<Remote> {
    raw.lines()
        .filter_map(|line| {
            let (key, url) = line.split_once(char::is_whitespace)?;
            let name = key.strip_prefix("remote.")?.strip_suffix(".url")?;
            Some(Remote {
                name: name.to_string(),
                url: url.trim().to_string(),
            })
        })
        .collect()
}

/// Parse `for-each-ref --format=%(refname:short)%09%(upstream:short)` output.
pub fn parse_branches(raw: &str) -> Vec<LocalBranch> {
    raw.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let (name, upstream) = line.split_once('\t').unwrap_or((line, ""));
            let upstream = upstream.trim();
            LocalBranch {
                name: name.trim().to_string(),
                upstream: (!upstream.is_empty()).then(|| upstream.to_string()),
            }
        })
        .collect()
}
