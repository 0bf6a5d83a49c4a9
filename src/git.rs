//! Thin wrappers over the system `git` executable.
//!
//! Every function shells out to `git`, so authentication is whatever the
//! user already has configured: SSH keys from `~/.ssh/`, credential
//! helpers, or tokens stored in `~/.gitconfig`.

use std::path::Path;
use std::process::{Command, Output};

use chrono::{DateTime, TimeZone, Utc};
use log::debug;

use crate::error::{Error, Result};

/// Captured result of a git invocation that is allowed to exit non-zero.
#[derive(Debug, Clone)]
pub struct GitOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl GitOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

fn spawn(repo: &Path, args: &[&str]) -> Result<Output> {
    debug!("git -C {} {}", repo.display(), args.join(" "));
    Command::new("git")
        .arg("-C")
        .arg(repo)
        .args(args)
        .env("GIT_TERMINAL_PROMPT", "0")
        .output()
        .map_err(|e| Error::VcsOperation {
            command: args.first().copied().unwrap_or_default().to_string(),
            path: repo.to_path_buf(),
            branch: None,
            stderr: format!("could not run git: {e}"),
        })
}

/// Run git in `repo` and return trimmed stdout, failing on a non-zero exit.
pub fn run(repo: &Path, args: &[&str]) -> Result<String> {
    let output = spawn(repo, args)?;
    if !output.status.success() {
        return Err(Error::VcsOperation {
            command: args.join(" "),
            path: repo.to_path_buf(),
            branch: None,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Run git in `repo` and hand back the exit code instead of failing.
pub fn run_unchecked(repo: &Path, args: &[&str]) -> Result<GitOutput> {
    let output = spawn(repo, args)?;
    Ok(GitOutput {
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
}

/// Clone `url` into `target_dir`.
///
/// The parent directory is created if needed. Authentication failures are
/// rewritten into a message that tells the user what to check.
pub fn clone(url: &str, target_dir: &Path) -> Result<()> {
    if let Some(parent) = target_dir.parent() {
        std::fs::create_dir_all(parent).map_err(|e| Error::io_at(parent, e))?;
    }

    debug!("git clone {} {}", url, target_dir.display());
    let output = Command::new("git")
        .arg("clone")
        .arg(url)
        .arg(target_dir)
        .env("GIT_TERMINAL_PROMPT", "0")
        .output()
        .map_err(|e| Error::VcsOperation {
            command: "clone".to_string(),
            path: target_dir.to_path_buf(),
            branch: None,
            stderr: e.to_string(),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = if stderr.contains("Authentication failed")
            || stderr.contains("Permission denied")
            || stderr.contains("Could not read from remote repository")
        {
            format!(
                "Authentication failed. Make sure you have access to the repository.\n\
                For private repos, ensure you have an SSH key in ssh-agent or a \
                credential helper configured.\n\
                Error: {}",
                stderr.trim()
            )
        } else {
            stderr.trim().to_string()
        };
        return Err(Error::VcsOperation {
            command: "clone".to_string(),
            path: target_dir.to_path_buf(),
            branch: None,
            stderr,
        });
    }
    Ok(())
}

/// Check that `path` is itself the root of a git working copy.
///
/// The `.git` entry is addressed directly so a broken repository nested
/// inside a healthy one is not mistaken for its parent.
pub fn verify_repository(path: &Path) -> Result<()> {
    let git_dir = path.join(".git");
    if !git_dir.exists() {
        return Err(Error::InvalidRepository {
            path: path.to_path_buf(),
        });
    }
    let output = Command::new("git")
        .arg("--git-dir")
        .arg(&git_dir)
        .args(["rev-parse", "--git-dir"])
        .output()
        .map_err(|e| Error::io_at(path, e))?;
    if output.status.success() {
        Ok(())
    } else {
        Err(Error::InvalidRepository {
            path: path.to_path_buf(),
        })
    }
}

/// Parse `git log --format=%ct` output into a UTC timestamp.
pub fn parse_commit_time(raw: &str, repo: &Path) -> Result<DateTime<Utc>> {
    let invalid = || Error::VcsOperation {
        command: "log".to_string(),
        path: repo.to_path_buf(),
        branch: None,
        stderr: format!("unexpected commit timestamp '{raw}'"),
    };
    let seconds: i64 = raw.trim().parse().map_err(|_| invalid())?;
    Utc.timestamp_opt(seconds, 0).single().ok_or_else(invalid)
}

/// Repository name from a clone URL.
///
/// Strips a trailing `.git` or `.git/`, splits on `/` and returns the last
/// segment. Already-bare names are returned unchanged.
///
/// ```
/// use git_mirror::git::extract_repo_name;
///
/// assert_eq!(extract_repo_name("https://host/user/repo.git"), "repo");
/// assert_eq!(extract_repo_name("git@host:user/repo.git/"), "repo");
/// assert_eq!(extract_repo_name("repo"), "repo");
/// ```
pub fn extract_repo_name(url: &str) -> &str {
    let trimmed = url
        .strip_suffix(".git/")
        .or_else(|| url.strip_suffix(".git"))
        .unwrap_or(url);
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}
