//! Shared test utilities for integration and E2E tests.
//!
//! Tests that need real repositories build them with the system `git`
//! inside a temporary directory; they return early when `git` is not on
//! PATH.
//!
//! ## Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     if skip_without_git() {
//!         return;
//!     }
//!     let fixture = TestFixture::new();
//!     let alpha = fixture.clone_of("alpha");
//!     // ... test code
//! }
//! ```

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use assert_fs::prelude::*;
use walkdir::WalkDir;

use git_mirror::error::{Error, Result};
use git_mirror::host::{AccountSummary, BuildStatus, HostClient, HostKind, MergeRequest, RemoteRepo};

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    pub use predicates::prelude::*;

    pub use super::{git, git_available, skip_without_git, snapshot, StaticHost, TestFixture};
}

/// True (after a note on stderr) when `git` cannot be run.
pub fn skip_without_git() -> bool {
    if git_available() {
        return false;
    }
    eprintln!("git not found on PATH, skipping");
    true
}

pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .is_ok_and(|o| o.status.success())
}

/// Run git in `dir` with a fixed identity; panics on failure.
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(["-c", "user.name=Test", "-c", "user.email=test@example.com"])
        .args(["-c", "init.defaultBranch=main", "-c", "commit.gpgsign=false"])
        .args(args)
        .current_dir(dir)
        .output()
        .expect("failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed in {}: {}",
        args,
        dir.display(),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Every file under `dir` with its contents, `.git` internals included.
pub fn snapshot(dir: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| {
            let contents = std::fs::read(entry.path()).expect("failed to read file");
            (entry.path().to_path_buf(), contents)
        })
        .collect()
}

/// A temporary tree with `seeds/` (stand-ins for host repositories) and
/// `mirror/` (the base directory), plus a config file pointing at it.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

impl TestFixture {
    pub fn new() -> Self {
        let temp_dir = assert_fs::TempDir::new().expect("Failed to create temp directory");
        temp_dir
            .child("mirror")
            .create_dir_all()
            .expect("Failed to create base directory");
        temp_dir
            .child("seeds")
            .create_dir_all()
            .expect("Failed to create seeds directory");
        Self { temp_dir }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn base_dir(&self) -> PathBuf {
        self.path().join("mirror")
    }

    pub fn config_path(&self) -> PathBuf {
        self.path().join("git_mirror.toml")
    }

    /// Write a `github` section pointing at the base directory.
    pub fn with_config(self) -> Self {
        let config = format!(
            "[tool.git-mirror.github]\nhost_type = \"github\"\nuser_name = \"me\"\ntarget_dir = {:?}\n",
            self.base_dir().display().to_string()
        );
        self.temp_dir
            .child("git_mirror.toml")
            .write_str(&config)
            .expect("Failed to write config file");
        self
    }

    /// A repository under `seeds/` with one commit on `main`.
    pub fn seed(&self, name: &str) -> PathBuf {
        let path = self.path().join("seeds").join(name);
        std::fs::create_dir_all(&path).expect("Failed to create seed");
        git(&path, &["init", "-q"]);
        git(&path, &["symbolic-ref", "HEAD", "refs/heads/main"]);
        std::fs::write(path.join("README.md"), format!("# {name}\n")).expect("write");
        git(&path, &["add", "README.md"]);
        git(&path, &["commit", "-q", "-m", "Initial commit"]);
        path
    }

    /// Seed `name` and clone it into the base directory.
    pub fn clone_of(&self, name: &str) -> PathBuf {
        let seed = self.seed(name);
        let target = self.base_dir().join(name);
        git(
            self.path(),
            &["clone", "-q", &seed.display().to_string(), &target.display().to_string()],
        );
        // The library runs plain `git`, so merges need an identity in the repo.
        git(&target, &["config", "user.name", "Test"]);
        git(&target, &["config", "user.email", "test@example.com"]);
        git(&target, &["config", "commit.gpgsign", "false"]);
        target
    }

    /// A command for the binary that reads this fixture's config and has no
    /// access tokens in its environment.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("git-mirror");
        cmd.current_dir(self.path())
            .env("GIT_MIRROR_CONFIG", self.config_path())
            .env("NO_COLOR", "1")
            .env_remove("GITHUB_ACCESS_TOKEN")
            .env_remove("GITLAB_ACCESS_TOKEN")
            .env_remove("SELFHOSTED_ACCESS_TOKEN");
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Host double that serves a fixed listing; every repository has only a
/// `main` branch.
pub struct StaticHost {
    pub repos: Vec<RemoteRepo>,
}

impl StaticHost {
    /// Host repositories whose clone URLs are the seed paths.
    pub fn serving(seeds: &[&Path]) -> Self {
        let repos = seeds
            .iter()
            .map(|seed| {
                let name = seed
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                RemoteRepo {
                    full_name: format!("me/{name}"),
                    html_url: format!("https://github.com/me/{name}"),
                    clone_url: seed.display().to_string(),
                    private: false,
                    is_fork: false,
                    default_branch: Some("main".to_string()),
                    owner_login: "me".to_string(),
                    description: None,
                    name,
                }
            })
            .collect();
        Self { repos }
    }

    fn known(&self, full_name: &str) -> Result<()> {
        if self.repos.iter().any(|r| r.full_name == full_name) {
            Ok(())
        } else {
            Err(Error::host("GitHub", format!("404 Not Found: {full_name}")))
        }
    }
}

impl HostClient for StaticHost {
    fn kind(&self) -> HostKind {
        HostKind::Github
    }

    fn list_repos(&self) -> Result<Vec<RemoteRepo>> {
        Ok(self.repos.clone())
    }

    fn default_branch(&self, full_name: &str) -> Result<String> {
        self.known(full_name).map(|_| "main".to_string())
    }

    fn list_branches(&self, full_name: &str) -> Result<Vec<String>> {
        self.known(full_name).map(|_| vec!["main".to_string()])
    }

    fn create_pull_or_merge_request(&self, request: &MergeRequest) -> Result<String> {
        Ok(format!("https://github.com/{}/pull/1", request.repo))
    }

    fn recent_build_status(&self, _full_name: &str) -> Result<Option<BuildStatus>> {
        Ok(None)
    }

    fn account_summary(&self, login: &str) -> Result<AccountSummary> {
        Ok(AccountSummary {
            login: login.to_string(),
            ..AccountSummary::default()
        })
    }
}
