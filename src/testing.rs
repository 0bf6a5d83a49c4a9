//! Test doubles shared by the unit tests.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};

use crate::confirm::Confirmer;
use crate::error::{Error, Result};
use crate::host::{AccountSummary, BuildStatus, HostClient, HostKind, MergeRequest, RemoteRepo};
use crate::repository::{dir_name, GitOperations, LocalBranch, Remote};

/// State of one fake working copy.
#[derive(Debug, Clone, Default)]
pub struct MockRepo {
    pub remotes: Vec<Remote>,
    pub branches: Vec<LocalBranch>,
    pub current: Option<String>,
    pub dirty: bool,
    pub ahead: HashMap<String, usize>,
    pub unmerged: HashSet<String>,
    pub differs_from_main: bool,
}

impl MockRepo {
    pub fn with_origin(name: &str) -> Self {
        Self {
            remotes: vec![Remote {
                name: "origin".to_string(),
                url: format!("https://github.com/me/{name}.git"),
            }],
            branches: vec![branch("main", Some("origin/main"))],
            current: Some("main".to_string()),
            ..Self::default()
        }
    }

    pub fn branch(mut self, name: &str, upstream: Option<&str>) -> Self {
        self.branches.push(branch(name, upstream));
        self
    }
}

pub fn branch(name: &str, upstream: Option<&str>) -> LocalBranch {
    LocalBranch {
        name: name.to_string(),
        upstream: upstream.map(str::to_string),
    }
}

/// `GitOperations` that records every call as `"<dir>: <op>"`.
#[derive(Default)]
pub struct MockGit {
    pub repos: Mutex<HashMap<PathBuf, MockRepo>>,
    pub calls: Arc<Mutex<Vec<String>>>,
    /// Operations (e.g. `"merge origin/main"`) that fail with the given stderr.
    pub failures: Mutex<HashMap<String, String>>,
}

impl MockGit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_repo(self, path: impl Into<PathBuf>, repo: MockRepo) -> Self {
        self.repos.lock().unwrap().insert(path.into(), repo);
        self
    }

    pub fn failing(self, op: &str, stderr: &str) -> Self {
        self.failures
            .lock()
            .unwrap()
            .insert(op.to_string(), stderr.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls for one directory, without the `"<dir>: "` prefix.
    pub fn calls_for(&self, dir: &str) -> Vec<String> {
        let prefix = format!("{dir}: ");
        self.calls()
            .into_iter()
            .filter_map(|c| c.strip_prefix(&prefix).map(str::to_string))
            .collect()
    }

    pub fn repo(&self, path: &Path) -> MockRepo {
        self.repos.lock().unwrap()[path].clone()
    }

    fn record(&self, repo: &Path, op: String) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{}: {}", dir_name(repo), op));
        match self.failures.lock().unwrap().get(&op) {
            Some(stderr) => Err(Error::VcsOperation {
                command: op.clone(),
                path: repo.to_path_buf(),
                branch: None,
                stderr: stderr.clone(),
            }),
            None => Ok(()),
        }
    }

    fn with<T>(&self, repo: &Path, f: impl FnOnce(&mut MockRepo) -> T) -> Result<T> {
        let mut repos = self.repos.lock().unwrap();
        let state = repos.get_mut(repo).ok_or_else(|| Error::InvalidRepository {
            path: repo.to_path_buf(),
        })?;
        Ok(f(state))
    }
}

impl GitOperations for MockGit {
    fn open(&self, repo: &Path) -> Result<()> {
        self.with(repo, |_| ())
    }

    fn clone_repo(&self, url: &str, target_dir: &Path) -> Result<()> {
        self.record(target_dir, format!("clone {url}"))
    }

    fn remotes(&self, repo: &Path) -> Result<Vec<Remote>> {
        self.with(repo, |r| r.remotes.clone())
    }

    fn local_branches(&self, repo: &Path) -> Result<Vec<LocalBranch>> {
        self.with(repo, |r| r.branches.clone())
    }

    fn current_branch(&self, repo: &Path) -> Result<Option<String>> {
        self.with(repo, |r| r.current.clone())
    }

    fn is_dirty(&self, repo: &Path) -> Result<bool> {
        self.with(repo, |r| r.dirty)
    }

    fn ahead_count(&self, repo: &Path, branch: &str, upstream: &str) -> Result<usize> {
        self.record(repo, format!("rev-list {upstream}..{branch}"))
            .map_err(|e| e.on_branch(branch))?;
        self.with(repo, |r| r.ahead.get(branch).copied().unwrap_or(0))
    }

    fn fetch_all(&self, repo: &Path) -> Result<()> {
        self.record(repo, "fetch".to_string())
    }

    fn pull(&self, repo: &Path) -> Result<()> {
        self.record(repo, "pull".to_string())
    }

    fn checkout(&self, repo: &Path, branch: &str) -> Result<()> {
        self.record(repo, format!("checkout {branch}"))?;
        self.with(repo, |r| r.current = Some(branch.to_string()))
    }

    fn create_branch(&self, repo: &Path, branch: &str) -> Result<()> {
        self.record(repo, format!("checkout -b {branch}"))?;
        self.with(repo, |r| {
            if r.branches.iter().any(|b| b.name == branch) {
                return Err(Error::VcsOperation {
                    command: "checkout -b".to_string(),
                    path: repo.to_path_buf(),
                    branch: Some(branch.to_string()),
                    stderr: format!("fatal: a branch named '{branch}' already exists"),
                });
            }
            r.branches.push(crate::testing::branch(branch, None));
            r.current = Some(branch.to_string());
            Ok(())
        })?
    }

    fn merge(&self, repo: &Path, rev: &str) -> Result<()> {
        self.record(repo, format!("merge {rev}"))
    }

    fn rebase(&self, repo: &Path, onto: &str) -> Result<()> {
        self.record(repo, format!("rebase {onto}"))
    }

    fn delete_branch(&self, repo: &Path, branch: &str, force: bool) -> Result<()> {
        let flag = if force { "-D" } else { "-d" };
        self.record(repo, format!("branch {flag} {branch}"))?;
        self.with(repo, |r| {
            if !force && r.unmerged.contains(branch) {
                return Err(Error::VcsOperation {
                    command: "branch -d".to_string(),
                    path: repo.to_path_buf(),
                    branch: Some(branch.to_string()),
                    stderr: format!("error: the branch '{branch}' is not fully merged"),
                });
            }
            r.branches.retain(|b| b.name != branch);
            Ok(())
        })?
    }

    fn add(&self, repo: &Path, path: &str) -> Result<()> {
        self.record(repo, format!("add {path}"))
    }

    fn commit(&self, repo: &Path, message: &str) -> Result<()> {
        self.record(repo, format!("commit {message}"))
    }

    fn force_push(&self, repo: &Path, remote: &str, branch: &str) -> Result<()> {
        self.record(repo, format!("push --force {remote} {branch}"))
    }

    fn differs_from(&self, repo: &Path, rev: &str) -> Result<bool> {
        self.record(repo, format!("diff {rev}"))?;
        self.with(repo, |r| r.differs_from_main)
    }

    fn last_commit_time(&self, repo: &Path) -> Result<DateTime<Utc>> {
        self.with(repo, |_| Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap())
    }
}

pub fn remote_repo(name: &str, fork: bool) -> RemoteRepo {
    RemoteRepo {
        name: name.to_string(),
        full_name: format!("me/{name}"),
        html_url: format!("https://github.com/me/{name}"),
        clone_url: format!("https://github.com/me/{name}.git"),
        private: false,
        is_fork: fork,
        default_branch: Some("main".to_string()),
        owner_login: "me".to_string(),
        description: None,
    }
}

/// In-memory host.
#[derive(Default)]
pub struct FakeHost {
    pub repos: Vec<RemoteRepo>,
    /// Branches per full name; missing entries make per-repo calls fail.
    pub branches: HashMap<String, Vec<String>>,
    pub fail_listing: bool,
    pub requests: Mutex<Vec<MergeRequest>>,
}

impl FakeHost {
    pub fn with_repos(repos: Vec<RemoteRepo>) -> Self {
        let branches = repos
            .iter()
            .map(|r| (r.full_name.clone(), vec!["main".to_string()]))
            .collect();
        Self {
            repos,
            branches,
            ..Self::default()
        }
    }

    fn known(&self, full_name: &str) -> Result<&Vec<String>> {
        self.branches
            .get(full_name)
            .ok_or_else(|| Error::host("GitHub", format!("404 Not Found: {full_name}")))
    }
}

impl HostClient for FakeHost {
    fn kind(&self) -> HostKind {
        HostKind::Github
    }

    fn list_repos(&self) -> Result<Vec<RemoteRepo>> {
        if self.fail_listing {
            return Err(Error::host("GitHub", "503 Service Unavailable"));
        }
        Ok(self.repos.clone())
    }

    fn default_branch(&self, full_name: &str) -> Result<String> {
        self.known(full_name).map(|_| "main".to_string())
    }

    fn list_branches(&self, full_name: &str) -> Result<Vec<String>> {
        self.known(full_name).cloned()
    }

    fn create_pull_or_merge_request(&self, request: &MergeRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(format!("https://github.com/{}/pull/1", request.repo))
    }

    fn recent_build_status(&self, full_name: &str) -> Result<Option<BuildStatus>> {
        self.known(full_name).map(|_| None)
    }

    fn account_summary(&self, login: &str) -> Result<AccountSummary> {
        Ok(AccountSummary {
            login: login.to_string(),
            ..AccountSummary::default()
        })
    }
}

/// Answers prompts from a script and records the questions.
pub struct ScriptedConfirmer {
    answers: Mutex<Vec<bool>>,
    pub asked: Mutex<Vec<String>>,
}

impl ScriptedConfirmer {
    pub fn new(answers: &[bool]) -> Self {
        Self {
            answers: Mutex::new(answers.iter().rev().copied().collect()),
            asked: Mutex::new(Vec::new()),
        }
    }

    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().unwrap().clone()
    }
}

impl Confirmer for ScriptedConfirmer {
    fn confirm(&self, prompt: &str) -> Result<bool> {
        self.asked.lock().unwrap().push(prompt.to_string());
        Ok(self.answers.lock().unwrap().pop().unwrap_or(false))
    }
}
