//! # Working Tree Inspector
//!
//! Reports whether a working copy has uncommitted changes (untracked files
//! included) and, for every local branch, whether it has commits its
//! upstream does not.
//!
//! A failure on one branch is recorded on that branch and inspection moves
//! on; only an unopenable repository fails the whole inspection.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::output::Report;
use crate::repository::GitOperations;

/// Upstream relationship of one local branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchState {
    /// No upstream configured.
    Untracked,
    /// Tracks `upstream` and has `ahead` commits it does not.
    Tracking { upstream: String, ahead: usize },
    /// The ahead count could not be computed.
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchReport {
    pub name: String,
    pub state: BranchState,
}

impl BranchReport {
    pub fn tracks_remote(&self) -> bool {
        matches!(self.state, BranchState::Tracking { .. })
    }

    pub fn ahead_count(&self) -> Option<usize> {
        match self.state {
            BranchState::Tracking { ahead, .. } => Some(ahead),
            _ => None,
        }
    }

    pub fn is_up_to_date(&self) -> bool {
        self.ahead_count() == Some(0)
    }

    /// Status line for this branch of the repository at `path`.
    pub fn describe(&self, path: &Path) -> String {
        let path = path.display();
        let name = &self.name;
        match &self.state {
            BranchState::Untracked => format!("{path}: branch '{name}' does not track a remote."),
            BranchState::Tracking { ahead: 0, .. } => {
                format!("{path} is up to date with remote on branch '{name}'.")
            }
            BranchState::Tracking { .. } => {
                format!("{path} has unpushed commits on branch '{name}'.")
            }
            BranchState::Failed { message } => {
                format!("{path}: could not inspect branch '{name}': {message}")
            }
        }
    }
}

/// Result of inspecting one working copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeReport {
    pub path: PathBuf,
    pub is_dirty: bool,
    pub branches: Vec<BranchReport>,
}

impl TreeReport {
    pub fn has_unpushed(&self) -> bool {
        self.branches.iter().any(|b| b.ahead_count().unwrap_or(0) > 0)
    }

    /// True when nothing is uncommitted and nothing is waiting to be pushed.
    pub fn is_clean(&self) -> bool {
        !self.is_dirty && !self.has_unpushed()
    }

    /// Render as console lines: dirty state first, then one line per branch.
    pub fn render(&self, report: &mut Report) {
        if self.is_dirty {
            report.warn(format!("{} has uncommitted changes.", self.path.display()));
        }
        for branch in &self.branches {
            let line = branch.describe(&self.path);
            match &branch.state {
                BranchState::Tracking { ahead: 0, .. } => report.plain(line),
                BranchState::Tracking { .. } => report.warn(line),
                BranchState::Untracked => report.info(line),
                BranchState::Failed { .. } => report.danger(line),
            }
        }
    }
}

/// Inspect the working copy at `path`.
pub fn inspect(git: &dyn GitOperations, path: &Path) -> Result<TreeReport> {
    git.open(path)?;
    let is_dirty = git.is_dirty(path)?;
    let branches = git
        .local_branches(path)?
        .into_iter()
        .map(|branch| {
            let state = match branch.upstream {
                None => BranchState::Untracked,
                Some(upstream) => match git.ahead_count(path, &branch.name, &upstream) {
                    Ok(ahead) => BranchState::Tracking { upstream, ahead },
                    Err(e) => BranchState::Failed {
                        message: e.to_string(),
                    },
                },
            };
            BranchReport {
                name: branch.name,
                state,
            }
        })
        .collect();
    Ok(TreeReport {
        path: path.to_path_buf(),
        is_dirty,
        branches,
    })
}
