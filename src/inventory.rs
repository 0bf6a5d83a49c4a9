//! # Remote Inventory
//!
//! Lists the repositories a user owns on the configured host and applies the
//! display filters. A failed listing never aborts a command: the caller gets
//! an empty inventory plus a warning and carries on with zero remote repos.

use std::collections::HashMap;

use log::warn;

use crate::host::{HostClient, RemoteRepo};

/// Which repositories a listing should keep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoFilter {
    pub user_login: String,
    pub include_private: bool,
    pub include_forks: bool,
    /// Keep everything the identity can enumerate, regardless of the flags
    /// and of ownership. Used when reconciling local clones.
    pub ignore_filters: bool,
}

impl RepoFilter {
    pub fn new(user_login: impl Into<String>, include_private: bool, include_forks: bool) -> Self {
        Self {
            user_login: user_login.into(),
            include_private,
            include_forks,
            ignore_filters: false,
        }
    }

    pub fn unfiltered(mut self) -> Self {
        self.ignore_filters = true;
        self
    }

    pub fn admits(&self, repo: &RemoteRepo) -> bool {
        if self.ignore_filters {
            return true;
        }
        (self.include_private || !repo.private)
            && (self.include_forks || !repo.is_fork)
            && repo.owner_login == self.user_login
    }
}

/// Result of listing a host.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    pub repos: Vec<RemoteRepo>,
    /// Set when the host could not be listed; `repos` is then empty.
    pub warning: Option<String>,
}

impl Inventory {
    /// Repositories keyed by short name, as used for reconciliation.
    pub fn index(&self) -> HashMap<String, RemoteRepo> {
        self.repos
            .iter()
            .map(|repo| (repo.name.clone(), repo.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.repos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repos.is_empty()
    }
}

/// List the user's repositories through `host` and apply `filter`.
pub fn list_user_repos(host: &dyn HostClient, filter: &RepoFilter) -> Inventory {
    match host.list_repos() {
        Ok(repos) => Inventory {
            repos: repos.into_iter().filter(|r| filter.admits(r)).collect(),
            warning: None,
        },
        Err(e) => {
            warn!("Failed to fetch repositories: {}", e);
            Inventory {
                repos: Vec::new(),
                warning: Some(format!("Failed to fetch repositories: {e}")),
            }
        }
    }
}

/// Like [`list_user_repos`], for the projects of a GitLab group.
pub fn list_group_repos(host: &dyn HostClient, group_id: u64) -> Inventory {
    match host.list_group_repos(group_id) {
        Ok(repos) => Inventory {
            repos,
            warning: None,
        },
        Err(e) => {
            warn!("Failed to fetch repositories of group {}: {}", group_id, e);
            Inventory {
                repos: Vec::new(),
                warning: Some(format!("Failed to fetch repositories: {e}")),
            }
        }
    }
}
