//! # Source Hosts
//!
//! The engine talks to GitHub and GitLab only through [`HostClient`]. The
//! concrete client is picked once, from validated configuration, by
//! [`connect`]; batch code never knows which host it is working against.

pub mod github;
pub mod gitlab;
mod http;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Which API flavour a configured host speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum HostKind {
    Github,
    Gitlab,
}

impl HostKind {
    pub fn default_api_url(self) -> &'static str {
        match self {
            HostKind::Github => crate::defaults::GITHUB_API_URL,
            HostKind::Gitlab => crate::defaults::GITLAB_API_URL,
        }
    }

    /// Guess the kind from a host name such as `github` or `selfhosted`.
    pub fn infer(host_name: &str) -> HostKind {
        if host_name.eq_ignore_ascii_case("github") {
            HostKind::Github
        } else {
            HostKind::Gitlab
        }
    }
}

impl fmt::Display for HostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostKind::Github => write!(f, "GitHub"),
            HostKind::Gitlab => write!(f, "GitLab"),
        }
    }
}

/// A repository as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRepo {
    /// Short name, also the local directory name.
    pub name: String,
    /// `owner/name` (GitLab: full namespace path).
    pub full_name: String,
    pub html_url: String,
    pub clone_url: String,
    pub private: bool,
    pub is_fork: bool,
    pub default_branch: Option<String>,
    pub owner_login: String,
    pub description: Option<String>,
}

/// Normalized result of the latest CI run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conclusion {
    Success,
    Failure,
    Cancelled,
    Other,
}

impl Conclusion {
    /// Map GitHub conclusions and GitLab pipeline statuses.
    pub fn parse(raw: &str) -> Conclusion {
        match raw.to_ascii_lowercase().as_str() {
            "success" | "passed" => Conclusion::Success,
            "failure" | "failed" => Conclusion::Failure,
            "cancelled" | "canceled" => Conclusion::Cancelled,
            _ => Conclusion::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildStatus {
    pub conclusion: Conclusion,
    /// Raw status text from the host.
    pub status: String,
    /// Human-readable summary: when, what and where.
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountSummary {
    pub login: String,
    pub name: Option<String>,
    pub bio: Option<String>,
    pub public_repos: Option<u64>,
    pub followers: Option<u64>,
    pub following: Option<u64>,
    pub location: Option<String>,
    pub company: Option<String>,
}

/// A pull request (GitHub) or merge request (GitLab) to open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeRequest {
    /// `owner/name` of the repository.
    pub repo: String,
    pub source_branch: String,
    pub target_branch: String,
    pub title: String,
    pub reviewer: Option<String>,
}

/// Capabilities the engine needs from a source host.
pub trait HostClient: Send + Sync {
    fn kind(&self) -> HostKind;

    /// Every repository the authenticated identity can enumerate.
    fn list_repos(&self) -> Result<Vec<RemoteRepo>>;

    fn default_branch(&self, full_name: &str) -> Result<String>;

    fn list_branches(&self, full_name: &str) -> Result<Vec<String>>;

    /// Open the request and return its web URL.
    fn create_pull_or_merge_request(&self, request: &MergeRequest) -> Result<String>;

    /// `None` when the repository has never run CI.
    fn recent_build_status(&self, full_name: &str) -> Result<Option<BuildStatus>>;

    fn account_summary(&self, login: &str) -> Result<AccountSummary>;

    /// Projects of a group and its subgroups.
    fn list_group_repos(&self, group_id: u64) -> Result<Vec<RemoteRepo>> {
        Err(Error::host(
            self.kind().to_string(),
            format!("groups are not supported (requested group {group_id})"),
        ))
    }
}

/// Connection parameters resolved by the CLI layer.
#[derive(Debug, Clone)]
pub struct HostSettings {
    pub kind: HostKind,
    /// API base, e.g. `https://api.github.com` or `https://gitlab.com/api/v4`.
    pub api_url: String,
    pub token: String,
}

/// Build the client for `settings`.
pub fn connect(settings: &HostSettings) -> Result<Box<dyn HostClient>> {
    Ok(match settings.kind {
        HostKind::Github => Box::new(github::GithubClient::new(&settings.api_url, &settings.token)?),
        HostKind::Gitlab => Box::new(gitlab::GitlabClient::new(&settings.api_url, &settings.token)?),
    })
}
