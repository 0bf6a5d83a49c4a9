//! GitHub REST v3 client.

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use serde::Deserialize;
use serde_json::json;

use super::http::{ApiClient, Pagination};
use super::{AccountSummary, BuildStatus, Conclusion, HostClient, HostKind, MergeRequest, RemoteRepo};
use crate::defaults::GITHUB_API_URL;
use crate::error::{Error, Result};

const HOST: &str = "GitHub";

/// REST base for a configured `host_url`.
///
/// `github.com` maps to the public API; any other host is treated as an
/// Enterprise server whose API lives under `/api/v3`.
///
/// ```
/// use git_mirror::host::github::api_base;
///
/// assert_eq!(api_base("https://github.com"), "https://api.github.com");
/// assert_eq!(api_base("https://ghe.corp/"), "https://ghe.corp/api/v3");
/// ```
pub fn api_base(host_url: &str) -> String {
    let trimmed = host_url.trim_end_matches('/');
    let host = url::Url::parse(trimmed)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string));
    match host.as_deref() {
        Some("github.com") | Some("www.github.com") => GITHUB_API_URL.to_string(),
        Some(h) if h.starts_with("api.") => trimmed.to_string(),
        _ if trimmed.ends_with("/api/v3") => trimmed.to_string(),
        _ => format!("{trimmed}/api/v3"),
    }
}

pub struct GithubClient {
    api: ApiClient,
}

impl GithubClient {
    /// `host_url` is normalised with [`api_base`].
    pub fn new(host_url: &str, token: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| Error::host(HOST, "access token contains invalid characters"))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        Ok(Self {
            api: ApiClient::new(HOST, &api_base(host_url), headers)?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct GhOwner {
    login: String,
}

#[derive(Debug, Deserialize)]
struct GhRepo {
    name: String,
    full_name: String,
    html_url: String,
    clone_url: String,
    private: bool,
    fork: bool,
    default_branch: Option<String>,
    owner: GhOwner,
    description: Option<String>,
}

impl From<GhRepo> for RemoteRepo {
    fn from(repo: GhRepo) -> Self {
        RemoteRepo {
            name: repo.name,
            full_name: repo.full_name,
            html_url: repo.html_url,
            clone_url: repo.clone_url,
            private: repo.private,
            is_fork: repo.fork,
            default_branch: repo.default_branch,
            owner_login: repo.owner.login,
            description: repo.description,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GhBranch {
    name: String,
}

#[derive(Debug, Deserialize)]
struct GhPull {
    number: u64,
    html_url: String,
}

#[derive(Debug, Deserialize)]
struct GhRuns {
    workflow_runs: Vec<GhRun>,
}

#[derive(Debug, Deserialize)]
struct GhRun {
    created_at: String,
    display_title: Option<String>,
    status: Option<String>,
    conclusion: Option<String>,
    html_url: String,
}

impl From<GhRun> for BuildStatus {
    fn from(run: GhRun) -> Self {
        let status = run
            .conclusion
            .or(run.status)
            .unwrap_or_else(|| "unknown".to_string());
        BuildStatus {
            conclusion: Conclusion::parse(&status),
            message: format!(
                "{} {} {} {}",
                run.created_at,
                run.display_title.unwrap_or_default(),
                status,
                run.html_url
            ),
            status,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GhUser {
    login: String,
    name: Option<String>,
    bio: Option<String>,
    public_repos: Option<u64>,
    followers: Option<u64>,
    following: Option<u64>,
    location: Option<String>,
    company: Option<String>,
}

impl HostClient for GithubClient {
    fn kind(&self) -> HostKind {
        HostKind::Github
    }

    fn list_repos(&self) -> Result<Vec<RemoteRepo>> {
        let repos: Vec<GhRepo> = self.api.get_all(
            "user/repos",
            &[
                ("per_page", "100"),
                ("affiliation", "owner,collaborator,organization_member"),
            ],
            Pagination::LinkHeader,
        )?;
        Ok(repos.into_iter().map(RemoteRepo::from).collect())
    }

    fn default_branch(&self, full_name: &str) -> Result<String> {
        let repo: GhRepo = self.api.get(&format!("repos/{full_name}"), &[])?;
        repo.default_branch
            .ok_or_else(|| Error::host(HOST, format!("{full_name} has no default branch")))
    }

    fn list_branches(&self, full_name: &str) -> Result<Vec<String>> {
        let branches: Vec<GhBranch> = self.api.get_all(
            &format!("repos/{full_name}/branches"),
            &[("per_page", "100")],
            Pagination::LinkHeader,
        )?;
        Ok(branches.into_iter().map(|b| b.name).collect())
    }

    fn create_pull_or_merge_request(&self, request: &MergeRequest) -> Result<String> {
        let pull: GhPull = self.api.post(
            &format!("repos/{}/pulls", request.repo),
            &json!({
                "title": request.title,
                "body": request.title,
                "head": request.source_branch,
                "base": request.target_branch,
                "maintainer_can_modify": true,
            }),
        )?;

        let me: GhUser = self.api.get("user", &[])?;
        let _: serde_json::Value = self.api.post(
            &format!("repos/{}/issues/{}/assignees", request.repo, pull.number),
            &json!({ "assignees": [me.login] }),
        )?;
        if let Some(reviewer) = &request.reviewer {
            let _: serde_json::Value = self.api.post(
                &format!(
                    "repos/{}/pulls/{}/requested_reviewers",
                    request.repo, pull.number
                ),
                &json!({ "reviewers": [reviewer] }),
            )?;
        }
        Ok(pull.html_url)
    }

    fn recent_build_status(&self, full_name: &str) -> Result<Option<BuildStatus>> {
        let runs: GhRuns = self.api.get(
            &format!("repos/{full_name}/actions/runs"),
            &[("per_page", "1")],
        )?;
        Ok(runs.workflow_runs.into_iter().next().map(BuildStatus::from))
    }

    fn account_summary(&self, login: &str) -> Result<AccountSummary> {
        let user: GhUser = self.api.get(&format!("users/{login}"), &[])?;
        Ok(AccountSummary {
            login: user.login,
            name: user.name,
            bio: user.bio,
            public_repos: user.public_repos,
            followers: user.followers,
            following: user.following,
            location: user.location,
            company: user.company,
        })
    }
}

impl std::fmt::Debug for GithubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "GithubClient({})", self.api.host())
    }
}
