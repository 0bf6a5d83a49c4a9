//! GitLab REST v4 client, for gitlab.com and self-hosted instances.

use log::warn;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;
use serde_json::json;

use super::http::{ApiClient, Pagination};
use super::{AccountSummary, BuildStatus, Conclusion, HostClient, HostKind, MergeRequest, RemoteRepo};
use crate::error::{Error, Result};

const HOST: &str = "GitLab";

pub struct GitlabClient {
    api: ApiClient,
}

/// Normalize a configured GitLab URL to its `/api/v4` base.
///
/// ```
/// use git_mirror::host::gitlab::api_base;
///
/// assert_eq!(api_base("https://gitlab.com"), "https://gitlab.com/api/v4");
/// assert_eq!(api_base("https://gitlab.com/api/v4/"), "https://gitlab.com/api/v4");
/// ```
pub fn api_base(host_url: &str) -> String {
    let trimmed = host_url.trim_end_matches('/');
    if trimmed.ends_with("/api/v4") {
        trimmed.to_string()
    } else {
        format!("{trimmed}/api/v4")
    }
}

/// Project path in the form GitLab accepts as an `:id` path parameter.
fn project_id(full_name: &str) -> String {
    url::form_urlencoded::byte_serialize(full_name.as_bytes()).collect()
}

impl GitlabClient {
    pub fn new(host_url: &str, token: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(token)
            .map_err(|_| Error::host(HOST, "access token contains invalid characters"))?;
        auth.set_sensitive(true);
        headers.insert("PRIVATE-TOKEN", auth);
        Ok(Self {
            api: ApiClient::new(HOST, &api_base(host_url), headers)?,
        })
    }

    fn user_id(&self, username: &str) -> Result<u64> {
        let users: Vec<GlUserRef> = self.api.get("users", &[("username", username)])?;
        users
            .first()
            .map(|u| u.id)
            .ok_or_else(|| Error::host(HOST, format!("user '{username}' not found")))
    }
}

#[derive(Debug, Deserialize)]
struct GlNamespace {
    path: String,
}

#[derive(Debug, Deserialize)]
struct GlOwner {
    username: String,
}

#[derive(Debug, Deserialize)]
struct GlProject {
    path: String,
    path_with_namespace: String,
    web_url: String,
    http_url_to_repo: String,
    visibility: Option<String>,
    forked_from_project: Option<serde_json::Value>,
    default_branch: Option<String>,
    namespace: GlNamespace,
    owner: Option<GlOwner>,
    description: Option<String>,
}

impl From<GlProject> for RemoteRepo {
    fn from(project: GlProject) -> Self {
        let owner_login = project
            .owner
            .map(|o| o.username)
            .unwrap_or(project.namespace.path);
        RemoteRepo {
            name: project.path,
            full_name: project.path_with_namespace,
            html_url: project.web_url,
            clone_url: project.http_url_to_repo,
            private: project.visibility.as_deref() != Some("public"),
            is_fork: project.forked_from_project.is_some(),
            default_branch: project.default_branch,
            owner_login,
            description: project.description,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GlBranch {
    name: String,
}

#[derive(Debug, Deserialize)]
struct GlUserRef {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct GlMergeRequest {
    iid: u64,
    web_url: String,
}

#[derive(Debug, Deserialize)]
struct GlPipeline {
    id: u64,
    status: String,
    updated_at: Option<String>,
    web_url: Option<String>,
}

impl From<GlPipeline> for BuildStatus {
    fn from(pipeline: GlPipeline) -> Self {
        BuildStatus {
            conclusion: Conclusion::parse(&pipeline.status),
            message: format!(
                "Pipeline {} {} {} {}",
                pipeline.id,
                pipeline.updated_at.unwrap_or_default(),
                pipeline.status,
                pipeline.web_url.unwrap_or_default()
            ),
            status: pipeline.status,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GlUser {
    username: String,
    name: Option<String>,
    bio: Option<String>,
    location: Option<String>,
    organization: Option<String>,
    followers: Option<u64>,
    following: Option<u64>,
}

impl HostClient for GitlabClient {
    fn kind(&self) -> HostKind {
        HostKind::Gitlab
    }

    fn list_repos(&self) -> Result<Vec<RemoteRepo>> {
        let projects: Vec<GlProject> = self.api.get_all(
            "projects",
            &[("membership", "true"), ("per_page", "100")],
            Pagination::NextPageHeader,
        )?;
        Ok(projects.into_iter().map(RemoteRepo::from).collect())
    }

    fn default_branch(&self, full_name: &str) -> Result<String> {
        let project: GlProject = self
            .api
            .get(&format!("projects/{}", project_id(full_name)), &[])?;
        project
            .default_branch
            .ok_or_else(|| Error::host(HOST, format!("{full_name} has no default branch")))
    }

    fn list_branches(&self, full_name: &str) -> Result<Vec<String>> {
        let branches: Vec<GlBranch> = self.api.get_all(
            &format!("projects/{}/repository/branches", project_id(full_name)),
            &[("per_page", "100")],
            Pagination::NextPageHeader,
        )?;
        Ok(branches.into_iter().map(|b| b.name).collect())
    }

    fn create_pull_or_merge_request(&self, request: &MergeRequest) -> Result<String> {
        let project = project_id(&request.repo);
        let me: GlUserRef = self.api.get("user", &[])?;
        let reviewer_ids = match &request.reviewer {
            Some(reviewer) => vec![self.user_id(reviewer)?],
            None => Vec::new(),
        };

        let mr: GlMergeRequest = self.api.post(
            &format!("projects/{project}/merge_requests"),
            &json!({
                "source_branch": request.source_branch,
                "target_branch": request.target_branch,
                "title": request.title,
                "assignee_id": me.id,
                "reviewer_ids": reviewer_ids,
                "remove_source_branch": true,
            }),
        )?;

        // A pipeline may not exist yet; the request itself is already open.
        if let Err(e) = self.api.put(
            &format!("projects/{project}/merge_requests/{}/merge", mr.iid),
            &json!({
                "merge_when_pipeline_succeeds": true,
                "should_remove_source_branch": true,
                "squash": true,
            }),
        ) {
            warn!("Could not enable auto-merge for {}: {}", mr.web_url, e);
        }
        Ok(mr.web_url)
    }

    fn recent_build_status(&self, full_name: &str) -> Result<Option<BuildStatus>> {
        let pipelines: Vec<GlPipeline> = self.api.get(
            &format!("projects/{}/pipelines", project_id(full_name)),
            &[("order_by", "updated_at"), ("sort", "desc"), ("per_page", "1")],
        )?;
        Ok(pipelines.into_iter().next().map(BuildStatus::from))
    }

    fn account_summary(&self, login: &str) -> Result<AccountSummary> {
        let id = self.user_id(login)?;
        let user: GlUser = self.api.get(&format!("users/{id}"), &[])?;
        Ok(AccountSummary {
            login: user.username,
            name: user.name,
            bio: user.bio.filter(|b| !b.is_empty()),
            public_repos: None,
            followers: user.followers,
            following: user.following,
            location: user.location.filter(|l| !l.is_empty()),
            company: user.organization.filter(|o| !o.is_empty()),
        })
    }

    fn list_group_repos(&self, group_id: u64) -> Result<Vec<RemoteRepo>> {
        let projects: Vec<GlProject> = self.api.get_all(
            &format!("groups/{group_id}/projects"),
            &[("include_subgroups", "true"), ("per_page", "100")],
            Pagination::NextPageHeader,
        )?;
        Ok(projects.into_iter().map(RemoteRepo::from).collect())
    }
}

impl std::fmt::Debug for GitlabClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "GitlabClient({})", self.api.host())
    }
}
