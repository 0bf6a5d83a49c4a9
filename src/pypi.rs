//! # PyPI Publish Status
//!
//! Compares each local repository's latest commit with the latest release
//! of the PyPI package of the same name, to spot projects with unreleased
//! work. Rows where the repository leads PyPI by more than
//! [`PYPI_STALE_DAYS`] days are flagged stale.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, warn};
use rayon::prelude::*;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::defaults::{PYPI_STALE_DAYS, PYPI_URL};
use crate::error::{Error, Result};
use crate::repository::{dir_name, GitOperations};

const UPLOAD_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageInfo {
    pub info: PackageMeta,
    #[serde(default)]
    pub releases: HashMap<String, Vec<ReleaseFile>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageMeta {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub author: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseFile {
    pub upload_time: String,
}

impl PackageInfo {
    /// Upload time of the last file of the current version.
    ///
    /// ```
    /// use git_mirror::pypi::PackageInfo;
    ///
    /// let data = r#"{"info": {"version": "0.1.0"},
    ///                "releases": {"0.1.0": [{"upload_time": "2021-09-10T18:48:49"}]}}"#;
    /// let info: PackageInfo = serde_json::from_str(data).unwrap();
    /// assert_eq!(info.latest_release().unwrap().to_string(), "2021-09-10 18:48:49 UTC");
    /// ```
    pub fn latest_release(&self) -> Option<DateTime<Utc>> {
        let file = self.releases.get(&self.info.version)?.last()?;
        NaiveDateTime::parse_from_str(&file.upload_time, UPLOAD_TIME_FORMAT)
            .ok()
            .map(|t| t.and_utc())
    }

    /// True when `owner` is unset or matches the package author, ignoring
    /// case and surrounding whitespace.
    pub fn owned_by(&self, owner: Option<&str>) -> bool {
        let Some(owner) = owner else {
            return true;
        };
        let author = self.info.author.as_deref().unwrap_or_default();
        author.trim().eq_ignore_ascii_case(owner.trim())
    }
}

/// A package lookup; `info` is `None` unless the registry answered 200.
#[derive(Debug, Clone)]
pub struct Lookup {
    pub status: u16,
    pub info: Option<PackageInfo>,
}

pub trait PackageRegistry: Send + Sync {
    fn package_info(&self, package: &str) -> Result<Lookup>;
}

/// PyPI JSON API over blocking reqwest.
pub struct PyPiClient {
    client: Client,
    base_url: String,
}

impl PyPiClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(PYPI_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("git-mirror/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Registry {
                package: "*".to_string(),
                message: e.to_string(),
            })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl PackageRegistry for PyPiClient {
    fn package_info(&self, package: &str) -> Result<Lookup> {
        let url = format!("{}/{}/json", self.base_url, package);
        debug!("GET {}", url);
        let registry_error = |e: reqwest::Error| Error::Registry {
            package: package.to_string(),
            message: e.to_string(),
        };
        let response = self.client.get(&url).send().map_err(registry_error)?;
        let status = response.status();
        if status != StatusCode::OK {
            return Ok(Lookup {
                status: status.as_u16(),
                info: None,
            });
        }
        let info = response.json().map_err(registry_error)?;
        Ok(Lookup {
            status: status.as_u16(),
            info: Some(info),
        })
    }
}

/// One published package next to its repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRow {
    pub package: String,
    pub owner: Option<String>,
    pub repo_last_commit: DateTime<Utc>,
    pub pypi_last_release: DateTime<Utc>,
    /// Release date minus commit date, in whole days.
    pub days_difference: i64,
}

impl PublishRow {
    pub fn is_stale(&self) -> bool {
        -self.days_difference > PYPI_STALE_DAYS
    }
}

pub struct PublishAudit<'a> {
    registry: &'a dyn PackageRegistry,
    git: &'a dyn GitOperations,
    owner: Option<String>,
}

impl<'a> PublishAudit<'a> {
    pub fn new(
        registry: &'a dyn PackageRegistry,
        git: &'a dyn GitOperations,
        owner: Option<&str>,
    ) -> Self {
        Self {
            registry,
            git,
            owner: owner.map(str::to_string),
        }
    }

    /// Look up every repository's package in parallel.
    ///
    /// Repositories that are not on the registry, belong to someone else, or
    /// fail to look up produce no row.
    pub fn run(&self, repos: &[PathBuf], show_progress: bool) -> Vec<PublishRow> {
        let progress = if show_progress {
            let bar = ProgressBar::new(repos.len() as u64);
            if let Ok(style) = ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            {
                bar.set_style(style.progress_chars("#=-"));
            }
            bar
        } else {
            ProgressBar::hidden()
        };

        let rows: Vec<PublishRow> = repos
            .par_iter()
            .filter_map(|repo| {
                let row = self.row_for(repo);
                progress.inc(1);
                row
            })
            .collect();
        progress.finish_and_clear();
        rows
    }

    fn row_for(&self, repo: &Path) -> Option<PublishRow> {
        let package = dir_name(repo);
        let lookup = match self.registry.package_info(&package) {
            Ok(lookup) => lookup,
            Err(e) => {
                warn!("{}", e);
                return None;
            }
        };
        let info = lookup.info?;
        if !info.owned_by(self.owner.as_deref()) {
            debug!("{} on PyPI belongs to someone else", package);
            return None;
        }
        let pypi_last_release = info.latest_release()?;
        let repo_last_commit = match self.git.last_commit_time(repo) {
            Ok(time) => time,
            Err(e) => {
                warn!("{}", e);
                return None;
            }
        };
        Some(PublishRow {
            package,
            owner: info.info.author.clone(),
            repo_last_commit,
            pypi_last_release,
            days_difference: (pypi_last_release - repo_last_commit).num_days(),
        })
    }
}
