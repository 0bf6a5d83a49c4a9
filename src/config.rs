//! # Configuration File
//!
//! Per-host settings live in one TOML file, by default `~/git_mirror.toml`,
//! one table per configured host:
//!
//! ```toml
//! [tool.git-mirror.github]
//! host_type = "github"
//! user_name = "matthewdeanmartin"
//! target_dir = "~/github"
//! include_private = true
//! pypi_owner_name = "matthewdeanmartin"
//!
//! [tool.git-mirror.selfhosted]
//! host_type = "gitlab"
//! host_url = "https://gitlab.example.com"
//! user_name = "mmartin"
//! group_id = 42
//! ```
//!
//! Access tokens are never stored here; they come from the environment
//! (see [`crate::defaults::token_variable`]).
//!
//! The store reads and writes the whole document, so tables that belong to
//! other tools survive a save untouched.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};
use toml::{Table, Value};

use crate::defaults::expand_home;
use crate::error::{Error, Result};
use crate::host::HostKind;

/// Settings for one configured host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// API flavour; inferred from the host name when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_type: Option<HostKind>,
    /// Web or API root for self-hosted instances.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_dir: Option<PathBuf>,
    pub include_private: bool,
    pub include_forks: bool,
    /// GitLab group to clone instead of the user's own projects. `0` means none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pypi_owner_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global_template_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewer: Option<String>,
    /// Repositories recorded by `sync-config`, keyed by full name.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub repos: BTreeMap<String, Table>,
}

impl HostConfig {
    pub fn kind(&self, host_name: &str) -> HostKind {
        self.host_type
            .unwrap_or_else(|| HostKind::infer(host_name))
    }

    pub fn group(&self) -> Option<u64> {
        self.group_id.filter(|id| *id != 0)
    }

    pub fn target_dir(&self) -> Option<PathBuf> {
        self.target_dir.as_deref().map(expand_home)
    }

    pub fn template_dir(&self) -> Option<PathBuf> {
        self.global_template_dir.as_deref().map(expand_home)
    }
}

/// Effect of [`ConfigStore::sync_repos`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepoSync {
    pub added: usize,
    pub removed: usize,
    pub total: usize,
}

/// Where host settings are kept.
pub trait ConfigStore {
    /// `None` when the host has no section.
    fn load(&self, host: &str) -> Result<Option<HostConfig>>;

    /// Create or replace the host's section.
    fn save(&self, host: &str, config: &HostConfig) -> Result<()>;

    fn list_configured_hosts(&self) -> Result<Vec<String>>;

    /// Make the host's `repos` table list exactly `full_names`, keeping the
    /// attributes of entries that stay.
    fn sync_repos(&self, host: &str, full_names: &[String]) -> Result<RepoSync>;
}

/// [`ConfigStore`] backed by a TOML file.
#[derive(Debug, Clone)]
pub struct TomlConfigStore {
    path: PathBuf,
}

impl TomlConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    fn read_document(&self) -> Result<Table> {
        if !self.path.exists() {
            debug!("Config file {} does not exist yet", self.path.display());
            return Ok(Table::new());
        }
        let text = fs::read_to_string(&self.path).map_err(|e| Error::io_at(&self.path, e))?;
        text.parse::<Table>().map_err(|e| Error::Config {
            message: format!("{} is not valid TOML: {}", self.path.display(), e),
            hint: Some("Fix the file by hand or delete it and run `git-mirror init`".to_string()),
        })
    }

    fn write_document(&self, document: &Table) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::io_at(parent, e))?;
        }
        let text = toml::to_string_pretty(document)?;
        fs::write(&self.path, text).map_err(|e| Error::io_at(&self.path, e))
    }

    fn hosts_mut<'a>(&self, document: &'a mut Table) -> Result<&'a mut Table> {
        let tool = table_entry(document, "tool", &self.path)?;
        table_entry(tool, "git-mirror", &self.path)
    }
}

fn hosts(document: &Table) -> Option<&Table> {
    document.get("tool")?.as_table()?.get("git-mirror")?.as_table()
}

fn table_entry<'a>(parent: &'a mut Table, key: &str, path: &Path) -> Result<&'a mut Table> {
    parent
        .entry(key)
        .or_insert_with(|| Value::Table(Table::new()))
        .as_table_mut()
        .ok_or_else(|| Error::Config {
            message: format!("'{}' in {} is not a table", key, path.display()),
            hint: None,
        })
}

impl ConfigStore for TomlConfigStore {
    fn load(&self, host: &str) -> Result<Option<HostConfig>> {
        let document = self.read_document()?;
        let Some(section) = hosts(&document).and_then(|h| h.get(host)) else {
            return Ok(None);
        };
        let config: HostConfig = section.clone().try_into()?;
        Ok(Some(config))
    }

    fn save(&self, host: &str, config: &HostConfig) -> Result<()> {
        let mut document = self.read_document()?;
        let hosts = self.hosts_mut(&mut document)?;

        let mut value = Value::try_from(config)?;
        // A section edited through `init` keeps its synced repository list.
        if config.repos.is_empty() {
            if let (Some(old), Some(new)) = (
                hosts.get(host).and_then(|v| v.get("repos")).cloned(),
                value.as_table_mut(),
            ) {
                new.insert("repos".to_string(), old);
            }
        }
        hosts.insert(host.to_string(), value);

        self.write_document(&document)?;
        info!("Saved [{}] to {}", host, self.path.display());
        Ok(())
    }

    fn list_configured_hosts(&self) -> Result<Vec<String>> {
        let document = self.read_document()?;
        Ok(hosts(&document)
            .map(|h| h.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn sync_repos(&self, host: &str, full_names: &[String]) -> Result<RepoSync> {
        let mut document = self.read_document()?;
        let path = self.path.clone();
        let hosts = self.hosts_mut(&mut document)?;
        let section = hosts
            .get_mut(host)
            .and_then(Value::as_table_mut)
            .ok_or_else(|| Error::Config {
                message: format!("No configuration for host '{}' in {}", host, path.display()),
                hint: Some(format!("Run `git-mirror init` to configure {host}")),
            })?;
        let repos = table_entry(section, "repos", &path)?;

        let stale: Vec<String> = repos
            .keys()
            .filter(|name| !full_names.contains(*name))
            .cloned()
            .collect();
        for name in &stale {
            repos.remove(name);
        }
        let removed = stale.len();

        let mut added = 0;
        for name in full_names {
            if !repos.contains_key(name) {
                let mut attributes = Table::new();
                attributes.insert("important".to_string(), Value::Boolean(true));
                repos.insert(name.clone(), Value::Table(attributes));
                added += 1;
            }
        }
        let total = repos.len();

        info!(
            "Syncing configuration with {} repositories to {}",
            full_names.len(),
            path.display()
        );
        self.write_document(&document)?;
        Ok(RepoSync {
            added,
            removed,
            total,
        })
    }
}
