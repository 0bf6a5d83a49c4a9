//! # Local Repository Scanner
//!
//! Walks a base directory and yields every directory that contains a `.git`
//! entry. Once a repository root is found the walk does not descend into it,
//! so nested repositories are not reported.
//!
//! The scan is a single-pass `walkdir` traversal. [`LocalRepoScanner::iter`]
//! is lazy and restartable: every call walks the filesystem again and
//! nothing is cached between calls. Unreadable subtrees are logged and
//! skipped.

use std::path::{Path, PathBuf};

use log::{debug, warn};
use walkdir::WalkDir;

/// Finds git working copies below a base directory.
#[derive(Debug, Clone)]
pub struct LocalRepoScanner {
    base_dir: PathBuf,
}

impl LocalRepoScanner {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Start a fresh walk.
    pub fn iter(&self) -> RepoIter {
        RepoIter {
            inner: WalkDir::new(&self.base_dir)
                .min_depth(1)
                .follow_links(false)
                .sort_by_file_name()
                .into_iter(),
        }
    }

    /// All repository roots, in file-name order.
    pub fn scan(&self) -> Vec<PathBuf> {
        self.iter().collect()
    }

    /// Repositories that have `file_name` directly in their root.
    pub fn repos_with_root_file(&self, file_name: &str) -> Vec<PathBuf> {
        self.iter()
            .filter(|repo| repo.join(file_name).is_file())
            .collect()
    }

    /// Top-level subdirectories that neither are nor contain a repository.
    ///
    /// Hidden directories are ignored.
    pub fn stray_directories(&self) -> Vec<PathBuf> {
        let entries = match std::fs::read_dir(&self.base_dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Cannot read {}: {}", self.base_dir.display(), e);
                return Vec::new();
            }
        };
        let mut strays: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_dir() && !is_hidden(path))
            .filter(|path| !path.join(".git").exists())
            .filter(|path| LocalRepoScanner::new(path).iter().next().is_none())
            .collect();
        strays.sort();
        strays
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|name| name.to_string_lossy().starts_with('.'))
}

/// Lazy iterator over repository roots.
pub struct RepoIter {
    inner: walkdir::IntoIter,
}

impl Iterator for RepoIter {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        loop {
            let entry = match self.inner.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    let location = e
                        .path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "<unknown>".to_string());
                    warn!("Skipping {}: {}", location, e);
                    continue;
                }
            };
            if !entry.file_type().is_dir() {
                continue;
            }
            if entry.file_name() == ".git" {
                self.inner.skip_current_dir();
                continue;
            }
            if entry.path().join(".git").exists() {
                self.inner.skip_current_dir();
                debug!("Found repository {}", entry.path().display());
                return Some(entry.into_path());
            }
        }
    }
}
