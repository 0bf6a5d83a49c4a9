//! Default values for git-mirror configuration.
//!
//! This module provides centralized default values used across commands,
//! ensuring consistency and avoiding duplication.

use std::path::{Path, PathBuf};

/// File name of the configuration file placed in the home directory.
pub const CONFIG_FILE_NAME: &str = "git_mirror.toml";

/// Environment variable that overrides the configuration file location.
pub const CONFIG_PATH_ENV: &str = "GIT_MIRROR_CONFIG";

/// Batches smaller than this run sequentially on the calling thread.
pub const SEQUENTIAL_THRESHOLD: usize = 4;

/// Remote name used for fetch, merge and push.
pub const DEFAULT_REMOTE: &str = "origin";

/// Branch created by the dependency relock workflow.
pub const DEPENDENCY_UPDATE_BRANCH: &str = "dependency-update";

/// Days a repository may lead its last PyPI release before it is highlighted.
pub const PYPI_STALE_DAYS: i64 = 60;

pub const GITHUB_API_URL: &str = "https://api.github.com";
pub const GITLAB_API_URL: &str = "https://gitlab.com/api/v4";
pub const PYPI_URL: &str = "https://pypi.org/pypi";

/// Returns the default configuration file path, `~/git_mirror.toml`.
///
/// Falls back to `git_mirror.toml` in the current directory if the home
/// directory cannot be determined.
///
/// This can be overridden by the `--config-path` CLI flag or the
/// `GIT_MIRROR_CONFIG` environment variable.
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(CONFIG_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME))
}

/// Environment variable holding the access token for a host name.
///
/// `github`, `gitlab` and `selfhosted` map to the well-known names; any other
/// host name is upper-cased with non-alphanumerics replaced by `_`.
pub fn token_variable(host: &str) -> String {
    let normalized: String = host
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("{normalized}_ACCESS_TOKEN")
}

/// Expand a leading `~` to the home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_path_file_name() {
        let path = default_config_path();
        assert!(path.ends_with(CONFIG_FILE_NAME));
    }

    #[test]
    fn test_token_variable_known_hosts() {
        assert_eq!(token_variable("github"), "GITHUB_ACCESS_TOKEN");
        assert_eq!(token_variable("gitlab"), "GITLAB_ACCESS_TOKEN");
        assert_eq!(token_variable("selfhosted"), "SELFHOSTED_ACCESS_TOKEN");
    }

    #[test]
    fn test_token_variable_sanitizes() {
        assert_eq!(token_variable("git.corp-1"), "GIT_CORP_1_ACCESS_TOKEN");
    }

    #[test]
    fn test_expand_home_leaves_plain_paths() {
        assert_eq!(expand_home(Path::new("/srv/git")), PathBuf::from("/srv/git"));
        assert_eq!(expand_home(Path::new("rel/dir")), PathBuf::from("rel/dir"));
    }

    #[test]
    fn test_expand_home_tilde() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home(Path::new("~/github")), home.join("github"));
            assert_eq!(expand_home(Path::new("~")), home);
        }
    }
}
