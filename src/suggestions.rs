//! # Error Suggestions
//!
//! This module provides helper functions for generating helpful error
//! messages with hints and suggestions. Following CLI recommendations,
//! errors should tell users what went wrong AND how to fix it.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use crate::suggestions;
//!
//! // Instead of:
//! anyhow::bail!("No token for github");
//!
//! // Use:
//! return Err(suggestions::missing_token("github", "GITHUB_ACCESS_TOKEN"));
//! ```

use std::path::Path;

/// Generate an error for a host whose access token is not in the environment.
pub fn missing_token(host: &str, variable: &str) -> anyhow::Error {
    anyhow::anyhow!(
        "No access token found for host '{host}'\n\n\
         hint: Export {variable} with a personal access token\n\
         hint: The token needs read access to repositories, and write access for relock pull requests"
    )
}

/// Generate an error for a host that has no section in the config file.
pub fn host_not_configured(host: &str, path: &Path) -> anyhow::Error {
    anyhow::anyhow!(
        "Host '{host}' is not configured in {path}\n\n\
         hint: Run 'git-mirror init' to add it\n\
         hint: Or pass --user-name and --target-dir on the command line\n\
         hint: Use --config-path or GIT_MIRROR_CONFIG to point at a different file",
        path = path.display()
    )
}

/// Generate an error for a required setting that neither a flag nor the
/// config file supplied.
pub fn missing_setting(host: &str, setting: &str, flag: &str) -> anyhow::Error {
    anyhow::anyhow!(
        "No {setting} configured for host '{host}'\n\n\
         hint: Pass {flag} on the command line\n\
         hint: Or run 'git-mirror init' to store it in the config file"
    )
}

/// Generate an error for a base directory that does not exist.
pub fn target_dir_missing(path: &Path) -> anyhow::Error {
    anyhow::anyhow!(
        "Target directory does not exist: {path}\n\n\
         hint: Create it, or run 'git-mirror clone-all' which creates it for you\n\
         hint: Check target_dir in the config file or the --target-dir flag",
        path = path.display()
    )
}

/// Generate an error for cross-repo commands without a template directory.
pub fn template_dir_not_configured(host: &str) -> anyhow::Error {
    anyhow::anyhow!(
        "No global_template_dir configured for host '{host}'\n\n\
         hint: Add global_template_dir = \"~/templates\" to [tool.git-mirror.{host}]\n\
         hint: The directory must contain a template_map.txt and one folder per template"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_token_names_variable() {
        let err = missing_token("selfhosted", "SELFHOSTED_ACCESS_TOKEN");
        let msg = err.to_string();
        assert!(msg.contains("'selfhosted'"));
        assert!(msg.contains("hint: Export SELFHOSTED_ACCESS_TOKEN"));
    }

    #[test]
    fn test_host_not_configured() {
        let err = host_not_configured("gitlab", Path::new("/home/me/git_mirror.toml"));
        let msg = err.to_string();
        assert!(msg.contains("/home/me/git_mirror.toml"));
        assert!(msg.contains("git-mirror init"));
    }

    #[test]
    fn test_missing_setting() {
        let msg = missing_setting("github", "user name", "--user-name").to_string();
        assert!(msg.contains("No user name configured"));
        assert!(msg.contains("--user-name"));
    }

    #[test]
    fn test_target_dir_missing() {
        let msg = target_dir_missing(Path::new("/nowhere")).to_string();
        assert!(msg.contains("/nowhere"));
    }

    #[test]
    fn test_template_dir_not_configured() {
        let msg = template_dir_not_configured("github").to_string();
        assert!(msg.contains("[tool.git-mirror.github]"));
    }
}
