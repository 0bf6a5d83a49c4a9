//! # Error Handling
//!
//! Centralized error type for the `git-mirror` library, built with
//! `thiserror`. Every fallible operation in the crate returns
//! [`Result<T>`], an alias for `std::result::Result<T, Error>`.
//!
//! The variants follow the failure taxonomy the batch engine works with:
//!
//! - **`Config`** errors are raised while resolving settings, before any
//!   repository is touched. Together with missing credentials (reported by
//!   the binary) they are the only errors that end a command with a non-zero
//!   exit code.
//! - **`InvalidRepository`** marks a directory that was expected to be a git
//!   working copy but is not one. Always recoverable: counted and skipped.
//! - **`VcsOperation`** wraps any failing git subcommand. It is recoverable at
//!   the granularity of a single repository or a single branch.
//! - **`HostApi`** covers failures talking to GitHub or GitLab. Per-repository
//!   calls fail only that repository; the initial listing degrades to an empty
//!   inventory with a warning.
//!
//! A declined confirmation prompt is deliberately *not* an error; see
//! [`crate::executor::BatchRun::Declined`].

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for git-mirror operations
#[derive(Error, Debug)]
pub enum Error {
    /// Settings are missing or inconsistent.
    #[error("Configuration error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    Config {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// A directory expected to be a git working copy is not one.
    #[error("{} is not a valid Git repository", path.display())]
    InvalidRepository { path: PathBuf },

    /// A git subcommand exited unsuccessfully.
    ///
    /// `branch` is filled in when the failure happened while working on a
    /// specific branch, so the caller can report it and move on.
    #[error("git {command} failed in {}{}: {stderr}", path.display(), branch.as_ref().map(|b| format!(" (branch '{}')", b)).unwrap_or_default())]
    VcsOperation {
        command: String,
        path: PathBuf,
        branch: Option<String>,
        stderr: String,
    },

    /// The source host's API returned an error or could not be reached.
    #[error("{host} API error: {message}")]
    HostApi { host: String, message: String },

    /// The package registry could not be queried.
    #[error("Package registry error for {package}: {message}")]
    Registry { package: String, message: String },

    /// Template map or template directory problem.
    #[error("Template error: {message}")]
    Template { message: String },

    /// An external program (e.g. the dependency locker) failed.
    #[error("{program} failed: {message}")]
    Subprocess { program: String, message: String },

    /// An interactive prompt could not be shown or read.
    #[error("Prompt failed: {message}")]
    Prompt { message: String },

    /// An I/O error tied to a specific path.
    #[error("I/O error at {}: {source}", path.display())]
    PathIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A TOML parsing error, wrapped from `toml::de::Error`.
    #[error("TOML parsing error: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// A TOML serialization error, wrapped from `toml::ser::Error`.
    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// A JSON error, wrapped from `serde_json::Error`.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A URL parsing error, wrapped from `url::ParseError`.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl Error {
    /// Attach a path to an I/O error.
    pub fn io_at(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::PathIo {
            path: path.into(),
            source,
        }
    }

    /// Shorthand for a host API failure.
    pub fn host(host: impl Into<String>, message: impl Into<String>) -> Self {
        Error::HostApi {
            host: host.into(),
            message: message.into(),
        }
    }

    /// Returns the same error tagged with the branch it happened on.
    ///
    /// Only `VcsOperation` carries a branch; other variants are returned as is.
    pub fn on_branch(self, name: &str) -> Self {
        match self {
            Error::VcsOperation {
                command,
                path,
                stderr,
                ..
            } => Error::VcsOperation {
                command,
                path,
                branch: Some(name.to_string()),
                stderr,
            },
            other => other,
        }
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_config_with_hint() {
        let error = Error::Config {
            message: "target_dir is not set".to_string(),
            hint: Some("Run 'git-mirror init'".to_string()),
        };
        let display = format!("{}", error);
        assert!(display.contains("Configuration error"));
        assert!(display.contains("target_dir is not set"));
        assert!(display.contains("hint: Run 'git-mirror init'"));
    }

    #[test]
    fn test_error_display_config_without_hint() {
        let error = Error::Config {
            message: "bad".to_string(),
            hint: None,
        };
        assert!(!format!("{}", error).contains("hint"));
    }

    #[test]
    fn test_error_display_invalid_repository() {
        let error = Error::InvalidRepository {
            path: PathBuf::from("/tmp/stray"),
        };
        assert_eq!(
            format!("{}", error),
            "/tmp/stray is not a valid Git repository"
        );
    }

    #[test]
    fn test_error_display_vcs_operation() {
        let error = Error::VcsOperation {
            command: "pull".to_string(),
            path: PathBuf::from("/src/alpha"),
            branch: None,
            stderr: "fatal: no upstream".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("git pull failed in /src/alpha"));
        assert!(display.contains("fatal: no upstream"));
        assert!(!display.contains("branch"));
    }

    #[test]
    fn test_on_branch_tags_vcs_errors_only() {
        let error = Error::VcsOperation {
            command: "merge".to_string(),
            path: PathBuf::from("/src/alpha"),
            branch: None,
            stderr: "conflict".to_string(),
        }
        .on_branch("feature-x");
        assert!(format!("{}", error).contains("(branch 'feature-x')"));

        let untouched = Error::host("GitHub", "404").on_branch("feature-x");
        assert_eq!(format!("{}", untouched), "GitHub API error: 404");
    }

    #[test]
    fn test_error_from_io_error() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let error: Error = io_error.into();
        let display = format!("{}", error);
        assert!(display.contains("I/O error"));
        assert!(display.contains("File not found"));
    }

    #[test]
    fn test_error_io_at_includes_path() {
        let error = Error::io_at(
            "/tmp/x",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let display = format!("{}", error);
        assert!(display.contains("/tmp/x"));
        assert!(display.contains("denied"));
    }

    #[test]
    fn test_error_from_toml_error() {
        let toml_error = toml::from_str::<toml::Table>("key = [unclosed").unwrap_err();
        let error: Error = toml_error.into();
        assert!(format!("{}", error).contains("TOML parsing error"));
    }
}
