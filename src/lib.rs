//! # git-mirror
//!
//! This library keeps a local directory of working copies in step with every
//! repository an account owns on GitHub or GitLab. It is the engine behind
//! the `git-mirror` command-line tool and can be embedded elsewhere.
//!
//! ## Quick Example
//!
//! ```
//! use git_mirror::git::extract_repo_name;
//! use git_mirror::executor::Operation;
//!
//! assert_eq!(extract_repo_name("git@github.com:me/dedlin.git/"), "dedlin");
//! assert_eq!(Operation::PruneBranch.to_string(), "prune branches");
//! ```
//!
//! ## Core Concepts
//!
//! - **Local side (`scanner`, `inspector`, `repository`, `git`)**: find the
//!   working copies under a base directory and read their remotes, branches
//!   and dirty state through the [`repository::GitOperations`] trait.
//! - **Remote side (`host`, `inventory`)**: list the account's repositories
//!   through [`host::HostClient`], which hides whether the host is GitHub or
//!   GitLab.
//! - **Reconciliation (`reconcile`)**: give each local directory exactly one
//!   verdict against the host listing.
//! - **Batches (`executor`)**: run one operation over many repositories,
//!   sequentially for small batches and on a worker pool otherwise. One
//!   failing repository never stops the others.
//! - **Operations (`branches`, `relock`, `template_sync`, `pypi`)**: the
//!   per-repository work: branch updates and pruning, lock file refresh with
//!   a review request, template file sync, PyPI release audit.
//! - **Commands (`manager`)**: one method per user-facing command, with
//!   confirmation and dry-run handled uniformly.
//!
//! Output goes through [`output::Console`], which serialises whole
//! per-repository reports so lines from parallel workers never interleave.

pub mod branches;
pub mod config;
pub mod confirm;
pub mod defaults;
pub mod error;
pub mod executor;
pub mod git;
pub mod host;
pub mod inspector;
pub mod inventory;
pub mod manager;
pub mod output;
pub mod performance;
pub mod pypi;
pub mod reconcile;
pub mod relock;
pub mod repository;
pub mod scanner;
pub mod suggestions;
pub mod template_sync;

#[cfg(test)]
mod reconcile_proptest;
#[cfg(test)]
mod testing;
