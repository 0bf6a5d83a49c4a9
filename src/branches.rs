//! # Branch Synchronization
//!
//! Two per-repository workflows that keep local branches in line with the
//! host:
//!
//! - **update-from-main** fetches once, then brings every local branch other
//!   than the host's default branch up to date with `origin/<default>`, by
//!   merge or rebase. A failing branch is reported and the next one is tried.
//! - **prune** deletes local branches that no longer exist on the host, using
//!   git's safe delete so unmerged work is never thrown away.
//!
//! Host lookups that fail (renamed or deleted repository, expired token) end
//! only the current repository's work.

use std::collections::HashSet;
use std::path::Path;

use log::debug;

use crate::confirm::Confirmer;
use crate::defaults::DEFAULT_REMOTE;
use crate::error::Result;
use crate::executor::Status;
use crate::host::HostClient;
use crate::output::Report;
use crate::repository::{dir_name, GitOperations, LocalBranch};

/// Runs branch workflows for repositories owned by `owner` on one host.
pub struct BranchSynchronizer<'a> {
    git: &'a dyn GitOperations,
    host: &'a dyn HostClient,
    owner: &'a str,
    dry_run: bool,
}

impl<'a> BranchSynchronizer<'a> {
    pub fn new(
        git: &'a dyn GitOperations,
        host: &'a dyn HostClient,
        owner: &'a str,
        dry_run: bool,
    ) -> Self {
        Self {
            git,
            host,
            owner,
            dry_run,
        }
    }

    /// `owner/<directory name>`, the host identifier of a local clone.
    pub fn full_name(&self, repo: &Path) -> String {
        format!("{}/{}", self.owner, dir_name(repo))
    }

    /// Merge (or rebase onto) `origin/<default>` into every other local branch.
    pub fn update_from_main(
        &self,
        repo: &Path,
        prefer_rebase: bool,
        report: &mut Report,
    ) -> Result<Status> {
        let full_name = self.full_name(repo);
        let default_branch = match self.host.default_branch(&full_name) {
            Ok(branch) => branch,
            Err(e) => {
                report.danger(format!(
                    "Failed to retrieve info on repository {full_name}: {e}"
                ));
                return Ok(Status::Failed);
            }
        };

        if !self.dry_run {
            self.git.fetch_all(repo)?;
        }

        let upstream = format!("{DEFAULT_REMOTE}/{default_branch}");
        let mut updated = 0;
        let mut failed = 0;
        for branch in self.git.local_branches(repo)? {
            if branch.name == default_branch {
                continue;
            }
            if self.dry_run {
                report.plain(format!(
                    "Would have updated branch '{}' with latest changes from '{}'.",
                    branch.name, default_branch
                ));
                updated += 1;
                continue;
            }
            match self.update_branch(repo, &branch, &upstream, prefer_rebase) {
                Ok(()) => {
                    report.success(format!(
                        "Updated branch '{}' with latest changes from '{}'.",
                        branch.name, default_branch
                    ));
                    updated += 1;
                }
                Err(e) => {
                    report.danger(format!("Failed to update branch '{}': {}", branch.name, e));
                    failed += 1;
                }
            }
        }

        Ok(if failed > 0 {
            Status::Failed
        } else if updated == 0 {
            Status::Skipped
        } else {
            Status::Success
        })
    }

    fn update_branch(
        &self,
        repo: &Path,
        branch: &LocalBranch,
        upstream: &str,
        prefer_rebase: bool,
    ) -> Result<()> {
        self.git.checkout(repo, &branch.name)?;
        if branch.upstream.is_some() {
            self.git.pull(repo)?;
        }
        if prefer_rebase {
            self.git.rebase(repo, upstream)
        } else {
            self.git.merge(repo, upstream)
        }
    }

    /// Delete local branches that are gone from the host.
    ///
    /// With `per_branch` set, each deletion is confirmed individually;
    /// otherwise the batch-level confirmation already covers them.
    pub fn prune(
        &self,
        repo: &Path,
        per_branch: Option<&dyn Confirmer>,
        report: &mut Report,
    ) -> Result<Status> {
        let full_name = self.full_name(repo);
        let host_name = self.host.kind().to_string();
        let on_host: HashSet<String> = match self.host.list_branches(&full_name) {
            Ok(branches) => branches.into_iter().collect(),
            Err(e) => {
                report.danger(format!(
                    "Failed to retrieve info on repository {full_name}: {e}"
                ));
                return Ok(Status::Failed);
            }
        };

        let local = self.git.load(repo)?;
        let candidates: Vec<String> = local
            .branch_names()
            .filter(|name| !on_host.contains(*name))
            .map(str::to_string)
            .collect();

        if candidates.is_empty() {
            report.plain(format!(
                "For {full_name}, no local branches exist that are missing on {host_name}."
            ));
            return Ok(Status::Skipped);
        }

        let mut kept = 0;
        for branch in &candidates {
            if let Some(confirmer) = per_branch {
                let prompt =
                    format!("The branch '{branch}' does not exist on {host_name}. Delete locally?");
                match confirmer.confirm(&prompt) {
                    Ok(true) => {}
                    Ok(false) => {
                        report.plain(format!("Skipped deletion of branch '{branch}'."));
                        continue;
                    }
                    Err(e) => {
                        report.danger(format!("Skipped deletion of branch '{branch}': {e}"));
                        continue;
                    }
                }
            }

            if self.dry_run {
                report.plain(format!("Would have deleted branch '{branch}' locally."));
                continue;
            }

            match self.git.delete_branch(repo, branch, false) {
                Ok(()) => report.success(format!("Deleted branch '{branch}' locally.")),
                Err(e) => {
                    debug!("Safe delete refused: {}", e);
                    report.warn(format!(
                        "Could not delete branch '{branch}'. It may not be fully merged."
                    ));
                    kept += 1;
                }
            }
        }

        Ok(if kept > 0 {
            Status::Failed
        } else {
            Status::Success
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{remote_repo, FakeHost, MockGit, MockRepo, ScriptedConfirmer};
    use std::path::PathBuf;

    fn alpha() -> PathBuf {
        PathBuf::from("/src/alpha")
    }

    fn host() -> FakeHost {
        FakeHost::with_repos(vec![remote_repo("alpha", false)])
    }

    #[test]
    fn test_feature_branch_is_merged_and_default_branch_left_alone() {
        let git = MockGit::new().with_repo(
            alpha(),
            MockRepo::with_origin("alpha").branch("feature-x", Some("origin/feature-x")),
        );
        let host = host();
        let sync = BranchSynchronizer::new(&git, &host, "me", false);
        let mut report = Report::new();

        let status = sync.update_from_main(&alpha(), false, &mut report).unwrap();

        assert_eq!(status, Status::Success);
        assert_eq!(
            git.calls_for("alpha"),
            vec!["fetch", "checkout feature-x", "pull", "merge origin/main"]
        );
        assert_eq!(
            report.last_text(),
            Some("Updated branch 'feature-x' with latest changes from 'main'.")
        );
    }

    #[test]
    fn test_prefer_rebase_and_untracked_branch_skips_pull() {
        let git = MockGit::new().with_repo(
            alpha(),
            MockRepo::with_origin("alpha").branch("wip", None),
        );
        let host = host();
        let sync = BranchSynchronizer::new(&git, &host, "me", false);

        sync.update_from_main(&alpha(), true, &mut Report::new())
            .unwrap();

        assert_eq!(
            git.calls_for("alpha"),
            vec!["fetch", "checkout wip", "rebase origin/main"]
        );
    }

    #[test]
    fn test_failed_branch_does_not_stop_the_rest() {
        let git = MockGit::new()
            .with_repo(
                alpha(),
                MockRepo::with_origin("alpha")
                    .branch("feature-a", None)
                    .branch("feature-b", None),
            )
            .failing("checkout feature-a", "error: pathspec did not match");
        let host = host();
        let sync = BranchSynchronizer::new(&git, &host, "me", false);
        let mut report = Report::new();

        let status = sync.update_from_main(&alpha(), false, &mut report).unwrap();

        assert_eq!(status, Status::Failed);
        let texts = report.texts();
        assert!(texts[0].starts_with("Failed to update branch 'feature-a'"));
        assert_eq!(
            texts[1],
            "Updated branch 'feature-b' with latest changes from 'main'."
        );
        assert!(git
            .calls_for("alpha")
            .contains(&"merge origin/main".to_string()));
    }

    #[test]
    fn test_dry_run_update_touches_nothing() {
        let git = MockGit::new().with_repo(
            alpha(),
            MockRepo::with_origin("alpha").branch("feature-x", Some("origin/feature-x")),
        );
        let host = host();
        let sync = BranchSynchronizer::new(&git, &host, "me", true);
        let mut report = Report::new();

        sync.update_from_main(&alpha(), false, &mut report).unwrap();

        assert!(git.calls().is_empty());
        assert_eq!(
            report.texts(),
            vec!["Would have updated branch 'feature-x' with latest changes from 'main'."]
        );
    }

    #[test]
    fn test_unknown_repository_fails_only_this_repo() {
        let git = MockGit::new().with_repo(alpha(), MockRepo::with_origin("alpha"));
        let host = FakeHost::default();
        let sync = BranchSynchronizer::new(&git, &host, "me", false);
        let mut report = Report::new();

        let status = sync.update_from_main(&alpha(), false, &mut report).unwrap();

        assert_eq!(status, Status::Failed);
        assert!(report
            .last_text()
            .unwrap()
            .starts_with("Failed to retrieve info on repository me/alpha"));
        assert!(git.calls().is_empty());
    }

    #[test]
    fn test_prune_deletes_merged_branch_missing_on_host() {
        let git = MockGit::new().with_repo(
            alpha(),
            MockRepo::with_origin("alpha").branch("old-feature", None),
        );
        let host = host();
        let sync = BranchSynchronizer::new(&git, &host, "me", false);
        let mut report = Report::new();

        let status = sync.prune(&alpha(), None, &mut report).unwrap();

        assert_eq!(status, Status::Success);
        assert_eq!(git.calls_for("alpha"), vec!["branch -d old-feature"]);
        assert_eq!(report.texts(), vec!["Deleted branch 'old-feature' locally."]);
        let names: Vec<_> = git
            .repo(&alpha())
            .branches
            .into_iter()
            .map(|b| b.name)
            .collect();
        assert_eq!(names, vec!["main"]);
    }

    #[test]
    fn test_prune_keeps_unmerged_branch() {
        let mut repo = MockRepo::with_origin("alpha").branch("old-feature", None);
        repo.unmerged.insert("old-feature".to_string());
        let git = MockGit::new().with_repo(alpha(), repo);
        let host = host();
        let sync = BranchSynchronizer::new(&git, &host, "me", false);
        let mut report = Report::new();

        let status = sync.prune(&alpha(), None, &mut report).unwrap();

        assert_eq!(status, Status::Failed);
        assert_eq!(
            report.texts(),
            vec!["Could not delete branch 'old-feature'. It may not be fully merged."]
        );
        assert_eq!(git.repo(&alpha()).branches.len(), 2);
    }

    #[test]
    fn test_prune_nothing_to_do() {
        let git = MockGit::new().with_repo(alpha(), MockRepo::with_origin("alpha"));
        let host = host();
        let sync = BranchSynchronizer::new(&git, &host, "me", false);
        let mut report = Report::new();

        let status = sync.prune(&alpha(), None, &mut report).unwrap();

        assert_eq!(status, Status::Skipped);
        assert_eq!(
            report.texts(),
            vec!["For me/alpha, no local branches exist that are missing on GitHub."]
        );
    }

    #[test]
    fn test_prune_interactive_asks_per_branch() {
        let git = MockGit::new().with_repo(
            alpha(),
            MockRepo::with_origin("alpha")
                .branch("keep-me", None)
                .branch("drop-me", None),
        );
        let host = host();
        let confirmer = ScriptedConfirmer::new(&[false, true]);
        let sync = BranchSynchronizer::new(&git, &host, "me", false);
        let mut report = Report::new();

        sync.prune(&alpha(), Some(&confirmer), &mut report).unwrap();

        assert_eq!(
            confirmer.asked(),
            vec![
                "The branch 'keep-me' does not exist on GitHub. Delete locally?",
                "The branch 'drop-me' does not exist on GitHub. Delete locally?",
            ]
        );
        assert_eq!(
            report.texts(),
            vec![
                "Skipped deletion of branch 'keep-me'.",
                "Deleted branch 'drop-me' locally.",
            ]
        );
        assert_eq!(git.calls_for("alpha"), vec!["branch -d drop-me"]);
    }

    #[test]
    fn test_prune_dry_run() {
        let git = MockGit::new().with_repo(
            alpha(),
            MockRepo::with_origin("alpha").branch("old-feature", None),
        );
        let host = host();
        let sync = BranchSynchronizer::new(&git, &host, "me", true);
        let mut report = Report::new();

        sync.prune(&alpha(), None, &mut report).unwrap();

        assert!(git.calls().is_empty());
        assert_eq!(
            report.texts(),
            vec!["Would have deleted branch 'old-feature' locally."]
        );
    }
}
