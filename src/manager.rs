//! # Command Orchestration
//!
//! Each user-facing command is one method here. The methods pull the
//! components together: scan or list, confirm, run the batch, and print a
//! summary.
//!
//! Commands that only touch local clones live on [`Workspace`] and need no
//! host credentials. [`MirrorManager`] adds a [`HostClient`] for everything
//! that has to ask the host.
//!
//! Confirmation always happens before any item reaches the executor;
//! declining returns [`BatchRun::Declined`] with nothing changed.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::warn;

use crate::branches::BranchSynchronizer;
use crate::config::{ConfigStore, RepoSync};
use crate::confirm::Confirmer;
use crate::error::Result;
use crate::executor::{BatchExecutor, BatchReport, BatchRun, Operation, Status, WorkItem};
use crate::host::{AccountSummary, BuildStatus, Conclusion, HostClient, RemoteRepo};
use crate::inspector::inspect;
use crate::inventory::{list_group_repos, list_user_repos, Inventory, RepoFilter};
use crate::output::{Console, Report, Tone};
use crate::performance::log_duration;
use crate::pypi::{PackageRegistry, PublishAudit, PublishRow};
use crate::reconcile::{classify_local_repos, missing_locally, Reconciliation, Verdict};
use crate::relock::{CommandRunner, DependencyRelocker, RelockPlan};
use crate::repository::{dir_name, GitOperations};
use crate::scanner::LocalRepoScanner;
use crate::template_sync::{ProjectComparison, TemplateSet};

/// Validated settings shared by every command.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    /// Directory holding one clone per repository.
    pub base_dir: PathBuf,
    pub user_login: String,
    pub include_private: bool,
    pub include_forks: bool,
    pub dry_run: bool,
    /// Ask before bulk or destructive work; `false` means `--yes`.
    pub prompt_for_changes: bool,
    pub single_threaded: bool,
}

/// Totals printed at the end of `local-changes`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocalChanges {
    pub inspected: usize,
    pub dirty: usize,
    pub unpushed: usize,
    pub failed: usize,
}

impl LocalChanges {
    pub fn is_clean(&self) -> bool {
        self.dirty == 0 && self.unpushed == 0 && self.failed == 0
    }
}

/// Commands that work on local clones only.
#[derive(Clone)]
pub struct Workspace {
    git: Arc<dyn GitOperations>,
    console: Console,
    confirmer: Arc<dyn Confirmer>,
    settings: Settings,
}

impl Workspace {
    pub fn new(
        git: Arc<dyn GitOperations>,
        console: Console,
        confirmer: Arc<dyn Confirmer>,
        settings: Settings,
    ) -> Self {
        Self {
            git,
            console,
            confirmer,
            settings,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn console(&self) -> &Console {
        &self.console
    }

    pub fn scanner(&self) -> LocalRepoScanner {
        LocalRepoScanner::new(&self.settings.base_dir)
    }

    fn executor(&self) -> BatchExecutor {
        BatchExecutor::new(self.console.clone(), self.settings.single_threaded)
    }

    /// Ask `prompt` unless prompting is off. A prompt that cannot be shown
    /// counts as "no".
    fn confirmed(&self, prompt: &str, cancelled: &str) -> bool {
        if !self.settings.prompt_for_changes {
            return true;
        }
        let answer = self.confirmer.confirm(prompt).unwrap_or_else(|e| {
            warn!("{}", e);
            false
        });
        if !answer {
            self.console.plain(cancelled);
        }
        answer
    }

    fn print_summary(&self, what: &str, report: &BatchReport) {
        if !report.is_empty() {
            self.console
                .line(Tone::Info, format!("{what}: {}", report.summary()));
        }
    }

    /// Report uncommitted changes and unpushed commits in every clone.
    pub fn local_changes(&self) -> LocalChanges {
        log_duration("local-changes", || {
            let mut totals = LocalChanges::default();
            for repo in self.scanner().iter() {
                totals.inspected += 1;
                let mut report = Report::new();
                match inspect(self.git.as_ref(), &repo) {
                    Ok(tree) => {
                        if tree.is_dirty {
                            totals.dirty += 1;
                        }
                        if tree.has_unpushed() {
                            totals.unpushed += 1;
                        }
                        tree.render(&mut report);
                    }
                    Err(e) => {
                        totals.failed += 1;
                        report.danger(e.to_string());
                    }
                }
                self.console.emit(&report);
            }
            if totals.is_clean() {
                self.console
                    .success("All repositories are clean, no uncommitted changes.");
            }
            totals
        })
    }

    /// `git pull` in every clone.
    pub fn pull_all(&self) -> BatchReport {
        log_duration("pull-all", || {
            let items = WorkItem::batch(self.scanner().scan(), Operation::Pull);
            let dry_run = self.settings.dry_run;
            let report = self.executor().run(&items, |item, out| {
                let path = item.target.display();
                if dry_run {
                    out.plain(format!("Would have pulled latest changes in {path}"));
                    return Ok(Status::Success);
                }
                out.plain(format!("Pulling latest changes in {path}"));
                match self.git.pull(&item.target) {
                    Ok(()) => Ok(Status::Success),
                    Err(e) => {
                        out.danger(format!("Failed to pull repo at {path}: {e}"));
                        Ok(Status::Failed)
                    }
                }
            });
            self.print_summary("Pull", &report);
            report
        })
    }

    /// Add every clone missing from the template map. Returns the names added.
    pub fn cross_repo_init(&self, template_dir: &Path, use_default: bool) -> Result<Vec<String>> {
        log_duration("cross-repo-init", || self.cross_repo_init_inner(template_dir, use_default))
    }

    fn cross_repo_init_inner(&self, template_dir: &Path, use_default: bool) -> Result<Vec<String>> {
        let mut templates = TemplateSet::open(template_dir)?;
        let added = templates.init(&self.scanner().scan(), use_default)?;
        let map_path = templates.map_path();
        if added.is_empty() {
            self.console.plain(format!(
                "All projects already have an entry in {}.",
                map_path.display()
            ));
        } else if use_default {
            self.console.success(format!(
                "Assigned the default template to {} projects in {}.",
                added.len(),
                map_path.display()
            ));
        } else {
            self.console.warn(
                "Please fill in the template_map.txt file with the correct template for each project.",
            );
            self.console
                .plain(format!("File is located at {}", map_path.display()));
        }
        Ok(added)
    }

    /// Print how each clone differs from its template.
    pub fn cross_repo_report(&self, template_dir: &Path) -> Result<Vec<ProjectComparison>> {
        log_duration("cross-repo-report", || self.cross_repo_report_inner(template_dir))
    }

    fn cross_repo_report_inner(&self, template_dir: &Path) -> Result<Vec<ProjectComparison>> {
        let templates = TemplateSet::open(template_dir)?;
        let mut comparisons = Vec::new();
        for repo in self.scanner().iter() {
            let mut report = Report::new();
            match templates.compare(&repo) {
                Ok(Some(comparison)) => {
                    comparison.render(&mut report);
                    comparisons.push(comparison);
                }
                Ok(None) => report.plain(format!(
                    "No template assigned to {} in {}.",
                    dir_name(&repo),
                    templates.map_path().display()
                )),
                Err(e) => report.danger(format!("Failed to compare {}: {}", dir_name(&repo), e)),
            }
            self.console.emit(&report);
        }
        Ok(comparisons)
    }

    /// Copy template files into every clone that has a template.
    pub fn cross_repo_sync(&self, template_dir: &Path) -> Result<BatchRun> {
        log_duration("cross-repo-sync", || self.cross_repo_sync_inner(template_dir))
    }

    fn cross_repo_sync_inner(&self, template_dir: &Path) -> Result<BatchRun> {
        let templates = TemplateSet::open(template_dir)?;
        let projects: Vec<PathBuf> = self
            .scanner()
            .iter()
            .filter(|repo| templates.map().template_for(&dir_name(repo)).is_some())
            .collect();
        if projects.is_empty() {
            self.console.plain(format!(
                "No projects have a template assigned in {}.",
                templates.map_path().display()
            ));
            return Ok(BatchRun::Completed(BatchReport::default()));
        }

        let prompt = format!("Copy template files into {} projects?", projects.len());
        if !self.confirmed(&prompt, "Sync cancelled.") {
            return Ok(BatchRun::Declined);
        }

        let items = WorkItem::batch(projects, Operation::TemplateSync);
        let dry_run = self.settings.dry_run;
        let report = self
            .executor()
            .run(&items, |item, out| templates.sync(&item.target, dry_run, out));
        self.print_summary("Template sync", &report);
        Ok(BatchRun::Completed(report))
    }

    /// Compare each clone's last commit with its latest PyPI release.
    pub fn pypi_status(
        &self,
        registry: &dyn PackageRegistry,
        owner: Option<&str>,
        show_progress: bool,
    ) -> Vec<PublishRow> {
        log_duration("pypi-status", || {
            let repos = self.scanner().scan();
            let rows = PublishAudit::new(registry, self.git.as_ref(), owner).run(&repos, show_progress);

            let mut report = Report::new();
            if rows.is_empty() {
                report.plain("No published packages found.");
            } else {
                report.plain(format!(
                    "{:<30} {:<20} {:<12} {:<12} {:>6}",
                    "Package", "PyPI owner", "Repo change", "PyPI change", "Days"
                ));
                for row in &rows {
                    let line = format!(
                        "{:<30} {:<20} {:<12} {:<12} {:>6}",
                        row.package,
                        row.owner.as_deref().unwrap_or("-"),
                        row.repo_last_commit.format("%Y-%m-%d"),
                        row.pypi_last_release.format("%Y-%m-%d"),
                        row.days_difference
                    );
                    if row.is_stale() {
                        report.danger(line);
                    } else {
                        report.plain(line);
                    }
                }
            }
            self.console.emit(&report);
            rows
        })
    }
}

/// Commands that need the source host.
pub struct MirrorManager {
    workspace: Workspace,
    host: Box<dyn HostClient>,
}

impl MirrorManager {
    pub fn new(workspace: Workspace, host: Box<dyn HostClient>) -> Self {
        Self { workspace, host }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    fn settings(&self) -> &Settings {
        &self.workspace.settings
    }

    fn console(&self) -> &Console {
        &self.workspace.console
    }

    fn git(&self) -> &dyn GitOperations {
        self.workspace.git.as_ref()
    }

    fn filter(&self) -> RepoFilter {
        let s = self.settings();
        RepoFilter::new(&s.user_login, s.include_private, s.include_forks)
    }

    fn inventory(&self, filter: &RepoFilter) -> Inventory {
        let inventory = list_user_repos(self.host.as_ref(), filter);
        if let Some(warning) = &inventory.warning {
            self.console().warn(warning.clone());
        }
        inventory
    }

    /// Print the user's repositories.
    pub fn list_repos(&self) -> Inventory {
        log_duration("list-repos", || {
            let inventory = self.inventory(&self.filter());
            let mut report = Report::new();
            for repo in &inventory.repos {
                report.plain(format!(
                    "{:<40} {:<8} {:<5} {}",
                    repo.name,
                    if repo.private { "private" } else { "public" },
                    if repo.is_fork { "fork" } else { "" },
                    repo.description.as_deref().unwrap_or_default()
                ));
            }
            let local = self.workspace.scanner().scan();
            let missing = missing_locally(&inventory.repos, &local);
            if !missing.is_empty() {
                report.push(
                    Tone::Info,
                    format!(
                        "{} of {} repositories are not cloned into {}.",
                        missing.len(),
                        inventory.len(),
                        self.settings().base_dir.display()
                    ),
                );
            }
            self.console().emit(&report);
            inventory
        })
    }

    /// Clone every listed repository (or every project of `group`) into the
    /// base directory. Existing directories are skipped.
    pub fn clone_all(&self, group: Option<u64>) -> BatchRun {
        log_duration("clone-all", || {
            let inventory = match group {
                Some(id) => {
                    let inventory = list_group_repos(self.host.as_ref(), id);
                    if let Some(warning) = &inventory.warning {
                        self.console().warn(warning.clone());
                    }
                    inventory
                }
                None => self.inventory(&self.filter()),
            };
            if inventory.is_empty() {
                self.console().plain("No repositories to clone.");
                return BatchRun::Completed(BatchReport::default());
            }

            let base = &self.settings().base_dir;
            let prompt = format!(
                "Clone {} repositories into {}?",
                inventory.len(),
                base.display()
            );
            if !self.workspace.confirmed(&prompt, "Cloning cancelled.") {
                return BatchRun::Declined;
            }

            let items = WorkItem::batch(inventory.repos, Operation::Clone);
            let report = self
                .workspace
                .executor()
                .run(&items, |item, out| self.clone_one(&item.target, out));
            self.workspace.print_summary("Clone", &report);
            BatchRun::Completed(report)
        })
    }

    fn clone_one(&self, repo: &RemoteRepo, out: &mut Report) -> Result<Status> {
        let base = &self.settings().base_dir;
        let target = base.join(&repo.name);
        if target.exists() {
            out.plain(format!(
                "Repository {} already exists locally. Skipping clone.",
                repo.name
            ));
            return Ok(Status::Skipped);
        }
        if self.settings().dry_run {
            out.plain(format!(
                "Would have cloned {} into {}",
                repo.clone_url,
                base.display()
            ));
            return Ok(Status::Success);
        }
        out.plain(format!("Cloning {} into {}", repo.clone_url, base.display()));
        match self.git().clone_repo(&repo.clone_url, &target) {
            Ok(()) => Ok(Status::Success),
            Err(e) => {
                out.danger(format!("Failed to clone {}: {}", repo.name, e));
                Ok(Status::Failed)
            }
        }
    }

    /// Classify every local directory against the host and print offenders.
    pub fn not_repo(&self) -> Reconciliation {
        log_duration("not-repo", || {
            let inventory = self.inventory(&self.filter().unfiltered());
            let scanner = self.workspace.scanner();
            let mut dirs = scanner.scan();
            dirs.extend(scanner.stray_directories());
            dirs.sort();

            let result = classify_local_repos(self.git(), &dirs, &inventory.index());
            let host_name = self.host.kind().to_string();
            let mut report = Report::new();
            for (dir, verdict) in &result.verdicts {
                if let Some(line) = verdict.describe(dir, &host_name) {
                    report.warn(line);
                }
            }
            let counts = result.counts();
            report.push(
                Tone::Info,
                format!(
                    "{} clean, {} without remote, {} not on {}, {} forks, {} invalid",
                    counts[&Verdict::Clean],
                    counts[&Verdict::NoRemoteDefined],
                    counts[&Verdict::NotFoundOnHost],
                    host_name,
                    counts[&Verdict::IsFork],
                    counts[&Verdict::InvalidRepository]
                ),
            );
            self.console().emit(&report);
            result
        })
    }

    /// Bring every non-default branch of every clone up to date.
    pub fn update_from_main(&self, prefer_rebase: bool) -> BatchReport {
        log_duration("update-from-main", || {
            let items = WorkItem::batch(self.workspace.scanner().scan(), Operation::UpdateBranch);
            let sync = BranchSynchronizer::new(
                self.git(),
                self.host.as_ref(),
                &self.settings().user_login,
                self.settings().dry_run,
            );
            let report = self.workspace.executor().run(&items, |item, out| {
                sync.update_from_main(&item.target, prefer_rebase, out)
            });
            self.workspace.print_summary("Update", &report);
            report
        })
    }

    /// Delete local branches that are gone from the host.
    ///
    /// `interactive` replaces the batch confirmation with one prompt per
    /// branch and forces sequential execution so prompts do not overlap.
    pub fn prune_all(&self, interactive: bool) -> BatchRun {
        log_duration("prune-all", || {
            let repos = self.workspace.scanner().scan();
            if repos.is_empty() {
                self.console().plain("No local repositories found.");
                return BatchRun::Completed(BatchReport::default());
            }
            let host_name = self.host.kind().to_string();
            if !interactive {
                let prompt = format!(
                    "Delete local branches that no longer exist on {} in {} repositories?",
                    host_name,
                    repos.len()
                );
                if !self.workspace.confirmed(&prompt, "Pruning cancelled.") {
                    return BatchRun::Declined;
                }
            }

            let per_branch: Option<&dyn Confirmer> =
                interactive.then(|| self.workspace.confirmer.as_ref());
            let executor = BatchExecutor::new(
                self.console().clone(),
                self.settings().single_threaded || interactive,
            );
            let sync = BranchSynchronizer::new(
                self.git(),
                self.host.as_ref(),
                &self.settings().user_login,
                self.settings().dry_run,
            );
            let items = WorkItem::batch(repos, Operation::PruneBranch);
            let report = executor.run(&items, |item, out| sync.prune(&item.target, per_branch, out));
            self.workspace.print_summary("Prune", &report);
            BatchRun::Completed(report)
        })
    }

    /// Latest CI result for each listed repository.
    pub fn build_status(&self) -> Vec<(RemoteRepo, Option<BuildStatus>)> {
        log_duration("build-status", || {
            let inventory = self.inventory(&self.filter());
            let mut results = Vec::new();
            for repo in inventory.repos {
                let mut report = Report::new();
                let status = match self.host.recent_build_status(&repo.full_name) {
                    Ok(Some(status)) => {
                        let tone = match status.conclusion {
                            Conclusion::Success => Tone::Success,
                            Conclusion::Failure => Tone::Danger,
                            Conclusion::Cancelled => Tone::Warning,
                            Conclusion::Other => Tone::Plain,
                        };
                        report.push(tone, format!("{}: {}", repo.name, status.message));
                        Some(status)
                    }
                    Ok(None) => {
                        report.plain(format!("{}: no builds found.", repo.name));
                        None
                    }
                    Err(e) => {
                        report.danger(format!(
                            "Failed to retrieve info on repository {}: {}",
                            repo.full_name, e
                        ));
                        None
                    }
                };
                self.console().emit(&report);
                results.push((repo, status));
            }
            results
        })
    }

    /// Record the user's repositories in the config file.
    pub fn sync_config(&self, store: &dyn ConfigStore, host_name: &str) -> Result<RepoSync> {
        log_duration("sync-config", || self.sync_config_inner(store, host_name))
    }

    fn sync_config_inner(&self, store: &dyn ConfigStore, host_name: &str) -> Result<RepoSync> {
        let inventory = list_user_repos(self.host.as_ref(), &self.filter());
        if let Some(warning) = inventory.warning {
            // Never sync against a failed listing.
            self.console().warn(warning);
            self.console()
                .plain("Configuration left unchanged because the repository listing failed.");
            return Ok(RepoSync::default());
        }
        let names: Vec<String> = inventory.repos.into_iter().map(|r| r.full_name).collect();
        let result = store.sync_repos(host_name, &names)?;
        self.console().success(format!(
            "Synced {} repositories ({} added, {} removed).",
            result.total, result.added, result.removed
        ));
        Ok(result)
    }

    pub fn show_account(&self) -> Result<AccountSummary> {
        log_duration("show-account", || self.show_account_inner())
    }

    fn show_account_inner(&self) -> Result<AccountSummary> {
        let account = self.host.account_summary(&self.settings().user_login)?;
        let mut report = Report::new();
        report.push(Tone::Info, format!("Login: {}", account.login));
        let optional = [
            ("Name", account.name.clone()),
            ("Bio", account.bio.clone()),
            ("Public repos", account.public_repos.map(|n| n.to_string())),
            ("Followers", account.followers.map(|n| n.to_string())),
            ("Following", account.following.map(|n| n.to_string())),
            ("Location", account.location.clone()),
            ("Company", account.company.clone()),
        ];
        for (label, value) in optional {
            if let Some(value) = value {
                report.plain(format!("{label}: {value}"));
            }
        }
        self.console().emit(&report);
        Ok(account)
    }

    /// Refresh lock files and open review requests where they changed.
    pub fn relock(
        &self,
        plan: &RelockPlan,
        runner: &dyn CommandRunner,
        reviewer: Option<&str>,
    ) -> BatchReport {
        log_duration("poetry-relock", || {
            let repos = self.workspace.scanner().repos_with_root_file(&plan.manifest);
            let items = WorkItem::batch(repos, Operation::Relock);
            let relocker = DependencyRelocker::new(
                self.git(),
                self.host.as_ref(),
                runner,
                plan,
                &self.settings().user_login,
            )
            .reviewer(reviewer)
            .dry_run(self.settings().dry_run);
            let report = self
                .workspace
                .executor()
                .run(&items, |item, out| relocker.relock(&item.target, out));
            self.workspace.print_summary("Relock", &report);
            report
        })
    }
}
