//! # Reconciliation
//!
//! Cross-references local working copies against the host inventory and
//! gives every local directory exactly one [`Verdict`]:
//!
//! 1. the directory cannot be opened as a repository: `InvalidRepository`
//! 2. no remotes configured: `NoRemoteDefined`
//! 3. the first remote's repository name is not on the host: `NotFoundOnHost`
//! 4. the matched host repository is a fork: `IsFork`
//! 5. otherwise `Clean`
//!
//! The other direction, host repositories with no local clone, is
//! [`missing_locally`].

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::git::extract_repo_name;
use crate::host::RemoteRepo;
use crate::repository::{dir_name, GitOperations, Remote};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Verdict {
    Clean,
    NoRemoteDefined,
    NotFoundOnHost,
    IsFork,
    InvalidRepository,
}

impl Verdict {
    pub const ALL: [Verdict; 5] = [
        Verdict::Clean,
        Verdict::NoRemoteDefined,
        Verdict::NotFoundOnHost,
        Verdict::IsFork,
        Verdict::InvalidRepository,
    ];

    /// The line printed for an offending directory, `None` for `Clean`.
    pub fn describe(self, dir: &Path, host: &str) -> Option<String> {
        let dir = dir.display();
        match self {
            Verdict::Clean => None,
            Verdict::NoRemoteDefined => Some(format!("{dir} has no remote repositories defined.")),
            Verdict::NotFoundOnHost => Some(format!("{dir} is not found in your {host} account.")),
            Verdict::IsFork => Some(format!(
                "{dir} is in your account, but is a fork of another user's repository."
            )),
            Verdict::InvalidRepository => Some(format!("{dir} is not a valid Git repository.")),
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Verdict::Clean => "clean",
            Verdict::NoRemoteDefined => "no remote",
            Verdict::NotFoundOnHost => "not on host",
            Verdict::IsFork => "fork",
            Verdict::InvalidRepository => "invalid repository",
        };
        f.write_str(label)
    }
}

/// Classify one directory from its remotes (`None` when it could not be
/// opened) and the host index keyed by repository name.
pub fn verdict_for(remotes: Option<&[Remote]>, index: &HashMap<String, RemoteRepo>) -> Verdict {
    let Some(remotes) = remotes else {
        return Verdict::InvalidRepository;
    };
    let Some(first) = remotes.first() else {
        return Verdict::NoRemoteDefined;
    };
    match index.get(extract_repo_name(&first.url)) {
        None => Verdict::NotFoundOnHost,
        Some(remote) if remote.is_fork => Verdict::IsFork,
        Some(_) => Verdict::Clean,
    }
}

/// Verdicts for a set of local directories.
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    /// One entry per input directory, in input order.
    pub verdicts: Vec<(PathBuf, Verdict)>,
}

impl Reconciliation {
    pub fn counts(&self) -> BTreeMap<Verdict, usize> {
        let mut counts: BTreeMap<Verdict, usize> = Verdict::ALL.iter().map(|v| (*v, 0)).collect();
        for (_, verdict) in &self.verdicts {
            *counts.entry(*verdict).or_default() += 1;
        }
        counts
    }

    pub fn count(&self, verdict: Verdict) -> usize {
        self.verdicts.iter().filter(|(_, v)| *v == verdict).count()
    }

    pub fn with_verdict(&self, verdict: Verdict) -> impl Iterator<Item = &Path> {
        self.verdicts
            .iter()
            .filter(move |(_, v)| *v == verdict)
            .map(|(p, _)| p.as_path())
    }

    pub fn len(&self) -> usize {
        self.verdicts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verdicts.is_empty()
    }
}

/// Classify every directory in `local_repos`.
///
/// Opening the repository is the first step; a directory whose remotes
/// cannot be read is treated the same as one that failed to open.
pub fn classify_local_repos(
    git: &dyn GitOperations,
    local_repos: &[PathBuf],
    index: &HashMap<String, RemoteRepo>,
) -> Reconciliation {
    let verdicts = local_repos
        .iter()
        .map(|path| {
            let remotes = git.open(path).and_then(|_| git.remotes(path)).ok();
            (path.clone(), verdict_for(remotes.as_deref(), index))
        })
        .collect();
    Reconciliation { verdicts }
}

/// Host repositories that have no directory of the same name under `base_dir`.
pub fn missing_locally<'a>(remote: &'a [RemoteRepo], local_repos: &[PathBuf]) -> Vec<&'a RemoteRepo> {
    let local: std::collections::HashSet<String> =
        local_repos.iter().map(|p| dir_name(p)).collect();
    remote.iter().filter(|r| !local.contains(&r.name)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{remote_repo, MockGit, MockRepo};

    fn origin(url: &str) -> Vec<Remote> {
        vec![Remote {
            name: "origin".to_string(),
            url: url.to_string(),
        }]
    }

    fn index(repos: &[RemoteRepo]) -> HashMap<String, RemoteRepo> {
        repos.iter().map(|r| (r.name.clone(), r.clone())).collect()
    }

    #[test]
    fn test_verdict_priority() {
        let idx = index(&[remote_repo("alpha", false), remote_repo("forked", true)]);
        assert_eq!(verdict_for(None, &idx), Verdict::InvalidRepository);
        assert_eq!(verdict_for(Some(&[]), &idx), Verdict::NoRemoteDefined);
        assert_eq!(
            verdict_for(Some(&origin("https://github.com/me/beta.git")), &idx),
            Verdict::NotFoundOnHost
        );
        assert_eq!(
            verdict_for(Some(&origin("git@github.com:me/forked.git")), &idx),
            Verdict::IsFork
        );
        assert_eq!(
            verdict_for(Some(&origin("https://github.com/me/alpha")), &idx),
            Verdict::Clean
        );
    }

    #[test]
    fn test_only_first_remote_is_consulted() {
        let idx = index(&[remote_repo("alpha", false)]);
        let remotes = vec![
            Remote {
                name: "upstream".to_string(),
                url: "https://github.com/other/unknown.git".to_string(),
            },
            Remote {
                name: "origin".to_string(),
                url: "https://github.com/me/alpha.git".to_string(),
            },
        ];
        assert_eq!(verdict_for(Some(&remotes), &idx), Verdict::NotFoundOnHost);
    }

    #[test]
    fn test_describe_messages() {
        let dir = Path::new("/src/beta");
        assert_eq!(
            Verdict::NotFoundOnHost.describe(dir, "GitHub").unwrap(),
            "/src/beta is not found in your GitHub account."
        );
        assert!(Verdict::Clean.describe(dir, "GitHub").is_none());
        assert!(Verdict::IsFork
            .describe(dir, "GitLab")
            .unwrap()
            .contains("fork of another user's repository"));
    }

    #[test]
    fn test_classify_alpha_clean_beta_not_on_host() {
        let alpha = PathBuf::from("/src/alpha");
        let beta = PathBuf::from("/src/beta");
        let git = MockGit::new()
            .with_repo(&alpha, MockRepo::with_origin("alpha"))
            .with_repo(&beta, MockRepo::with_origin("beta"));
        let idx = index(&[remote_repo("alpha", false)]);

        let result = classify_local_repos(&git, &[alpha.clone(), beta.clone()], &idx);
        assert_eq!(result.count(Verdict::Clean), 1);
        assert_eq!(result.count(Verdict::NotFoundOnHost), 1);
        assert_eq!(result.with_verdict(Verdict::Clean).collect::<Vec<_>>(), vec![alpha.as_path()]);
        assert_eq!(
            result.with_verdict(Verdict::NotFoundOnHost).collect::<Vec<_>>(),
            vec![beta.as_path()]
        );
    }

    #[test]
    fn test_classify_invalid_and_remoteless() {
        let stray = PathBuf::from("/src/stray");
        let git = MockGit::new();
        let bare = PathBuf::from("/src/bare");
        let git = git.with_repo(
            &bare,
            MockRepo {
                remotes: vec![],
                ..MockRepo::default()
            },
        );
        let result = classify_local_repos(&git, &[stray, bare], &HashMap::new());
        assert_eq!(result.count(Verdict::NoRemoteDefined), 1);
        assert_eq!(result.count(Verdict::InvalidRepository), 1);
        assert_eq!(result.counts().values().sum::<usize>(), 2);
    }

    #[test]
    fn test_missing_locally() {
        let remote = vec![remote_repo("alpha", false), remote_repo("gamma", false)];
        let local = vec![PathBuf::from("/src/alpha")];
        let missing = missing_locally(&remote, &local);
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].name, "gamma");
    }
}
