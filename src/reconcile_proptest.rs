//! Property-based tests for reconciliation and URL name extraction.
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold for all possible inputs.

#[cfg(test)]
mod proptest_tests {
    use std::collections::HashMap;
    use std::path::PathBuf;

    use crate::git::extract_repo_name;
    use crate::reconcile::{classify_local_repos, verdict_for, Verdict};
    use crate::repository::Remote;
    use crate::testing::{remote_repo, MockGit, MockRepo};
    use proptest::prelude::*;

    // ============================================================================
    // extract_repo_name property tests
    // ============================================================================

    proptest! {
        /// Property: a bare name is returned unchanged
        #[test]
        fn extract_repo_name_idempotent_on_bare_names(name in "[a-zA-Z0-9_-][a-zA-Z0-9_.-]{0,30}") {
            prop_assume!(!name.ends_with(".git"));
            prop_assert_eq!(extract_repo_name(&name), name.as_str());
            let once = extract_repo_name(&name);
            prop_assert_eq!(extract_repo_name(once), once);
        }

        /// Property: every URL flavour of the same repository yields its name
        #[test]
        fn extract_repo_name_ignores_url_flavour(
            owner in "[a-z][a-z0-9-]{0,15}",
            name in "[a-z][a-z0-9_-]{0,20}",
        ) {
            let urls = [
                format!("https://host/{owner}/{name}.git"),
                format!("https://host/{owner}/{name}"),
                format!("git@host:{owner}/{name}.git"),
                format!("git@host:{owner}/{name}.git/"),
                format!("ssh://git@host/group/{owner}/{name}.git"),
            ];
            for url in &urls {
                prop_assert_eq!(extract_repo_name(url), name.as_str(), "url: {}", url);
            }
        }

        /// Property: the result never contains a slash
        #[test]
        fn extract_repo_name_has_no_slash(url in ".*") {
            prop_assert!(!extract_repo_name(&url).contains('/'));
        }
    }

    // ============================================================================
    // classification property tests
    // ============================================================================

    #[derive(Debug, Clone)]
    enum LocalShape {
        Invalid,
        NoRemote,
        Origin(String),
    }

    fn local_shape() -> impl Strategy<Value = LocalShape> {
        prop_oneof![
            Just(LocalShape::Invalid),
            Just(LocalShape::NoRemote),
            "[a-e]".prop_map(LocalShape::Origin),
        ]
    }

    proptest! {
        /// Property: every local directory gets exactly one verdict and the
        /// per-verdict counts add up to the number of directories
        #[test]
        fn classification_is_total_and_exclusive(
            locals in prop::collection::vec(local_shape(), 0..20),
            remote in prop::collection::vec(("[a-e]", any::<bool>()), 0..6),
        ) {
            let index: HashMap<_, _> = remote
                .iter()
                .map(|(name, fork)| (name.clone(), remote_repo(name, *fork)))
                .collect();

            let mut git = MockGit::new();
            let mut paths = Vec::new();
            for (i, shape) in locals.iter().enumerate() {
                let path = PathBuf::from(format!("/base/repo{i}"));
                match shape {
                    LocalShape::Invalid => {}
                    LocalShape::NoRemote => {
                        git = git.with_repo(&path, MockRepo::default());
                    }
                    LocalShape::Origin(name) => {
                        git = git.with_repo(&path, MockRepo::with_origin(name));
                    }
                }
                paths.push(path);
            }

            let result = classify_local_repos(&git, &paths, &index);
            prop_assert_eq!(result.len(), paths.len());
            prop_assert_eq!(result.counts().values().sum::<usize>(), paths.len());
            for verdict in Verdict::ALL {
                prop_assert_eq!(result.counts()[&verdict], result.count(verdict));
            }
            for ((path, verdict), shape) in result.verdicts.iter().zip(&locals) {
                prop_assert!(paths.contains(path));
                match shape {
                    LocalShape::Invalid => prop_assert_eq!(*verdict, Verdict::InvalidRepository),
                    LocalShape::NoRemote => prop_assert_eq!(*verdict, Verdict::NoRemoteDefined),
                    LocalShape::Origin(_) => prop_assert!(matches!(
                        verdict,
                        Verdict::Clean | Verdict::NotFoundOnHost | Verdict::IsFork
                    )),
                }
            }
        }

        /// Property: a repository whose name is on the host is never NotFoundOnHost
        #[test]
        fn known_names_are_found(name in "[a-z]{1,8}", fork in any::<bool>()) {
            let index = HashMap::from([(name.clone(), remote_repo(&name, fork))]);
            let remotes = vec![Remote {
                name: "origin".to_string(),
                url: format!("https://host/me/{name}.git"),
            }];
            let expected = if fork { Verdict::IsFork } else { Verdict::Clean };
            prop_assert_eq!(verdict_for(Some(&remotes), &index), expected);
        }
    }
}
