//! Release candidate resolution: which configured packages have commits since
//! their last release, and what version each of them was last released at.

use crate::config::PackageConfig;
use crate::host::CodeHost;
use crate::manifest::load_versions;
use crate::types::{Commit, VersionsMap};
use semver::Version;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// A configured package with the commits attributed to it and its last released version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageReleaseData {
    pub config: PackageConfig,
    pub commits: Vec<Commit>,
    /// `None` when the package has never been released.
    pub last_version: Option<Version>,
}

/// Output of [`resolve_candidates`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateResolution {
    pub packages: Vec<PackageReleaseData>,
    /// Shas of commits that touched no configured package.
    pub unmatched: Vec<String>,
    /// Candidate paths with no version in either manifest snapshot.
    pub never_released: Vec<String>,
}

/// Packages owning `file`: every configured path enclosing it on a segment
/// boundary, or the root package when nothing else matches.
pub fn owning_packages<'a>(packages: &'a [PackageConfig], file: &str) -> Vec<&'a PackageConfig> {
    let file = file.trim_start_matches("./");
    let owners: Vec<&PackageConfig> = packages
        .iter()
        .filter(|package| !package.is_root())
        .filter(|package| {
            file == package.path
                || file
                    .strip_prefix(package.path.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })
        .collect();

    if owners.is_empty() {
        packages.iter().filter(|package| package.is_root()).take(1).collect()
    } else {
        owners
    }
}

/// Attribute commits to packages by the files they touch.
///
/// A commit touching several packages is attributed to each of them, keeping
/// the original commit order. Returns the per-path commits and the shas of
/// commits that matched nothing.
pub fn split_commits(
    packages: &[PackageConfig],
    commits: &[Commit],
) -> (BTreeMap<String, Vec<Commit>>, Vec<String>) {
    let mut by_path: BTreeMap<String, Vec<Commit>> = BTreeMap::new();
    let mut unmatched = Vec::new();

    for commit in commits {
        let mut owners: Vec<&str> = commit
            .files
            .iter()
            .flat_map(|file| owning_packages(packages, file))
            .map(|package| package.path.as_str())
            .collect();
        owners.sort_unstable();
        owners.dedup();

        if owners.is_empty() {
            unmatched.push(commit.sha.clone());
            continue;
        }
        for owner in owners {
            by_path
                .entry(owner.to_string())
                .or_default()
                .push(commit.clone());
        }
    }

    (by_path, unmatched)
}

fn parse_manifest_version(path: &str, raw: &str) -> Option<Version> {
    match Version::parse(raw.trim()) {
        Ok(version) => Some(version),
        Err(err) => {
            warn!("ignoring unparsable version '{}' for {}: {}", raw, path, err);
            None
        }
    }
}

/// Build one [`PackageReleaseData`] per configured package with at least one
/// attributable commit.
///
/// Last versions are read from the manifest at `as_of`. Paths missing there are
/// looked up again in the manifest at `tip`, which covers entries added to the
/// manifest by hand after the last release. Nothing here is fatal: an
/// unreadable manifest leaves versions unresolved.
pub async fn resolve_candidates(
    host: &dyn CodeHost,
    packages: &[PackageConfig],
    commits: &[Commit],
    manifest_file: &str,
    as_of: &str,
    tip: &str,
) -> CandidateResolution {
    let (mut by_path, unmatched) = split_commits(packages, commits);
    if !unmatched.is_empty() {
        debug!("{} commit(s) touched no configured package", unmatched.len());
    }

    let released: VersionsMap = load_versions(host, manifest_file, as_of)
        .await
        .unwrap_or_default();

    let mut candidates = Vec::new();
    let mut missing = Vec::new();
    for config in packages {
        let Some(commits) = by_path.remove(&config.path) else {
            continue;
        };
        let last_version = match released.get(&config.path) {
            Some(raw) => parse_manifest_version(&config.path, raw),
            None => {
                missing.push(candidates.len());
                None
            }
        };
        candidates.push(PackageReleaseData {
            config: config.clone(),
            commits,
            last_version,
        });
    }

    let mut never_released = Vec::new();
    if !missing.is_empty() {
        let live = if tip == as_of {
            released
        } else {
            load_versions(host, manifest_file, tip).await.unwrap_or_default()
        };
        for index in missing {
            let candidate = &mut candidates[index];
            match live.get(&candidate.config.path) {
                Some(raw) => {
                    info!(
                        "using version from {} at {} for {}",
                        manifest_file, tip, candidate.config.path
                    );
                    candidate.last_version = parse_manifest_version(&candidate.config.path, raw);
                }
                None => {
                    warn!(
                        "no released version found for {}, treating it as a first release",
                        candidate.config.path
                    );
                    never_released.push(candidate.config.path.clone());
                }
            }
        }
    }

    CandidateResolution {
        packages: candidates,
        unmatched,
        never_released,
    }
}
