//! Conventional commit parsing and version bump rules.

use crate::types::{Bump, Commit};
use semver::Version;
use tracing::debug;

/// A commit message parsed according to the Conventional Commits format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConventionalCommit {
    pub sha: String,
    pub commit_type: String,
    pub scope: Option<String>,
    pub description: String,
    pub breaking: bool,
    /// Text of a `BREAKING CHANGE:` footer, when present
    pub breaking_description: Option<String>,
}

impl ConventionalCommit {
    pub fn short_sha(&self) -> &str {
        self.sha.get(..7).unwrap_or(&self.sha)
    }

    /// Bump this commit asks for, if any.
    pub fn bump(&self) -> Option<Bump> {
        if self.breaking {
            return Some(Bump::Major);
        }
        match self.commit_type.as_str() {
            "feat" => Some(Bump::Minor),
            "fix" | "perf" | "revert" | "deps" => Some(Bump::Patch),
            _ => None,
        }
    }
}

/// Parse a single commit; messages that are not conventional yield `None`.
pub fn parse_commit(commit: &Commit) -> Option<ConventionalCommit> {
    let message = commit.message.trim();
    let parsed = match git_conventional::Commit::parse(message) {
        Ok(parsed) => parsed,
        Err(err) => {
            debug!("skipping non-conventional commit {}: {}", commit.short_sha(), err);
            return None;
        }
    };

    Some(ConventionalCommit {
        sha: commit.sha.clone(),
        commit_type: parsed.type_().to_string().to_lowercase(),
        scope: parsed.scope().map(|scope| scope.to_string()),
        description: parsed.description().to_string(),
        breaking: parsed.breaking(),
        breaking_description: parsed
            .breaking_description()
            .filter(|text| *text != parsed.description())
            .map(str::to_string),
    })
}

pub fn parse_commits(commits: &[Commit]) -> Vec<ConventionalCommit> {
    commits.iter().filter_map(parse_commit).collect()
}

/// Highest bump requested by `commits`.
pub fn aggregate_bump(commits: &[ConventionalCommit]) -> Option<Bump> {
    commits.iter().filter_map(ConventionalCommit::bump).max()
}

/// Apply `bump` to `current`, honoring the pre-1.0 policies.
///
/// Below 1.0.0, `bump_minor_pre_major` turns a breaking change into a minor
/// bump and `bump_patch_for_minor_pre_major` turns a feature into a patch bump.
pub fn next_version(
    current: &Version,
    bump: Bump,
    bump_minor_pre_major: bool,
    bump_patch_for_minor_pre_major: bool,
) -> Version {
    let effective = if current.major == 0 {
        match bump {
            Bump::Major if bump_minor_pre_major => Bump::Minor,
            Bump::Minor if bump_patch_for_minor_pre_major => Bump::Patch,
            other => other,
        }
    } else {
        bump
    };
    effective.apply(current)
}
