use crate::config::PackageConfig;
use semver::Version;
use std::collections::BTreeMap;
use std::str::FromStr;

/// Package path to version string. This is the persisted manifest state.
pub type VersionsMap = BTreeMap<String, String>;

/// A commit as reported by the code host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub sha: String,
    pub message: String,
    /// Repository-relative paths touched by the commit.
    pub files: Vec<String>,
}

impl Commit {
    pub fn short_sha(&self) -> &str {
        self.sha.get(..7).unwrap_or(&self.sha)
    }
}

/// A pull request as seen from the code host.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub body: String,
    pub head_branch: String,
    pub base_branch: String,
    pub labels: Vec<String>,
    pub files: Vec<String>,
    pub merge_commit_sha: Option<String>,
}

impl PullRequest {
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|existing| existing == label)
    }
}

/// New content for a single repository file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpdate {
    pub path: String,
    pub content: String,
}

impl FileUpdate {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// Everything needed to open (or refresh) the aggregated release pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestDraft {
    pub head_branch: String,
    pub base_branch: String,
    pub title: String,
    pub body: String,
    pub labels: Vec<String>,
    pub updates: Vec<FileUpdate>,
}

/// Payload handed to the code host to create a tagged release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseCandidate {
    /// Package path the release belongs to
    pub path: String,
    pub tag_name: String,
    pub name: String,
    pub body: String,
    pub draft: bool,
    /// Commit the tag points at
    pub sha: String,
}

/// A release that exists on the code host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    pub tag_name: String,
    pub html_url: String,
}

/// Pending pull-request data for one package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrData {
    pub version: Version,
    /// Release notes for this version, without the changelog heading
    pub notes: String,
    pub updates: Vec<FileUpdate>,
}

impl PrData {
    /// Current pending content of `path`, if this package already updates it.
    pub fn update_content(&self, path: &str) -> Option<&str> {
        self.updates
            .iter()
            .find(|update| update.path == path)
            .map(|update| update.content.as_str())
    }

    /// Replace the pending content for `path`, appending a new update when absent.
    pub fn upsert_update(&mut self, path: &str, content: String) {
        match self.updates.iter_mut().find(|update| update.path == path) {
            Some(existing) => existing.content = content,
            None => self.updates.push(FileUpdate::new(path, content)),
        }
    }
}

/// A configured package paired with the changes it contributes to the release PR.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageWithPrData {
    pub config: PackageConfig,
    /// Name used in tags and in the pull-request body
    pub component: String,
    pub pr: PrData,
}

/// Semantic version bump types, ordered by impact
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Bump {
    Patch,
    Minor,
    Major,
}

impl FromStr for Bump {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "patch" => Ok(Self::Patch),
            "minor" => Ok(Self::Minor),
            "major" => Ok(Self::Major),
            _ => Err(()),
        }
    }
}

impl Bump {
    /// Convert bump to string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Patch => "patch",
            Self::Minor => "minor",
            Self::Major => "major",
        }
    }

    /// Apply this bump to `version`, dropping any pre-release or build metadata.
    ///
    /// A pre-release patch bump lands on its own stable version
    /// (`1.0.0-beta.1` becomes `1.0.0`).
    pub fn apply(&self, version: &Version) -> Version {
        match self {
            Self::Major => Version::new(version.major + 1, 0, 0),
            Self::Minor => Version::new(version.major, version.minor + 1, 0),
            Self::Patch if !version.pre.is_empty() => {
                Version::new(version.major, version.minor, version.patch)
            }
            Self::Patch => Version::new(version.major, version.minor, version.patch + 1),
        }
    }
}

impl std::fmt::Display for Bump {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
