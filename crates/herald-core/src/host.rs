//! Boundary to the remote code host (GitHub and friends).
//!
//! The engine never talks to git directly. Every read and write goes through
//! [`CodeHost`].

use crate::types::{Commit, PullRequest, PullRequestDraft, Release, ReleaseCandidate};
use async_trait::async_trait;

pub type HostResult<T> = std::result::Result<T, HostError>;

/// Errors reported by a code host client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    #[error("not found: {0}")]
    NotFound(String),
    /// The release tag already exists (HTTP 422 with an `already_exists` error on `tag_name`).
    #[error("tag '{0}' already exists")]
    TagAlreadyExists(String),
    #[error("invalid document {path}: {message}")]
    InvalidDocument { path: String, message: String },
    #[error("remote API error: {0}")]
    Api(String),
}

impl HostError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Operations the release engine needs from the remote code host.
#[async_trait]
pub trait CodeHost: Send + Sync {
    /// Name of the repository's default branch.
    async fn default_branch(&self) -> HostResult<String>;

    /// Raw text of `path` at `reference` (a branch name or commit sha).
    async fn file_contents(&self, path: &str, reference: &str) -> HostResult<String>;

    /// Commits reachable from `branch`, newest first, stopping before `since` when given.
    async fn commits_since(&self, branch: &str, since: Option<&str>) -> HostResult<Vec<Commit>>;

    /// Most recently merged pull request from `head_branch` into `base_branch`.
    async fn last_merged_pull_request(
        &self,
        base_branch: &str,
        head_branch: &str,
    ) -> HostResult<Option<PullRequest>>;

    /// Commit the draft's file updates on its head branch and open or refresh the pull request.
    async fn open_pull_request(&self, draft: &PullRequestDraft) -> HostResult<PullRequest>;

    async fn add_labels(&self, number: u64, labels: &[String]) -> HostResult<()>;

    async fn remove_labels(&self, number: u64, labels: &[String]) -> HostResult<()>;

    async fn comment(&self, number: u64, body: &str) -> HostResult<()>;

    /// Create a tagged release; a duplicate tag surfaces as [`HostError::TagAlreadyExists`].
    async fn create_release(&self, candidate: &ReleaseCandidate) -> HostResult<Release>;

    /// Read and parse a JSON document.
    async fn json_document(&self, path: &str, reference: &str) -> HostResult<serde_json::Value> {
        let text = self.file_contents(path, reference).await?;
        serde_json::from_str(&text).map_err(|err| HostError::InvalidDocument {
            path: path.to_string(),
            message: err.to_string(),
        })
    }
}
