//! In-memory [`CodeHost`] for exercising release flows without a network.

use crate::host::{CodeHost, HostError, HostResult};
use crate::types::{Commit, PullRequest, PullRequestDraft, Release, ReleaseCandidate};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct FakeState {
    default_branch: String,
    files: BTreeMap<(String, String), String>,
    commits: Vec<Commit>,
    pull_requests: Vec<PullRequest>,
    tags: BTreeSet<String>,
    release_failures: BTreeMap<String, HostError>,
    opened: Vec<PullRequestDraft>,
    releases: Vec<ReleaseCandidate>,
    comments: Vec<(u64, String)>,
    labels_added: Vec<(u64, Vec<String>)>,
    labels_removed: Vec<(u64, Vec<String>)>,
    open_numbers: BTreeMap<String, u64>,
    next_number: u64,
}

/// A code host backed by maps, recording every write it receives.
#[derive(Debug, Default)]
pub struct FakeHost {
    state: Mutex<FakeState>,
}

impl FakeHost {
    pub fn new(default_branch: &str) -> Self {
        Self {
            state: Mutex::new(FakeState {
                default_branch: default_branch.to_string(),
                next_number: 100,
                ..FakeState::default()
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Serve `content` for `path` at `reference`.
    pub fn with_file(self, reference: &str, path: &str, content: &str) -> Self {
        self.set_file(reference, path, content);
        self
    }

    /// Append a commit; commits are listed newest first, in insertion order.
    pub fn with_commit(self, sha: &str, message: &str, files: &[&str]) -> Self {
        self.state().commits.push(Commit {
            sha: sha.to_string(),
            message: message.to_string(),
            files: files.iter().map(|file| file.to_string()).collect(),
        });
        self
    }

    /// Register a merged pull request; later registrations are more recent.
    pub fn with_merged_pull_request(self, pull_request: PullRequest) -> Self {
        self.state().pull_requests.push(pull_request);
        self
    }

    pub fn with_existing_tag(self, tag: &str) -> Self {
        self.state().tags.insert(tag.to_string());
        self
    }

    /// Make creating the release tagged `tag` fail with `error`.
    pub fn with_release_failure(self, tag: &str, error: HostError) -> Self {
        self.state().release_failures.insert(tag.to_string(), error);
        self
    }

    pub fn set_file(&self, reference: &str, path: &str, content: &str) {
        self.state()
            .files
            .insert((reference.to_string(), path.to_string()), content.to_string());
    }

    pub fn clear_release_failures(&self) {
        self.state().release_failures.clear();
    }

    pub fn opened_pull_requests(&self) -> Vec<PullRequestDraft> {
        self.state().opened.clone()
    }

    pub fn created_releases(&self) -> Vec<ReleaseCandidate> {
        self.state().releases.clone()
    }

    pub fn comments(&self) -> Vec<(u64, String)> {
        self.state().comments.clone()
    }

    pub fn labels_added(&self) -> Vec<(u64, Vec<String>)> {
        self.state().labels_added.clone()
    }

    pub fn labels_removed(&self) -> Vec<(u64, Vec<String>)> {
        self.state().labels_removed.clone()
    }

    /// Number of mutating calls received so far.
    pub fn write_count(&self) -> usize {
        let state = self.state();
        state.opened.len()
            + state.releases.len()
            + state.comments.len()
            + state.labels_added.len()
            + state.labels_removed.len()
    }
}

#[async_trait]
impl CodeHost for FakeHost {
    async fn default_branch(&self) -> HostResult<String> {
        Ok(self.state().default_branch.clone())
    }

    async fn file_contents(&self, path: &str, reference: &str) -> HostResult<String> {
        self.state()
            .files
            .get(&(reference.to_string(), path.to_string()))
            .cloned()
            .ok_or_else(|| HostError::NotFound(format!("{path} at {reference}")))
    }

    async fn commits_since(&self, _branch: &str, since: Option<&str>) -> HostResult<Vec<Commit>> {
        Ok(self
            .state()
            .commits
            .iter()
            .take_while(|commit| Some(commit.sha.as_str()) != since)
            .cloned()
            .collect())
    }

    async fn last_merged_pull_request(
        &self,
        base_branch: &str,
        head_branch: &str,
    ) -> HostResult<Option<PullRequest>> {
        Ok(self
            .state()
            .pull_requests
            .iter()
            .rev()
            .find(|pr| {
                pr.base_branch == base_branch
                    && pr.head_branch == head_branch
                    && pr.merge_commit_sha.is_some()
            })
            .cloned())
    }

    async fn open_pull_request(&self, draft: &PullRequestDraft) -> HostResult<PullRequest> {
        let mut state = self.state();
        for update in &draft.updates {
            state.files.insert(
                (draft.head_branch.clone(), update.path.clone()),
                update.content.clone(),
            );
        }
        let number = match state.open_numbers.get(&draft.head_branch) {
            Some(number) => *number,
            None => {
                let number = state.next_number;
                state.next_number += 1;
                state.open_numbers.insert(draft.head_branch.clone(), number);
                number
            }
        };
        state.opened.push(draft.clone());

        Ok(PullRequest {
            number,
            title: draft.title.clone(),
            body: draft.body.clone(),
            head_branch: draft.head_branch.clone(),
            base_branch: draft.base_branch.clone(),
            labels: draft.labels.clone(),
            files: draft.updates.iter().map(|update| update.path.clone()).collect(),
            merge_commit_sha: None,
        })
    }

    async fn add_labels(&self, number: u64, labels: &[String]) -> HostResult<()> {
        let mut state = self.state();
        state.labels_added.push((number, labels.to_vec()));
        for pr in state.pull_requests.iter_mut().filter(|pr| pr.number == number) {
            for label in labels {
                if !pr.has_label(label) {
                    pr.labels.push(label.clone());
                }
            }
        }
        Ok(())
    }

    async fn remove_labels(&self, number: u64, labels: &[String]) -> HostResult<()> {
        let mut state = self.state();
        state.labels_removed.push((number, labels.to_vec()));
        for pr in state.pull_requests.iter_mut().filter(|pr| pr.number == number) {
            pr.labels.retain(|label| !labels.contains(label));
        }
        Ok(())
    }

    async fn comment(&self, number: u64, body: &str) -> HostResult<()> {
        self.state().comments.push((number, body.to_string()));
        Ok(())
    }

    async fn create_release(&self, candidate: &ReleaseCandidate) -> HostResult<Release> {
        let mut state = self.state();
        if let Some(error) = state.release_failures.get(&candidate.tag_name) {
            return Err(error.clone());
        }
        if !state.tags.insert(candidate.tag_name.clone()) {
            return Err(HostError::TagAlreadyExists(candidate.tag_name.clone()));
        }
        state.releases.push(candidate.clone());
        Ok(Release {
            tag_name: candidate.tag_name.clone(),
            html_url: format!("https://example.test/releases/tag/{}", candidate.tag_name),
        })
    }
}
