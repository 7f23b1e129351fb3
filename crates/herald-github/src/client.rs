use crate::error::{
    GitHubError, Result, host_error, is_not_found, is_unprocessable, release_error,
};
use crate::payloads::{
    CommitFile, CommitPayload, ContentPayload, CreateCommit, CreatePull, CreateRef, CreateTree,
    GitCommitPayload, GitRefPayload, ListQuery, ObjectPayload, PullRequestPayload, RefQuery,
    RepositoryPayload, TreeEntry, UpdatePull, UpdateRef, decode_content,
};
use async_trait::async_trait;
use herald_core::{
    CodeHost, Commit, HostResult, PullRequest, PullRequestDraft, Release, ReleaseCandidate,
};
use octocrab::Octocrab;
use tracing::{debug, info, warn};

/// Split `owner/name` into its two parts.
pub fn split_repository(repository: &str) -> Result<(String, String)> {
    match repository.trim().split_once('/') {
        Some((owner, name))
            if !owner.is_empty() && !name.is_empty() && !name.contains('/') =>
        {
            Ok((owner.to_string(), name.to_string()))
        }
        _ => Err(GitHubError::InvalidRepository(repository.to_string())),
    }
}

/// A GitHub repository reached through the REST API.
#[derive(Clone)]
pub struct GitHub {
    octo: Octocrab,
    owner: String,
    name: String,
}

impl GitHub {
    /// Authenticate with a personal or installation token. `api_url` points at
    /// a GitHub Enterprise instance when set.
    pub fn new(repository: &str, token: impl Into<String>, api_url: Option<&str>) -> Result<Self> {
        let (owner, name) = split_repository(repository)?;
        let mut builder = Octocrab::builder().personal_token(token.into());
        if let Some(url) = api_url {
            builder = builder.base_uri(url)?;
        }
        Ok(Self {
            octo: builder.build()?,
            owner,
            name,
        })
    }

    pub fn repository(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    fn route(&self, tail: &str) -> String {
        format!("/repos/{}/{}{}", self.owner, self.name, tail)
    }

    async fn commit_files(&self, sha: &str) -> HostResult<Vec<String>> {
        let commit: CommitPayload = self
            .octo
            .get(self.route(&format!("/commits/{sha}")), None::<&()>)
            .await
            .map_err(|err| host_error(err, &format!("commit {sha}")))?;
        Ok(commit.files.into_iter().map(|file| file.filename).collect())
    }

    async fn pull_request_files(&self, number: u64) -> HostResult<Vec<String>> {
        let mut files = Vec::new();
        let mut page = 1;
        loop {
            let batch: Vec<CommitFile> = self
                .octo
                .get(
                    self.route(&format!("/pulls/{number}/files")),
                    Some(&ListQuery::page(page)),
                )
                .await
                .map_err(|err| host_error(err, &format!("files of #{number}")))?;
            let done = batch.len() < 100;
            files.extend(batch.into_iter().map(|file| file.filename));
            if done {
                break;
            }
            page += 1;
        }
        Ok(files)
    }

    async fn find_open_pull_request(
        &self,
        base_branch: &str,
        head_branch: &str,
    ) -> HostResult<Option<PullRequestPayload>> {
        let query = ListQuery {
            state: Some("open"),
            head: Some(format!("{}:{}", self.owner, head_branch)),
            base: Some(base_branch),
            ..ListQuery::page(1)
        };
        let open: Vec<PullRequestPayload> = self
            .octo
            .get(self.route("/pulls"), Some(&query))
            .await
            .map_err(|err| host_error(err, "open pull requests"))?;
        Ok(open.into_iter().find(|pr| pr.head.name == head_branch))
    }

    /// Commit every update on top of `base_branch` and point `head_branch` at it.
    async fn push_updates(&self, draft: &PullRequestDraft) -> HostResult<String> {
        let base: GitRefPayload = self
            .octo
            .get(
                self.route(&format!("/git/ref/heads/{}", draft.base_branch)),
                None::<&()>,
            )
            .await
            .map_err(|err| host_error(err, &format!("branch {}", draft.base_branch)))?;
        let base_sha = base.object.sha;
        let base_commit: GitCommitPayload = self
            .octo
            .get(self.route(&format!("/git/commits/{base_sha}")), None::<&()>)
            .await
            .map_err(|err| host_error(err, &format!("commit {base_sha}")))?;

        let tree: ObjectPayload = self
            .octo
            .post(
                self.route("/git/trees"),
                Some(&CreateTree {
                    base_tree: &base_commit.tree.sha,
                    tree: draft
                        .updates
                        .iter()
                        .map(|update| TreeEntry::file(&update.path, &update.content))
                        .collect(),
                }),
            )
            .await
            .map_err(|err| host_error(err, "tree"))?;
        let commit: ObjectPayload = self
            .octo
            .post(
                self.route("/git/commits"),
                Some(&CreateCommit {
                    message: &draft.title,
                    tree: &tree.sha,
                    parents: vec![base_commit.sha.as_str()],
                }),
            )
            .await
            .map_err(|err| host_error(err, "commit"))?;

        let updated: std::result::Result<serde_json::Value, _> = self
            .octo
            .patch(
                self.route(&format!("/git/refs/heads/{}", draft.head_branch)),
                Some(&UpdateRef {
                    sha: &commit.sha,
                    force: true,
                }),
            )
            .await;
        match updated {
            Ok(_) => debug!("moved {} to {}", draft.head_branch, commit.sha),
            Err(err) if is_not_found(&err) || is_unprocessable(&err) => {
                let _: serde_json::Value = self
                    .octo
                    .post(
                        self.route("/git/refs"),
                        Some(&CreateRef {
                            name: format!("refs/heads/{}", draft.head_branch),
                            sha: &commit.sha,
                        }),
                    )
                    .await
                    .map_err(|err| host_error(err, &format!("branch {}", draft.head_branch)))?;
                debug!("created {} at {}", draft.head_branch, commit.sha);
            }
            Err(err) => return Err(host_error(err, &format!("branch {}", draft.head_branch))),
        }
        Ok(commit.sha)
    }
}

#[async_trait]
impl CodeHost for GitHub {
    async fn default_branch(&self) -> HostResult<String> {
        let repository: RepositoryPayload = self
            .octo
            .get(self.route(""), None::<&()>)
            .await
            .map_err(|err| host_error(err, &self.repository()))?;
        Ok(repository.default_branch)
    }

    async fn file_contents(&self, path: &str, reference: &str) -> HostResult<String> {
        let payload: ContentPayload = self
            .octo
            .get(
                self.route(&format!("/contents/{path}")),
                Some(&RefQuery { reference }),
            )
            .await
            .map_err(|err| host_error(err, &format!("{path} at {reference}")))?;
        Ok(decode_content(path, &payload)?)
    }

    async fn commits_since(&self, branch: &str, since: Option<&str>) -> HostResult<Vec<Commit>> {
        let mut commits = Vec::new();
        let mut page = 1;
        'pages: loop {
            let query = ListQuery {
                sha: Some(branch),
                ..ListQuery::page(page)
            };
            let batch: Vec<CommitPayload> = self
                .octo
                .get(self.route("/commits"), Some(&query))
                .await
                .map_err(|err| host_error(err, &format!("commits of {branch}")))?;
            debug!("commit page {} of {}: {} commit(s)", page, branch, batch.len());
            let done = batch.len() < 100;

            for entry in batch {
                if Some(entry.sha.as_str()) == since {
                    break 'pages;
                }
                let files = self.commit_files(&entry.sha).await?;
                commits.push(Commit {
                    sha: entry.sha,
                    message: entry.commit.message,
                    files,
                });
            }
            if done {
                if let Some(sha) = since {
                    warn!("{} was not found on {}, using the full history", sha, branch);
                }
                break;
            }
            page += 1;
        }
        Ok(commits)
    }

    async fn last_merged_pull_request(
        &self,
        base_branch: &str,
        head_branch: &str,
    ) -> HostResult<Option<PullRequest>> {
        let query = ListQuery {
            state: Some("closed"),
            head: Some(format!("{}:{}", self.owner, head_branch)),
            base: Some(base_branch),
            sort: Some("updated"),
            direction: Some("desc"),
            ..ListQuery::page(1)
        };
        let closed: Vec<PullRequestPayload> = self
            .octo
            .get(self.route("/pulls"), Some(&query))
            .await
            .map_err(|err| host_error(err, "closed pull requests"))?;

        let Some(merged) = closed
            .into_iter()
            .find(|pr| pr.is_merged() && pr.head.name == head_branch)
        else {
            return Ok(None);
        };
        let files = self.pull_request_files(merged.number).await?;
        Ok(Some(merged.into_pull_request(files)))
    }

    async fn open_pull_request(&self, draft: &PullRequestDraft) -> HostResult<PullRequest> {
        let sha = self.push_updates(draft).await?;
        info!(
            "committed {} file(s) to {} ({})",
            draft.updates.len(),
            draft.head_branch,
            sha
        );

        let payload: PullRequestPayload =
            match self.find_open_pull_request(&draft.base_branch, &draft.head_branch).await? {
                Some(existing) => self
                    .octo
                    .patch(
                        self.route(&format!("/pulls/{}", existing.number)),
                        Some(&UpdatePull {
                            title: &draft.title,
                            body: &draft.body,
                        }),
                    )
                    .await
                    .map_err(|err| host_error(err, &format!("#{}", existing.number)))?,
                None => self
                    .octo
                    .post(
                        self.route("/pulls"),
                        Some(&CreatePull {
                            title: &draft.title,
                            head: &draft.head_branch,
                            base: &draft.base_branch,
                            body: &draft.body,
                        }),
                    )
                    .await
                    .map_err(|err| host_error(err, "pull request"))?,
            };

        if !draft.labels.is_empty() {
            self.add_labels(payload.number, &draft.labels).await?;
        }

        let files = draft.updates.iter().map(|update| update.path.clone()).collect();
        let mut pull_request = payload.into_pull_request(files);
        for label in &draft.labels {
            if !pull_request.has_label(label) {
                pull_request.labels.push(label.clone());
            }
        }
        Ok(pull_request)
    }

    async fn add_labels(&self, number: u64, labels: &[String]) -> HostResult<()> {
        self.octo
            .issues(&self.owner, &self.name)
            .add_labels(number, labels)
            .await
            .map_err(|err| host_error(err, &format!("#{number}")))?;
        Ok(())
    }

    async fn remove_labels(&self, number: u64, labels: &[String]) -> HostResult<()> {
        for label in labels {
            match self
                .octo
                .issues(&self.owner, &self.name)
                .remove_label(number, label)
                .await
            {
                Ok(_) => {}
                Err(err) if is_not_found(&err) => {
                    debug!("#{} was not labeled '{}'", number, label);
                }
                Err(err) => return Err(host_error(err, &format!("label {label}"))),
            }
        }
        Ok(())
    }

    async fn comment(&self, number: u64, body: &str) -> HostResult<()> {
        self.octo
            .issues(&self.owner, &self.name)
            .create_comment(number, body)
            .await
            .map_err(|err| host_error(err, &format!("#{number}")))?;
        Ok(())
    }

    async fn create_release(&self, candidate: &ReleaseCandidate) -> HostResult<Release> {
        let release = self
            .octo
            .repos(&self.owner, &self.name)
            .releases()
            .create(&candidate.tag_name)
            .target_commitish(&candidate.sha)
            .name(&candidate.name)
            .body(&candidate.body)
            .draft(candidate.draft)
            .send()
            .await
            .map_err(|err| release_error(err, &candidate.tag_name))?;
        Ok(Release {
            tag_name: release.tag_name,
            html_url: release.html_url.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_owner_and_name() {
        assert_eq!(
            split_repository("octo-org/monorepo").unwrap(),
            ("octo-org".to_string(), "monorepo".to_string())
        );
    }

    #[test]
    fn rejects_malformed_repositories() {
        for bad in ["monorepo", "/monorepo", "octo-org/", "a/b/c", ""] {
            assert!(
                matches!(split_repository(bad), Err(GitHubError::InvalidRepository(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn client_routes_are_scoped_to_the_repository() {
        let host = GitHub::new("octo-org/monorepo", "token", Some("https://ghe.example.test/api/v3"))
            .unwrap();
        assert_eq!(host.repository(), "octo-org/monorepo");
        assert_eq!(host.route("/pulls"), "/repos/octo-org/monorepo/pulls");
    }
}
