use async_trait::async_trait;
use herald_core::{
    CodeHost, Commit, HostResult, PullRequest, PullRequestDraft, Release, ReleaseCandidate,
};
use tracing::info;

/// Forwards reads to the wrapped host and logs writes instead of sending them.
pub struct DryRunHost<'a> {
    inner: &'a dyn CodeHost,
}

impl<'a> DryRunHost<'a> {
    pub fn new(inner: &'a dyn CodeHost) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl CodeHost for DryRunHost<'_> {
    async fn default_branch(&self) -> HostResult<String> {
        self.inner.default_branch().await
    }

    async fn file_contents(&self, path: &str, reference: &str) -> HostResult<String> {
        self.inner.file_contents(path, reference).await
    }

    async fn commits_since(&self, branch: &str, since: Option<&str>) -> HostResult<Vec<Commit>> {
        self.inner.commits_since(branch, since).await
    }

    async fn last_merged_pull_request(
        &self,
        base_branch: &str,
        head_branch: &str,
    ) -> HostResult<Option<PullRequest>> {
        self.inner
            .last_merged_pull_request(base_branch, head_branch)
            .await
    }

    async fn open_pull_request(&self, draft: &PullRequestDraft) -> HostResult<PullRequest> {
        info!(
            "[dry-run] would open '{}' from {} into {} with labels {:?}",
            draft.title, draft.head_branch, draft.base_branch, draft.labels
        );
        for update in &draft.updates {
            info!("[dry-run]   update {}", update.path);
        }
        Ok(PullRequest {
            number: 0,
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
        info!("[dry-run] would label #{} with {:?}", number, labels);
        Ok(())
    }

    async fn remove_labels(&self, number: u64, labels: &[String]) -> HostResult<()> {
        info!("[dry-run] would remove {:?} from #{}", labels, number);
        Ok(())
    }

    async fn comment(&self, number: u64, body: &str) -> HostResult<()> {
        info!("[dry-run] would comment on #{}: {}", number, body);
        Ok(())
    }

    async fn create_release(&self, candidate: &ReleaseCandidate) -> HostResult<Release> {
        info!(
            "[dry-run] would release {} at {} ({})",
            candidate.tag_name, candidate.sha, candidate.path
        );
        Ok(Release {
            tag_name: candidate.tag_name.clone(),
            html_url: String::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_core::testing::FakeHost;
    use herald_core::{FileUpdate, ManifestOptions, Orchestrator};

    #[tokio::test]
    async fn reads_pass_through() {
        let host = FakeHost::new("trunk").with_file("trunk", "a.txt", "hello");
        let dry = DryRunHost::new(&host);
        assert_eq!(dry.default_branch().await.unwrap(), "trunk");
        assert_eq!(dry.file_contents("a.txt", "trunk").await.unwrap(), "hello");
        assert!(dry.file_contents("b.txt", "trunk").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn writes_never_reach_the_host() {
        let host = FakeHost::new("main");
        let dry = DryRunHost::new(&host);
        let draft = PullRequestDraft {
            head_branch: "herald--branches--main".into(),
            base_branch: "main".into(),
            title: "chore(main): release".into(),
            body: String::new(),
            labels: vec!["autorelease: pending".into()],
            updates: vec![FileUpdate::new("a/version.txt", "1.0.1\n")],
        };

        let pr = dry.open_pull_request(&draft).await.unwrap();
        assert_eq!(pr.files, vec!["a/version.txt".to_string()]);
        dry.comment(1, "hi").await.unwrap();
        dry.add_labels(1, &["x".to_string()]).await.unwrap();
        assert_eq!(host.write_count(), 0);
        assert!(host.file_contents("a/version.txt", "herald--branches--main").await.is_err());
    }

    #[tokio::test]
    async fn release_pr_flow_runs_read_only() {
        let host = FakeHost::new("main")
            .with_file("main", "herald-config.json", r#"{ "packages": { "lib": {} } }"#)
            .with_file("main", ".herald-manifest.json", r#"{ "lib": "1.0.0" }"#)
            .with_commit("1", "feat: new thing", &["lib/src.txt"]);
        let dry = DryRunHost::new(&host);

        let pr = Orchestrator::new(&dry, ManifestOptions::default())
            .create_pull_request()
            .await
            .unwrap()
            .unwrap();
        assert_eq!(pr.title, "chore(main): release lib 1.1.0");
        assert_eq!(host.write_count(), 0);
    }
}
