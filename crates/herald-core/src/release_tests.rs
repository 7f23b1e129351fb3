#[cfg(test)]
mod tests {
    use crate::testing::FakeHost;
    use crate::*;

    fn labels() -> ReleaseLabels {
        ReleaseLabels {
            pending: "autorelease: pending".into(),
            released: "autorelease: tagged".into(),
        }
    }

    fn pull_request() -> PullRequest {
        PullRequest {
            number: 7,
            title: "chore(main): release".into(),
            labels: vec!["autorelease: pending".into()],
            merge_commit_sha: Some("merge-sha".into()),
            ..PullRequest::default()
        }
    }

    fn candidate(path: &str, tag: &str) -> ReleaseCandidate {
        ReleaseCandidate {
            path: path.to_string(),
            tag_name: tag.to_string(),
            name: tag.to_string(),
            body: format!("notes for {tag}"),
            draft: false,
            sha: "merge-sha".into(),
        }
    }

    #[tokio::test]
    async fn all_successes_swap_labels_and_comment() {
        let host = FakeHost::new("main");
        let candidates = vec![candidate("a", "a-v1.0.0"), candidate("b", "b-v2.0.0")];

        let summary = create_releases(&host, &pull_request(), &candidates, &labels()).await;

        assert!(summary.is_complete());
        assert!(summary.labels_updated);
        assert_eq!(summary.pull_request, 7);
        assert_eq!(summary.released_tags(), vec!["a-v1.0.0", "b-v2.0.0"]);

        let comments = host.comments();
        assert_eq!(comments.len(), 2);
        assert!(comments[0].1.contains("https://example.test/releases/tag/a-v1.0.0"));
        assert_eq!(
            host.labels_removed(),
            vec![(7, vec!["autorelease: pending".to_string()])]
        );
        assert_eq!(
            host.labels_added(),
            vec![(7, vec!["autorelease: tagged".to_string()])]
        );
    }

    #[tokio::test]
    async fn existing_tags_count_as_released_without_comment() {
        let host = FakeHost::new("main").with_existing_tag("a-v1.0.0");
        let candidates = vec![candidate("a", "a-v1.0.0"), candidate("b", "b-v2.0.0")];

        let summary = create_releases(&host, &pull_request(), &candidates, &labels()).await;

        assert_eq!(summary.already_released, vec!["a-v1.0.0".to_string()]);
        assert_eq!(summary.created.len(), 1);
        assert!(summary.labels_updated);
        assert_eq!(host.comments().len(), 1);
        assert_eq!(host.created_releases().len(), 1);
    }

    #[tokio::test]
    async fn failures_are_isolated_and_withhold_labels() {
        let host = FakeHost::new("main")
            .with_release_failure("a-v1.0.0", HostError::Api("502 Bad Gateway".into()));
        let candidates = vec![candidate("a", "a-v1.0.0"), candidate("b", "b-v2.0.0")];

        let summary = create_releases(&host, &pull_request(), &candidates, &labels()).await;

        assert!(!summary.is_complete());
        assert!(!summary.labels_updated);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].path, "a");
        assert!(summary.failed[0].error.contains("502 Bad Gateway"));
        assert_eq!(summary.created.len(), 1);
        assert_eq!(summary.created[0].tag_name, "b-v2.0.0");

        let comments = host.comments();
        assert!(comments.iter().any(|(_, body)| body.contains("Failed to create release `a-v1.0.0`")));
        assert!(host.labels_added().is_empty());
        assert!(host.labels_removed().is_empty());
    }

    #[tokio::test]
    async fn retry_after_partial_failure_completes_the_batch() {
        let host = FakeHost::new("main")
            .with_release_failure("a-v1.0.0", HostError::Api("timeout".into()));
        let candidates = vec![candidate("a", "a-v1.0.0"), candidate("b", "b-v2.0.0")];

        let first = create_releases(&host, &pull_request(), &candidates, &labels()).await;
        assert!(!first.is_complete());

        host.clear_release_failures();
        let second = create_releases(&host, &pull_request(), &candidates, &labels()).await;

        assert!(second.is_complete());
        assert!(second.labels_updated);
        assert_eq!(second.already_released, vec!["b-v2.0.0".to_string()]);
        assert_eq!(second.created.len(), 1);
        assert_eq!(second.created[0].tag_name, "a-v1.0.0");
        // each release was created exactly once
        let tags: Vec<_> = host
            .created_releases()
            .into_iter()
            .map(|candidate| candidate.tag_name)
            .collect();
        assert_eq!(tags, vec!["b-v2.0.0".to_string(), "a-v1.0.0".to_string()]);
    }
}
