#[cfg(test)]
mod tests {
    use crate::testing::FakeHost;
    use crate::*;
    use chrono::NaiveDate;
    use serde_json::{Value, json};

    const CONFIG: &str = "herald-config.json";
    const MANIFEST: &str = ".herald-manifest.json";

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, 4).unwrap()
    }

    fn pretty(value: Value) -> String {
        let mut text = serde_json::to_string_pretty(&value).unwrap();
        text.push('\n');
        text
    }

    fn orchestrator(host: &FakeHost) -> Orchestrator<'_> {
        Orchestrator::new(host, ManifestOptions::default()).with_date(date())
    }

    fn update<'a>(draft: &'a PullRequestDraft, path: &str) -> &'a str {
        draft
            .updates
            .iter()
            .find(|update| update.path == path)
            .map(|update| update.content.as_str())
            .unwrap_or_else(|| panic!("no update for {path}"))
    }

    fn json_update(draft: &PullRequestDraft, path: &str) -> Value {
        serde_json::from_str(update(draft, path)).unwrap()
    }

    /// pkgA <- pkgB <- pkgC, all npm packages with the workspace plugin on.
    fn chain_repository() -> FakeHost {
        FakeHost::new("main")
            .with_file(
                "main",
                CONFIG,
                &pretty(json!({
                    "release-type": "node",
                    "plugins": ["node-workspace"],
                    "packages": { "packages/a": {}, "packages/b": {}, "packages/c": {} }
                })),
            )
            .with_file(
                "main",
                MANIFEST,
                &pretty(json!({
                    "packages/a": "1.1.1",
                    "packages/b": "2.2.2",
                    "packages/c": "3.3.3"
                })),
            )
            .with_file(
                "main",
                "packages/a/package.json",
                &pretty(json!({ "name": "pkgA", "version": "1.1.1" })),
            )
            .with_file(
                "main",
                "packages/b/package.json",
                &pretty(json!({
                    "name": "pkgB",
                    "version": "2.2.2",
                    "dependencies": { "pkgA": "^1.1.1" }
                })),
            )
            .with_file(
                "main",
                "packages/c/package.json",
                &pretty(json!({
                    "name": "pkgC",
                    "version": "3.3.3",
                    "dependencies": { "pkgB": "^2.2.2" }
                })),
            )
            .with_file("main", "packages/a/CHANGELOG.md", "# Changelog\n\n## 1.1.1 (2024-01-01)\n")
    }

    #[tokio::test]
    async fn chain_update_opens_one_aggregated_pull_request() {
        let host = chain_repository().with_commit(
            "c0ffee0001",
            "fix: handle empty input",
            &["packages/a/src/index.js"],
        );
        let mut orchestrator = orchestrator(&host);

        let pr = orchestrator.create_pull_request().await.unwrap().unwrap();
        assert_eq!(pr.head_branch, "herald--branches--main");
        assert_eq!(pr.base_branch, "main");

        let drafts = host.opened_pull_requests();
        assert_eq!(drafts.len(), 1);
        let draft = &drafts[0];
        assert_eq!(draft.title, "chore(main): release");
        assert_eq!(draft.labels, vec!["autorelease: pending".to_string()]);

        let a = json_update(draft, "packages/a/package.json");
        assert_eq!(a["version"], "1.1.2");
        let b = json_update(draft, "packages/b/package.json");
        assert_eq!(b["version"], "2.2.3");
        assert_eq!(b["dependencies"]["pkgA"], "^1.1.2");
        let c = json_update(draft, "packages/c/package.json");
        assert_eq!(c["version"], "3.3.4");
        assert_eq!(c["dependencies"]["pkgB"], "^2.2.3");

        assert_eq!(
            update(draft, MANIFEST),
            pretty(json!({
                "packages/a": "1.1.2",
                "packages/b": "2.2.3",
                "packages/c": "3.3.4"
            }))
        );

        let changelog = update(draft, "packages/a/CHANGELOG.md");
        assert!(changelog.starts_with(
            "# Changelog\n\n## 1.1.2 (2024-07-04)\n\n### Bug Fixes\n\n- handle empty input (c0ffee0)"
        ));
        assert!(changelog.ends_with("## 1.1.1 (2024-01-01)\n"));

        assert!(draft.body.contains("<details><summary>pkgA: 1.1.2</summary>"));
        assert!(draft.body.contains("<details><summary>pkgB: 2.2.3</summary>"));
        assert!(draft.body.contains("<details><summary>pkgC: 3.3.4</summary>"));
    }

    #[tokio::test]
    async fn numeric_manifest_values_fail_validation_without_writes() {
        let host = FakeHost::new("main")
            .with_file("main", CONFIG, r#"{ "packages": { "lib": {} } }"#)
            .with_file("main", MANIFEST, r#"{ "lib": 1 }"#)
            .with_commit("1", "feat: x", &["lib/x"]);
        let mut orchestrator = orchestrator(&host);

        assert!(!orchestrator.validate().await);
        assert!(orchestrator.create_pull_request().await.is_err());
        assert_eq!(host.write_count(), 0);
    }

    #[tokio::test]
    async fn configuration_without_packages_fails_validation() {
        let host = FakeHost::new("main")
            .with_file("main", CONFIG, r#"{ "packages": {} }"#)
            .with_file("main", MANIFEST, "{}");
        assert!(!orchestrator(&host).validate().await);

        let missing = FakeHost::new("main").with_file("main", MANIFEST, "{}");
        assert!(!orchestrator(&missing).validate().await);
    }

    #[tokio::test]
    async fn malformed_release_as_fails_validation_without_writes() {
        let host = FakeHost::new("main")
            .with_file(
                "main",
                CONFIG,
                r#"{ "packages": { "lib": { "release-as": "two" } } }"#,
            )
            .with_file("main", MANIFEST, r#"{ "lib": "1.0.0" }"#)
            .with_commit("1", "feat: new thing", &["lib/src.txt"]);
        let mut run = orchestrator(&host);

        assert!(!run.validate().await);
        assert!(run.create_pull_request().await.is_err());
        assert_eq!(host.write_count(), 0);
    }

    #[tokio::test]
    async fn validate_accepts_well_formed_state() {
        let host = FakeHost::new("main")
            .with_file("main", CONFIG, r#"{ "packages": { "lib": {} } }"#)
            .with_file("main", MANIFEST, r#"{ "lib": "1.0.0" }"#);
        let mut orchestrator = orchestrator(&host);
        assert!(orchestrator.validate().await);
        assert!(orchestrator.validate().await);
        assert_eq!(host.write_count(), 0);
    }

    #[tokio::test]
    async fn missing_manifest_entries_fall_back_to_the_tip() {
        let merged = PullRequest {
            number: 3,
            head_branch: "herald--branches--main".into(),
            base_branch: "main".into(),
            labels: vec!["autorelease: tagged".into()],
            merge_commit_sha: Some("merge-1".into()),
            ..PullRequest::default()
        };
        let host = FakeHost::new("main")
            .with_file("main", CONFIG, r#"{ "packages": { "a": {}, "b": {} } }"#)
            .with_file("main", MANIFEST, r#"{ "a": "1.0.0", "b": "0.3.0" }"#)
            .with_file("merge-1", MANIFEST, r#"{ "a": "1.0.0" }"#)
            .with_merged_pull_request(merged)
            .with_commit("new-1", "feat: grow b", &["b/src/lib.txt"])
            .with_commit("merge-1", "chore(main): release", &["a/version.txt"])
            .with_commit("old-1", "feat: ancient", &["a/src/lib.txt"]);
        let mut orchestrator = orchestrator(&host);

        orchestrator.create_pull_request().await.unwrap().unwrap();

        let draft = &host.opened_pull_requests()[0];
        assert_eq!(draft.title, "chore(main): release b 0.4.0");
        assert_eq!(update(draft, "b/version.txt"), "0.4.0\n");
        assert!(draft.updates.iter().all(|update| update.path != "a/version.txt"));
        assert_eq!(
            update(draft, MANIFEST),
            pretty(json!({ "a": "1.0.0", "b": "0.4.0" }))
        );
    }

    #[tokio::test]
    async fn bootstrap_sha_bounds_the_first_run() {
        let host = FakeHost::new("main")
            .with_file(
                "main",
                CONFIG,
                r#"{ "bootstrap-sha": "boot", "packages": { "lib": {} } }"#,
            )
            .with_file("main", MANIFEST, r#"{ "lib": "2.0.0" }"#)
            .with_commit("after", "fix: after bootstrap", &["lib/a"])
            .with_commit("boot", "feat!: before bootstrap", &["lib/a"]);
        let mut orchestrator = orchestrator(&host);

        orchestrator.create_pull_request().await.unwrap().unwrap();
        let draft = &host.opened_pull_requests()[0];
        assert_eq!(draft.title, "chore(main): release lib 2.0.1");
    }

    #[tokio::test]
    async fn nothing_to_release_opens_nothing() {
        let host = FakeHost::new("main")
            .with_file("main", CONFIG, r#"{ "packages": { "lib": {} } }"#)
            .with_file("main", MANIFEST, r#"{ "lib": "1.0.0" }"#)
            .with_commit("1", "chore: tidy", &["lib/a"])
            .with_commit("2", "docs: readme", &["README.md"]);
        let mut run = orchestrator(&host);

        assert!(run.create_pull_request().await.unwrap().is_none());
        assert_eq!(host.write_count(), 0);
    }

    #[tokio::test]
    async fn empty_history_opens_nothing() {
        let empty = FakeHost::new("main")
            .with_file("main", CONFIG, r#"{ "packages": { "lib": {} } }"#)
            .with_file("main", MANIFEST, r#"{ "lib": "1.0.0" }"#);
        assert!(orchestrator(&empty).create_pull_request().await.unwrap().is_none());
        assert_eq!(empty.write_count(), 0);
    }

    #[tokio::test]
    async fn unknown_release_types_are_skipped() {
        let host = FakeHost::new("main")
            .with_file(
                "main",
                CONFIG,
                r#"{ "packages": { "py": { "release-type": "python" }, "lib": {} } }"#,
            )
            .with_file("main", MANIFEST, r#"{ "py": "1.0.0", "lib": "1.0.0" }"#)
            .with_commit("1", "fix: both", &["py/a.py", "lib/a.txt"]);
        let mut orchestrator = orchestrator(&host);

        orchestrator.create_pull_request().await.unwrap().unwrap();
        let draft = &host.opened_pull_requests()[0];
        assert_eq!(draft.title, "chore(main): release lib 1.0.1");
        assert_eq!(
            update(draft, MANIFEST),
            pretty(json!({ "lib": "1.0.1", "py": "1.0.0" }))
        );
    }

    #[tokio::test]
    async fn explicit_target_branch_is_used() {
        let host = FakeHost::new("main")
            .with_file("release/1.x", CONFIG, r#"{ "packages": { "lib": {} } }"#)
            .with_file("release/1.x", MANIFEST, r#"{ "lib": "1.4.0" }"#)
            .with_commit("1", "fix: backport", &["lib/a"]);
        let options = ManifestOptions {
            target_branch: Some("release/1.x".into()),
            ..ManifestOptions::default()
        };
        let mut orchestrator = Orchestrator::new(&host, options).with_date(date());

        let pr = orchestrator.create_pull_request().await.unwrap().unwrap();
        assert_eq!(pr.head_branch, "herald--branches--release/1.x");
        assert_eq!(pr.title, "chore(release/1.x): release lib 1.4.1");
    }

    /// A merged release PR for the chain scenario, as the PR flow would have produced it.
    fn merged_chain_release(labels: &[&str]) -> FakeHost {
        let body = "Herald prepared the following releases.\n\n---\n\n\
            <details><summary>pkgA: 1.1.2</summary>\n\n### Bug Fixes\n\n- handle empty input (c0ffee0)\n</details>\n\n\
            <details><summary>pkgB: 2.2.3</summary>\n\n### Dependencies\n</details>\n\n---\n";
        let merged = PullRequest {
            number: 12,
            title: "chore(main): release".into(),
            body: body.into(),
            head_branch: "herald--branches--main".into(),
            base_branch: "main".into(),
            labels: labels.iter().map(|label| label.to_string()).collect(),
            files: vec![
                "packages/a/package.json".into(),
                "packages/a/CHANGELOG.md".into(),
                "packages/b/package.json".into(),
                MANIFEST.into(),
            ],
            merge_commit_sha: Some("merge-sha".into()),
        };
        chain_repository()
            .with_file(
                "merge-sha",
                MANIFEST,
                r#"{ "packages/a": "1.1.2", "packages/b": "2.2.3", "packages/c": "3.3.3" }"#,
            )
            .with_file("merge-sha", "packages/a/package.json", r#"{ "name": "pkgA", "version": "1.1.2" }"#)
            .with_file("merge-sha", "packages/b/package.json", r#"{ "name": "pkgB", "version": "2.2.3" }"#)
            .with_merged_pull_request(merged)
    }

    #[tokio::test]
    async fn merged_pull_request_becomes_tagged_releases() {
        let host = merged_chain_release(&["autorelease: pending"]);
        let mut orchestrator = orchestrator(&host);

        let summary = orchestrator.create_releases().await.unwrap().unwrap();
        assert!(summary.is_complete());
        assert!(summary.labels_updated);
        assert_eq!(summary.pull_request, 12);

        let releases = host.created_releases();
        assert_eq!(releases.len(), 2);
        assert_eq!(releases[0].tag_name, "pkgA-v1.1.2");
        assert_eq!(releases[0].name, "pkgA: v1.1.2");
        assert_eq!(releases[0].body, "### Bug Fixes\n\n- handle empty input (c0ffee0)");
        assert_eq!(releases[0].sha, "merge-sha");
        assert_eq!(releases[1].tag_name, "pkgB-v2.2.3");

        // the second run finds the pull request already tagged
        assert!(orchestrator.create_releases().await.unwrap().is_none());
        assert_eq!(host.created_releases().len(), 2);
    }

    #[tokio::test]
    async fn retrying_a_partial_release_skips_existing_tags() {
        let host = merged_chain_release(&["autorelease: pending"])
            .with_release_failure("pkgB-v2.2.3", HostError::Api("500".into()));

        let first = orchestrator(&host).create_releases().await.unwrap().unwrap();
        assert!(!first.is_complete());
        assert!(!first.labels_updated);

        host.clear_release_failures();
        let second = orchestrator(&host).create_releases().await.unwrap().unwrap();
        assert!(second.is_complete());
        assert_eq!(second.already_released, vec!["pkgA-v1.1.2".to_string()]);
        assert_eq!(second.created.len(), 1);
        assert!(second.labels_updated);
    }

    #[tokio::test]
    async fn release_flow_bails_out_on_unlabeled_or_released_pull_requests() {
        let unlabeled = merged_chain_release(&[]);
        assert!(orchestrator(&unlabeled).create_releases().await.unwrap().is_none());

        let released = merged_chain_release(&["autorelease: pending", "autorelease: tagged"]);
        assert!(orchestrator(&released).create_releases().await.unwrap().is_none());

        let nothing = chain_repository();
        assert!(orchestrator(&nothing).create_releases().await.unwrap().is_none());

        assert!(unlabeled.created_releases().is_empty());
        assert!(released.created_releases().is_empty());
        assert_eq!(released.write_count(), 0);
    }

    #[test]
    fn release_branch_names_embed_the_target() {
        assert_eq!(release_branch_name("main"), "herald--branches--main");
    }
}
