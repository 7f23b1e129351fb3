//! Wire shapes of the REST routes the client calls directly.

use crate::error::{GitHubError, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use herald_core::PullRequest;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub(crate) struct RepositoryPayload {
    pub default_branch: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ContentPayload {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub encoding: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommitMessage {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommitFile {
    pub filename: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommitPayload {
    pub sha: String,
    pub commit: CommitMessage,
    #[serde(default)]
    pub files: Vec<CommitFile>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BranchRef {
    #[serde(rename = "ref")]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LabelPayload {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PullRequestPayload {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    pub body: Option<String>,
    pub head: BranchRef,
    pub base: BranchRef,
    #[serde(default)]
    pub labels: Vec<LabelPayload>,
    pub merged_at: Option<String>,
    pub merge_commit_sha: Option<String>,
}

impl PullRequestPayload {
    pub fn is_merged(&self) -> bool {
        self.merged_at.is_some()
    }

    pub fn into_pull_request(self, files: Vec<String>) -> PullRequest {
        let merge_commit_sha = if self.is_merged() {
            self.merge_commit_sha
        } else {
            None
        };
        PullRequest {
            number: self.number,
            title: self.title,
            body: self.body.unwrap_or_default(),
            head_branch: self.head.name,
            base_branch: self.base.name,
            labels: self.labels.into_iter().map(|label| label.name).collect(),
            files,
            merge_commit_sha,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ObjectPayload {
    pub sha: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GitRefPayload {
    pub object: ObjectPayload,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GitCommitPayload {
    pub sha: String,
    pub tree: ObjectPayload,
}

#[derive(Debug, Serialize)]
pub(crate) struct TreeEntry<'a> {
    pub path: &'a str,
    pub mode: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub content: &'a str,
}

impl<'a> TreeEntry<'a> {
    pub fn file(path: &'a str, content: &'a str) -> Self {
        Self {
            path,
            mode: "100644",
            kind: "blob",
            content,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateTree<'a> {
    pub base_tree: &'a str,
    pub tree: Vec<TreeEntry<'a>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateCommit<'a> {
    pub message: &'a str,
    pub tree: &'a str,
    pub parents: Vec<&'a str>,
}

#[derive(Debug, Serialize)]
pub(crate) struct UpdateRef<'a> {
    pub sha: &'a str,
    pub force: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateRef<'a> {
    #[serde(rename = "ref")]
    pub name: String,
    pub sha: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreatePull<'a> {
    pub title: &'a str,
    pub head: &'a str,
    pub base: &'a str,
    pub body: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct UpdatePull<'a> {
    pub title: &'a str,
    pub body: &'a str,
}

/// Query string for paged list routes.
#[derive(Debug, Serialize)]
pub(crate) struct ListQuery<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<&'a str>,
    pub per_page: u8,
    pub page: u32,
}

impl ListQuery<'_> {
    pub fn page(page: u32) -> Self {
        Self {
            sha: None,
            state: None,
            head: None,
            base: None,
            sort: None,
            direction: None,
            per_page: 100,
            page,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct RefQuery<'a> {
    #[serde(rename = "ref")]
    pub reference: &'a str,
}

/// Decode the body of a contents API response.
pub(crate) fn decode_content(path: &str, payload: &ContentPayload) -> Result<String> {
    let raw = match payload.encoding.as_str() {
        "base64" => {
            let compact: String = payload
                .content
                .chars()
                .filter(|c| !c.is_ascii_whitespace())
                .collect();
            STANDARD.decode(compact).map_err(|err| GitHubError::Decode {
                path: path.to_string(),
                message: err.to_string(),
            })?
        }
        "" | "utf-8" => payload.content.clone().into_bytes(),
        other => {
            return Err(GitHubError::Decode {
                path: path.to_string(),
                message: format!("unsupported encoding '{other}'"),
            });
        }
    };
    String::from_utf8(raw).map_err(|err| GitHubError::Decode {
        path: path.to_string(),
        message: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_wrapped_base64_content() {
        let payload = ContentPayload {
            content: "eyAibmFtZSI6\nICJhIiB9Cg==\n".into(),
            encoding: "base64".into(),
        };
        assert_eq!(decode_content("a.json", &payload).unwrap(), "{ \"name\": \"a\" }\n");
    }

    #[test]
    fn rejects_unknown_encodings() {
        let payload = ContentPayload {
            content: String::new(),
            encoding: "none".into(),
        };
        let err = decode_content("big.bin", &payload).unwrap_err();
        assert!(err.to_string().contains("big.bin"));
    }

    #[test]
    fn merged_pull_request_payload_keeps_merge_sha() {
        let payload: PullRequestPayload = serde_json::from_value(json!({
            "number": 42,
            "title": "chore(main): release",
            "body": null,
            "head": { "ref": "herald--branches--main" },
            "base": { "ref": "main" },
            "labels": [{ "name": "autorelease: pending" }],
            "merged_at": "2024-07-04T10:00:00Z",
            "merge_commit_sha": "abc123"
        }))
        .unwrap();

        let pr = payload.into_pull_request(vec!["a/package.json".into()]);
        assert_eq!(pr.number, 42);
        assert_eq!(pr.body, "");
        assert_eq!(pr.head_branch, "herald--branches--main");
        assert!(pr.has_label("autorelease: pending"));
        assert_eq!(pr.merge_commit_sha.as_deref(), Some("abc123"));
        assert_eq!(pr.files, vec!["a/package.json".to_string()]);
    }

    #[test]
    fn closed_unmerged_pull_request_has_no_merge_sha() {
        let payload: PullRequestPayload = serde_json::from_value(json!({
            "number": 7,
            "head": { "ref": "topic" },
            "base": { "ref": "main" },
            "merged_at": null,
            "merge_commit_sha": "test-merge-sha"
        }))
        .unwrap();
        assert!(!payload.is_merged());
        assert_eq!(payload.into_pull_request(Vec::new()).merge_commit_sha, None);
    }

    #[test]
    fn tree_entries_serialize_as_blobs() {
        let value = serde_json::to_value(TreeEntry::file("a/version.txt", "1.0.0\n")).unwrap();
        assert_eq!(
            value,
            json!({ "path": "a/version.txt", "mode": "100644", "type": "blob", "content": "1.0.0\n" })
        );
    }
}
