//! Turning a merged release pull request into tagged releases.

use crate::host::{CodeHost, HostError};
use crate::types::{PullRequest, Release, ReleaseCandidate};
use tracing::{error, info, warn};

/// Labels marking the state of a release pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseLabels {
    /// Merged but not yet fully released
    pub pending: String,
    /// Every release exists
    pub released: String,
}

/// A release the host refused to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedRelease {
    pub path: String,
    pub tag_name: String,
    pub error: String,
}

/// Outcome of one pass of [`create_releases`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseSummary {
    pub pull_request: u64,
    pub created: Vec<Release>,
    /// Tags that already existed on the host
    pub already_released: Vec<String>,
    pub failed: Vec<FailedRelease>,
    /// Whether the pending label was swapped for the released one
    pub labels_updated: bool,
}

impl ReleaseSummary {
    /// True when every candidate now has a release.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Tag names of releases created or found in this pass.
    pub fn released_tags(&self) -> Vec<&str> {
        self.created
            .iter()
            .map(|release| release.tag_name.as_str())
            .chain(self.already_released.iter().map(String::as_str))
            .collect()
    }
}

fn success_comment(release: &Release) -> String {
    format!("Release `{}` created: {}", release.tag_name, release.html_url)
}

fn failure_comment(candidate: &ReleaseCandidate, err: &HostError) -> String {
    format!(
        "Failed to create release `{}` for `{}`: {}\n\nRe-run the release job once the problem is fixed; releases that already exist are skipped.",
        candidate.tag_name, candidate.path, err
    )
}

async fn comment(host: &dyn CodeHost, number: u64, body: &str) {
    if let Err(err) = host.comment(number, body).await {
        warn!("failed to comment on #{}: {}", number, err);
    }
}

/// Create one release per candidate, in order.
///
/// A tag that already exists counts as released, so re-running after a
/// partial failure only retries what is missing. Any other failure is
/// reported on the pull request and the remaining candidates are still
/// attempted. Labels are swapped only when nothing failed. Comment and label
/// errors are logged and do not affect the outcome.
pub async fn create_releases(
    host: &dyn CodeHost,
    pull_request: &PullRequest,
    candidates: &[ReleaseCandidate],
    labels: &ReleaseLabels,
) -> ReleaseSummary {
    let number = pull_request.number;
    let mut summary = ReleaseSummary {
        pull_request: number,
        ..ReleaseSummary::default()
    };

    for candidate in candidates {
        match host.create_release(candidate).await {
            Ok(release) => {
                info!("created release {} ({})", release.tag_name, release.html_url);
                comment(host, number, &success_comment(&release)).await;
                summary.created.push(release);
            }
            Err(HostError::TagAlreadyExists(tag)) => {
                info!("release {} already exists, skipping", tag);
                summary.already_released.push(candidate.tag_name.clone());
            }
            Err(err) => {
                error!("failed to create release {}: {}", candidate.tag_name, err);
                comment(host, number, &failure_comment(candidate, &err)).await;
                summary.failed.push(FailedRelease {
                    path: candidate.path.clone(),
                    tag_name: candidate.tag_name.clone(),
                    error: err.to_string(),
                });
            }
        }
    }

    if !summary.is_complete() {
        warn!(
            "{} of {} release(s) failed, leaving #{} labeled '{}'",
            summary.failed.len(),
            candidates.len(),
            number,
            labels.pending
        );
        return summary;
    }

    let removed = host
        .remove_labels(number, std::slice::from_ref(&labels.pending))
        .await;
    let added = host
        .add_labels(number, std::slice::from_ref(&labels.released))
        .await;
    match (removed, added) {
        (Ok(()), Ok(())) => summary.labels_updated = true,
        (removed, added) => {
            for err in [removed.err(), added.err()].into_iter().flatten() {
                warn!("failed to update labels on #{}: {}", number, err);
            }
        }
    }

    summary
}
