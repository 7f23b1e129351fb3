pub mod adapters;
pub mod candidates;
pub mod changelog;
pub mod config;
pub mod conventional;
pub mod errors;
pub mod graph;
pub mod host;
pub mod manifest;
pub mod markdown;
pub mod orchestrator;
pub mod plugins;
pub mod release;
pub mod releaser;
pub mod types;
pub mod workspace;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export commonly used items
pub use candidates::{CandidateResolution, PackageReleaseData, resolve_candidates};
pub use config::{ManifestConfig, PackageConfig};
pub use errors::{HeraldError, Result};
pub use graph::{PackageGraph, PackageJson};
pub use host::{CodeHost, HostError, HostResult};
pub use manifest::{load_versions, parse_versions, render_versions};
pub use orchestrator::{ManifestOptions, Orchestrator, release_branch_name};
pub use plugins::{Pipeline, PluginKind, Stage};
pub use release::{FailedRelease, ReleaseLabels, ReleaseSummary, create_releases};
pub use releaser::{OpenPrOptions, ReleaseRequest, Releaser, ReleaserRegistry};
pub use types::{
    Bump, Commit, FileUpdate, PackageWithPrData, PrData, PullRequest, PullRequestDraft, Release,
    ReleaseCandidate, VersionsMap,
};
pub use workspace::NodeWorkspace;

#[cfg(test)]
mod orchestrator_tests;
#[cfg(test)]
mod release_tests;
