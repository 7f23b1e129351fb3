//! The two release flows: opening the aggregated release pull request, and
//! tagging releases once that pull request is merged.

use crate::candidates::resolve_candidates;
use crate::config::{DEFAULT_CONFIG_FILE, ManifestConfig, PackageConfig};
use crate::errors::{HeraldError, Result};
use crate::host::CodeHost;
use crate::manifest::{DEFAULT_MANIFEST_FILE, parse_versions, render_versions};
use crate::markdown::{parse_pull_request_body, render_pull_request_body};
use crate::plugins::build_pipeline;
use crate::release::{ReleaseLabels, ReleaseSummary, create_releases};
use crate::releaser::{ReleaseRequest, ReleaserRegistry};
use crate::types::{
    Commit, FileUpdate, PackageWithPrData, PrData, PullRequest, PullRequestDraft, VersionsMap,
};
use chrono::{NaiveDate, Utc};
use tracing::{debug, error, info, warn};

const RELEASE_BRANCH_PREFIX: &str = "herald--branches--";

/// Where the repository state lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestOptions {
    pub config_file: String,
    pub manifest_file: String,
    /// Branch releases are cut from; the repository default when unset
    pub target_branch: Option<String>,
}

impl Default for ManifestOptions {
    fn default() -> Self {
        Self {
            config_file: DEFAULT_CONFIG_FILE.to_string(),
            manifest_file: DEFAULT_MANIFEST_FILE.to_string(),
            target_branch: None,
        }
    }
}

#[derive(Debug, Clone)]
struct ValidatedState {
    target_branch: String,
    config: ManifestConfig,
    packages: Vec<PackageConfig>,
    versions: VersionsMap,
}

impl ValidatedState {
    fn labels(&self) -> ReleaseLabels {
        ReleaseLabels {
            pending: self.config.pending_label().to_string(),
            released: self.config.released_label().to_string(),
        }
    }
}

/// Name of the branch the release pull request for `target_branch` lives on.
pub fn release_branch_name(target_branch: &str) -> String {
    format!("{RELEASE_BRANCH_PREFIX}{target_branch}")
}

fn pull_request_title(target_branch: &str, packages: &[PackageWithPrData]) -> String {
    match packages {
        [single] => format!(
            "chore({}): release {} {}",
            target_branch, single.component, single.pr.version
        ),
        _ => format!("chore({target_branch}): release"),
    }
}

/// Drives releases of every configured package of one repository.
pub struct Orchestrator<'h> {
    host: &'h dyn CodeHost,
    registry: ReleaserRegistry,
    options: ManifestOptions,
    today: NaiveDate,
    state: Option<ValidatedState>,
}

impl<'h> Orchestrator<'h> {
    pub fn new(host: &'h dyn CodeHost, options: ManifestOptions) -> Self {
        Self {
            host,
            registry: ReleaserRegistry::default(),
            options,
            today: Utc::now().date_naive(),
            state: None,
        }
    }

    pub fn with_registry(mut self, registry: ReleaserRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Date written in changelog headings.
    pub fn with_date(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn options(&self) -> &ManifestOptions {
        &self.options
    }

    async fn load_state(&self) -> Result<ValidatedState> {
        let target_branch = match &self.options.target_branch {
            Some(branch) => branch.clone(),
            None => self.host.default_branch().await?,
        };

        let document = self
            .host
            .json_document(&self.options.config_file, &target_branch)
            .await
            .map_err(|err| {
                HeraldError::Config(format!(
                    "cannot read {} on {}: {}",
                    self.options.config_file, target_branch, err
                ))
            })?;
        let config = ManifestConfig::from_value(&document)?;

        let manifest = self
            .host
            .json_document(&self.options.manifest_file, &target_branch)
            .await
            .map_err(|err| {
                HeraldError::Manifest(format!(
                    "cannot read {} on {}: {}",
                    self.options.manifest_file, target_branch, err
                ))
            })?;
        let versions = parse_versions(&manifest)?;

        let packages = config.package_configs();
        debug!(
            "loaded {} package(s) from {} on {}",
            packages.len(),
            self.options.config_file,
            target_branch
        );
        Ok(ValidatedState {
            target_branch,
            config,
            packages,
            versions,
        })
    }

    async fn state(&mut self) -> Result<ValidatedState> {
        if let Some(state) = &self.state {
            return Ok(state.clone());
        }
        let state = self.load_state().await?;
        self.state = Some(state.clone());
        Ok(state)
    }

    /// Check that the configuration and versions manifest on the target branch
    /// are well formed. Never mutates the remote. The loaded state is reused by
    /// later calls.
    pub async fn validate(&mut self) -> bool {
        match self.state().await {
            Ok(_) => true,
            Err(err) => {
                error!("invalid release configuration: {}", err);
                false
            }
        }
    }

    /// Open or refresh the release pull request for every package with
    /// releasable commits. Returns `None` when there is nothing to release.
    pub async fn create_pull_request(&mut self) -> Result<Option<PullRequest>> {
        let state = self.state().await?;
        let target = state.target_branch.as_str();
        let branch = release_branch_name(target);

        let last_release = self.host.last_merged_pull_request(target, &branch).await?;
        let last_merge_sha = last_release
            .as_ref()
            .and_then(|pr| pr.merge_commit_sha.clone());
        let since = last_merge_sha
            .clone()
            .or_else(|| state.config.bootstrap_sha.clone());
        match &since {
            Some(sha) => info!("collecting commits on {} since {}", target, sha),
            None => info!("collecting the full history of {}", target),
        }

        let commits = self.host.commits_since(target, since.as_deref()).await?;
        if commits.is_empty() {
            info!("no new commits on {}", target);
            return Ok(None);
        }

        let as_of = last_merge_sha.as_deref().unwrap_or(target);
        let resolution = resolve_candidates(
            self.host,
            &state.packages,
            &commits,
            &self.options.manifest_file,
            as_of,
            target,
        )
        .await;

        let mut versions = state.versions.clone();
        let mut packages = Vec::new();
        for candidate in &resolution.packages {
            let releaser = match self.registry.build(&candidate.config) {
                Ok(releaser) => releaser,
                Err(err) => {
                    warn!("skipping {}: {}", candidate.config.path, err);
                    continue;
                }
            };
            let request = ReleaseRequest {
                commits: &candidate.commits,
                last_version: candidate.last_version.as_ref(),
                reference: target,
                date: self.today,
            };
            let Some(options) = releaser.open_pr_options(self.host, request).await? else {
                continue;
            };
            let component = releaser.component(self.host, target).await;
            info!(
                "{} ({}) will be released as {}",
                component, candidate.config.path, options.version
            );

            versions.insert(candidate.config.path.clone(), options.version.to_string());
            packages.push(PackageWithPrData {
                config: candidate.config.clone(),
                component,
                pr: PrData {
                    version: options.version,
                    notes: options.notes,
                    updates: options.updates,
                },
            });
        }

        if packages.is_empty() {
            info!("no package has releasable changes");
            return Ok(None);
        }

        let pipeline = build_pipeline(
            self.host,
            &state.config.plugins,
            &state.packages,
            target,
            self.today,
        )
        .await?;
        let (versions, mut packages) = pipeline.run(versions, packages)?;
        packages.sort_by(|a, b| a.config.path.cmp(&b.config.path));

        let mut updates: Vec<FileUpdate> = packages
            .iter()
            .flat_map(|package| package.pr.updates.iter().cloned())
            .collect();
        updates.push(FileUpdate::new(
            self.options.manifest_file.clone(),
            render_versions(&versions)?,
        ));

        let draft = PullRequestDraft {
            head_branch: branch,
            base_branch: target.to_string(),
            title: pull_request_title(target, &packages),
            body: render_pull_request_body(&packages),
            labels: vec![state.config.pending_label().to_string()],
            updates,
        };
        let pull_request = self.host.open_pull_request(&draft).await?;
        info!(
            "release pull request #{} covers {} package(s)",
            pull_request.number,
            packages.len()
        );
        Ok(Some(pull_request))
    }

    /// Tag releases for the last merged release pull request.
    ///
    /// Returns `None` when there is no merged release pull request waiting to
    /// be released.
    pub async fn create_releases(&mut self) -> Result<Option<ReleaseSummary>> {
        let state = self.state().await?;
        let target = state.target_branch.as_str();
        let branch = release_branch_name(target);
        let labels = state.labels();

        let Some(pull_request) = self.host.last_merged_pull_request(target, &branch).await? else {
            info!("no merged release pull request on {}", branch);
            return Ok(None);
        };
        if pull_request.has_label(&labels.released) {
            info!("#{} is already released", pull_request.number);
            return Ok(None);
        }
        if !pull_request.has_label(&labels.pending) {
            info!(
                "#{} is not labeled '{}', nothing to release",
                pull_request.number, labels.pending
            );
            return Ok(None);
        }
        let Some(merge_sha) = pull_request.merge_commit_sha.clone() else {
            warn!("#{} has no merge commit", pull_request.number);
            return Ok(None);
        };

        let files = pull_request
            .files
            .iter()
            .filter(|file| {
                **file != self.options.manifest_file && **file != self.options.config_file
            })
            .cloned()
            .collect();
        let merged = Commit {
            sha: merge_sha.clone(),
            message: pull_request.title.clone(),
            files,
        };
        let resolution = resolve_candidates(
            self.host,
            &state.packages,
            std::slice::from_ref(&merged),
            &self.options.manifest_file,
            &merge_sha,
            target,
        )
        .await;

        let sections = parse_pull_request_body(&pull_request.body);
        let mut candidates = Vec::new();
        for package in &resolution.packages {
            let Some(version) = &package.last_version else {
                warn!("no released version recorded for {}", package.config.path);
                continue;
            };
            let releaser = match self.registry.build(&package.config) {
                Ok(releaser) => releaser,
                Err(err) => {
                    warn!("skipping {}: {}", package.config.path, err);
                    continue;
                }
            };
            let component = releaser.component(self.host, &merge_sha).await;
            let version_text = version.to_string();
            let notes = match sections
                .iter()
                .find(|section| section.component == component && section.version == version_text)
            {
                Some(section) => section.notes.as_str(),
                None => {
                    warn!(
                        "no release notes for {} {} in #{}",
                        component, version, pull_request.number
                    );
                    ""
                }
            };
            candidates.push(releaser.build_release_candidate(&component, version, notes, &merge_sha));
        }

        if candidates.is_empty() {
            warn!("#{} does not release any configured package", pull_request.number);
            return Ok(None);
        }

        let summary = create_releases(self.host, &pull_request, &candidates, &labels).await;
        info!(
            "#{}: {} created, {} already released, {} failed",
            pull_request.number,
            summary.created.len(),
            summary.already_released.len(),
            summary.failed.len()
        );
        Ok(Some(summary))
    }
}
