//! Per-ecosystem release strategies and the registry that builds them.

use crate::adapters::{NodeReleaser, RustReleaser, SimpleReleaser, read_optional};
use crate::changelog::{default_sections, prepend_entry, render_entry, render_notes};
use crate::config::PackageConfig;
use crate::conventional::{aggregate_bump, next_version, parse_commits};
use crate::errors::{HeraldError, Result};
use crate::host::CodeHost;
use crate::types::{Commit, FileUpdate, ReleaseCandidate};
use async_trait::async_trait;
use chrono::NaiveDate;
use semver::Version;
use std::collections::BTreeMap;
use tracing::debug;

/// What a releaser contributes to the release pull request for one package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenPrOptions {
    pub version: Version,
    pub notes: String,
    pub updates: Vec<FileUpdate>,
}

/// Inputs for computing a package's next release.
#[derive(Debug, Clone, Copy)]
pub struct ReleaseRequest<'a> {
    pub commits: &'a [Commit],
    pub last_version: Option<&'a Version>,
    /// Reference the package files are read at
    pub reference: &'a str,
    pub date: NaiveDate,
}

#[async_trait]
pub trait Releaser: Send + Sync {
    fn config(&self) -> &PackageConfig;

    /// Version used for a package that has never been released.
    fn default_initial_version(&self) -> Version;

    /// Files to rewrite so the package reports `version`.
    async fn version_updates(
        &self,
        host: &dyn CodeHost,
        reference: &str,
        version: &Version,
    ) -> Result<Vec<FileUpdate>>;

    /// Name of the package: the configured name, or the last path segment.
    async fn package_name(&self, _host: &dyn CodeHost, _reference: &str) -> String {
        let config = self.config();
        config
            .package_name
            .clone()
            .unwrap_or_else(|| config.directory_name().to_string())
    }

    /// Name used in tags and in the pull request body.
    async fn component(&self, host: &dyn CodeHost, reference: &str) -> String {
        match &self.config().component {
            Some(component) => component.clone(),
            None => self.package_name(host, reference).await,
        }
    }

    /// Work out the next version, notes and file updates for this package.
    ///
    /// Returns `None` when no commit warrants a release and no `release-as`
    /// version is configured.
    async fn open_pr_options(
        &self,
        host: &dyn CodeHost,
        request: ReleaseRequest<'_>,
    ) -> Result<Option<OpenPrOptions>> {
        let config = self.config();
        let commits = parse_commits(request.commits);

        let version = match &config.release_as {
            Some(forced) => Version::parse(forced.trim()).map_err(|err| {
                HeraldError::InvalidVersion(format!(
                    "release-as '{}' for {}: {}",
                    forced, config.path, err
                ))
            })?,
            None => {
                let Some(bump) = aggregate_bump(&commits) else {
                    debug!("no releasable commits for {}", config.path);
                    return Ok(None);
                };
                match request.last_version {
                    Some(last) => next_version(
                        last,
                        bump,
                        config.bump_minor_pre_major,
                        config.bump_patch_for_minor_pre_major,
                    ),
                    None => self.default_initial_version(),
                }
            }
        };

        let sections = config.changelog_sections.clone().unwrap_or_else(default_sections);
        let notes = render_notes(&commits, &sections);

        let mut updates = self
            .version_updates(host, request.reference, &version)
            .await?;
        let changelog_path = config.file_path(&config.changelog_path);
        let existing = read_optional(host, &changelog_path, request.reference).await?;
        updates.push(FileUpdate::new(
            changelog_path,
            prepend_entry(
                existing.as_deref(),
                &render_entry(&version, request.date, &notes),
            ),
        ));

        Ok(Some(OpenPrOptions {
            version,
            notes,
            updates,
        }))
    }

    /// Describe the tagged release for `version`.
    fn build_release_candidate(
        &self,
        component: &str,
        version: &Version,
        notes: &str,
        sha: &str,
    ) -> ReleaseCandidate {
        let config = self.config();
        let include_component = config.include_component_in_tag
            && !component.is_empty()
            && !(config.is_root() && config.component.is_none());
        let (tag_name, name) = if include_component {
            (
                format!("{component}-v{version}"),
                format!("{component}: v{version}"),
            )
        } else {
            (format!("v{version}"), format!("v{version}"))
        };

        ReleaseCandidate {
            path: config.path.clone(),
            tag_name,
            name,
            body: notes.to_string(),
            draft: config.draft,
            sha: sha.to_string(),
        }
    }
}

type ReleaserFactory = fn(PackageConfig) -> Box<dyn Releaser>;

/// Release type name to releaser constructor.
pub struct ReleaserRegistry {
    factories: BTreeMap<String, ReleaserFactory>,
}

impl ReleaserRegistry {
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, release_type: &str, factory: ReleaserFactory) {
        self.factories.insert(release_type.to_string(), factory);
    }

    pub fn contains(&self, release_type: &str) -> bool {
        self.factories.contains_key(release_type)
    }

    pub fn release_types(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Build the releaser for `config.release_type`.
    pub fn build(&self, config: &PackageConfig) -> Result<Box<dyn Releaser>> {
        let factory = self
            .factories
            .get(&config.release_type)
            .ok_or_else(|| HeraldError::UnknownReleaseType(config.release_type.clone()))?;
        Ok(factory(config.clone()))
    }
}

impl Default for ReleaserRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("simple", |config| Box::new(SimpleReleaser::new(config)));
        registry.register("node", |config| Box::new(NodeReleaser::new(config)));
        registry.register("rust", |config| Box::new(RustReleaser::new(config)));
        registry
    }
}
