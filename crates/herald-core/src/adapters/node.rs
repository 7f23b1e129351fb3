use crate::config::PackageConfig;
use crate::errors::{HeraldError, Result};
use crate::graph::{DependencyKind, PackageJson};
use crate::host::CodeHost;
use crate::releaser::Releaser;
use crate::types::FileUpdate;
use async_trait::async_trait;
use semver::Version;
use serde::Deserialize;
use serde_json::value::RawValue;
use std::collections::HashMap;
use tracing::warn;

const PACKAGE_JSON: &str = "package.json";

/// Releaser for npm packages.
#[derive(Debug, Clone)]
pub struct NodeReleaser {
    config: PackageConfig,
}

impl NodeReleaser {
    pub fn new(config: PackageConfig) -> Self {
        Self { config }
    }

    fn manifest_path(&self) -> String {
        self.config.file_path(PACKAGE_JSON)
    }
}

#[async_trait]
impl Releaser for NodeReleaser {
    fn config(&self) -> &PackageConfig {
        &self.config
    }

    fn default_initial_version(&self) -> Version {
        Version::new(1, 0, 0)
    }

    async fn package_name(&self, host: &dyn CodeHost, reference: &str) -> String {
        if let Some(name) = &self.config.package_name {
            return name.clone();
        }
        let path = self.manifest_path();
        match host.file_contents(&path, reference).await {
            Ok(content) => match PackageJson::parse(&path, &content) {
                Ok(descriptor) => return descriptor.name,
                Err(err) => warn!("{}", err),
            },
            Err(err) => warn!("failed to read {}: {}", path, err),
        }
        self.config.directory_name().to_string()
    }

    async fn version_updates(
        &self,
        host: &dyn CodeHost,
        reference: &str,
        version: &Version,
    ) -> Result<Vec<FileUpdate>> {
        let path = self.manifest_path();
        let input = host.file_contents(&path, reference).await?;
        let updated = update_package_json(&path, &input, Some(&version.to_string()), &[])?;
        Ok(vec![FileUpdate::new(path, updated)])
    }
}

/// A dependency spec to replace in one section of a `package.json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyRewrite {
    pub kind: DependencyKind,
    pub name: String,
    pub spec: String,
}

/// Update a `package.json` by setting the package version (if provided) and
/// replacing the given dependency specs.
///
/// Only the bytes of the touched values change, so formatting, key order and
/// unknown keys are preserved exactly. Rewrites naming a dependency that the
/// section does not declare are ignored.
pub fn update_package_json(
    manifest_path: &str,
    input: &str,
    new_version: Option<&str>,
    rewrites: &[DependencyRewrite],
) -> Result<String> {
    #[derive(Deserialize)]
    struct PackageJsonBorrowed<'a> {
        #[serde(borrow)]
        version: Option<&'a RawValue>,
        #[serde(borrow)]
        dependencies: Option<HashMap<String, &'a RawValue>>,
        #[serde(borrow, rename = "devDependencies")]
        dev_dependencies: Option<HashMap<String, &'a RawValue>>,
        #[serde(borrow, rename = "peerDependencies")]
        peer_dependencies: Option<HashMap<String, &'a RawValue>>,
        #[serde(borrow, rename = "optionalDependencies")]
        optional_dependencies: Option<HashMap<String, &'a RawValue>>,
    }

    let borrowed: PackageJsonBorrowed = serde_json::from_str(input).map_err(|err| {
        HeraldError::InvalidData(format!("failed to parse {manifest_path}: {err}"))
    })?;

    let mut replacements: Vec<(usize, usize, String)> = Vec::new();

    if let Some(target) = new_version {
        let raw = borrowed.version.ok_or_else(|| {
            HeraldError::InvalidData(format!("{manifest_path} is missing a version field"))
        })?;
        let current: String = serde_json::from_str(raw.get()).map_err(|err| {
            HeraldError::InvalidData(format!(
                "version field in {manifest_path} is not a string: {err}"
            ))
        })?;
        if current != target {
            let (start, end) = raw_span(raw, input)?;
            replacements.push((start, end, serde_json::to_string(target)?));
        }
    }

    for rewrite in rewrites {
        let section = match rewrite.kind {
            DependencyKind::Runtime => borrowed.dependencies.as_ref(),
            DependencyKind::Dev => borrowed.dev_dependencies.as_ref(),
            DependencyKind::Peer => borrowed.peer_dependencies.as_ref(),
            DependencyKind::Optional => borrowed.optional_dependencies.as_ref(),
        };
        let Some(raw) = section.and_then(|map| map.get(rewrite.name.as_str())) else {
            continue;
        };
        let current: String = serde_json::from_str(raw.get()).map_err(|err| {
            HeraldError::InvalidData(format!(
                "dependency spec for '{}' in {}.{} is not a string: {err}",
                rewrite.name,
                manifest_path,
                rewrite.kind.section()
            ))
        })?;
        if current != rewrite.spec {
            let (start, end) = raw_span(raw, input)?;
            replacements.push((start, end, serde_json::to_string(&rewrite.spec)?));
        }
    }

    if replacements.is_empty() {
        return Ok(input.to_string());
    }

    replacements.sort_by_key(|(start, _, _)| *start);
    replacements.dedup_by_key(|(start, _, _)| *start);
    let mut output = input.to_string();
    for (start, end, replacement) in replacements.into_iter().rev() {
        output.replace_range(start..end, &replacement);
    }
    Ok(output)
}

/// Byte span of a `RawValue` within the JSON source it was borrowed from.
fn raw_span(raw: &RawValue, source: &str) -> Result<(usize, usize)> {
    let slice = raw.get();
    let start = (slice.as_ptr() as usize)
        .checked_sub(source.as_ptr() as usize)
        .ok_or_else(|| {
            HeraldError::InvalidData("raw value is not part of the parsed document".into())
        })?;
    let end = start + slice.len();
    if end > source.len() {
        return Err(HeraldError::InvalidData(
            "raw value span exceeds the parsed document".into(),
        ));
    }
    Ok((start, end))
}
