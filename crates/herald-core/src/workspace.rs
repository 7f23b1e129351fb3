//! The `node-workspace` plugin: cascades version bumps through local npm
//! dependencies so dependents are released against the new versions.

use crate::adapters::{DependencyRewrite, read_optional, update_package_json};
use crate::changelog::{prepend_entry, render_entry};
use crate::config::PackageConfig;
use crate::errors::Result;
use crate::graph::{DependencyKind, LocalDependency, PackageGraph, PackageNode, SpecKind};
use crate::host::CodeHost;
use crate::markdown::format_markdown_list_item;
use crate::plugins::Stage;
use crate::types::{Bump, FileUpdate, PackageWithPrData, PrData, VersionsMap};
use chrono::NaiveDate;
use semver::Version;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

const NODE_RELEASE_TYPE: &str = "node";
const PACKAGE_JSON: &str = "package.json";

/// Propagation state for the npm packages of the repository.
#[derive(Debug, Clone)]
pub struct NodeWorkspace {
    graph: PackageGraph,
    configs: BTreeMap<String, PackageConfig>,
    changelogs: BTreeMap<String, String>,
    date: NaiveDate,
}

impl NodeWorkspace {
    /// Read the descriptor and changelog of every `node` package at `reference`.
    /// Packages without a `package.json` are left out of the graph.
    pub async fn load(
        host: &dyn CodeHost,
        packages: &[PackageConfig],
        reference: &str,
        date: NaiveDate,
    ) -> Result<Self> {
        let mut descriptors = Vec::new();
        let mut configs = Vec::new();
        let mut changelogs = BTreeMap::new();

        for config in packages
            .iter()
            .filter(|config| config.release_type == NODE_RELEASE_TYPE)
        {
            let manifest_path = config.file_path(PACKAGE_JSON);
            let Some(source) = read_optional(host, &manifest_path, reference).await? else {
                warn!("no {} at {}, skipping {}", manifest_path, reference, config.path);
                continue;
            };
            descriptors.push((config.path.clone(), source));

            let changelog_path = config.file_path(&config.changelog_path);
            if let Some(changelog) = read_optional(host, &changelog_path, reference).await? {
                changelogs.insert(config.path.clone(), changelog);
            }
            configs.push(config.clone());
        }

        Ok(Self::new(descriptors, configs, changelogs, date))
    }

    /// Build from already loaded `(package path, package.json text)` pairs.
    pub fn new(
        descriptors: Vec<(String, String)>,
        configs: Vec<PackageConfig>,
        changelogs: BTreeMap<String, String>,
        date: NaiveDate,
    ) -> Self {
        Self {
            graph: PackageGraph::build(descriptors),
            configs: configs
                .into_iter()
                .map(|config| (config.path.clone(), config))
                .collect(),
            changelogs,
            date,
        }
    }

    pub fn graph(&self) -> &PackageGraph {
        &self.graph
    }

    /// Next version of every package touched by the cascade, in processing order.
    ///
    /// Directly updated packages keep their assigned version; dependents get a
    /// patch bump. Dependents whose current version is not valid semver are
    /// dropped.
    fn plan(&self, direct: &BTreeMap<String, Version>) -> Vec<(&PackageNode, Version)> {
        let candidates = self
            .graph
            .dependents_closure(direct.keys().map(String::as_str));
        let order = self.graph.topological_order(&candidates);

        let mut planned = Vec::with_capacity(order.len());
        for name in &order {
            let Some(node) = self.graph.node(name) else {
                continue;
            };
            if let Some(version) = direct.get(name) {
                planned.push((node, version.clone()));
                continue;
            }
            match Version::parse(node.version.trim()) {
                Ok(current) => planned.push((node, Bump::Patch.apply(&current))),
                Err(err) => warn!(
                    "not updating {}: invalid version '{}' ({})",
                    node.name, node.version, err
                ),
            }
        }
        planned
    }

    fn dependency_notes(&self, updated: &[(&LocalDependency, &Version)]) -> Option<String> {
        if updated.is_empty() {
            return None;
        }

        let mut by_section: BTreeMap<DependencyKind, String> = BTreeMap::new();
        for (dependency, version) in updated {
            let previous = self
                .graph
                .node(&dependency.name)
                .map(|node| node.version.as_str())
                .unwrap_or_default();
            by_section
                .entry(dependency.kind)
                .or_default()
                .push_str(&format_markdown_list_item(&format!(
                    "{} bumped from {} to {}",
                    dependency.name, previous, version
                )));
        }

        let mut sections = String::new();
        for (kind, items) in by_section {
            sections.push_str(&format_markdown_list_item(&format!(
                "{}\n{}",
                kind.section(),
                items.trim_end()
            )));
        }
        let list = format_markdown_list_item(&format!(
            "The following workspace dependencies were updated\n{}",
            sections.trim_end()
        ));
        Some(format!("### Dependencies\n\n{}", list.trim_end()))
    }

    fn changelog_update(
        &self,
        config: &PackageConfig,
        version: &Version,
        notes: &str,
    ) -> FileUpdate {
        FileUpdate::new(
            config.file_path(&config.changelog_path),
            prepend_entry(
                self.changelogs.get(&config.path).map(String::as_str),
                &render_entry(version, self.date, notes),
            ),
        )
    }
}

impl Stage for NodeWorkspace {
    fn name(&self) -> &'static str {
        "node-workspace"
    }

    fn apply(
        &self,
        mut versions: VersionsMap,
        mut packages: Vec<PackageWithPrData>,
    ) -> Result<(VersionsMap, Vec<PackageWithPrData>)> {
        let direct: BTreeMap<String, Version> = packages
            .iter()
            .filter_map(|package| {
                self.graph
                    .node_at(&package.config.path)
                    .map(|node| (node.name.clone(), package.pr.version.clone()))
            })
            .collect();
        if direct.is_empty() {
            debug!("no npm package in this release, nothing to propagate");
            return Ok((versions, packages));
        }

        let planned = self.plan(&direct);
        let new_versions: BTreeMap<&str, &Version> = planned
            .iter()
            .map(|(node, version)| (node.name.as_str(), version))
            .collect();

        for (node, version) in &planned {
            let updated: Vec<(&LocalDependency, &Version)> = node
                .local_dependencies
                .iter()
                .filter(|dependency| dependency.name != node.name)
                .filter_map(|dependency| {
                    new_versions
                        .get(dependency.name.as_str())
                        .map(|version| (dependency, *version))
                })
                .collect();
            let rewrites: Vec<DependencyRewrite> = updated
                .iter()
                .filter(|(dependency, _)| dependency.spec_kind == SpecKind::Range)
                .map(|(dependency, version)| DependencyRewrite {
                    kind: dependency.kind,
                    name: dependency.name.clone(),
                    spec: format!("^{version}"),
                })
                .collect();
            let notes = self.dependency_notes(&updated);

            if let Some(existing) = packages
                .iter_mut()
                .find(|package| package.config.path == node.path)
            {
                let manifest_path = existing.config.file_path(PACKAGE_JSON);
                let base = existing
                    .pr
                    .update_content(&manifest_path)
                    .unwrap_or(node.source.as_str())
                    .to_string();
                let content = update_package_json(
                    &manifest_path,
                    &base,
                    Some(&version.to_string()),
                    &rewrites,
                )?;
                existing.pr.upsert_update(&manifest_path, content);

                if let Some(notes) = notes {
                    existing.pr.notes = if existing.pr.notes.trim().is_empty() {
                        notes
                    } else {
                        format!("{}\n\n{}", existing.pr.notes.trim_end(), notes)
                    };
                    let changelog =
                        self.changelog_update(&existing.config, version, &existing.pr.notes);
                    existing.pr.upsert_update(&changelog.path, changelog.content);
                }
                continue;
            }

            let Some(config) = self.configs.get(&node.path) else {
                continue;
            };
            info!("releasing {} {} as a dependent", node.name, version);
            let manifest_path = config.file_path(PACKAGE_JSON);
            let content =
                update_package_json(&manifest_path, &node.source, Some(&version.to_string()), &rewrites)?;
            let notes = notes.unwrap_or_default();
            let changelog = self.changelog_update(config, version, &notes);
            let component = config
                .component
                .clone()
                .or_else(|| config.package_name.clone())
                .unwrap_or_else(|| node.name.clone());

            versions.insert(config.path.clone(), version.to_string());
            packages.push(PackageWithPrData {
                config: config.clone(),
                component,
                pr: PrData {
                    version: version.clone(),
                    notes,
                    updates: vec![FileUpdate::new(manifest_path, content), changelog],
                },
            });
        }

        Ok((versions, packages))
    }
}
