//! Local dependency graph over `package.json` descriptors.

use crate::errors::{HeraldError, Result};
use rustc_hash::FxHashMap;
use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::warn;

/// Spec prefixes that point at a directory instead of a published version.
const DIRECTORY_PREFIXES: [&str; 4] = ["file:", "link:", "portal:", "workspace:"];

/// Typed view of a `package.json`.
///
/// Only the fields the release engine reads are typed. Everything else is kept
/// in `extra` so the descriptor round-trips without losing keys.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PackageJson {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, String>,
    #[serde(
        default,
        rename = "devDependencies",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub dev_dependencies: BTreeMap<String, String>,
    #[serde(
        default,
        rename = "peerDependencies",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub peer_dependencies: BTreeMap<String, String>,
    #[serde(
        default,
        rename = "optionalDependencies",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub optional_dependencies: BTreeMap<String, String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PackageJson {
    pub fn parse(path: &str, source: &str) -> Result<Self> {
        serde_json::from_str(source)
            .map_err(|err| HeraldError::InvalidData(format!("failed to parse {path}: {err}")))
    }

    pub fn dependencies_of(&self, kind: DependencyKind) -> &BTreeMap<String, String> {
        match kind {
            DependencyKind::Runtime => &self.dependencies,
            DependencyKind::Dev => &self.dev_dependencies,
            DependencyKind::Peer => &self.peer_dependencies,
            DependencyKind::Optional => &self.optional_dependencies,
        }
    }
}

/// The dependency section an edge was declared in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DependencyKind {
    Runtime,
    Dev,
    Peer,
    Optional,
}

impl DependencyKind {
    pub const ALL: [DependencyKind; 4] = [Self::Runtime, Self::Dev, Self::Peer, Self::Optional];

    /// Key of the section in `package.json`.
    pub fn section(&self) -> &'static str {
        match self {
            Self::Runtime => "dependencies",
            Self::Dev => "devDependencies",
            Self::Peer => "peerDependencies",
            Self::Optional => "optionalDependencies",
        }
    }
}

/// How a local dependency refers to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecKind {
    /// A semver range the target's current version satisfies; rewritten on bumps.
    Range,
    /// A path reference (`file:`, `workspace:`...); never rewritten.
    Directory,
}

/// Classify `spec` against the local package's version.
///
/// Returns `None` when the spec does not refer to the local package at all,
/// for instance a range that only a published version would satisfy.
pub fn classify_spec(spec: &str, local_version: Option<&Version>) -> Option<SpecKind> {
    let spec = spec.trim();
    if DIRECTORY_PREFIXES
        .iter()
        .any(|prefix| spec.starts_with(prefix))
    {
        return Some(SpecKind::Directory);
    }

    let version = local_version?;
    npm_requirements(spec)?
        .iter()
        .any(|req| req.matches(version))
        .then_some(SpecKind::Range)
}

const OPERATORS: [&str; 7] = [">=", "<=", ">", "<", "=", "~", "^"];

/// Translate an npm range into its `||` alternatives.
///
/// A bare version is an exact pin, hyphen ranges are inclusive on both ends and
/// `x`/`*` segments are wildcards. Returns `None` for anything that is not a
/// range (dist tags, URLs, aliases).
pub fn npm_requirements(spec: &str) -> Option<Vec<VersionReq>> {
    spec.split("||").map(npm_comparator_set).collect()
}

fn npm_comparator_set(set: &str) -> Option<VersionReq> {
    let tokens: Vec<&str> = set.split_whitespace().collect();
    let comparators = match tokens.as_slice() {
        [low, "-", high] => vec![
            npm_comparator(&format!(">={low}"))?,
            npm_comparator(&format!("<={high}"))?,
        ],
        _ => {
            let mut merged: Vec<String> = Vec::new();
            let mut pending = String::new();
            for token in tokens {
                pending.push_str(token);
                if !token.chars().all(|c| matches!(c, '<' | '>' | '=' | '~' | '^')) {
                    merged.push(std::mem::take(&mut pending));
                }
            }
            if !pending.is_empty() {
                return None;
            }
            merged
                .iter()
                .map(|comparator| npm_comparator(comparator))
                .collect::<Option<Vec<_>>>()?
        }
    };

    let comparators: Vec<String> = comparators.into_iter().flatten().collect();
    if comparators.is_empty() {
        return Some(VersionReq::STAR);
    }
    VersionReq::parse(&comparators.join(", ")).ok()
}

/// One npm comparator in Cargo syntax; `Some(None)` is a wildcard.
fn npm_comparator(comparator: &str) -> Option<Option<String>> {
    let op = OPERATORS
        .iter()
        .find(|op| comparator.starts_with(**op))
        .copied()
        .unwrap_or("");
    let rest = comparator[op.len()..].trim_start_matches(['v', 'V']);
    if rest.is_empty() {
        return None;
    }

    let mut version = String::new();
    for segment in rest.split('.') {
        if matches!(segment, "x" | "X" | "*") {
            break;
        }
        if !version.is_empty() {
            version.push('.');
        }
        version.push_str(segment);
    }
    if version.is_empty() {
        return Some(None);
    }
    let op = if op.is_empty() { "=" } else { op };
    Some(Some(format!("{op}{version}")))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalDependency {
    pub name: String,
    pub kind: DependencyKind,
    pub spec: String,
    pub spec_kind: SpecKind,
}

/// A package in the graph, with its original descriptor text.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageNode {
    pub name: String,
    /// Repository-relative package path
    pub path: String,
    /// Raw version string from the descriptor (may not be valid semver)
    pub version: String,
    pub descriptor: PackageJson,
    pub source: String,
    pub local_dependencies: Vec<LocalDependency>,
}

impl PackageNode {
    pub fn depends_on(&self, name: &str) -> bool {
        self.local_dependencies.iter().any(|dep| dep.name == name)
    }
}

/// Directed graph of packages; an edge runs from a package to each local
/// package it depends on.
#[derive(Debug, Clone, Default)]
pub struct PackageGraph {
    nodes: BTreeMap<String, PackageNode>,
    by_path: FxHashMap<String, String>,
}

impl PackageGraph {
    /// Build the graph from `(package path, package.json text)` pairs.
    ///
    /// Descriptors that fail to parse are skipped; when two descriptors share a
    /// name, the first one wins.
    pub fn build<I>(descriptors: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut nodes: BTreeMap<String, PackageNode> = BTreeMap::new();
        let mut by_path = FxHashMap::default();

        for (path, source) in descriptors {
            let descriptor = match PackageJson::parse(&path, &source) {
                Ok(descriptor) => descriptor,
                Err(err) => {
                    warn!("skipping package at {}: {}", path, err);
                    continue;
                }
            };
            if let Some(existing) = nodes.get(&descriptor.name) {
                warn!(
                    "package name '{}' at {} is already used by {}, skipping",
                    descriptor.name, path, existing.path
                );
                continue;
            }
            by_path.insert(path.clone(), descriptor.name.clone());
            nodes.insert(
                descriptor.name.clone(),
                PackageNode {
                    name: descriptor.name.clone(),
                    path,
                    version: descriptor.version.clone().unwrap_or_default(),
                    descriptor,
                    source,
                    local_dependencies: Vec::new(),
                },
            );
        }

        let local_versions: BTreeMap<String, Option<Version>> = nodes
            .iter()
            .map(|(name, node)| (name.clone(), Version::parse(node.version.trim()).ok()))
            .collect();

        for node in nodes.values_mut() {
            let mut edges = Vec::new();
            for kind in DependencyKind::ALL {
                for (name, spec) in node.descriptor.dependencies_of(kind) {
                    let Some(local_version) = local_versions.get(name) else {
                        continue;
                    };
                    if let Some(spec_kind) = classify_spec(spec, local_version.as_ref()) {
                        edges.push(LocalDependency {
                            name: name.clone(),
                            kind,
                            spec: spec.clone(),
                            spec_kind,
                        });
                    }
                }
            }
            node.local_dependencies = edges;
        }

        Self { nodes, by_path }
    }

    pub fn node(&self, name: &str) -> Option<&PackageNode> {
        self.nodes.get(name)
    }

    pub fn node_at(&self, path: &str) -> Option<&PackageNode> {
        self.by_path.get(path).and_then(|name| self.nodes.get(name))
    }

    pub fn nodes(&self) -> impl Iterator<Item = &PackageNode> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Packages declaring a local dependency on `name`.
    pub fn dependents_of<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a PackageNode> {
        self.nodes.values().filter(move |node| node.depends_on(name))
    }

    /// `roots` plus every package that transitively depends on one of them.
    /// Names that are not graph nodes are ignored.
    pub fn dependents_closure<'a, I>(&self, roots: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut seen: BTreeSet<String> = BTreeSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        for root in roots {
            if let Some(node) = self.nodes.get(root)
                && seen.insert(node.name.clone())
            {
                queue.push_back(node.name.as_str());
            }
        }

        while let Some(current) = queue.pop_front() {
            for dependent in self.dependents_of(current) {
                if seen.insert(dependent.name.clone()) {
                    queue.push_back(dependent.name.as_str());
                }
            }
        }

        seen
    }

    /// Order `include` so every package comes after the packages it depends on.
    ///
    /// Cycles do not fail: when no package is ready, the remaining package with
    /// the smallest name is taken next and its unresolved dependencies are ignored.
    pub fn topological_order(&self, include: &BTreeSet<String>) -> Vec<String> {
        // edge dep -> dependent
        let mut indegree: BTreeMap<&str, usize> = BTreeMap::new();
        let mut forward: BTreeMap<&str, Vec<&str>> = BTreeMap::new();

        for name in include {
            if self.nodes.contains_key(name) {
                indegree.insert(name.as_str(), 0);
            }
        }

        for name in include {
            let Some(node) = self.nodes.get(name) else {
                continue;
            };
            let deps: BTreeSet<&str> = node
                .local_dependencies
                .iter()
                .map(|dep| dep.name.as_str())
                .filter(|dep| *dep != name.as_str() && indegree.contains_key(dep))
                .collect();
            for dep in deps {
                forward.entry(dep).or_default().push(name.as_str());
                if let Some(degree) = indegree.get_mut(name.as_str()) {
                    *degree += 1;
                }
            }
        }

        let mut queue: VecDeque<&str> = indegree
            .iter()
            .filter_map(|(name, &degree)| (degree == 0).then_some(*name))
            .collect();
        let mut remaining: BTreeSet<&str> = indegree.keys().copied().collect();
        let mut out: Vec<String> = Vec::with_capacity(remaining.len());

        while !remaining.is_empty() {
            let next = match queue.pop_front() {
                Some(name) => name,
                None => match remaining.first() {
                    Some(&name) => {
                        warn!("dependency cycle detected, continuing with '{}'", name);
                        name
                    }
                    None => break,
                },
            };
            if !remaining.remove(next) {
                continue;
            }
            out.push(next.to_string());

            if let Some(children) = forward.get(next) {
                for &child in children {
                    if let Some(degree) = indegree.get_mut(child) {
                        *degree = degree.saturating_sub(1);
                        if *degree == 0 && remaining.contains(child) {
                            queue.push_back(child);
                        }
                    }
                }
            }
        }

        out
    }
}
