use crate::errors::{HeraldError, Result};
use crate::plugins::PluginKind;
use semver::Version;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Default location of the configuration document.
pub const DEFAULT_CONFIG_FILE: &str = "herald-config.json";
/// Label applied to release pull requests waiting to be merged and tagged.
pub const DEFAULT_PENDING_LABEL: &str = "autorelease: pending";
/// Label applied once every release of a merged pull request exists.
pub const DEFAULT_RELEASED_LABEL: &str = "autorelease: tagged";
/// Release type used when neither the package nor the defaults name one.
pub const DEFAULT_RELEASE_TYPE: &str = "simple";
/// Path of the package that owns files outside every other package.
pub const ROOT_PACKAGE_PATH: &str = ".";

/// A changelog section: commits of `type` are listed under `section`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChangelogSection {
    #[serde(rename = "type")]
    pub commit_type: String,
    pub section: String,
    #[serde(default)]
    pub hidden: bool,
}

/// Per-package settings as written in the configuration document.
///
/// Every field is optional: unset values fall back to the repository-wide
/// defaults found at the top level of the document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PackageSettings {
    pub release_type: Option<String>,
    pub package_name: Option<String>,
    pub component: Option<String>,
    pub include_component_in_tag: Option<bool>,
    pub release_as: Option<String>,
    pub bump_minor_pre_major: Option<bool>,
    pub bump_patch_for_minor_pre_major: Option<bool>,
    pub changelog_sections: Option<Vec<ChangelogSection>>,
    pub changelog_path: Option<String>,
    pub draft: Option<bool>,
}

impl PackageSettings {
    fn or(&self, defaults: &PackageSettings) -> PackageSettings {
        PackageSettings {
            release_type: self
                .release_type
                .clone()
                .or_else(|| defaults.release_type.clone()),
            package_name: self.package_name.clone(),
            component: self.component.clone(),
            include_component_in_tag: self
                .include_component_in_tag
                .or(defaults.include_component_in_tag),
            release_as: self.release_as.clone(),
            bump_minor_pre_major: self.bump_minor_pre_major.or(defaults.bump_minor_pre_major),
            bump_patch_for_minor_pre_major: self
                .bump_patch_for_minor_pre_major
                .or(defaults.bump_patch_for_minor_pre_major),
            changelog_sections: self
                .changelog_sections
                .clone()
                .or_else(|| defaults.changelog_sections.clone()),
            changelog_path: self
                .changelog_path
                .clone()
                .or_else(|| defaults.changelog_path.clone()),
            draft: self.draft.or(defaults.draft),
        }
    }
}

/// The configuration document: repo-wide defaults plus one entry per package path.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ManifestConfig {
    #[serde(flatten)]
    pub defaults: PackageSettings,
    pub packages: BTreeMap<String, PackageSettings>,
    pub bootstrap_sha: Option<String>,
    #[serde(default)]
    pub plugins: Vec<PluginKind>,
    pub label: Option<String>,
    pub release_label: Option<String>,
}

impl ManifestConfig {
    /// Shape-check a raw configuration document and deserialize it.
    ///
    /// The document must be a JSON object with a non-empty `packages` object.
    pub fn from_value(value: &Value) -> Result<Self> {
        let object = value.as_object().ok_or_else(|| {
            HeraldError::Config("configuration document must be a JSON object".into())
        })?;
        let packages = object
            .get("packages")
            .and_then(Value::as_object)
            .ok_or_else(|| HeraldError::Config("configuration is missing a `packages` object".into()))?;
        if packages.is_empty() {
            return Err(HeraldError::Config(
                "configuration must list at least one package".into(),
            ));
        }

        let config = Self::deserialize(value)
            .map_err(|err| HeraldError::Config(format!("invalid configuration: {err}")))?;
        for (path, settings) in &config.packages {
            let Some(forced) = settings.release_as.as_deref().map(str::trim) else {
                continue;
            };
            if !forced.is_empty() {
                Version::parse(forced).map_err(|err| {
                    HeraldError::Config(format!("invalid release-as '{forced}' for {path}: {err}"))
                })?;
            }
        }
        Ok(config)
    }

    pub fn pending_label(&self) -> &str {
        self.label.as_deref().unwrap_or(DEFAULT_PENDING_LABEL)
    }

    pub fn released_label(&self) -> &str {
        self.release_label.as_deref().unwrap_or(DEFAULT_RELEASED_LABEL)
    }

    /// Resolve every package entry against the repository defaults.
    pub fn package_configs(&self) -> Vec<PackageConfig> {
        self.packages
            .iter()
            .map(|(path, settings)| PackageConfig::resolve(path, &settings.or(&self.defaults)))
            .collect()
    }
}

/// Fully resolved release settings for one package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageConfig {
    pub path: String,
    pub release_type: String,
    pub package_name: Option<String>,
    pub component: Option<String>,
    pub include_component_in_tag: bool,
    pub release_as: Option<String>,
    pub bump_minor_pre_major: bool,
    pub bump_patch_for_minor_pre_major: bool,
    pub changelog_sections: Option<Vec<ChangelogSection>>,
    pub changelog_path: String,
    pub draft: bool,
}

impl PackageConfig {
    fn resolve(path: &str, settings: &PackageSettings) -> Self {
        Self {
            path: normalize_path(path),
            release_type: settings
                .release_type
                .clone()
                .unwrap_or_else(|| DEFAULT_RELEASE_TYPE.to_string()),
            package_name: settings.package_name.clone(),
            component: settings.component.clone(),
            include_component_in_tag: settings.include_component_in_tag.unwrap_or(true),
            release_as: settings.release_as.clone().filter(|v| !v.trim().is_empty()),
            bump_minor_pre_major: settings.bump_minor_pre_major.unwrap_or(false),
            bump_patch_for_minor_pre_major: settings.bump_patch_for_minor_pre_major.unwrap_or(false),
            changelog_sections: settings.changelog_sections.clone(),
            changelog_path: settings
                .changelog_path
                .clone()
                .unwrap_or_else(|| "CHANGELOG.md".to_string()),
            draft: settings.draft.unwrap_or(false),
        }
    }

    /// A configuration with defaults for every field, mostly useful in tests.
    pub fn new(path: &str, release_type: &str) -> Self {
        let settings = PackageSettings {
            release_type: Some(release_type.to_string()),
            ..PackageSettings::default()
        };
        Self::resolve(path, &settings)
    }

    pub fn is_root(&self) -> bool {
        self.path == ROOT_PACKAGE_PATH
    }

    /// Repository-relative path of a file inside this package.
    pub fn file_path(&self, file: &str) -> String {
        if self.is_root() {
            file.to_string()
        } else {
            format!("{}/{}", self.path, file)
        }
    }

    /// Last path segment, used when nothing better names the package.
    pub fn directory_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// Strip leading `./` and trailing slashes so paths compare as plain prefixes.
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim().trim_end_matches('/');
    let trimmed = trimmed.strip_prefix("./").unwrap_or(trimmed);
    if trimmed.is_empty() {
        ROOT_PACKAGE_PATH.to_string()
    } else {
        trimmed.to_string()
    }
}
