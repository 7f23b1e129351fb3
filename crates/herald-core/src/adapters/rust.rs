use crate::config::PackageConfig;
use crate::errors::{HeraldError, Result};
use crate::host::CodeHost;
use crate::releaser::Releaser;
use crate::types::FileUpdate;
use async_trait::async_trait;
use semver::Version;
use toml_edit::{DocumentMut, Item, Value};
use tracing::warn;

const CARGO_MANIFEST: &str = "Cargo.toml";

/// Releaser for Cargo crates.
#[derive(Debug, Clone)]
pub struct RustReleaser {
    config: PackageConfig,
}

impl RustReleaser {
    pub fn new(config: PackageConfig) -> Self {
        Self { config }
    }

    fn manifest_path(&self) -> String {
        self.config.file_path(CARGO_MANIFEST)
    }
}

/// Set `[package].version` in a Cargo manifest, keeping the rest of the document intact.
pub fn update_cargo_version(manifest_path: &str, input: &str, new_version: &str) -> Result<String> {
    let mut doc: DocumentMut = input.parse().map_err(|err| {
        HeraldError::InvalidData(format!("failed to parse manifest {manifest_path}: {err}"))
    })?;

    let package_table = doc
        .as_table_mut()
        .get_mut("package")
        .and_then(Item::as_table_mut)
        .ok_or_else(|| {
            HeraldError::InvalidData(format!(
                "manifest {manifest_path} is missing a [package] section"
            ))
        })?;

    match package_table.get("version") {
        Some(item) if item.as_str().is_none() => {
            return Err(HeraldError::InvalidData(format!(
                "manifest {manifest_path} does not declare a literal package version"
            )));
        }
        Some(item) if item.as_str() == Some(new_version) => return Ok(input.to_string()),
        _ => {}
    }

    package_table.insert("version", Item::Value(Value::from(new_version)));
    Ok(doc.to_string())
}

fn package_name_from_manifest(input: &str) -> Option<String> {
    let doc: DocumentMut = input.parse().ok()?;
    doc.get("package")?
        .get("name")?
        .as_str()
        .map(str::to_string)
}

#[async_trait]
impl Releaser for RustReleaser {
    fn config(&self) -> &PackageConfig {
        &self.config
    }

    fn default_initial_version(&self) -> Version {
        Version::new(0, 1, 0)
    }

    async fn package_name(&self, host: &dyn CodeHost, reference: &str) -> String {
        if let Some(name) = &self.config.package_name {
            return name.clone();
        }
        let path = self.manifest_path();
        match host.file_contents(&path, reference).await {
            Ok(content) => {
                if let Some(name) = package_name_from_manifest(&content) {
                    return name;
                }
                warn!("no package name in {}", path);
            }
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
        let updated = update_cargo_version(&path, &input, &version.to_string())?;
        Ok(vec![FileUpdate::new(path, updated)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeHost;

    const MANIFEST: &str = r#"[package]
name = "engine" # the core
version = "0.3.1"
edition = "2021"

[dependencies]
serde = "1"
"#;

    #[test]
    fn updates_the_package_version_in_place() {
        let out = update_cargo_version("Cargo.toml", MANIFEST, "0.4.0").unwrap();
        assert!(out.contains("version = \"0.4.0\""));
        assert!(out.contains("name = \"engine\" # the core"));
        assert!(out.contains("[dependencies]\nserde = \"1\""));
    }

    #[test]
    fn unchanged_version_returns_the_input() {
        let out = update_cargo_version("Cargo.toml", MANIFEST, "0.3.1").unwrap();
        assert_eq!(out, MANIFEST);
    }

    #[test]
    fn rejects_manifests_without_a_package() {
        let err = update_cargo_version("Cargo.toml", "[workspace]\nmembers = []\n", "1.0.0").unwrap_err();
        assert!(err.to_string().contains("missing a [package] section"));
    }

    #[test]
    fn rejects_inherited_versions() {
        let input = "[package]\nname = \"x\"\nversion.workspace = true\n";
        let err = update_cargo_version("Cargo.toml", input, "1.0.0").unwrap_err();
        assert!(err.to_string().contains("literal package version"));
    }

    #[tokio::test]
    async fn reads_the_crate_name() {
        let host = FakeHost::new("main").with_file("main", "crates/engine/Cargo.toml", MANIFEST);
        let releaser = RustReleaser::new(PackageConfig::new("crates/engine", "rust"));
        assert_eq!(releaser.package_name(&host, "main").await, "engine");

        let updates = releaser
            .version_updates(&host, "main", &Version::new(0, 4, 0))
            .await
            .unwrap();
        assert_eq!(updates[0].path, "crates/engine/Cargo.toml");
        assert!(updates[0].content.contains("version = \"0.4.0\""));
    }

    #[tokio::test]
    async fn falls_back_to_the_directory_name() {
        let host = FakeHost::new("main");
        let releaser = RustReleaser::new(PackageConfig::new("crates/engine", "rust"));
        assert_eq!(releaser.package_name(&host, "main").await, "engine");
    }
}
