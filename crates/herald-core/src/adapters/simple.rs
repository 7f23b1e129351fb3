use crate::config::PackageConfig;
use crate::errors::Result;
use crate::host::CodeHost;
use crate::releaser::Releaser;
use crate::types::FileUpdate;
use async_trait::async_trait;
use semver::Version;

const VERSION_FILE: &str = "version.txt";

/// Releaser for packages whose only version carrier is a `version.txt` file.
#[derive(Debug, Clone)]
pub struct SimpleReleaser {
    config: PackageConfig,
}

impl SimpleReleaser {
    pub fn new(config: PackageConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Releaser for SimpleReleaser {
    fn config(&self) -> &PackageConfig {
        &self.config
    }

    fn default_initial_version(&self) -> Version {
        Version::new(1, 0, 0)
    }

    async fn version_updates(
        &self,
        _host: &dyn CodeHost,
        _reference: &str,
        version: &Version,
    ) -> Result<Vec<FileUpdate>> {
        Ok(vec![FileUpdate::new(
            self.config.file_path(VERSION_FILE),
            format!("{version}\n"),
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeHost;

    #[tokio::test]
    async fn writes_the_version_file() {
        let releaser = SimpleReleaser::new(PackageConfig::new(".", "simple"));
        let updates = releaser
            .version_updates(&FakeHost::new("main"), "main", &Version::new(0, 9, 1))
            .await
            .unwrap();
        assert_eq!(updates, vec![FileUpdate::new("version.txt", "0.9.1\n")]);
    }

    #[tokio::test]
    async fn package_name_defaults_to_the_directory() {
        let host = FakeHost::new("main");
        let releaser = SimpleReleaser::new(PackageConfig::new("tools/cli", "simple"));
        assert_eq!(releaser.package_name(&host, "main").await, "cli");

        let mut config = PackageConfig::new("tools/cli", "simple");
        config.package_name = Some("herald-cli".into());
        config.component = Some("cli-component".into());
        let named = SimpleReleaser::new(config);
        assert_eq!(named.package_name(&host, "main").await, "herald-cli");
        assert_eq!(named.component(&host, "main").await, "cli-component");
    }
}
