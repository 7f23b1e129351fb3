//! Post-processing stages applied to the release pull request contents.

use crate::config::PackageConfig;
use crate::errors::Result;
use crate::host::CodeHost;
use crate::types::{PackageWithPrData, VersionsMap};
use crate::workspace::NodeWorkspace;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::debug;

/// Plugins that can be enabled in the configuration document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PluginKind {
    /// Cascade version bumps through local npm dependencies.
    NodeWorkspace,
}

/// One step of the pipeline. A stage owns the state it is given and hands
/// back the updated state.
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    fn apply(
        &self,
        versions: VersionsMap,
        packages: Vec<PackageWithPrData>,
    ) -> Result<(VersionsMap, Vec<PackageWithPrData>)>;
}

/// Ordered list of stages.
#[derive(Default)]
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, stage: Box<dyn Stage>) {
        self.stages.push(stage);
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Run every stage in order, feeding each the previous stage's output.
    pub fn run(
        &self,
        versions: VersionsMap,
        packages: Vec<PackageWithPrData>,
    ) -> Result<(VersionsMap, Vec<PackageWithPrData>)> {
        self.stages
            .iter()
            .try_fold((versions, packages), |(versions, packages), stage| {
                debug!("running plugin {}", stage.name());
                stage.apply(versions, packages)
            })
    }
}

/// Instantiate the configured plugins, reading whatever repository state
/// they need at `reference`.
pub async fn build_pipeline(
    host: &dyn CodeHost,
    kinds: &[PluginKind],
    packages: &[PackageConfig],
    reference: &str,
    date: NaiveDate,
) -> Result<Pipeline> {
    let mut pipeline = Pipeline::new();
    for kind in kinds {
        match kind {
            PluginKind::NodeWorkspace => {
                let stage = NodeWorkspace::load(host, packages, reference, date).await?;
                pipeline.push(Box::new(stage));
            }
        }
    }
    Ok(pipeline)
}
