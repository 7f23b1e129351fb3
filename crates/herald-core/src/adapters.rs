/// Ecosystem-specific releasers (plain version file, npm, Cargo).
pub mod node;
pub mod rust;
pub mod simple;

pub use node::{DependencyRewrite, NodeReleaser, update_package_json};
pub use rust::{RustReleaser, update_cargo_version};
pub use simple::SimpleReleaser;

use crate::errors::Result;
use crate::host::CodeHost;

/// Read a file that may legitimately be absent at `reference`.
pub(crate) async fn read_optional(
    host: &dyn CodeHost,
    path: &str,
    reference: &str,
) -> Result<Option<String>> {
    match host.file_contents(path, reference).await {
        Ok(content) => Ok(Some(content)),
        Err(err) if err.is_not_found() => Ok(None),
        Err(err) => Err(err.into()),
    }
}
