use crate::errors::{HeraldError, Result};
use crate::host::CodeHost;
use crate::types::VersionsMap;
use serde_json::Value;
use tracing::{debug, warn};

/// Default location of the versions manifest.
pub const DEFAULT_MANIFEST_FILE: &str = ".herald-manifest.json";

/// Shape-check a raw versions manifest: a flat object whose values are all strings.
pub fn parse_versions(value: &Value) -> Result<VersionsMap> {
    let object = value
        .as_object()
        .ok_or_else(|| HeraldError::Manifest("versions manifest must be a JSON object".into()))?;

    let mut versions = VersionsMap::new();
    for (path, version) in object {
        let Some(version) = version.as_str() else {
            return Err(HeraldError::Manifest(format!(
                "version for '{path}' must be a string, found {version}"
            )));
        };
        versions.insert(path.clone(), version.to_string());
    }
    Ok(versions)
}

/// Serialize the manifest the way it is committed: pretty JSON with a trailing newline.
pub fn render_versions(versions: &VersionsMap) -> Result<String> {
    let mut text = serde_json::to_string_pretty(versions)?;
    text.push('\n');
    Ok(text)
}

/// Load the versions manifest at `reference`.
///
/// A manifest that is absent or malformed at that reference yields `None`;
/// callers decide whether that is fatal.
pub async fn load_versions(
    host: &dyn CodeHost,
    manifest_file: &str,
    reference: &str,
) -> Option<VersionsMap> {
    let document = match host.json_document(manifest_file, reference).await {
        Ok(document) => document,
        Err(err) if err.is_not_found() => {
            debug!("no versions manifest {} at {}", manifest_file, reference);
            return None;
        }
        Err(err) => {
            warn!("failed to read {} at {}: {}", manifest_file, reference, err);
            return None;
        }
    };

    match parse_versions(&document) {
        Ok(versions) => Some(versions),
        Err(err) => {
            warn!("ignoring {} at {}: {}", manifest_file, reference, err);
            None
        }
    }
}
