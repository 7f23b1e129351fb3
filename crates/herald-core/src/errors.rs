use crate::host::HostError;

/// Canonical result type for Herald code
pub type Result<T> = std::result::Result<T, HeraldError>;

/// Common error type for Herald operations
#[derive(Debug, thiserror::Error)]
pub enum HeraldError {
    #[error("Host error: {0}")]
    Host(#[from] HostError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Manifest error: {0}")]
    Manifest(String),

    #[error("Invalid version: {0}")]
    InvalidVersion(String),

    #[error("Unknown release type '{0}'")]
    UnknownReleaseType(String),

    #[error("Release error: {0}")]
    Release(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl From<semver::Error> for HeraldError {
    fn from(err: semver::Error) -> Self {
        Self::InvalidVersion(err.to_string())
    }
}
