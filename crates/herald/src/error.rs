use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("GitHub credentials not available: set --repo/GITHUB_REPOSITORY and --token/GITHUB_TOKEN")]
    MissingCredentials,
    #[error("release configuration is invalid, see the errors above")]
    InvalidConfiguration,
    #[error("{failed} release(s) of #{pull_request} failed")]
    IncompleteRelease { pull_request: u64, failed: usize },
    #[error("GitHub error: {0}")]
    GitHub(#[from] herald_github::GitHubError),
    #[error("Herald error: {0}")]
    Herald(#[from] herald_core::HeraldError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
