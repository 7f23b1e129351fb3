use herald_core::HostError;
use http::StatusCode;
use serde_json::Value;

pub type Result<T> = std::result::Result<T, GitHubError>;

#[derive(thiserror::Error, Debug)]
pub enum GitHubError {
    #[error("invalid repository '{0}', expected <owner>/<name>")]
    InvalidRepository(String),
    #[error("Octocrab error: {0}")]
    Octo(#[from] octocrab::Error),
    #[error("failed to decode {path}: {message}")]
    Decode { path: String, message: String },
    #[error("internal: {0}")]
    Internal(String),
}

impl From<GitHubError> for HostError {
    fn from(err: GitHubError) -> Self {
        match err {
            GitHubError::Octo(err) => host_error(err, "request"),
            other => HostError::Api(other.to_string()),
        }
    }
}

/// Map an API failure onto the host boundary; `what` names the resource for not-found errors.
pub(crate) fn host_error(err: octocrab::Error, what: &str) -> HostError {
    match &err {
        octocrab::Error::GitHub { source, .. } if source.status_code == StatusCode::NOT_FOUND => {
            HostError::NotFound(what.to_string())
        }
        _ => HostError::Api(err.to_string()),
    }
}

/// Map a release creation failure, recognizing duplicate tags.
pub(crate) fn release_error(err: octocrab::Error, tag: &str) -> HostError {
    if let octocrab::Error::GitHub { source, .. } = &err
        && is_tag_conflict(source.status_code, source.errors.as_deref())
    {
        return HostError::TagAlreadyExists(tag.to_string());
    }
    host_error(err, tag)
}

pub(crate) fn is_not_found(err: &octocrab::Error) -> bool {
    matches!(err, octocrab::Error::GitHub { source, .. } if source.status_code == StatusCode::NOT_FOUND)
}

pub(crate) fn is_unprocessable(err: &octocrab::Error) -> bool {
    matches!(
        err,
        octocrab::Error::GitHub { source, .. } if source.status_code == StatusCode::UNPROCESSABLE_ENTITY
    )
}

/// GitHub answers 422 with an `already_exists` error on `tag_name` when the tag is taken.
pub(crate) fn is_tag_conflict(status: StatusCode, errors: Option<&[Value]>) -> bool {
    if status != StatusCode::UNPROCESSABLE_ENTITY {
        return false;
    }
    errors.unwrap_or_default().iter().any(|error| {
        error.get("code").and_then(Value::as_str) == Some("already_exists")
            && error.get("field").and_then(Value::as_str) == Some("tag_name")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tag_conflict_requires_422_and_tag_field() {
        let errors = vec![json!({ "resource": "Release", "code": "already_exists", "field": "tag_name" })];
        assert!(is_tag_conflict(StatusCode::UNPROCESSABLE_ENTITY, Some(&errors)));
        assert!(!is_tag_conflict(StatusCode::BAD_REQUEST, Some(&errors)));

        let other = vec![json!({ "code": "invalid", "field": "tag_name" })];
        assert!(!is_tag_conflict(StatusCode::UNPROCESSABLE_ENTITY, Some(&other)));
        assert!(!is_tag_conflict(StatusCode::UNPROCESSABLE_ENTITY, None));
    }

    #[test]
    fn non_api_errors_become_api_host_errors() {
        let err: HostError = GitHubError::Internal("boom".into()).into();
        assert_eq!(err, HostError::Api("internal: boom".into()));
    }
}
