//! Error types for context file generation

use serde::Serialize;
use thiserror::Error;

use crate::analysis::{RepositoryError, RepositoryErrorKind};
use crate::errors::{AnalysisFailure, ErrorKind};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Repository(RepositoryError),

    #[error("Generation failed: {0}")]
    Generic(AnalysisFailure),

    #[error("Packaging error: {0}")]
    Packaging(String),
}

pub type GenerationResult<T> = Result<T, GenerationError>;

/// Failure body handed to the UI, serialized as JSON
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorPayload {
    pub success: bool,
    pub error: String,
    pub error_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint_url: Option<String>,
}

impl GenerationError {
    /// Stable identifier of the failure category
    pub fn error_type(&self) -> &'static str {
        match self {
            GenerationError::InvalidInput(_) => "invalid_input",
            GenerationError::Repository(_) => "repository_not_found",
            GenerationError::Generic(failure) if is_upstream(&failure.kind) => "upstream_unavailable",
            GenerationError::Generic(_) => "generation_failed",
            GenerationError::Packaging(_) => "packaging_error",
        }
    }

    /// HTTP status an API surface would answer with
    pub fn status_code(&self) -> u16 {
        match self {
            GenerationError::InvalidInput(_) => 400,
            GenerationError::Repository(_) => 404,
            GenerationError::Generic(failure) if is_upstream(&failure.kind) => 502,
            GenerationError::Generic(_) | GenerationError::Packaging(_) => 500,
        }
    }

    pub fn to_payload(&self) -> ErrorPayload {
        let mut payload = ErrorPayload {
            success: false,
            error: String::new(),
            error_type: self.error_type(),
            details: None,
            repo_type: None,
            hint_url: None,
        };

        match self {
            GenerationError::InvalidInput(message) => {
                payload.error = message.clone();
            }
            GenerationError::Repository(error) => {
                payload.error = error.message.clone();
                payload.repo_type = Some(error.kind.as_str());
                payload.hint_url = Some(error.hint_url.clone());
            }
            GenerationError::Generic(failure) => {
                payload.error = match failure.kind {
                    ErrorKind::Timeout => "The analysis service timed out. Please try again.".to_string(),
                    _ if is_upstream(&failure.kind) => {
                        "The analysis service is currently unavailable. Please try again later.".to_string()
                    }
                    _ => "Failed to generate context files.".to_string(),
                };
                payload.details = Some(failure.to_string());
                payload.hint_url = failure.hint_url.clone();
            }
            GenerationError::Packaging(detail) => {
                payload.error = "Failed to package the generated files.".to_string();
                payload.details = Some(detail.clone());
            }
        }

        payload
    }

    /// Kind of repository error, when this is one
    pub fn repository_kind(&self) -> Option<RepositoryErrorKind> {
        match self {
            GenerationError::Repository(error) => Some(error.kind),
            _ => None,
        }
    }
}

fn is_upstream(kind: &ErrorKind) -> bool {
    match kind {
        ErrorKind::RemoteError(status) => *status >= 500,
        kind => kind.is_transport(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_repository_payload() {
        let error = GenerationError::Repository(RepositoryError {
            kind: RepositoryErrorKind::Private,
            message: "This repository requires a DeepWiki account to access.".to_string(),
            hint_url: "https://deepwiki.com/octocat/Secret".to_string(),
        });

        assert_eq!(error.status_code(), 404);
        assert_eq!(
            serde_json::to_value(error.to_payload()).unwrap(),
            json!({
                "success": false,
                "error": "This repository requires a DeepWiki account to access.",
                "error_type": "repository_not_found",
                "repo_type": "private",
                "hint_url": "https://deepwiki.com/octocat/Secret"
            })
        );
    }

    #[test]
    fn test_invalid_input_payload_omits_optional_fields() {
        let error = GenerationError::InvalidInput("Repository URL is required".to_string());
        let value = serde_json::to_value(error.to_payload()).unwrap();

        assert_eq!(error.status_code(), 400);
        assert_eq!(value["error_type"], "invalid_input");
        assert!(value.get("details").is_none());
        assert!(value.get("repo_type").is_none());
    }

    #[test]
    fn test_generic_failures_split_by_origin() {
        let timeout = GenerationError::Generic(AnalysisFailure::new(ErrorKind::Timeout, "timed out"));
        assert_eq!(timeout.error_type(), "upstream_unavailable");
        assert_eq!(timeout.status_code(), 502);
        assert!(timeout.to_payload().error.contains("timed out"));

        let bad_gateway = GenerationError::Generic(AnalysisFailure::new(ErrorKind::RemoteError(503), "down"));
        assert_eq!(bad_gateway.status_code(), 502);

        let parse = GenerationError::Generic(AnalysisFailure::new(ErrorKind::ParseError, "garbage"));
        assert_eq!(parse.error_type(), "generation_failed");
        assert_eq!(parse.status_code(), 500);
        assert_eq!(
            parse.to_payload().details.as_deref(),
            Some("could not parse the analysis response: garbage")
        );
    }

    #[test]
    fn test_packaging_is_internal() {
        let error = GenerationError::Packaging("duplicate filename".to_string());
        assert_eq!(error.status_code(), 500);
        assert_eq!(error.error_type(), "packaging_error");
        assert_eq!(error.repository_kind(), None);
    }
}
