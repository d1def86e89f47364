//! Error types shared by the session, query and classification layers

use thiserror::Error;

use crate::mcp::TransportError;

/// Failure categories of a single analysis exchange
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[error("analysis session is not initialized")]
    NotInitialized,

    #[error("request to the analysis service timed out")]
    Timeout,

    #[error("could not reach the analysis service")]
    NetworkError,

    #[error("analysis service returned status {0}")]
    RemoteError(u16),

    #[error("repository requires elevated access")]
    RepositoryPrivate,

    #[error("repository has not been indexed yet")]
    RepositoryNotIndexed,

    #[error("empty response from the analysis service")]
    EmptyResponse,

    #[error("could not parse the analysis response")]
    ParseError,

    #[error("handshake succeeded but no session token was issued")]
    NoSessionToken,
}

impl ErrorKind {
    /// Failures produced by our side of the wire rather than by the service's answer
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ErrorKind::NotInitialized
                | ErrorKind::Timeout
                | ErrorKind::NetworkError
                | ErrorKind::NoSessionToken
        )
    }
}

/// A failed analysis exchange
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {detail}")]
pub struct AnalysisFailure {
    pub kind: ErrorKind,
    pub detail: String,
    pub hint_url: Option<String>,
}

impl AnalysisFailure {
    pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
            hint_url: None,
        }
    }

    pub fn with_hint(mut self, hint_url: impl Into<String>) -> Self {
        self.hint_url = Some(hint_url.into());
        self
    }

    pub fn not_initialized() -> Self {
        Self::new(ErrorKind::NotInitialized, "analysis session is not initialized")
    }
}

impl From<TransportError> for AnalysisFailure {
    fn from(error: TransportError) -> Self {
        let kind = match &error {
            TransportError::Timeout(_) => ErrorKind::Timeout,
            TransportError::Network(_) | TransportError::Config(_) => ErrorKind::NetworkError,
        };
        Self::new(kind, error.to_string())
    }
}
