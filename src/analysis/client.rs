//! Repository query client

use regex::Regex;
use std::{
    sync::{Arc, OnceLock},
    time::Duration,
};
use tracing::{debug, info, warn};

use crate::analysis::parser::ResponseParser;
use crate::analysis::repository::normalize_repository;
use crate::config::Config;
use crate::errors::{AnalysisFailure, ErrorKind};
use crate::mcp::{JsonRpcRequest, RawResponse, SessionManager, Transport};
use crate::utils::text::{markdown, string};

/// Wire value of `repoName` for repository-less questions
pub const GENERAL_REPOSITORY: &str = "general";

/// Longest failure detail kept from a response body
pub const DETAIL_LIMIT: usize = 2000;

/// Texts the service sends instead of an answer
const VENDOR_ERROR_PREFIXES: &[&str] = &[
    "DeepWiki error:",
    "Error processing",
    "Error parsing",
    "Failed to parse",
    "No message event",
];

/// Not-found notice that invites indexing the repository
const NOT_FOUND_MARKER: &str = "Repository not found. Visit";

const CONTENT_START_MARKER: &str = "## Project Overview";
const CONTENT_END_MARKER: &str = "Wiki pages you might want to explore:";

fn view_search_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"View this search on DeepWiki:[ \t]*([^\n]+)").expect("view search pattern is valid")
    })
}

/// A successful analysis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Analysis {
    /// Cleaned markdown, ready to be packaged
    pub content: String,
    /// Text as returned by the service
    pub raw: String,
    /// Link for follow-up questions on the service
    pub view_search_url: Option<String>,
}

pub type AnalysisResult = Result<Analysis, AnalysisFailure>;

/// One question about one repository (or none, for a general question)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub repository_identifier: Option<String>,
    pub question: String,
}

impl AnalysisRequest {
    pub fn new(repository: Option<&str>, question: &str) -> Self {
        Self {
            repository_identifier: normalize_repository(repository),
            question: question.to_string(),
        }
    }

    pub fn repo_name(&self) -> &str {
        self.repository_identifier
            .as_deref()
            .unwrap_or(GENERAL_REPOSITORY)
    }

    fn to_rpc(&self) -> JsonRpcRequest {
        JsonRpcRequest::ask_question(self.repo_name(), &self.question)
    }
}

/// Issues `ask_question` calls on the shared session. One network attempt per call.
pub struct RepositoryQueryClient {
    sessions: Arc<SessionManager>,
    transport: Arc<dyn Transport>,
    query_timeout: Duration,
}

impl RepositoryQueryClient {
    pub fn new(sessions: Arc<SessionManager>, transport: Arc<dyn Transport>, config: &Config) -> Self {
        Self {
            sessions,
            transport,
            query_timeout: config.query_timeout(),
        }
    }

    pub async fn analyze(&self, repository: Option<&str>, question: &str) -> AnalysisResult {
        let Some(token) = self.current_token() else {
            return Err(AnalysisFailure::not_initialized());
        };
        self.analyze_with_token(&token, repository, question).await
    }

    /// Token of the ready session, `None` when not initialized
    pub fn current_token(&self) -> Option<String> {
        let token = self.sessions.with_token(str::to_string);
        if token.is_none() {
            warn!("Analysis requested before the session was initialized");
        }
        token
    }

    /// Query with an explicit session token, so the caller knows which one a failure belongs to
    pub async fn analyze_with_token(&self, token: &str, repository: Option<&str>, question: &str) -> AnalysisResult {
        let request = AnalysisRequest::new(repository, question);
        info!(
            "Querying analysis service - Repository: {}, Question: {}",
            request.repo_name(),
            string::truncate(&string::normalize_whitespace(question), 100)
        );

        let response = self
            .transport
            .post(&request.to_rpc(), Some(token), self.query_timeout)
            .await
            .map_err(|e| {
                warn!("Analysis query failed: {}", e);
                AnalysisFailure::from(e)
            })?;

        Self::interpret(response)
    }

    /// Turn a raw response into an analysis result; no I/O
    pub fn interpret(response: RawResponse) -> AnalysisResult {
        if !response.is_success() {
            warn!(
                "Analysis service error {}: {}",
                response.status,
                string::truncate(&response.body, 200)
            );
            return Err(AnalysisFailure::new(
                ErrorKind::RemoteError(response.status),
                string::truncate(&response.body, DETAIL_LIMIT),
            ));
        }

        if response.body.trim().is_empty() {
            return Err(AnalysisFailure::new(
                ErrorKind::EmptyResponse,
                "Empty response from the analysis service",
            ));
        }

        if is_html_error_page(&response.body) {
            warn!("Analysis service returned an HTML error page");
            return Err(AnalysisFailure::new(
                ErrorKind::RemoteError(502),
                "Upstream returned an HTML error page",
            ));
        }

        let message = ResponseParser::parse_message(&response.body)
            .map_err(|diagnostic| AnalysisFailure::new(ErrorKind::ParseError, diagnostic.to_string()))?;

        if message.is_error || is_vendor_error(&message.text) {
            debug!("Service answered with an error text");
            return Err(AnalysisFailure::new(
                ErrorKind::ParseError,
                string::truncate(&message.text, DETAIL_LIMIT),
            ));
        }

        let content = clean_content(&message.text);
        if content.is_empty() {
            return Err(AnalysisFailure::new(
                ErrorKind::EmptyResponse,
                "Response contained no document content",
            ));
        }

        Ok(Analysis {
            content,
            view_search_url: extract_view_search_url(&message.text),
            raw: message.text,
        })
    }
}

fn is_vendor_error(text: &str) -> bool {
    let trimmed = text.trim_start();
    VENDOR_ERROR_PREFIXES
        .iter()
        .any(|prefix| trimmed.starts_with(prefix))
        || trimmed.contains(NOT_FOUND_MARKER)
}

fn is_html_error_page(body: &str) -> bool {
    let lower = body.trim_start().to_lowercase();
    lower.starts_with("<!doctype html")
        || lower.starts_with("<html")
        || lower.contains("cf-error-code")
        || lower.contains("cf-error-details")
}

/// Keep the document between the overview heading and the wiki-pages trailer
pub fn clean_content(text: &str) -> String {
    let kept = markdown::keep_from(text, CONTENT_START_MARKER);
    markdown::cut_at(kept, CONTENT_END_MARKER).trim().to_string()
}

pub fn extract_view_search_url(text: &str) -> Option<String> {
    view_search_pattern()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|url| url.as_str().trim().to_string())
        .filter(|url| !url.is_empty())
}
