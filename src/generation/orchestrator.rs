//! Generation orchestrator
//!
//! Validates a request, runs the universal analysis prompt once on the shared
//! session and fans the answer out to every requested target.

use std::{fmt, sync::Arc, time::Duration};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::analysis::{Analysis, AnalysisResult, ErrorClassifier, RepositoryId, RepositoryQueryClient};
use crate::config::Config;
use crate::errors::{AnalysisFailure, ErrorKind};
use crate::generation::errors::{GenerationError, GenerationResult};
use crate::generation::packager::{OutputPackager, PackagedOutput};
use crate::generation::targets::TargetRegistry;
use crate::mcp::{HttpTransport, SessionManager, Transport, TransportError};
use crate::utils::text::string;

/// Question sent for every generation; the answer is shared by all targets
pub const UNIVERSAL_PROMPT: &str = r#"Please analyze this GitHub repository and write a comprehensive markdown context file for coding agents.

Cover the following sections:

# Project Overview
- What the project does, its main goals and use cases, and who it is for

# Architecture & Structure
- High-level architecture, key directories, main components and how data flows between them

# Development Setup
- Prerequisites, installation steps, environment configuration and running the project locally

# Code Organization
- Coding conventions, file naming, import/export patterns and component structure

# Key Features & Implementation
- Main features, important business logic, API endpoints and database schema where applicable

# Testing Strategy
- Test frameworks, test layout and how to run the tests

# Build & Deployment
- Build scripts, deployment configuration and CI/CD pipelines if present

# Git Workflow
- Branching strategy, commit message conventions and release process

# Common Patterns & Best Practices
- Recurring code patterns, error handling, logging and performance considerations

# Dependencies & Tools
- Key dependencies, development tooling and package management

# Security Considerations
- Authentication, authorization and data validation

# Troubleshooting & FAQ
- Common issues, debugging approaches and optimization tips

Please provide specific, actionable information that helps a coding agent work effectively with this codebase.
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationStage {
    Validating,
    Analyzing,
    Classifying,
    Packaging,
    Done,
    Failed,
}

impl fmt::Display for GenerationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GenerationStage::Validating => "validating",
            GenerationStage::Analyzing => "analyzing",
            GenerationStage::Classifying => "classifying",
            GenerationStage::Packaging => "packaging",
            GenerationStage::Done => "done",
            GenerationStage::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// Result of a successful generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub repository: RepositoryId,
    pub output: PackagedOutput,
    pub view_search_url: Option<String>,
}

impl Generation {
    pub fn files_generated(&self) -> Vec<&'static str> {
        self.output.filenames()
    }
}

pub struct GenerationOrchestrator {
    sessions: Arc<SessionManager>,
    client: RepositoryQueryClient,
    classifier: ErrorClassifier,
    registry: TargetRegistry,
    query_permits: Semaphore,
    request_budget: Duration,
}

impl GenerationOrchestrator {
    pub fn new(config: &Config, transport: Arc<dyn Transport>) -> Self {
        let sessions = Arc::new(SessionManager::new(transport.clone(), config));
        let client = RepositoryQueryClient::new(sessions.clone(), transport, config);

        Self {
            sessions,
            client,
            classifier: ErrorClassifier::new(&config.hint_base_url),
            registry: TargetRegistry::builtin(),
            query_permits: Semaphore::new(config.max_concurrent_queries.max(1)),
            request_budget: config.request_budget(),
        }
    }

    /// Orchestrator talking to the configured endpoint over HTTP
    pub fn from_config(config: &Config) -> Result<Self, TransportError> {
        let transport = HttpTransport::new(&config.endpoint)?;
        Ok(Self::new(config, Arc::new(transport)))
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Generate context files for `repository_url`, one per target id
    pub async fn generate(&self, repository_url: &str, target_ids: &[&str]) -> GenerationResult<Generation> {
        let started = std::time::Instant::now();

        let result = match tokio::time::timeout(self.request_budget, self.run(repository_url, target_ids)).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Generation exceeded its budget of {:?}", self.request_budget);
                Err(GenerationError::Generic(AnalysisFailure::new(
                    ErrorKind::Timeout,
                    format!("timed out after {:?}", self.request_budget),
                )))
            }
        };

        match &result {
            Ok(generation) => info!(
                "Generated {} file(s) for {} in {:?}",
                generation.files_generated().len(),
                generation.repository,
                started.elapsed()
            ),
            Err(e) => {
                enter(GenerationStage::Failed);
                warn!("Generation for '{}' failed: {}", repository_url, e);
            }
        }

        result
    }

    /// Ask an arbitrary question about a repository, or a general one
    pub async fn ask(&self, repository: Option<&str>, question: &str) -> GenerationResult<Analysis> {
        if question.trim().is_empty() {
            return Err(GenerationError::InvalidInput("Question is required".to_string()));
        }

        let query = self.query(repository, question);
        match tokio::time::timeout(self.request_budget, query).await {
            Ok(Ok(analysis)) => Ok(analysis),
            Ok(Err(failure)) => Err(self.classify(failure, repository.unwrap_or_default())),
            Err(_) => Err(GenerationError::Generic(AnalysisFailure::new(
                ErrorKind::Timeout,
                format!("timed out after {:?}", self.request_budget),
            ))),
        }
    }

    async fn run(&self, repository_url: &str, target_ids: &[&str]) -> GenerationResult<Generation> {
        enter(GenerationStage::Validating);
        let (repository, targets) = self.validate(repository_url, target_ids)?;

        enter(GenerationStage::Analyzing);
        let analysis = match self.query(Some(&repository.to_string()), UNIVERSAL_PROMPT).await {
            Ok(analysis) => analysis,
            Err(failure) => {
                enter(GenerationStage::Classifying);
                return Err(self.classify(failure, repository_url));
            }
        };

        enter(GenerationStage::Packaging);
        let output = OutputPackager::for_repository(self.registry.clone(), &repository)
            .package(&analysis.content, &targets)?;

        enter(GenerationStage::Done);
        Ok(Generation {
            repository,
            output,
            view_search_url: analysis.view_search_url,
        })
    }

    /// Normalized repository and deduplicated target ids in order of first appearance
    fn validate(&self, repository_url: &str, target_ids: &[&str]) -> GenerationResult<(RepositoryId, Vec<&'static str>)> {
        if repository_url.trim().is_empty() {
            return Err(GenerationError::InvalidInput("Repository URL is required".to_string()));
        }
        if target_ids.is_empty() {
            return Err(GenerationError::InvalidInput(
                "At least one target must be selected".to_string(),
            ));
        }

        let mut targets: Vec<&'static str> = Vec::with_capacity(target_ids.len());
        for id in target_ids {
            let target = self
                .registry
                .get(id.trim())
                .ok_or_else(|| GenerationError::InvalidInput(format!("Unknown target: {}", id)))?;
            if !targets.contains(&target.id) {
                targets.push(target.id);
            }
        }

        let repository = RepositoryId::parse(repository_url).ok_or_else(|| {
            GenerationError::InvalidInput(format!(
                "Invalid GitHub repository URL: {}",
                string::truncate(repository_url.trim(), 200)
            ))
        })?;

        debug!("Validated request for {} with targets {:?}", repository, targets);
        Ok((repository, targets))
    }

    /// One query on the shared session, bounded by the query limiter
    async fn query(&self, repository: Option<&str>, question: &str) -> AnalysisResult {
        self.sessions.ensure_initialized().await?;

        let _permit = self
            .query_permits
            .acquire()
            .await
            .map_err(|_| AnalysisFailure::new(ErrorKind::NetworkError, "query limiter is closed"))?;

        let Some(token) = self.client.current_token() else {
            return Err(AnalysisFailure::not_initialized());
        };

        let result = self.client.analyze_with_token(&token, repository, question).await;
        if let Err(failure) = &result {
            if invalidates_session(failure) {
                self.sessions.reset_if(&token);
            }
        }
        result
    }

    fn classify(&self, failure: AnalysisFailure, repository_hint: &str) -> GenerationError {
        match self.classifier.classify(&failure, repository_hint) {
            Some(error) => {
                info!("Repository '{}' is {}", repository_hint, error.kind.as_str());
                GenerationError::Repository(error)
            }
            None => GenerationError::Generic(failure),
        }
    }
}

fn enter(stage: GenerationStage) {
    debug!("Generation stage: {}", stage);
}

/// Failures after which the current session token must not be reused
fn invalidates_session(failure: &AnalysisFailure) -> bool {
    match failure.kind {
        ErrorKind::NotInitialized | ErrorKind::RemoteError(404) => true,
        ErrorKind::RemoteError(400) => string::contains_ignore_case(&failure.detail, "session"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::RepositoryErrorKind;
    use crate::generation::packager::FOOTER_TEXT;
    use crate::mcp::testing::{handshake_ok, sse_message, tool_text_ok, ScriptedTransport};
    use crate::mcp::RawResponse;
    use serde_json::json;
    use std::io::{Cursor, Read};

    fn orchestrator(transport: Arc<ScriptedTransport>) -> GenerationOrchestrator {
        GenerationOrchestrator::new(&Config::default(), transport)
    }

    fn tool_error(text: &str) -> RawResponse {
        RawResponse::new(
            200,
            sse_message(&json!({
                "jsonrpc": "2.0",
                "id": 2,
                "result": { "content": [ { "type": "text", "text": text } ], "isError": true }
            })),
        )
    }

    #[tokio::test]
    async fn test_single_target_generation() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(handshake_ok("session-1")),
            Ok(tool_text_ok("X")),
        ]));
        let orchestrator = orchestrator(transport.clone());

        let generation = orchestrator
            .generate("https://github.com/octocat/Hello-World", &["claude"])
            .await
            .unwrap();

        assert_eq!(generation.repository.to_string(), "octocat/Hello-World");
        assert_eq!(generation.files_generated(), vec!["claude.md"]);

        let download = generation.output.into_download();
        assert_eq!(download.filename, "claude.md");
        assert_eq!(
            String::from_utf8(download.content_bytes).unwrap(),
            format!("X\n---\n{}", FOOTER_TEXT)
        );

        let calls = transport.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].method, "initialize");
        assert_eq!(calls[1].params["arguments"]["repoName"], "octocat/Hello-World");
        assert_eq!(calls[1].params["arguments"]["question"], UNIVERSAL_PROMPT);
    }

    #[tokio::test]
    async fn test_multiple_targets_share_one_query() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(handshake_ok("session-1")),
            Ok(tool_text_ok("## Project Overview\nShared")),
        ]));
        let orchestrator = orchestrator(transport.clone());

        let generation = orchestrator
            .generate("octocat/Hello-World", &["claude", "cursor", "claude"])
            .await
            .unwrap();

        assert_eq!(transport.call_count(), 2);
        assert_eq!(generation.files_generated(), vec!["claude.md", "project_general.md"]);

        let download = generation.output.into_download();
        assert_eq!(download.filename, "octocat-Hello-World-context-files.zip");

        let mut archive = zip::ZipArchive::new(Cursor::new(download.content_bytes)).unwrap();
        let mut text = String::new();
        archive
            .by_name("project_general.md")
            .unwrap()
            .read_to_string(&mut text)
            .unwrap();
        assert_eq!(text, format!("## Project Overview\nShared\n---\n{}", FOOTER_TEXT));
    }

    #[tokio::test]
    async fn test_private_repository() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(handshake_ok("session-1")),
            Ok(tool_error("This repository requires a DeepWiki account to access.")),
        ]));
        let orchestrator = orchestrator(transport);

        let error = orchestrator
            .generate("https://github.com/octocat/Secret", &["claude"])
            .await
            .unwrap_err();

        let GenerationError::Repository(repository_error) = &error else {
            panic!("expected a repository error, got {:?}", error);
        };
        assert_eq!(repository_error.kind, RepositoryErrorKind::Private);
        assert_eq!(repository_error.hint_url, "https://deepwiki.com/octocat/Secret");
        assert_eq!(error.to_payload().repo_type, Some("private"));
    }

    #[tokio::test]
    async fn test_not_indexed_repository() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(handshake_ok("session-1")),
            Ok(tool_text_ok(
                "Error processing question: Repository not found. Visit https://deepwiki.com/octocat/Fresh to index it.",
            )),
        ]));
        let orchestrator = orchestrator(transport);

        let error = orchestrator
            .generate("octocat/Fresh", &["cursor"])
            .await
            .unwrap_err();

        assert_eq!(error.repository_kind(), Some(RepositoryErrorKind::NotIndexed));
        assert_eq!(error.to_payload().hint_url.as_deref(), Some("https://deepwiki.com/octocat/Fresh"));
        assert_eq!(error.status_code(), 404);
    }

    #[tokio::test]
    async fn test_invalid_input_makes_no_network_call() {
        let transport = Arc::new(ScriptedTransport::new(vec![]));
        let orchestrator = orchestrator(transport.clone());

        let cases: [(&str, &[&str]); 4] = [
            ("", &["claude"]),
            ("octocat/Hello-World", &[]),
            ("octocat/Hello-World", &["emacs"]),
            ("https://gitlab.com/octocat", &["claude"]),
        ];

        for (url, targets) in cases {
            let error = orchestrator.generate(url, targets).await.unwrap_err();
            assert!(
                matches!(error, GenerationError::InvalidInput(_)),
                "{url:?} {targets:?} gave {error:?}"
            );
        }
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_handshake_timeout_is_generic() {
        let transport = Arc::new(ScriptedTransport::new(vec![Err(TransportError::Timeout(
            Duration::from_secs(30),
        ))]));
        let orchestrator = orchestrator(transport.clone());

        let error = orchestrator
            .generate("octocat/Hello-World", &["claude"])
            .await
            .unwrap_err();

        assert!(matches!(&error, GenerationError::Generic(f) if f.kind == ErrorKind::Timeout));
        assert_eq!(error.error_type(), "upstream_unavailable");
        assert!(!orchestrator.sessions().ensure_ready());
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_stale_session_is_reset() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(handshake_ok("stale")),
            Ok(RawResponse::new(404, "Session not found")),
            Ok(handshake_ok("fresh")),
            Ok(tool_text_ok("Y")),
        ]));
        let orchestrator = orchestrator(transport.clone());

        let error = orchestrator
            .generate("octocat/Hello-World", &["claude"])
            .await
            .unwrap_err();
        assert!(matches!(&error, GenerationError::Generic(f) if f.kind == ErrorKind::RemoteError(404)));
        assert!(!orchestrator.sessions().ensure_ready());

        orchestrator
            .generate("octocat/Hello-World", &["claude"])
            .await
            .unwrap();

        let calls = transport.calls();
        assert_eq!(calls.len(), 4);
        assert_eq!(calls[2].method, "initialize");
        assert_eq!(calls[3].session_id.as_deref(), Some("fresh"));
    }

    #[tokio::test]
    async fn test_request_budget_bounds_the_call() {
        let transport = Arc::new(
            ScriptedTransport::new(vec![Ok(handshake_ok("slow")), Ok(tool_text_ok("late"))])
                .with_delay(Duration::from_millis(700)),
        );
        let config = Config {
            request_budget_secs: 1,
            ..Config::default()
        };
        let orchestrator = GenerationOrchestrator::new(&config, transport);

        let error = orchestrator
            .generate("octocat/Hello-World", &["claude"])
            .await
            .unwrap_err();

        assert!(matches!(&error, GenerationError::Generic(f) if f.kind == ErrorKind::Timeout));
    }

    #[tokio::test]
    async fn test_concurrent_generations_share_one_handshake() {
        let transport = Arc::new(
            ScriptedTransport::new(vec![
                Ok(handshake_ok("shared")),
                Ok(tool_text_ok("A")),
                Ok(tool_text_ok("B")),
            ])
            .with_delay(Duration::from_millis(20)),
        );
        let orchestrator = orchestrator(transport.clone());

        let (first, second) = futures::join!(
            orchestrator.generate("octocat/Hello-World", &["claude"]),
            orchestrator.generate("octocat/Spoon-Knife", &["gemini"]),
        );
        assert!(first.is_ok());
        assert!(second.is_ok());

        let calls = transport.calls();
        assert_eq!(calls.iter().filter(|c| c.method == "initialize").count(), 1);
        assert!(calls[1..].iter().all(|c| c.session_id.as_deref() == Some("shared")));
    }

    #[tokio::test]
    async fn test_general_question() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(handshake_ok("session-1")),
            Ok(tool_text_ok("MCP is a protocol.")),
        ]));
        let orchestrator = orchestrator(transport.clone());

        let analysis = orchestrator.ask(None, "What is MCP?").await.unwrap();

        assert_eq!(analysis.content, "MCP is a protocol.");
        assert_eq!(transport.calls()[1].params["arguments"]["repoName"], "general");
        assert!(matches!(
            orchestrator.ask(None, "   ").await,
            Err(GenerationError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_session_invalidation_rules() {
        assert!(invalidates_session(&AnalysisFailure::new(ErrorKind::RemoteError(404), "")));
        assert!(invalidates_session(&AnalysisFailure::new(
            ErrorKind::RemoteError(400),
            "Bad Request: No valid session ID provided"
        )));
        assert!(!invalidates_session(&AnalysisFailure::new(ErrorKind::RemoteError(400), "bad arguments")));
        assert!(!invalidates_session(&AnalysisFailure::new(ErrorKind::Timeout, "")));
    }
}
