//! Classification of failed analyses into actionable repository errors
//!
//! The analysis service reports inaccessible repositories in free text. The
//! marker table below is the single place that knows its vocabulary.

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::debug;

use crate::analysis::repository::RepositoryId;
use crate::config::DEFAULT_HINT_BASE_URL;
use crate::errors::{AnalysisFailure, ErrorKind};
use crate::utils::text::string;

/// Why a repository cannot be analyzed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RepositoryErrorKind {
    Private,
    NotIndexed,
}

impl RepositoryErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepositoryErrorKind::Private => "private",
            RepositoryErrorKind::NotIndexed => "not_indexed",
        }
    }

    pub fn error_kind(&self) -> ErrorKind {
        match self {
            RepositoryErrorKind::Private => ErrorKind::RepositoryPrivate,
            RepositoryErrorKind::NotIndexed => ErrorKind::RepositoryNotIndexed,
        }
    }

    fn user_message(&self) -> &'static str {
        match self {
            RepositoryErrorKind::Private => "This repository requires a DeepWiki account to access.",
            RepositoryErrorKind::NotIndexed => {
                "This repository hasn't been indexed yet. Trigger indexing by opening the repository on DeepWiki and try again in about 10 minutes."
            }
        }
    }
}

/// Structured, user-facing repository error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct RepositoryError {
    pub kind: RepositoryErrorKind,
    pub message: String,
    pub hint_url: String,
}

/// A marker phrase and the error it indicates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassificationRule {
    pub marker: &'static str,
    pub kind: RepositoryErrorKind,
}

/// Known vocabulary, matched case-insensitively in order
pub const DEFAULT_RULES: &[ClassificationRule] = &[
    ClassificationRule {
        marker: "requires a DeepWiki account",
        kind: RepositoryErrorKind::Private,
    },
    ClassificationRule {
        marker: "private repository",
        kind: RepositoryErrorKind::Private,
    },
    ClassificationRule {
        marker: "repository is private",
        kind: RepositoryErrorKind::Private,
    },
    ClassificationRule {
        marker: "not yet indexed",
        kind: RepositoryErrorKind::NotIndexed,
    },
    ClassificationRule {
        marker: "hasn't been indexed",
        kind: RepositoryErrorKind::NotIndexed,
    },
    ClassificationRule {
        marker: "has not been indexed",
        kind: RepositoryErrorKind::NotIndexed,
    },
    ClassificationRule {
        marker: "Repository not found. Visit",
        kind: RepositoryErrorKind::NotIndexed,
    },
];

fn visit_url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"Visit (https?://[^\s]+)").expect("visit URL pattern is valid")
    })
}

#[derive(Debug, Clone)]
pub struct ErrorClassifier {
    rules: Vec<ClassificationRule>,
    hint_base_url: String,
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_HINT_BASE_URL)
    }
}

impl ErrorClassifier {
    pub fn new(hint_base_url: &str) -> Self {
        Self::with_rules(DEFAULT_RULES.to_vec(), hint_base_url)
    }

    pub fn with_rules(rules: Vec<ClassificationRule>, hint_base_url: &str) -> Self {
        Self {
            rules,
            hint_base_url: hint_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Structured error for `failure`, `None` when it should surface as a generic failure
    pub fn classify(&self, failure: &AnalysisFailure, repository_hint: &str) -> Option<RepositoryError> {
        let kind = match &failure.kind {
            ErrorKind::RepositoryPrivate => Some(RepositoryErrorKind::Private),
            ErrorKind::RepositoryNotIndexed => Some(RepositoryErrorKind::NotIndexed),
            kind if kind.is_transport() => None,
            _ => self.match_text(&failure.detail),
        }?;

        let hint_url = failure
            .hint_url
            .clone()
            .unwrap_or_else(|| self.hint_url(&failure.detail, repository_hint));

        debug!(
            "Classified failure for '{}' as {} (hint: {})",
            repository_hint,
            kind.as_str(),
            hint_url
        );

        Some(RepositoryError {
            kind,
            message: kind.user_message().to_string(),
            hint_url,
        })
    }

    /// First rule whose marker appears in `text`
    pub fn match_text(&self, text: &str) -> Option<RepositoryErrorKind> {
        self.rules
            .iter()
            .find(|rule| string::contains_ignore_case(text, rule.marker))
            .map(|rule| rule.kind)
    }

    /// Analysis page of the normalized repository, else a URL quoted by the service
    fn hint_url(&self, text: &str, repository_hint: &str) -> String {
        if let Some(repository) = RepositoryId::parse(repository_hint) {
            return repository.analysis_page_url(&self.hint_base_url);
        }

        visit_url_pattern()
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|url| {
                let url = url.as_str();
                let url = url.strip_suffix(".ping").unwrap_or(url);
                url.trim_end_matches(|c: char| c == '.' || c == ',').to_string()
            })
            .unwrap_or_else(|| self.hint_base_url.clone())
    }
}
