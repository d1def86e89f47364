//! Repository analysis over the shared MCP session
//!
//! The query client sends one question per call, the parser decodes the
//! buffered event stream, and the classifier maps known failure texts to
//! structured repository errors.

pub mod classifier;
pub mod client;
pub mod parser;
pub mod repository;

pub use classifier::{ClassificationRule, ErrorClassifier, RepositoryError, RepositoryErrorKind};
pub use client::{Analysis, AnalysisRequest, AnalysisResult, RepositoryQueryClient};
pub use parser::{ParseDiagnostic, ParsedMessage, ResponseParser};
pub use repository::{normalize_repository, RepositoryId};
