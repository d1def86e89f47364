//! Sidekick: coding-assistant context files from repository analysis
//!
//! A single MCP session with the analysis service is shared by every request.
//! The answer to one universal prompt is packaged into each assistant's
//! canonical context file, or a zip archive when several are requested.

pub mod analysis;
pub mod config;
pub mod errors;
pub mod generation;
pub mod mcp;
pub mod utils;
pub mod version;

pub use config::Config;
pub use errors::{AnalysisFailure, ErrorKind};
pub use generation::{GenerationError, GenerationOrchestrator};
