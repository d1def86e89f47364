//! Context file generation: validation, analysis and packaging

pub mod errors;
pub mod orchestrator;
pub mod packager;
pub mod targets;

pub use errors::{ErrorPayload, GenerationError, GenerationResult};
pub use orchestrator::{Generation, GenerationOrchestrator, GenerationStage, UNIVERSAL_PROMPT};
pub use packager::{DownloadPayload, GeneratedArtifact, OutputPackager, PackagedOutput};
pub use targets::{TargetRegistry, TargetSpec, BUILTIN_TARGETS};
