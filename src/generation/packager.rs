//! Packaging of generated content into per-target files

use std::{
    collections::HashSet,
    io::{Cursor, Write},
};
use tracing::debug;
use zip::{write::FileOptions, CompressionMethod, ZipWriter};

use crate::analysis::RepositoryId;
use crate::generation::errors::{GenerationError, GenerationResult};
use crate::generation::targets::{TargetRegistry, TargetSpec};

pub const FOOTER_SEPARATOR: &str = "\n---\n";
pub const FOOTER_TEXT: &str =
    "Generated using [Sidekick Code](https://github.com/saharmor/sidekick-code-web), your coding agent sidekick.\n";

pub const ARCHIVE_SUFFIX: &str = "context-files.zip";

pub const MARKDOWN_MIME: &str = "text/markdown";
pub const ZIP_MIME: &str = "application/zip";

/// Per-target adjustment of the shared content. Every target gets the same document for now.
pub fn customize(content: &str, _target: &TargetSpec) -> String {
    content.to_string()
}

/// Append the attribution footer exactly once
pub fn with_footer(content: &str) -> String {
    format!("{}{}{}", content, FOOTER_SEPARATOR, FOOTER_TEXT)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedArtifact {
    pub target_id: &'static str,
    pub filename: &'static str,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackagedOutput {
    Single(GeneratedArtifact),
    Archive {
        archive_name: String,
        entries: Vec<GeneratedArtifact>,
        bytes: Vec<u8>,
    },
}

/// What the UI receives for download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadPayload {
    pub filename: String,
    pub content_bytes: Vec<u8>,
    pub mime: &'static str,
}

impl PackagedOutput {
    /// Filenames of the generated documents, in request order
    pub fn filenames(&self) -> Vec<&'static str> {
        match self {
            PackagedOutput::Single(artifact) => vec![artifact.filename],
            PackagedOutput::Archive { entries, .. } => entries.iter().map(|e| e.filename).collect(),
        }
    }

    pub fn into_download(self) -> DownloadPayload {
        match self {
            PackagedOutput::Single(artifact) => DownloadPayload {
                filename: artifact.filename.to_string(),
                content_bytes: artifact.content,
                mime: MARKDOWN_MIME,
            },
            PackagedOutput::Archive { archive_name, bytes, .. } => DownloadPayload {
                filename: archive_name,
                content_bytes: bytes,
                mime: ZIP_MIME,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct OutputPackager {
    registry: TargetRegistry,
    archive_name: String,
}

impl OutputPackager {
    pub fn new(registry: TargetRegistry) -> Self {
        Self {
            registry,
            archive_name: ARCHIVE_SUFFIX.to_string(),
        }
    }

    /// Packager naming its archive after `repository`
    pub fn for_repository(registry: TargetRegistry, repository: &RepositoryId) -> Self {
        Self {
            registry,
            archive_name: format!("{}-{}", repository.slug(), ARCHIVE_SUFFIX),
        }
    }

    pub fn archive_name(&self) -> &str {
        &self.archive_name
    }

    pub fn package(&self, content: &str, target_ids: &[&str]) -> GenerationResult<PackagedOutput> {
        let artifacts = self.build_artifacts(content, target_ids)?;

        match <[GeneratedArtifact; 1]>::try_from(artifacts) {
            Ok([artifact]) => {
                debug!("Packaged single file {}", artifact.filename);
                Ok(PackagedOutput::Single(artifact))
            }
            Err(entries) => {
                let bytes = write_archive(&entries)?;
                debug!(
                    "Packaged {} files into {} ({} bytes)",
                    entries.len(),
                    self.archive_name,
                    bytes.len()
                );
                Ok(PackagedOutput::Archive {
                    archive_name: self.archive_name.clone(),
                    entries,
                    bytes,
                })
            }
        }
    }

    fn build_artifacts(&self, content: &str, target_ids: &[&str]) -> GenerationResult<Vec<GeneratedArtifact>> {
        if target_ids.is_empty() {
            return Err(GenerationError::Packaging("no targets to package".to_string()));
        }

        let mut seen = HashSet::new();
        let mut artifacts = Vec::with_capacity(target_ids.len());

        for id in target_ids {
            let target = self
                .registry
                .get(id)
                .ok_or_else(|| GenerationError::Packaging(format!("unknown target '{}'", id)))?;

            if !seen.insert(target.filename) {
                return Err(GenerationError::Packaging(format!(
                    "filename '{}' requested twice",
                    target.filename
                )));
            }

            artifacts.push(GeneratedArtifact {
                target_id: target.id,
                filename: target.filename,
                content: with_footer(&customize(content, target)).into_bytes(),
            });
        }

        Ok(artifacts)
    }
}

fn write_archive(entries: &[GeneratedArtifact]) -> GenerationResult<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in entries {
        writer
            .start_file(entry.filename, options)
            .map_err(archive_error)?;
        writer.write_all(&entry.content).map_err(archive_error)?;
    }

    let cursor = writer.finish().map_err(archive_error)?;
    Ok(cursor.into_inner())
}

fn archive_error(e: impl std::fmt::Display) -> GenerationError {
    GenerationError::Packaging(format!("failed to write archive: {}", e))
}
