//! Repository identifier normalization

use regex::Regex;
use serde::Serialize;
use std::{fmt, sync::OnceLock};

/// Recognized host prefix followed by the first two path segments
fn host_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?i:https?://)?(?i:www\.)?(?i:github\.com)/([^/\s?#]+)/([^/\s?#]+)")
            .expect("repository host pattern is valid")
    })
}

fn segment_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_.-]+$").expect("segment pattern is valid"))
}

/// Normalized `owner/repo` identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RepositoryId {
    pub owner: String,
    pub name: String,
}

impl RepositoryId {
    /// Parse a repository URL or `owner/repo` shorthand.
    ///
    /// With a recognized host prefix the first two path segments are taken;
    /// without one the string itself must start with `owner/repo`. A trailing
    /// `.git` is dropped.
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return None;
        }

        let (owner, name) = match host_pattern().captures(trimmed) {
            Some(caps) => (caps.get(1)?.as_str(), caps.get(2)?.as_str()),
            None => {
                let mut segments = trimmed.trim_matches('/').split('/');
                (segments.next()?, segments.next()?)
            }
        };

        let name = name.strip_suffix(".git").unwrap_or(name);

        if !segment_pattern().is_match(owner) || !segment_pattern().is_match(name) {
            return None;
        }

        Some(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    /// `owner-repo`, used in archive names
    pub fn slug(&self) -> String {
        format!("{}-{}", self.owner, self.name)
    }

    /// Page on the analysis service for this repository
    pub fn analysis_page_url(&self, base_url: &str) -> String {
        format!("{}/{}/{}", base_url.trim_end_matches('/'), self.owner, self.name)
    }
}

impl fmt::Display for RepositoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Identifier sent on the wire: the normalized form when possible, the trimmed
/// input otherwise, `None` for a general query
pub fn normalize_repository(repository: Option<&str>) -> Option<String> {
    let raw = repository?.trim();
    if raw.is_empty() {
        return None;
    }

    Some(
        RepositoryId::parse(raw)
            .map(|id| id.to_string())
            .unwrap_or_else(|| raw.to_string()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equivalent_forms_normalize_identically() {
        let inputs = [
            "octocat/Hello-World",
            "https://github.com/octocat/Hello-World",
            "http://github.com/octocat/Hello-World",
            "https://www.github.com/octocat/Hello-World",
            "https://github.com/octocat/Hello-World/",
            "https://github.com/octocat/Hello-World.git",
            "https://github.com/octocat/Hello-World/tree/main/src",
            "https://github.com/octocat/Hello-World?tab=readme",
            "github.com/octocat/Hello-World",
            "  octocat/Hello-World  ",
            "/octocat/Hello-World/",
        ];

        for input in inputs {
            let id = RepositoryId::parse(input).unwrap_or_else(|| panic!("failed to parse {input}"));
            assert_eq!(id.to_string(), "octocat/Hello-World", "input: {input}");
        }
    }

    #[test]
    fn test_rejects_non_repository_input() {
        assert!(RepositoryId::parse("").is_none());
        assert!(RepositoryId::parse("   ").is_none());
        assert!(RepositoryId::parse("octocat").is_none());
        assert!(RepositoryId::parse("https://gitlab.com/octocat/Hello-World").is_none());
        assert!(RepositoryId::parse("https://github.com/octocat").is_none());
        assert!(RepositoryId::parse("owner with spaces/repo").is_none());
    }

    #[test]
    fn test_slug_and_page_url() {
        let id = RepositoryId::parse("https://github.com/octocat/Hello-World").unwrap();
        assert_eq!(id.slug(), "octocat-Hello-World");
        assert_eq!(
            id.analysis_page_url("https://deepwiki.com/"),
            "https://deepwiki.com/octocat/Hello-World"
        );
    }

    #[test]
    fn test_wire_identifier() {
        assert_eq!(
            normalize_repository(Some("https://github.com/octocat/Hello-World")).as_deref(),
            Some("octocat/Hello-World")
        );
        assert_eq!(normalize_repository(Some("some-project")).as_deref(), Some("some-project"));
        assert_eq!(normalize_repository(Some("  ")), None);
        assert_eq!(normalize_repository(None), None);
    }
}
