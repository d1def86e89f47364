//! Supported coding assistants and their canonical context filenames

use serde::Serialize;

/// One output target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TargetSpec {
    pub id: &'static str,
    pub display_name: &'static str,
    pub filename: &'static str,
}

pub const BUILTIN_TARGETS: &[TargetSpec] = &[
    TargetSpec { id: "claude", display_name: "Claude Code", filename: "claude.md" },
    TargetSpec { id: "cursor", display_name: "Cursor", filename: "project_general.md" },
    TargetSpec { id: "windsurf", display_name: "Windsurf", filename: "windsurf.md" },
    TargetSpec { id: "gemini", display_name: "Gemini", filename: "gemini.md" },
    TargetSpec { id: "cline", display_name: "Cline", filename: "cline.md" },
    TargetSpec { id: "bolt", display_name: "Bolt", filename: "bolt.md" },
    TargetSpec { id: "vscode", display_name: "VS Code Copilot", filename: "vscode.md" },
    TargetSpec { id: "intellij", display_name: "IntelliJ IDEA", filename: "intellij.md" },
    TargetSpec { id: "lovable", display_name: "Lovable", filename: "lovable.md" },
];

/// Lookup table from target id to its spec
#[derive(Debug, Clone)]
pub struct TargetRegistry {
    targets: Vec<TargetSpec>,
}

impl Default for TargetRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl TargetRegistry {
    pub fn builtin() -> Self {
        Self::from_specs(BUILTIN_TARGETS.to_vec())
    }

    /// Registry over an explicit table; filename uniqueness is checked at packaging time
    pub fn from_specs(targets: Vec<TargetSpec>) -> Self {
        Self { targets }
    }

    pub fn get(&self, id: &str) -> Option<&TargetSpec> {
        self.targets.iter().find(|target| target.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn ids(&self) -> Vec<&'static str> {
        self.targets.iter().map(|target| target.id).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TargetSpec> {
        self.targets.iter()
    }
}
