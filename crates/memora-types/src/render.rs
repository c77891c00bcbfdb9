//! Prompt rendering results.

use serde::{Deserialize, Serialize};

/// A non-fatal diagnostic produced while rendering prompts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderWarning {
    /// Dotted path of the variable (or template) the warning concerns.
    pub path: String,
    pub message: String,
}

impl RenderWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// The two rendered prompts plus any diagnostics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenderResult {
    pub system: String,
    pub user: String,
    #[serde(default)]
    pub warnings: Vec<RenderWarning>,
}

impl RenderResult {
    /// Whether any warning concerns a path containing `fragment`.
    pub fn has_warning_for(&self, fragment: &str) -> bool {
        self.warnings.iter().any(|w| w.path.contains(fragment))
    }
}
