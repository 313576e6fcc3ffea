use std::fmt;

use serde::{Deserialize, Serialize};

/// Languages the analysis backend understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupportedLanguage {
    Java,
    JavaScript,
    Python,
}

impl SupportedLanguage {
    /// Maps a host language tag onto a backend language.
    /// TypeScript is analyzed with the JavaScript grammar.
    pub fn from_host_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "java" => Some(Self::Java),
            "javascript" | "typescript" => Some(Self::JavaScript),
            "python" => Some(Self::Python),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Java => "java",
            Self::JavaScript => "javascript",
            Self::Python => "python",
        }
    }
}

impl fmt::Display for SupportedLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
