//! Contract with the remote complexity analysis service.
//!
//! The orchestrator only knows `AnalysisService::analyze`. Endpoint, method and
//! encoding live in `client`.

pub mod client;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::time::Duration;

use crate::kernel::language::SupportedLanguage;

pub use client::HttpAnalysisService;

/// Wire payload. One per dispatched intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    #[serde(rename = "code")]
    pub source_text: String,
    pub language: SupportedLanguage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSummary {
    pub total_methods: u32,
    pub total_complexity: u32,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComplexityStatus {
    Simple,
    Moderate,
    Complex,
    /// Labels this build does not know yet, kept verbatim
    #[serde(untagged)]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodComplexity {
    pub name: String,
    pub line: u32,
    pub complexity: u32,
    pub status: ComplexityStatus,
    pub nesting_depth: u32,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Opaque to the core: forwarded to the panel as-is. Only `summary` is read,
/// everything else rides along in the `extra` maps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub summary: AnalysisSummary,
    pub methods: Vec<MethodComplexity>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// Non-success status, application error payload or unreadable body
    Service,
    /// The exchange never completed
    Transport,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("{}", service_message(.status, .message))]
    Service { status: String, message: Option<String> },
    #[error("malformed analysis payload: {0}")]
    Malformed(String),
    #[error("analysis service unreachable: {0}")]
    Transport(String),
    #[error("analysis timed out after {0:?}")]
    TimedOut(Duration),
}

fn service_message(status: &str, message: &Option<String>) -> String {
    // Application message when the service gave one, transport status otherwise
    message.clone().unwrap_or_else(|| status.to_string())
}

impl AnalysisError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Service { .. } | Self::Malformed(_) => FailureKind::Service,
            Self::Transport(_) | Self::TimedOut(_) => FailureKind::Transport,
        }
    }

    /// Text for a user-facing notice.
    pub fn user_message(&self) -> String {
        format!("Complexity analysis failed: {}", self)
    }
}

#[async_trait]
pub trait AnalysisService: Send + Sync {
    async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisResult, AnalysisError>;
}
