use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::kernel::language::SupportedLanguage;
use crate::panel::PanelId;
use crate::services::analysis::{AnalysisError, AnalysisResult};

/// Host-assigned identity of a source document (usually its URI).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// What the host tells us about a document at one instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSnapshot {
    pub id: DocumentId,
    pub language_tag: String,
    pub text: String,
}

impl DocumentSnapshot {
    pub fn new(id: impl Into<DocumentId>, language_tag: &str, text: &str) -> Self {
        Self {
            id: id.into(),
            language_tag: language_tag.to_string(),
            text: text.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Trigger {
    /// Explicit user command. May create the panel and may raise notices.
    Manual,
    /// Typing or focus changes. Never creates the panel.
    Background,
}

/// A decision to analyze one document's current text. Consumed once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisIntent {
    pub document_id: DocumentId,
    pub language_tag: String,
    pub source_text: String,
    pub trigger: Trigger,
}

impl AnalysisIntent {
    pub fn from_snapshot(snapshot: DocumentSnapshot, trigger: Trigger) -> Self {
        Self {
            document_id: snapshot.id,
            language_tag: snapshot.language_tag,
            source_text: snapshot.text,
            trigger,
        }
    }
}

/// Editing-surface notifications, as produced by the `TriggerSource`.
#[derive(Debug, Clone)]
pub enum HostEvent {
    ManualTrigger,
    BackgroundEdit(DocumentSnapshot),
    FocusChanged(DocumentSnapshot),
    /// Focused editor closed or no editor is active anymore
    FocusLost,
    Shutdown,
}

/// Signals raised by a live panel through its hooks.
#[derive(Debug, Clone)]
pub enum PanelEvent {
    Disposed(PanelId),
    Message(PanelId, serde_json::Value),
}

/// Bookkeeping for one Dispatching instance.
#[derive(Debug, Clone)]
pub struct DispatchTicket {
    /// Process-wide, strictly increasing
    pub sequence: u64,
    pub document_id: DocumentId,
    pub language: SupportedLanguage,
    pub trigger: Trigger,
    pub dispatched_at: Instant,
}

#[derive(Debug)]
pub struct DispatchOutcome {
    pub ticket: DispatchTicket,
    pub result: Result<AnalysisResult, AnalysisError>,
}

/// Internal events: things that come back into the loop from tasks it spawned
/// or from panel callbacks.
#[derive(Debug)]
pub enum Event {
    Panel(PanelEvent),
    DispatchCompleted(DispatchOutcome),
}
