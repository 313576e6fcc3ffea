use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::warn;
use uuid::Uuid;

use crate::kernel::event::{Event, PanelEvent};
use crate::services::analysis::AnalysisResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PanelId(pub Uuid);

impl PanelId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PanelId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PanelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where the host places the panel relative to the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewSlot {
    Active,
    /// Secondary column next to the editor
    Beside,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelSpec {
    pub view_type: String,
    pub title: String,
    pub slot: ViewSlot,
    pub enable_scripts: bool,
    pub retain_context_when_hidden: bool,
    /// Initial document the renderer boots from. Its content is the renderer's business.
    pub markup: String,
}

/// The only message shape the core ever posts to a panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum PanelMessage {
    AnalysisResult(AnalysisResult),
}

/// A live visual surface owned by the host.
pub trait PanelSurface: Send {
    /// Fire-and-forget. No acknowledgement is expected.
    fn post_message(&self, message: PanelMessage);
    fn is_visible(&self) -> bool;
    fn reveal(&self, slot: ViewSlot);
    fn dispose(&self);
}

pub trait PanelHost: Send {
    fn create_panel(&self, id: PanelId, spec: &PanelSpec, hooks: PanelHooks) -> Box<dyn PanelSurface>;
}

/// Callbacks a host invokes on behalf of one panel. They are plain channel
/// sends so hosts may call them from any thread.
#[derive(Debug, Clone)]
pub struct PanelHooks {
    id: PanelId,
    tx: mpsc::UnboundedSender<Event>,
}

impl PanelHooks {
    pub fn new(id: PanelId, tx: mpsc::UnboundedSender<Event>) -> Self {
        Self { id, tx }
    }

    pub fn id(&self) -> PanelId {
        self.id
    }

    /// The user (or host) closed the panel.
    pub fn disposed(&self) {
        if self.tx.send(Event::Panel(PanelEvent::Disposed(self.id))).is_err() {
            warn!("Panel {} disposed after the loop stopped", self.id);
        }
    }

    /// Anything the renderer sends back.
    pub fn received(&self, payload: serde_json::Value) {
        if self.tx.send(Event::Panel(PanelEvent::Message(self.id, payload))).is_err() {
            warn!("Message from panel {} dropped, loop stopped", self.id);
        }
    }
}
