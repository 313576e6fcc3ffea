use tokio::sync::mpsc;
use tracing::{debug, info};

use super::host::{PanelHooks, PanelHost, PanelId, PanelMessage, PanelSpec, PanelSurface};
use crate::kernel::event::{Event, Trigger};
use crate::services::analysis::AnalysisResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelState {
    Absent,
    Open,
}

/// Access token for the open panel. Carries no reference to the surface;
/// the manager stays the only owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelHandle {
    pub id: PanelId,
    /// Created by the `ensure_panel` call that returned this handle
    pub fresh: bool,
}

struct OpenPanel {
    id: PanelId,
    surface: Box<dyn PanelSurface>,
}

/// Owns the single panel slot.
///
/// Every method is synchronous: checking the slot and acting on it can never
/// be split by an `.await`, so two intents cannot both create a panel.
pub struct PanelManager {
    host: Box<dyn PanelHost>,
    spec: PanelSpec,
    events: mpsc::UnboundedSender<Event>,
    open: Option<OpenPanel>,
}

impl PanelManager {
    pub fn new(host: Box<dyn PanelHost>, spec: PanelSpec, events: mpsc::UnboundedSender<Event>) -> Self {
        Self {
            host,
            spec,
            events,
            open: None,
        }
    }

    pub fn state(&self) -> PanelState {
        if self.open.is_some() {
            PanelState::Open
        } else {
            PanelState::Absent
        }
    }

    pub fn current(&self) -> Option<PanelId> {
        self.open.as_ref().map(|p| p.id)
    }

    /// Returns the open panel, creating one only when `force_create` is set.
    pub fn ensure_panel(&mut self, force_create: bool) -> Option<PanelHandle> {
        if let Some(panel) = &self.open {
            return Some(PanelHandle { id: panel.id, fresh: false });
        }
        if !force_create {
            return None;
        }

        let id = PanelId::new();
        let hooks = PanelHooks::new(id, self.events.clone());
        let surface = self.host.create_panel(id, &self.spec, hooks);
        info!("Panel {} created ({})", id, self.spec.title);

        self.open = Some(OpenPanel { id, surface });
        Some(PanelHandle { id, fresh: true })
    }

    /// Posts the result and reveals the panel when it is new, hidden, or the
    /// user asked explicitly. Returns false if the handle no longer names the
    /// open panel.
    pub fn deliver(&self, handle: PanelHandle, result: AnalysisResult, trigger: Trigger) -> bool {
        let Some(panel) = self.open.as_ref().filter(|p| p.id == handle.id) else {
            debug!("Dropping delivery to stale panel {}", handle.id);
            return false;
        };

        panel.surface.post_message(PanelMessage::AnalysisResult(result));

        if handle.fresh || trigger == Trigger::Manual || !panel.surface.is_visible() {
            panel.surface.reveal(self.spec.slot);
        }
        true
    }

    /// Disposal hook target. Only the currently open panel resets the slot.
    pub fn on_disposed(&mut self, id: PanelId) -> bool {
        match &self.open {
            Some(panel) if panel.id == id => {
                self.open = None;
                info!("Panel {} disposed", id);
                true
            }
            _ => {
                debug!("Ignoring disposal of unknown panel {}", id);
                false
            }
        }
    }

    /// Renderer messages are logged, never acted on.
    pub fn on_message(&self, id: PanelId, payload: &serde_json::Value) {
        info!("Panel {} message: {}", id, payload);
    }

    /// Process shutdown is the only time the core closes the panel itself.
    pub fn shutdown(&mut self) {
        if let Some(panel) = self.open.take() {
            info!("Disposing panel {} on shutdown", panel.id);
            panel.surface.dispose();
        }
    }
}
