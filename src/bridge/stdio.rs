//! JSON-lines bridge: host events arrive one per line on stdin, panel and
//! notice traffic leaves one per line on stdout.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::kernel::notice::{Notice, Notifier};
use crate::panel::{PanelHooks, PanelHost, PanelId, PanelMessage, PanelSpec, PanelSurface, ViewSlot};
use crate::trigger::{TriggerError, TriggerSource};

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("malformed host message: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum InboundMessage {
    Focus { document: String, language: String, text: String },
    Edit { document: String, language: String, text: String },
    Blur,
    Analyze,
    PanelClosed { panel: PanelId },
    PanelVisibility { panel: PanelId, visible: bool },
    PanelMessage { panel: PanelId, payload: serde_json::Value },
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OutboundMessage {
    CreatePanel { panel: PanelId, spec: PanelSpec },
    PostMessage { panel: PanelId, message: PanelMessage },
    Reveal { panel: PanelId, slot: ViewSlot },
    DisposePanel { panel: PanelId },
    Notice(Notice),
}

pub type Outbox = mpsc::UnboundedSender<OutboundMessage>;

pub fn parse_inbound(line: &str) -> Result<InboundMessage, BridgeError> {
    Ok(serde_json::from_str(line)?)
}

struct PanelEntry {
    hooks: PanelHooks,
    visible: Arc<AtomicBool>,
}

/// Live panels, shared between the panel host (writer side) and the inbound
/// pump, which routes host callbacks to the right hooks.
#[derive(Clone, Default)]
pub struct PanelRegistry {
    inner: Arc<Mutex<HashMap<PanelId, PanelEntry>>>,
}

impl PanelRegistry {
    fn with_entries<T>(&self, f: impl FnOnce(&mut HashMap<PanelId, PanelEntry>) -> T) -> T {
        let mut guard = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }

    fn insert(&self, hooks: PanelHooks) -> Arc<AtomicBool> {
        let visible = Arc::new(AtomicBool::new(true));
        let entry = PanelEntry { hooks, visible: Arc::clone(&visible) };
        self.with_entries(|entries| entries.insert(entry.hooks.id(), entry));
        visible
    }

    fn remove(&self, id: PanelId) -> Option<PanelHooks> {
        self.with_entries(|entries| entries.remove(&id)).map(|e| e.hooks)
    }

    pub fn len(&self) -> usize {
        self.with_entries(|entries| entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Host closed the panel.
    pub fn closed(&self, id: PanelId) {
        match self.remove(id) {
            Some(hooks) => hooks.disposed(),
            None => debug!("Close for unknown panel {}", id),
        }
    }

    pub fn set_visible(&self, id: PanelId, visible: bool) {
        self.with_entries(|entries| match entries.get(&id) {
            Some(entry) => entry.visible.store(visible, Ordering::Relaxed),
            None => debug!("Visibility change for unknown panel {}", id),
        });
    }

    pub fn message(&self, id: PanelId, payload: serde_json::Value) {
        self.with_entries(|entries| match entries.get(&id) {
            Some(entry) => entry.hooks.received(payload),
            None => debug!("Message from unknown panel {}", id),
        });
    }
}

pub struct StdioPanelHost {
    out: Outbox,
    registry: PanelRegistry,
}

impl StdioPanelHost {
    pub fn new(out: Outbox, registry: PanelRegistry) -> Self {
        Self { out, registry }
    }
}

impl PanelHost for StdioPanelHost {
    fn create_panel(&self, id: PanelId, spec: &PanelSpec, hooks: PanelHooks) -> Box<dyn PanelSurface> {
        let visible = self.registry.insert(hooks);
        emit(&self.out, OutboundMessage::CreatePanel { panel: id, spec: spec.clone() });
        Box::new(StdioPanel {
            id,
            out: self.out.clone(),
            visible,
            registry: self.registry.clone(),
        })
    }
}

struct StdioPanel {
    id: PanelId,
    out: Outbox,
    visible: Arc<AtomicBool>,
    registry: PanelRegistry,
}

impl PanelSurface for StdioPanel {
    fn post_message(&self, message: PanelMessage) {
        emit(&self.out, OutboundMessage::PostMessage { panel: self.id, message });
    }

    fn is_visible(&self) -> bool {
        self.visible.load(Ordering::Relaxed)
    }

    fn reveal(&self, slot: ViewSlot) {
        self.visible.store(true, Ordering::Relaxed);
        emit(&self.out, OutboundMessage::Reveal { panel: self.id, slot });
    }

    fn dispose(&self) {
        self.registry.remove(self.id);
        emit(&self.out, OutboundMessage::DisposePanel { panel: self.id });
    }
}

pub struct StdioNotifier {
    out: Outbox,
}

impl StdioNotifier {
    pub fn new(out: Outbox) -> Self {
        Self { out }
    }
}

impl Notifier for StdioNotifier {
    fn notify(&self, notice: Notice) {
        emit(&self.out, OutboundMessage::Notice(notice));
    }
}

fn emit(out: &Outbox, message: OutboundMessage) {
    if out.send(message).is_err() {
        warn!("Outbound writer closed; message dropped");
    }
}

/// Reads host lines until EOF or a `shutdown` message, then asks the loop to stop.
pub async fn pump_inbound<R>(reader: R, mut source: TriggerSource, registry: PanelRegistry) -> Result<(), TriggerError>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!("Host input failed: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let message = match parse_inbound(&line) {
            Ok(message) => message,
            Err(e) => {
                warn!("Skipping line: {}", e);
                continue;
            }
        };

        match message {
            InboundMessage::Focus { document, language, text } => {
                source.on_focus_changed(document.as_str(), &language, &text).await?
            }
            InboundMessage::Edit { document, language, text } => {
                source.on_background_edit(document.as_str(), &language, &text).await?;
            }
            InboundMessage::Blur => source.on_focus_lost().await?,
            InboundMessage::Analyze => source.on_manual_trigger().await?,
            InboundMessage::PanelClosed { panel } => registry.closed(panel),
            InboundMessage::PanelVisibility { panel, visible } => registry.set_visible(panel, visible),
            InboundMessage::PanelMessage { panel, payload } => registry.message(panel, payload),
            InboundMessage::Shutdown => return source.shutdown().await,
        }
    }

    debug!("Host input closed");
    source.shutdown().await
}

/// Serializes outbound messages until every sender is gone.
pub async fn drain_outbound<W>(mut rx: mpsc::UnboundedReceiver<OutboundMessage>, mut writer: W) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(message) = rx.recv().await {
        let mut line = serde_json::to_string(&message)?;
        line.push('\n');
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;
    }
    Ok(())
}
