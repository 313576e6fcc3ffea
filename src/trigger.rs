use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

use crate::kernel::event::{DocumentId, DocumentSnapshot, HostEvent};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TriggerError {
    #[error("orchestration loop has stopped")]
    Closed,
}

/// Adapter between the host's editing notifications and the orchestration loop.
///
/// It only translates and filters: edits to documents other than the focused
/// one are dropped here. Timing, dispatch and the panel are the loop's concern.
#[derive(Debug)]
pub struct TriggerSource {
    tx: mpsc::Sender<HostEvent>,
    focused: Option<DocumentId>,
}

impl TriggerSource {
    pub fn new(tx: mpsc::Sender<HostEvent>) -> Self {
        Self { tx, focused: None }
    }

    pub fn focused(&self) -> Option<&DocumentId> {
        self.focused.as_ref()
    }

    /// The "analyze now" command.
    pub async fn on_manual_trigger(&self) -> Result<(), TriggerError> {
        self.send(HostEvent::ManualTrigger).await
    }

    /// Returns `Ok(false)` when the edit was ignored because the document is not focused.
    pub async fn on_background_edit(
        &self,
        document_id: impl Into<DocumentId>,
        language_tag: &str,
        text: &str,
    ) -> Result<bool, TriggerError> {
        let document_id = document_id.into();
        if self.focused.as_ref() != Some(&document_id) {
            debug!("Edit to unfocused document {} ignored", document_id);
            return Ok(false);
        }
        self.send(HostEvent::BackgroundEdit(DocumentSnapshot {
            id: document_id,
            language_tag: language_tag.to_string(),
            text: text.to_string(),
        }))
        .await?;
        Ok(true)
    }

    /// Also used for the very first activation.
    pub async fn on_focus_changed(
        &mut self,
        document_id: impl Into<DocumentId>,
        language_tag: &str,
        text: &str,
    ) -> Result<(), TriggerError> {
        let document_id = document_id.into();
        self.focused = Some(document_id.clone());
        self.send(HostEvent::FocusChanged(DocumentSnapshot {
            id: document_id,
            language_tag: language_tag.to_string(),
            text: text.to_string(),
        }))
        .await
    }

    pub async fn on_focus_lost(&mut self) -> Result<(), TriggerError> {
        self.focused = None;
        self.send(HostEvent::FocusLost).await
    }

    pub async fn shutdown(&self) -> Result<(), TriggerError> {
        self.send(HostEvent::Shutdown).await
    }

    async fn send(&self, event: HostEvent) -> Result<(), TriggerError> {
        self.tx.send(event).await.map_err(|_| TriggerError::Closed)
    }
}
