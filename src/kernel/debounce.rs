use tokio::time::{Duration, Instant};
use tracing::debug;

use super::event::{AnalysisIntent, DocumentId, DocumentSnapshot, Trigger};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// The one cancellable unit in the system.
#[derive(Debug, Clone)]
struct PendingTimer {
    document_id: DocumentId,
    deadline: Instant,
}

/// Coalesces background edits of the focused document into one deferred intent.
///
/// The scheduler does not sleep itself. It exposes the pending `deadline()` and
/// the Reactor calls `fire_due` once that instant passes, so the timer stays an
/// owned value that tests can drive with plain `Instant`s.
#[derive(Debug)]
pub struct DebounceScheduler {
    delay: Duration,
    focused: Option<DocumentSnapshot>,
    pending: Option<PendingTimer>,
}

impl DebounceScheduler {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            focused: None,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn focused(&self) -> Option<&DocumentSnapshot> {
        self.focused.as_ref()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.deadline)
    }

    /// Cancel-and-rearm. Returns false when the edit belongs to a document
    /// that is not focused (those never arm a timer). `TriggerSource` drops
    /// such edits before they are sent; this check is the one the loop relies on.
    pub fn on_background_edit(&mut self, snapshot: DocumentSnapshot, now: Instant) -> bool {
        match &self.focused {
            Some(focused) if focused.id == snapshot.id => {}
            _ => {
                debug!("Ignoring edit for unfocused document {}", snapshot.id);
                return false;
            }
        }

        self.pending = Some(PendingTimer {
            document_id: snapshot.id.clone(),
            deadline: now + self.delay,
        });
        // Latest text wins at fire time, not the text seen when armed
        self.focused = Some(snapshot);
        true
    }

    /// Focus changes bypass the timer and supersede whatever was pending.
    pub fn on_focus_changed(&mut self, snapshot: DocumentSnapshot) -> AnalysisIntent {
        if self.cancel() {
            debug!("Pending background analysis superseded by focus change");
        }
        self.focused = Some(snapshot.clone());
        AnalysisIntent::from_snapshot(snapshot, Trigger::Background)
    }

    /// Returns `None` when there is no focused document to analyze.
    pub fn on_manual_trigger(&mut self) -> Option<AnalysisIntent> {
        if self.cancel() {
            debug!("Pending background analysis superseded by manual trigger");
        }
        self.focused
            .clone()
            .map(|snapshot| AnalysisIntent::from_snapshot(snapshot, Trigger::Manual))
    }

    pub fn on_focus_lost(&mut self) {
        self.focused = None;
    }

    /// Drops the pending timer, if any. Returns whether one was armed.
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    /// Emits the deferred intent once the deadline has passed. A fire whose
    /// document is no longer focused is suppressed.
    pub fn fire_due(&mut self, now: Instant) -> Option<AnalysisIntent> {
        let due = matches!(&self.pending, Some(p) if p.deadline <= now);
        if !due {
            return None;
        }
        let timer = self.pending.take()?;

        match &self.focused {
            Some(focused) if focused.id == timer.document_id => Some(AnalysisIntent::from_snapshot(
                focused.clone(),
                Trigger::Background,
            )),
            _ => {
                debug!("Suppressed debounce fire for {}: editor no longer focused", timer.document_id);
                None
            }
        }
    }

    /// True when `fire_due(now)` would consume the timer without emitting.
    pub fn would_suppress(&self, now: Instant) -> bool {
        match &self.pending {
            Some(p) if p.deadline <= now => !matches!(&self.focused, Some(f) if f.id == p.document_id),
            _ => false,
        }
    }
}

impl Default for DebounceScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}
