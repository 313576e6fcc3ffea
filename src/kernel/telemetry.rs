//! Content-free observability for the orchestration loop.
//!
//! Events carry sequence numbers, trigger kinds and latencies only. Source text
//! and analysis payloads never enter the buffer. Nothing in the decision path
//! reads telemetry back.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tokio::time::Duration;

use super::event::Trigger;
use super::notice::NoticeLevel;
use crate::services::analysis::FailureKind;

const MAX_EVENTS: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiscardReason {
    /// Background result with no panel open
    NoPanel,
    /// Older than a result already delivered (latest-dispatch policy only)
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TelemetryEvent {
    UnsupportedLanguage { trigger: Trigger },
    Dispatched { sequence: u64, trigger: Trigger },
    Succeeded { sequence: u64, latency: Duration },
    Failed { sequence: u64, kind: FailureKind, latency: Duration },
    Delivered { sequence: u64 },
    Discarded { sequence: u64, reason: DiscardReason },
    DebounceSuppressed,
    PanelCreated,
    PanelDisposed,
    NoticeShown { level: NoticeLevel },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub dispatched: usize,
    pub manual_dispatches: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub transport_failures: usize,
    pub delivered: usize,
    pub discarded: usize,
    pub stale_discarded: usize,
    pub unsupported: usize,
    pub suppressed_fires: usize,
    pub panels_created: usize,
    pub panels_disposed: usize,
    pub notices: usize,
    pub max_latency: Duration,
}

#[derive(Debug)]
pub struct TelemetryRecorder {
    buffer: VecDeque<TelemetryEvent>,
}

impl TelemetryRecorder {
    pub fn new() -> Self {
        Self {
            buffer: VecDeque::with_capacity(256),
        }
    }

    pub fn record(&mut self, event: TelemetryEvent) {
        if self.buffer.len() >= MAX_EVENTS {
            self.buffer.pop_front();
        }
        self.buffer.push_back(event);
    }

    pub fn events(&self) -> impl Iterator<Item = &TelemetryEvent> {
        self.buffer.iter()
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        let mut snap = TelemetrySnapshot::default();
        for event in &self.buffer {
            match event {
                TelemetryEvent::UnsupportedLanguage { .. } => snap.unsupported += 1,
                TelemetryEvent::Dispatched { trigger, .. } => {
                    snap.dispatched += 1;
                    if *trigger == Trigger::Manual {
                        snap.manual_dispatches += 1;
                    }
                }
                TelemetryEvent::Succeeded { latency, .. } => {
                    snap.succeeded += 1;
                    snap.max_latency = snap.max_latency.max(*latency);
                }
                TelemetryEvent::Failed { kind, latency, .. } => {
                    snap.failed += 1;
                    if *kind == FailureKind::Transport {
                        snap.transport_failures += 1;
                    }
                    snap.max_latency = snap.max_latency.max(*latency);
                }
                TelemetryEvent::Delivered { .. } => snap.delivered += 1,
                TelemetryEvent::Discarded { reason, .. } => {
                    snap.discarded += 1;
                    if *reason == DiscardReason::Stale {
                        snap.stale_discarded += 1;
                    }
                }
                TelemetryEvent::DebounceSuppressed => snap.suppressed_fires += 1,
                TelemetryEvent::PanelCreated => snap.panels_created += 1,
                TelemetryEvent::PanelDisposed => snap.panels_disposed += 1,
                TelemetryEvent::NoticeShown { .. } => snap.notices += 1,
            }
        }
        snap
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for TelemetryRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_counts_by_kind() {
        let mut recorder = TelemetryRecorder::new();
        recorder.record(TelemetryEvent::Dispatched { sequence: 1, trigger: Trigger::Manual });
        recorder.record(TelemetryEvent::Dispatched { sequence: 2, trigger: Trigger::Background });
        recorder.record(TelemetryEvent::Failed {
            sequence: 1,
            kind: FailureKind::Transport,
            latency: Duration::from_millis(40),
        });
        recorder.record(TelemetryEvent::Succeeded { sequence: 2, latency: Duration::from_millis(10) });
        recorder.record(TelemetryEvent::Discarded { sequence: 2, reason: DiscardReason::NoPanel });

        let snap = recorder.snapshot();
        assert_eq!(snap.dispatched, 2);
        assert_eq!(snap.manual_dispatches, 1);
        assert_eq!(snap.failed, 1);
        assert_eq!(snap.transport_failures, 1);
        assert_eq!(snap.succeeded, 1);
        assert_eq!(snap.discarded, 1);
        assert_eq!(snap.stale_discarded, 0);
        assert_eq!(snap.max_latency, Duration::from_millis(40));
    }

    #[test]
    fn buffer_is_bounded() {
        let mut recorder = TelemetryRecorder::new();
        for _ in 0..(MAX_EVENTS + 5) {
            recorder.record(TelemetryEvent::DebounceSuppressed);
        }
        assert_eq!(recorder.events().count(), MAX_EVENTS);
    }
}
