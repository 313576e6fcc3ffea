use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::event::{AnalysisIntent, DispatchOutcome, DispatchTicket, DocumentId, Event, PanelEvent, Trigger};
use super::language::SupportedLanguage;
use super::notice::{should_surface_failure, Notice, Notifier};
use super::telemetry::{DiscardReason, TelemetryEvent, TelemetryRecorder};
use crate::panel::{PanelManager, PanelState};
use crate::services::analysis::{AnalysisError, AnalysisRequest, AnalysisResult, AnalysisService};

/// How a success is reconciled against results already on the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReconcilePolicy {
    /// Whatever completes last is shown, regardless of dispatch order.
    #[default]
    LastArrival,
    /// Results older than one already shown for the same document are dropped.
    LatestDispatch,
}

/// Dispatches intents to the analysis service and reconciles what comes back
/// with the panel.
///
/// Each accepted intent becomes its own Dispatching instance: a spawned task
/// that reports through the loop's internal channel. Nothing is queued or
/// locked, so several requests for one document can be outstanding at once.
pub struct Orchestrator {
    service: Arc<dyn AnalysisService>,
    panels: PanelManager,
    notifier: Arc<dyn Notifier>,
    completions: mpsc::UnboundedSender<Event>,
    timeout: Option<Duration>,
    policy: ReconcilePolicy,
    next_sequence: u64,
    in_flight: HashMap<u64, DispatchTicket>,
    // Newest sequence shown per document
    delivered: HashMap<DocumentId, u64>,
    telemetry: TelemetryRecorder,
}

impl Orchestrator {
    pub fn new(
        service: Arc<dyn AnalysisService>,
        panels: PanelManager,
        notifier: Arc<dyn Notifier>,
        completions: mpsc::UnboundedSender<Event>,
        timeout: Option<Duration>,
        policy: ReconcilePolicy,
    ) -> Self {
        Self {
            service,
            panels,
            notifier,
            completions,
            timeout,
            policy,
            next_sequence: 0,
            in_flight: HashMap::new(),
            delivered: HashMap::new(),
            telemetry: TelemetryRecorder::new(),
        }
    }

    pub fn panel_state(&self) -> PanelState {
        self.panels.state()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn in_flight_for(&self, document_id: &DocumentId) -> usize {
        self.in_flight
            .values()
            .filter(|t| &t.document_id == document_id)
            .count()
    }

    pub fn telemetry(&self) -> &TelemetryRecorder {
        &self.telemetry
    }

    pub fn record(&mut self, event: TelemetryEvent) {
        self.telemetry.record(event);
    }

    pub fn notify(&mut self, notice: Notice) {
        self.telemetry.record(TelemetryEvent::NoticeShown { level: notice.level });
        self.notifier.notify(notice);
    }

    /// Idle -> Dispatching. Returns the dispatch sequence, or `None` when the
    /// language is unsupported.
    pub fn submit(&mut self, intent: AnalysisIntent) -> Option<u64> {
        let Some(language) = SupportedLanguage::from_host_tag(&intent.language_tag) else {
            self.telemetry.record(TelemetryEvent::UnsupportedLanguage { trigger: intent.trigger });
            match intent.trigger {
                Trigger::Manual => self.notify(Notice::unsupported_language(&intent.language_tag)),
                Trigger::Background => {
                    debug!("Skipping {}: language '{}' unsupported", intent.document_id, intent.language_tag)
                }
            }
            return None;
        };

        self.next_sequence += 1;
        let sequence = self.next_sequence;
        let ticket = DispatchTicket {
            sequence,
            document_id: intent.document_id,
            language,
            trigger: intent.trigger,
            dispatched_at: Instant::now(),
        };

        let overlapping = self.in_flight_for(&ticket.document_id);
        if overlapping > 0 {
            debug!(
                "{} earlier request(s) for {} still in flight; latest arrival will win",
                overlapping, ticket.document_id
            );
        }
        info!("Dispatching #{} for {} ({}, {:?})", sequence, ticket.document_id, language, ticket.trigger);

        self.in_flight.insert(sequence, ticket.clone());
        self.telemetry.record(TelemetryEvent::Dispatched { sequence, trigger: ticket.trigger });

        let request = AnalysisRequest {
            source_text: intent.source_text,
            language,
        };
        let service = Arc::clone(&self.service);
        let tx = self.completions.clone();
        let timeout = self.timeout;

        tokio::spawn(async move {
            let result = match timeout {
                Some(limit) => tokio::time::timeout(limit, service.analyze(request))
                    .await
                    .unwrap_or(Err(AnalysisError::TimedOut(limit))),
                None => service.analyze(request).await,
            };
            // Loop gone means shutdown; the result has nowhere to go
            let _ = tx.send(Event::DispatchCompleted(DispatchOutcome { ticket, result }));
        });

        Some(sequence)
    }

    /// Dispatching -> Succeeded | Failed -> Idle.
    pub fn complete(&mut self, outcome: DispatchOutcome) {
        let DispatchOutcome { ticket, result } = outcome;
        self.in_flight.remove(&ticket.sequence);
        let latency = ticket.dispatched_at.elapsed();

        match result {
            Ok(result) => {
                self.telemetry.record(TelemetryEvent::Succeeded { sequence: ticket.sequence, latency });
                self.reconcile(ticket, result);
            }
            Err(error) => self.fail(ticket, error, latency),
        }
    }

    fn reconcile(&mut self, ticket: DispatchTicket, result: AnalysisResult) {
        let sequence = ticket.sequence;

        if self.policy == ReconcilePolicy::LatestDispatch {
            if let Some(&newest) = self.delivered.get(&ticket.document_id) {
                if newest > sequence {
                    debug!("Dropping #{}: #{} already shown for {}", sequence, newest, ticket.document_id);
                    self.telemetry.record(TelemetryEvent::Discarded { sequence, reason: DiscardReason::Stale });
                    return;
                }
            }
        }

        // Background work never conjures a panel
        let Some(handle) = self.panels.ensure_panel(ticket.trigger == Trigger::Manual) else {
            debug!("Discarding #{} for {}: no panel open", sequence, ticket.document_id);
            self.telemetry.record(TelemetryEvent::Discarded { sequence, reason: DiscardReason::NoPanel });
            return;
        };
        if handle.fresh {
            self.telemetry.record(TelemetryEvent::PanelCreated);
        }

        let summary = result.summary.clone();
        if !self.panels.deliver(handle, result, ticket.trigger) {
            return;
        }

        let newest = self.delivered.entry(ticket.document_id.clone()).or_insert(sequence);
        *newest = (*newest).max(sequence);
        self.telemetry.record(TelemetryEvent::Delivered { sequence });

        match ticket.trigger {
            Trigger::Manual => self.notify(Notice::info(format!(
                "Analyzed {} method(s), total complexity {}",
                summary.total_methods, summary.total_complexity
            ))),
            Trigger::Background => info!(
                "Panel updated from #{} ({} methods, complexity {})",
                sequence, summary.total_methods, summary.total_complexity
            ),
        }
    }

    fn fail(&mut self, ticket: DispatchTicket, error: AnalysisError, latency: Duration) {
        warn!("Analysis #{} for {} failed: {}", ticket.sequence, ticket.document_id, error);
        self.telemetry.record(TelemetryEvent::Failed {
            sequence: ticket.sequence,
            kind: error.kind(),
            latency,
        });

        if should_surface_failure(ticket.trigger, self.panels.state()) {
            self.notify(Notice::error(error.user_message()));
        } else {
            debug!("Failure notice suppressed: panel already showing earlier results");
        }
    }

    pub fn on_panel_event(&mut self, event: PanelEvent) {
        match event {
            PanelEvent::Disposed(id) => {
                if self.panels.on_disposed(id) {
                    self.telemetry.record(TelemetryEvent::PanelDisposed);
                    // A new panel starts empty, so any result is newer than what it shows
                    self.delivered.clear();
                }
            }
            PanelEvent::Message(id, payload) => self.panels.on_message(id, &payload),
        }
    }

    pub fn shutdown(&mut self) {
        if self.panels.state() == PanelState::Open {
            self.telemetry.record(TelemetryEvent::PanelDisposed);
        }
        self.panels.shutdown();
        if !self.in_flight.is_empty() {
            debug!("Abandoning {} in-flight request(s)", self.in_flight.len());
        }
    }
}
