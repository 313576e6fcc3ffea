use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::debounce::DebounceScheduler;
use super::event::{Event, HostEvent};
use super::notice::{Notice, Notifier};
use super::orchestrator::Orchestrator;
use super::telemetry::{TelemetryEvent, TelemetryRecorder};
use crate::config::WatchConfig;
use crate::panel::{PanelHost, PanelManager, PanelState};
use crate::services::analysis::AnalysisService;
use crate::trigger::TriggerSource;

/// The single event loop. Owns the debounce timer, the orchestrator and
/// through it the panel slot; nothing else mutates them.
pub struct Reactor {
    host_rx: mpsc::Receiver<HostEvent>,
    internal_rx: mpsc::UnboundedReceiver<Event>,
    scheduler: DebounceScheduler,
    orchestrator: Orchestrator,
    shutdown: CancellationToken,
}

impl Reactor {
    /// Builds the loop and the `TriggerSource` that feeds it.
    pub fn new(
        config: &WatchConfig,
        service: Arc<dyn AnalysisService>,
        panel_host: Box<dyn PanelHost>,
        notifier: Arc<dyn Notifier>,
    ) -> (Self, TriggerSource) {
        let (host_tx, host_rx) = mpsc::channel(config.event_buffer.max(1));
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();

        let panels = PanelManager::new(panel_host, config.panel_spec(), internal_tx.clone());
        let orchestrator = Orchestrator::new(
            service,
            panels,
            notifier,
            internal_tx,
            config.request_timeout(),
            config.reconcile,
        );

        let reactor = Self {
            host_rx,
            internal_rx,
            scheduler: DebounceScheduler::new(config.debounce()),
            orchestrator,
            shutdown: CancellationToken::new(),
        };
        (reactor, TriggerSource::new(host_tx))
    }

    /// Cancelling the token stops `run` at the next loop turn.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn panel_state(&self) -> PanelState {
        self.orchestrator.panel_state()
    }

    pub fn scheduler(&self) -> &DebounceScheduler {
        &self.scheduler
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn telemetry(&self) -> &TelemetryRecorder {
        self.orchestrator.telemetry()
    }

    /// Applies one host event. Returns false when the loop should stop.
    pub fn handle_host_event(&mut self, event: HostEvent, now: Instant) -> bool {
        match event {
            HostEvent::BackgroundEdit(snapshot) => {
                self.scheduler.on_background_edit(snapshot, now);
            }
            HostEvent::FocusChanged(snapshot) => {
                let intent = self.scheduler.on_focus_changed(snapshot);
                self.orchestrator.submit(intent);
            }
            HostEvent::ManualTrigger => match self.scheduler.on_manual_trigger() {
                Some(intent) => {
                    self.orchestrator.submit(intent);
                }
                None => self.orchestrator.notify(Notice::no_active_editor()),
            },
            HostEvent::FocusLost => self.scheduler.on_focus_lost(),
            HostEvent::Shutdown => return false,
        }
        true
    }

    pub fn handle_internal_event(&mut self, event: Event) {
        match event {
            Event::DispatchCompleted(outcome) => self.orchestrator.complete(outcome),
            Event::Panel(panel_event) => self.orchestrator.on_panel_event(panel_event),
        }
    }

    /// Fires the debounce timer if it is due.
    pub fn poll_timer(&mut self, now: Instant) {
        if self.scheduler.would_suppress(now) {
            self.orchestrator.record(TelemetryEvent::DebounceSuppressed);
        }
        if let Some(intent) = self.scheduler.fire_due(now) {
            self.orchestrator.submit(intent);
        }
    }

    /// Async driver loop. Returns after shutdown, with the panel disposed.
    pub async fn run(&mut self) {
        info!("Complexity watch loop started (debounce {:?})", self.scheduler.delay());

        loop {
            let deadline = self.scheduler.deadline();

            tokio::select! {
                biased;

                _ = self.shutdown.cancelled() => break,

                Some(event) = self.internal_rx.recv() => self.handle_internal_event(event),

                maybe_event = self.host_rx.recv() => match maybe_event {
                    Some(event) => {
                        if !self.handle_host_event(event, Instant::now()) {
                            break;
                        }
                    }
                    None => {
                        debug!("All trigger sources dropped");
                        break;
                    }
                },

                _ = wait_until(deadline) => self.poll_timer(Instant::now()),
            }
        }

        self.scheduler.cancel();
        self.orchestrator.shutdown();
        info!("Complexity watch loop stopped");
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
