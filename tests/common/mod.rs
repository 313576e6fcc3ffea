#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use complexity_watch::kernel::notice::{Notice, Notifier};
use complexity_watch::panel::{PanelHooks, PanelHost, PanelId, PanelMessage, PanelSpec, PanelSurface, ViewSlot};
use complexity_watch::services::analysis::{
    AnalysisError, AnalysisRequest, AnalysisResult, AnalysisService, AnalysisSummary, ComplexityStatus,
    MethodComplexity,
};
use complexity_watch::{Reactor, TriggerSource, WatchConfig};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Duration;

pub fn result_with(name: &str, complexity: u32) -> AnalysisResult {
    AnalysisResult {
        summary: AnalysisSummary {
            total_methods: 1,
            total_complexity: complexity,
            extra: Default::default(),
        },
        methods: vec![MethodComplexity {
            name: name.to_string(),
            line: 1,
            complexity,
            status: if complexity <= 5 { ComplexityStatus::Simple } else { ComplexityStatus::Complex },
            nesting_depth: 0,
            extra: Default::default(),
        }],
        extra: Default::default(),
    }
}

// ---------------------------------------------------------------------------
// Analysis service
// ---------------------------------------------------------------------------

/// Answers by source text. Unscripted texts succeed immediately with `result_with("f", 1)`.
#[derive(Default)]
pub struct ScriptedService {
    script: Mutex<HashMap<String, (Duration, Result<AnalysisResult, AnalysisError>)>>,
    requests: Mutex<Vec<AnalysisRequest>>,
}

impl ScriptedService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, text: &str, delay_ms: u64, result: Result<AnalysisResult, AnalysisError>) -> Self {
        self.script
            .lock()
            .unwrap()
            .insert(text.to_string(), (Duration::from_millis(delay_ms), result));
        self
    }

    pub fn requests(&self) -> Vec<AnalysisRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnalysisService for ScriptedService {
    async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisResult, AnalysisError> {
        self.requests.lock().unwrap().push(request.clone());
        let scripted = self.script.lock().unwrap().get(&request.source_text).cloned();
        match scripted {
            Some((delay, result)) => {
                tokio::time::sleep(delay).await;
                result
            }
            None => Ok(result_with("f", 1)),
        }
    }
}

// ---------------------------------------------------------------------------
// Panel host
// ---------------------------------------------------------------------------

#[derive(Default)]
struct PanelLog {
    created: Vec<PanelId>,
    hooks: Vec<PanelHooks>,
    posts: Vec<(PanelId, PanelMessage)>,
    reveals: Vec<(PanelId, ViewSlot)>,
    disposed: Vec<PanelId>,
    visible: HashMap<PanelId, Arc<AtomicBool>>,
}

#[derive(Clone, Default)]
pub struct PanelRecorder {
    log: Arc<Mutex<PanelLog>>,
}

impl PanelRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn host(&self) -> Box<dyn PanelHost> {
        Box::new(self.clone())
    }

    pub fn created(&self) -> Vec<PanelId> {
        self.log.lock().unwrap().created.clone()
    }

    pub fn posts(&self) -> Vec<(PanelId, PanelMessage)> {
        self.log.lock().unwrap().posts.clone()
    }

    pub fn results(&self) -> Vec<AnalysisResult> {
        self.posts()
            .into_iter()
            .map(|(_, PanelMessage::AnalysisResult(result))| result)
            .collect()
    }

    pub fn reveals(&self) -> Vec<(PanelId, ViewSlot)> {
        self.log.lock().unwrap().reveals.clone()
    }

    pub fn disposed(&self) -> Vec<PanelId> {
        self.log.lock().unwrap().disposed.clone()
    }

    pub fn set_visible(&self, id: PanelId, visible: bool) {
        if let Some(flag) = self.log.lock().unwrap().visible.get(&id) {
            flag.store(visible, Ordering::SeqCst);
        }
    }

    /// Simulates the user closing the most recently created panel.
    pub fn close_latest(&self) -> PanelId {
        let hooks = self.log.lock().unwrap().hooks.last().cloned().expect("no panel was created");
        hooks.disposed();
        hooks.id()
    }

    pub fn send_from_latest(&self, payload: serde_json::Value) {
        let hooks = self.log.lock().unwrap().hooks.last().cloned().expect("no panel was created");
        hooks.received(payload);
    }
}

impl PanelHost for PanelRecorder {
    fn create_panel(&self, id: PanelId, _spec: &PanelSpec, hooks: PanelHooks) -> Box<dyn PanelSurface> {
        let visible = Arc::new(AtomicBool::new(true));
        let mut log = self.log.lock().unwrap();
        log.created.push(id);
        log.hooks.push(hooks);
        log.visible.insert(id, Arc::clone(&visible));
        Box::new(RecordedPanel { id, log: Arc::clone(&self.log), visible })
    }
}

struct RecordedPanel {
    id: PanelId,
    log: Arc<Mutex<PanelLog>>,
    visible: Arc<AtomicBool>,
}

impl PanelSurface for RecordedPanel {
    fn post_message(&self, message: PanelMessage) {
        self.log.lock().unwrap().posts.push((self.id, message));
    }

    fn is_visible(&self) -> bool {
        self.visible.load(Ordering::SeqCst)
    }

    fn reveal(&self, slot: ViewSlot) {
        self.visible.store(true, Ordering::SeqCst);
        self.log.lock().unwrap().reveals.push((self.id, slot));
    }

    fn dispose(&self) {
        self.log.lock().unwrap().disposed.push(self.id);
    }
}

// ---------------------------------------------------------------------------
// Notices
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct NoticeRecorder {
    notices: Arc<Mutex<Vec<Notice>>>,
}

impl NoticeRecorder {
    pub fn all(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }
}

impl Notifier for NoticeRecorder {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

// ---------------------------------------------------------------------------
// Running loop
// ---------------------------------------------------------------------------

pub struct Harness {
    pub source: TriggerSource,
    pub panels: PanelRecorder,
    pub notices: NoticeRecorder,
    pub service: Arc<ScriptedService>,
    kernel: JoinHandle<Reactor>,
}

impl Harness {
    pub fn start(service: ScriptedService) -> Self {
        Self::start_with(WatchConfig::default(), service)
    }

    pub fn start_with(config: WatchConfig, service: ScriptedService) -> Self {
        let service = Arc::new(service);
        let panels = PanelRecorder::new();
        let notices = NoticeRecorder::default();

        let (mut reactor, source) = Reactor::new(
            &config,
            Arc::clone(&service) as Arc<dyn AnalysisService>,
            panels.host(),
            Arc::new(notices.clone()),
        );
        let kernel = tokio::spawn(async move {
            reactor.run().await;
            reactor
        });

        Self { source, panels, notices, service, kernel }
    }

    /// Stops the loop and hands back the reactor for inspection.
    pub async fn stop(self) -> Reactor {
        self.source.shutdown().await.expect("loop already stopped");
        self.kernel.await.expect("reactor task panicked")
    }
}

/// Lets the paused clock run forward, processing everything due on the way.
pub async fn advance(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

/// A loop-less channel for driving a `PanelManager` directly.
pub fn panel_events() -> (
    mpsc::UnboundedSender<complexity_watch::kernel::event::Event>,
    mpsc::UnboundedReceiver<complexity_watch::kernel::event::Event>,
) {
    mpsc::unbounded_channel()
}
