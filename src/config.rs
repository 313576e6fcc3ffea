use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::time::Duration;
use tracing::warn;

use crate::kernel::orchestrator::ReconcilePolicy;
use crate::panel::{PanelSpec, ViewSlot};
use crate::services::analysis::client::{DEFAULT_ANALYZE_PATH, DEFAULT_SERVICE_URL};

const PANEL_MARKUP: &str = "<!DOCTYPE html><html><body><div id=\"root\">Waiting for analysis...</div></body></html>";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WatchConfig {
    pub service_url: String,
    pub analyze_path: String,
    pub debounce_ms: u64,
    /// `None` lets a hung request wait forever
    pub request_timeout_ms: Option<u64>,
    pub reconcile: ReconcilePolicy,
    pub panel_title: String,
    pub panel_view_type: String,
    pub event_buffer: usize,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            service_url: DEFAULT_SERVICE_URL.to_string(),
            analyze_path: DEFAULT_ANALYZE_PATH.to_string(),
            debounce_ms: 500,
            request_timeout_ms: Some(30_000),
            reconcile: ReconcilePolicy::LastArrival,
            panel_title: "Code Complexity".to_string(),
            panel_view_type: "complexityAnalysis".to_string(),
            event_buffer: 100,
        }
    }
}

impl WatchConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
    }

    /// File (if any), then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        Ok(config.with_env_overrides(|key| std::env::var(key).ok()))
    }

    /// `lookup` is injected so tests don't have to touch the process environment.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("COMPLEXITY_SERVICE_URL") {
            self.service_url = url;
        }
        if let Some(raw) = lookup("COMPLEXITY_DEBOUNCE_MS") {
            match raw.parse() {
                Ok(ms) => self.debounce_ms = ms,
                Err(_) => warn!("Ignoring COMPLEXITY_DEBOUNCE_MS={:?}: not a number", raw),
            }
        }
        if let Some(raw) = lookup("COMPLEXITY_TIMEOUT_MS") {
            match raw.as_str() {
                "" | "none" | "0" => self.request_timeout_ms = None,
                value => match value.parse() {
                    Ok(ms) => self.request_timeout_ms = Some(ms),
                    Err(_) => warn!("Ignoring COMPLEXITY_TIMEOUT_MS={:?}: not a number", raw),
                },
            }
        }
        self
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// `None` waits forever. Zero means the same, whether it came from the file or the env.
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }

    pub fn panel_spec(&self) -> PanelSpec {
        PanelSpec {
            view_type: self.panel_view_type.clone(),
            title: self.panel_title.clone(),
            slot: ViewSlot::Beside,
            enable_scripts: true,
            retain_context_when_hidden: true,
            markup: PANEL_MARKUP.to_string(),
        }
    }
}
