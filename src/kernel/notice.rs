use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use super::event::Trigger;
use crate::panel::PanelState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A transient, user-visible message (a toast in most hosts).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Info, message: message.into() }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Warning, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Error, message: message.into() }
    }

    pub fn unsupported_language(tag: &str) -> Self {
        Self::warning(format!(
            "Language '{}' is not supported. Supported languages: Java, JavaScript, TypeScript, Python",
            tag
        ))
    }

    pub fn no_active_editor() -> Self {
        Self::warning("No active editor to analyze")
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Fallback when no host surface is attached: notices only reach the log.
#[derive(Debug, Default, Clone)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Info => info!("[NOTICE] {}", notice.message),
            NoticeLevel::Warning => warn!("[NOTICE] {}", notice.message),
            NoticeLevel::Error => error!("[NOTICE] {}", notice.message),
        }
    }
}

/// Failures pop up for manual runs, or when there is no panel showing
/// older results. Steady-state background typing stays quiet.
pub fn should_surface_failure(trigger: Trigger, panel: PanelState) -> bool {
    trigger == Trigger::Manual || panel == PanelState::Absent
}
