use serde::{Deserialize, Serialize};

use crate::events::Event;

/// Result of [`Engine::record_tap`](super::Engine::record_tap).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TapOutcome {
    /// The gate is off. Nothing changed; this is not an error.
    RejectedInactive,
    Recorded(TapReport),
}

impl TapOutcome {
    pub fn is_rejected(&self) -> bool {
        matches!(self, TapOutcome::RejectedInactive)
    }

    pub fn report(&self) -> Option<&TapReport> {
        match self {
            TapOutcome::Recorded(report) => Some(report),
            TapOutcome::RejectedInactive => None,
        }
    }

    pub fn triggered(&self) -> bool {
        self.report().is_some_and(|r| r.triggered)
    }
}

/// Everything a processed tap did, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TapReport {
    pub total_taps: u64,
    pub consecutive_taps: u32,
    pub triggered: bool,
    pub alert: AlertOutcome,
    pub events: Vec<Event>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AlertOutcome {
    NotTriggered,
    Started { auto_stop_at_ms: i64 },
    AlreadyPlaying,
    /// The sink refused to start. The run was still consumed; the alert
    /// is not playing.
    PlaybackUnavailable { message: String },
}

/// Consistent read-only view for observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub active: bool,
    pub total_taps: u64,
    pub consecutive_taps: u32,
    pub trigger_threshold: u32,
    pub is_alert_playing: bool,
    pub auto_stop_deadline_ms: Option<i64>,
    /// Most recent first.
    pub recent_log: Vec<String>,
}

impl Snapshot {
    /// One-line summary, e.g. `Taps: 7 | Consecutive: 1/2`.
    pub fn status_line(&self) -> String {
        format!(
            "Taps: {} | Consecutive: {}/{}",
            self.total_taps, self.consecutive_taps, self.trigger_threshold
        )
    }
}
