use serde::{Deserialize, Serialize};

use crate::alert::StopReason;
use crate::cadence::Symbol;

/// Every decision the engine makes about a tap produces an Event.
///
/// The cadence state machine emits the first four variants as pure effects;
/// the engine appends the alert variants after applying them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A press duration was reported and classified.
    SymbolClassified {
        symbol: Symbol,
        press_duration_ms: i64,
    },
    /// The gap since the previous tap reached the consecutive window,
    /// so this tap starts a new run.
    RunRestarted {
        gap_ms: i64,
    },
    /// The tap carried a timestamp at or before the previous one.
    /// Counted in the total, ignored for consecutive advancement.
    NonMonotonicTimestamp {
        gap_ms: i64,
    },
    /// The consecutive run reached the trigger threshold and was consumed.
    TriggerFired {
        run_length: u32,
        threshold: u32,
    },
    AlertStarted {
        auto_stop_at_ms: i64,
    },
    /// `fire` arrived while an alert was already sounding.
    AlertAlreadyPlaying,
    AlertStopped {
        reason: StopReason,
    },
    PlaybackUnavailable {
        message: String,
    },
}

impl Event {
    /// Activity log line for this event, if it is worth showing.
    pub fn log_line(&self) -> Option<String> {
        match self {
            Event::SymbolClassified {
                symbol,
                press_duration_ms,
            } => Some(format!("{} ({} ms)", symbol.label(), press_duration_ms)),
            Event::RunRestarted { gap_ms } => {
                Some(format!("Run restarted after {gap_ms} ms pause"))
            }
            Event::NonMonotonicTimestamp { gap_ms } => {
                Some(format!("Out-of-order tap ignored for run (gap {gap_ms} ms)"))
            }
            Event::TriggerFired { .. } => None,
            Event::AlertStarted { .. } => Some("RINGTONE PLAYING!".to_string()),
            Event::AlertAlreadyPlaying => None,
            Event::AlertStopped { reason } => {
                Some(format!("Ringtone stopped ({})", reason.description()))
            }
            Event::PlaybackUnavailable { message } => {
                Some(format!("Ringtone unavailable: {message}"))
            }
        }
    }
}
