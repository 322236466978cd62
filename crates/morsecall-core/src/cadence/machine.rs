//! Pure cadence state machine.
//!
//! [`transition`] takes the previous counters, the active configuration and
//! one tap, and returns the next counters plus the ordered list of events the
//! tap produced. It performs no I/O and keeps no hidden state, so the engine
//! can run it inside its critical section and apply the events afterwards.
//!
//! ## Run counting
//!
//! ```text
//! first tap            -> consecutive = 1
//! 0 < gap < window     -> consecutive + 1
//! gap >= window        -> consecutive = 1   (RunRestarted)
//! gap <= 0             -> unchanged         (NonMonotonicTimestamp)
//! consecutive >= threshold -> TriggerFired, consecutive = 0
//! ```

use serde::{Deserialize, Serialize};

use super::config::CadenceConfig;
use crate::events::Event;

/// A single tap reported by the event source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TapEvent {
    /// Monotonic timestamp in milliseconds.
    pub timestamp_ms: i64,
    /// Set when the source reports press/release pairs.
    #[serde(default)]
    pub press_duration_ms: Option<i64>,
}

impl TapEvent {
    pub fn at(timestamp_ms: i64) -> Self {
        Self {
            timestamp_ms,
            press_duration_ms: None,
        }
    }

    pub fn with_press(timestamp_ms: i64, press_duration_ms: i64) -> Self {
        Self {
            timestamp_ms,
            press_duration_ms: Some(press_duration_ms),
        }
    }
}

/// Morse symbol derived from a press duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Symbol {
    Dot,
    Dash,
}

impl Symbol {
    /// Strictly below the threshold is a dot.
    pub fn classify(press_duration_ms: i64, dot_threshold_ms: i64) -> Self {
        if press_duration_ms < dot_threshold_ms {
            Symbol::Dot
        } else {
            Symbol::Dash
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Symbol::Dot => "Dot",
            Symbol::Dash => "Dash",
        }
    }
}

/// Tap counters owned by the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CadenceState {
    pub last_tap_ms: Option<i64>,
    /// Every accepted tap since the last full reset.
    pub total_taps: u64,
    /// Length of the current run; 0 right after a trigger consumed it.
    pub consecutive_taps: u32,
}

impl CadenceState {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Result of a single [`transition`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: CadenceState,
    pub events: Vec<Event>,
}

impl Transition {
    pub fn triggered(&self) -> bool {
        self.events
            .iter()
            .any(|e| matches!(e, Event::TriggerFired { .. }))
    }
}

/// Apply one tap to the counters.
pub fn transition(state: &CadenceState, config: &CadenceConfig, tap: TapEvent) -> Transition {
    let mut next = *state;
    let mut events = Vec::new();

    next.total_taps = state.total_taps.saturating_add(1);

    let advanced = match state.last_tap_ms {
        None => {
            next.consecutive_taps = 1;
            true
        }
        Some(last) => {
            let gap = tap.timestamp_ms.saturating_sub(last);
            if gap <= 0 {
                events.push(Event::NonMonotonicTimestamp { gap_ms: gap });
                false
            } else if gap < config.consecutive_window_ms {
                next.consecutive_taps = state.consecutive_taps.saturating_add(1);
                true
            } else {
                next.consecutive_taps = 1;
                events.push(Event::RunRestarted { gap_ms: gap });
                true
            }
        }
    };

    if let Some(press) = tap.press_duration_ms {
        events.push(Event::SymbolClassified {
            symbol: Symbol::classify(press, config.dot_threshold_ms),
            press_duration_ms: press,
        });
    }

    next.last_tap_ms = Some(tap.timestamp_ms);

    // A tap that did not count toward the run cannot complete it.
    if advanced && next.consecutive_taps >= config.trigger_threshold {
        events.push(Event::TriggerFired {
            run_length: next.consecutive_taps,
            threshold: config.trigger_threshold,
        });
        next.consecutive_taps = 0;
    }

    Transition {
        state: next,
        events,
    }
}
