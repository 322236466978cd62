//! Alert lifecycle controller.
//!
//! Tracks whether an alert is sounding and when it should stop on its own.
//! The controller never talks to the sink or the scheduler itself: the
//! engine calls it under its lock and performs the returned side effects
//! after releasing the lock.
//!
//! Every start and stop bumps `generation`. An auto-stop timer carries the
//! generation it was scheduled for, so a timer that outlives its alert
//! (manual stop, deactivation, a newer alert) finds a different generation
//! and does nothing.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Why an alert stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Operator pressed stop.
    Manual,
    /// Engine deactivated or failed safe.
    Forced,
    /// The auto-stop deadline elapsed.
    AutoStop,
}

impl StopReason {
    pub fn description(&self) -> &'static str {
        match self {
            StopReason::Manual => "stopped by user",
            StopReason::Forced => "engine deactivated",
            StopReason::AutoStop => "auto-stop",
        }
    }
}

/// Handle for the auto-stop timer of one alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertTicket {
    pub generation: u64,
    pub auto_stop_at_ms: i64,
    pub delay: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireResult {
    Started(AlertTicket),
    /// Alerts do not stack or restart.
    AlreadyPlaying,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlertController {
    playing: bool,
    deadline_ms: Option<i64>,
    generation: u64,
}

impl AlertController {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn auto_stop_deadline_ms(&self) -> Option<i64> {
        self.deadline_ms
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Mark the alert as playing and hand back the timer ticket.
    ///
    /// The flag is set optimistically; if the sink then fails to start,
    /// call [`playback_failed`](Self::playback_failed) with the ticket's
    /// generation.
    pub fn fire(&mut self, now_ms: i64, auto_stop_ms: u64) -> FireResult {
        if self.playing {
            return FireResult::AlreadyPlaying;
        }
        let delay = Duration::from_millis(auto_stop_ms);
        let deadline = now_ms.saturating_add(i64::try_from(auto_stop_ms).unwrap_or(i64::MAX));
        self.generation = self.generation.wrapping_add(1);
        self.playing = true;
        self.deadline_ms = Some(deadline);
        FireResult::Started(AlertTicket {
            generation: self.generation,
            auto_stop_at_ms: deadline,
            delay,
        })
    }

    /// Operator stop. Returns `true` if an alert was playing.
    pub fn manual_stop(&mut self) -> bool {
        if !self.playing {
            return false;
        }
        self.clear();
        true
    }

    /// Unconditional stop used on deactivation. Always invalidates any
    /// outstanding timer; returns `true` if an alert was playing.
    pub fn force_stop(&mut self) -> bool {
        let was_playing = self.playing;
        self.clear();
        was_playing
    }

    /// Timer callback. Stops only if `generation` is still current.
    pub fn expire(&mut self, generation: u64) -> bool {
        if !self.playing || generation != self.generation {
            return false;
        }
        self.clear();
        true
    }

    /// Clock-driven variant of [`expire`](Self::expire) for tick-based hosts.
    pub fn expire_due(&mut self, now_ms: i64) -> bool {
        match self.deadline_ms {
            Some(deadline) if self.playing && now_ms >= deadline => {
                self.clear();
                true
            }
            _ => false,
        }
    }

    /// Undo an optimistic [`fire`](Self::fire) after the sink refused to start.
    pub fn playback_failed(&mut self, generation: u64) -> bool {
        self.expire(generation)
    }

    fn clear(&mut self) {
        self.playing = false;
        self.deadline_ms = None;
        self.generation = self.generation.wrapping_add(1);
    }
}
