//! Engine facade.
//!
//! The single synchronized entry point. All mutation (taps, activation,
//! manual stop, config updates, auto-stop timers) goes through one write
//! lock; [`Engine::snapshot`] takes the read lock and copies.
//!
//! Sink calls never happen under the state lock. They are serialized by a
//! separate playback mutex; lock order is playback, then state. Only the
//! tap that fired an alert ever starts the sink, so a refused start always
//! reaches that tap's caller. Every other mutation only releases the sink
//! once the committed state says nothing is playing.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use tracing::{debug, info, warn};

use super::clock::{Clock, MonotonicClock};
use super::outcome::{AlertOutcome, Snapshot, TapOutcome, TapReport};
use super::scheduler::{ThreadScheduler, TimerScheduler, TokioScheduler};
use crate::alert::{AlertController, AlertSink, AlertTicket, FireResult, SilentSink, StopReason};
use crate::cadence::{transition, ActivityLog, CadenceConfig, CadenceState, TapEvent, DEFAULT_LOG_CAPACITY};
use crate::error::{ConfigError, PlaybackError};
use crate::events::Event;
use crate::gate::{ActivationGate, GateTransition};

/// Mutable state guarded by the engine lock.
#[derive(Debug)]
struct EngineState {
    config: CadenceConfig,
    gate: ActivationGate,
    cadence: CadenceState,
    alert: AlertController,
    log: ActivityLog,
}

impl EngineState {
    /// Back to construction values, gate off.
    fn reset(&mut self) -> bool {
        self.gate.set(false);
        self.cadence = CadenceState::new();
        self.log.clear();
        self.alert.force_stop()
    }
}

struct Inner {
    state: RwLock<EngineState>,
    /// Whether the sink was last told to play.
    playback: Mutex<bool>,
    sink: Arc<dyn AlertSink>,
    clock: Arc<dyn Clock>,
    scheduler: Arc<dyn TimerScheduler>,
}

/// Cloneable handle to one engine instance.
///
/// Hand clones to the event source, the poller and anything else that
/// needs the engine; there is no global instance.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<Inner>,
}

pub struct EngineBuilder {
    config: CadenceConfig,
    log_capacity: usize,
    sink: Option<Arc<dyn AlertSink>>,
    clock: Option<Arc<dyn Clock>>,
    scheduler: Option<Arc<dyn TimerScheduler>>,
}

impl EngineBuilder {
    pub fn sink(mut self, sink: Arc<dyn AlertSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn scheduler(mut self, scheduler: Arc<dyn TimerScheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn log_capacity(mut self, capacity: usize) -> Self {
        self.log_capacity = capacity;
        self
    }

    /// Build the engine, inactive and with empty counters.
    ///
    /// Without an explicit scheduler, timers run on the current tokio
    /// runtime if there is one and on plain threads otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if the config is out of range.
    pub fn build(self) -> Result<Engine, ConfigError> {
        self.config.validate()?;
        let scheduler = self.scheduler.unwrap_or_else(|| match TokioScheduler::current() {
            Some(tokio) => Arc::new(tokio),
            None => Arc::new(ThreadScheduler),
        });
        Ok(Engine {
            inner: Arc::new(Inner {
                state: RwLock::new(EngineState {
                    config: self.config,
                    gate: ActivationGate::new(),
                    cadence: CadenceState::new(),
                    alert: AlertController::new(),
                    log: ActivityLog::new(self.log_capacity),
                }),
                playback: Mutex::new(false),
                sink: self.sink.unwrap_or_else(|| Arc::new(SilentSink)),
                clock: self.clock.unwrap_or_else(|| Arc::new(MonotonicClock::new())),
                scheduler,
            }),
        })
    }
}

impl Engine {
    pub fn builder(config: CadenceConfig) -> EngineBuilder {
        EngineBuilder {
            config,
            log_capacity: DEFAULT_LOG_CAPACITY,
            sink: None,
            clock: None,
            scheduler: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn snapshot(&self) -> Snapshot {
        let st = self.read();
        Snapshot {
            active: st.gate.is_active(),
            total_taps: st.cadence.total_taps,
            consecutive_taps: st.cadence.consecutive_taps,
            trigger_threshold: st.config.trigger_threshold,
            is_alert_playing: st.alert.is_playing(),
            auto_stop_deadline_ms: st.alert.auto_stop_deadline_ms(),
            recent_log: st.log.entries(),
        }
    }

    pub fn config(&self) -> CadenceConfig {
        self.read().config
    }

    pub fn is_active(&self) -> bool {
        self.read().gate.is_active()
    }

    pub fn now_ms(&self) -> i64 {
        self.inner.clock.now_ms()
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Feed one tap from the event source.
    ///
    /// Every effect of the tap (counters, log lines, alert start) is
    /// committed before this returns.
    pub fn record_tap(&self, timestamp_ms: i64, press_duration_ms: Option<i64>) -> TapOutcome {
        let tap = TapEvent {
            timestamp_ms,
            press_duration_ms,
        };
        let now = self.inner.clock.now_ms();

        let (mut report, ticket) = {
            let mut st = self.write();
            if !st.gate.is_active() {
                debug!(timestamp_ms, "tap ignored while inactive");
                return TapOutcome::RejectedInactive;
            }

            let step = transition(&st.cadence, &st.config, tap);
            let triggered = step.triggered();
            st.cadence = step.state;
            let mut events = step.events;

            let mut ticket = None;
            let mut alert = AlertOutcome::NotTriggered;
            if triggered {
                info!(
                    total = st.cadence.total_taps,
                    threshold = st.config.trigger_threshold,
                    "tap trigger fired"
                );
                let auto_stop_ms = st.config.alert_auto_stop_ms;
                match st.alert.fire(now, auto_stop_ms) {
                    FireResult::Started(t) => {
                        events.push(Event::AlertStarted {
                            auto_stop_at_ms: t.auto_stop_at_ms,
                        });
                        alert = AlertOutcome::Started {
                            auto_stop_at_ms: t.auto_stop_at_ms,
                        };
                        ticket = Some(t);
                    }
                    FireResult::AlreadyPlaying => {
                        events.push(Event::AlertAlreadyPlaying);
                        alert = AlertOutcome::AlreadyPlaying;
                    }
                }
            }

            for event in &events {
                if let Event::NonMonotonicTimestamp { gap_ms } = event {
                    warn!(timestamp_ms, gap_ms, "non-monotonic tap timestamp");
                }
                if let Some(line) = event.log_line() {
                    st.log.push(line);
                }
            }
            let total = st.cadence.total_taps;
            let consecutive = st.cadence.consecutive_taps;
            st.log
                .push(format!("Tap #{total} (Consecutive: {consecutive})"));
            debug!(timestamp_ms, total, consecutive, "tap recorded");

            (
                TapReport {
                    total_taps: total,
                    consecutive_taps: consecutive,
                    triggered,
                    alert,
                    events,
                },
                ticket,
            )
        };

        if let Some(ticket) = ticket {
            if let Err(err) = self.start_alert(ticket) {
                report.alert = AlertOutcome::PlaybackUnavailable {
                    message: err.to_string(),
                };
                report.events.push(Event::PlaybackUnavailable {
                    message: err.to_string(),
                });
            }
        }

        TapOutcome::Recorded(report)
    }

    /// Turn tap processing on or off.
    ///
    /// Turning it off stops any alert and zeroes every counter in one
    /// step, whatever the previous state was.
    pub fn set_active(&self, active: bool) -> GateTransition {
        let transition = {
            let mut st = self.write();
            if active {
                st.gate.set(true)
            } else {
                let was_active = st.gate.is_active();
                let was_playing = st.reset();
                if was_playing {
                    info!("alert force-stopped by deactivation");
                }
                if was_active {
                    GateTransition::Deactivated
                } else {
                    GateTransition::Unchanged
                }
            }
        };
        info!(?transition, "activation changed");
        self.release_sink();
        transition
    }

    /// Operator stop. Returns `true` if an alert was playing; calling it
    /// again is a no-op.
    pub fn manual_stop_alert(&self) -> bool {
        let stopped = {
            let mut st = self.write();
            let stopped = st.alert.manual_stop();
            if stopped {
                push_stop_line(&mut st.log, StopReason::Manual);
            }
            stopped
        };
        if stopped {
            info!("alert stopped by user");
            self.release_sink();
        }
        stopped
    }

    /// Replace the cadence configuration.
    ///
    /// Takes effect on the next tap. Counters are kept, and a count that
    /// already satisfies a lowered threshold does not fire until another
    /// tap arrives.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`]; the previous config stays in effect.
    pub fn update_config(&self, config: CadenceConfig) -> Result<(), ConfigError> {
        if let Err(err) = config.validate() {
            warn!(error = %err, "rejected cadence config update");
            return Err(err);
        }
        let mut st = self.write();
        st.config = config;
        info!(
            threshold = config.trigger_threshold,
            window_ms = config.consecutive_window_ms,
            "cadence config updated"
        );
        Ok(())
    }

    /// Stop an alert whose deadline has passed according to the clock.
    ///
    /// For hosts that poll instead of (or as well as) relying on the
    /// scheduled timer. Returns `true` if an alert stopped.
    pub fn tick(&self) -> bool {
        let now = self.inner.clock.now_ms();
        let stopped = {
            let mut st = self.write();
            let stopped = st.alert.expire_due(now);
            if stopped {
                push_stop_line(&mut st.log, StopReason::AutoStop);
            }
            stopped
        };
        if stopped {
            info!(now, "alert auto-stopped on tick");
            self.release_sink();
        }
        stopped
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn expire_alert(&self, generation: u64) {
        let stopped = {
            let mut st = self.write();
            let stopped = st.alert.expire(generation);
            if stopped {
                push_stop_line(&mut st.log, StopReason::AutoStop);
            }
            stopped
        };
        if stopped {
            info!(generation, "alert auto-stopped");
            self.release_sink();
        } else {
            debug!(generation, "stale auto-stop timer ignored");
        }
    }

    fn start_alert(&self, ticket: AlertTicket) -> Result<(), PlaybackError> {
        {
            let mut sink_playing = self.playback();
            let still_current = {
                let st = self.read();
                st.alert.is_playing() && st.alert.generation() == ticket.generation
            };
            if !still_current {
                debug!(generation = ticket.generation, "alert ended before playback started");
                return Ok(());
            }
            if !*sink_playing {
                if let Err(err) = self.inner.sink.start() {
                    warn!(error = %err, "alert playback unavailable");
                    let mut st = self.write();
                    if st.alert.playback_failed(ticket.generation) {
                        let line = Event::PlaybackUnavailable {
                            message: err.to_string(),
                        }
                        .log_line();
                        if let Some(line) = line {
                            st.log.push(line);
                        }
                    }
                    return Err(err);
                }
                *sink_playing = true;
            }
        }

        info!(auto_stop_at_ms = ticket.auto_stop_at_ms, "alert started");
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let generation = ticket.generation;
        self.inner.scheduler.schedule(
            ticket.delay,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    Engine { inner }.expire_alert(generation);
                }
            }),
        );
        Ok(())
    }

    /// Stop the sink if the committed state no longer wants it playing.
    fn release_sink(&self) {
        let mut sink_playing = self.playback();
        if *sink_playing && !self.read().alert.is_playing() {
            self.inner.sink.stop();
            *sink_playing = false;
        }
    }

    fn playback(&self) -> MutexGuard<'_, bool> {
        self.inner
            .playback
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, EngineState> {
        match self.inner.state.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("engine state lock poisoned, forcing full reset");
                let mut guard = poisoned.into_inner();
                guard.reset();
                self.inner.state.clear_poison();
                guard
            }
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, EngineState> {
        if self.inner.state.is_poisoned() {
            drop(self.write());
        }
        self.inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn push_stop_line(log: &mut ActivityLog, reason: StopReason) {
    if let Some(line) = (Event::AlertStopped { reason }).log_line() {
        log.push(line);
    }
}
