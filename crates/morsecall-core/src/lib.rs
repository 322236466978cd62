//! # Morsecall Core Library
//!
//! This library provides the core logic for Morsecall: it watches a stream of
//! taps, decides when a burst of consecutive taps should sound an alert, and
//! stops that alert again. Observing taps system-wide and rendering a UI are
//! left to the host; the CLI binary is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Cadence**: a pure state machine that counts consecutive taps and
//!   classifies press durations
//! - **Alert**: the playback lifecycle with a generation-guarded auto-stop
//! - **Gate**: the operator's on/off switch
//! - **Engine**: the synchronized facade shared by the tap source, pollers
//!   and timers
//! - **Storage**: TOML-based configuration
//!
//! ## Key Components
//!
//! - [`Engine`]: Thread-safe engine handle
//! - [`transition`]: Cadence state machine step
//! - [`AlertSink`]: Trait for whatever plays the alert
//! - [`Config`]: Application configuration management

pub mod alert;
pub mod cadence;
pub mod engine;
pub mod error;
pub mod events;
pub mod gate;
pub mod storage;

pub use alert::{AlertController, AlertSink, SilentSink, StopReason};
pub use cadence::{transition, CadenceConfig, CadenceState, Symbol, TapEvent, TapSpeed};
pub use engine::{
    AlertOutcome, Clock, Engine, ManualClock, ManualScheduler, MonotonicClock, Snapshot,
    TapOutcome, TapReport, TimerScheduler, TokioScheduler,
};
pub use error::{ConfigError, CoreError, PlaybackError};
pub use events::Event;
pub use gate::{ActivationGate, GateState, GateTransition};
pub use storage::Config;
