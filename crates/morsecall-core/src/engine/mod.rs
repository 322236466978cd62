//! Engine facade and its collaborators.
//!
//! ## Usage
//!
//! ```ignore
//! let engine = Engine::builder(config).sink(sink).build()?;
//! engine.set_active(true);
//! // From the event source thread:
//! engine.record_tap(clock.now_ms(), None);
//! // From the poller:
//! let snap = engine.snapshot();
//! ```

mod clock;
mod facade;
mod outcome;
mod scheduler;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use facade::{Engine, EngineBuilder};
pub use outcome::{AlertOutcome, Snapshot, TapOutcome, TapReport};
pub use scheduler::{ManualScheduler, ThreadScheduler, TimerScheduler, TimerTask, TokioScheduler};
