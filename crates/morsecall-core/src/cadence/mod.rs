mod config;
mod log;
mod machine;

pub use config::{CadenceConfig, TapSpeed, MAX_TRIGGER_THRESHOLD, MIN_TRIGGER_THRESHOLD};
pub use log::{ActivityLog, DEFAULT_LOG_CAPACITY};
pub use machine::{transition, CadenceState, Symbol, TapEvent, Transition};
