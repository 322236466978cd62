mod controller;
mod sink;

pub use controller::{AlertController, AlertTicket, FireResult, StopReason};
pub use sink::{AlertSink, SilentSink};
