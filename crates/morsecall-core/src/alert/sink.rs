//! Alert playback sink.

use crate::error::PlaybackError;

/// Whatever actually makes noise: a ringtone player, a terminal bell, a
/// fake incoming call overlay.
///
/// The engine calls these methods after releasing its lock and treats the
/// sink as best effort; only a failed `start` feeds back into engine state.
pub trait AlertSink: Send + Sync {
    /// Begin playback.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::Unavailable`] if the resource cannot be used.
    fn start(&self) -> Result<(), PlaybackError>;

    /// Stop playback. Must tolerate being called when nothing is playing.
    fn stop(&self);
}

/// Sink that accepts every request and does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentSink;

impl AlertSink for SilentSink {
    fn start(&self) -> Result<(), PlaybackError> {
        Ok(())
    }

    fn stop(&self) {}
}
