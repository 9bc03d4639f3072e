use crate::models::error::{PlaybackError, VisualizerError};

/// Lifecycle notifications for the presentation layer.
///
/// Every method defaults to a no-op; implement the ones you care about.
/// Called after the controller has released its state lock, from whichever
/// thread triggered the transition.
pub trait VisualizerDelegate: Send + Sync {
    fn on_recording_started(&self) {}

    fn on_recording_paused(&self) {}

    fn on_recording_resumed(&self) {}

    fn on_recording_stopped(&self) {}

    fn on_playback_started(&self) {}

    fn on_playback_resumed(&self) {}

    fn on_playback_paused(&self) {}

    fn on_playback_ended(&self) {}

    fn on_playback_error(&self, _error: &PlaybackError) {}

    fn on_cleared(&self) {}

    /// Any fault written to the error slot.
    fn on_error(&self, _error: &VisualizerError) {}
}
