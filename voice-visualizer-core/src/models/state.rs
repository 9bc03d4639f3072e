/// Recording controller state machine.
///
/// State transitions:
/// ```text
/// idle → acquiring_device → recording ↔ paused
///                                ↓         ↓
///                              stopping → idle
/// ```
/// Any state returns to `Idle` on an error or an explicit clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordingState {
    #[default]
    Idle,
    AcquiringDevice,
    Recording,
    Paused,
    /// Encoder stopped; waiting for its final chunk.
    Stopping,
}

impl RecordingState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Recording or paused: a capture session is live.
    pub fn is_in_progress(&self) -> bool {
        matches!(self, Self::Recording | Self::Paused)
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, Self::Paused)
    }

    pub fn is_acquiring(&self) -> bool {
        matches!(self, Self::AcquiringDevice)
    }
}

/// Playback controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
}
