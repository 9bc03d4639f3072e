use thiserror::Error;

/// Failures while obtaining capture sources.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AcquisitionError {
    #[error("permission denied")]
    PermissionDenied,

    #[error("device not available")]
    DeviceNotAvailable,

    #[error("no audio track found in display media")]
    NoAudioTrack,

    #[error("capture request was abandoned before it resolved")]
    Abandoned,

    #[error("platform rejected capture: {0}")]
    Platform(String),
}

/// Failures reported by the decode service.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("malformed audio: {0}")]
    Malformed(String),

    #[error("unsupported audio: {0}")]
    Unsupported(String),

    #[error("decode request was abandoned before it resolved")]
    Abandoned,
}

/// Failures starting playback of a decoded recording.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("playback refused: {0}")]
    Refused(String),

    #[error("playback failed: {0}")]
    Platform(String),
}

/// Errors surfaced by the visualizer controller.
///
/// Lifecycle faults (`Acquisition`, `EmptyArtifact`, `Decode`, `Playback`)
/// are also held in the controller's single error slot.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VisualizerError {
    #[error("acquisition failed: {0}")]
    Acquisition(#[from] AcquisitionError),

    #[error("the audio blob is empty")]
    EmptyArtifact,

    #[error("decoding failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("playback error: {0}")]
    Playback(#[from] PlaybackError),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("configuration failed: {0}")]
    Configuration(String),
}

impl VisualizerError {
    /// Whether this fault forces a full teardown of the visualization state.
    pub fn forces_clear(&self) -> bool {
        matches!(
            self,
            Self::Acquisition(_) | Self::EmptyArtifact | Self::Decode(_)
        )
    }
}
