use std::sync::Arc;

use super::artifact::{DecodedAudio, EncodedBlob, PlayableSource};
use super::audio_models::AudioLevels;
use super::error::VisualizerError;
use super::state::{PlaybackState, RecordingState};

/// One consistent read of everything the presentation layer observes.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualizerSnapshot {
    pub recording_state: RecordingState,
    pub is_recording_in_progress: bool,
    pub is_paused_recording: bool,
    pub is_processing_start_recording: bool,
    /// Latest time-domain window from the sampler (128 = silence).
    pub audio_data: Vec<u8>,
    pub levels: AudioLevels,
    /// Accumulated recording time in seconds.
    pub recording_time: f64,
    pub recorded_blob: Option<EncodedBlob>,
    pub decoded_audio: Option<Arc<DecodedAudio>>,
    pub audio_src: Option<PlayableSource>,
    /// Decoded length minus the trim, in seconds.
    pub duration: f64,
    pub current_audio_time: f64,
    pub playback_state: PlaybackState,
    pub is_paused_recorded_audio: bool,
    /// Playback reached the end and rewound; reset by play or seek.
    pub is_playback_ended: bool,
    pub is_processing_recorded_audio: bool,
    pub is_available_recorded_audio: bool,
    pub is_cleared: bool,
    pub is_preloaded_blob: bool,
    pub encoder_mime_type: Option<String>,
    pub error: Option<VisualizerError>,
}

impl Default for VisualizerSnapshot {
    fn default() -> Self {
        Self {
            recording_state: RecordingState::Idle,
            is_recording_in_progress: false,
            is_paused_recording: false,
            is_processing_start_recording: false,
            audio_data: Vec::new(),
            levels: AudioLevels::default(),
            recording_time: 0.0,
            recorded_blob: None,
            decoded_audio: None,
            audio_src: None,
            duration: 0.0,
            current_audio_time: 0.0,
            playback_state: PlaybackState::Stopped,
            is_paused_recorded_audio: true,
            is_playback_ended: false,
            is_processing_recorded_audio: false,
            is_available_recorded_audio: false,
            is_cleared: true,
            is_preloaded_blob: false,
            encoder_mime_type: None,
            error: None,
        }
    }
}
