//! Idempotent teardown shared by clear, fault handling and drop.

use std::time::Duration;

use crate::models::artifact::RecordedArtifact;
use crate::models::audio_models::AudioLevels;
use crate::models::error::VisualizerError;
use crate::models::state::RecordingState;

use super::capture::CaptureSession;
use super::playback::PlaybackSession;
use super::visualizer::{ControllerState, Notice, Shared};

/// Resources detached from the controller, released after the lock is dropped.
pub(crate) struct Released {
    capture: Option<CaptureSession>,
    playback: Option<PlaybackSession>,
    artifact: Option<RecordedArtifact>,
}

impl Released {
    pub(crate) fn release(self) {
        if let Some(capture) = self.capture {
            capture.release();
        }
        if let Some(playback) = self.playback {
            playback.release();
        }
        drop(self.artifact);
    }
}

impl ControllerState {
    /// Invalidate the current generation, cancel both frame loops and reset
    /// every observable field to its baseline.
    pub(crate) fn reset(&mut self) -> Released {
        self.generation += 1;

        let capture = self.capture.take();
        if let Some(capture) = capture.as_ref() {
            capture.cancel_loops();
        }
        let playback = self.playback.take();
        if let Some(playback) = playback.as_ref() {
            playback.cancel_tracker();
        }
        let artifact = self.artifact.take();

        self.recording = RecordingState::Idle;
        self.recording_time = 0.0;
        self.baseline = Duration::ZERO;
        self.audio_data = Vec::new();
        self.levels = AudioLevels::default();
        self.pending_output = Vec::new();
        self.encoder_mime = None;
        self.processing_artifact = false;
        self.is_preloaded = false;
        self.is_cleared = true;
        self.error = None;

        Released {
            capture,
            playback,
            artifact,
        }
    }

    /// Store `error` in the error slot, tearing everything down first when
    /// the fault forces a clear.
    pub(crate) fn record_fault(&mut self, error: VisualizerError) -> Option<Released> {
        let released = error.forces_clear().then(|| self.reset());
        self.error = Some(error);
        released
    }
}

impl Shared {
    /// Release everything and return to the empty baseline. Safe to repeat.
    pub(crate) fn clear(&self) {
        let released = self.state.lock().reset();
        released.release();
        log::debug!("cleared");
        self.notify(vec![Notice::Cleared]);
    }

    /// Record a fault raised on behalf of `generation`. No-op once that
    /// generation is superseded; the check and the teardown share one lock.
    pub(crate) fn fail_if_current(&self, generation: u64, error: VisualizerError) {
        let released = {
            let mut state = self.state.lock();
            if state.generation != generation {
                log::debug!("ignoring fault from superseded generation {}: {}", generation, error);
                return;
            }
            state.record_fault(error.clone())
        };
        log::warn!("{}", error);

        let mut notices = Vec::new();
        if let Some(released) = released {
            released.release();
            notices.push(Notice::Cleared);
        }
        notices.push(Notice::Error(error));
        self.notify(notices);
    }
}
