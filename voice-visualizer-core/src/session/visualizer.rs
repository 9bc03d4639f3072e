use std::path::Path;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;

use crate::models::artifact::{EncodedBlob, RecordedArtifact};
use crate::models::audio_models::{AudioLevels, SessionDiagnostics};
use crate::models::config::VisualizerConfig;
use crate::models::error::{PlaybackError, VisualizerError};
use crate::models::snapshot::VisualizerSnapshot;
use crate::models::state::{PlaybackState, RecordingState};
use crate::runtime::clock::{Clock, SystemClock};
use crate::runtime::scheduler::{Scheduler, ThreadScheduler};
use crate::storage::export::{export_artifact, SavedRecording};
use crate::traits::audio_engine::AudioEngine;
use crate::traits::capture_devices::CaptureDevices;
use crate::traits::decoder::Decoder;
use crate::traits::delegate::VisualizerDelegate;
use crate::traits::encoder::Encoder;
use crate::traits::player::PlaybackEngine;

use super::capture::CaptureSession;
use super::playback::PlaybackSession;

/// Platform services the controller drives.
///
/// `scheduler` and `clock` default to a `ThreadScheduler` paced by
/// `VisualizerConfig::frame_interval` and a `SystemClock`.
#[derive(Clone)]
pub struct Platform {
    pub devices: Arc<dyn CaptureDevices>,
    pub audio: Arc<dyn AudioEngine>,
    pub encoder: Arc<dyn Encoder>,
    pub decoder: Arc<dyn Decoder>,
    pub playback: Arc<dyn PlaybackEngine>,
    pub scheduler: Option<Arc<dyn Scheduler>>,
    pub clock: Option<Arc<dyn Clock>>,
}

impl Platform {
    pub fn new(
        devices: Arc<dyn CaptureDevices>,
        audio: Arc<dyn AudioEngine>,
        encoder: Arc<dyn Encoder>,
        decoder: Arc<dyn Decoder>,
        playback: Arc<dyn PlaybackEngine>,
    ) -> Self {
        Self {
            devices,
            audio,
            encoder,
            decoder,
            playback,
            scheduler: None,
            clock: None,
        }
    }

    /// Drive loops and time from the host instead of background threads.
    pub fn with_runtime(mut self, scheduler: Arc<dyn Scheduler>, clock: Arc<dyn Clock>) -> Self {
        self.scheduler = Some(scheduler);
        self.clock = Some(clock);
        self
    }
}

/// Lifecycle notifications queued under the lock and delivered after it.
#[derive(Debug, Clone)]
pub(crate) enum Notice {
    RecordingStarted,
    RecordingPaused,
    RecordingResumed,
    RecordingStopped,
    PlaybackStarted,
    PlaybackResumed,
    PlaybackPaused,
    PlaybackEnded,
    PlaybackFailed(PlaybackError),
    Cleared,
    Error(VisualizerError),
}

/// Everything guarded by the controller lock.
pub(crate) struct ControllerState {
    /// Bumped by start, clear and preload; late results from older generations are dropped.
    pub(crate) generation: u64,
    pub(crate) recording: RecordingState,
    pub(crate) capture: Option<CaptureSession>,
    pub(crate) recording_time: f64,
    /// Clock reading the next accumulation measures from.
    pub(crate) baseline: Duration,
    pub(crate) audio_data: Vec<u8>,
    pub(crate) levels: AudioLevels,
    /// Encoder output collected until the final chunk.
    pub(crate) pending_output: Vec<u8>,
    pub(crate) encoder_mime: Option<String>,
    pub(crate) artifact: Option<RecordedArtifact>,
    pub(crate) processing_artifact: bool,
    pub(crate) is_preloaded: bool,
    pub(crate) is_cleared: bool,
    pub(crate) playback: Option<PlaybackSession>,
    pub(crate) error: Option<VisualizerError>,
    pub(crate) sampler_ticks: u64,
    pub(crate) timer_ticks: u64,
    pub(crate) tracker_ticks: u64,
}

impl ControllerState {
    pub(crate) fn new() -> Self {
        Self {
            generation: 0,
            recording: RecordingState::Idle,
            capture: None,
            recording_time: 0.0,
            baseline: Duration::ZERO,
            audio_data: Vec::new(),
            levels: AudioLevels::default(),
            pending_output: Vec::new(),
            encoder_mime: None,
            artifact: None,
            processing_artifact: false,
            is_preloaded: false,
            is_cleared: true,
            playback: None,
            error: None,
            sampler_ticks: 0,
            timer_ticks: 0,
            tracker_ticks: 0,
        }
    }

    /// A decoded, current artifact with a player ready for it.
    pub(crate) fn is_available(&self) -> bool {
        !self.processing_artifact
            && self.playback.is_some()
            && self.artifact.as_ref().is_some_and(|a| a.is_decoded())
    }

    fn snapshot(&self) -> VisualizerSnapshot {
        let artifact = self.artifact.as_ref();
        let playback = self.playback.as_ref();
        let playing = playback.is_some_and(|p| !p.paused);

        VisualizerSnapshot {
            recording_state: self.recording,
            is_recording_in_progress: self.recording.is_in_progress(),
            is_paused_recording: self.recording.is_paused(),
            is_processing_start_recording: self.recording.is_acquiring(),
            audio_data: self.audio_data.clone(),
            levels: self.levels,
            recording_time: self.recording_time,
            recorded_blob: artifact.map(|a| a.blob.clone()),
            decoded_audio: artifact.and_then(|a| a.decoded.clone()),
            audio_src: artifact.and_then(|a| a.playable.clone()),
            duration: artifact.map(|a| a.duration_secs).unwrap_or(0.0),
            current_audio_time: playback.map(|p| p.position).unwrap_or(0.0),
            playback_state: if playing {
                PlaybackState::Playing
            } else {
                PlaybackState::Stopped
            },
            is_paused_recorded_audio: !playing,
            is_playback_ended: playback.is_some_and(|p| p.ended),
            is_processing_recorded_audio: self.processing_artifact,
            is_available_recorded_audio: self.is_available(),
            is_cleared: self.is_cleared,
            is_preloaded_blob: self.is_preloaded,
            encoder_mime_type: self.encoder_mime.clone(),
            error: self.error.clone(),
        }
    }

    fn diagnostics(&self) -> SessionDiagnostics {
        let capture = self.capture.as_ref();
        let playback = self.playback.as_ref();
        SessionDiagnostics {
            generation: self.generation,
            has_capture_session: capture.is_some(),
            has_encoder: capture.is_some_and(|c| c.encoder.is_some()),
            sampler_active: capture.is_some_and(|c| c.sampler.as_ref().is_some_and(|h| h.is_active())),
            timer_active: capture.is_some_and(|c| c.timer.as_ref().is_some_and(|h| h.is_active())),
            position_tracker_active: playback
                .is_some_and(|p| p.tracker.as_ref().is_some_and(|h| h.is_active())),
            has_player: playback.is_some(),
            has_playable_source: self
                .artifact
                .as_ref()
                .is_some_and(|a| a.playable.is_some()),
            sampler_ticks: self.sampler_ticks,
            timer_ticks: self.timer_ticks,
            tracker_ticks: self.tracker_ticks,
        }
    }
}

/// State and services shared with callbacks through `Weak` references.
pub(crate) struct Shared {
    pub(crate) me: Weak<Shared>,
    pub(crate) devices: Arc<dyn CaptureDevices>,
    pub(crate) audio: Arc<dyn AudioEngine>,
    pub(crate) encoder: Arc<dyn Encoder>,
    pub(crate) decoder: Arc<dyn Decoder>,
    pub(crate) playback_engine: Arc<dyn PlaybackEngine>,
    pub(crate) scheduler: Arc<dyn Scheduler>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) config: VisualizerConfig,
    delegate: Mutex<Option<Arc<dyn VisualizerDelegate>>>,
    pub(crate) state: Mutex<ControllerState>,
}

impl Shared {
    /// Deliver notices to the delegate. Must be called without the state lock.
    pub(crate) fn notify(&self, notices: Vec<Notice>) {
        if notices.is_empty() {
            return;
        }
        let Some(delegate) = self.delegate.lock().clone() else {
            return;
        };
        for notice in notices {
            match notice {
                Notice::RecordingStarted => delegate.on_recording_started(),
                Notice::RecordingPaused => delegate.on_recording_paused(),
                Notice::RecordingResumed => delegate.on_recording_resumed(),
                Notice::RecordingStopped => delegate.on_recording_stopped(),
                Notice::PlaybackStarted => delegate.on_playback_started(),
                Notice::PlaybackResumed => delegate.on_playback_resumed(),
                Notice::PlaybackPaused => delegate.on_playback_paused(),
                Notice::PlaybackEnded => delegate.on_playback_ended(),
                Notice::PlaybackFailed(e) => delegate.on_playback_error(&e),
                Notice::Cleared => delegate.on_cleared(),
                Notice::Error(e) => delegate.on_error(&e),
            }
        }
    }
}

/// Recording, live sampling, decoding and playback behind one read model.
///
/// Dropping the controller runs the full cleanup.
///
/// ```ignore
/// let visualizer = VoiceVisualizer::new(VisualizerConfig::default(), platform)?;
/// visualizer.start_recording();
/// // ... later
/// visualizer.stop_recording();
/// let view = visualizer.snapshot();
/// ```
pub struct VoiceVisualizer {
    pub(crate) shared: Arc<Shared>,
}

impl VoiceVisualizer {
    pub fn new(config: VisualizerConfig, platform: Platform) -> Result<Self, VisualizerError> {
        config.validate().map_err(VisualizerError::Configuration)?;

        let scheduler = platform
            .scheduler
            .unwrap_or_else(|| Arc::new(ThreadScheduler::new(config.frame_interval)) as Arc<dyn Scheduler>);
        let clock = platform
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock::new()) as Arc<dyn Clock>);

        let shared = Arc::new_cyclic(|me| Shared {
            me: me.clone(),
            devices: platform.devices,
            audio: platform.audio,
            encoder: platform.encoder,
            decoder: platform.decoder,
            playback_engine: platform.playback,
            scheduler,
            clock,
            config,
            delegate: Mutex::new(None),
            state: Mutex::new(ControllerState::new()),
        });

        Ok(Self { shared })
    }

    pub fn set_delegate(&self, delegate: Arc<dyn VisualizerDelegate>) {
        *self.shared.delegate.lock() = Some(delegate);
    }

    pub fn config(&self) -> &VisualizerConfig {
        &self.shared.config
    }

    pub fn snapshot(&self) -> VisualizerSnapshot {
        self.shared.state.lock().snapshot()
    }

    pub fn recording_state(&self) -> RecordingState {
        self.shared.state.lock().recording
    }

    pub fn error(&self) -> Option<VisualizerError> {
        self.shared.state.lock().error.clone()
    }

    pub fn diagnostics(&self) -> SessionDiagnostics {
        self.shared.state.lock().diagnostics()
    }

    /// Acquire the configured source(s) and begin recording.
    ///
    /// No-op while recording or while a device request is pending.
    pub fn start_recording(&self) {
        self.shared.start_recording();
    }

    /// Pause/resume the recording, or play/pause the recorded audio when
    /// no recording is in progress.
    pub fn toggle_pause_resume(&self) {
        let (recording, available, playing) = {
            let state = self.shared.state.lock();
            (
                state.recording.is_in_progress(),
                state.is_available(),
                state.playback.as_ref().is_some_and(|p| !p.paused),
            )
        };

        if recording {
            self.shared.toggle_recording_pause();
        } else if available {
            if playing {
                self.shared.pause_playback();
            } else {
                self.shared.start_playback();
            }
        }
    }

    pub fn stop_recording(&self) {
        self.shared.stop_recording();
    }

    pub fn start_audio_playback(&self) {
        self.shared.start_playback();
    }

    pub fn stop_audio_playback(&self) {
        self.shared.pause_playback();
    }

    /// Seek the player to `secs`, clamped into the decoded length.
    pub fn set_current_audio_time(&self, secs: f64) {
        self.shared.seek_playback(secs);
    }

    /// Release every resource and reset all observable state.
    pub fn clear_canvas(&self) {
        self.shared.clear();
    }

    /// Replace whatever is loaded with an externally supplied recording.
    pub fn set_preloaded_audio_blob(&self, blob: EncodedBlob) {
        self.shared.preload(blob);
    }

    /// Write the current recording into `dir`.
    ///
    /// Returns `Ok(None)` when there is no playable recording.
    pub fn save_audio_file(&self, dir: &Path) -> Result<Option<SavedRecording>, VisualizerError> {
        let (artifact, encoder_mime) = {
            let state = self.shared.state.lock();
            match state.artifact.as_ref() {
                Some(artifact) if artifact.playable.is_some() => {
                    (artifact.clone(), state.encoder_mime.clone())
                }
                _ => return Ok(None),
            }
        };

        export_artifact(
            &artifact,
            encoder_mime.as_deref(),
            &self.shared.config.export_base_name,
            dir,
        )
        .inspect_err(|e| log::error!("saving recording failed: {}", e))
        .map(Some)
    }

    /// Whether the host should intercept unload right now.
    pub fn should_block_unload(&self) -> bool {
        self.shared.config.handle_before_unload && !self.shared.state.lock().is_cleared
    }
}

impl Drop for VoiceVisualizer {
    fn drop(&mut self) {
        self.shared.clear();
    }
}
