//! Recording controller: start, pause/resume and stop of capture.

use std::sync::Arc;
use std::time::Duration;

use crate::models::artifact::{ArtifactOrigin, EncodedBlob};
use crate::models::error::AcquisitionError;
use crate::models::state::RecordingState;
use crate::processing::levels::SILENCE;
use crate::runtime::scheduler::{join_all, Cadence, CancelToken, TaskHandle};
use crate::traits::audio_engine::{AnalysisNode, AudioContext, AudioEngine};
use crate::traits::capture_devices::MediaStream;
use crate::traits::encoder::{DataCallback, EncodedChunk, Encoder, EncoderSession};

use super::acquisition::{self, AcquiredStreams};
use super::visualizer::{Notice, Shared};

/// Live resources backing one in-progress recording.
pub(crate) struct CaptureSession {
    pub(crate) stream: MediaStream,
    pub(crate) sources: Vec<MediaStream>,
    pub(crate) mixer: Option<Box<dyn AudioContext>>,
    pub(crate) context: Option<Box<dyn AudioContext>>,
    pub(crate) analyser: Option<Box<dyn AnalysisNode>>,
    /// Reused by every sampler tick.
    pub(crate) window: Vec<u8>,
    pub(crate) encoder: Option<Box<dyn EncoderSession>>,
    pub(crate) sampler: Option<TaskHandle>,
    pub(crate) timer: Option<TaskHandle>,
}

impl CaptureSession {
    fn from_acquired(acquired: AcquiredStreams) -> Self {
        Self {
            stream: acquired.stream,
            sources: acquired.sources,
            mixer: acquired.mixer,
            context: None,
            analyser: None,
            window: Vec::new(),
            encoder: None,
            sampler: None,
            timer: None,
        }
    }

    /// Open the analysis context and start the encoder on the merged stream.
    fn attach(
        &mut self,
        audio: &dyn AudioEngine,
        encoder: &dyn Encoder,
        on_data: DataCallback,
    ) -> Result<(), AcquisitionError> {
        let context = self.context.insert(audio.open_context()?);
        let analyser = context.create_analyser(&self.stream)?;
        self.window = vec![SILENCE; analyser.window_len()];
        self.analyser = Some(analyser);

        let mut session = encoder.open(&self.stream)?;
        session.start(on_data)?;
        self.encoder = Some(session);
        Ok(())
    }

    pub(crate) fn mime_type(&self) -> Option<String> {
        self.encoder.as_ref().map(|e| e.mime_type())
    }

    /// Cancel both loops without giving up their handles.
    pub(crate) fn cancel_loops(&self) {
        for task in [self.sampler.as_ref(), self.timer.as_ref()].into_iter().flatten() {
            task.cancel();
        }
    }

    /// Cancel both loops and hand back their handles for joining.
    pub(crate) fn stop_loops(&mut self) -> Vec<TaskHandle> {
        let loops: Vec<TaskHandle> = [self.sampler.take(), self.timer.take()]
            .into_iter()
            .flatten()
            .collect();
        for task in &loops {
            task.cancel();
        }
        loops
    }

    /// Stop the encoder, every track and both contexts.
    ///
    /// The encoder's final chunk is delivered during this call or later;
    /// whether it is kept depends on the controller generation.
    pub(crate) fn release(mut self) {
        join_all(self.stop_loops());
        if let Some(mut encoder) = self.encoder.take() {
            encoder.stop();
        }
        self.stream.stop_all();
        for source in &self.sources {
            source.stop_all();
        }
        if let Some(mut analyser) = self.analyser.take() {
            analyser.disconnect();
        }
        for mut context in [self.context.take(), self.mixer.take()].into_iter().flatten() {
            if !context.is_closed() {
                context.close();
            }
        }
    }
}

impl Shared {
    pub(crate) fn start_recording(&self) {
        let needs_clear = {
            let state = self.state.lock();
            if state.recording.is_in_progress() || state.recording.is_acquiring() {
                log::debug!("start ignored in {:?}", state.recording);
                return;
            }
            !state.is_cleared
        };
        if needs_clear {
            self.clear();
        }

        let generation = {
            let mut state = self.state.lock();
            if state.recording.is_in_progress() || state.recording.is_acquiring() {
                return;
            }
            state.generation += 1;
            state.recording = RecordingState::AcquiringDevice;
            state.pending_output.clear();
            state.generation
        };
        log::debug!(
            "acquiring {:?} capture for generation {}",
            self.config.audio_source,
            generation
        );

        let me = self.me.clone();
        acquisition::acquire(
            Arc::clone(&self.devices),
            Arc::clone(&self.audio),
            self.config.audio_source,
            Box::new(move |result| match me.upgrade() {
                Some(shared) => shared.finish_start(generation, result),
                None => {
                    if let Ok(acquired) = result {
                        acquired.release();
                    }
                }
            }),
        );
    }

    fn finish_start(&self, generation: u64, result: Result<AcquiredStreams, AcquisitionError>) {
        let still_wanted = {
            let state = self.state.lock();
            state.generation == generation && state.recording.is_acquiring()
        };
        if !still_wanted {
            log::debug!("discarding superseded acquisition for generation {}", generation);
            if let Ok(acquired) = result {
                acquired.release();
            }
            return;
        }

        let acquired = match result {
            Ok(acquired) => acquired,
            Err(e) => return self.fail_if_current(generation, e.into()),
        };

        let mut session = CaptureSession::from_acquired(acquired);
        let on_data = self.data_callback(generation);
        if let Err(e) = session.attach(self.audio.as_ref(), self.encoder.as_ref(), on_data) {
            session.release();
            return self.fail_if_current(generation, e.into());
        }

        let superseded = {
            let mut state = self.state.lock();
            if state.generation != generation || !state.recording.is_acquiring() {
                Some(session)
            } else {
                state.baseline = self.clock.now();
                state.recording_time = 0.0;
                // Chunks emitted while the encoder started are already in `pending_output`.
                state.encoder_mime = session.mime_type();
                state.error = None;
                state.is_cleared = false;
                session.sampler = Some(self.spawn_sampler());
                session.timer = Some(self.spawn_timer());
                state.capture = Some(session);
                state.recording = RecordingState::Recording;
                None
            }
        };

        match superseded {
            Some(session) => {
                log::debug!("acquisition for generation {} superseded during setup", generation);
                session.release();
            }
            None => {
                log::debug!("recording started (generation {})", generation);
                self.notify(vec![Notice::RecordingStarted]);
            }
        }
    }

    /// Toggle `Recording ⇄ Paused`. Other states are left alone.
    pub(crate) fn toggle_recording_pause(&self) {
        let (notice, retired) = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            let Some(capture) = state.capture.as_mut() else {
                return;
            };
            let now = self.clock.now();

            match state.recording {
                RecordingState::Recording => {
                    state.recording_time += now.saturating_sub(state.baseline).as_secs_f64();
                    state.baseline = now;
                    let retired = capture.stop_loops();
                    if let Some(encoder) = capture.encoder.as_mut() {
                        encoder.pause();
                    }
                    state.recording = RecordingState::Paused;
                    (Notice::RecordingPaused, retired)
                }
                RecordingState::Paused => {
                    state.baseline = now;
                    capture.sampler = Some(self.spawn_sampler());
                    capture.timer = Some(self.spawn_timer());
                    if let Some(encoder) = capture.encoder.as_mut() {
                        encoder.resume();
                    }
                    state.recording = RecordingState::Recording;
                    (Notice::RecordingResumed, Vec::new())
                }
                _ => return,
            }
        };
        join_all(retired);
        log::debug!("recording {:?}", notice);
        self.notify(vec![notice]);
    }

    pub(crate) fn stop_recording(&self) {
        let session = {
            let mut state = self.state.lock();
            if !state.recording.is_in_progress() {
                return;
            }
            let Some(session) = state.capture.take() else {
                return;
            };
            session.cancel_loops();
            state.recording = RecordingState::Stopping;
            state.recording_time = 0.0;
            state.baseline = Duration::ZERO;
            state.processing_artifact = true;
            session
        };

        self.notify(vec![Notice::RecordingStopped]);
        session.release();
    }

    fn data_callback(&self, generation: u64) -> DataCallback {
        let me = self.me.clone();
        Arc::new(move |chunk: EncodedChunk| {
            if let Some(shared) = me.upgrade() {
                shared.on_encoded_chunk(generation, chunk);
            }
        })
    }

    fn on_encoded_chunk(&self, generation: u64, chunk: EncodedChunk) {
        let blob = {
            let mut state = self.state.lock();
            // The encoder may emit its header while `start` is still running.
            let accepting = state.recording.is_in_progress()
                || state.recording.is_acquiring()
                || state.recording == RecordingState::Stopping;
            if state.generation != generation || !accepting {
                log::debug!(
                    "dropping {} encoded bytes from generation {}",
                    chunk.bytes.len(),
                    generation
                );
                return;
            }

            state.pending_output.extend_from_slice(&chunk.bytes);
            if !chunk.is_final || state.recording != RecordingState::Stopping {
                return;
            }

            state.recording = RecordingState::Idle;
            let bytes = std::mem::take(&mut state.pending_output);
            EncodedBlob::new(bytes, state.encoder_mime.clone().unwrap_or_default())
        };

        self.begin_decode(generation, blob, ArtifactOrigin::Recorded);
    }

    fn spawn_timer(&self) -> TaskHandle {
        let me = self.me.clone();
        self.scheduler.schedule(
            "visualizer-timer",
            Cadence::Every(self.config.timer_interval),
            Box::new(move |token: &CancelToken| {
                if let Some(shared) = me.upgrade() {
                    shared.accumulate_recording_time(token);
                }
            }),
        )
    }

    fn accumulate_recording_time(&self, token: &CancelToken) {
        let mut state = self.state.lock();
        if token.is_cancelled() || state.recording != RecordingState::Recording {
            return;
        }
        let now = self.clock.now();
        state.recording_time += now.saturating_sub(state.baseline).as_secs_f64();
        state.baseline = now;
        state.timer_ticks += 1;
    }
}
