//! Capture-source acquisition and merging.
//!
//! Requests the microphone, the shared tab, or both, and hands back one
//! logical stream. The pre-merge sources are returned alongside the merged
//! stream because merging does not own their device tracks.

use std::sync::Arc;

use crate::models::config::AudioSourceKind;
use crate::models::error::AcquisitionError;
use crate::runtime::completion::Completion;
use crate::traits::audio_engine::{AudioContext, AudioEngine};
use crate::traits::capture_devices::{CaptureDevices, DisplayCaptureRequest, MediaStream};

/// Streams obtained for one recording.
pub struct AcquiredStreams {
    /// What the encoder and analyser read from.
    pub stream: MediaStream,
    /// Every device stream, each of which must be stopped individually.
    pub sources: Vec<MediaStream>,
    /// Merge context when more than one source was combined.
    pub mixer: Option<Box<dyn AudioContext>>,
}

impl AcquiredStreams {
    /// Stop every track and close the merge context.
    pub fn release(mut self) {
        self.stream.stop_all();
        for source in &self.sources {
            source.stop_all();
        }
        if let Some(mut mixer) = self.mixer.take() {
            if !mixer.is_closed() {
                mixer.close();
            }
        }
    }
}

pub type AcquireCallback = Box<dyn FnOnce(Result<AcquiredStreams, AcquisitionError>) + Send + 'static>;

/// Request the configured source(s) and report one result through `done`.
///
/// On failure every source already obtained is stopped before `done` runs.
pub fn acquire(
    devices: Arc<dyn CaptureDevices>,
    engine: Arc<dyn AudioEngine>,
    kind: AudioSourceKind,
    done: AcquireCallback,
) {
    let acquisition = Acquisition {
        devices,
        engine,
        kind,
        sources: Vec::new(),
        done,
    };
    if kind.wants_user() {
        acquisition.request_user();
    } else {
        acquisition.request_display();
    }
}

struct Acquisition {
    devices: Arc<dyn CaptureDevices>,
    engine: Arc<dyn AudioEngine>,
    kind: AudioSourceKind,
    sources: Vec<MediaStream>,
    done: AcquireCallback,
}

impl Acquisition {
    fn request_user(self) {
        let devices = Arc::clone(&self.devices);
        devices.request_user_audio(Completion::new(move |result| self.on_user_stream(result)));
    }

    fn on_user_stream(mut self, result: Option<Result<MediaStream, AcquisitionError>>) {
        match result.unwrap_or(Err(AcquisitionError::Abandoned)) {
            Ok(stream) => {
                self.sources.push(stream);
                if self.kind.wants_display() {
                    self.request_display();
                } else {
                    self.finish();
                }
            }
            Err(e) => self.fail(e),
        }
    }

    fn request_display(self) {
        let devices = Arc::clone(&self.devices);
        devices.request_display_media(
            DisplayCaptureRequest::browser_tab_audio(),
            Completion::new(move |result| self.on_display_stream(result)),
        );
    }

    fn on_display_stream(mut self, result: Option<Result<MediaStream, AcquisitionError>>) {
        let display = match result.unwrap_or(Err(AcquisitionError::Abandoned)) {
            Ok(stream) => stream,
            Err(e) => return self.fail(e),
        };

        if display.audio_tracks().is_empty() {
            display.stop_video_tracks();
            display.stop_all();
            return self.fail(AcquisitionError::NoAudioTrack);
        }

        // Only the audio is recorded; the shared picture is released right away.
        let audio_only = display.audio_only();
        display.stop_video_tracks();
        self.sources.push(audio_only);
        self.finish();
    }

    fn finish(mut self) {
        match self.sources.len() {
            0 => self.fail(AcquisitionError::DeviceNotAvailable),
            1 => {
                let stream = self.sources[0].clone();
                let sources = std::mem::take(&mut self.sources);
                (self.done)(Ok(AcquiredStreams {
                    stream,
                    sources,
                    mixer: None,
                }));
            }
            _ => match self.merge() {
                Ok((stream, mixer)) => {
                    let sources = std::mem::take(&mut self.sources);
                    (self.done)(Ok(AcquiredStreams {
                        stream,
                        sources,
                        mixer: Some(mixer),
                    }));
                }
                Err(e) => self.fail(e),
            },
        }
    }

    fn merge(&self) -> Result<(MediaStream, Box<dyn AudioContext>), AcquisitionError> {
        let mut mixer = self.engine.open_context()?;
        match mixer.merge(&self.sources) {
            Ok(merged) => Ok((merged, mixer)),
            Err(e) => {
                mixer.close();
                Err(e)
            }
        }
    }

    fn fail(self, error: AcquisitionError) {
        log::warn!("capture acquisition failed: {}", error);
        for source in &self.sources {
            source.stop_all();
        }
        (self.done)(Err(error));
    }
}
