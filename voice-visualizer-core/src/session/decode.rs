//! Turns an encoded blob into a playable source and a decoded buffer.

use std::sync::Arc;

use crate::models::artifact::{ArtifactOrigin, DecodedAudio, EncodedBlob, PlayableSource, RecordedArtifact};
use crate::models::error::{DecodeError, VisualizerError};
use crate::models::state::RecordingState;
use crate::runtime::completion::Completion;

use super::playback::PlaybackSession;
use super::visualizer::Shared;

impl Shared {
    /// Make `blob` the current artifact and decode it.
    ///
    /// The previous artifact is dropped before decoding starts; a player
    /// still holding its source keeps that source alive until it is released.
    pub(crate) fn begin_decode(&self, generation: u64, blob: EncodedBlob, origin: ArtifactOrigin) {
        let superseded = {
            let mut state = self.state.lock();
            if state.generation != generation {
                log::debug!("not decoding blob from superseded generation {}", generation);
                return;
            }
            state.artifact = Some(RecordedArtifact::new(blob.clone(), origin));
            state.processing_artifact = true;
            state.playback.take()
        };
        if let Some(playback) = superseded {
            playback.release();
        }

        if blob.is_empty() {
            return self.fail_if_current(generation, VisualizerError::EmptyArtifact);
        }

        log::debug!(
            "decoding {} bytes of {} (generation {})",
            blob.size(),
            blob.mime_type(),
            generation
        );
        let me = self.me.clone();
        self.decoder.decode(
            blob.shared_bytes(),
            Completion::new(move |result: Option<Result<DecodedAudio, DecodeError>>| {
                if let Some(shared) = me.upgrade() {
                    shared.finish_decode(generation, result.unwrap_or(Err(DecodeError::Abandoned)));
                }
            }),
        );
    }

    fn finish_decode(&self, generation: u64, result: Result<DecodedAudio, DecodeError>) {
        let decoded = match result {
            Ok(decoded) => decoded,
            Err(e) => return self.fail_if_current(generation, e.into()),
        };

        let source = {
            let state = self.state.lock();
            match state.artifact.as_ref() {
                Some(artifact) if state.generation == generation => PlayableSource::from_blob(&artifact.blob),
                _ => {
                    log::debug!("dropping decoded audio from generation {}", generation);
                    return;
                }
            }
        };

        let player = self.playback_engine.create_player(source.clone());

        let stale = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            match state.artifact.as_mut() {
                Some(artifact) if state.generation == generation => {
                    artifact.duration_secs = decoded.trimmed_duration_secs(self.config.duration_trim_secs);
                    artifact.decoded = Some(Arc::new(decoded));
                    artifact.playable = Some(source);
                    state.playback = Some(PlaybackSession::new(player));
                    state.processing_artifact = false;
                    state.error = None;
                    None
                }
                _ => Some(PlaybackSession::new(player)),
            }
        };

        match stale {
            Some(playback) => playback.release(),
            None => log::debug!("artifact ready (generation {})", generation),
        }
    }

    /// Load an externally supplied recording without touching capture devices.
    pub(crate) fn preload(&self, blob: EncodedBlob) {
        self.clear();

        let generation = {
            let mut state = self.state.lock();
            state.is_preloaded = true;
            state.is_cleared = false;
            state.processing_artifact = true;
            state.recording = RecordingState::Idle;
            state.recording_time = 0.0;
            state.generation
        };

        self.begin_decode(generation, blob, ArtifactOrigin::Preloaded);
    }
}
