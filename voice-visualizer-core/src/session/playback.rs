//! Playback controller: play, pause, seek and end-of-stream handling.

use std::sync::Arc;

use crate::models::error::VisualizerError;
use crate::runtime::scheduler::{Cadence, CancelToken, TaskHandle};
use crate::traits::player::{EndedCallback, Player};

use super::visualizer::{Notice, Shared};

/// Rendering state for the current artifact.
pub(crate) struct PlaybackSession {
    pub(crate) player: Box<dyn Player>,
    pub(crate) position: f64,
    pub(crate) paused: bool,
    pub(crate) ended: bool,
    pub(crate) tracker: Option<TaskHandle>,
}

impl PlaybackSession {
    pub(crate) fn new(player: Box<dyn Player>) -> Self {
        Self {
            player,
            position: 0.0,
            paused: true,
            ended: false,
            tracker: None,
        }
    }

    pub(crate) fn cancel_tracker(&self) {
        if let Some(tracker) = self.tracker.as_ref() {
            tracker.cancel();
        }
    }

    /// Cancel the position tracker and hand back its handle for joining.
    pub(crate) fn stop_tracker(&mut self) -> Option<TaskHandle> {
        let tracker = self.tracker.take();
        if let Some(tracker) = tracker.as_ref() {
            tracker.cancel();
        }
        tracker
    }

    /// Detach the ended callback and unload the player.
    ///
    /// Dropping the player drops its clone of the playable source.
    pub(crate) fn release(mut self) {
        if let Some(tracker) = self.tracker.take() {
            tracker.join();
        }
        self.player.set_on_ended(None);
        self.player.unload();
    }
}

impl Shared {
    pub(crate) fn start_playback(&self) {
        let (notices, released) = {
            let mut guard = self.state.lock();
            if guard.recording.is_in_progress() || !guard.is_available() {
                return;
            }
            let generation = guard.generation;
            let state = &mut *guard;
            let Some(playback) = state.playback.as_mut() else {
                return;
            };
            if !playback.paused {
                return;
            }

            let from_start = playback.position == 0.0;
            // Registered first so an end reported during `play` is not lost.
            playback.player.set_on_ended(Some(self.ended_callback(generation)));
            match playback.player.play() {
                Ok(()) => {
                    playback.paused = false;
                    playback.ended = false;
                    playback.tracker = Some(self.spawn_position_tracker());
                    if matches!(state.error, Some(VisualizerError::Playback(_))) {
                        state.error = None;
                    }
                    let notice = if from_start {
                        Notice::PlaybackStarted
                    } else {
                        Notice::PlaybackResumed
                    };
                    (vec![notice], None)
                }
                Err(e) => {
                    log::warn!("playback refused: {}", e);
                    playback.player.set_on_ended(None);
                    let error = VisualizerError::from(e.clone());
                    let released = state.record_fault(error.clone());
                    let mut notices = vec![Notice::PlaybackFailed(e)];
                    if released.is_some() {
                        notices.push(Notice::Cleared);
                    }
                    notices.push(Notice::Error(error));
                    (notices, released)
                }
            }
        };
        if let Some(released) = released {
            released.release();
        }
        self.notify(notices);
    }

    pub(crate) fn pause_playback(&self) {
        let retired = {
            let mut state = self.state.lock();
            if state.recording.is_in_progress() {
                return;
            }
            let Some(playback) = state.playback.as_mut() else {
                return;
            };
            if playback.paused {
                return;
            }

            let retired = playback.stop_tracker();
            playback.player.set_on_ended(None);
            playback.player.pause();
            // The tracker may be one frame behind where the player stopped.
            playback.position = playback.player.position();
            playback.paused = true;
            retired
        };
        if let Some(tracker) = retired {
            tracker.join();
        }
        self.notify(vec![Notice::PlaybackPaused]);
    }

    pub(crate) fn seek_playback(&self, secs: f64) {
        if !secs.is_finite() {
            return;
        }
        let mut guard = self.state.lock();
        if guard.recording.is_in_progress() {
            return;
        }
        let state = &mut *guard;
        let length = state
            .artifact
            .as_ref()
            .and_then(|a| a.decoded.as_ref())
            .map(|d| d.duration_secs())
            .unwrap_or(0.0);
        let Some(playback) = state.playback.as_mut() else {
            return;
        };

        let position = secs.clamp(0.0, length);
        playback.player.seek(position);
        playback.position = position;
        playback.ended = false;
    }

    fn ended_callback(&self, generation: u64) -> EndedCallback {
        let me = self.me.clone();
        Arc::new(move || {
            if let Some(shared) = me.upgrade() {
                shared.finish_playback(generation);
            }
        })
    }

    fn finish_playback(&self, generation: u64) {
        let retired = {
            let mut state = self.state.lock();
            if state.generation != generation {
                return;
            }
            let Some(playback) = state.playback.as_mut() else {
                return;
            };
            if playback.paused {
                return;
            }

            let retired = playback.stop_tracker();
            playback.paused = true;
            playback.ended = true;
            playback.player.seek(0.0);
            playback.position = 0.0;
            retired
        };
        if let Some(tracker) = retired {
            tracker.join();
        }
        log::debug!("playback ended (generation {})", generation);
        self.notify(vec![Notice::PlaybackEnded]);
    }

    fn spawn_position_tracker(&self) -> TaskHandle {
        let me = self.me.clone();
        self.scheduler.schedule(
            "visualizer-playback",
            Cadence::Frame,
            Box::new(move |token: &CancelToken| {
                if let Some(shared) = me.upgrade() {
                    shared.track_position(token);
                }
            }),
        )
    }

    fn track_position(&self, token: &CancelToken) {
        let mut guard = self.state.lock();
        if token.is_cancelled() {
            return;
        }
        let state = &mut *guard;
        if let Some(playback) = state.playback.as_mut() {
            if !playback.paused {
                playback.position = playback.player.position();
                state.tracker_ticks += 1;
            }
        }
    }
}
