//! Live amplitude sampling while a recording is running.

use crate::models::state::RecordingState;
use crate::processing::levels::amplitude_levels;
use crate::runtime::scheduler::{Cadence, CancelToken, TaskHandle};

use super::visualizer::Shared;

impl Shared {
    /// Start the per-frame sampler. Cancelled on pause, stop and clear.
    pub(crate) fn spawn_sampler(&self) -> TaskHandle {
        let me = self.me.clone();
        self.scheduler.schedule(
            "visualizer-sampler",
            Cadence::Frame,
            Box::new(move |token: &CancelToken| {
                if let Some(shared) = me.upgrade() {
                    shared.sample_frame(token);
                }
            }),
        )
    }

    /// Read one time-domain window and publish a copy of it.
    fn sample_frame(&self, token: &CancelToken) {
        let mut guard = self.state.lock();
        if token.is_cancelled() || guard.recording != RecordingState::Recording {
            return;
        }
        let state = &mut *guard;
        let Some(capture) = state.capture.as_mut() else {
            return;
        };
        let Some(analyser) = capture.analyser.as_mut() else {
            return;
        };

        analyser.read_time_domain(&mut capture.window);
        state.audio_data.clone_from(&capture.window);
        state.levels = amplitude_levels(&capture.window);
        state.sampler_ticks += 1;
    }
}
