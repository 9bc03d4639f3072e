/// Real-time amplitude metering derived from the sampler window (0.0–1.0).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AudioLevels {
    pub rms_level: f32,
    pub peak_level: f32,
}

/// Which resources the controller currently holds, plus loop counters.
///
/// Every `*_active` flag and `has_*` flag is false after a clear.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionDiagnostics {
    pub generation: u64,
    pub has_capture_session: bool,
    pub has_encoder: bool,
    pub sampler_active: bool,
    pub timer_active: bool,
    pub position_tracker_active: bool,
    pub has_player: bool,
    pub has_playable_source: bool,
    pub sampler_ticks: u64,
    pub timer_ticks: u64,
    pub tracker_ticks: u64,
}
