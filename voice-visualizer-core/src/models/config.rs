use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Which capture source(s) a recording pulls from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioSourceKind {
    /// Local microphone only.
    #[default]
    User,
    /// Shared browser-tab audio only.
    Display,
    /// Microphone and shared-tab audio, merged into one stream.
    Both,
}

impl AudioSourceKind {
    pub fn wants_user(&self) -> bool {
        matches!(self, Self::User | Self::Both)
    }

    pub fn wants_display(&self) -> bool {
        matches!(self, Self::Display | Self::Both)
    }
}

/// Trim applied to every decoded duration to hide trailing encoder padding.
pub const DEFAULT_DURATION_TRIM_SECS: f64 = 0.06;

/// Configuration for a visualizer controller.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualizerConfig {
    /// Capture source selector (default: `User`).
    pub audio_source: AudioSourceKind,

    /// Ask the host to intercept unload while a session is uncleared (default: true).
    pub handle_before_unload: bool,

    /// Seconds removed from each decoded duration (default: 0.06).
    pub duration_trim_secs: f64,

    /// Recording-time accumulation period (default: 1 s).
    pub timer_interval: Duration,

    /// Frame period used by schedulers that pace frames themselves (default: 16 ms).
    pub frame_interval: Duration,

    /// File name used by `save_audio_file`, without extension.
    pub export_base_name: String,
}

impl VisualizerConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !self.duration_trim_secs.is_finite() || self.duration_trim_secs < 0.0 {
            return Err(format!(
                "duration trim must be a non-negative number: {}",
                self.duration_trim_secs
            ));
        }
        if self.timer_interval.is_zero() {
            return Err("timer interval must be positive".into());
        }
        if self.frame_interval.is_zero() {
            return Err("frame interval must be positive".into());
        }
        if self.export_base_name.trim().is_empty() {
            return Err("export base name must not be empty".into());
        }
        Ok(())
    }
}

impl Default for VisualizerConfig {
    fn default() -> Self {
        Self {
            audio_source: AudioSourceKind::User,
            handle_before_unload: true,
            duration_trim_secs: DEFAULT_DURATION_TRIM_SECS,
            timer_interval: Duration::from_secs(1),
            frame_interval: Duration::from_millis(16),
            export_base_name: "recorded_audio".into(),
        }
    }
}
