use crate::models::audio_models::AudioLevels;

/// Byte value an analysis window reports for silence.
pub const SILENCE: u8 = 128;

/// Map an unsigned time-domain byte onto `[-1.0, 1.0)`.
pub fn normalize_sample(sample: u8) -> f32 {
    (sample as f32 - SILENCE as f32) / SILENCE as f32
}

/// RMS of a byte window, after centering on silence.
pub fn rms_level(window: &[u8]) -> f32 {
    if window.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = window
        .iter()
        .map(|&s| {
            let v = normalize_sample(s);
            v * v
        })
        .sum();
    (sum_sq / window.len() as f32).sqrt()
}

/// Peak absolute deviation from silence.
pub fn peak_level(window: &[u8]) -> f32 {
    window
        .iter()
        .map(|&s| normalize_sample(s).abs())
        .fold(0.0f32, f32::max)
}

pub fn amplitude_levels(window: &[u8]) -> AudioLevels {
    AudioLevels {
        rms_level: rms_level(window),
        peak_level: peak_level(window),
    }
}
