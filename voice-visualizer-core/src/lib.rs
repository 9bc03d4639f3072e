//! # voice-visualizer-core
//!
//! Platform-agnostic voice recording and visualization controller.
//!
//! Drives a record / pause / stop lifecycle over platform capture devices,
//! samples the live signal for drawing, decodes the finished recording and
//! plays it back, all behind one snapshot-style read model. Hosts plug in
//! their device, encoder, decoder and player implementations through the
//! traits in `traits/` and observe changes through `VisualizerDelegate`.
//!
//! ## Architecture
//!
//! ```text
//! voice-visualizer-core (this crate)
//! ├── traits/       ← CaptureDevices, AudioEngine, Encoder, Decoder, PlaybackEngine, VisualizerDelegate
//! ├── models/       ← VisualizerError, RecordingState, VisualizerConfig, artifacts, snapshot
//! ├── runtime/      ← Completion, Scheduler (thread / manual), Clock
//! ├── processing/   ← amplitude levels
//! ├── session/      ← VoiceVisualizer (acquisition, capture, sampler, decode, playback, cleanup)
//! └── storage/      ← export with checksum
//! ```

pub mod models;
pub mod processing;
pub mod runtime;
pub mod session;
pub mod storage;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::artifact::{ArtifactOrigin, DecodedAudio, EncodedBlob, PlayableSource, RecordedArtifact};
pub use models::audio_models::{AudioLevels, SessionDiagnostics};
pub use models::config::{AudioSourceKind, VisualizerConfig, DEFAULT_DURATION_TRIM_SECS};
pub use models::error::{AcquisitionError, DecodeError, PlaybackError, VisualizerError};
pub use models::snapshot::VisualizerSnapshot;
pub use models::state::{PlaybackState, RecordingState};
pub use runtime::clock::{Clock, ManualClock, SystemClock};
pub use runtime::completion::Completion;
pub use runtime::scheduler::{join_all, Cadence, CancelToken, ManualScheduler, Scheduler, TaskHandle, ThreadScheduler};
pub use session::visualizer::{Platform, VoiceVisualizer};
pub use storage::export::SavedRecording;
pub use traits::audio_engine::{AnalysisNode, AudioContext, AudioEngine};
pub use traits::capture_devices::{CaptureDevices, DisplayCaptureRequest, DisplaySurface, MediaStream, MediaTrack, TrackKind};
pub use traits::decoder::Decoder;
pub use traits::delegate::VisualizerDelegate;
pub use traits::encoder::{DataCallback, EncodedChunk, Encoder, EncoderSession};
pub use traits::player::{EndedCallback, PlaybackEngine, Player};
