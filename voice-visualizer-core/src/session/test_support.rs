//! In-memory platform services for controller tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::models::artifact::{DecodedAudio, PlayableSource};
use crate::models::config::{AudioSourceKind, VisualizerConfig};
use crate::models::error::{AcquisitionError, DecodeError, PlaybackError, VisualizerError};
use crate::runtime::clock::ManualClock;
use crate::runtime::completion::Completion;
use crate::runtime::scheduler::ManualScheduler;
use crate::traits::audio_engine::{AnalysisNode, AudioContext, AudioEngine};
use crate::traits::capture_devices::{
    CaptureDevices, DisplayCaptureRequest, MediaStream, MediaTrack, TrackKind,
};
use crate::traits::decoder::Decoder;
use crate::traits::delegate::VisualizerDelegate;
use crate::traits::encoder::{DataCallback, EncodedChunk, Encoder, EncoderSession};
use crate::traits::player::{EndedCallback, PlaybackEngine, Player};

use super::visualizer::{Platform, VoiceVisualizer};

pub(crate) const ENCODED_PAYLOAD: &[u8] = b"fake-webm-payload";
pub(crate) const ENCODER_MIME: &str = "audio/webm;codecs=opus";

// -- Tracks --

pub(crate) struct FakeTrack {
    kind: TrackKind,
    live: AtomicBool,
}

impl FakeTrack {
    fn new(kind: TrackKind) -> Arc<Self> {
        Arc::new(Self {
            kind,
            live: AtomicBool::new(true),
        })
    }
}

impl MediaTrack for FakeTrack {
    fn kind(&self) -> TrackKind {
        self.kind
    }

    fn stop(&self) {
        self.live.store(false, Ordering::SeqCst);
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }
}

fn stream_of(tracks: &[Arc<FakeTrack>]) -> MediaStream {
    MediaStream::new(
        tracks
            .iter()
            .map(|t| Arc::clone(t) as Arc<dyn MediaTrack>)
            .collect(),
    )
}

// -- Capture devices --

/// How a fake device request answers.
#[derive(Debug, Clone)]
pub(crate) enum StreamOutcome {
    /// Audio track (plus a video track for display requests).
    Audio,
    /// Display stream with video but no audio.
    VideoOnly,
    Fail(AcquisitionError),
    /// Drop the completion without answering.
    Abandon,
    /// Hold the completion until `resolve_pending`.
    Defer,
}

type StreamCompletion = Completion<Result<MediaStream, AcquisitionError>>;

pub(crate) struct FakeDevices {
    user: Mutex<StreamOutcome>,
    display: Mutex<StreamOutcome>,
    tracks: Mutex<Vec<Arc<FakeTrack>>>,
    pending: Mutex<Vec<(bool, StreamCompletion)>>,
    display_requests: Mutex<Vec<DisplayCaptureRequest>>,
    user_requests: AtomicUsize,
}

impl FakeDevices {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            user: Mutex::new(StreamOutcome::Audio),
            display: Mutex::new(StreamOutcome::Audio),
            tracks: Mutex::new(Vec::new()),
            pending: Mutex::new(Vec::new()),
            display_requests: Mutex::new(Vec::new()),
            user_requests: AtomicUsize::new(0),
        })
    }

    pub(crate) fn set_user(&self, outcome: StreamOutcome) {
        *self.user.lock() = outcome;
    }

    pub(crate) fn set_display(&self, outcome: StreamOutcome) {
        *self.display.lock() = outcome;
    }

    pub(crate) fn live_tracks(&self) -> usize {
        self.tracks.lock().iter().filter(|t| t.is_live()).count()
    }

    pub(crate) fn live_video_tracks(&self) -> usize {
        self.tracks
            .lock()
            .iter()
            .filter(|t| t.is_live() && t.kind == TrackKind::Video)
            .count()
    }

    pub(crate) fn last_display_request(&self) -> Option<DisplayCaptureRequest> {
        self.display_requests.lock().last().cloned()
    }

    pub(crate) fn user_requests(&self) -> usize {
        self.user_requests.load(Ordering::SeqCst)
    }

    /// Answer every deferred request with a working stream.
    pub(crate) fn resolve_pending(&self) {
        let pending = std::mem::take(&mut *self.pending.lock());
        for (display, done) in pending {
            done.resolve(Ok(self.make_stream(display, false)));
        }
    }

    fn make_stream(&self, display: bool, video_only: bool) -> MediaStream {
        let mut tracks = Vec::new();
        if !video_only {
            tracks.push(FakeTrack::new(TrackKind::Audio));
        }
        if display {
            tracks.push(FakeTrack::new(TrackKind::Video));
        }
        self.tracks.lock().extend(tracks.iter().cloned());
        stream_of(&tracks)
    }

    fn respond(&self, display: bool, outcome: StreamOutcome, done: StreamCompletion) {
        match outcome {
            StreamOutcome::Audio => done.resolve(Ok(self.make_stream(display, false))),
            StreamOutcome::VideoOnly => done.resolve(Ok(self.make_stream(display, true))),
            StreamOutcome::Fail(e) => done.resolve(Err(e)),
            StreamOutcome::Abandon => drop(done),
            StreamOutcome::Defer => self.pending.lock().push((display, done)),
        }
    }
}

impl CaptureDevices for FakeDevices {
    fn request_user_audio(&self, done: StreamCompletion) {
        self.user_requests.fetch_add(1, Ordering::SeqCst);
        let outcome = self.user.lock().clone();
        self.respond(false, outcome, done);
    }

    fn request_display_media(&self, request: DisplayCaptureRequest, done: StreamCompletion) {
        self.display_requests.lock().push(request);
        let outcome = self.display.lock().clone();
        self.respond(true, outcome, done);
    }
}

// -- Audio engine --

#[derive(Default)]
struct EngineInner {
    contexts: Mutex<Vec<Arc<AtomicBool>>>,
    merged_tracks: Mutex<Vec<Arc<FakeTrack>>>,
    merges: AtomicUsize,
    fail_merge: AtomicBool,
    analysers_connected: AtomicUsize,
}

pub(crate) struct FakeAudioEngine {
    inner: Arc<EngineInner>,
}

impl FakeAudioEngine {
    pub(crate) const WINDOW_LEN: usize = 32;

    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Arc::new(EngineInner::default()),
        })
    }

    pub(crate) fn merge_calls(&self) -> usize {
        self.inner.merges.load(Ordering::SeqCst)
    }

    pub(crate) fn fail_merge(&self, fail: bool) {
        self.inner.fail_merge.store(fail, Ordering::SeqCst);
    }

    /// Contexts opened and not yet closed.
    pub(crate) fn open_contexts(&self) -> usize {
        self.inner
            .contexts
            .lock()
            .iter()
            .filter(|closed| !closed.load(Ordering::SeqCst))
            .count()
    }

    pub(crate) fn live_tracks(&self) -> usize {
        self.inner
            .merged_tracks
            .lock()
            .iter()
            .filter(|t| t.is_live())
            .count()
    }

    pub(crate) fn analysers_connected(&self) -> usize {
        self.inner.analysers_connected.load(Ordering::SeqCst)
    }
}

impl AudioEngine for FakeAudioEngine {
    fn open_context(&self) -> Result<Box<dyn AudioContext>, AcquisitionError> {
        let closed = Arc::new(AtomicBool::new(false));
        self.inner.contexts.lock().push(Arc::clone(&closed));
        Ok(Box::new(FakeContext {
            inner: Arc::clone(&self.inner),
            closed,
        }))
    }
}

struct FakeContext {
    inner: Arc<EngineInner>,
    closed: Arc<AtomicBool>,
}

impl AudioContext for FakeContext {
    fn merge(&mut self, _streams: &[MediaStream]) -> Result<MediaStream, AcquisitionError> {
        self.inner.merges.fetch_add(1, Ordering::SeqCst);
        if self.inner.fail_merge.load(Ordering::SeqCst) {
            return Err(AcquisitionError::Platform("merge rejected".into()));
        }
        let track = FakeTrack::new(TrackKind::Audio);
        self.inner.merged_tracks.lock().push(Arc::clone(&track));
        Ok(stream_of(&[track]))
    }

    fn create_analyser(
        &mut self,
        _stream: &MediaStream,
    ) -> Result<Box<dyn AnalysisNode>, AcquisitionError> {
        self.inner.analysers_connected.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeAnalyser {
            inner: Arc::clone(&self.inner),
            frame: 0,
            connected: true,
        }))
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

struct FakeAnalyser {
    inner: Arc<EngineInner>,
    frame: u8,
    connected: bool,
}

impl AnalysisNode for FakeAnalyser {
    fn window_len(&self) -> usize {
        FakeAudioEngine::WINDOW_LEN
    }

    /// Frame `n` reads as a constant `128 + n`.
    fn read_time_domain(&mut self, out: &mut [u8]) {
        self.frame = self.frame.wrapping_add(1);
        out.fill(128u8.wrapping_add(self.frame));
    }

    fn disconnect(&mut self) {
        if self.connected {
            self.connected = false;
            self.inner.analysers_connected.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

// -- Encoder --

struct EncoderInner {
    payload: Mutex<Vec<u8>>,
    header: Mutex<Option<Vec<u8>>>,
    active: Mutex<Option<DataCallback>>,
    defer_final: AtomicBool,
    pending_final: Mutex<Vec<(DataCallback, EncodedChunk)>>,
    events: Mutex<Vec<&'static str>>,
}

pub(crate) struct FakeEncoder {
    inner: Arc<EncoderInner>,
}

impl FakeEncoder {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Arc::new(EncoderInner {
                payload: Mutex::new(ENCODED_PAYLOAD.to_vec()),
                header: Mutex::new(None),
                active: Mutex::new(None),
                defer_final: AtomicBool::new(false),
                pending_final: Mutex::new(Vec::new()),
                events: Mutex::new(Vec::new()),
            }),
        })
    }

    /// Bytes carried by the final chunk.
    pub(crate) fn set_payload(&self, payload: &[u8]) {
        *self.inner.payload.lock() = payload.to_vec();
    }

    /// Bytes emitted from inside `start`, before it returns.
    pub(crate) fn set_header(&self, header: &[u8]) {
        *self.inner.header.lock() = Some(header.to_vec());
    }

    pub(crate) fn defer_final(&self, defer: bool) {
        self.inner.defer_final.store(defer, Ordering::SeqCst);
    }

    /// Deliver final chunks held back by `defer_final`.
    pub(crate) fn flush_final(&self) {
        let pending = std::mem::take(&mut *self.inner.pending_final.lock());
        for (callback, chunk) in pending {
            callback(chunk);
        }
    }

    /// Emit a mid-recording segment from the running session.
    pub(crate) fn emit_segment(&self, bytes: &[u8]) {
        let callback = self.inner.active.lock().clone();
        if let Some(callback) = callback {
            callback(EncodedChunk {
                bytes: bytes.to_vec(),
                is_final: false,
            });
        }
    }

    pub(crate) fn events(&self) -> Vec<&'static str> {
        self.inner.events.lock().clone()
    }

    pub(crate) fn stops(&self) -> usize {
        self.events().iter().filter(|e| **e == "stop").count()
    }
}

impl Encoder for FakeEncoder {
    fn open(&self, _stream: &MediaStream) -> Result<Box<dyn EncoderSession>, AcquisitionError> {
        self.inner.events.lock().push("open");
        Ok(Box::new(FakeEncoderSession {
            inner: Arc::clone(&self.inner),
            on_data: None,
        }))
    }
}

struct FakeEncoderSession {
    inner: Arc<EncoderInner>,
    on_data: Option<DataCallback>,
}

impl EncoderSession for FakeEncoderSession {
    fn mime_type(&self) -> String {
        ENCODER_MIME.into()
    }

    fn start(&mut self, on_data: DataCallback) -> Result<(), AcquisitionError> {
        self.inner.events.lock().push("start");
        *self.inner.active.lock() = Some(Arc::clone(&on_data));
        let header = self.inner.header.lock().clone();
        if let Some(bytes) = header {
            on_data(EncodedChunk {
                bytes,
                is_final: false,
            });
        }
        self.on_data = Some(on_data);
        Ok(())
    }

    fn pause(&mut self) {
        self.inner.events.lock().push("pause");
    }

    fn resume(&mut self) {
        self.inner.events.lock().push("resume");
    }

    fn stop(&mut self) {
        self.inner.events.lock().push("stop");
        *self.inner.active.lock() = None;
        let Some(callback) = self.on_data.take() else {
            return;
        };
        let chunk = EncodedChunk {
            bytes: self.inner.payload.lock().clone(),
            is_final: true,
        };
        if self.inner.defer_final.load(Ordering::SeqCst) {
            self.inner.pending_final.lock().push((callback, chunk));
        } else {
            callback(chunk);
        }
    }
}

// -- Decoder --

type DecodeCompletion = Completion<Result<DecodedAudio, DecodeError>>;

pub(crate) struct FakeDecoder {
    defer: AtomicBool,
    decoded_secs: Mutex<f64>,
    pending: Mutex<Vec<(Arc<[u8]>, DecodeCompletion)>>,
    calls: AtomicUsize,
}

impl FakeDecoder {
    pub(crate) const SAMPLE_RATE: u32 = 1000;

    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            defer: AtomicBool::new(false),
            decoded_secs: Mutex::new(3.0),
            pending: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn defer(&self, defer: bool) {
        self.defer.store(defer, Ordering::SeqCst);
    }

    pub(crate) fn set_decoded_secs(&self, secs: f64) {
        *self.decoded_secs.lock() = secs;
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn pending(&self) -> usize {
        self.pending.lock().len()
    }

    pub(crate) fn resolve_pending(&self) {
        let pending = std::mem::take(&mut *self.pending.lock());
        for (bytes, done) in pending {
            done.resolve(self.decode_now(&bytes));
        }
    }

    /// Blobs starting with `bad` fail as malformed.
    fn decode_now(&self, bytes: &[u8]) -> Result<DecodedAudio, DecodeError> {
        if bytes.starts_with(b"bad") {
            return Err(DecodeError::Malformed("unrecognized container".into()));
        }
        let frames = (*self.decoded_secs.lock() * Self::SAMPLE_RATE as f64).round() as usize;
        Ok(DecodedAudio::new(Self::SAMPLE_RATE, vec![vec![0.0; frames]]))
    }
}

impl Decoder for FakeDecoder {
    fn decode(&self, bytes: Arc<[u8]>, done: DecodeCompletion) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.defer.load(Ordering::SeqCst) {
            self.pending.lock().push((bytes, done));
        } else {
            done.resolve(self.decode_now(&bytes));
        }
    }
}

// -- Playback --

#[derive(Default)]
struct PlayerInner {
    position: Mutex<f64>,
    playing: AtomicBool,
    refuse: Mutex<Option<PlaybackError>>,
    end_on_play: AtomicBool,
    on_ended: Mutex<Option<EndedCallback>>,
    created: AtomicUsize,
    live: AtomicUsize,
    sources: Mutex<Vec<PlayableSource>>,
}

pub(crate) struct FakePlayback {
    inner: Arc<PlayerInner>,
}

impl FakePlayback {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Arc::new(PlayerInner::default()),
        })
    }

    /// Simulate the player advancing.
    pub(crate) fn set_position(&self, secs: f64) {
        *self.inner.position.lock() = secs;
    }

    pub(crate) fn position(&self) -> f64 {
        *self.inner.position.lock()
    }

    pub(crate) fn is_playing(&self) -> bool {
        self.inner.playing.load(Ordering::SeqCst)
    }

    pub(crate) fn refuse(&self, error: Option<PlaybackError>) {
        *self.inner.refuse.lock() = error;
    }

    /// Report end of stream from another thread as soon as `play` starts.
    pub(crate) fn end_on_play(&self, end: bool) {
        self.inner.end_on_play.store(end, Ordering::SeqCst);
    }

    pub(crate) fn created(&self) -> usize {
        self.inner.created.load(Ordering::SeqCst)
    }

    pub(crate) fn live_players(&self) -> usize {
        self.inner.live.load(Ordering::SeqCst)
    }

    pub(crate) fn last_source(&self) -> Option<PlayableSource> {
        self.inner.sources.lock().last().cloned()
    }

    /// Reach end of stream, as the platform would.
    pub(crate) fn fire_ended(&self) {
        let callback = self.inner.on_ended.lock().clone();
        self.inner.playing.store(false, Ordering::SeqCst);
        if let Some(callback) = callback {
            callback();
        }
    }
}

impl PlaybackEngine for FakePlayback {
    fn create_player(&self, source: PlayableSource) -> Box<dyn Player> {
        self.inner.created.fetch_add(1, Ordering::SeqCst);
        self.inner.live.fetch_add(1, Ordering::SeqCst);
        self.inner.sources.lock().push(source.clone());
        *self.inner.position.lock() = 0.0;
        Box::new(FakePlayer {
            inner: Arc::clone(&self.inner),
            _source: source,
            loaded: true,
        })
    }
}

struct FakePlayer {
    inner: Arc<PlayerInner>,
    _source: PlayableSource,
    loaded: bool,
}

impl Player for FakePlayer {
    fn play(&mut self) -> Result<(), PlaybackError> {
        if let Some(e) = self.inner.refuse.lock().clone() {
            return Err(e);
        }
        self.inner.playing.store(true, Ordering::SeqCst);
        if self.inner.end_on_play.load(Ordering::SeqCst) {
            let callback = self.inner.on_ended.lock().clone();
            if let Some(callback) = callback {
                std::thread::spawn(move || callback());
            }
        }
        Ok(())
    }

    fn pause(&mut self) {
        self.inner.playing.store(false, Ordering::SeqCst);
    }

    fn position(&self) -> f64 {
        *self.inner.position.lock()
    }

    fn seek(&mut self, secs: f64) {
        *self.inner.position.lock() = secs;
    }

    fn set_on_ended(&mut self, callback: Option<EndedCallback>) {
        *self.inner.on_ended.lock() = callback;
    }

    fn unload(&mut self) {
        self.inner.playing.store(false, Ordering::SeqCst);
        if self.loaded {
            self.loaded = false;
            self.inner.live.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl Drop for FakePlayer {
    fn drop(&mut self) {
        self.unload();
    }
}

// -- Delegate --

#[derive(Default)]
pub(crate) struct RecordingDelegate {
    events: Mutex<Vec<String>>,
}

impl RecordingDelegate {
    pub(crate) fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    pub(crate) fn count(&self, name: &str) -> usize {
        self.events.lock().iter().filter(|e| *e == name).count()
    }

    fn push(&self, name: &str) {
        self.events.lock().push(name.to_string());
    }
}

impl VisualizerDelegate for RecordingDelegate {
    fn on_recording_started(&self) {
        self.push("recording_started");
    }

    fn on_recording_paused(&self) {
        self.push("recording_paused");
    }

    fn on_recording_resumed(&self) {
        self.push("recording_resumed");
    }

    fn on_recording_stopped(&self) {
        self.push("recording_stopped");
    }

    fn on_playback_started(&self) {
        self.push("playback_started");
    }

    fn on_playback_resumed(&self) {
        self.push("playback_resumed");
    }

    fn on_playback_paused(&self) {
        self.push("playback_paused");
    }

    fn on_playback_ended(&self) {
        self.push("playback_ended");
    }

    fn on_playback_error(&self, _error: &PlaybackError) {
        self.push("playback_error");
    }

    fn on_cleared(&self) {
        self.push("cleared");
    }

    fn on_error(&self, _error: &VisualizerError) {
        self.push("error");
    }
}

// -- Harness --

/// One of each fake service.
pub(crate) struct Fakes {
    pub(crate) devices: Arc<FakeDevices>,
    pub(crate) engine: Arc<FakeAudioEngine>,
    pub(crate) encoder: Arc<FakeEncoder>,
    pub(crate) decoder: Arc<FakeDecoder>,
    pub(crate) playback: Arc<FakePlayback>,
}

impl Fakes {
    pub(crate) fn new() -> Self {
        Self {
            devices: FakeDevices::new(),
            engine: FakeAudioEngine::new(),
            encoder: FakeEncoder::new(),
            decoder: FakeDecoder::new(),
            playback: FakePlayback::new(),
        }
    }

    /// Platform over these fakes with the default runtime.
    pub(crate) fn platform(&self) -> Platform {
        Platform::new(
            Arc::clone(&self.devices) as Arc<dyn CaptureDevices>,
            Arc::clone(&self.engine) as Arc<dyn AudioEngine>,
            Arc::clone(&self.encoder) as Arc<dyn Encoder>,
            Arc::clone(&self.decoder) as Arc<dyn Decoder>,
            Arc::clone(&self.playback) as Arc<dyn PlaybackEngine>,
        )
    }
}

pub(crate) struct Harness {
    pub(crate) visualizer: VoiceVisualizer,
    pub(crate) devices: Arc<FakeDevices>,
    pub(crate) engine: Arc<FakeAudioEngine>,
    pub(crate) encoder: Arc<FakeEncoder>,
    pub(crate) decoder: Arc<FakeDecoder>,
    pub(crate) playback: Arc<FakePlayback>,
    pub(crate) scheduler: ManualScheduler,
    pub(crate) clock: ManualClock,
    pub(crate) delegate: Arc<RecordingDelegate>,
}

impl Harness {
    pub(crate) fn new(source: AudioSourceKind) -> Self {
        Self::with_config(VisualizerConfig {
            audio_source: source,
            ..Default::default()
        })
    }

    pub(crate) fn with_config(config: VisualizerConfig) -> Self {
        let fakes = Fakes::new();
        let clock = ManualClock::new();
        let scheduler = ManualScheduler::new(clock.clone());
        let platform = fakes
            .platform()
            .with_runtime(Arc::new(scheduler.clone()), Arc::new(clock.clone()));

        let visualizer = match VoiceVisualizer::new(config, platform) {
            Ok(v) => v,
            Err(e) => panic!("invalid test config: {}", e),
        };
        let delegate = Arc::new(RecordingDelegate::default());
        visualizer.set_delegate(Arc::clone(&delegate) as Arc<dyn VisualizerDelegate>);

        Self {
            visualizer,
            devices: fakes.devices,
            engine: fakes.engine,
            encoder: fakes.encoder,
            decoder: fakes.decoder,
            playback: fakes.playback,
            scheduler,
            clock,
            delegate,
        }
    }

    pub(crate) fn advance_secs(&self, secs: f64) {
        self.scheduler.advance(Duration::from_secs_f64(secs));
    }

    /// No handle, loop, track, context or player survives.
    pub(crate) fn assert_nothing_held(&self) {
        let d = self.visualizer.diagnostics();
        assert!(!d.has_capture_session, "capture session still held");
        assert!(!d.has_encoder, "encoder still held");
        assert!(!d.sampler_active, "sampler still active");
        assert!(!d.timer_active, "timer still active");
        assert!(!d.position_tracker_active, "position tracker still active");
        assert!(!d.has_player, "player still held");
        assert!(!d.has_playable_source, "playable source still held");
        assert_eq!(
            self.scheduler.active_tasks(),
            0,
            "live tasks: {:?}",
            self.scheduler.active_task_names()
        );
        assert_eq!(self.devices.live_tracks(), 0, "device tracks still live");
        assert_eq!(self.engine.live_tracks(), 0, "merged tracks still live");
        assert_eq!(self.engine.open_contexts(), 0, "audio contexts still open");
        assert_eq!(self.playback.live_players(), 0, "players still loaded");
    }
}
