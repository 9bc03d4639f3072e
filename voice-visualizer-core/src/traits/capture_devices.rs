use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use crate::models::error::AcquisitionError;
use crate::runtime::completion::Completion;

/// Kind of media carried by a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Audio,
    Video,
}

/// A single device-backed media track.
///
/// Stopping a track releases the underlying device. `stop` must be idempotent.
pub trait MediaTrack: Send + Sync {
    fn kind(&self) -> TrackKind;

    fn stop(&self);

    fn is_live(&self) -> bool;
}

/// A handle to a set of tracks.
///
/// Clones share the same tracks. Building a stream from another stream's
/// tracks does not transfer device ownership: each original must still be
/// stopped.
#[derive(Clone)]
pub struct MediaStream {
    id: Uuid,
    tracks: Vec<Arc<dyn MediaTrack>>,
}

impl MediaStream {
    pub fn new(tracks: Vec<Arc<dyn MediaTrack>>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tracks,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn tracks(&self) -> &[Arc<dyn MediaTrack>] {
        &self.tracks
    }

    pub fn audio_tracks(&self) -> Vec<Arc<dyn MediaTrack>> {
        self.tracks_of(TrackKind::Audio)
    }

    pub fn video_tracks(&self) -> Vec<Arc<dyn MediaTrack>> {
        self.tracks_of(TrackKind::Video)
    }

    /// A new stream holding only this stream's audio tracks.
    pub fn audio_only(&self) -> Self {
        Self::new(self.audio_tracks())
    }

    pub fn stop_video_tracks(&self) {
        for track in self.video_tracks() {
            track.stop();
        }
    }

    pub fn stop_all(&self) {
        for track in &self.tracks {
            track.stop();
        }
    }

    pub fn has_live_tracks(&self) -> bool {
        self.tracks.iter().any(|t| t.is_live())
    }

    fn tracks_of(&self, kind: TrackKind) -> Vec<Arc<dyn MediaTrack>> {
        self.tracks
            .iter()
            .filter(|t| t.kind() == kind)
            .cloned()
            .collect()
    }
}

impl fmt::Debug for MediaStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaStream")
            .field("id", &self.id)
            .field("tracks", &self.tracks.len())
            .finish()
    }
}

/// Which surfaces a shared-screen request may offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplaySurface {
    BrowserTab,
    Window,
    Monitor,
}

/// Screen-share request parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayCaptureRequest {
    pub audio: bool,
    pub surface: DisplaySurface,
    pub prefer_current_tab: bool,
    /// Allow the user to switch to a different surface type mid-share.
    pub allow_surface_switching: bool,
    /// Offer the requesting tab itself.
    pub allow_self_surface: bool,
}

impl DisplayCaptureRequest {
    /// Audio from another browser tab, with every cross-surface path disabled.
    pub fn browser_tab_audio() -> Self {
        Self {
            audio: true,
            surface: DisplaySurface::BrowserTab,
            prefer_current_tab: false,
            allow_surface_switching: false,
            allow_self_surface: false,
        }
    }
}

/// Platform capture-device service.
///
/// Each request resolves its completion exactly once, possibly from another
/// thread. Implementations must not resolve while the caller is still inside
/// the request method if they share locks with the caller.
pub trait CaptureDevices: Send + Sync {
    /// Request the local microphone (`{ audio: true }`).
    fn request_user_audio(&self, done: Completion<Result<MediaStream, AcquisitionError>>);

    /// Request a shared surface with audio.
    fn request_display_media(
        &self,
        request: DisplayCaptureRequest,
        done: Completion<Result<MediaStream, AcquisitionError>>,
    );
}
