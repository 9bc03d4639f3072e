use std::sync::Arc;

use crate::models::artifact::PlayableSource;
use crate::models::error::PlaybackError;

/// Called once when playback reaches the end of the stream.
pub type EndedCallback = Arc<dyn Fn() + Send + Sync + 'static>;

/// A player bound to one playable source.
///
/// Methods are called with the controller's state lock held and must not
/// invoke the ended callback from inside the call.
pub trait Player: Send {
    fn play(&mut self) -> Result<(), PlaybackError>;

    fn pause(&mut self);

    /// Current position in seconds.
    fn position(&self) -> f64;

    fn seek(&mut self, secs: f64);

    fn set_on_ended(&mut self, callback: Option<EndedCallback>);

    /// Pause and detach from the source.
    fn unload(&mut self);
}

/// Creates players.
pub trait PlaybackEngine: Send + Sync {
    fn create_player(&self, source: PlayableSource) -> Box<dyn Player>;
}
