use std::sync::Arc;

use crate::models::error::AcquisitionError;

use super::capture_devices::MediaStream;

/// One piece of encoder output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedChunk {
    pub bytes: Vec<u8>,
    /// Set on the chunk emitted by `stop`.
    pub is_final: bool,
}

/// Callback receiving encoder output, possibly from another thread.
pub type DataCallback = Arc<dyn Fn(EncodedChunk) + Send + Sync + 'static>;

/// A running encoder bound to one stream.
pub trait EncoderSession: Send {
    /// Negotiated output format, e.g. `audio/webm;codecs=opus`.
    fn mime_type(&self) -> String;

    fn start(&mut self, on_data: DataCallback) -> Result<(), AcquisitionError>;

    fn pause(&mut self);

    fn resume(&mut self);

    /// Stop encoding. Emits one final chunk through the data callback.
    fn stop(&mut self);
}

/// Opens encoder sessions.
pub trait Encoder: Send + Sync {
    fn open(&self, stream: &MediaStream) -> Result<Box<dyn EncoderSession>, AcquisitionError>;
}
