use crate::models::error::AcquisitionError;

use super::capture_devices::MediaStream;

/// Fixed-size time-domain sample window attached to a stream.
pub trait AnalysisNode: Send {
    /// Number of bytes `read_time_domain` fills.
    fn window_len(&self) -> usize;

    /// Copy the current window into `out` (128 = silence).
    fn read_time_domain(&mut self, out: &mut [u8]);

    fn disconnect(&mut self);
}

/// An audio processing context (the capture-device session).
pub trait AudioContext: Send {
    /// Route every stream into one shared destination and return it.
    fn merge(&mut self, streams: &[MediaStream]) -> Result<MediaStream, AcquisitionError>;

    fn create_analyser(
        &mut self,
        stream: &MediaStream,
    ) -> Result<Box<dyn AnalysisNode>, AcquisitionError>;

    fn is_closed(&self) -> bool;

    fn close(&mut self);
}

/// Opens audio contexts.
pub trait AudioEngine: Send + Sync {
    fn open_context(&self) -> Result<Box<dyn AudioContext>, AcquisitionError>;
}
