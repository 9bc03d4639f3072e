use std::sync::Arc;

use crate::models::artifact::DecodedAudio;
use crate::models::error::DecodeError;
use crate::runtime::completion::Completion;

/// Platform decode service.
pub trait Decoder: Send + Sync {
    /// Decode `bytes` and resolve `done` exactly once.
    fn decode(&self, bytes: Arc<[u8]>, done: Completion<Result<DecodedAudio, DecodeError>>);
}
