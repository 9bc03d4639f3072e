use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Raw encoded audio bytes plus their MIME type.
///
/// Cheap to clone; the bytes are shared.
#[derive(Clone, PartialEq, Eq)]
pub struct EncodedBlob {
    bytes: Arc<[u8]>,
    mime_type: String,
}

impl EncodedBlob {
    pub fn new(bytes: impl Into<Vec<u8>>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes: Arc::from(bytes.into()),
            mime_type: mime_type.into(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn shared_bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for EncodedBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedBlob")
            .field("size", &self.bytes.len())
            .field("mime_type", &self.mime_type)
            .finish()
    }
}

/// A locally resolvable reference to a blob that a player can open.
///
/// Released when the last clone is dropped, so a player still holding a
/// superseded source keeps it alive until the player itself goes away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayableSource {
    id: Uuid,
    blob: EncodedBlob,
}

impl PlayableSource {
    pub fn from_blob(blob: &EncodedBlob) -> Self {
        Self {
            id: Uuid::new_v4(),
            blob: blob.clone(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// `blob:`-style locator for hosts that address sources by string.
    pub fn locator(&self) -> String {
        format!("blob:{}", self.id)
    }

    pub fn blob(&self) -> &EncodedBlob {
        &self.blob
    }
}

/// Channel-accurate decoded PCM.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub sample_rate: u32,
    /// One vector of samples per channel, all the same length.
    pub channels: Vec<Vec<f32>>,
}

impl DecodedAudio {
    pub fn new(sample_rate: u32, channels: Vec<Vec<f32>>) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Frames per channel.
    pub fn frames(&self) -> usize {
        self.channels.first().map(Vec::len).unwrap_or(0)
    }

    /// Decoded length in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Decoded length minus the encoder-flush trim, clamped at zero.
    pub fn trimmed_duration_secs(&self, trim_secs: f64) -> f64 {
        (self.duration_secs() - trim_secs).max(0.0)
    }
}

/// Where an artifact came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactOrigin {
    Recorded,
    Preloaded,
}

/// Output of a finished or externally supplied recording.
#[derive(Debug, Clone)]
pub struct RecordedArtifact {
    pub id: Uuid,
    pub blob: EncodedBlob,
    pub origin: ArtifactOrigin,
    pub created_at: DateTime<Utc>,
    /// Set together with `decoded` once decoding succeeds.
    pub playable: Option<PlayableSource>,
    pub decoded: Option<Arc<DecodedAudio>>,
    pub duration_secs: f64,
}

impl RecordedArtifact {
    pub fn new(blob: EncodedBlob, origin: ArtifactOrigin) -> Self {
        Self {
            id: Uuid::new_v4(),
            blob,
            origin,
            created_at: Utc::now(),
            playable: None,
            decoded: None,
            duration_secs: 0.0,
        }
    }

    pub fn is_decoded(&self) -> bool {
        self.decoded.is_some()
    }
}
