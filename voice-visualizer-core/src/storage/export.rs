use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::models::artifact::{ArtifactOrigin, RecordedArtifact};
use crate::models::error::VisualizerError;

/// Extension used when the MIME type is missing or unrecognized.
pub const DEFAULT_EXTENSION: &str = ".webm";

/// A recording written to disk by `save_audio_file`.
///
/// Serializable so hosts can keep their own index of saved takes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedRecording {
    /// Id of the artifact the file was written from.
    pub artifact_id: String,
    pub file_path: PathBuf,
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub duration_secs: f64,
    pub origin: ArtifactOrigin,
    /// Lowercase hex SHA-256 of the written bytes.
    pub checksum: String,
    pub exported_at: DateTime<Utc>,
}

/// File extension (with leading dot) for an encoder MIME type.
///
/// Codec parameters such as `;codecs=opus` are ignored.
pub fn extension_for_mime(mime_type: Option<&str>) -> &'static str {
    let Some(mime) = mime_type else {
        return DEFAULT_EXTENSION;
    };
    let essence = mime
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match essence.as_str() {
        "audio/webm" | "video/webm" => ".webm",
        "audio/ogg" | "application/ogg" => ".ogg",
        "audio/mp4" | "video/mp4" => ".mp4",
        "audio/x-m4a" | "audio/m4a" => ".m4a",
        "audio/mpeg" | "audio/mp3" => ".mp3",
        "audio/wav" | "audio/wave" | "audio/x-wav" => ".wav",
        "audio/aac" => ".aac",
        "audio/flac" | "audio/x-flac" => ".flac",
        _ => DEFAULT_EXTENSION,
    }
}

/// Write an artifact's encoded bytes to `dir/<base_name><ext>`.
///
/// The extension comes from the artifact's MIME type, then `fallback_mime`.
pub fn export_artifact(
    artifact: &RecordedArtifact,
    fallback_mime: Option<&str>,
    base_name: &str,
    dir: &Path,
) -> Result<SavedRecording, VisualizerError> {
    let mime = Some(artifact.blob.mime_type())
        .filter(|m| !m.is_empty())
        .or(fallback_mime);
    let file_name = format!("{}{}", base_name, extension_for_mime(mime));
    let file_path = dir.join(&file_name);

    fs::create_dir_all(dir)
        .map_err(|e| VisualizerError::Storage(format!("cannot create {}: {}", dir.display(), e)))?;
    fs::write(&file_path, artifact.blob.bytes())
        .map_err(|e| VisualizerError::Storage(format!("cannot write {}: {}", file_path.display(), e)))?;

    log::debug!("saved {} bytes to {}", artifact.blob.size(), file_path.display());

    Ok(SavedRecording {
        artifact_id: artifact.id.to_string(),
        file_path,
        file_name,
        mime_type: mime.unwrap_or_default().to_string(),
        size_bytes: artifact.blob.size() as u64,
        duration_secs: artifact.duration_secs,
        origin: artifact.origin,
        checksum: sha256_hex(artifact.blob.bytes()),
        exported_at: Utc::now(),
    })
}

fn sha256_hex(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}
