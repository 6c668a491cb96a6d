use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::audio_models::AudioFormat;

/// Result returned when a replay clip has been written to disk.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedClip {
    pub file_path: PathBuf,
    pub duration_secs: f64,
    /// PCM bytes in the clip (excludes header and encryption framing).
    pub data_len: usize,
    pub metadata: ClipMetadata,
    pub checksum: String,
}

/// Metadata stored alongside a saved clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipMetadata {
    pub id: String,
    pub duration_secs: f64,
    pub file_path: String,
    pub checksum: String,
    pub format: AudioFormat,
    pub is_encrypted: bool,
    pub created_at: String,
    pub encryption_algorithm: Option<String>,
    pub encryption_key_id: Option<String>,
}

impl ClipMetadata {
    pub fn new(
        duration_secs: f64,
        file_path: &str,
        checksum: &str,
        format: AudioFormat,
        encryption_algorithm: Option<String>,
        encryption_key_id: Option<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            duration_secs,
            file_path: file_path.to_string(),
            checksum: checksum.to_string(),
            format,
            is_encrypted: encryption_algorithm.is_some(),
            created_at: chrono::Utc::now().to_rfc3339(),
            encryption_algorithm,
            encryption_key_id,
        }
    }
}
