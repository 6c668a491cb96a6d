use std::fs;
use std::path::{Path, PathBuf};

use crate::models::error::ReplayError;
use crate::models::saved_clip::ClipMetadata;

/// Path of the JSON sidecar for a clip: `clip.wav` → `clip.metadata.json`.
pub fn metadata_path(clip_path: &Path) -> PathBuf {
    clip_path.with_extension("metadata.json")
}

/// Write clip metadata as a JSON sidecar file.
pub fn write_metadata(metadata: &ClipMetadata, clip_path: &Path) -> Result<(), ReplayError> {
    let json = serde_json::to_string_pretty(metadata)
        .map_err(|e| ReplayError::StorageError(format!("failed to serialize metadata: {}", e)))?;
    fs::write(metadata_path(clip_path), json)
        .map_err(|e| ReplayError::StorageError(format!("failed to write metadata: {}", e)))?;
    Ok(())
}

/// Read clip metadata from its JSON sidecar file.
pub fn read_metadata(clip_path: &Path) -> Result<ClipMetadata, ReplayError> {
    let json = fs::read_to_string(metadata_path(clip_path))
        .map_err(|e| ReplayError::StorageError(format!("failed to read metadata: {}", e)))?;
    let metadata: ClipMetadata = serde_json::from_str(&json)
        .map_err(|e| ReplayError::StorageError(format!("failed to parse metadata: {}", e)))?;
    Ok(metadata)
}
