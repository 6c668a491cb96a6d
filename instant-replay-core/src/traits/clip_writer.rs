use std::path::Path;

use crate::models::audio_models::AudioFormat;
use crate::models::error::ReplayError;

/// Persists a snapshot as an audio file.
///
/// Implementations must flush and release the file handle before returning,
/// on success and on error.
pub trait ClipWriter: Send + Sync {
    /// Write `bytes` tagged with `format` to `path`.
    ///
    /// Returns the SHA-256 hex checksum of the finished file.
    fn write(&self, path: &Path, format: &AudioFormat, bytes: &[u8]) -> Result<String, ReplayError>;

    /// Algorithm name when the writer encrypts its output.
    fn encryption_algorithm(&self) -> Option<String> {
        None
    }

    /// Key identifier when the writer encrypts its output.
    fn encryption_key_id(&self) -> Option<String> {
        None
    }
}
