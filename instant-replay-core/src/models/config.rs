use std::path::PathBuf;

use super::super::traits::encryptor::ClipEncryptor;

/// Default length of the rolling window, in seconds.
pub const DEFAULT_RECORD_SECONDS: f64 = 10.0;

/// Configuration for a replay recorder.
#[derive(Clone)]
pub struct RecorderConfiguration {
    /// Seconds of audio kept in the rolling buffer (default: 10).
    pub record_seconds: f64,

    /// Directory used by `save_clip` for auto-named clips.
    pub output_directory: PathBuf,

    /// Optional encryptor for AES-256-GCM clip output.
    pub encryptor: Option<Box<dyn ClipEncryptor>>,

    /// Write a `.metadata.json` sidecar next to each saved clip.
    pub write_metadata: bool,
}

impl RecorderConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        validate_record_seconds(self.record_seconds)
    }
}

pub(crate) fn validate_record_seconds(record_seconds: f64) -> Result<(), String> {
    if !record_seconds.is_finite() {
        return Err(format!("record duration must be finite, got {}", record_seconds));
    }
    if record_seconds <= 0.0 {
        return Err(format!("record duration must be positive, got {}", record_seconds));
    }
    Ok(())
}

impl Default for RecorderConfiguration {
    fn default() -> Self {
        Self {
            record_seconds: DEFAULT_RECORD_SECONDS,
            encryptor: None,
            output_directory: PathBuf::from("."),
            write_metadata: false,
        }
    }
}
