use thiserror::Error;

/// Errors produced by the replay engine and its collaborators.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReplayError {
    /// The device was asked to start while already running.
    ///
    /// The recorder treats this as success; backends return it so the
    /// recorder can tell it apart from a real start failure.
    #[error("capture already started")]
    AlreadyStarted,

    #[error("capture unavailable")]
    CaptureUnavailable,

    #[error("invalid record duration: {0}")]
    InvalidDuration(String),

    #[error("capture format changed: {0}")]
    FormatChanged(String),

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("save failed: {0}")]
    SaveFailed(String),

    #[error("playback failed: {0}")]
    PlaybackFailed(String),

    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("unknown error: {0}")]
    Unknown(String),
}
