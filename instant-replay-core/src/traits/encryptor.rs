use std::collections::HashMap;

/// Chunk encryption for saved clips.
///
/// The core ships `AesGcmClipEncryptor`; callers may plug in their own key
/// management by implementing this trait.
///
/// Encrypted chunk format:
/// ```text
/// [12-byte nonce] [ciphertext] [16-byte GCM authentication tag]
/// ```
pub trait ClipEncryptor: Send + Sync {
    /// Encrypt a chunk of PCM data.
    ///
    /// Returns: `nonce (12 bytes) || ciphertext || tag (16 bytes)`
    fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>, String>;

    /// Metadata about the encryption key (e.g., key ID).
    fn key_metadata(&self) -> HashMap<String, String>;

    /// Algorithm identifier (e.g., "AES-256-GCM").
    fn algorithm(&self) -> &str;

    /// Clone this encryptor into a new boxed trait object.
    fn clone_box(&self) -> Box<dyn ClipEncryptor>;
}

// Allow RecorderConfiguration to clone its encryptor via trait object.
impl Clone for Box<dyn ClipEncryptor> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}
