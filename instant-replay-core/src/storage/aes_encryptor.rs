use std::collections::HashMap;

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Key, Nonce};

use crate::traits::encryptor::ClipEncryptor;

const NONCE_LEN: usize = 12;

/// AES-256-GCM clip encryptor.
///
/// Encrypted chunk format: `nonce (12B) || ciphertext || tag (16B)`.
/// A fresh random nonce is drawn for every chunk.
pub struct AesGcmClipEncryptor {
    key: [u8; 32],
    key_id: String,
    cipher: Aes256Gcm,
}

impl AesGcmClipEncryptor {
    pub fn new(key: [u8; 32], key_id: impl Into<String>) -> Self {
        Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key)),
            key,
            key_id: key_id.into(),
        }
    }

    /// Create an encryptor with a freshly generated random key.
    pub fn generate(key_id: impl Into<String>) -> Self {
        let key = Aes256Gcm::generate_key(&mut OsRng);
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&key);
        Self::new(bytes, key_id)
    }

    /// The raw key, for handing to whatever stores it.
    pub fn key_bytes(&self) -> &[u8; 32] {
        &self.key
    }

    /// Open a sealed chunk produced by `encrypt`.
    pub fn decrypt(&self, sealed: &[u8]) -> Result<Vec<u8>, String> {
        if sealed.len() < NONCE_LEN {
            return Err("sealed chunk shorter than nonce".into());
        }
        let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
        self.cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|e| format!("AES-GCM decryption failed: {}", e))
    }
}

impl ClipEncryptor for AesGcmClipEncryptor {
    fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>, String> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, data)
            .map_err(|e| format!("AES-GCM encryption failed: {}", e))?;

        // aes-gcm appends the tag to the ciphertext, so only the nonce is prepended.
        let mut combined = Vec::with_capacity(nonce.len() + ciphertext.len());
        combined.extend_from_slice(&nonce);
        combined.extend_from_slice(&ciphertext);
        Ok(combined)
    }

    fn key_metadata(&self) -> HashMap<String, String> {
        HashMap::from([
            ("keyId".to_string(), self.key_id.clone()),
            ("algorithm".to_string(), self.algorithm().to_string()),
        ])
    }

    fn algorithm(&self) -> &str {
        "AES-256-GCM"
    }

    fn clone_box(&self) -> Box<dyn ClipEncryptor> {
        Box::new(Self::new(self.key, self.key_id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_and_open() {
        let encryptor = AesGcmClipEncryptor::generate("test-key");
        let sealed = encryptor.encrypt(b"pcm bytes").unwrap();

        assert_eq!(sealed.len(), 12 + 9 + 16);
        assert_eq!(encryptor.decrypt(&sealed).unwrap(), b"pcm bytes");
    }

    #[test]
    fn nonces_differ_per_chunk() {
        let encryptor = AesGcmClipEncryptor::new([7u8; 32], "k");
        let a = encryptor.encrypt(b"same").unwrap();
        let b = encryptor.encrypt(b"same").unwrap();
        assert_ne!(a[..12], b[..12]);
    }

    #[test]
    fn tampered_chunk_rejected() {
        let encryptor = AesGcmClipEncryptor::new([1u8; 32], "k");
        let mut sealed = encryptor.encrypt(b"audio").unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0xFF;
        assert!(encryptor.decrypt(&sealed).is_err());
    }

    #[test]
    fn clone_box_keeps_key() {
        let encryptor = AesGcmClipEncryptor::new([3u8; 32], "kept");
        let sealed = encryptor.clone_box().encrypt(b"x").unwrap();
        assert_eq!(encryptor.decrypt(&sealed).unwrap(), b"x");
        assert_eq!(encryptor.key_metadata()["keyId"], "kept");
    }
}
