use std::fs::{self, File};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::models::audio_models::AudioFormat;
use crate::models::error::ReplayError;
use crate::processing::wav_format;
use crate::traits::clip_writer::ClipWriter;
use crate::traits::encryptor::ClipEncryptor;

/// Plaintext bytes sealed per encrypted chunk.
pub const ENCRYPTED_CHUNK_SIZE: usize = 64 * 1024;

/// Streaming WAV file writer with optional AES-256-GCM chunk encryption.
///
/// ## File Format
///
/// **Plaintext (no encryptor):**
/// ```text
/// [44-byte WAV header]
/// [raw PCM data...]
/// ```
///
/// **Encrypted (with encryptor):**
/// ```text
/// [44-byte WAV header, unencrypted]
/// [Chunk 1: 4-byte LE length | sealed box (nonce + ciphertext + tag)]
/// [Chunk 2: ...]
/// ...
/// ```
///
/// Dropping an open writer closes the file handle without patching the
/// header; callers that hit an error simply let it go out of scope.
pub struct ClipFileWriter {
    file_path: PathBuf,
    encryptor: Option<Box<dyn ClipEncryptor>>,
    file: Option<File>,
    total_bytes_written: u64,
}

impl ClipFileWriter {
    pub fn new(file_path: PathBuf, encryptor: Option<Box<dyn ClipEncryptor>>) -> Self {
        Self {
            file_path,
            encryptor,
            file: None,
            total_bytes_written: 0,
        }
    }

    /// Create the file and write the initial 44-byte WAV header.
    pub fn open(&mut self, format: &AudioFormat) -> Result<(), ReplayError> {
        if self.file.is_some() {
            return Ok(());
        }

        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| ReplayError::StorageError(format!("failed to create directory: {}", e)))?;
            }
        }

        let file = File::create(&self.file_path)
            .map_err(|e| ReplayError::StorageError(format!("failed to create file: {}", e)))?;
        self.file = Some(file);

        // data size placeholder, patched on close
        let header = wav_format::generate_wav_header(format, 0);
        self.write_raw(&header)
    }

    /// Write audio data, sealing it first when an encryptor is configured.
    pub fn write(&mut self, data: &[u8]) -> Result<(), ReplayError> {
        if self.file.is_none() {
            return Err(ReplayError::StorageError("file is not open for writing".into()));
        }

        if let Some(ref encryptor) = self.encryptor {
            let encrypted = encryptor
                .encrypt(data)
                .map_err(|e| ReplayError::EncryptionFailed(format!("chunk encryption failed: {}", e)))?;

            let chunk_length = (encrypted.len() as u32).to_le_bytes();
            self.write_raw(&chunk_length)?;
            self.write_raw(&encrypted)?;
        } else {
            self.write_raw(data)?;
        }

        Ok(())
    }

    /// Patch the header sizes, flush, release the handle, and return the
    /// SHA-256 checksum of the finished file.
    pub fn close(&mut self) -> Result<String, ReplayError> {
        let mut file = self
            .file
            .take()
            .ok_or_else(|| ReplayError::StorageError("file is not open".into()))?;

        let data_size = self.total_bytes_written - wav_format::WAV_HEADER_SIZE as u64;
        let mut sizes = [0u8; wav_format::WAV_HEADER_SIZE];
        wav_format::patch_file_size(&mut sizes, self.total_bytes_written)?;
        wav_format::patch_data_size(&mut sizes, data_size)?;

        file.seek(SeekFrom::Start(4))
            .map_err(|e| ReplayError::StorageError(e.to_string()))?;
        file.write_all(&sizes[4..8])
            .map_err(|e| ReplayError::StorageError(e.to_string()))?;
        file.seek(SeekFrom::Start(40))
            .map_err(|e| ReplayError::StorageError(e.to_string()))?;
        file.write_all(&sizes[40..44])
            .map_err(|e| ReplayError::StorageError(e.to_string()))?;

        file.flush().map_err(|e| ReplayError::StorageError(e.to_string()))?;
        file.sync_all()
            .map_err(|e| ReplayError::StorageError(format!("sync failed: {}", e)))?;
        drop(file);

        sha256_file(&self.file_path)
    }

    /// Total bytes written so far (including WAV header).
    pub fn bytes_written(&self) -> u64 {
        self.total_bytes_written
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    fn write_raw(&mut self, data: &[u8]) -> Result<(), ReplayError> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| ReplayError::StorageError("file is not open".into()))?;
        file.write_all(data)
            .map_err(|e| ReplayError::StorageError(format!("write failed: {}", e)))?;
        self.total_bytes_written += data.len() as u64;
        Ok(())
    }
}

/// Default `ClipWriter`: a WAV file, optionally chunk-encrypted.
#[derive(Clone, Default)]
pub struct WavClipWriter {
    encryptor: Option<Box<dyn ClipEncryptor>>,
}

impl WavClipWriter {
    pub fn new(encryptor: Option<Box<dyn ClipEncryptor>>) -> Self {
        Self { encryptor }
    }

    pub fn is_encrypted(&self) -> bool {
        self.encryptor.is_some()
    }
}

impl ClipWriter for WavClipWriter {
    fn write(&self, path: &Path, format: &AudioFormat, bytes: &[u8]) -> Result<String, ReplayError> {
        if bytes.len() as u64 > wav_format::MAX_DATA_SIZE {
            return Err(ReplayError::StorageError(format!(
                "{} byte window does not fit in a WAV file",
                bytes.len()
            )));
        }

        let mut writer = ClipFileWriter::new(path.to_path_buf(), self.encryptor.clone());
        writer.open(format)?;

        if self.encryptor.is_some() {
            for chunk in bytes.chunks(ENCRYPTED_CHUNK_SIZE) {
                writer.write(chunk)?;
            }
        } else {
            writer.write(bytes)?;
        }

        writer.close()
    }

    fn encryption_algorithm(&self) -> Option<String> {
        self.encryptor.as_ref().map(|e| e.algorithm().to_string())
    }

    fn encryption_key_id(&self) -> Option<String> {
        self.encryptor
            .as_ref()
            .and_then(|e| e.key_metadata().get("keyId").cloned())
    }
}

/// Read a plaintext WAV clip back into its format and PCM bytes.
pub fn read_wav(path: &Path) -> Result<(AudioFormat, Vec<u8>), ReplayError> {
    let data = fs::read(path)
        .map_err(|e| ReplayError::StorageError(format!("failed to read clip: {}", e)))?;
    let (format, range) = wav_format::parse_wav(&data)?;
    Ok((format, data[range].to_vec()))
}

/// Compute SHA-256 hex digest of a file.
fn sha256_file(path: &Path) -> Result<String, ReplayError> {
    let data = fs::read(path)
        .map_err(|e| ReplayError::StorageError(format!("failed to read file for checksum: {}", e)))?;
    let digest = Sha256::digest(&data);
    Ok(hex_encode(&digest))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
