//! WAV file format utilities.
//!
//! Generates standard 44-byte RIFF WAV headers, patches their size fields
//! after a clip is written, and parses headers back for reloading clips.

use std::ops::Range;

use crate::models::audio_models::{AudioFormat, SampleKind};
use crate::models::error::ReplayError;

/// Size of the standard WAV RIFF header in bytes.
pub const WAV_HEADER_SIZE: usize = 44;

/// Largest `data` chunk whose RIFF size (`36 + data_size`) fits in a u32.
pub const MAX_DATA_SIZE: u64 = u32::MAX as u64 - 36;

const FORMAT_PCM: u16 = 1;
const FORMAT_IEEE_FLOAT: u16 = 3;
const FORMAT_EXTENSIBLE: u16 = 0xFFFE;

/// Generate a 44-byte WAV RIFF header.
///
/// Layout:
/// ```text
/// [0-3]    "RIFF"
/// [4-7]    file size - 8 (36 + data_size)
/// [8-11]   "WAVE"
/// [12-15]  "fmt "
/// [16-19]  16 (format chunk size)
/// [20-21]  1 (PCM) or 3 (IEEE float)
/// [22-23]  channels
/// [24-27]  sample_rate
/// [28-31]  byte_rate = sample_rate * channels * bits / 8
/// [32-33]  block_align = channels * bits / 8
/// [34-35]  bits_per_sample
/// [36-39]  "data"
/// [40-43]  data_size
/// ```
pub fn generate_wav_header(format: &AudioFormat, data_size: u32) -> [u8; WAV_HEADER_SIZE] {
    let format_code = match format.sample_kind {
        SampleKind::Int => FORMAT_PCM,
        SampleKind::Float => FORMAT_IEEE_FLOAT,
    };
    let byte_rate = format.bytes_per_second() as u32;
    let block_align = format.block_align() as u16;
    let chunk_size = 36 + data_size;

    let mut header = [0u8; WAV_HEADER_SIZE];

    // RIFF chunk descriptor
    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&chunk_size.to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");

    // fmt sub-chunk
    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes());
    header[20..22].copy_from_slice(&format_code.to_le_bytes());
    header[22..24].copy_from_slice(&format.channels.to_le_bytes());
    header[24..28].copy_from_slice(&format.sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    header[32..34].copy_from_slice(&block_align.to_le_bytes());
    header[34..36].copy_from_slice(&format.bits_per_sample.to_le_bytes());

    // data sub-chunk
    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_size.to_le_bytes());

    header
}

/// Patch the file-size field at offset 4 (RIFF chunk size = file_size - 8).
///
/// Fails when the file is too large for a 32-bit RIFF size.
pub fn patch_file_size(header: &mut [u8], total_file_size: u64) -> Result<(), ReplayError> {
    let chunk_size = u32::try_from(total_file_size.saturating_sub(8)).map_err(|_| {
        ReplayError::StorageError(format!("{} byte file exceeds the RIFF size limit", total_file_size))
    })?;
    header[4..8].copy_from_slice(&chunk_size.to_le_bytes());
    Ok(())
}

/// Patch the data-size field at offset 40.
pub fn patch_data_size(header: &mut [u8], data_size: u64) -> Result<(), ReplayError> {
    let data_size_u32 = u32::try_from(data_size).map_err(|_| {
        ReplayError::StorageError(format!("{} byte data chunk exceeds the RIFF size limit", data_size))
    })?;
    header[40..44].copy_from_slice(&data_size_u32.to_le_bytes());
    Ok(())
}

/// Parse a RIFF/WAVE file image.
///
/// Returns the sample format and the byte range of the `data` chunk. Walks
/// the chunk list, so files with extra chunks (`LIST`, `fact`) and
/// `WAVE_FORMAT_EXTENSIBLE` headers are accepted. A `data` size running
/// past the end of the file is clamped to the bytes present.
pub fn parse_wav(bytes: &[u8]) -> Result<(AudioFormat, Range<usize>), ReplayError> {
    if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return Err(ReplayError::StorageError("not a RIFF/WAVE file".into()));
    }

    let mut format: Option<AudioFormat> = None;
    let mut offset = 12;

    while offset + 8 <= bytes.len() {
        let id = &bytes[offset..offset + 4];
        let size = read_u32(bytes, offset + 4) as usize;
        let body = offset + 8;

        if id == b"fmt " {
            format = Some(parse_fmt_chunk(&bytes[body..bytes.len().min(body + size)])?);
        } else if id == b"data" {
            let format = format
                .ok_or_else(|| ReplayError::StorageError("data chunk before fmt chunk".into()))?;
            let end = bytes.len().min(body + size);
            return Ok((format, body..end));
        }

        // Chunks are word aligned.
        offset = body + size + (size & 1);
    }

    Err(ReplayError::StorageError("missing data chunk".into()))
}

fn parse_fmt_chunk(chunk: &[u8]) -> Result<AudioFormat, ReplayError> {
    if chunk.len() < 16 {
        return Err(ReplayError::StorageError("fmt chunk too short".into()));
    }

    let mut format_code = read_u16(chunk, 0);
    if format_code == FORMAT_EXTENSIBLE {
        // SubFormat GUID starts at offset 24; its first two bytes are the code.
        if chunk.len() < 26 {
            return Err(ReplayError::StorageError("extensible fmt chunk too short".into()));
        }
        format_code = read_u16(chunk, 24);
    }

    let sample_kind = match format_code {
        FORMAT_PCM => SampleKind::Int,
        FORMAT_IEEE_FLOAT => SampleKind::Float,
        other => {
            return Err(ReplayError::StorageError(format!(
                "unsupported WAV format code {:#06x}",
                other
            )))
        }
    };

    let format = AudioFormat {
        channels: read_u16(chunk, 2),
        sample_rate: read_u32(chunk, 4),
        bits_per_sample: read_u16(chunk, 14),
        sample_kind,
    };
    format.validate().map_err(ReplayError::StorageError)?;
    Ok(format)
}

fn read_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}
