//! Decoding of raw PCM byte windows into normalized `f32` samples.
//!
//! Playback backends generally want samples, while the ring buffer only
//! deals in bytes. A trailing partial sample is ignored.

use crate::models::audio_models::{AudioFormat, SampleKind};
use crate::models::error::ReplayError;

/// Decode interleaved little-endian PCM into `f32` samples in `[-1.0, 1.0]`.
pub fn decode_to_f32(bytes: &[u8], format: &AudioFormat) -> Result<Vec<f32>, ReplayError> {
    let width = format.bits_per_sample as usize / 8;
    let samples = bytes.chunks_exact(width.max(1));

    let decoded = match (format.sample_kind, format.bits_per_sample) {
        (SampleKind::Int, 8) => samples.map(|s| (s[0] as f32 - 128.0) / 128.0).collect(),
        (SampleKind::Int, 16) => samples
            .map(|s| i16::from_le_bytes([s[0], s[1]]) as f32 / 32768.0)
            .collect(),
        (SampleKind::Int, 24) => samples
            .map(|s| {
                // sign-extend via the top byte of an i32
                let value = i32::from_le_bytes([0, s[0], s[1], s[2]]) >> 8;
                value as f32 / 8_388_608.0
            })
            .collect(),
        (SampleKind::Int, 32) => samples
            .map(|s| (i32::from_le_bytes([s[0], s[1], s[2], s[3]]) as f64 / 2_147_483_648.0) as f32)
            .collect(),
        (SampleKind::Float, 32) => samples
            .map(|s| f32::from_le_bytes([s[0], s[1], s[2], s[3]]).clamp(-1.0, 1.0))
            .collect(),
        (SampleKind::Float, 64) => samples
            .map(|s| {
                let value = f64::from_le_bytes([s[0], s[1], s[2], s[3], s[4], s[5], s[6], s[7]]);
                value.clamp(-1.0, 1.0) as f32
            })
            .collect(),
        (kind, bits) => {
            return Err(ReplayError::PlaybackFailed(format!(
                "cannot decode {}-bit {:?} samples",
                bits, kind
            )))
        }
    };

    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn decode_i16_extremes() {
        let format = AudioFormat::pcm16(48000, 1);
        let mut bytes = Vec::new();
        for value in [i16::MIN, 0, i16::MAX] {
            bytes.extend_from_slice(&value.to_le_bytes());
        }

        let samples = decode_to_f32(&bytes, &format).unwrap();
        assert_eq!(samples.len(), 3);
        assert_abs_diff_eq!(samples[0], -1.0);
        assert_abs_diff_eq!(samples[1], 0.0);
        assert_abs_diff_eq!(samples[2], 1.0, epsilon = 1e-4);
    }

    #[test]
    fn decode_i24_sign_extends() {
        let format = AudioFormat {
            bits_per_sample: 24,
            ..AudioFormat::pcm16(48000, 1)
        };
        // -1 and the most negative 24-bit value
        let bytes = [0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x80];
        let samples = decode_to_f32(&bytes, &format).unwrap();
        assert_abs_diff_eq!(samples[0], -1.0 / 8_388_608.0);
        assert_abs_diff_eq!(samples[1], -1.0);
    }

    #[test]
    fn decode_f32_clamps() {
        let format = AudioFormat::float32(48000, 2);
        let mut bytes = Vec::new();
        for value in [0.25f32, -2.0] {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        assert_eq!(decode_to_f32(&bytes, &format).unwrap(), vec![0.25, -1.0]);
    }

    #[test]
    fn trailing_partial_sample_ignored() {
        let format = AudioFormat::pcm16(48000, 1);
        let samples = decode_to_f32(&[0, 0, 7], &format).unwrap();
        assert_eq!(samples.len(), 1);
    }
}
