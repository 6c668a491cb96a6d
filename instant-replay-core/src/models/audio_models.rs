use serde::{Deserialize, Serialize};

/// Encoding of individual samples inside a PCM byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleKind {
    /// Signed little-endian integers (8-bit is unsigned, per WAV).
    Int,
    /// IEEE 754 little-endian floats.
    Float,
}

/// Fixed sample format of a capture device.
///
/// Queried once from the `CaptureSource` when a recorder is built and used
/// to size the rolling buffer and tag saved clips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    pub sample_kind: SampleKind,
}

impl AudioFormat {
    pub fn pcm16(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
            bits_per_sample: 16,
            sample_kind: SampleKind::Int,
        }
    }

    /// 32-bit float, the shared-mode format of most desktop mixers.
    pub fn float32(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
            bits_per_sample: 32,
            sample_kind: SampleKind::Float,
        }
    }

    /// Bytes per sample frame (all channels).
    pub fn block_align(&self) -> usize {
        self.channels as usize * (self.bits_per_sample as usize / 8)
    }

    pub fn bytes_per_second(&self) -> u64 {
        self.sample_rate as u64 * self.block_align() as u64
    }

    /// Duration of `byte_len` bytes of audio in this format.
    pub fn duration_secs(&self, byte_len: usize) -> f64 {
        let rate = self.bytes_per_second();
        if rate == 0 {
            return 0.0;
        }
        byte_len as f64 / rate as f64
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate == 0 {
            return Err("sample rate must be positive".into());
        }
        if self.channels == 0 {
            return Err("channel count must be positive".into());
        }
        let valid_bits: &[u16] = match self.sample_kind {
            SampleKind::Int => &[8, 16, 24, 32],
            SampleKind::Float => &[32, 64],
        };
        if !valid_bits.contains(&self.bits_per_sample) {
            return Err(format!(
                "unsupported bit depth {} for {:?} samples",
                self.bits_per_sample, self.sample_kind
            ));
        }
        Ok(())
    }
}

/// A capture endpoint backing a `CaptureSource`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureDevice {
    pub id: String,
    pub name: String,
    pub is_default: bool,
    /// True when the device is an output captured via loopback.
    pub is_loopback: bool,
}

/// Counters for debugging a recorder.
#[derive(Debug, Clone, Default)]
pub struct RecorderDiagnostics {
    pub chunks_ingested: u64,
    pub bytes_ingested: u64,
    pub auto_restarts: u64,
    pub clips_saved: u64,
    pub playbacks_started: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_rates_for_stereo_float() {
        let format = AudioFormat::float32(48000, 2);
        assert_eq!(format.block_align(), 8);
        assert_eq!(format.bytes_per_second(), 384_000);
    }

    #[test]
    fn duration_of_bytes() {
        let format = AudioFormat::pcm16(44100, 1);
        approx::assert_relative_eq!(format.duration_secs(88200), 1.0);
        approx::assert_relative_eq!(format.duration_secs(0), 0.0);
    }

    #[test]
    fn validate_rejects_bad_formats() {
        assert!(AudioFormat::pcm16(0, 2).validate().is_err());
        assert!(AudioFormat::pcm16(48000, 0).validate().is_err());

        let odd = AudioFormat {
            bits_per_sample: 12,
            ..AudioFormat::pcm16(48000, 2)
        };
        assert!(odd.validate().is_err());

        let float16 = AudioFormat {
            bits_per_sample: 16,
            ..AudioFormat::float32(48000, 2)
        };
        assert!(float16.validate().is_err());
        assert!(AudioFormat::float32(48000, 2).validate().is_ok());
    }
}
