use crate::models::audio_models::AudioFormat;
use crate::models::config::validate_record_seconds;
use crate::models::error::ReplayError;
use crate::processing::wav_format::MAX_DATA_SIZE;

/// Fixed-capacity rolling byte buffer holding the most recent audio.
///
/// Unlike a FIFO, reading never consumes: `snapshot` copies the valid window
/// out in chronological order and leaves the buffer untouched. Wrap in
/// `Arc<parking_lot::Mutex<RingBuffer>>` to share it between the capture
/// callback and the control thread; both `ingest` and `snapshot` must run
/// under that lock.
///
/// Overflow behavior: overwrites the oldest bytes. Loss on overwrite is the
/// point of the buffer, not an error.
///
/// Layout once wrapped:
/// ```text
///  0            write_cursor            capacity
///  [ newest ... ][ oldest ...............]
/// ```
#[derive(Debug)]
pub struct RingBuffer {
    buffer: Vec<u8>,
    write_cursor: usize,
    has_wrapped: bool,
}

impl RingBuffer {
    /// Allocate a buffer of exactly `capacity` bytes.
    pub fn new(capacity: usize) -> Result<Self, ReplayError> {
        if capacity == 0 {
            return Err(ReplayError::InvalidDuration(
                "buffer capacity must be greater than zero".into(),
            ));
        }
        let mut buffer = Vec::new();
        buffer.try_reserve_exact(capacity).map_err(|e| {
            ReplayError::InvalidDuration(format!("cannot allocate a {} byte buffer: {}", capacity, e))
        })?;
        buffer.resize(capacity, 0);

        Ok(Self {
            buffer,
            write_cursor: 0,
            has_wrapped: false,
        })
    }

    /// Allocate a buffer holding `record_seconds` of audio in `format`.
    ///
    /// The capacity is rounded down to whole sample frames so the oldest
    /// byte of a wrapped snapshot always starts a frame. It is capped at the
    /// largest window a WAV file can hold.
    pub fn for_duration(format: &AudioFormat, record_seconds: f64) -> Result<Self, ReplayError> {
        validate_record_seconds(record_seconds).map_err(ReplayError::InvalidDuration)?;
        let capacity = capacity_for(format, record_seconds)
            .filter(|&bytes| bytes as u64 <= MAX_DATA_SIZE)
            .ok_or_else(|| {
                ReplayError::InvalidDuration(format!(
                    "{} s at {} Hz exceeds the largest savable window ({} bytes)",
                    record_seconds, format.sample_rate, MAX_DATA_SIZE
                ))
            })?;
        if capacity == 0 {
            return Err(ReplayError::InvalidDuration(format!(
                "{} s does not hold a single frame at {} Hz",
                record_seconds, format.sample_rate
            )));
        }
        Self::new(capacity)
    }

    /// Append a chunk delivered by the capture source.
    ///
    /// Equivalent to writing each byte at the cursor and advancing it modulo
    /// the capacity, but done as at most two slice copies. Never allocates.
    pub fn ingest(&mut self, chunk: &[u8]) {
        let capacity = self.buffer.len();
        let mut data = chunk;

        // Everything before the last `capacity` bytes would be overwritten
        // within this same call.
        if data.len() > capacity {
            let skip = data.len() - capacity;
            self.write_cursor = (self.write_cursor + skip) % capacity;
            self.has_wrapped = true;
            data = &data[skip..];
        }

        while !data.is_empty() {
            let room = capacity - self.write_cursor;
            let n = room.min(data.len());
            self.buffer[self.write_cursor..self.write_cursor + n].copy_from_slice(&data[..n]);
            self.write_cursor += n;
            if self.write_cursor == capacity {
                self.write_cursor = 0;
                self.has_wrapped = true;
            }
            data = &data[n..];
        }
    }

    /// Copy the valid window out, oldest byte first.
    ///
    /// Before the first wrap this is `[0, write_cursor)`. Afterwards it is
    /// always `capacity` bytes: the tail `[write_cursor, capacity)` followed
    /// by the head `[0, write_cursor)`.
    pub fn snapshot(&self) -> Vec<u8> {
        if !self.has_wrapped {
            return self.buffer[..self.write_cursor].to_vec();
        }

        let mut out = Vec::with_capacity(self.buffer.len());
        out.extend_from_slice(&self.buffer[self.write_cursor..]);
        out.extend_from_slice(&self.buffer[..self.write_cursor]);
        out
    }

    /// Number of valid bytes a snapshot would return.
    pub fn len(&self) -> usize {
        if self.has_wrapped {
            self.buffer.len()
        } else {
            self.write_cursor
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget all buffered audio. The allocation is kept.
    pub fn reset(&mut self) {
        self.write_cursor = 0;
        self.has_wrapped = false;
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    pub fn write_cursor(&self) -> usize {
        self.write_cursor
    }

    /// Whether the buffer has been full at least once. Never clears except
    /// through `reset`.
    pub fn has_wrapped(&self) -> bool {
        self.has_wrapped
    }
}

/// Buffer size in bytes for `record_seconds` of `format`, whole frames only.
///
/// `None` if the size does not fit in a `usize`.
pub fn capacity_for(format: &AudioFormat, record_seconds: f64) -> Option<usize> {
    let frames = (format.sample_rate as f64 * record_seconds).floor();
    if frames.is_nan() || frames <= 0.0 {
        return Some(0);
    }
    if frames >= usize::MAX as f64 {
        return None;
    }
    (frames as usize).checked_mul(format.block_align())
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;

    fn bytes(range: std::ops::RangeInclusive<u8>) -> Vec<u8> {
        range.collect()
    }

    #[test]
    fn partial_fill_returns_ingested_bytes() {
        let mut buf = RingBuffer::new(10).unwrap();
        buf.ingest(&bytes(1..=8));

        assert_eq!(buf.snapshot(), bytes(1..=8));
        assert!(!buf.has_wrapped());
        assert_eq!(buf.write_cursor(), 8);
        assert_eq!(buf.len(), 8);
    }

    #[test]
    fn wrap_reorders_oldest_first() {
        let mut buf = RingBuffer::new(10).unwrap();
        buf.ingest(&bytes(1..=8));
        buf.ingest(&bytes(9..=12));

        assert_eq!(buf.write_cursor(), 2);
        assert!(buf.has_wrapped());
        assert_eq!(buf.buffer, vec![11, 12, 3, 4, 5, 6, 7, 8, 9, 10]);
        assert_eq!(buf.snapshot(), bytes(3..=12));
    }

    #[test]
    fn exact_capacity_wraps_to_zero() {
        let mut buf = RingBuffer::new(10).unwrap();
        buf.ingest(&bytes(1..=10));

        assert_eq!(buf.write_cursor(), 0);
        assert!(buf.has_wrapped());
        assert_eq!(buf.snapshot(), bytes(1..=10));
    }

    #[test]
    fn empty_buffer_snapshot_is_empty() {
        let mut buf = RingBuffer::new(4).unwrap();
        assert!(buf.snapshot().is_empty());
        assert!(buf.is_empty());

        buf.ingest(&[]);
        assert!(buf.snapshot().is_empty());
        assert!(!buf.has_wrapped());
    }

    #[test]
    fn chunk_larger_than_capacity_keeps_tail() {
        let mut buf = RingBuffer::new(4).unwrap();
        buf.ingest(&[1]);
        buf.ingest(&bytes(2..=11));

        assert!(buf.has_wrapped());
        assert_eq!(buf.write_cursor(), 11 % 4);
        assert_eq!(buf.snapshot(), bytes(8..=11));
    }

    #[test]
    fn snapshot_is_idempotent() {
        let mut buf = RingBuffer::new(7).unwrap();
        buf.ingest(&bytes(1..=20));

        let first = buf.snapshot();
        let second = buf.snapshot();
        assert_eq!(first, second);
    }

    #[test]
    fn wrap_flag_stays_set() {
        let mut buf = RingBuffer::new(3).unwrap();
        buf.ingest(&[1, 2, 3]);
        buf.ingest(&[4]);
        assert!(buf.has_wrapped());
        assert_eq!(buf.snapshot(), vec![2, 3, 4]);
    }

    #[test]
    fn reset_clears_window() {
        let mut buf = RingBuffer::new(5).unwrap();
        buf.ingest(&bytes(1..=7));
        buf.reset();

        assert!(buf.is_empty());
        assert!(!buf.has_wrapped());
        assert_eq!(buf.capacity(), 5);

        buf.ingest(&[9, 9]);
        assert_eq!(buf.snapshot(), vec![9, 9]);
    }

    #[test]
    fn zero_capacity_rejected() {
        assert!(matches!(RingBuffer::new(0), Err(ReplayError::InvalidDuration(_))));
    }

    #[test]
    fn matches_reference_model_for_varied_chunking() {
        let stream: Vec<u8> = (0..=255u8).cycle().take(1000).collect();

        for capacity in [1, 2, 7, 10, 64, 999, 1000, 1001] {
            for chunk_size in [1, 3, 10, 64, 333, 2048] {
                let mut buf = RingBuffer::new(capacity).unwrap();
                let mut model: VecDeque<u8> = VecDeque::new();
                let mut total = 0usize;

                for chunk in stream.chunks(chunk_size) {
                    buf.ingest(chunk);
                    total += chunk.len();
                    for &b in chunk {
                        if model.len() == capacity {
                            model.pop_front();
                        }
                        model.push_back(b);
                    }

                    let expected: Vec<u8> = model.iter().copied().collect();
                    assert_eq!(buf.snapshot(), expected, "cap {} chunk {}", capacity, chunk_size);
                    assert_eq!(buf.has_wrapped(), total >= capacity);
                    assert_eq!(buf.write_cursor(), total % capacity);
                }
            }
        }
    }

    #[test]
    fn capacity_rounds_to_whole_frames() {
        let format = AudioFormat::float32(48000, 2);
        assert_eq!(capacity_for(&format, 10.0), Some(48000 * 10 * 8));
        // 0.5 frames worth of time rounds down to nothing
        assert_eq!(capacity_for(&format, 0.5 / 48000.0), Some(0));
        assert_eq!(capacity_for(&format, 1.5 / 48000.0), Some(8));
    }

    #[test]
    fn capacity_overflow_is_none() {
        let format = AudioFormat::float32(48000, 2);
        assert_eq!(capacity_for(&format, 1e300), None);
        assert_eq!(capacity_for(&format, f64::INFINITY), None);
    }

    #[test]
    fn huge_durations_rejected_without_panic() {
        let format = AudioFormat::float32(48000, 2);
        for secs in [1e15, 1e300, 4.0 * 3600.0] {
            assert!(
                matches!(RingBuffer::for_duration(&format, secs), Err(ReplayError::InvalidDuration(_))),
                "accepted {} s",
                secs
            );
        }
    }

    #[test]
    fn for_duration_validates() {
        let format = AudioFormat::pcm16(8000, 1);
        assert!(RingBuffer::for_duration(&format, 0.0).is_err());
        assert!(RingBuffer::for_duration(&format, -3.0).is_err());
        assert!(RingBuffer::for_duration(&format, 1e-9).is_err());

        let buf = RingBuffer::for_duration(&format, 2.0).unwrap();
        assert_eq!(buf.capacity(), 32000);
    }
}
