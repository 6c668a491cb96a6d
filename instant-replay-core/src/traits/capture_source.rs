use std::sync::Arc;

use crate::models::audio_models::{AudioFormat, CaptureDevice};
use crate::models::error::ReplayError;
use crate::models::state::SourceEvent;

/// Callback invoked with each raw PCM chunk delivered by the device.
///
/// Chunk size and timing are up to the device. Runs on the device's own
/// thread: no blocking, no I/O.
pub type ChunkCallback = Arc<dyn Fn(&[u8]) + Send + Sync + 'static>;

/// Callback invoked when the device changes lifecycle state on its own.
pub type SourceEventCallback = Arc<dyn Fn(SourceEvent) + Send + Sync + 'static>;

/// A live audio capture endpoint (microphone, loopback, test fixture).
///
/// Implemented by:
/// - `CpalCaptureSource` (instant-replay-cpal)
pub trait CaptureSource: Send {
    /// Fixed sample format of the delivered bytes.
    ///
    /// Queried once when the recorder is built; it sizes the buffer.
    fn format(&self) -> AudioFormat;

    /// Start delivering chunks to `on_chunk`.
    ///
    /// Returns `ReplayError::AlreadyStarted` if the device is already
    /// running. Lifecycle changes the caller did not ask for (device lost,
    /// stream errors) are reported through `on_event`.
    fn start(&mut self, on_chunk: ChunkCallback, on_event: SourceEventCallback) -> Result<(), ReplayError>;

    /// Stop delivering chunks. Blocks until the device has stopped; no
    /// `SourceEvent::Stopped` is emitted for a requested stop.
    fn stop(&mut self) -> Result<(), ReplayError>;

    /// Information about the device backing this source.
    fn device_info(&self) -> CaptureDevice;
}
