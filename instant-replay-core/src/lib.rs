//! # instant-replay-core
//!
//! Platform-agnostic instant replay engine.
//!
//! Keeps the last N seconds of captured audio in a fixed rolling buffer and
//! turns it into a linear clip on demand, for playback or for saving as WAV.
//! Platform backends implement `CaptureSource` and `PlaybackSink` and plug
//! into the generic `ReplayRecorder`.
//!
//! ## Architecture
//!
//! ```text
//! instant-replay-core (this crate)
//! ├── traits/       ← CaptureSource, PlaybackSink, ClipWriter, ClipEncryptor, RecorderDelegate
//! ├── models/       ← ReplayError, CaptureState, RecorderConfiguration, AudioFormat, SavedClip
//! ├── processing/   ← RingBuffer, WAV header generation/parsing, PCM decoding
//! ├── session/      ← ReplayRecorder (generic orchestrator)
//! └── storage/      ← WavClipWriter, AesGcmClipEncryptor, metadata sidecar
//! ```

pub mod models;
pub mod processing;
pub mod session;
pub mod storage;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::audio_models::{AudioFormat, CaptureDevice, RecorderDiagnostics, SampleKind};
pub use models::config::{RecorderConfiguration, DEFAULT_RECORD_SECONDS};
pub use models::error::ReplayError;
pub use models::saved_clip::{ClipMetadata, SavedClip};
pub use models::state::{CaptureState, PlayOutcome, PlaybackState, SourceEvent, StartOutcome};
pub use processing::ring_buffer::RingBuffer;
pub use session::replay_recorder::ReplayRecorder;
pub use storage::aes_encryptor::AesGcmClipEncryptor;
pub use storage::clip_writer::{read_wav, WavClipWriter};
pub use traits::capture_source::{CaptureSource, ChunkCallback, SourceEventCallback};
pub use traits::clip_writer::ClipWriter;
pub use traits::encryptor::ClipEncryptor;
pub use traits::playback_sink::PlaybackSink;
pub use traits::recorder_delegate::RecorderDelegate;
