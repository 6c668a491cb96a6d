use crate::models::audio_models::AudioFormat;
use crate::models::error::ReplayError;
use crate::models::state::PlaybackState;

/// Renders a linear PCM window to an output device.
///
/// Implemented by:
/// - `RodioPlaybackSink` (instant-replay-cpal)
pub trait PlaybackSink: Send {
    /// Current state; queried before each `play` so playbacks never overlap.
    fn state(&self) -> PlaybackState;

    /// Start rendering `bytes`. Returns once playback has begun.
    fn play(&mut self, bytes: Vec<u8>, format: AudioFormat) -> Result<(), ReplayError>;

    /// Stop rendering. No-op when nothing is playing.
    fn stop(&mut self);
}
