//! rodio playback sink.
//!
//! `rodio::OutputStream` is not `Send`, so it lives on a small keeper
//! thread for the lifetime of the sink. Only the `Send` handle crosses back.

use std::thread;

use crossbeam_channel::Sender;
use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, OutputStreamHandle, Sink};

use instant_replay_core::models::audio_models::AudioFormat;
use instant_replay_core::models::error::ReplayError;
use instant_replay_core::models::state::PlaybackState;
use instant_replay_core::processing::pcm::decode_to_f32;
use instant_replay_core::traits::playback_sink::PlaybackSink;

/// Plays replay windows through the default output device.
///
/// Each `play` gets a fresh `Sink`, so a stopped playback never leaves
/// queued audio behind.
pub struct RodioPlaybackSink {
    handle: OutputStreamHandle,
    sink: Option<Sink>,
    /// Dropping this releases the keeper thread.
    shutdown_tx: Option<Sender<()>>,
    stream_thread: Option<thread::JoinHandle<()>>,
}

impl RodioPlaybackSink {
    /// Open the default output device.
    pub fn open_default() -> Result<Self, ReplayError> {
        let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(0);

        let stream_thread = thread::Builder::new()
            .name("rodio-output".into())
            .spawn(move || match OutputStream::try_default() {
                Ok((stream, handle)) => {
                    let _ = ready_tx.send(Ok(handle));
                    // Blocks until the sender is dropped.
                    let _ = shutdown_rx.recv();
                    drop(stream);
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(ReplayError::PlaybackFailed(format!(
                        "failed to open audio output: {}",
                        e
                    ))));
                }
            })
            .map_err(|e| ReplayError::Unknown(format!("failed to spawn output thread: {}", e)))?;

        let handle = ready_rx
            .recv()
            .unwrap_or_else(|_| Err(ReplayError::PlaybackFailed("output thread exited during startup".into())))?;

        log::info!("Audio output opened");

        Ok(Self {
            handle,
            sink: None,
            shutdown_tx: Some(shutdown_tx),
            stream_thread: Some(stream_thread),
        })
    }
}

impl PlaybackSink for RodioPlaybackSink {
    fn state(&self) -> PlaybackState {
        match &self.sink {
            Some(sink) if !sink.empty() => PlaybackState::Playing,
            _ => PlaybackState::Stopped,
        }
    }

    fn play(&mut self, bytes: Vec<u8>, format: AudioFormat) -> Result<(), ReplayError> {
        let samples = decode_to_f32(&bytes, &format)?;

        let sink = Sink::try_new(&self.handle)
            .map_err(|e| ReplayError::PlaybackFailed(format!("failed to create sink: {}", e)))?;
        sink.append(SamplesBuffer::new(format.channels, format.sample_rate, samples));

        self.sink = Some(sink);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
    }
}

impl Drop for RodioPlaybackSink {
    fn drop(&mut self) {
        self.stop();
        self.shutdown_tx.take();
        if let Some(handle) = self.stream_thread.take() {
            let _ = handle.join();
        }
    }
}
