use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;

use crate::models::audio_models::{AudioFormat, CaptureDevice, RecorderDiagnostics};
use crate::models::config::{validate_record_seconds, RecorderConfiguration};
use crate::models::error::ReplayError;
use crate::models::saved_clip::{ClipMetadata, SavedClip};
use crate::models::state::{CaptureState, PlayOutcome, PlaybackState, SourceEvent, StartOutcome};
use crate::processing::ring_buffer::RingBuffer;
use crate::storage::clip_writer::WavClipWriter;
use crate::storage::metadata;
use crate::traits::capture_source::{CaptureSource, ChunkCallback, SourceEventCallback};
use crate::traits::clip_writer::ClipWriter;
use crate::traits::playback_sink::PlaybackSink;
use crate::traits::recorder_delegate::RecorderDelegate;

/// Mutable recorder state shared with the supervisor thread.
///
/// Lock order: `source` before `shared`, never the reverse.
struct SharedState {
    /// Capture intent. The source of truth when the device stops on its own.
    is_recording: bool,
    delegate: Option<Arc<dyn RecorderDelegate>>,
    auto_restarts: u64,
    clips_saved: u64,
    playbacks_started: u64,
}

/// Counters bumped on the capture thread without touching `SharedState`.
#[derive(Default)]
struct IngestCounters {
    chunks: AtomicU64,
    bytes: AtomicU64,
}

enum SupervisorMessage {
    Source(SourceEvent),
    Shutdown,
}

/// Everything the supervisor needs to reconcile device state with intent.
struct Supervisor<C: CaptureSource> {
    source: Arc<Mutex<C>>,
    shared: Arc<Mutex<SharedState>>,
    on_chunk: ChunkCallback,
    on_event: SourceEventCallback,
}

/// Instant replay recorder.
///
/// Keeps the most recent `record_seconds` of audio from a `CaptureSource`
/// in a fixed rolling buffer, and turns it into a linear clip on demand for
/// playback or saving.
///
/// ```text
/// [CaptureSource] ──chunks──→ [RingBuffer] ──snapshot──┬→ [PlaybackSink]
///        │                                              └→ [ClipWriter] → .wav
///        └──lifecycle events──→ [supervisor thread] ──restart──→ [CaptureSource]
/// ```
///
/// All operations take `&self` except reconfiguration, so a recorder can
/// be shared between the control thread and event handlers.
pub struct ReplayRecorder<C: CaptureSource + 'static, P: PlaybackSink> {
    source: Arc<Mutex<C>>,
    sink: Mutex<P>,
    format: AudioFormat,
    config: RecorderConfiguration,
    clip_writer: Box<dyn ClipWriter>,
    ring: Arc<Mutex<RingBuffer>>,
    shared: Arc<Mutex<SharedState>>,
    counters: Arc<IngestCounters>,
    on_chunk: ChunkCallback,
    on_event: SourceEventCallback,
    supervisor_tx: Sender<SupervisorMessage>,
    supervisor_handle: Option<thread::JoinHandle<()>>,
}

impl<C: CaptureSource + 'static, P: PlaybackSink> ReplayRecorder<C, P> {
    /// Build a recorder sized for `config.record_seconds` of the source's format.
    ///
    /// Fails with `InvalidDuration` for a zero, negative, sub-frame, or
    /// unsavably large duration.
    pub fn new(source: C, sink: P, config: RecorderConfiguration) -> Result<Self, ReplayError> {
        config.validate().map_err(ReplayError::InvalidDuration)?;

        let format = source.format();
        format.validate().map_err(ReplayError::ConfigurationFailed)?;

        let ring = Arc::new(Mutex::new(RingBuffer::for_duration(&format, config.record_seconds)?));
        let counters = Arc::new(IngestCounters::default());

        log::info!(
            "Replay buffer: {:.1}s = {} bytes ({} Hz, {} ch, {}-bit {:?})",
            config.record_seconds,
            ring.lock().capacity(),
            format.sample_rate,
            format.channels,
            format.bits_per_sample,
            format.sample_kind,
        );

        let on_chunk: ChunkCallback = {
            let ring = Arc::clone(&ring);
            let counters = Arc::clone(&counters);
            Arc::new(move |chunk: &[u8]| ingest_chunk(&ring, &counters, chunk))
        };

        let (supervisor_tx, supervisor_rx) = crossbeam_channel::unbounded();
        let on_event: SourceEventCallback = {
            let tx = supervisor_tx.clone();
            Arc::new(move |event: SourceEvent| {
                // Only fails once the recorder is gone.
                let _ = tx.send(SupervisorMessage::Source(event));
            })
        };

        let source = Arc::new(Mutex::new(source));
        let shared = Arc::new(Mutex::new(SharedState {
            is_recording: false,
            delegate: None,
            auto_restarts: 0,
            clips_saved: 0,
            playbacks_started: 0,
        }));

        let supervisor = Supervisor {
            source: Arc::clone(&source),
            shared: Arc::clone(&shared),
            on_chunk: Arc::clone(&on_chunk),
            on_event: Arc::clone(&on_event),
        };
        let supervisor_handle = thread::Builder::new()
            .name("replay-supervisor".into())
            .spawn(move || supervisor.run(supervisor_rx))
            .map_err(|e| ReplayError::Unknown(format!("failed to spawn supervisor thread: {}", e)))?;

        Ok(Self {
            source,
            sink: Mutex::new(sink),
            format,
            clip_writer: Box::new(WavClipWriter::new(config.encryptor.clone())),
            config,
            ring,
            shared,
            counters,
            on_chunk,
            on_event,
            supervisor_tx,
            supervisor_handle: Some(supervisor_handle),
        })
    }

    pub fn set_delegate(&self, delegate: Arc<dyn RecorderDelegate>) {
        self.shared.lock().delegate = Some(delegate);
    }

    /// Replace the file writer used by `save` (default: `WavClipWriter`).
    pub fn set_clip_writer(&mut self, writer: Box<dyn ClipWriter>) {
        self.clip_writer = writer;
    }

    // --- Capture lifecycle ---

    /// Start capturing. Idempotent: returns `AlreadyActive` if capture is
    /// already running. A device that reports it is already started is
    /// treated as started.
    pub fn start_capture(&self) -> Result<StartOutcome, ReplayError> {
        let mut source = self.source.lock();

        if self.shared.lock().is_recording {
            log::info!("Capture already active");
            return Ok(StartOutcome::AlreadyActive);
        }

        match source.start(Arc::clone(&self.on_chunk), Arc::clone(&self.on_event)) {
            Ok(()) => log::info!("Capture started on '{}'", source.device_info().name),
            Err(ReplayError::AlreadyStarted) => {
                log::info!("Device '{}' was already started; continuing", source.device_info().name)
            }
            Err(e) => {
                log::error!("Failed to start capture: {}", e);
                return Err(e);
            }
        }

        self.shared.lock().is_recording = true;
        drop(source);

        self.notify_state(CaptureState::Active);
        Ok(StartOutcome::Started)
    }

    /// Stop capturing. Idempotent. Buffered audio stays available.
    pub fn stop_capture(&self) -> Result<(), ReplayError> {
        let mut source = self.source.lock();

        let was_recording = std::mem::replace(&mut self.shared.lock().is_recording, false);
        if !was_recording {
            return Ok(());
        }

        if let Err(e) = source.stop() {
            // The device is still delivering; keep the intent so a later
            // stop retries instead of short-circuiting.
            self.shared.lock().is_recording = true;
            log::error!("Failed to stop capture: {}", e);
            return Err(e);
        }
        drop(source);

        log::info!("Capture stopped");
        self.notify_state(CaptureState::Idle);
        Ok(())
    }

    /// Feed a chunk into the rolling buffer.
    ///
    /// The capture callback goes through this same path. No filtering on
    /// capture state happens here; gating is done by starting and stopping
    /// the device.
    pub fn ingest(&self, chunk: &[u8]) {
        ingest_chunk(&self.ring, &self.counters, chunk);
    }

    /// Copy the buffered window out, oldest byte first.
    pub fn snapshot(&self) -> Vec<u8> {
        self.ring.lock().snapshot()
    }

    /// Discard all buffered audio and clear the wrap flag.
    pub fn reset(&self) {
        self.ring.lock().reset();
        log::debug!("Replay buffer reset");
    }

    /// Change the window length. Rebuilds the buffer, so buffered audio is
    /// discarded; capture keeps running if it was.
    pub fn set_record_seconds(&mut self, record_seconds: f64) -> Result<(), ReplayError> {
        validate_record_seconds(record_seconds).map_err(ReplayError::InvalidDuration)?;
        let ring = RingBuffer::for_duration(&self.format, record_seconds)?;
        let capacity = ring.capacity();

        *self.ring.lock() = ring;
        self.config.record_seconds = record_seconds;

        log::info!("Replay window set to {:.1}s ({} bytes)", record_seconds, capacity);
        Ok(())
    }

    // --- Output ---

    /// Write the current window to `destination` as a WAV clip.
    ///
    /// Any writer failure surfaces as `ReplayError::SaveFailed`.
    pub fn save(&self, destination: &Path) -> Result<SavedClip, ReplayError> {
        let bytes = self.snapshot();

        let checksum = self
            .clip_writer
            .write(destination, &self.format, &bytes)
            .map_err(|e| {
                log::error!("Failed to save clip to {}: {}", destination.display(), e);
                as_save_failed(e)
            })?;

        let duration_secs = self.format.duration_secs(bytes.len());
        let clip_metadata = ClipMetadata::new(
            duration_secs,
            &destination.to_string_lossy(),
            &checksum,
            self.format,
            self.clip_writer.encryption_algorithm(),
            self.clip_writer.encryption_key_id(),
        );

        if self.config.write_metadata {
            metadata::write_metadata(&clip_metadata, destination).map_err(as_save_failed)?;
        }

        let clip = SavedClip {
            file_path: destination.to_path_buf(),
            duration_secs,
            data_len: bytes.len(),
            metadata: clip_metadata,
            checksum,
        };

        log::info!("Saved {:.2}s clip to {}", duration_secs, destination.display());

        let delegate = {
            let mut s = self.shared.lock();
            s.clips_saved += 1;
            s.delegate.clone()
        };
        if let Some(delegate) = delegate {
            delegate.on_clip_saved(&clip);
        }

        Ok(clip)
    }

    /// Save into the configured output directory under a generated name.
    pub fn save_clip(&self) -> Result<SavedClip, ReplayError> {
        let path = self.next_clip_path();
        self.save(&path)
    }

    /// Play the current window. A no-op while a previous playback is running.
    pub fn play(&self) -> Result<PlayOutcome, ReplayError> {
        let mut sink = self.sink.lock();
        if sink.state() == PlaybackState::Playing {
            log::debug!("Playback already running; ignoring play request");
            return Ok(PlayOutcome::AlreadyPlaying);
        }

        let bytes = self.snapshot();
        let byte_len = bytes.len();
        sink.play(bytes, self.format).map_err(|e| {
            log::error!("Playback failed: {}", e);
            match e {
                ReplayError::PlaybackFailed(_) => e,
                other => ReplayError::PlaybackFailed(other.to_string()),
            }
        })?;
        drop(sink);

        self.shared.lock().playbacks_started += 1;

        let duration_secs = self.format.duration_secs(byte_len);
        log::info!("Playing {:.2}s replay", duration_secs);
        Ok(PlayOutcome::Started {
            byte_len,
            duration_secs,
        })
    }

    /// Stop playback if any is running.
    pub fn stop_playback(&self) {
        let mut sink = self.sink.lock();
        if sink.state() == PlaybackState::Playing {
            sink.stop();
            log::debug!("Playback stopped");
        }
    }

    // --- Queries ---

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    pub fn record_seconds(&self) -> f64 {
        self.config.record_seconds
    }

    pub fn capacity_bytes(&self) -> usize {
        self.ring.lock().capacity()
    }

    pub fn is_recording(&self) -> bool {
        self.shared.lock().is_recording
    }

    pub fn capture_state(&self) -> CaptureState {
        if self.is_recording() {
            CaptureState::Active
        } else {
            CaptureState::Idle
        }
    }

    pub fn has_wrapped(&self) -> bool {
        self.ring.lock().has_wrapped()
    }

    pub fn write_cursor(&self) -> usize {
        self.ring.lock().write_cursor()
    }

    /// Seconds of audio a snapshot would currently return.
    pub fn buffered_secs(&self) -> f64 {
        self.format.duration_secs(self.ring.lock().len())
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.sink.lock().state()
    }

    pub fn device_info(&self) -> CaptureDevice {
        self.source.lock().device_info()
    }

    pub fn diagnostics(&self) -> RecorderDiagnostics {
        let s = self.shared.lock();
        RecorderDiagnostics {
            chunks_ingested: self.counters.chunks.load(Ordering::Relaxed),
            bytes_ingested: self.counters.bytes.load(Ordering::Relaxed),
            auto_restarts: s.auto_restarts,
            clips_saved: s.clips_saved,
            playbacks_started: s.playbacks_started,
        }
    }

    // --- Internal helpers ---

    fn next_clip_path(&self) -> PathBuf {
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let id = uuid::Uuid::new_v4().simple().to_string();
        let ext = if self.clip_writer.encryption_algorithm().is_some() {
            "enc.wav"
        } else {
            "wav"
        };
        self.config
            .output_directory
            .join(format!("replay_{}_{}.{}", stamp, &id[..8], ext))
    }

    fn notify_state(&self, state: CaptureState) {
        let delegate = self.shared.lock().delegate.clone();
        if let Some(delegate) = delegate {
            delegate.on_capture_state_changed(state);
        }
    }
}

impl<C: CaptureSource + 'static, P: PlaybackSink> Drop for ReplayRecorder<C, P> {
    fn drop(&mut self) {
        if let Err(e) = self.stop_capture() {
            log::warn!("Failed to stop capture on drop: {}", e);
        }
        let _ = self.supervisor_tx.send(SupervisorMessage::Shutdown);
        if let Some(handle) = self.supervisor_handle.take() {
            let _ = handle.join();
        }
    }
}

impl<C: CaptureSource> Supervisor<C> {
    fn run(self, rx: Receiver<SupervisorMessage>) {
        while let Ok(message) = rx.recv() {
            match message {
                SupervisorMessage::Source(SourceEvent::Stopped { reason }) => self.reconcile(reason),
                SupervisorMessage::Source(SourceEvent::Error(error)) => {
                    log::error!("Capture stream error: {}", error);
                    self.report_error(&error);
                }
                SupervisorMessage::Shutdown => break,
            }
        }
        log::debug!("Replay supervisor exiting");
    }

    /// Re-assert the capture intent after the device stopped on its own.
    /// One restart attempt per event.
    fn reconcile(&self, reason: Option<ReplayError>) {
        let mut source = self.source.lock();

        if !self.shared.lock().is_recording {
            log::debug!("Device stopped while capture is idle; nothing to resume");
            return;
        }

        match &reason {
            Some(e) => log::warn!("Capture device stopped unexpectedly ({}); resuming", e),
            None => log::warn!("Capture device stopped unexpectedly; resuming"),
        }

        let outcome = source.start(Arc::clone(&self.on_chunk), Arc::clone(&self.on_event));
        drop(source);

        match outcome {
            Ok(()) | Err(ReplayError::AlreadyStarted) => {
                let delegate = {
                    let mut s = self.shared.lock();
                    s.auto_restarts += 1;
                    s.delegate.clone()
                };
                log::info!("Capture resumed");
                if let Some(delegate) = delegate {
                    delegate.on_capture_resumed();
                }
            }
            Err(e) => {
                log::error!("Could not resume capture: {}", e);
                let delegate = {
                    let mut s = self.shared.lock();
                    s.is_recording = false;
                    s.delegate.clone()
                };
                if let Some(delegate) = delegate {
                    delegate.on_error(&ReplayError::CaptureUnavailable);
                    delegate.on_capture_state_changed(CaptureState::Idle);
                }
            }
        }
    }

    fn report_error(&self, error: &ReplayError) {
        let delegate = self.shared.lock().delegate.clone();
        if let Some(delegate) = delegate {
            delegate.on_error(error);
        }
    }
}

fn ingest_chunk(ring: &Mutex<RingBuffer>, counters: &IngestCounters, chunk: &[u8]) {
    ring.lock().ingest(chunk);
    counters.chunks.fetch_add(1, Ordering::Relaxed);
    counters.bytes.fetch_add(chunk.len() as u64, Ordering::Relaxed);
}

fn as_save_failed(error: ReplayError) -> ReplayError {
    match error {
        ReplayError::SaveFailed(_) => error,
        other => ReplayError::SaveFailed(other.to_string()),
    }
}
