//! cpal capture source.
//!
//! Captures from the default input, a named input, or (on WASAPI) the
//! loopback mix of the default output device. The cpal `Stream` is not
//! `Send` on every host, so it is built, played, and dropped on one
//! dedicated thread per capture run. Samples are delivered to the recorder
//! as interleaved little-endian bytes in the device's native format.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, SizedSample, StreamConfig, SupportedStreamConfig};
use crossbeam_channel::{RecvTimeoutError, Sender};
use parking_lot::Mutex;

use instant_replay_core::models::audio_models::{AudioFormat, CaptureDevice, SampleKind};
use instant_replay_core::models::error::ReplayError;
use instant_replay_core::models::state::SourceEvent;
use instant_replay_core::traits::capture_source::{CaptureSource, ChunkCallback, SourceEventCallback};

/// How often the capture thread checks for a stop request.
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Which endpoint a `CpalCaptureSource` records from.
#[derive(Debug, Clone, PartialEq, Eq)]
enum DeviceTarget {
    DefaultInput,
    NamedInput(String),
    /// The default output device opened as an input stream (WASAPI only).
    Loopback,
}

enum StreamFault {
    DeviceLost(String),
    Other(String),
}

/// Capture source backed by a cpal input stream.
///
/// The format is fixed at construction from the device's default config.
/// If a later `start` finds the device reporting a different format, it
/// fails with `FormatChanged` rather than feeding mismatched bytes into a
/// buffer sized for the old one.
pub struct CpalCaptureSource {
    target: DeviceTarget,
    device_name: String,
    format: AudioFormat,
    /// Per-run flag. Replaced on every `start` so a thread that outlives
    /// its run can never observe the next run's flag.
    running: Arc<AtomicBool>,
    capture_handle: Mutex<Option<thread::JoinHandle<()>>>,
}

impl CpalCaptureSource {
    /// Capture from the system default input device.
    pub fn default_input() -> Result<Self, ReplayError> {
        Self::open(DeviceTarget::DefaultInput)
    }

    /// Capture from the input device whose name matches `name` exactly.
    pub fn with_input_device(name: impl Into<String>) -> Result<Self, ReplayError> {
        Self::open(DeviceTarget::NamedInput(name.into()))
    }

    /// Capture what the default output device is playing.
    ///
    /// Only the WASAPI host supports input streams on output devices; on
    /// other hosts `start` fails with `ConfigurationFailed`.
    pub fn loopback() -> Result<Self, ReplayError> {
        Self::open(DeviceTarget::Loopback)
    }

    fn open(target: DeviceTarget) -> Result<Self, ReplayError> {
        let (device, config) = resolve_device(&target)?;
        let device_name = device.name().unwrap_or_else(|_| "unknown".into());
        let format = audio_format_for(&config)?;

        log::info!(
            "Capture device '{}': {} Hz, {} ch, {:?}",
            device_name,
            config.sample_rate().0,
            config.channels(),
            config.sample_format()
        );

        Ok(Self {
            target,
            device_name,
            format,
            running: Arc::new(AtomicBool::new(false)),
            capture_handle: Mutex::new(None),
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl CaptureSource for CpalCaptureSource {
    fn format(&self) -> AudioFormat {
        self.format
    }

    fn start(&mut self, on_chunk: ChunkCallback, on_event: SourceEventCallback) -> Result<(), ReplayError> {
        if self.is_running() {
            return Err(ReplayError::AlreadyStarted);
        }

        // Reap a thread that ended on its own (device loss).
        if let Some(handle) = self.capture_handle.lock().take() {
            let _ = handle.join();
        }

        let running = Arc::new(AtomicBool::new(true));
        self.running = Arc::clone(&running);

        let target = self.target.clone();
        let expected = self.format;
        let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);

        let handle = thread::Builder::new()
            .name("cpal-capture".into())
            .spawn(move || {
                capture_thread(target, expected, Arc::clone(&running), on_chunk, on_event, ready_tx);
                running.store(false, Ordering::SeqCst);
            })
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                ReplayError::Unknown(format!("failed to spawn capture thread: {}", e))
            })?;

        let startup = ready_rx
            .recv()
            .unwrap_or_else(|_| Err(ReplayError::Unknown("capture thread exited during startup".into())));

        match startup {
            Ok(()) => {
                *self.capture_handle.lock() = Some(handle);
                Ok(())
            }
            Err(e) => {
                let _ = handle.join();
                self.running.store(false, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    fn stop(&mut self) -> Result<(), ReplayError> {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.capture_handle.lock().take() {
            let _ = handle.join();
        }
        Ok(())
    }

    fn device_info(&self) -> CaptureDevice {
        CaptureDevice {
            id: self.device_name.clone(),
            name: self.device_name.clone(),
            is_default: !matches!(self.target, DeviceTarget::NamedInput(_)),
            is_loopback: self.target == DeviceTarget::Loopback,
        }
    }
}

impl Drop for CpalCaptureSource {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Body of the capture thread.
///
/// Sequence:
/// 1. Resolve the device again (it may have been replaced since construction)
/// 2. Check its format still matches the recorder's
/// 3. Build and play the stream, report the startup result
/// 4. Wait for a stop request or a device fault
fn capture_thread(
    target: DeviceTarget,
    expected: AudioFormat,
    running: Arc<AtomicBool>,
    on_chunk: ChunkCallback,
    on_event: SourceEventCallback,
    ready_tx: Sender<Result<(), ReplayError>>,
) {
    let (fault_tx, fault_rx) = crossbeam_channel::unbounded();

    let stream = match open_stream(&target, expected, on_chunk, fault_tx) {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(ReplayError::ConfigurationFailed(format!(
            "failed to start input stream: {}",
            e
        ))));
        return;
    }
    let _ = ready_tx.send(Ok(()));

    loop {
        match fault_rx.recv_timeout(STOP_POLL_INTERVAL) {
            Ok(StreamFault::DeviceLost(message)) => {
                log::warn!("Capture device lost: {}", message);
                // Cleared before reporting so a restart from the event
                // handler is not refused as already running.
                running.store(false, Ordering::SeqCst);
                drop(stream);
                on_event(SourceEvent::Stopped {
                    reason: Some(ReplayError::CaptureUnavailable),
                });
                return;
            }
            Ok(StreamFault::Other(message)) => {
                log::error!("Capture stream error: {}", message);
                on_event(SourceEvent::Error(ReplayError::Unknown(message)));
            }
            Err(RecvTimeoutError::Timeout) => {
                if !running.load(Ordering::SeqCst) {
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    drop(stream);
    log::debug!("Capture thread exiting");
}

fn open_stream(
    target: &DeviceTarget,
    expected: AudioFormat,
    on_chunk: ChunkCallback,
    fault_tx: Sender<StreamFault>,
) -> Result<cpal::Stream, ReplayError> {
    let (device, config) = resolve_device(target)?;

    let current = audio_format_for(&config)?;
    if current != expected {
        return Err(ReplayError::FormatChanged(format!(
            "device now reports {} Hz / {} ch / {}-bit, buffer was sized for {} Hz / {} ch / {}-bit",
            current.sample_rate,
            current.channels,
            current.bits_per_sample,
            expected.sample_rate,
            expected.channels,
            expected.bits_per_sample
        )));
    }

    let stream_config: StreamConfig = config.config();
    match config.sample_format() {
        SampleFormat::U8 => build_stream::<u8>(&device, &stream_config, on_chunk, fault_tx),
        SampleFormat::I8 => build_stream::<i8>(&device, &stream_config, on_chunk, fault_tx),
        SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, on_chunk, fault_tx),
        SampleFormat::U16 => build_stream::<u16>(&device, &stream_config, on_chunk, fault_tx),
        SampleFormat::I32 => build_stream::<i32>(&device, &stream_config, on_chunk, fault_tx),
        SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, on_chunk, fault_tx),
        SampleFormat::F64 => build_stream::<f64>(&device, &stream_config, on_chunk, fault_tx),
        other => Err(ReplayError::ConfigurationFailed(format!(
            "unsupported sample format {:?}",
            other
        ))),
    }
}

fn build_stream<T>(
    device: &Device,
    config: &StreamConfig,
    on_chunk: ChunkCallback,
    fault_tx: Sender<StreamFault>,
) -> Result<cpal::Stream, ReplayError>
where
    T: WireSample,
{
    // Reused across callbacks; grows to the largest period once.
    let mut scratch: Vec<u8> = Vec::new();

    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                scratch.clear();
                for &sample in data {
                    sample.append_le(&mut scratch);
                }
                on_chunk(&scratch);
            },
            move |err| {
                let fault = match err {
                    cpal::StreamError::DeviceNotAvailable => StreamFault::DeviceLost(err.to_string()),
                    other => StreamFault::Other(other.to_string()),
                };
                let _ = fault_tx.send(fault);
            },
            None,
        )
        .map_err(|e| ReplayError::ConfigurationFailed(format!("failed to build input stream: {}", e)))
}

fn resolve_device(target: &DeviceTarget) -> Result<(Device, SupportedStreamConfig), ReplayError> {
    let host = cpal::default_host();

    match target {
        DeviceTarget::DefaultInput => {
            let device = host.default_input_device().ok_or(ReplayError::CaptureUnavailable)?;
            let config = device
                .default_input_config()
                .map_err(|e| ReplayError::ConfigurationFailed(format!("no input config: {}", e)))?;
            Ok((device, config))
        }
        DeviceTarget::NamedInput(name) => {
            let device = host
                .input_devices()
                .map_err(|e| ReplayError::ConfigurationFailed(format!("failed to enumerate inputs: {}", e)))?
                .find(|d| d.name().map(|n| &n == name).unwrap_or(false))
                .ok_or(ReplayError::CaptureUnavailable)?;
            let config = device
                .default_input_config()
                .map_err(|e| ReplayError::ConfigurationFailed(format!("no input config: {}", e)))?;
            Ok((device, config))
        }
        DeviceTarget::Loopback => {
            let device = host.default_output_device().ok_or(ReplayError::CaptureUnavailable)?;
            let config = device
                .default_output_config()
                .map_err(|e| ReplayError::ConfigurationFailed(format!("no output config: {}", e)))?;
            Ok((device, config))
        }
    }
}

/// List input devices on the default host.
pub fn list_input_devices() -> Vec<CaptureDevice> {
    let host = cpal::default_host();
    let default_name = host.default_input_device().and_then(|d| d.name().ok());

    let mut devices = Vec::new();
    if let Ok(inputs) = host.input_devices() {
        for device in inputs {
            if let Ok(name) = device.name() {
                devices.push(CaptureDevice {
                    id: name.clone(),
                    is_default: default_name.as_deref() == Some(name.as_str()),
                    name,
                    is_loopback: false,
                });
            }
        }
    }
    devices
}

/// Map a cpal device config to the byte format delivered to the recorder.
///
/// `i8` and `u16` have no WAV equivalent and are re-biased to `u8` and `i16`.
fn audio_format_for(config: &SupportedStreamConfig) -> Result<AudioFormat, ReplayError> {
    wire_format(config.sample_format(), config.sample_rate().0, config.channels())
}

fn wire_format(sample_format: SampleFormat, sample_rate: u32, channels: u16) -> Result<AudioFormat, ReplayError> {
    let (bits_per_sample, sample_kind) = match sample_format {
        SampleFormat::U8 | SampleFormat::I8 => (8, SampleKind::Int),
        SampleFormat::I16 | SampleFormat::U16 => (16, SampleKind::Int),
        SampleFormat::I32 => (32, SampleKind::Int),
        SampleFormat::F32 => (32, SampleKind::Float),
        SampleFormat::F64 => (64, SampleKind::Float),
        other => {
            return Err(ReplayError::ConfigurationFailed(format!(
                "unsupported sample format {:?}",
                other
            )))
        }
    };

    Ok(AudioFormat {
        sample_rate,
        channels,
        bits_per_sample,
        sample_kind,
    })
}

/// A cpal sample that can be written as WAV-compatible little-endian bytes.
trait WireSample: SizedSample + Send + 'static {
    fn append_le(self, out: &mut Vec<u8>);
}

impl WireSample for u8 {
    fn append_le(self, out: &mut Vec<u8>) {
        out.push(self);
    }
}

impl WireSample for i8 {
    fn append_le(self, out: &mut Vec<u8>) {
        out.push((self as u8) ^ 0x80);
    }
}

impl WireSample for i16 {
    fn append_le(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }
}

impl WireSample for u16 {
    fn append_le(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&((self ^ 0x8000) as i16).to_le_bytes());
    }
}

impl WireSample for i32 {
    fn append_le(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }
}

impl WireSample for f32 {
    fn append_le(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }
}

impl WireSample for f64 {
    fn append_le(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode<T: WireSample>(samples: &[T]) -> Vec<u8> {
        let mut out = Vec::new();
        for &s in samples {
            s.append_le(&mut out);
        }
        out
    }

    #[test]
    fn wire_format_for_common_devices() {
        assert_eq!(
            wire_format(SampleFormat::F32, 48000, 2).unwrap(),
            AudioFormat::float32(48000, 2)
        );
        assert_eq!(
            wire_format(SampleFormat::I16, 44100, 1).unwrap(),
            AudioFormat::pcm16(44100, 1)
        );
        assert_eq!(
            wire_format(SampleFormat::U16, 44100, 1).unwrap(),
            AudioFormat::pcm16(44100, 1)
        );
    }

    #[test]
    fn wire_format_rejects_64_bit_ints() {
        assert!(matches!(
            wire_format(SampleFormat::I64, 48000, 2),
            Err(ReplayError::ConfigurationFailed(_))
        ));
    }

    #[test]
    fn signed_and_unsigned_samples_rebiased() {
        // i8 silence is u8 128
        assert_eq!(encode(&[0i8, -128, 127]), vec![0x80, 0x00, 0xFF]);
        // u16 midpoint is i16 zero
        assert_eq!(encode(&[0x8000u16, 0u16]), vec![0x00, 0x00, 0x00, 0x80]);
    }

    #[test]
    fn float_samples_little_endian() {
        let bytes = encode(&[0.5f32, -1.0f32]);
        assert_eq!(&bytes[..4], &0.5f32.to_le_bytes());
        assert_eq!(&bytes[4..], &(-1.0f32).to_le_bytes());
    }
}
