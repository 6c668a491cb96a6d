//! # instant-replay-cpal
//!
//! Cross-platform backend for instant-replay-core.
//!
//! Provides:
//! - `CpalCaptureSource`: capture from the default input, a named input, or WASAPI loopback
//! - `RodioPlaybackSink`: playback through the default output device
//! - `list_input_devices`: input device enumeration
//!
//! ## Usage
//! ```ignore
//! use instant_replay_core::{RecorderConfiguration, ReplayRecorder};
//! use instant_replay_cpal::{CpalCaptureSource, RodioPlaybackSink};
//!
//! let source = CpalCaptureSource::default_input()?;
//! let sink = RodioPlaybackSink::open_default()?;
//! let recorder = ReplayRecorder::new(source, sink, RecorderConfiguration::default())?;
//! recorder.start_capture()?;
//! ```

pub mod cpal_capture;
pub mod rodio_playback;

pub use cpal_capture::{list_input_devices, CpalCaptureSource};
pub use rodio_playback::RodioPlaybackSink;
