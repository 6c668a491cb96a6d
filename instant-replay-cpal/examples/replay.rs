//! Buffer a few seconds of audio, play it back, and save it.
//!
//! ```text
//! cargo run -p instant-replay-cpal --example replay -- [seconds] [--loopback] [--encrypt]
//! ```

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use instant_replay_core::{
    AesGcmClipEncryptor, CaptureState, ClipEncryptor, RecorderConfiguration, RecorderDelegate, ReplayError,
    ReplayRecorder, SavedClip,
};
use instant_replay_cpal::{list_input_devices, CpalCaptureSource, RodioPlaybackSink};

struct LogDelegate;

impl RecorderDelegate for LogDelegate {
    fn on_capture_state_changed(&self, state: CaptureState) {
        log::info!("capture state: {:?}", state);
    }

    fn on_error(&self, error: &ReplayError) {
        log::error!("recorder error: {}", error);
    }

    fn on_capture_resumed(&self) {
        log::warn!("capture resumed after device stop");
    }

    fn on_clip_saved(&self, clip: &SavedClip) {
        log::info!("saved {} (sha256 {})", clip.file_path.display(), clip.checksum);
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let record_seconds = args
        .iter()
        .find_map(|a| a.parse::<f64>().ok())
        .unwrap_or(5.0);
    let loopback = args.iter().any(|a| a == "--loopback");
    let encrypt = args.iter().any(|a| a == "--encrypt");

    for device in list_input_devices() {
        log::info!("input: {}{}", device.name, if device.is_default { " (default)" } else { "" });
    }

    let source = if loopback {
        CpalCaptureSource::loopback()?
    } else {
        CpalCaptureSource::default_input()?
    };
    let sink = RodioPlaybackSink::open_default()?;

    let encryptor: Option<Box<dyn ClipEncryptor>> = if encrypt {
        Some(Box::new(AesGcmClipEncryptor::generate("demo-key")))
    } else {
        None
    };
    let config = RecorderConfiguration {
        record_seconds,
        output_directory: std::env::temp_dir().join("instant-replay"),
        encryptor,
        write_metadata: true,
    };

    let recorder = ReplayRecorder::new(source, sink, config)?;
    recorder.set_delegate(Arc::new(LogDelegate));
    recorder.start_capture()?;

    // Let the window fill and wrap once.
    thread::sleep(Duration::from_secs_f64(record_seconds + 1.0));
    log::info!("buffered {:.1}s, wrapped: {}", recorder.buffered_secs(), recorder.has_wrapped());

    recorder.play()?;
    while recorder.playback_state() == instant_replay_core::PlaybackState::Playing {
        thread::sleep(Duration::from_millis(100));
    }

    let clip = recorder.save_clip()?;
    println!("{}", clip.file_path.display());

    recorder.stop_capture()?;
    log::info!("{:?}", recorder.diagnostics());
    Ok(())
}
