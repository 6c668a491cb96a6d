use super::error::ReplayError;

/// Capture lifecycle of a recorder.
///
/// State transitions:
/// ```text
/// idle ──start──→ active ──stop──→ idle
///                  │  ↑
///   unsolicited stop  └─ auto-resume (once per event)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Active,
}

impl CaptureState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

/// What `start_capture` actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    /// Capture was already running; nothing changed.
    AlreadyActive,
}

/// State of a `PlaybackSink`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    Playing,
}

/// What `play` actually did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlayOutcome {
    Started { byte_len: usize, duration_secs: f64 },
    /// A previous playback is still running on the sink.
    AlreadyPlaying,
}

/// Lifecycle events reported by a `CaptureSource` from its own thread.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceEvent {
    /// The device stopped without being asked to (disconnect, format change,
    /// driver reset). `reason` carries the device error, if any.
    Stopped { reason: Option<ReplayError> },

    /// A non-fatal stream error; capture keeps running.
    Error(ReplayError),
}
