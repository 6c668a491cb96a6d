use crate::models::error::ReplayError;
use crate::models::saved_clip::SavedClip;
use crate::models::state::CaptureState;

/// Event delegate for recorder notifications.
///
/// Methods may be called from the supervisor thread, not the UI thread.
/// Implementations should marshal to the UI thread if needed.
pub trait RecorderDelegate: Send + Sync {
    /// Called when capture starts or stops.
    fn on_capture_state_changed(&self, state: CaptureState);

    /// Called for capture-side errors that are not handled internally,
    /// including `CaptureUnavailable` when an auto-resume fails.
    fn on_error(&self, error: &ReplayError);

    /// Called after the device stopped on its own and capture was resumed.
    fn on_capture_resumed(&self) {}

    /// Called after a clip has been written.
    fn on_clip_saved(&self, _clip: &SavedClip) {}
}
