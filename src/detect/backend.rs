use anyhow::Result;

use crate::detect::result::Detection;
use crate::error::TrackError;
use crate::frame::{FrameImage, FrameRef};

/// Detector backend trait.
///
/// The detector is an external, potentially expensive collaborator. The
/// engine only sees the list of boxes it returns for a frame, so any
/// implementation (a live model, materialised label files, a scripted feed
/// for tests) can stand behind this trait.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on a frame.
    ///
    /// An empty list is a normal result, not an error. Failures are
    /// reported per frame and never poison the backend for later frames.
    fn detect(&mut self, frame: &FrameRef, image: &FrameImage)
        -> Result<Vec<Detection>, TrackError>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
