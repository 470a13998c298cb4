use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// Encodes a silent video stream frame by frame.
///
/// The sink accepts frames at the resolution and frame rate given to
/// `open`, in source order. Audio is never written here; it is merged
/// afterwards by an [`AudioRemuxer`](super::audio_remuxer::AudioRemuxer).
pub trait VideoWriter: Send {
    fn open(
        &mut self,
        path: &Path,
        metadata: &VideoMetadata,
    ) -> Result<(), Box<dyn std::error::Error>>;

    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>>;

    /// Flushes pending packets and finalizes the container.
    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>>;
}
