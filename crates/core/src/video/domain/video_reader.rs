use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// Decodes frames from a video source in presentation order.
///
/// Implementations handle container and codec details while the caption
/// pipeline only sees RGB [`Frame`]s and [`VideoMetadata`].
pub trait VideoReader: Send {
    /// Opens a video file and returns its metadata.
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>>;

    /// Returns an iterator over decoded frames with sequential indices.
    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_>;

    /// Releases any resources held by the reader. Safe to call twice.
    fn close(&mut self);
}
