use std::path::PathBuf;

use crate::shared::constants::FALLBACK_FPS;
use crate::shared::rotation::Rotation;

#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub total_frames: usize,
    pub codec: String,
    pub source_path: Option<PathBuf>,
}

impl VideoMetadata {
    /// Frame rate used for timing, falling back when the container reports
    /// none.
    pub fn effective_fps(&self) -> f64 {
        if self.fps.is_finite() && self.fps > 0.0 {
            self.fps
        } else {
            FALLBACK_FPS
        }
    }

    /// Playback time in seconds of the frame at `index`.
    pub fn frame_time(&self, index: usize) -> f64 {
        index as f64 / self.effective_fps()
    }

    /// Metadata as seen after `rotation` is applied to every frame.
    pub fn rotated(&self, rotation: Rotation) -> Self {
        let (width, height) = rotation.output_dims(self.width, self.height);
        Self {
            width,
            height,
            ..self.clone()
        }
    }
}
