use image::Rgba;

use crate::captioning::domain::text_measurer::TextMeasurer;
use crate::shared::layer::Layer;

/// A font loaded at a fixed pixel size.
///
/// The same instance measures text for segment packing and draws it during
/// rendering.
pub trait CaptionFont: TextMeasurer + Send {
    /// Human readable origin, for logging.
    fn name(&self) -> &str;

    /// Pixel size the font was loaded at.
    fn size(&self) -> u32;

    /// Distance from the top of the line box to the baseline.
    fn ascent(&self) -> u32;

    /// Distance from the baseline to the bottom of the line box.
    fn descent(&self) -> u32;

    fn line_height(&self) -> u32 {
        self.ascent() + self.descent()
    }

    /// Draws `text` with the top-left of its line box at `(x, y)`.
    fn draw(&self, layer: &mut Layer, x: i32, y: i32, text: &str, color: Rgba<u8>);
}
