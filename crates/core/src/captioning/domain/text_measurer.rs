/// Measures the rendered width of a string in pixels.
///
/// Packing and rendering must measure with the same font at the same size,
/// otherwise packed segments can overflow the width budget on screen.
pub trait TextMeasurer {
    fn text_width(&self, text: &str) -> u32;
}
