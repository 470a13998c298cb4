use crate::rendering::domain::highlight_mode::HighlightMode;
use crate::shared::color::Rgb;

/// Visual settings for one render. Sizes that depend on the font (padding,
/// corner radii) are derived from the font size at layout time.
#[derive(Clone, Debug, PartialEq)]
pub struct CaptionStyle {
    pub text_color: Rgb,
    pub highlight_color: Rgb,
    /// `None` draws no caption backing.
    pub background_color: Option<Rgb>,
    pub highlight_background_color: Rgb,
    /// Caption center as fractions of frame width and height.
    pub position: (f64, f64),
    pub word_spacing: u32,
    pub blur_radius: u32,
    pub mode: HighlightMode,
}

impl Default for CaptionStyle {
    fn default() -> Self {
        Self {
            text_color: Rgb::WHITE,
            highlight_color: Rgb::YELLOW,
            background_color: None,
            highlight_background_color: Rgb::GREEN,
            position: (0.5, 0.8),
            word_spacing: crate::shared::constants::DEFAULT_WORD_SPACING_PIXELS,
            blur_radius: crate::shared::constants::DEFAULT_BLUR_RADIUS,
            mode: HighlightMode::Text,
        }
    }
}
