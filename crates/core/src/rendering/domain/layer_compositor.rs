use image::Rgba;

use crate::captioning::domain::timeline::ActiveCaption;
use crate::rendering::domain::caption_font::CaptionFont;
use crate::rendering::domain::caption_style::CaptionStyle;
use crate::rendering::domain::layer_blurrer::LayerBlurrer;
use crate::rendering::domain::highlight_mode::HighlightMode;
use crate::shared::constants::{BACKGROUND_ALPHA, HIGHLIGHT_BACKGROUND_ALPHA};
use crate::shared::frame::Frame;
use crate::shared::layer::{Layer, PixelRect};

// Decoration sizes as fractions of the font size.
const BACKGROUND_PAD_X: f64 = 0.5;
const BACKGROUND_PAD_Y: f64 = 0.3;
const BACKGROUND_RADIUS: f64 = 0.3;
const HIGHLIGHT_PAD: f64 = 0.2;
const HIGHLIGHT_RADIUS: f64 = 0.15;

/// Captions are kept this fraction of the frame size away from its edges.
const EDGE_MARGIN: f64 = 0.01;

const SHADOW_COLOR: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// A word positioned on the caption line.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacedWord {
    /// Position in the segment's word list, `None` for unsplit segment text.
    pub word_index: Option<usize>,
    pub text: String,
    pub x: i32,
    pub width: u32,
    pub color: Rgba<u8>,
}

/// Geometry of one frame's caption, already shifted inside the frame.
#[derive(Clone, Debug, PartialEq)]
pub struct CaptionLayout {
    /// Text line box: words plus spacing, one font line tall.
    pub line: PixelRect,
    pub words: Vec<PlacedWord>,
    pub background: Option<PixelRect>,
    pub highlight: Option<PixelRect>,
}

impl CaptionLayout {
    pub fn word_box(&self, word: &PlacedWord) -> PixelRect {
        PixelRect::new(
            word.x,
            self.line.top,
            word.x + word.width as i32,
            self.line.bottom,
        )
    }

    fn translate(&mut self, dx: i32, dy: i32) {
        self.line = self.line.translate(dx, dy);
        for word in &mut self.words {
            word.x += dx;
        }
        self.background = self.background.map(|r| r.translate(dx, dy));
        self.highlight = self.highlight.map(|r| r.translate(dx, dy));
    }
}

/// The layers drawn for one frame, bottom to top.
pub struct CaptionOverlay {
    pub background: Option<Layer>,
    pub highlight: Option<Layer>,
    pub shadow: Layer,
    pub text: Layer,
}

impl CaptionOverlay {
    pub fn composite_onto(&self, frame: &mut Frame) {
        if let Some(background) = &self.background {
            background.composite_onto(frame);
        }
        if let Some(highlight) = &self.highlight {
            highlight.composite_onto(frame);
        }
        self.shadow.composite_onto(frame);
        self.text.composite_onto(frame);
    }
}

/// Renders caption overlays for resolved segments.
pub struct LayerCompositor {
    style: CaptionStyle,
    font: Box<dyn CaptionFont>,
    shadow_blurrer: Option<Box<dyn LayerBlurrer>>,
}

impl LayerCompositor {
    pub fn new(
        style: CaptionStyle,
        font: Box<dyn CaptionFont>,
        shadow_blurrer: Option<Box<dyn LayerBlurrer>>,
    ) -> Self {
        Self {
            style,
            font,
            shadow_blurrer,
        }
    }

    pub fn style(&self) -> &CaptionStyle {
        &self.style
    }

    pub fn font(&self) -> &dyn CaptionFont {
        self.font.as_ref()
    }

    fn scaled(&self, ratio: f64) -> i32 {
        (f64::from(self.font.size()) * ratio) as i32
    }

    /// Positions the caption for `active` on a `width` x `height` frame.
    /// Returns `None` when nothing should be drawn.
    pub fn layout(&self, active: &ActiveCaption<'_>, width: u32, height: u32) -> Option<CaptionLayout> {
        let segment = active.segment;
        let visible: Vec<(Option<usize>, &str)> = match self.style.mode {
            HighlightMode::CurrentWordOnly => {
                let index = active.word_index?;
                vec![(Some(index), segment.words.get(index)?.text.as_str())]
            }
            _ if segment.words.is_empty() => vec![(None, segment.text.as_str())],
            _ => segment
                .words
                .iter()
                .enumerate()
                .map(|(i, w)| (Some(i), w.text.as_str()))
                .collect(),
        };
        if visible.iter().all(|(_, text)| text.trim().is_empty()) {
            return None;
        }

        let widths: Vec<u32> = visible.iter().map(|(_, t)| self.font.text_width(t)).collect();
        let spacing = self.style.word_spacing * (visible.len() as u32 - 1);
        let total_width = widths.iter().sum::<u32>() + spacing;
        let line_height = self.font.line_height() as i32;

        let (px, py) = self.style.position;
        let start_x = (f64::from(width) * px) as i32 - total_width as i32 / 2;
        let top = (f64::from(height) * py) as i32 - line_height / 2;
        let line = PixelRect::new(start_x, top, start_x + total_width as i32, top + line_height);

        let mut words = Vec::with_capacity(visible.len());
        let mut highlight = None;
        let mut x = start_x;
        for ((word_index, text), width) in visible.into_iter().zip(widths) {
            let active_word = word_index.is_some() && word_index == active.word_index;
            let color = if active_word && self.style.mode.recolors_text() {
                self.style.highlight_color.opaque()
            } else {
                self.style.text_color.opaque()
            };
            if active_word && self.style.mode.draws_word_background() {
                let pad = self.scaled(HIGHLIGHT_PAD);
                highlight = Some(
                    PixelRect::new(x, line.top, x + width as i32, line.bottom).expand(pad, pad),
                );
            }
            words.push(PlacedWord {
                word_index,
                text: text.to_string(),
                x,
                width,
                color,
            });
            x += width as i32 + self.style.word_spacing as i32;
        }

        let background = self.style.background_color.map(|_| {
            line.expand(self.scaled(BACKGROUND_PAD_X), self.scaled(BACKGROUND_PAD_Y))
        });

        let mut layout = CaptionLayout {
            line,
            words,
            background,
            highlight,
        };

        // The block extent does not depend on which word is active, so the
        // caption stays put while highlighting moves along it.
        let extent = match layout.background {
            Some(bg) => bg,
            None if self.style.mode.draws_word_background() => {
                let pad = self.scaled(HIGHLIGHT_PAD);
                line.expand(pad, pad)
            }
            None => line,
        };
        let dx = edge_shift(extent.left, extent.right, width);
        let dy = edge_shift(extent.top, extent.bottom, height);
        layout.translate(dx, dy);

        Some(layout)
    }

    /// Draws the caption layers for `active`, or returns `None` when the
    /// frame has no caption.
    pub fn render(
        &self,
        active: Option<&ActiveCaption<'_>>,
        width: u32,
        height: u32,
    ) -> Result<Option<CaptionOverlay>, Box<dyn std::error::Error>> {
        let Some(layout) = active.and_then(|a| self.layout(a, width, height)) else {
            return Ok(None);
        };

        let background = match (layout.background, self.style.background_color) {
            (Some(rect), Some(color)) => {
                let mut layer = Layer::new(width, height);
                let radius = self.scaled(BACKGROUND_RADIUS).max(0) as u32;
                layer.fill_rounded_rect(rect, radius, color.with_alpha(BACKGROUND_ALPHA));
                Some(layer)
            }
            _ => None,
        };

        let highlight = layout.highlight.map(|rect| {
            let mut layer = Layer::new(width, height);
            let radius = self.scaled(HIGHLIGHT_RADIUS).max(0) as u32;
            let color = self
                .style
                .highlight_background_color
                .with_alpha(HIGHLIGHT_BACKGROUND_ALPHA);
            layer.fill_rounded_rect(rect, radius, color);
            layer
        });

        let mut shadow = Layer::new(width, height);
        let mut text = Layer::new(width, height);
        for word in &layout.words {
            self.font
                .draw(&mut shadow, word.x, layout.line.top, &word.text, SHADOW_COLOR);
            self.font
                .draw(&mut text, word.x, layout.line.top, &word.text, word.color);
        }
        if let Some(blurrer) = &self.shadow_blurrer {
            blurrer.blur(&mut shadow)?;
        }

        Ok(Some(CaptionOverlay {
            background,
            highlight,
            shadow,
            text,
        }))
    }

    /// Renders the caption for `active` straight onto `frame`.
    pub fn caption_frame(
        &self,
        frame: &mut Frame,
        active: Option<&ActiveCaption<'_>>,
    ) -> Result<bool, Box<dyn std::error::Error>> {
        match self.render(active, frame.width(), frame.height())? {
            Some(overlay) => {
                overlay.composite_onto(frame);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Smallest shift that keeps `[low, high)` inside `[margin, size - margin)`.
/// When the span is wider than that, the low edge wins.
fn edge_shift(low: i32, high: i32, size: u32) -> i32 {
    let margin = (f64::from(size) * EDGE_MARGIN).round() as i32;
    let mut shift = 0;
    let limit = size as i32 - margin;
    if high > limit {
        shift = limit - high;
    }
    if low + shift < margin {
        shift = margin - low;
    }
    shift
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::captioning::domain::segment::Segment;
    use crate::captioning::domain::text_measurer::TextMeasurer;
    use crate::captioning::domain::word::Token;
    use crate::rendering::infrastructure::block_font::BlockFont;
    use crate::rendering::infrastructure::cpu_layer_blurrer::CpuLayerBlurrer;
    use crate::shared::color::Rgb;
    use rstest::rstest;

    const W: u32 = 640;
    const H: u32 = 360;
    const FONT_SIZE: u32 = 40;

    fn segment() -> Segment {
        Segment {
            index: 1,
            start: 0.0,
            end: 2.0,
            text: "one two three".to_string(),
            words: vec![
                Token::new("one", 0.0, 0.5),
                Token::new("two", 0.6, 1.0),
                Token::new("three", 1.0, 2.0),
            ],
        }
    }

    fn compositor(style: CaptionStyle) -> LayerCompositor {
        LayerCompositor::new(style, Box::new(BlockFont::new(FONT_SIZE)), None)
    }

    fn style(mode: HighlightMode) -> CaptionStyle {
        CaptionStyle {
            mode,
            ..CaptionStyle::default()
        }
    }

    fn active(segment: &Segment, t: f64) -> ActiveCaption<'_> {
        ActiveCaption {
            segment,
            word_index: segment.active_word(t),
        }
    }

    #[test]
    fn test_no_active_segment_renders_nothing() {
        let c = compositor(style(HighlightMode::Text));
        assert!(c.render(None, W, H).unwrap().is_none());
    }

    #[test]
    fn test_words_are_centered_and_spaced() {
        let c = compositor(style(HighlightMode::Text));
        let seg = segment();
        let layout = c.layout(&active(&seg, 0.1), W, H).unwrap();

        let font = BlockFont::new(FONT_SIZE);
        let widths: Vec<u32> = ["one", "two", "three"].iter().map(|t| font.text_width(t)).collect();
        let total = widths.iter().sum::<u32>() as i32 + 2 * 10;

        assert_eq!(layout.line.width(), total);
        assert_eq!(layout.line.left, 320 - total / 2);
        assert_eq!(layout.line.height(), font.line_height() as i32);
        assert_eq!(layout.line.top, 288 - font.line_height() as i32 / 2);
        assert_eq!(layout.words[1].x, layout.words[0].x + widths[0] as i32 + 10);
        assert_eq!(layout.words[2].x, layout.words[1].x + widths[1] as i32 + 10);
        assert!(layout.background.is_none());
        assert!(layout.highlight.is_none());
    }

    #[rstest]
    #[case::text(HighlightMode::Text, true)]
    #[case::background(HighlightMode::Background, false)]
    #[case::both(HighlightMode::Both, true)]
    fn test_active_word_color(#[case] mode: HighlightMode, #[case] recolored: bool) {
        let c = compositor(style(mode));
        let seg = segment();
        let layout = c.layout(&active(&seg, 0.7), W, H).unwrap();
        let expected = if recolored { Rgb::YELLOW } else { Rgb::WHITE };
        assert_eq!(layout.words[1].color, expected.opaque());
        assert_eq!(layout.words[0].color, Rgb::WHITE.opaque());
        assert_eq!(layout.words[2].color, Rgb::WHITE.opaque());
    }

    #[test]
    fn test_current_word_only_shows_just_the_active_word() {
        let c = compositor(style(HighlightMode::CurrentWordOnly));
        let seg = segment();

        let overlay = c.render(Some(&active(&seg, 0.7)), W, H).unwrap().unwrap();
        let layout = c.layout(&active(&seg, 0.7), W, H).unwrap();
        assert_eq!(layout.words.len(), 1);
        assert_eq!(layout.words[0].text, "two");

        let ink = overlay.text.alpha_bounds().unwrap();
        let word_box = layout.word_box(&layout.words[0]);
        assert!(ink.left >= word_box.left && ink.right <= word_box.right);
        assert!(ink.top >= word_box.top && ink.bottom <= word_box.bottom);
        assert!(overlay.highlight.is_none());
    }

    #[test]
    fn test_current_word_only_in_word_gap_renders_nothing() {
        let c = compositor(style(HighlightMode::CurrentWordOnly));
        let seg = segment();
        let gap = active(&seg, 0.55);
        assert_eq!(gap.word_index, None);
        assert!(c.render(Some(&gap), W, H).unwrap().is_none());
    }

    #[test]
    fn test_background_mode_highlight_contains_padded_word() {
        let c = compositor(style(HighlightMode::Background));
        let seg = segment();
        let now = active(&seg, 1.5);

        let overlay = c.render(Some(&now), W, H).unwrap().unwrap();
        let layout = c.layout(&now, W, H).unwrap();
        let pad = (FONT_SIZE as f64 * HIGHLIGHT_PAD) as i32;

        let highlight = overlay.highlight.as_ref().unwrap().alpha_bounds().unwrap();
        let active_box = layout.word_box(&layout.words[2]);
        let glyphs = active_box.expand(pad, pad);
        assert!(highlight.left <= glyphs.left && highlight.right >= glyphs.right);
        assert!(highlight.top <= glyphs.top && highlight.bottom >= glyphs.bottom);

        // Non-active words get no backing.
        let other = layout.word_box(&layout.words[0]);
        assert!(highlight.left > other.right);
        assert_eq!(overlay.highlight.as_ref().unwrap().pixel(200, 5)[3], 0);
    }

    #[test]
    fn test_highlight_layer_only_in_background_modes() {
        let seg = segment();
        let now = active(&seg, 0.1);
        let text = compositor(style(HighlightMode::Text)).render(Some(&now), W, H).unwrap().unwrap();
        assert!(text.highlight.is_none());
        let both = compositor(style(HighlightMode::Both)).render(Some(&now), W, H).unwrap().unwrap();
        assert!(both.highlight.is_some());
    }

    #[test]
    fn test_background_sized_with_padding() {
        let c = compositor(CaptionStyle {
            background_color: Some(Rgb::BLACK),
            ..style(HighlightMode::Text)
        });
        let seg = segment();
        let now = active(&seg, 0.1);
        let layout = c.layout(&now, W, H).unwrap();
        let bg = layout.background.unwrap();
        assert_eq!(bg, layout.line.expand(20, 12));

        let overlay = c.render(Some(&now), W, H).unwrap().unwrap();
        let layer = overlay.background.unwrap();
        let mid = layer.pixel(((bg.left + bg.right) / 2) as u32, bg.top as u32);
        assert_eq!(mid, Rgb::BLACK.with_alpha(BACKGROUND_ALPHA));
    }

    #[test]
    fn test_caption_shifted_inside_right_edge_with_background() {
        let c = compositor(CaptionStyle {
            background_color: Some(Rgb::BLUE),
            position: (0.98, 0.5),
            ..style(HighlightMode::Text)
        });
        let seg = segment();
        let layout = c.layout(&active(&seg, 0.1), W, H).unwrap();
        let bg = layout.background.unwrap();
        let margin = (W as f64 * EDGE_MARGIN).round() as i32;
        assert_eq!(bg.right, W as i32 - margin);
        // Text moved by the same amount as the backing.
        assert_eq!(layout.line, bg.expand(-20, -12));
    }

    #[test]
    fn test_caption_shifted_down_from_top_edge() {
        let c = compositor(CaptionStyle {
            position: (0.5, 0.0),
            ..style(HighlightMode::Text)
        });
        let seg = segment();
        let layout = c.layout(&active(&seg, 0.1), W, H).unwrap();
        let margin = (H as f64 * EDGE_MARGIN).round() as i32;
        assert_eq!(layout.line.top, margin);
    }

    #[test]
    fn test_caption_frame_changes_pixels_only_with_caption() {
        let c = LayerCompositor::new(
            style(HighlightMode::Text),
            Box::new(BlockFont::new(FONT_SIZE)),
            Some(Box::new(CpuLayerBlurrer::new(2))),
        );
        let seg = segment();

        let mut frame = Frame::solid(W, H, [40, 40, 40], 0);
        assert!(c.caption_frame(&mut frame, Some(&active(&seg, 0.1))).unwrap());
        assert!(frame.data().iter().any(|&v| v == 255));

        let mut untouched = Frame::solid(W, H, [40, 40, 40], 1);
        assert!(!c.caption_frame(&mut untouched, None).unwrap());
        assert!(untouched.data().iter().all(|&v| v == 40));
    }

    #[test]
    fn test_shadow_is_blurred_beyond_glyphs() {
        let c = LayerCompositor::new(
            style(HighlightMode::Text),
            Box::new(BlockFont::new(FONT_SIZE)),
            Some(Box::new(CpuLayerBlurrer::new(3))),
        );
        let seg = segment();
        let overlay = c.render(Some(&active(&seg, 0.1)), W, H).unwrap().unwrap();
        let text = overlay.text.alpha_bounds().unwrap();
        let shadow = overlay.shadow.alpha_bounds().unwrap();
        assert!(shadow.left < text.left && shadow.right > text.right);
        assert!(shadow.top < text.top && shadow.bottom > text.bottom);
    }

    #[rstest]
    #[case::inside(100, 200, 640, 0)]
    #[case::past_right(600, 700, 640, -66)]
    #[case::past_left(-20, 50, 640, 26)]
    #[case::too_wide(-100, 800, 640, 106)]
    fn test_edge_shift(#[case] low: i32, #[case] high: i32, #[case] size: u32, #[case] expected: i32) {
        assert_eq!(edge_shift(low, high, size), expected);
    }
}
