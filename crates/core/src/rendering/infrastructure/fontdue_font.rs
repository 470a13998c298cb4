use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use fontdue::layout::{
    CoordinateSystem, GlyphRasterConfig, Layout, LayoutSettings, TextStyle, VerticalAlign,
};
use fontdue::{Font, FontSettings};
use image::Rgba;
use thiserror::Error;

use crate::captioning::domain::text_measurer::TextMeasurer;
use crate::rendering::domain::caption_font::CaptionFont;
use crate::shared::layer::Layer;

#[derive(Error, Debug)]
pub enum FontError {
    #[error("failed to read font {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse font {name}: {message}")]
    Parse { name: String, message: &'static str },
}

/// TrueType/OpenType font rasterized with fontdue.
pub struct FontdueFont {
    font: Font,
    name: String,
    size: u32,
    ascent: u32,
    descent: u32,
    glyph_cache: RefCell<HashMap<GlyphRasterConfig, Vec<u8>>>,
}

impl FontdueFont {
    pub fn from_file(path: &Path, size: u32) -> Result<Self, FontError> {
        let bytes = fs::read(path).map_err(|source| FontError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(bytes, size, path.display().to_string())
    }

    pub fn from_bytes(bytes: Vec<u8>, size: u32, name: String) -> Result<Self, FontError> {
        let px = size as f32;
        let settings = FontSettings {
            scale: px,
            ..FontSettings::default()
        };
        let font = Font::from_bytes(bytes, settings).map_err(|message| FontError::Parse {
            name: name.clone(),
            message,
        })?;

        let (ascent, descent) = match font.horizontal_line_metrics(px) {
            Some(m) => (m.ascent.ceil().max(0.0), (-m.descent).ceil().max(0.0)),
            None => ((px * 0.8).ceil(), (px * 0.2).ceil()),
        };

        Ok(Self {
            font,
            name,
            size,
            ascent: ascent as u32,
            descent: descent as u32,
            glyph_cache: RefCell::new(HashMap::new()),
        })
    }

    fn px(&self) -> f32 {
        self.size as f32
    }
}

impl TextMeasurer for FontdueFont {
    fn text_width(&self, text: &str) -> u32 {
        let px = self.px();
        let mut width = 0.0f32;
        let mut previous: Option<char> = None;
        for c in text.chars() {
            if let Some(prev) = previous {
                width += self.font.horizontal_kern(prev, c, px).unwrap_or(0.0);
            }
            width += self.font.metrics(c, px).advance_width;
            previous = Some(c);
        }
        width.ceil().max(0.0) as u32
    }
}

impl CaptionFont for FontdueFont {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u32 {
        self.size
    }

    fn ascent(&self) -> u32 {
        self.ascent
    }

    fn descent(&self) -> u32 {
        self.descent
    }

    fn draw(&self, layer: &mut Layer, x: i32, y: i32, text: &str, color: Rgba<u8>) {
        let mut layout = Layout::new(CoordinateSystem::PositiveYDown);
        layout.reset(&LayoutSettings {
            x: x as f32,
            y: y as f32,
            vertical_align: VerticalAlign::Top,
            ..LayoutSettings::default()
        });
        layout.append(&[&self.font], &TextStyle::new(text, self.px(), 0));

        let mut cache = self.glyph_cache.borrow_mut();
        for glyph in layout.glyphs() {
            if glyph.width == 0 || glyph.height == 0 {
                continue;
            }
            let bitmap = cache
                .entry(glyph.key)
                .or_insert_with(|| self.font.rasterize_config(glyph.key).1);
            let gx = glyph.x.round() as i32;
            let gy = glyph.y.round() as i32;
            for row in 0..glyph.height {
                for col in 0..glyph.width {
                    let coverage = bitmap[row * glyph.width + col];
                    layer.blend_coverage(gx + col as i32, gy + row as i32, coverage, color);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn fixture_font(size: u32) -> FontdueFont {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures/fonts/DejaVuSansMono.ttf");
        FontdueFont::from_file(&path, size).unwrap()
    }

    #[rstest]
    #[case::word(32, "Hello")]
    #[case::sentence(32, "Hello, quiet gym")]
    #[case::small(14, "Hey, quiet pug")]
    #[case::large(64, "Wordy")]
    fn test_drawn_ink_stays_inside_measured_box(#[case] size: u32, #[case] text: &str) {
        let font = fixture_font(size);
        let (x, y) = (20, 10);
        let mut layer = Layer::new(
            font.text_width(text) + 2 * x as u32,
            font.line_height() + 2 * y as u32,
        );
        font.draw(&mut layer, x, y, text, Rgba([255, 255, 255, 255]));

        let ink = layer.alpha_bounds().expect("text left no ink");
        let width = font.text_width(text) as i32;
        let height = font.line_height() as i32;
        assert!(ink.left >= x - 1, "{ink:?}");
        assert!(ink.right <= x + width + 1, "{ink:?} wider than {width}px");
        assert!(ink.top >= y - 1, "{ink:?}");
        assert!(ink.bottom <= y + height + 1, "{ink:?} taller than {height}px");
        assert!(ink.width() * 2 >= width, "{ink:?} too narrow for {width}px");
    }

    #[test]
    fn test_width_is_sum_of_parts_for_monospace() {
        let font = fixture_font(32);
        let one = font.text_width("m");
        assert!(one > 0);
        assert!(font.text_width("mmmm") <= 4 * one);
        assert!(font.text_width("mmmm") + 4 > 4 * one);
        assert_eq!(font.text_width(""), 0);
    }

    #[test]
    fn test_line_box_scales_with_size() {
        let small = fixture_font(16);
        let large = fixture_font(48);
        assert!(small.ascent() > small.descent());
        assert!(large.line_height() >= 3 * small.line_height() - 3);
        assert!(large.line_height() <= 48 * 2);
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = FontdueFont::from_file(&dir.path().join("absent.ttf"), 32);
        assert!(matches!(result, Err(FontError::Read { .. })));
    }

    #[test]
    fn test_garbage_bytes_are_parse_error() {
        let result = FontdueFont::from_bytes(b"not a font".to_vec(), 32, "junk".to_string());
        match result {
            Err(FontError::Parse { name, .. }) => assert_eq!(name, "junk"),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("garbage parsed as a font"),
        }
    }
}
