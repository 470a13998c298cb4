use image::{Rgba, RgbaImage};

use crate::shared::frame::Frame;

/// Axis-aligned pixel rectangle. `right` and `bottom` are exclusive, and
/// the rectangle may extend past the canvas in any direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl PixelRect {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> i32 {
        (self.right - self.left).max(0)
    }

    pub fn height(&self) -> i32 {
        (self.bottom - self.top).max(0)
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    pub fn translate(&self, dx: i32, dy: i32) -> Self {
        Self::new(
            self.left + dx,
            self.top + dy,
            self.right + dx,
            self.bottom + dy,
        )
    }

    /// Grows the rectangle by `dx` on the left and right and `dy` on the top
    /// and bottom.
    pub fn expand(&self, dx: i32, dy: i32) -> Self {
        Self::new(
            self.left - dx,
            self.top - dy,
            self.right + dx,
            self.bottom + dy,
        )
    }

    /// The part of the rectangle that lies on a `width` x `height` canvas,
    /// as `(x0, y0, x1, y1)` with exclusive upper bounds.
    pub fn clip(&self, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
        let x0 = self.left.clamp(0, width as i32);
        let y0 = self.top.clamp(0, height as i32);
        let x1 = self.right.clamp(0, width as i32);
        let y1 = self.bottom.clamp(0, height as i32);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some((x0 as u32, y0 as u32, x1 as u32, y1 as u32))
    }

    fn contains_rounded(&self, x: i32, y: i32, radius: i32) -> bool {
        if x < self.left || x >= self.right || y < self.top || y >= self.bottom {
            return false;
        }
        if radius <= 0 {
            return true;
        }

        let right = self.right - 1;
        let bottom = self.bottom - 1;
        if x >= self.left + radius && x <= right - radius {
            return true;
        }
        if y >= self.top + radius && y <= bottom - radius {
            return true;
        }

        let corners = [
            (self.left + radius, self.top + radius),
            (right - radius, self.top + radius),
            (self.left + radius, bottom - radius),
            (right - radius, bottom - radius),
        ];
        let radius_sq = radius * radius;
        corners.into_iter().any(|(cx, cy)| {
            let dx = x - cx;
            let dy = y - cy;
            dx * dx + dy * dy <= radius_sq
        })
    }
}

/// A transparent RGBA canvas the size of the frame. Captions are drawn onto
/// layers, which are then composited over the frame in order.
#[derive(Clone, Debug)]
pub struct Layer {
    image: RgbaImage,
}

impl Layer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width, height),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn pixel(&self, x: u32, y: u32) -> Rgba<u8> {
        *self.image.get_pixel(x, y)
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn image_mut(&mut self) -> &mut RgbaImage {
        &mut self.image
    }

    /// Source-over blend of `src` onto the pixel at `(x, y)`. Coordinates
    /// outside the canvas are ignored.
    pub fn blend_pixel(&mut self, x: i32, y: i32, src: Rgba<u8>) {
        if x < 0 || y < 0 || x >= self.width() as i32 || y >= self.height() as i32 {
            return;
        }
        let sa = u32::from(src[3]);
        if sa == 0 {
            return;
        }
        let dst = self.image.get_pixel_mut(x as u32, y as u32);
        let da = u32::from(dst[3]);
        let inv = 255 - sa;
        let out_a = sa * 255 + da * inv;
        if out_a == 0 {
            return;
        }
        for c in 0..3 {
            let sc = u32::from(src[c]);
            let dc = u32::from(dst[c]);
            dst[c] = ((sc * sa * 255 + dc * da * inv + out_a / 2) / out_a) as u8;
        }
        dst[3] = ((out_a + 127) / 255) as u8;
    }

    /// Blends `color` scaled by an 8-bit coverage value, as produced by a
    /// glyph rasterizer.
    pub fn blend_coverage(&mut self, x: i32, y: i32, coverage: u8, color: Rgba<u8>) {
        if coverage == 0 {
            return;
        }
        let alpha = (u16::from(coverage) * u16::from(color[3]) + 127) / 255;
        self.blend_pixel(x, y, Rgba([color[0], color[1], color[2], alpha as u8]));
    }

    pub fn fill_rounded_rect(&mut self, rect: PixelRect, radius: u32, color: Rgba<u8>) {
        let Some((x0, y0, x1, y1)) = rect.clip(self.width(), self.height()) else {
            return;
        };
        let radius = (radius as i32).min(rect.width() / 2).min(rect.height() / 2);
        for y in y0..y1 {
            for x in x0..x1 {
                if rect.contains_rounded(x as i32, y as i32, radius) {
                    self.blend_pixel(x as i32, y as i32, color);
                }
            }
        }
    }

    /// Tight bounds of every pixel with non-zero alpha.
    pub fn alpha_bounds(&self) -> Option<PixelRect> {
        let mut bounds: Option<PixelRect> = None;
        for (x, y, px) in self.image.enumerate_pixels() {
            if px[3] == 0 {
                continue;
            }
            let (x, y) = (x as i32, y as i32);
            bounds = Some(match bounds {
                None => PixelRect::new(x, y, x + 1, y + 1),
                Some(b) => PixelRect::new(
                    b.left.min(x),
                    b.top.min(y),
                    b.right.max(x + 1),
                    b.bottom.max(y + 1),
                ),
            });
        }
        bounds
    }

    pub fn is_blank(&self) -> bool {
        self.image.pixels().all(|p| p[3] == 0)
    }

    /// Composites this layer over an opaque RGB frame of the same size.
    pub fn composite_onto(&self, frame: &mut Frame) {
        let width = self.width().min(frame.width());
        let height = self.height().min(frame.height());
        let frame_width = frame.width() as usize;
        let data = frame.data_mut();
        for y in 0..height {
            for x in 0..width {
                let src = self.image.get_pixel(x, y);
                let alpha = u16::from(src[3]);
                if alpha == 0 {
                    continue;
                }
                let inv = 255 - alpha;
                let idx = (y as usize * frame_width + x as usize) * Frame::CHANNELS;
                for c in 0..3 {
                    let dst = u16::from(data[idx + c]);
                    let sc = u16::from(src[c]);
                    data[idx + c] = ((sc * alpha + dst * inv + 127) / 255) as u8;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_layer_is_transparent() {
        let layer = Layer::new(4, 3);
        assert!(layer.is_blank());
        assert_eq!(layer.alpha_bounds(), None);
    }

    #[test]
    fn test_blend_opaque_replaces_pixel() {
        let mut layer = Layer::new(2, 2);
        layer.blend_pixel(1, 0, Rgba([10, 20, 30, 255]));
        assert_eq!(layer.pixel(1, 0), Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn test_blend_on_transparent_keeps_source_color() {
        let mut layer = Layer::new(1, 1);
        layer.blend_pixel(0, 0, Rgba([200, 100, 50, 128]));
        assert_eq!(layer.pixel(0, 0), Rgba([200, 100, 50, 128]));
    }

    #[test]
    fn test_blend_translucent_over_opaque() {
        let mut layer = Layer::new(1, 1);
        layer.blend_pixel(0, 0, Rgba([0, 0, 0, 255]));
        layer.blend_pixel(0, 0, Rgba([255, 255, 255, 128]));
        let px = layer.pixel(0, 0);
        assert_eq!(px[3], 255);
        assert!((127..=129).contains(&px[0]), "got {}", px[0]);
    }

    #[test]
    fn test_out_of_bounds_blend_ignored() {
        let mut layer = Layer::new(2, 2);
        layer.blend_pixel(-1, 0, Rgba([255, 0, 0, 255]));
        layer.blend_pixel(0, 5, Rgba([255, 0, 0, 255]));
        assert!(layer.is_blank());
    }

    #[test]
    fn test_fill_rect_without_radius_covers_exact_area() {
        let mut layer = Layer::new(10, 10);
        layer.fill_rounded_rect(PixelRect::new(2, 3, 6, 5), 0, Rgba([0, 255, 0, 200]));
        assert_eq!(layer.alpha_bounds(), Some(PixelRect::new(2, 3, 6, 5)));
        assert_eq!(layer.pixel(2, 3), Rgba([0, 255, 0, 200]));
    }

    #[test]
    fn test_rounded_rect_leaves_corners_empty() {
        let mut layer = Layer::new(20, 20);
        layer.fill_rounded_rect(PixelRect::new(0, 0, 20, 20), 6, Rgba([255, 255, 255, 255]));
        assert_eq!(layer.pixel(0, 0)[3], 0);
        assert_eq!(layer.pixel(19, 19)[3], 0);
        assert_eq!(layer.pixel(10, 0)[3], 255);
        assert_eq!(layer.pixel(10, 10)[3], 255);
    }

    #[test]
    fn test_rect_clipped_to_canvas() {
        let mut layer = Layer::new(5, 5);
        layer.fill_rounded_rect(PixelRect::new(-3, -3, 2, 2), 0, Rgba([1, 1, 1, 255]));
        assert_eq!(layer.alpha_bounds(), Some(PixelRect::new(0, 0, 2, 2)));
    }

    #[test]
    fn test_composite_onto_frame() {
        let mut frame = Frame::solid(2, 1, [0, 0, 0], 0);
        let mut layer = Layer::new(2, 1);
        layer.blend_pixel(0, 0, Rgba([255, 255, 255, 255]));
        layer.composite_onto(&mut frame);
        assert_eq!(frame.pixel(0, 0), [255, 255, 255]);
        assert_eq!(frame.pixel(1, 0), [0, 0, 0]);
    }

    #[test]
    fn test_pixel_rect_helpers() {
        let rect = PixelRect::new(10, 20, 30, 25);
        assert_eq!(rect.width(), 20);
        assert_eq!(rect.height(), 5);
        assert_eq!(rect.translate(-5, 5), PixelRect::new(5, 25, 25, 30));
        assert_eq!(rect.expand(2, 1), PixelRect::new(8, 19, 32, 26));
        assert!(PixelRect::new(3, 3, 3, 9).is_empty());
        assert_eq!(rect.clip(15, 100), Some((10, 20, 15, 25)));
        assert_eq!(rect.clip(5, 100), None);
    }
}
