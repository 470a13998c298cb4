use std::cell::RefCell;

use crate::rendering::domain::layer_blurrer::LayerBlurrer;
use crate::shared::layer::Layer;

use super::gaussian::{self, RoiRect};

const CHANNELS: usize = 4;

/// CPU Gaussian blur for RGBA layers.
///
/// Only the region around visible pixels is blurred, expanded by the kernel
/// radius so the falloff is not clipped. Color is premultiplied by alpha
/// while blurring.
pub struct CpuLayerBlurrer {
    kernel: Vec<f32>,
    radius: usize,
    roi_buf: RefCell<Vec<u8>>,
    blur_temp: RefCell<Vec<f32>>,
}

impl CpuLayerBlurrer {
    /// `blur_radius` is the standard deviation in pixels.
    pub fn new(blur_radius: u32) -> Self {
        let sigma = blur_radius as f32;
        Self {
            kernel: gaussian::gaussian_kernel_1d(sigma),
            radius: gaussian::kernel_radius(sigma),
            roi_buf: RefCell::new(Vec::new()),
            blur_temp: RefCell::new(Vec::new()),
        }
    }
}

impl LayerBlurrer for CpuLayerBlurrer {
    fn blur(&self, layer: &mut Layer) -> Result<(), Box<dyn std::error::Error>> {
        if self.radius == 0 {
            return Ok(());
        }
        let Some(bounds) = layer.alpha_bounds() else {
            return Ok(());
        };
        let pad = self.radius as i32;
        let Some((x0, y0, x1, y1)) = bounds.expand(pad, pad).clip(layer.width(), layer.height())
        else {
            return Ok(());
        };
        let rect = RoiRect {
            x: x0 as usize,
            y: y0 as usize,
            w: (x1 - x0) as usize,
            h: (y1 - y0) as usize,
        };

        let width = layer.width() as usize;
        let data: &mut [u8] = layer.image_mut();
        let mut roi = self.roi_buf.borrow_mut();
        let mut temp = self.blur_temp.borrow_mut();

        gaussian::extract_roi(data, width, CHANNELS, rect, &mut roi);
        gaussian::premultiply_alpha(&mut roi);
        gaussian::separable_gaussian_blur_with_kernel(
            &mut roi,
            rect.w,
            rect.h,
            CHANNELS,
            &self.kernel,
            &mut temp,
        );
        gaussian::unpremultiply_alpha(&mut roi);
        gaussian::write_roi_back(data, &roi, width, CHANNELS, rect);
        Ok(())
    }
}
