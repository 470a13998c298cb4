/// ROI rectangle within an image, used to pass region coordinates without many arguments.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoiRect {
    pub x: usize,
    pub y: usize,
    pub w: usize,
    pub h: usize,
}

/// Kernel half-width covering three standard deviations.
pub fn kernel_radius(sigma: f32) -> usize {
    if sigma <= 0.0 {
        0
    } else {
        (sigma * 3.0).ceil() as usize
    }
}

/// Precompute a normalized 1D Gaussian kernel for standard deviation `sigma`.
///
/// The kernel has `2 * kernel_radius(sigma) + 1` taps; a non-positive sigma
/// yields the identity kernel `[1.0]`.
pub fn gaussian_kernel_1d(sigma: f32) -> Vec<f32> {
    let radius = kernel_radius(sigma);
    if radius == 0 {
        return vec![1.0];
    }
    let sigma = f64::from(sigma);
    let mut kernel_f64: Vec<f64> = (0..=2 * radius)
        .map(|i| {
            let x = i as f64 - radius as f64;
            (-x * x / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f64 = kernel_f64.iter().sum();
    for v in &mut kernel_f64 {
        *v /= sum;
    }
    kernel_f64.iter().map(|&v| v as f32).collect()
}

/// Apply a separable Gaussian blur using a pre-computed kernel, reusing `temp`.
///
/// Edge pixels are extended past the buffer bounds.
pub fn separable_gaussian_blur_with_kernel(
    data: &mut [u8],
    width: usize,
    height: usize,
    channels: usize,
    kernel: &[f32],
    temp: &mut Vec<f32>,
) {
    let kernel_size = kernel.len();
    if kernel_size <= 1 || width == 0 || height == 0 {
        return;
    }
    let half = kernel_size / 2;

    let needed = width * height * channels;
    temp.resize(needed, 0.0);

    // Horizontal pass: data → temp
    for y in 0..height {
        for x in 0..width {
            for c in 0..channels {
                let mut sum = 0.0f32;
                for (k, &w) in kernel.iter().enumerate() {
                    let sx = (x as isize + k as isize - half as isize)
                        .max(0)
                        .min((width - 1) as isize) as usize;
                    sum += data[(y * width + sx) * channels + c] as f32 * w;
                }
                temp[(y * width + x) * channels + c] = sum;
            }
        }
    }

    // Vertical pass: temp → data
    for y in 0..height {
        for x in 0..width {
            for c in 0..channels {
                let mut sum = 0.0f32;
                for (k, &w) in kernel.iter().enumerate() {
                    let sy = (y as isize + k as isize - half as isize)
                        .max(0)
                        .min((height - 1) as isize) as usize;
                    sum += temp[(sy * width + x) * channels + c] * w;
                }
                data[(y * width + x) * channels + c] = sum.round().clamp(0.0, 255.0) as u8;
            }
        }
    }
}

/// Extract a rectangular ROI from image data into a reusable buffer.
pub fn extract_roi(data: &[u8], image_width: usize, channels: usize, rect: RoiRect, roi: &mut Vec<u8>) {
    roi.resize(rect.w * rect.h * channels, 0);
    for row in 0..rect.h {
        let src_offset = ((rect.y + row) * image_width + rect.x) * channels;
        let dst_offset = row * rect.w * channels;
        roi[dst_offset..dst_offset + rect.w * channels]
            .copy_from_slice(&data[src_offset..src_offset + rect.w * channels]);
    }
}

/// Write a blurred ROI buffer back into image data.
pub fn write_roi_back(data: &mut [u8], roi: &[u8], image_width: usize, channels: usize, rect: RoiRect) {
    for row in 0..rect.h {
        let dst_offset = ((rect.y + row) * image_width + rect.x) * channels;
        let src_offset = row * rect.w * channels;
        data[dst_offset..dst_offset + rect.w * channels]
            .copy_from_slice(&roi[src_offset..src_offset + rect.w * channels]);
    }
}

/// Scale RGB by alpha in an RGBA buffer so transparent pixels carry no color
/// into the blur.
pub fn premultiply_alpha(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        for c in &mut px[..3] {
            *c = ((u16::from(*c) * a + 127) / 255) as u8;
        }
    }
}

/// Inverse of [`premultiply_alpha`].
pub fn unpremultiply_alpha(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        if a == 0 {
            px[..3].fill(0);
            continue;
        }
        for c in &mut px[..3] {
            *c = ((u16::from(*c) * 255 + a / 2) / a).min(255) as u8;
        }
    }
}
