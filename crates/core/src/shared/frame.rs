use image::RgbImage;

/// A decoded video frame: tightly packed RGB24 bytes in row-major order.
///
/// Pixel format conversion happens at the ffmpeg boundary only; everything
/// in between (rotation, caption compositing) works on this layout.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    index: usize,
}

impl Frame {
    pub const CHANNELS: usize = 3;

    pub fn new(data: Vec<u8>, width: u32, height: u32, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * Self::CHANNELS,
            "data length must equal width * height * 3"
        );
        Self {
            data,
            width,
            height,
            index,
        }
    }

    /// A frame filled with a single color.
    pub fn solid(width: u32, height: u32, rgb: [u8; 3], index: usize) -> Self {
        let data = rgb
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * Self::CHANNELS)
            .collect();
        Self::new(data, width, height, index)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Position of this frame in decode order, starting at 0.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let offset = (y as usize * self.width as usize + x as usize) * Self::CHANNELS;
        [self.data[offset], self.data[offset + 1], self.data[offset + 2]]
    }

    pub fn into_image(self) -> RgbImage {
        let (width, height) = (self.width, self.height);
        RgbImage::from_raw(width, height, self.data)
            .unwrap_or_else(|| RgbImage::new(width, height))
    }

    pub fn from_image(image: RgbImage, index: usize) -> Self {
        let (width, height) = image.dimensions();
        Self::new(image.into_raw(), width, height, index)
    }
}
