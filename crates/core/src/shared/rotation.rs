use image::imageops;
use thiserror::Error;

use crate::shared::frame::Frame;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unsupported rotation {0}: must be 0, 90, 180 or 270 degrees")]
pub struct InvalidRotation(pub i32);

/// Clockwise rotation applied to every decoded frame before captioning.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Rotation {
    #[default]
    None,
    Clockwise90,
    Half,
    Clockwise270,
}

impl Rotation {
    pub fn from_degrees(degrees: i32) -> Result<Self, InvalidRotation> {
        match degrees.rem_euclid(360) {
            0 => Ok(Self::None),
            90 => Ok(Self::Clockwise90),
            180 => Ok(Self::Half),
            270 => Ok(Self::Clockwise270),
            _ => Err(InvalidRotation(degrees)),
        }
    }

    pub fn degrees(self) -> i32 {
        match self {
            Self::None => 0,
            Self::Clockwise90 => 90,
            Self::Half => 180,
            Self::Clockwise270 => 270,
        }
    }

    pub fn swaps_dimensions(self) -> bool {
        matches!(self, Self::Clockwise90 | Self::Clockwise270)
    }

    /// Output `(width, height)` for an input of `width` x `height`.
    pub fn output_dims(self, width: u32, height: u32) -> (u32, u32) {
        if self.swaps_dimensions() {
            (height, width)
        } else {
            (width, height)
        }
    }

    pub fn apply(self, frame: Frame) -> Frame {
        if self == Self::None {
            return frame;
        }
        let index = frame.index();
        let image = frame.into_image();
        let rotated = match self {
            Self::None => image,
            Self::Clockwise90 => imageops::rotate90(&image),
            Self::Half => imageops::rotate180(&image),
            Self::Clockwise270 => imageops::rotate270(&image),
        };
        Frame::from_image(rotated, index)
    }
}
