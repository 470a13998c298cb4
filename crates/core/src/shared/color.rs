use std::fmt;
use std::str::FromStr;

use image::Rgba;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid color '{0}': expected \"r,g,b\", #rrggbb, or a color name")]
pub struct ColorParseError(pub String);

/// An opaque RGB color as configured by the user.
///
/// Serialized as a `[r, g, b]` array so config files stay readable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub [u8; 3]);

impl Rgb {
    pub const WHITE: Rgb = Rgb([255, 255, 255]);
    pub const BLACK: Rgb = Rgb([0, 0, 0]);
    pub const YELLOW: Rgb = Rgb([255, 255, 0]);
    pub const GREEN: Rgb = Rgb([0, 255, 0]);
    pub const BLUE: Rgb = Rgb([0, 0, 255]);

    pub fn with_alpha(self, alpha: u8) -> Rgba<u8> {
        let [r, g, b] = self.0;
        Rgba([r, g, b, alpha])
    }

    pub fn opaque(self) -> Rgba<u8> {
        self.with_alpha(255)
    }

    fn named(name: &str) -> Option<Rgb> {
        let rgb = match name {
            "white" => [255, 255, 255],
            "black" => [0, 0, 0],
            "red" => [255, 0, 0],
            "green" => [0, 255, 0],
            "blue" => [0, 0, 255],
            "yellow" => [255, 255, 0],
            "cyan" => [0, 255, 255],
            "magenta" => [255, 0, 255],
            "orange" => [255, 165, 0],
            "purple" => [128, 0, 128],
            "pink" => [255, 192, 203],
            _ => return None,
        };
        Some(Rgb(rgb))
    }
}

impl FromStr for Rgb {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let err = || ColorParseError(s.to_string());

        if raw.contains(',') {
            let parts: Vec<u8> = raw
                .split(',')
                .map(|p| p.trim().parse::<u8>())
                .collect::<Result<_, _>>()
                .map_err(|_| err())?;
            return match parts.as_slice() {
                [r, g, b] => Ok(Rgb([*r, *g, *b])),
                _ => Err(err()),
            };
        }

        if let Some(hex) = raw.strip_prefix('#') {
            if hex.len() != 6 || !hex.is_ascii() {
                return Err(err());
            }
            let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| err());
            return Ok(Rgb([channel(0)?, channel(2)?, channel(4)?]));
        }

        Rgb::named(&raw.to_lowercase()).ok_or_else(err)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.0;
        write!(f, "#{r:02x}{g:02x}{b:02x}")
    }
}
