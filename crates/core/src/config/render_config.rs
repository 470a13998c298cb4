use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::captioning::domain::segment_packer::PackingLimits;
use crate::captioning::domain::transcript_reconciler::ReconcileOptions;
use crate::rendering::domain::caption_style::CaptionStyle;
use crate::rendering::domain::highlight_mode::HighlightMode;
use crate::shared::color::{ColorParseError, Rgb};
use crate::shared::constants::{
    DEFAULT_BLUR_RADIUS, DEFAULT_FFMPEG_BINARY, DEFAULT_FONT_SIZE_SCALE,
    DEFAULT_MAX_DURATION_SECONDS, DEFAULT_MAX_WIDTH_PIXELS, DEFAULT_REMUX_TIMEOUT_SECS,
    DEFAULT_WORD_SPACING_PIXELS, MAX_WIDTH_FRAME_RATIO,
};
use crate::shared::rotation::{InvalidRotation, Rotation};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Color(#[from] ColorParseError),
    #[error("invalid caption position '{0}': expected \"x,y\" or \"y\" with values in [0, 1]")]
    Position(String),
    #[error("{0}")]
    HighlightMode(String),
    #[error("unknown preset '{0}' (expected default, large_text, minimal, current_word or background_highlight)")]
    UnknownPreset(String),
    #[error("unknown font size '{0}' (expected small, medium, large or extra-large)")]
    UnknownFontSize(String),
    #[error(transparent)]
    Rotation(#[from] InvalidRotation),
    #[error("{field} must be {requirement}, got {value}")]
    OutOfRange {
        field: &'static str,
        requirement: &'static str,
        value: String,
    },
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("cannot read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot write config file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config JSON in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("cannot encode config: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Every knob of a caption render.
///
/// Missing keys in a JSON config fall back to the defaults below, so a
/// config file only needs the settings it changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub font_path: Option<PathBuf>,
    /// Bundled fonts; `None` means `fonts/` next to the executable.
    pub fonts_dir: Option<PathBuf>,
    /// Font pixel size as a fraction of the (rotated) frame height.
    pub font_size_scale: f64,
    pub max_width_pixels: u32,
    pub max_duration_seconds: f64,
    pub word_spacing_pixels: u32,
    pub blur_radius: u32,
    pub text_color: Rgb,
    pub highlight_color: Rgb,
    pub background_color: Option<Rgb>,
    pub highlight_background_color: Rgb,
    /// Caption center as `(x, y)` fractions of the frame.
    pub position: (f64, f64),
    pub highlighting_mode: HighlightMode,
    pub rotation_degrees: i32,
    pub keep_work_dir: bool,
    pub remux_timeout_seconds: u64,
    pub ffmpeg_binary: String,
    pub reconcile: ReconcileOptions,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            font_path: None,
            fonts_dir: None,
            font_size_scale: DEFAULT_FONT_SIZE_SCALE,
            max_width_pixels: DEFAULT_MAX_WIDTH_PIXELS,
            max_duration_seconds: DEFAULT_MAX_DURATION_SECONDS,
            word_spacing_pixels: DEFAULT_WORD_SPACING_PIXELS,
            blur_radius: DEFAULT_BLUR_RADIUS,
            text_color: Rgb::WHITE,
            highlight_color: Rgb::YELLOW,
            background_color: None,
            highlight_background_color: Rgb::GREEN,
            position: (0.5, 0.8),
            highlighting_mode: HighlightMode::Text,
            rotation_degrees: 0,
            keep_work_dir: false,
            remux_timeout_seconds: DEFAULT_REMUX_TIMEOUT_SECS,
            ffmpeg_binary: DEFAULT_FFMPEG_BINARY.to_string(),
            reconcile: ReconcileOptions::default(),
        }
    }
}

impl RenderConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self).map_err(ConfigError::Encode)?;
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        fs::write(path, json).map_err(write_err)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let scale = self.font_size_scale;
        check(
            scale.is_finite() && scale > 0.0 && scale <= 1.0,
            "font_size_scale",
            "in (0, 1]",
            scale,
        )?;
        check(
            self.max_width_pixels > 0,
            "max_width_pixels",
            "positive",
            self.max_width_pixels,
        )?;
        check(
            self.max_duration_seconds.is_finite() && self.max_duration_seconds > 0.0,
            "max_duration_seconds",
            "positive",
            self.max_duration_seconds,
        )?;
        let (x, y) = self.position;
        if !(0.0..=1.0).contains(&x) || !(0.0..=1.0).contains(&y) {
            return Err(ConfigError::Position(format!("{x},{y}")));
        }
        self.rotation()?;
        check(
            self.remux_timeout_seconds > 0,
            "remux_timeout_seconds",
            "positive",
            self.remux_timeout_seconds,
        )?;
        check(
            !self.ffmpeg_binary.trim().is_empty(),
            "ffmpeg_binary",
            "non-empty",
            "\"\"",
        )?;
        check(
            self.reconcile.search_window > 0,
            "reconcile.search_window",
            "positive",
            self.reconcile.search_window,
        )?;
        check(
            (0.0..=1.0).contains(&self.reconcile.similarity_threshold),
            "reconcile.similarity_threshold",
            "in [0, 1]",
            self.reconcile.similarity_threshold,
        )?;
        check(
            self.reconcile.fallback_word_duration.is_finite()
                && self.reconcile.fallback_word_duration > 0.0,
            "reconcile.fallback_word_duration",
            "positive",
            self.reconcile.fallback_word_duration,
        )
    }

    pub fn rotation(&self) -> Result<Rotation, ConfigError> {
        Ok(Rotation::from_degrees(self.rotation_degrees)?)
    }

    pub fn caption_style(&self) -> CaptionStyle {
        CaptionStyle {
            text_color: self.text_color,
            highlight_color: self.highlight_color,
            background_color: self.background_color,
            highlight_background_color: self.highlight_background_color,
            position: self.position,
            word_spacing: self.word_spacing_pixels,
            blur_radius: self.blur_radius,
            mode: self.highlighting_mode,
        }
    }

    /// Font pixel size for a frame of the given (rotated) height.
    pub fn font_size_for(&self, frame_height: u32) -> u32 {
        ((f64::from(frame_height) * self.font_size_scale).round() as u32).max(1)
    }

    /// Packing budget for a frame of the given (rotated) width; the width
    /// never exceeds 80% of the frame.
    pub fn packing_limits(&self, frame_width: u32) -> PackingLimits {
        let frame_cap = (f64::from(frame_width) * MAX_WIDTH_FRAME_RATIO) as u32;
        PackingLimits {
            max_width_pixels: self.max_width_pixels.min(frame_cap).max(1),
            max_duration_seconds: self.max_duration_seconds,
            word_spacing_pixels: self.word_spacing_pixels,
        }
    }

    pub fn remux_timeout(&self) -> Duration {
        Duration::from_secs(self.remux_timeout_seconds)
    }
}

fn check(
    ok: bool,
    field: &'static str,
    requirement: &'static str,
    value: impl ToString,
) -> Result<(), ConfigError> {
    if ok {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            requirement,
            value: value.to_string(),
        })
    }
}

/// Parses a caption position given as `"x,y"` or just `"y"` (x = 0.5).
pub fn parse_position(s: &str) -> Result<(f64, f64), ConfigError> {
    let err = || ConfigError::Position(s.to_string());
    let parts: Vec<f64> = s
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|_| err())?;

    let position = match parts.as_slice() {
        [y] => (0.5, *y),
        [x, y] => (*x, *y),
        _ => return Err(err()),
    };

    let in_range = |v: f64| (0.0..=1.0).contains(&v);
    if in_range(position.0) && in_range(position.1) {
        Ok(position)
    } else {
        Err(err())
    }
}

/// Parses a background color where `none` disables the backing.
pub fn parse_optional_color(s: &str) -> Result<Option<Rgb>, ConfigError> {
    match s.trim().to_lowercase().as_str() {
        "none" | "transparent" | "" => Ok(None),
        _ => Ok(Some(s.parse()?)),
    }
}

pub fn parse_highlight_mode(s: &str) -> Result<HighlightMode, ConfigError> {
    s.parse().map_err(ConfigError::HighlightMode)
}
