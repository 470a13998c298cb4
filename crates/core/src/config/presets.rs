use std::fmt;
use std::str::FromStr;

use crate::config::render_config::{ConfigError, RenderConfig};
use crate::rendering::domain::highlight_mode::HighlightMode;
use crate::shared::color::Rgb;

/// Named bundles of settings applied on top of the defaults.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Preset {
    Default,
    LargeText,
    Minimal,
    CurrentWord,
    BackgroundHighlight,
}

impl Preset {
    pub const ALL: &[Preset] = &[
        Preset::Default,
        Preset::LargeText,
        Preset::Minimal,
        Preset::CurrentWord,
        Preset::BackgroundHighlight,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Preset::Default => "default",
            Preset::LargeText => "large_text",
            Preset::Minimal => "minimal",
            Preset::CurrentWord => "current_word",
            Preset::BackgroundHighlight => "background_highlight",
        }
    }

    pub fn apply(self, config: &mut RenderConfig) {
        match self {
            Preset::Default => {}
            Preset::LargeText => {
                config.font_size_scale = 0.06;
                config.max_duration_seconds = 2.0;
            }
            Preset::Minimal => {
                config.highlighting_mode = HighlightMode::Text;
                config.background_color = None;
                config.blur_radius = 2;
            }
            Preset::CurrentWord => {
                config.highlighting_mode = HighlightMode::CurrentWordOnly;
                config.highlight_color = Rgb::YELLOW;
                config.font_size_scale = 0.055;
            }
            Preset::BackgroundHighlight => {
                config.highlighting_mode = HighlightMode::Background;
                config.highlight_background_color = Rgb::BLUE;
                config.blur_radius = 3;
            }
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Preset {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == normalized)
            .ok_or_else(|| ConfigError::UnknownPreset(s.to_string()))
    }
}

/// Coarse font sizes expressed as a fraction of frame height.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FontSize {
    Small,
    Medium,
    Large,
    ExtraLarge,
}

impl FontSize {
    pub const ALL: &[FontSize] = &[
        FontSize::Small,
        FontSize::Medium,
        FontSize::Large,
        FontSize::ExtraLarge,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FontSize::Small => "small",
            FontSize::Medium => "medium",
            FontSize::Large => "large",
            FontSize::ExtraLarge => "extra-large",
        }
    }

    pub fn scale(self) -> f64 {
        match self {
            FontSize::Small => 0.03,
            FontSize::Medium => 0.045,
            FontSize::Large => 0.06,
            FontSize::ExtraLarge => 0.075,
        }
    }
}

impl FromStr for FontSize {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == normalized)
            .ok_or_else(|| ConfigError::UnknownFontSize(s.to_string()))
    }
}
