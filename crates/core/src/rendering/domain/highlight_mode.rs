use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How the word being spoken is marked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HighlightMode {
    /// Active word drawn in the highlight color.
    #[default]
    Text,
    /// Active word gets a rounded backing box.
    Background,
    /// Text color and backing box together.
    Both,
    /// Only the active word is drawn.
    CurrentWordOnly,
}

impl HighlightMode {
    pub const ALL: &[HighlightMode] = &[
        HighlightMode::Text,
        HighlightMode::Background,
        HighlightMode::Both,
        HighlightMode::CurrentWordOnly,
    ];

    pub fn recolors_text(self) -> bool {
        matches!(self, Self::Text | Self::Both)
    }

    pub fn draws_word_background(self) -> bool {
        matches!(self, Self::Background | Self::Both)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Background => "background",
            Self::Both => "both",
            Self::CurrentWordOnly => "current_word_only",
        }
    }
}

impl fmt::Display for HighlightMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HighlightMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == normalized)
            .ok_or_else(|| {
                format!("unknown highlighting mode '{s}' (expected text, background, both or current_word_only)")
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::text("text", HighlightMode::Text)]
    #[case::background("Background", HighlightMode::Background)]
    #[case::both(" both ", HighlightMode::Both)]
    #[case::dashed("current-word-only", HighlightMode::CurrentWordOnly)]
    fn test_parse(#[case] input: &str, #[case] expected: HighlightMode) {
        assert_eq!(input.parse::<HighlightMode>().unwrap(), expected);
    }

    #[test]
    fn test_parse_unknown() {
        assert!("glow".parse::<HighlightMode>().is_err());
    }

    #[test]
    fn test_capabilities() {
        assert!(HighlightMode::Text.recolors_text());
        assert!(!HighlightMode::Text.draws_word_background());
        assert!(HighlightMode::Both.recolors_text());
        assert!(HighlightMode::Both.draws_word_background());
        assert!(!HighlightMode::CurrentWordOnly.recolors_text());
        assert!(!HighlightMode::CurrentWordOnly.draws_word_background());
    }

    #[test]
    fn test_serde_snake_case() {
        let json = serde_json::to_string(&HighlightMode::CurrentWordOnly).unwrap();
        assert_eq!(json, "\"current_word_only\"");
    }
}
