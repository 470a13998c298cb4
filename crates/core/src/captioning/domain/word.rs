use serde::{Deserialize, Serialize};

use crate::shared::timestamp::flexible_seconds;

/// True when `text` is exactly one character that is neither a word
/// character (letter, digit, underscore) nor whitespace.
pub fn is_punctuation(text: &str) -> bool {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => !(c.is_alphanumeric() || c == '_' || c.is_whitespace()),
        _ => false,
    }
}

/// A transcribed word with its time span in seconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub text: String,
    #[serde(with = "flexible_seconds")]
    pub start: f64,
    #[serde(with = "flexible_seconds")]
    pub end: f64,
}

impl Word {
    pub fn new(text: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            text: text.into(),
            start,
            end,
        }
    }
}

/// A display unit: a word, possibly with attached punctuation or a resolved
/// contraction. Spans from the first constituent's start to the last one's
/// end.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    #[serde(with = "flexible_seconds")]
    pub start: f64,
    #[serde(with = "flexible_seconds")]
    pub end: f64,
}

impl Token {
    pub fn new(text: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            text: text.into(),
            start,
            end,
        }
    }

    pub fn is_punctuation(&self) -> bool {
        is_punctuation(&self.text)
    }

    pub fn contains(&self, t: f64) -> bool {
        self.start <= t && t < self.end
    }
}

impl From<&Word> for Token {
    fn from(word: &Word) -> Self {
        Self::new(word.text.trim(), word.start, word.end)
    }
}
