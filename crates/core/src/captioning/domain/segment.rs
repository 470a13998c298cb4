use serde::{Deserialize, Serialize};

use crate::captioning::domain::word::Token;
use crate::shared::timestamp::srt_time;

/// A run of tokens shown together as one caption line.
///
/// `start` equals the first token's start and `end` the last token's end.
/// Persisted with `start_time`/`end_time` as `HH:MM:SS,mmm` strings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub index: usize,
    #[serde(rename = "start_time", with = "srt_time")]
    pub start: f64,
    #[serde(rename = "end_time", with = "srt_time")]
    pub end: f64,
    pub text: String,
    pub words: Vec<Token>,
}

impl Segment {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    pub fn contains(&self, t: f64) -> bool {
        self.start <= t && t < self.end
    }

    /// Index into `words` of the token spoken at `t`, if any.
    pub fn active_word(&self, t: f64) -> Option<usize> {
        self.words.iter().position(|w| w.contains(t))
    }
}
