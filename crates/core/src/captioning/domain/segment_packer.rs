use log::warn;

use crate::captioning::domain::segment::Segment;
use crate::captioning::domain::text_measurer::TextMeasurer;
use crate::captioning::domain::token_grouper::group_tokens;
use crate::captioning::domain::word::{Token, Word};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PackingLimits {
    pub max_width_pixels: u32,
    pub max_duration_seconds: f64,
    pub word_spacing_pixels: u32,
}

struct RunningSegment {
    text: String,
    start: f64,
    end: f64,
    width: u32,
    words: Vec<Token>,
}

impl RunningSegment {
    fn seed(token: &Token, width: u32) -> Self {
        Self {
            text: token.text.clone(),
            start: token.start,
            end: token.end,
            width,
            words: vec![token.clone()],
        }
    }

    fn push(&mut self, token: &Token, width: u32) {
        if !token.is_punctuation() {
            self.text.push(' ');
        }
        self.text.push_str(&token.text);
        self.end = token.end;
        self.width = width;
        self.words.push(token.clone());
    }
}

/// Greedily packs tokens into width and duration bounded segments in a
/// single forward pass.
pub struct SegmentPacker {
    limits: PackingLimits,
}

impl SegmentPacker {
    pub fn new(limits: PackingLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> PackingLimits {
        self.limits
    }

    /// Groups `words` into tokens and packs them.
    pub fn pack_words<M: TextMeasurer + ?Sized>(&self, words: &[Word], measurer: &M) -> Vec<Segment> {
        self.pack(&group_tokens(words), measurer)
    }

    pub fn pack<M: TextMeasurer + ?Sized>(&self, tokens: &[Token], measurer: &M) -> Vec<Segment> {
        let space_width = measurer.text_width(" ");

        let mut closed: Vec<RunningSegment> = Vec::new();
        let mut running: Option<RunningSegment> = None;

        for token in tokens {
            let token_width = measurer.text_width(&token.text);
            let Some(current) = running.as_mut() else {
                running = Some(RunningSegment::seed(token, token_width));
                continue;
            };

            let punctuation = token.is_punctuation();
            let separator = if punctuation { 0 } else { space_width };
            let candidate_width = current.width + separator + token_width;
            let candidate_duration = token.end - current.start;

            let over_budget = candidate_width > self.limits.max_width_pixels
                || candidate_duration > self.limits.max_duration_seconds;

            if over_budget && !punctuation {
                closed.extend(running.replace(RunningSegment::seed(token, token_width)));
            } else {
                current.push(token, candidate_width);
            }
        }
        closed.extend(running);

        closed
            .into_iter()
            .enumerate()
            .map(|(i, run)| {
                let segment = Segment {
                    index: i + 1,
                    start: run.start,
                    end: run.end,
                    text: run.text,
                    words: run.words,
                };
                if segment.words.len() == 1 {
                    self.warn_if_oversized(&segment, run.width);
                }
                segment
            })
            .collect()
    }

    fn warn_if_oversized(&self, segment: &Segment, width: u32) {
        if width > self.limits.max_width_pixels {
            warn!(
                "Segment {} '{}' is {}px wide, over the {}px budget",
                segment.index, segment.text, width, self.limits.max_width_pixels
            );
        }
        if segment.duration() > self.limits.max_duration_seconds {
            warn!(
                "Segment {} '{}' lasts {:.3}s, over the {:.3}s budget",
                segment.index,
                segment.text,
                segment.duration(),
                self.limits.max_duration_seconds
            );
        }
    }
}
