//! Best-effort re-timing of hand-edited caption text.
//!
//! Edited words are matched by fuzzy similarity against the original
//! transcript; unmatched words get a guessed duration. The result is an
//! estimate and carries counts so callers can judge how much was guessed.

use regex::Regex;
use serde::{Deserialize, Serialize};
use similar::TextDiff;

use crate::captioning::domain::segment::Segment;
use crate::captioning::domain::word::{Token, Word};

pub const DEFAULT_SEARCH_WINDOW: usize = 50;
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.6;
pub const DEFAULT_FALLBACK_WORD_DURATION: f64 = 0.3;
pub const DEFAULT_SEGMENT_GAP: f64 = 0.1;
pub const MIN_ADJUSTED_SEGMENT_DURATION: f64 = 0.5;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileOptions {
    /// How many original words ahead of the cursor are compared.
    pub search_window: usize,
    /// A match must score strictly above this ratio in `[0, 1]`.
    pub similarity_threshold: f32,
    /// Duration given to words with no match, in seconds.
    pub fallback_word_duration: f64,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            search_window: DEFAULT_SEARCH_WINDOW,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            fallback_word_duration: DEFAULT_FALLBACK_WORD_DURATION,
        }
    }
}

/// A value whose timings are inferred rather than measured.
#[derive(Clone, Debug, PartialEq)]
pub struct TimingEstimate<T> {
    value: T,
    matched_words: usize,
    estimated_words: usize,
}

impl<T> TimingEstimate<T> {
    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn into_value(self) -> T {
        self.value
    }

    /// Words whose timing was taken from a matching original word.
    pub fn matched_words(&self) -> usize {
        self.matched_words
    }

    /// Words whose timing was guessed.
    pub fn estimated_words(&self) -> usize {
        self.estimated_words
    }
}

pub struct TranscriptReconciler {
    options: ReconcileOptions,
    word_pattern: Regex,
}

impl TranscriptReconciler {
    pub fn new(options: ReconcileOptions) -> Result<Self, regex::Error> {
        Ok(Self {
            options,
            word_pattern: Regex::new(r"\w+")?,
        })
    }

    fn match_key(&self, text: &str) -> String {
        self.word_pattern
            .find_iter(text)
            .map(|m| m.as_str().to_lowercase())
            .collect()
    }

    /// Re-derives word timings for `edited` segments from `original_words`.
    ///
    /// The search cursor only moves forward, across segment boundaries, so
    /// repeated words resolve to successive occurrences. Segments whose text
    /// is blank are dropped and the rest renumbered from 1.
    pub fn reconcile(
        &self,
        edited: &[Segment],
        original_words: &[Word],
    ) -> TimingEstimate<Vec<Segment>> {
        let originals: Vec<(String, &Word)> = original_words
            .iter()
            .map(|w| (self.match_key(&w.text), w))
            .collect();

        let mut cursor = 0;
        let mut matched = 0;
        let mut estimated = 0;
        let mut segments = Vec::with_capacity(edited.len());

        for segment in edited {
            let mut tokens: Vec<Token> = Vec::new();
            let mut pending_prefix = String::new();

            for piece in segment.text.split_whitespace() {
                let key = self.match_key(piece);
                if key.is_empty() {
                    match tokens.last_mut() {
                        Some(last) => last.text.push_str(piece),
                        None => pending_prefix.push_str(piece),
                    }
                    continue;
                }
                let text = std::mem::take(&mut pending_prefix) + piece;

                match self.best_match(&key, &originals, cursor) {
                    Some((pos, word)) => {
                        tokens.push(Token::new(text, word.start, word.end));
                        cursor = pos + 1;
                        matched += 1;
                    }
                    None => {
                        let start = tokens.last().map_or(segment.start, |t| t.end);
                        let end = start + self.options.fallback_word_duration;
                        tokens.push(Token::new(text, start, end));
                        estimated += 1;
                    }
                }
            }

            if !pending_prefix.is_empty() {
                let end = segment.start + self.options.fallback_word_duration;
                tokens.push(Token::new(pending_prefix, segment.start, end));
                estimated += 1;
            }

            let (Some(first), Some(last)) = (tokens.first(), tokens.last()) else {
                continue;
            };
            segments.push(Segment {
                index: segments.len() + 1,
                start: first.start,
                end: last.end,
                text: segment.text.trim().to_string(),
                words: tokens,
            });
        }

        TimingEstimate {
            value: segments,
            matched_words: matched,
            estimated_words: estimated,
        }
    }

    fn best_match<'w>(
        &self,
        key: &str,
        originals: &[(String, &'w Word)],
        cursor: usize,
    ) -> Option<(usize, &'w Word)> {
        let end = originals.len().min(cursor.saturating_add(self.options.search_window));
        let mut best: Option<(usize, f32)> = None;
        for pos in cursor..end {
            let score = TextDiff::from_chars(key, originals[pos].0.as_str()).ratio();
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((pos, score));
            }
        }
        best.filter(|(_, score)| *score > self.options.similarity_threshold)
            .map(|(pos, _)| (pos, originals[pos].1))
    }
}

/// One-shot form of [`TranscriptReconciler::reconcile`].
pub fn reconcile_edited_segments(
    edited: &[Segment],
    original_words: &[Word],
    options: &ReconcileOptions,
) -> Result<TimingEstimate<Vec<Segment>>, regex::Error> {
    Ok(TranscriptReconciler::new(*options)?.reconcile(edited, original_words))
}

/// Sorts segments by start and pushes each start to at least `gap` seconds
/// after the previous end. A segment left ending before its new start is
/// given [`MIN_ADJUSTED_SEGMENT_DURATION`]. Indices are renumbered.
pub fn ensure_non_overlapping(mut segments: Vec<Segment>, gap: f64) -> Vec<Segment> {
    segments.sort_by(|a, b| a.start.total_cmp(&b.start));
    for i in 1..segments.len() {
        let prev_end = segments[i - 1].end;
        let current = &mut segments[i];
        if current.start < prev_end + gap {
            current.start = prev_end + gap;
            if current.end < current.start {
                current.end = current.start + MIN_ADJUSTED_SEGMENT_DURATION;
            }
        }
    }
    for (i, segment) in segments.iter_mut().enumerate() {
        segment.index = i + 1;
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn reconciler() -> TranscriptReconciler {
        TranscriptReconciler::new(ReconcileOptions::default()).unwrap()
    }

    fn edited(index: usize, start: f64, end: f64, text: &str) -> Segment {
        Segment {
            index,
            start,
            end,
            text: text.to_string(),
            words: Vec::new(),
        }
    }

    fn originals() -> Vec<Word> {
        vec![
            Word::new("The", 0.0, 0.2),
            Word::new("quick", 0.2, 0.5),
            Word::new("brown", 0.5, 0.8),
            Word::new("fox", 0.8, 1.0),
            Word::new("jumps.", 1.2, 1.6),
        ]
    }

    #[test]
    fn test_exact_and_fuzzy_matches_take_original_timing() {
        let result = reconciler().reconcile(&[edited(1, 0.0, 1.0, "the quik brown fox")], &originals());
        let segments = result.value();
        assert_eq!(result.matched_words(), 4);
        assert_eq!(result.estimated_words(), 0);
        assert_eq!(segments[0].words[1].text, "quik");
        assert_relative_eq!(segments[0].words[1].start, 0.2);
        assert_relative_eq!(segments[0].start, 0.0);
        assert_relative_eq!(segments[0].end, 1.0);
    }

    #[test]
    fn test_unmatched_word_gets_fallback_after_previous() {
        let result = reconciler().reconcile(&[edited(1, 0.0, 1.0, "quick zebra")], &originals());
        let words = &result.value()[0].words;
        assert_eq!(result.estimated_words(), 1);
        assert_relative_eq!(words[1].start, 0.5);
        assert_relative_eq!(words[1].end, 0.8, epsilon = 1e-9);
    }

    #[test]
    fn test_unmatched_first_word_starts_at_segment_start() {
        let result = reconciler().reconcile(&[edited(1, 4.0, 5.0, "xylophone")], &originals());
        let segment = &result.value()[0];
        assert_relative_eq!(segment.start, 4.0);
        assert_relative_eq!(segment.end, 4.3, epsilon = 1e-9);
    }

    #[test]
    fn test_cursor_carries_across_segments() {
        let words = vec![
            Word::new("go", 0.0, 0.2),
            Word::new("go", 1.0, 1.2),
        ];
        let result = reconciler().reconcile(
            &[edited(1, 0.0, 0.2, "go"), edited(2, 1.0, 1.2, "go")],
            &words,
        );
        let segments = result.into_value();
        assert_relative_eq!(segments[0].start, 0.0);
        assert_relative_eq!(segments[1].start, 1.0);
    }

    #[test]
    fn test_punctuation_pieces_attach_and_keep_case() {
        let result = reconciler().reconcile(&[edited(1, 0.0, 2.0, "Brown fox - jumps.")], &originals());
        let texts: Vec<&str> = result.value()[0].words.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(texts, vec!["Brown", "fox-", "jumps."]);
        assert_relative_eq!(result.value()[0].end, 1.6);
    }

    #[test]
    fn test_window_limits_search() {
        let options = ReconcileOptions {
            search_window: 2,
            ..ReconcileOptions::default()
        };
        let reconciler = TranscriptReconciler::new(options).unwrap();
        let result = reconciler.reconcile(&[edited(1, 0.0, 1.0, "fox")], &originals());
        assert_eq!(result.matched_words(), 0);
    }

    #[test]
    fn test_unbounded_window_searches_to_the_end() {
        let options = ReconcileOptions {
            search_window: usize::MAX,
            ..ReconcileOptions::default()
        };
        let reconciler = TranscriptReconciler::new(options).unwrap();
        let result = reconciler.reconcile(&[edited(1, 0.0, 1.0, "brown fox")], &originals());
        assert_eq!(result.matched_words(), 2);
        assert_relative_eq!(result.value()[0].start, 0.5);
        assert_relative_eq!(result.value()[0].end, 1.0);
    }

    #[test]
    fn test_blank_segments_dropped_and_renumbered() {
        let result = reconciler().reconcile(
            &[edited(1, 0.0, 0.5, "   "), edited(2, 0.5, 1.0, "brown")],
            &originals(),
        );
        let segments = result.into_value();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].index, 1);
    }

    #[test]
    fn test_ensure_non_overlapping() {
        let segments = ensure_non_overlapping(
            vec![
                edited(1, 1.0, 1.5, "b"),
                edited(2, 0.0, 1.2, "a"),
                edited(3, 1.4, 1.45, "c"),
            ],
            DEFAULT_SEGMENT_GAP,
        );
        let texts: Vec<&str> = segments.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
        assert_relative_eq!(segments[1].start, 1.3, epsilon = 1e-9);
        assert_relative_eq!(segments[1].end, 1.5, epsilon = 1e-9);
        assert_relative_eq!(segments[2].start, 1.6, epsilon = 1e-9);
        assert_relative_eq!(segments[2].end, 2.1, epsilon = 1e-9);
        assert_eq!(segments[2].index, 3);
    }
}
