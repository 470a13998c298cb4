use crate::captioning::domain::segment::Segment;

/// The caption state at one playback instant.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ActiveCaption<'a> {
    pub segment: &'a Segment,
    /// Position in `segment.words` of the word being spoken, if any.
    pub word_index: Option<usize>,
}

impl ActiveCaption<'_> {
    pub fn is_word_active(&self, index: usize) -> bool {
        self.word_index == Some(index)
    }
}

/// Maps playback times to the segment on screen.
pub struct TimelineResolver {
    segments: Vec<Segment>,
}

impl TimelineResolver {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// First segment whose `[start, end)` contains `t`, with the word active
    /// at `t` inside it.
    pub fn resolve(&self, t: f64) -> Option<ActiveCaption<'_>> {
        let segment = self.segments.iter().find(|s| s.contains(t))?;
        Some(ActiveCaption {
            segment,
            word_index: segment.active_word(t),
        })
    }
}
