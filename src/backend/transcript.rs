//! Recognition result types shared by all backends.
//!
//! [`Segment`] is a single time-aligned piece of recognised speech.
//! [`Transcript`] is the ordered list of segments produced by one
//! recognition run, with a plain-text join for display.
//!
//! Subtitle serialisation (SRT/ASS) is deliberately not implemented here —
//! the plain-text join is the only formatter the core provides.

// ---------------------------------------------------------------------------
// Segment
// ---------------------------------------------------------------------------

/// A single time-aligned text chunk returned by a recognition backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Segment start time in milliseconds from the start of the audio.
    pub start_ms: u64,
    /// Segment end time in milliseconds from the start of the audio.
    pub end_ms: u64,
    /// Recognised text (may include punctuation inserted by the provider).
    pub text: String,
}

impl Segment {
    /// Construct a segment from millisecond bounds and text.
    pub fn new(start_ms: u64, end_ms: u64, text: impl Into<String>) -> Self {
        Self {
            start_ms,
            end_ms,
            text: text.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Transcript
// ---------------------------------------------------------------------------

/// The full result of one recognition run: segments in chronological order.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    /// Time-aligned segments as parsed from the provider response.
    pub segments: Vec<Segment>,
}

impl Transcript {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// Join all segment texts into a single newline-separated string.
    ///
    /// Empty segments are skipped so a provider that pads its response with
    /// silence markers does not produce blank lines.
    pub fn text(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_joins_segments_with_newlines() {
        let t = Transcript::new(vec![
            Segment::new(0, 1_000, "hello"),
            Segment::new(1_000, 2_000, "world"),
        ]);
        assert_eq!(t.text(), "hello\nworld");
    }

    #[test]
    fn text_skips_empty_segments() {
        let t = Transcript::new(vec![
            Segment::new(0, 500, "first"),
            Segment::new(500, 900, "   "),
            Segment::new(900, 1_400, "second"),
        ]);
        assert_eq!(t.text(), "first\nsecond");
    }

    #[test]
    fn empty_transcript_has_empty_text() {
        let t = Transcript::default();
        assert!(t.is_empty());
        assert_eq!(t.text(), "");
    }
}
