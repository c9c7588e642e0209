//! Word-level transcript data structures

use serde::{Deserialize, Serialize};

/// A transcribed word with its start/end time (seconds) in the source audio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordSegment {
    /// Transcribed token, exactly as the transcriber produced it
    #[serde(alias = "word")]
    pub text: String,
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
}

impl WordSegment {
    /// Create new word segment
    pub fn new(text: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            text: text.into(),
            start,
            end,
        }
    }

    /// Length of the segment in seconds (zero for inverted segments)
    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }

    /// True for `start == end` segments, which contribute nothing
    pub fn is_zero_length(&self) -> bool {
        self.end == self.start
    }
}

/// Ordered, immutable sequence of word segments
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    segments: Vec<WordSegment>,
}

impl Transcript {
    /// Create a transcript; segments are kept in the given order
    pub fn new(segments: Vec<WordSegment>) -> Self {
        Self { segments }
    }

    /// Parse a JSON array of `{ "word"|"text", "start", "end" }` objects
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn segments(&self) -> &[WordSegment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Space-joined words, the text handed to correction and synthesis
    pub fn text(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// `(first.start, last.end)` if the transcript is non-empty
    pub fn span(&self) -> Option<(f64, f64)> {
        match (self.segments.first(), self.segments.last()) {
            (Some(first), Some(last)) => Some((first.start, last.end)),
            _ => None,
        }
    }

    /// Sum of all segment durations
    pub fn total_duration(&self) -> f64 {
        self.segments.iter().map(WordSegment::duration).sum()
    }
}

impl From<Vec<WordSegment>> for Transcript {
    fn from(segments: Vec<WordSegment>) -> Self {
        Self::new(segments)
    }
}
