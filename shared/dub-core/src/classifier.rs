//! Filler-word classification

use crate::WordSegment;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Default disfluency tokens
pub const DEFAULT_FILLERS: [&str; 4] = ["um", "uh", "hmm", "umm"];

/// Classification of a single word segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SegmentClass {
    Filler,
    Normal,
}

/// Set of case-sensitive filler tokens.
///
/// Matching is exact: "Um" and "um," are not members of a lexicon holding "um".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FillerLexicon {
    tokens: BTreeSet<String>,
}

impl Default for FillerLexicon {
    fn default() -> Self {
        Self::from_tokens(DEFAULT_FILLERS)
    }
}

impl FillerLexicon {
    /// Build a lexicon from any list of tokens
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a comma-separated list, trimming whitespace around each entry
    pub fn parse_list(list: &str) -> Self {
        Self::from_tokens(
            list.split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty()),
        )
    }

    pub fn contains(&self, token: &str) -> bool {
        self.tokens.contains(token)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }
}

/// Labels word segments as filler or normal speech
#[derive(Debug, Clone, Default)]
pub struct SegmentClassifier {
    lexicon: FillerLexicon,
}

impl SegmentClassifier {
    pub fn new(lexicon: FillerLexicon) -> Self {
        Self { lexicon }
    }

    pub fn lexicon(&self) -> &FillerLexicon {
        &self.lexicon
    }

    pub fn classify(&self, segment: &WordSegment) -> SegmentClass {
        if self.lexicon.contains(&segment.text) {
            SegmentClass::Filler
        } else {
            SegmentClass::Normal
        }
    }
}
