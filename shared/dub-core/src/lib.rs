//! Dub Core - Segment-accurate reassembly and duration-matching resync
//!
//! Everything in this crate is pure and synchronous: tracks are owned sample
//! and frame buffers, and every operation either consumes its inputs or
//! returns a fresh track.

pub mod transcript;
pub mod audio_track;
pub mod video_track;
pub mod classifier;
pub mod reassembly;
pub mod resync;

pub use transcript::{Transcript, WordSegment};
pub use audio_track::AudioTrack;
pub use video_track::{FrameRef, VideoTrack};
pub use classifier::{FillerLexicon, SegmentClass, SegmentClassifier};
pub use reassembly::{Reassembly, ReassemblyStats, SegmentReassembler};
pub use resync::{ResampleStretcher, Resynchronizer, SpeedRatio, TimeStretcher};

/// Result type for Dub Core operations
pub type Result<T> = std::result::Result<T, DubCoreError>;

/// Error types for Dub Core operations
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum DubCoreError {
    #[error("Range error: [{start}, {end}) is outside the valid range [0, {limit}]")]
    Range { start: f64, end: f64, limit: f64 },

    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error("Invalid target duration: {0} (must be a positive number of seconds)")]
    InvalidTarget(f64),

    #[error("Sample rate mismatch: expected {expected}Hz, found {found}Hz")]
    SampleRateMismatch { expected: u32, found: u32 },

    #[error("Frame rate mismatch: expected {expected}fps, found {found}fps")]
    FrameRateMismatch { expected: f64, found: f64 },

    #[error("Invalid rate: {0}")]
    InvalidRate(String),
}

/// Convert a time in seconds to an index on a grid with `rate` steps per second.
///
/// Rounding (not truncation) keeps adjacent `[start, end)` intervals tiling
/// exactly: the end index of one interval is the start index of the next.
pub(crate) fn time_to_index(seconds: f64, rate: f64) -> usize {
    (seconds * rate).round().max(0.0) as usize
}
