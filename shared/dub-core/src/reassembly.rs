//! Segment-accurate audio/video reassembly with filler silencing

use crate::{
    AudioTrack, DubCoreError, Result, SegmentClass, SegmentClassifier, Transcript, VideoTrack,
    WordSegment,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Counters describing one reassembly pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReassemblyStats {
    pub segments: usize,
    pub filler_segments: usize,
    pub zero_length_segments: usize,
    pub clamped_segments: usize,
    pub silenced_seconds: f64,
}

/// Output of [`SegmentReassembler::reassemble`]
#[derive(Debug, Clone)]
pub struct Reassembly {
    video: VideoTrack,
    audio: AudioTrack,
    stats: ReassemblyStats,
}

impl Reassembly {
    /// The filler-silenced audio
    pub fn cleaned_audio(&self) -> &AudioTrack {
        &self.audio
    }

    pub fn stats(&self) -> &ReassemblyStats {
        &self.stats
    }

    /// Duration of the reassembled video in seconds
    pub fn video_duration(&self) -> f64 {
        self.video.duration()
    }

    /// Reassembled video with the cleaned audio bound as its only audio
    pub fn into_video(self) -> VideoTrack {
        self.video.with_audio(self.audio)
    }

    /// `(video with cleaned audio bound, cleaned audio)`
    pub fn into_parts(self) -> (VideoTrack, AudioTrack) {
        let video = self.video.with_audio(self.audio.clone());
        (video, self.audio)
    }
}

/// Rebuilds audio and video from per-segment slices, silencing fillers
#[derive(Debug, Clone, Default)]
pub struct SegmentReassembler {
    classifier: SegmentClassifier,
}

impl SegmentReassembler {
    pub fn new(classifier: SegmentClassifier) -> Self {
        Self { classifier }
    }

    pub fn classifier(&self) -> &SegmentClassifier {
        &self.classifier
    }

    /// Slice, silence and concatenate every transcript segment in order.
    ///
    /// Segment bounds are clamped to each track's duration. The original
    /// video's own audio (if any) is discarded; `original_audio` is the
    /// source of every chunk.
    pub fn reassemble(
        &self,
        original_audio: AudioTrack,
        original_video: VideoTrack,
        transcript: &Transcript,
    ) -> Result<Reassembly> {
        if transcript.is_empty() {
            return Err(DubCoreError::EmptyInput("transcript has no segments".to_string()));
        }

        let audio_limit = original_audio.duration();
        let video_limit = original_video.duration();
        let source_video = original_video.without_audio();

        let mut stats = ReassemblyStats {
            segments: transcript.len(),
            ..Default::default()
        };
        let mut audio_chunks = Vec::with_capacity(transcript.len());
        let mut clips = Vec::with_capacity(transcript.len());

        for (index, segment) in transcript.segments().iter().enumerate() {
            let (audio_start, audio_end, audio_clamped) = clamp_span(segment, audio_limit)?;
            let (video_start, video_end, video_clamped) = clamp_span(segment, video_limit)?;

            if audio_clamped || video_clamped {
                stats.clamped_segments += 1;
                debug!(
                    index,
                    start = segment.start,
                    end = segment.end,
                    audio_limit,
                    video_limit,
                    "Segment clamped to track bounds"
                );
            }
            if segment.is_zero_length() {
                stats.zero_length_segments += 1;
            }

            let mut chunk = original_audio.slice(audio_start, audio_end)?;

            if self.classifier.classify(segment) == SegmentClass::Filler {
                stats.filler_segments += 1;
                stats.silenced_seconds += chunk.duration();
                debug!(index, word = %segment.text, start = audio_start, end = audio_end, "Silencing filler");
                chunk = chunk.into_silent();
            }

            audio_chunks.push(chunk);
            clips.push(source_video.subclip(video_start, video_end)?);
        }

        drop(original_audio);
        drop(source_video);

        let audio = AudioTrack::concat(audio_chunks)?;
        let video = VideoTrack::concat(clips)?;

        info!(
            segments = stats.segments,
            fillers = stats.filler_segments,
            silenced_secs = stats.silenced_seconds,
            video_secs = video.duration(),
            audio_secs = audio.duration(),
            "Reassembly complete"
        );

        Ok(Reassembly { video, audio, stats })
    }
}

/// Clamp a segment to `[0, limit]`, returning `(start, end, was_clamped)`.
///
/// Non-finite and inverted segments cannot be clamped meaningfully and are
/// reported as `Range` errors.
fn clamp_span(segment: &WordSegment, limit: f64) -> Result<(f64, f64, bool)> {
    if !segment.start.is_finite() || !segment.end.is_finite() || segment.start > segment.end {
        return Err(DubCoreError::Range {
            start: segment.start,
            end: segment.end,
            limit,
        });
    }

    let start = segment.start.clamp(0.0, limit);
    let end = segment.end.clamp(0.0, limit);
    let clamped = start != segment.start || end != segment.end;

    Ok((start, end, clamped))
}
