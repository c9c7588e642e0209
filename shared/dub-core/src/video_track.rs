//! Frame-list video track with an attached audio track

use crate::{time_to_index, AudioTrack, DubCoreError, Result};
use serde::{Deserialize, Serialize};

/// Handle to one frame of the source container.
///
/// Frames are never decoded in the core; a track is an ordered list of
/// source frame indices that the renderer later turns into pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameRef(pub u64);

impl FrameRef {
    pub fn index(&self) -> u64 {
        self.0
    }
}

/// A sequence of frames at a fixed frame rate, optionally carrying audio
#[derive(Debug, Clone, PartialEq)]
pub struct VideoTrack {
    frames: Vec<FrameRef>,
    frame_rate: f64,
    audio: Option<AudioTrack>,
}

impl VideoTrack {
    /// Create new video track without audio
    pub fn new(frames: Vec<FrameRef>, frame_rate: f64) -> Result<Self> {
        if !frame_rate.is_finite() || frame_rate <= 0.0 {
            return Err(DubCoreError::InvalidRate(format!(
                "frame rate must be positive, got {}",
                frame_rate
            )));
        }
        Ok(Self {
            frames,
            frame_rate,
            audio: None,
        })
    }

    /// Track covering source frames `0..frame_count` in order
    pub fn from_source(frame_count: u64, frame_rate: f64) -> Result<Self> {
        Self::new((0..frame_count).map(FrameRef).collect(), frame_rate)
    }

    pub fn frames(&self) -> &[FrameRef] {
        &self.frames
    }

    pub fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        self.frames.len() as f64 / self.frame_rate
    }

    pub fn audio(&self) -> Option<&AudioTrack> {
        self.audio.as_ref()
    }

    pub fn take_audio(&mut self) -> Option<AudioTrack> {
        self.audio.take()
    }

    /// Replace the attached audio entirely; the old audio is dropped, not mixed
    pub fn with_audio(mut self, audio: AudioTrack) -> Self {
        self.audio = Some(audio);
        self
    }

    /// Remove the attached audio
    pub fn without_audio(mut self) -> Self {
        self.audio = None;
        self
    }

    /// Copy out the `[start, end)` range (seconds).
    ///
    /// Frames are selected by rounding to the frame grid. Attached audio is
    /// sliced over the same interval. Out-of-range or inverted bounds are a
    /// `Range` error.
    pub fn subclip(&self, start: f64, end: f64) -> Result<VideoTrack> {
        let range_error = || DubCoreError::Range {
            start,
            end,
            limit: self.duration(),
        };

        if !start.is_finite() || !end.is_finite() || start < 0.0 || start > end {
            return Err(range_error());
        }

        let from = time_to_index(start, self.frame_rate);
        let to = time_to_index(end, self.frame_rate);
        if to > self.frames.len() {
            return Err(range_error());
        }

        let audio = match &self.audio {
            Some(audio) => {
                let limit = audio.duration();
                Some(audio.slice(start.min(limit), end.min(limit))?)
            }
            None => None,
        };

        Ok(Self {
            frames: self.frames[from..to].to_vec(),
            frame_rate: self.frame_rate,
            audio,
        })
    }

    /// Concatenate clips in order.
    ///
    /// All clips must share one frame rate. The result carries audio only if
    /// every clip does.
    pub fn concat(clips: Vec<VideoTrack>) -> Result<VideoTrack> {
        let frame_rate = clips
            .first()
            .map(|c| c.frame_rate)
            .ok_or_else(|| DubCoreError::EmptyInput("no video clips to concatenate".to_string()))?;

        let total: usize = clips.iter().map(VideoTrack::frame_count).sum();
        let mut frames = Vec::with_capacity(total);
        let mut audio_parts = Some(Vec::with_capacity(clips.len()));

        for clip in clips {
            if (clip.frame_rate - frame_rate).abs() > f64::EPSILON {
                return Err(DubCoreError::FrameRateMismatch {
                    expected: frame_rate,
                    found: clip.frame_rate,
                });
            }
            frames.extend(clip.frames);
            audio_parts = match (audio_parts, clip.audio) {
                (Some(mut parts), Some(audio)) => {
                    parts.push(audio);
                    Some(parts)
                }
                _ => None,
            };
        }

        let audio = match audio_parts {
            Some(parts) if !parts.is_empty() => Some(AudioTrack::concat(parts)?),
            _ => None,
        };

        Ok(Self {
            frames,
            frame_rate,
            audio,
        })
    }

    /// Collapse the frame list into contiguous `[first, last]` source runs
    pub fn source_runs(&self) -> Vec<(u64, u64)> {
        let mut runs: Vec<(u64, u64)> = Vec::new();

        for frame in &self.frames {
            match runs.last_mut() {
                Some((_, last)) if frame.0 == *last + 1 => *last = frame.0,
                _ => runs.push((frame.0, frame.0)),
            }
        }

        runs
    }
}
