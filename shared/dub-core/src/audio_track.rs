//! In-memory mono audio track

use crate::{time_to_index, DubCoreError, Result};

/// A sampled mono waveform at a fixed sample rate.
///
/// Samples are normalized `f32` in `[-1.0, 1.0]`. The track owns its buffer;
/// slicing copies the selected range into a new track.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioTrack {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl AudioTrack {
    /// Create new audio track
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(DubCoreError::InvalidRate("sample rate must be greater than 0".to_string()));
        }
        Ok(Self { samples, sample_rate })
    }

    /// Silent track of `len` samples
    pub fn silent(len: usize, sample_rate: u32) -> Result<Self> {
        Self::new(vec![0.0; len], sample_rate)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Sample index for a time in seconds
    pub fn index_at(&self, seconds: f64) -> usize {
        time_to_index(seconds, self.sample_rate as f64)
    }

    /// Copy out the `[start, end)` range (seconds).
    ///
    /// Fails with `Range` when either bound lies outside `[0, duration]`,
    /// when `start > end`, or when a bound is not finite. `start == end`
    /// yields an empty track.
    pub fn slice(&self, start: f64, end: f64) -> Result<AudioTrack> {
        let range_error = || DubCoreError::Range {
            start,
            end,
            limit: self.duration(),
        };

        if !start.is_finite() || !end.is_finite() || start < 0.0 || start > end {
            return Err(range_error());
        }

        let from = self.index_at(start);
        let to = self.index_at(end);
        if to > self.samples.len() {
            return Err(range_error());
        }

        Ok(Self {
            samples: self.samples[from..to].to_vec(),
            sample_rate: self.sample_rate,
        })
    }

    /// Replace the content with silence, keeping the exact sample count
    pub fn into_silent(mut self) -> AudioTrack {
        self.samples.iter_mut().for_each(|s| *s = 0.0);
        self
    }

    /// True if every sample is exactly zero
    pub fn is_silent(&self) -> bool {
        self.samples.iter().all(|&s| s == 0.0)
    }

    /// Sum of squared samples
    pub fn energy(&self) -> f64 {
        self.samples.iter().map(|&s| (s as f64) * (s as f64)).sum()
    }

    /// Mean squared sample value (0.0 for an empty track)
    pub fn mean_power(&self) -> f64 {
        if self.samples.is_empty() {
            0.0
        } else {
            self.energy() / self.samples.len() as f64
        }
    }

    /// Concatenate tracks in order.
    ///
    /// Empty tracks are no-ops; an empty input list is `EmptyInput`, and all
    /// tracks must share one sample rate.
    pub fn concat(tracks: Vec<AudioTrack>) -> Result<AudioTrack> {
        let sample_rate = tracks
            .first()
            .map(|t| t.sample_rate)
            .ok_or_else(|| DubCoreError::EmptyInput("no audio chunks to concatenate".to_string()))?;

        let total: usize = tracks.iter().map(AudioTrack::len).sum();
        let mut samples = Vec::with_capacity(total);

        for track in tracks {
            if track.sample_rate != sample_rate {
                return Err(DubCoreError::SampleRateMismatch {
                    expected: sample_rate,
                    found: track.sample_rate,
                });
            }
            samples.extend(track.samples);
        }

        Ok(Self { samples, sample_rate })
    }
}
