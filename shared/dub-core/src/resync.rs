//! Duration-matching resynchronization of a replacement voice track

use crate::{AudioTrack, DubCoreError, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// `current_duration / target_duration`.
///
/// 1.0 leaves the track unchanged, above 1.0 compresses (speeds up), below
/// 1.0 stretches (slows down).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpeedRatio(f64);

impl SpeedRatio {
    /// Wrap a raw ratio; must be finite and positive
    pub fn new(value: f64) -> Result<Self> {
        if !value.is_finite() || value <= 0.0 {
            return Err(DubCoreError::InvalidRate(format!(
                "speed ratio must be positive, got {}",
                value
            )));
        }
        Ok(Self(value))
    }

    /// Ratio that maps `current_duration` onto `target_duration`
    pub fn between(current_duration: f64, target_duration: f64) -> Result<Self> {
        if !target_duration.is_finite() || target_duration <= 0.0 {
            return Err(DubCoreError::InvalidTarget(target_duration));
        }
        if !current_duration.is_finite() || current_duration <= 0.0 {
            return Err(DubCoreError::EmptyInput(
                "replacement audio has no duration".to_string(),
            ));
        }
        Self::new(current_duration / target_duration)
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    pub fn is_identity(&self) -> bool {
        self.0 == 1.0
    }

    pub fn is_speed_up(&self) -> bool {
        self.0 > 1.0
    }
}

/// Changes a track's duration by a speed ratio.
///
/// Implementations must return a new track of `round(len / ratio)` samples at
/// the input's sample rate and must not modify the input.
pub trait TimeStretcher: Send + Sync {
    fn name(&self) -> &'static str;

    fn stretch(&self, audio: &AudioTrack, ratio: SpeedRatio) -> Result<AudioTrack>;
}

/// Speed change by resampling.
///
/// The sample stream is read as if recorded at `sample_rate * ratio` and
/// linearly interpolated back onto the nominal rate. Duration and pitch move
/// together; pitch is not preserved.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResampleStretcher;

impl TimeStretcher for ResampleStretcher {
    fn name(&self) -> &'static str {
        "resample"
    }

    fn stretch(&self, audio: &AudioTrack, ratio: SpeedRatio) -> Result<AudioTrack> {
        if ratio.is_identity() || audio.is_empty() {
            return Ok(audio.clone());
        }

        let input = audio.samples();
        let last = input.len() - 1;
        let step = ratio.value();
        let out_len = (input.len() as f64 / step).round() as usize;

        let output = (0..out_len)
            .map(|i| {
                let position = i as f64 * step;
                let index = (position.floor() as usize).min(last);
                let frac = (position - index as f64).clamp(0.0, 1.0) as f32;
                let a = input[index];
                let b = input[(index + 1).min(last)];
                a + (b - a) * frac
            })
            .collect();

        AudioTrack::new(output, audio.sample_rate())
    }
}

/// Fits a synthesized voice track to a target duration
#[derive(Debug, Clone, Default)]
pub struct Resynchronizer<S = ResampleStretcher> {
    stretcher: S,
}

impl Resynchronizer<ResampleStretcher> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S: TimeStretcher> Resynchronizer<S> {
    /// Use a different stretching algorithm
    pub fn with_stretcher(stretcher: S) -> Self {
        Self { stretcher }
    }

    pub fn stretcher(&self) -> &S {
        &self.stretcher
    }

    /// Return a new track whose duration matches `target_duration` to within
    /// one sample
    pub fn resync(&self, replacement: &AudioTrack, target_duration: f64) -> Result<AudioTrack> {
        self.resync_with_ratio(replacement, target_duration)
            .map(|(audio, _)| audio)
    }

    /// Same as [`resync`](Self::resync), also returning the applied ratio
    pub fn resync_with_ratio(
        &self,
        replacement: &AudioTrack,
        target_duration: f64,
    ) -> Result<(AudioTrack, SpeedRatio)> {
        let current_duration = replacement.duration();
        let ratio = SpeedRatio::between(current_duration, target_duration)?;

        debug!(
            algorithm = self.stretcher.name(),
            current_secs = current_duration,
            target_secs = target_duration,
            ratio = ratio.value(),
            "Resynchronizing replacement audio"
        );

        let adjusted = self.stretcher.stretch(replacement, ratio)?;

        info!(
            ratio = ratio.value(),
            speed_up = ratio.is_speed_up(),
            achieved_secs = adjusted.duration(),
            target_secs = target_duration,
            "Replacement audio resynchronized"
        );

        Ok((adjusted, ratio))
    }
}
