//! Media I/O boundary used by the pipeline

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use dub_core::{AudioTrack, VideoTrack};
use std::path::Path;
use tracing::debug;

use crate::audio::AudioExtractor;
use crate::config::Config;
use crate::video::VideoProcessor;
use crate::wav;

/// Loading and saving of tracks to container files
#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Extract the speech track of `video` as mono PCM, persisting it at `dest_wav`
    async fn extract_audio(&self, video: &Path, dest_wav: &Path) -> Result<AudioTrack>;

    /// Frame handles for every source frame of `video`
    async fn load_video(&self, video: &Path) -> Result<VideoTrack>;

    async fn write_audio(&self, track: &AudioTrack, path: &Path) -> Result<()>;

    /// Encode `track`'s frames from `source` with `audio_wav` as its audio
    async fn render(
        &self,
        source: &Path,
        track: &VideoTrack,
        audio_wav: &Path,
        output: &Path,
    ) -> Result<()>;
}

/// [`MediaBackend`] driving the ffmpeg and ffprobe binaries
#[derive(Debug, Clone, Default)]
pub struct FfmpegMedia {
    audio: AudioExtractor,
    video: VideoProcessor,
}

impl FfmpegMedia {
    pub fn new(audio: AudioExtractor, video: VideoProcessor) -> Self {
        Self { audio, video }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            AudioExtractor::with_sample_rate(config.audio.sample_rate),
            VideoProcessor::with_codecs(&config.output.video_codec, &config.output.audio_codec),
        )
    }
}

#[async_trait]
impl MediaBackend for FfmpegMedia {
    async fn extract_audio(&self, video: &Path, dest_wav: &Path) -> Result<AudioTrack> {
        let source_audio = self.audio.get_audio_info(video).await?;
        debug!(
            "Source audio: {} {}Hz {}ch",
            source_audio.format, source_audio.sample_rate, source_audio.channels
        );

        self.audio.extract_track(video, dest_wav).await
    }

    async fn load_video(&self, video: &Path) -> Result<VideoTrack> {
        let info = self.video.get_video_info(video).await?;
        if info.frame_count == 0 {
            return Err(anyhow!("{} has no video frames", info.filename));
        }
        self.video.load_track(&info)
    }

    async fn write_audio(&self, track: &AudioTrack, path: &Path) -> Result<()> {
        wav::write_wav(track, path)
    }

    async fn render(
        &self,
        source: &Path,
        track: &VideoTrack,
        audio_wav: &Path,
        output: &Path,
    ) -> Result<()> {
        self.video.render(source, track, audio_wav, output).await
    }
}
