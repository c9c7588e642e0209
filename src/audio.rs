use anyhow::{anyhow, Context, Result};
use dub_core::AudioTrack;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::wav;

/// Audio information from ffprobe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioInfo {
    pub path: PathBuf,
    pub duration: Duration,
    pub sample_rate: u32,
    pub channels: u32,
    pub format: String,
    pub bitrate: Option<u32>,
    pub file_size: u64,
}

/// Extracts the speech track of a video as mono PCM
#[derive(Debug, Clone)]
pub struct AudioExtractor {
    /// Sample rate of extracted audio
    pub target_sample_rate: u32,
}

impl AudioExtractor {
    pub fn new() -> Self {
        Self {
            target_sample_rate: 16000,
        }
    }

    pub fn with_sample_rate(target_sample_rate: u32) -> Self {
        Self { target_sample_rate }
    }

    /// Extract the first audio stream of `video_path` into `dest_wav` and decode it
    pub async fn extract_track(&self, video_path: &Path, dest_wav: &Path) -> Result<AudioTrack> {
        info!("🎵 Extracting audio: {}", video_path.display());

        if let Some(parent) = dest_wav.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let output = tokio::process::Command::new("ffmpeg")
            .arg("-i")
            .arg(video_path)
            .args([
                "-vn", // No video stream
                "-map", "0:a:0", // First audio stream
                "-acodec", "pcm_s16le", // 16-bit PCM
                "-ar", &self.target_sample_rate.to_string(),
                "-ac", "1", // Mono channel
                "-f", "wav",
                "-y",
            ])
            .arg(dest_wav)
            .output()
            .await
            .context("Failed to run ffmpeg")?;

        if !output.status.success() {
            return Err(anyhow!(
                "Audio extraction failed for {}: {}",
                video_path.display(),
                last_line(&output.stderr)
            ));
        }

        let track = wav::read_wav(dest_wav)?;

        info!(
            "✅ Audio extracted: {} ({:.1}s, {}Hz)",
            dest_wav.display(),
            track.duration(),
            track.sample_rate()
        );

        Ok(track)
    }

    /// Get detailed audio information
    pub async fn get_audio_info(&self, audio_path: &Path) -> Result<AudioInfo> {
        let output = tokio::process::Command::new("ffprobe")
            .args([
                "-v", "quiet",
                "-print_format", "json",
                "-show_format",
                "-show_streams",
                "-select_streams", "a:0", // First audio stream
            ])
            .arg(audio_path)
            .output()
            .await
            .context("Failed to run ffprobe")?;

        if !output.status.success() {
            return Err(anyhow!("ffprobe failed for {}", audio_path.display()));
        }

        let ffprobe_data: serde_json::Value = serde_json::from_slice(&output.stdout)?;
        let file_size = tokio::fs::metadata(audio_path).await?.len();

        parse_audio_probe(audio_path, &ffprobe_data, file_size, self.target_sample_rate)
    }
}

impl Default for AudioExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_audio_probe(
    path: &Path,
    ffprobe_data: &serde_json::Value,
    file_size: u64,
    fallback_rate: u32,
) -> Result<AudioInfo> {
    let format = &ffprobe_data["format"];
    let audio_stream = ffprobe_data["streams"]
        .as_array()
        .and_then(|streams| streams.first())
        .ok_or_else(|| anyhow!("No audio stream found in {}", path.display()))?;

    let duration_seconds: f64 = format["duration"]
        .as_str()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0.0);

    Ok(AudioInfo {
        path: path.to_path_buf(),
        duration: Duration::from_secs_f64(duration_seconds),
        sample_rate: audio_stream["sample_rate"]
            .as_str()
            .and_then(|s| s.parse().ok())
            .unwrap_or(fallback_rate),
        channels: audio_stream["channels"].as_u64().unwrap_or(1) as u32,
        format: audio_stream["codec_name"]
            .as_str()
            .unwrap_or("unknown")
            .to_string(),
        bitrate: audio_stream["bit_rate"]
            .as_str()
            .and_then(|s| s.parse().ok()),
        file_size,
    })
}

/// Last non-empty line of a tool's stderr
pub(crate) fn last_line(stderr: &[u8]) -> String {
    String::from_utf8_lossy(stderr)
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("no output")
        .trim()
        .to_string()
}
