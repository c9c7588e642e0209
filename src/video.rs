use anyhow::{anyhow, Context, Result};
use dub_core::VideoTrack;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::audio::last_line;

/// Video information extracted from file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoInfo {
    pub path: PathBuf,
    pub filename: String,
    pub duration: Duration,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    /// Frames in the first video stream
    pub frame_count: u64,
    pub format: String,
    pub file_size: u64,
    pub has_audio: bool,
}

/// Probes and renders videos using FFmpeg
#[derive(Debug, Clone)]
pub struct VideoProcessor {
    video_codec: String,
    audio_codec: String,
}

impl VideoProcessor {
    pub fn new() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
        }
    }

    pub fn with_codecs(video_codec: impl Into<String>, audio_codec: impl Into<String>) -> Self {
        Self {
            video_codec: video_codec.into(),
            audio_codec: audio_codec.into(),
        }
    }

    /// Extract video information using ffprobe
    pub async fn get_video_info(&self, video_path: &Path) -> Result<VideoInfo> {
        let output = tokio::process::Command::new("ffprobe")
            .args([
                "-v", "quiet",
                "-print_format", "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(video_path)
            .output()
            .await
            .context("Failed to run ffprobe")?;

        if !output.status.success() {
            return Err(anyhow!("ffprobe failed for {}", video_path.display()));
        }

        let ffprobe_data: serde_json::Value = serde_json::from_slice(&output.stdout)?;
        let file_size = tokio::fs::metadata(video_path).await?.len();
        let video_info = parse_video_probe(video_path, &ffprobe_data, file_size)?;

        info!(
            "📹 Analyzed video: {} ({}x{}, {:.2}fps, {:.1}s, {} frames)",
            video_info.filename,
            video_info.width,
            video_info.height,
            video_info.fps,
            video_info.duration.as_secs_f64(),
            video_info.frame_count
        );

        Ok(video_info)
    }

    /// One frame handle per source frame, without audio
    pub fn load_track(&self, info: &VideoInfo) -> Result<VideoTrack> {
        Ok(VideoTrack::from_source(info.frame_count, info.fps)?)
    }

    /// Encode the frames selected by `track` from `source` with `audio_wav` as
    /// the only audio stream
    pub async fn render(
        &self,
        source: &Path,
        track: &VideoTrack,
        audio_wav: &Path,
        output: &Path,
    ) -> Result<()> {
        let runs = track.source_runs();
        if runs.is_empty() {
            return Err(anyhow!("Nothing to render: video track has no frames"));
        }

        let script_path = output.with_extension("filter");
        tokio::fs::write(&script_path, build_filter_script(&runs))
            .await
            .with_context(|| format!("Failed to write filter script {}", script_path.display()))?;

        info!(
            "🎬 Rendering {} frames in {} runs to {}",
            track.frame_count(),
            runs.len(),
            output.display()
        );
        debug!("Filter script: {}", script_path.display());

        let result = tokio::process::Command::new("ffmpeg")
            .arg("-i")
            .arg(source)
            .arg("-i")
            .arg(audio_wav)
            .arg("-filter_complex_script")
            .arg(&script_path)
            .args([
                "-map", "[outv]",
                "-map", "1:a:0",
                "-c:v", &self.video_codec,
                "-c:a", &self.audio_codec,
                "-y",
            ])
            .arg(output)
            .output()
            .await
            .context("Failed to run ffmpeg");

        if let Err(e) = tokio::fs::remove_file(&script_path).await {
            warn!("Failed to remove filter script {}: {}", script_path.display(), e);
        }

        let output_status = result?;
        if !output_status.status.success() {
            return Err(anyhow!(
                "Render failed for {}: {}",
                source.display(),
                last_line(&output_status.stderr)
            ));
        }

        info!("✅ Rendered: {}", output.display());
        Ok(())
    }
}

impl Default for VideoProcessor {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_video_probe(
    video_path: &Path,
    ffprobe_data: &serde_json::Value,
    file_size: u64,
) -> Result<VideoInfo> {
    let format = &ffprobe_data["format"];
    let streams = ffprobe_data["streams"]
        .as_array()
        .ok_or_else(|| anyhow!("ffprobe returned no streams for {}", video_path.display()))?;

    let video_stream = streams
        .iter()
        .find(|s| s["codec_type"] == "video")
        .ok_or_else(|| anyhow!("No video stream found"))?;
    let has_audio = streams.iter().any(|s| s["codec_type"] == "audio");

    let duration_seconds: f64 = video_stream["duration"]
        .as_str()
        .or_else(|| format["duration"].as_str())
        .and_then(|s| s.parse().ok())
        .unwrap_or(0.0);

    let fps = video_stream["avg_frame_rate"]
        .as_str()
        .and_then(parse_rate)
        .or_else(|| video_stream["r_frame_rate"].as_str().and_then(parse_rate))
        .ok_or_else(|| anyhow!("Unknown frame rate for {}", video_path.display()))?;

    let frame_count = video_stream["nb_frames"]
        .as_str()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| (duration_seconds * fps).round() as u64);

    Ok(VideoInfo {
        path: video_path.to_path_buf(),
        filename: video_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default(),
        duration: Duration::from_secs_f64(duration_seconds),
        width: video_stream["width"].as_u64().unwrap_or(0) as u32,
        height: video_stream["height"].as_u64().unwrap_or(0) as u32,
        fps,
        frame_count,
        format: format["format_name"]
            .as_str()
            .unwrap_or("unknown")
            .to_string(),
        file_size,
        has_audio,
    })
}

/// Parse "30000/1001" or "25" into a positive rate
fn parse_rate(s: &str) -> Option<f64> {
    let rate = match s.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.parse().ok()?;
            let den: f64 = den.parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => s.parse().ok()?,
    };
    (rate.is_finite() && rate > 0.0).then_some(rate)
}

/// ffmpeg filtergraph selecting each inclusive `[first, last]` frame run from
/// input 0 and concatenating them into `[outv]`
fn build_filter_script(runs: &[(u64, u64)]) -> String {
    let mut script = String::new();

    for (i, (first, last)) in runs.iter().enumerate() {
        let _ = writeln!(
            script,
            "[0:v]trim=start_frame={}:end_frame={},setpts=PTS-STARTPTS[v{}];",
            first,
            last + 1,
            i
        );
    }
    for i in 0..runs.len() {
        let _ = write!(script, "[v{}]", i);
    }
    let _ = writeln!(script, "concat=n={}:v=1:a=0[outv]", runs.len());

    script
}
