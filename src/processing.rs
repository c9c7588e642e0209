use anyhow::{anyhow, Context};
use dub_core::{ReassemblyStats, Resynchronizer, SegmentClassifier, SegmentReassembler};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{
    CleanupError, PipelineError, PipelineResult, PipelineStage, ServiceUnavailable, StageError,
};
use crate::llm::{GrammarCorrector, TextCorrector};
use crate::media::{FfmpegMedia, MediaBackend};
use crate::scratch::ScratchSpace;
use crate::speech::{DeepgramSpeech, SpeechSynthesizer};
use crate::transcription::{DeepgramTranscriber, Transcriber};
use crate::wav;

/// Shared cancellation flag for a pipeline run
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Summary of a successful run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Raw transcript text
    pub transcript: String,
    /// Text handed to speech synthesis
    pub corrected_text: String,
    pub reassembly: ReassemblyStats,
    /// Duration of the reassembled video (the resync target)
    pub reassembled_duration: f64,
    pub synthesized_duration: f64,
    pub speed_ratio: f64,
    pub final_audio_duration: f64,
    pub cleaned_audio_path: Option<PathBuf>,
    pub processing_time: Duration,
    pub cleanup_failures: Vec<CleanupError>,
}

impl PipelineReport {
    pub async fn write_json(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("Failed to write report {}", path.display()))?;
        info!("📄 Report written to {}", path.display());
        Ok(())
    }
}

/// Sequential filler-silencing and re-dubbing pipeline
pub struct DubPipeline {
    config: Config,
    media: Box<dyn MediaBackend>,
    transcriber: Box<dyn Transcriber>,
    corrector: Option<Box<dyn TextCorrector>>,
    synthesizer: Box<dyn SpeechSynthesizer>,
    reassembler: SegmentReassembler,
    resynchronizer: Resynchronizer,
    cancel: CancelHandle,
    scratch_root: Option<PathBuf>,
}

impl DubPipeline {
    /// Assemble a pipeline from its collaborators. With no corrector the raw
    /// transcript is synthesized.
    pub fn new(
        config: Config,
        media: Box<dyn MediaBackend>,
        transcriber: Box<dyn Transcriber>,
        corrector: Option<Box<dyn TextCorrector>>,
        synthesizer: Box<dyn SpeechSynthesizer>,
    ) -> Self {
        let reassembler =
            SegmentReassembler::new(SegmentClassifier::new(config.fillers.words.clone()));

        Self {
            config,
            media,
            transcriber,
            corrector,
            synthesizer,
            reassembler,
            resynchronizer: Resynchronizer::new(),
            cancel: CancelHandle::new(),
            scratch_root: None,
        }
    }

    /// Build the ffmpeg + Deepgram + LLM pipeline described by `config`
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        config.validate()?;

        let media = FfmpegMedia::from_config(&config);
        let transcriber = DeepgramTranscriber::new(config.transcription.clone())?;
        let synthesizer = DeepgramSpeech::new(config.speech.clone())?;
        let corrector: Option<Box<dyn TextCorrector>> = if config.correction.enabled {
            Some(Box::new(GrammarCorrector::new(
                &config.correction.llm,
                config.correction.prompt.clone(),
            )?))
        } else {
            None
        };

        Ok(Self::new(
            config,
            Box::new(media),
            Box::new(transcriber),
            corrector,
            Box::new(synthesizer),
        ))
    }

    pub fn with_cancel_handle(mut self, cancel: CancelHandle) -> Self {
        self.cancel = cancel;
        self
    }

    /// Create scratch directories under `root` instead of the system temp dir
    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(root.into());
        self
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Dub `input` into `output`.
    ///
    /// Intermediates are removed on every exit path. Cleanup failures are
    /// reported, never returned as errors.
    pub async fn run(&self, input: &Path, output: &Path) -> PipelineResult<PipelineReport> {
        let started = Instant::now();
        info!("🚀 Dubbing {} -> {}", input.display(), output.display());

        let scratch = match &self.scratch_root {
            Some(root) => ScratchSpace::new_in(root),
            None => ScratchSpace::new(),
        };
        let mut scratch =
            scratch.map_err(|e| PipelineError::stage_failed(PipelineStage::Setup, e))?;

        let outcome = self.run_stages(input, output, &mut scratch).await;
        let cleanup_failures = scratch.cleanup().await;

        let mut report = match outcome {
            Ok(report) => report,
            Err(e) => {
                if !cleanup_failures.is_empty() {
                    warn!(
                        "{} intermediates could not be removed after failed run",
                        cleanup_failures.len()
                    );
                }
                return Err(e);
            }
        };

        report.cleanup_failures = cleanup_failures;
        report.processing_time = started.elapsed();

        if let Some(path) = &self.config.output.report_path {
            report
                .write_json(path)
                .await
                .map_err(|e| PipelineError::stage_failed(PipelineStage::Report, e))?;
        }

        info!(
            "🎉 Finished in {:.2}s: {}",
            report.processing_time.as_secs_f64(),
            report.output.display()
        );
        Ok(report)
    }

    async fn run_stages(
        &self,
        input: &Path,
        output: &Path,
        scratch: &mut ScratchSpace,
    ) -> PipelineResult<PipelineReport> {
        use PipelineStage::*;

        // Audio extraction
        self.checkpoint(AudioExtraction)?;
        if tokio::fs::metadata(input).await.is_err() {
            return Err(PipelineError::stage_failed(
                AudioExtraction,
                anyhow!("Input video not found: {}", input.display()),
            ));
        }
        let extracted_path = scratch.file("extracted_audio.wav");
        let original_audio = self
            .media
            .extract_audio(input, &extracted_path)
            .await
            .map_err(|e| PipelineError::stage_failed(AudioExtraction, e))?;
        let original_video = self
            .media
            .load_video(input)
            .await
            .map_err(|e| PipelineError::stage_failed(AudioExtraction, e))?;
        let upload = wav::encode_wav_bytes(&original_audio)
            .map_err(|e| PipelineError::stage_failed(AudioExtraction, e))?;

        // Transcription
        let transcript = self
            .call_service(
                Transcription,
                self.transcriber.name(),
                self.config.transcription.timeout_seconds,
                self.transcriber.transcribe(upload),
            )
            .await?;
        if transcript.is_empty() {
            return Err(PipelineError::stage_failed(
                Transcription,
                dub_core::DubCoreError::EmptyInput("transcription returned no words".to_string()),
            ));
        }
        let transcript_text = transcript.text();
        info!("📝 Transcript ({} words): {}", transcript.len(), transcript_text);

        // Correction
        let corrected_text = match &self.corrector {
            Some(corrector) => {
                self.call_service(
                    Correction,
                    corrector.name(),
                    self.config.correction.llm.timeout_seconds,
                    corrector.correct(&transcript_text),
                )
                .await?
            }
            None => {
                info!("⏭️ Correction disabled, using raw transcript");
                transcript_text.clone()
            }
        };
        info!("✏️ Corrected text: {}", corrected_text);

        // Reassembly
        self.checkpoint(Reassembly)?;
        let reassembly = self
            .reassembler
            .reassemble(original_audio, original_video, &transcript)
            .map_err(|e| PipelineError::stage_failed(Reassembly, e))?;
        let stats = reassembly.stats().clone();

        let cleaned_audio_path = self.config.output.cleaned_audio_path.clone();
        if let Some(path) = &cleaned_audio_path {
            self.media
                .write_audio(reassembly.cleaned_audio(), path)
                .await
                .map_err(|e| PipelineError::stage_failed(Reassembly, e))?;
            info!("💾 Cleaned audio saved to {}", path.display());
        }

        let video = reassembly.into_video();
        let target_duration = video.duration();
        info!(
            "✂️ Reassembled {} segments ({} fillers silenced), {:.2}s",
            stats.segments, stats.filler_segments, target_duration
        );

        // Synthesis
        let replacement = self
            .call_service(
                Synthesis,
                self.synthesizer.name(),
                self.config.speech.timeout_seconds,
                self.synthesizer.synthesize(&corrected_text),
            )
            .await?;
        let synthesized_duration = replacement.duration();

        // Resync
        self.checkpoint(Resync)?;
        let (adjusted, ratio) = self
            .resynchronizer
            .resync_with_ratio(&replacement, target_duration)
            .map_err(|e| PipelineError::stage_failed(Resync, e))?;
        drop(replacement);
        info!(
            "⏱️ Speech {:.2}s -> {:.2}s (ratio {:.3})",
            synthesized_duration,
            adjusted.duration(),
            ratio.value()
        );
        let final_video = video.with_audio(adjusted);

        // Render
        self.checkpoint(Render)?;
        let final_audio = final_video
            .audio()
            .ok_or_else(|| PipelineError::stage_failed(Render, anyhow!("final video has no audio")))?;
        let final_audio_duration = final_audio.duration();

        let adjusted_path = scratch.file("adjusted_speech.wav");
        self.media
            .write_audio(final_audio, &adjusted_path)
            .await
            .map_err(|e| PipelineError::stage_failed(Render, e))?;

        let extension = output.extension().and_then(|e| e.to_str()).unwrap_or("mp4");
        let render_path = scratch.file(&format!("render.{}", extension));
        self.media
            .render(input, &final_video, &adjusted_path, &render_path)
            .await
            .map_err(|e| PipelineError::stage_failed(Render, e))?;
        publish(&render_path, output)
            .await
            .map_err(|e| PipelineError::stage_failed(Render, e))?;

        Ok(PipelineReport {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            transcript: transcript_text,
            corrected_text,
            reassembly: stats,
            reassembled_duration: target_duration,
            synthesized_duration,
            speed_ratio: ratio.value(),
            final_audio_duration,
            cleaned_audio_path,
            processing_time: Duration::ZERO,
            cleanup_failures: Vec::new(),
        })
    }

    fn checkpoint(&self, stage: PipelineStage) -> PipelineResult<()> {
        if self.cancel.is_cancelled() {
            warn!("🛑 Cancelled before {} stage", stage);
            return Err(PipelineError::stage_failed(stage, StageError::Cancelled));
        }
        Ok(())
    }

    /// Await one external call under a timeout and the cancel handle
    async fn call_service<T, F>(
        &self,
        stage: PipelineStage,
        service: &str,
        timeout_seconds: u64,
        call: F,
    ) -> PipelineResult<T>
    where
        F: Future<Output = Result<T, ServiceUnavailable>>,
    {
        self.checkpoint(stage)?;
        debug!("Calling {} (timeout {}s)", service, timeout_seconds);

        let result = tokio::select! {
            _ = self.cancel.cancelled() => Err(ServiceUnavailable::new(service, "cancelled")),
            outcome = tokio::time::timeout(Duration::from_secs(timeout_seconds), call) => match outcome {
                Ok(result) => result,
                Err(_) => Err(ServiceUnavailable::new(
                    service,
                    format!("timed out after {}s", timeout_seconds),
                )),
            },
        };

        result.map_err(|e| PipelineError::stage_failed(stage, e))
    }
}

/// Move a finished render into place, copying across filesystems
async fn publish(rendered: &Path, output: &Path) -> std::io::Result<()> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    if tokio::fs::rename(rendered, output).await.is_ok() {
        return Ok(());
    }

    if let Err(e) = tokio::fs::copy(rendered, output).await {
        let _ = tokio::fs::remove_file(output).await;
        return Err(e);
    }
    Ok(())
}
