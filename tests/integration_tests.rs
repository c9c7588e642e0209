use async_trait::async_trait;
use filler_dub::dub_core::{AudioTrack, DubCoreError, Transcript, VideoTrack, WordSegment};
use filler_dub::{
    wav, CancelHandle, Config, ConfigBuilder, DubPipeline, MediaBackend, PipelineStage,
    ServiceUnavailable, SpeechSynthesizer, StageError, TextCorrector, Transcriber,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};

const SAMPLE_RATE: u32 = 16000;

fn speech_like(seconds: f64) -> AudioTrack {
    let len = (seconds * SAMPLE_RATE as f64).round() as usize;
    let samples = (0..len)
        .map(|i| 0.05 + 0.3 * (i as f32 * 0.07).sin().abs())
        .collect();
    AudioTrack::new(samples, SAMPLE_RATE).unwrap()
}

fn scenario_transcript() -> Transcript {
    Transcript::new(vec![
        WordSegment::new("um", 0.0, 0.5),
        WordSegment::new("hello", 0.5, 1.2),
        WordSegment::new("uh", 1.2, 1.6),
        WordSegment::new("world", 1.6, 2.4),
    ])
}

/// Observations made by the fake media backend
#[derive(Default)]
struct MediaLog {
    rendered_frames: Option<usize>,
    rendered_audio_secs: Option<f64>,
}

struct FakeMedia {
    audio: AudioTrack,
    video: VideoTrack,
    fail_render: bool,
    log: Arc<Mutex<MediaLog>>,
}

impl FakeMedia {
    fn new(log: Arc<Mutex<MediaLog>>) -> Self {
        Self {
            audio: speech_like(2.4),
            video: VideoTrack::from_source(60, 25.0).unwrap(),
            fail_render: false,
            log,
        }
    }
}

#[async_trait]
impl MediaBackend for FakeMedia {
    async fn extract_audio(&self, _video: &Path, dest_wav: &Path) -> anyhow::Result<AudioTrack> {
        wav::write_wav(&self.audio, dest_wav)?;
        Ok(self.audio.clone())
    }

    async fn load_video(&self, _video: &Path) -> anyhow::Result<VideoTrack> {
        Ok(self.video.clone())
    }

    async fn write_audio(&self, track: &AudioTrack, path: &Path) -> anyhow::Result<()> {
        wav::write_wav(track, path)
    }

    async fn render(
        &self,
        _source: &Path,
        track: &VideoTrack,
        audio_wav: &Path,
        output: &Path,
    ) -> anyhow::Result<()> {
        if self.fail_render {
            tokio::fs::write(output, b"partial").await?;
            anyhow::bail!("encoder crashed");
        }

        let audio = wav::read_wav(audio_wav)?;
        {
            let mut log = self.log.lock().unwrap();
            log.rendered_frames = Some(track.frame_count());
            log.rendered_audio_secs = Some(audio.duration());
        }
        tokio::fs::write(output, format!("frames={}", track.frame_count())).await?;
        Ok(())
    }
}

enum TranscriberMode {
    Words(Transcript),
    Fail,
    Hang,
}

struct FakeTranscriber {
    mode: TranscriberMode,
}

#[async_trait]
impl Transcriber for FakeTranscriber {
    fn name(&self) -> &str {
        "fake-stt"
    }

    async fn transcribe(&self, wav_bytes: Vec<u8>) -> Result<Transcript, ServiceUnavailable> {
        assert!(wav::decode_wav_bytes(&wav_bytes).is_ok());
        match &self.mode {
            TranscriberMode::Words(transcript) => Ok(transcript.clone()),
            TranscriberMode::Fail => Err(ServiceUnavailable::new("fake-stt", "HTTP 503")),
            TranscriberMode::Hang => {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(Transcript::default())
            }
        }
    }
}

struct UppercaseCorrector;

#[async_trait]
impl TextCorrector for UppercaseCorrector {
    fn name(&self) -> &str {
        "fake-llm"
    }

    async fn correct(&self, text: &str) -> Result<String, ServiceUnavailable> {
        Ok(text.to_uppercase())
    }
}

struct FakeSynth {
    seconds: f64,
    spoken: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl SpeechSynthesizer for FakeSynth {
    fn name(&self) -> &str {
        "fake-tts"
    }

    async fn synthesize(&self, text: &str) -> Result<AudioTrack, ServiceUnavailable> {
        self.spoken.lock().unwrap().push(text.to_string());
        let len = (self.seconds * 24000.0) as usize;
        let samples = (0..len).map(|i| 0.4 * (i as f32 * 0.05).sin()).collect();
        Ok(AudioTrack::new(samples, 24000).unwrap())
    }
}

struct Harness {
    dir: TempDir,
    input: PathBuf,
    output: PathBuf,
    scratch_root: PathBuf,
    media_log: Arc<Mutex<MediaLog>>,
    spoken: Arc<Mutex<Vec<String>>>,
}

impl Harness {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("talk.mp4");
        std::fs::write(&input, b"not really a video").unwrap();
        let scratch_root = dir.path().join("scratch");
        std::fs::create_dir(&scratch_root).unwrap();

        Self {
            output: dir.path().join("final_output_video.mp4"),
            input,
            scratch_root,
            dir,
            media_log: Arc::new(Mutex::new(MediaLog::default())),
            spoken: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn config(&self) -> ConfigBuilder {
        ConfigBuilder::new().with_service_timeout(1)
    }

    fn pipeline(
        &self,
        config: Config,
        media: FakeMedia,
        mode: TranscriberMode,
        corrector: Option<Box<dyn TextCorrector>>,
    ) -> DubPipeline {
        DubPipeline::new(
            config,
            Box::new(media),
            Box::new(FakeTranscriber { mode }),
            corrector,
            Box::new(FakeSynth {
                seconds: 3.0,
                spoken: self.spoken.clone(),
            }),
        )
        .with_scratch_root(&self.scratch_root)
    }

    fn default_pipeline(&self, config: Config) -> DubPipeline {
        self.pipeline(
            config,
            FakeMedia::new(self.media_log.clone()),
            TranscriberMode::Words(scenario_transcript()),
            Some(Box::new(UppercaseCorrector)),
        )
    }

    fn scratch_is_empty(&self) -> bool {
        std::fs::read_dir(&self.scratch_root).unwrap().next().is_none()
    }
}

#[tokio::test]
async fn test_full_pipeline() {
    let harness = Harness::new();
    let cleaned = harness.dir.path().join("cleaned.wav");
    let report_path = harness.dir.path().join("report.json");
    let config = harness
        .config()
        .with_cleaned_audio_path(&cleaned)
        .with_report_path(&report_path)
        .build();

    let report = assert_ok!(
        harness
            .default_pipeline(config)
            .run(&harness.input, &harness.output)
            .await
    );

    // Reassembly kept the full transcribed span
    assert_eq!(report.transcript, "um hello uh world");
    assert_eq!(report.reassembly.segments, 4);
    assert_eq!(report.reassembly.filler_segments, 2);
    assert!((report.reassembled_duration - 2.4).abs() < 1e-9);

    // Corrected text went to synthesis
    assert_eq!(report.corrected_text, "UM HELLO UH WORLD");
    assert_eq!(*harness.spoken.lock().unwrap(), vec!["UM HELLO UH WORLD".to_string()]);

    // 3.0s of speech fitted to 2.4s
    assert!((report.synthesized_duration - 3.0).abs() < 1e-9);
    assert!((report.speed_ratio - 1.25).abs() < 1e-9);
    assert!((report.final_audio_duration - 2.4).abs() <= 1.0 / 24000.0);

    {
        let log = harness.media_log.lock().unwrap();
        assert_eq!(log.rendered_frames, Some(60));
        assert!((log.rendered_audio_secs.unwrap() - 2.4).abs() <= 1.0 / 24000.0);
    }

    // Output published, intermediates gone
    assert_eq!(std::fs::read_to_string(&harness.output).unwrap(), "frames=60");
    assert!(report.cleanup_failures.is_empty());
    assert!(harness.scratch_is_empty());

    // Cleaned audio is silent over the fillers only
    let cleaned_audio = wav::read_wav(&cleaned).unwrap();
    assert_eq!(cleaned_audio.len(), 38400);
    assert!(cleaned_audio.slice(0.0, 0.5).unwrap().is_silent());
    assert!(cleaned_audio.slice(1.2, 1.6).unwrap().is_silent());
    assert!(!cleaned_audio.slice(0.5, 1.2).unwrap().is_silent());

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
    assert!((json["speed_ratio"].as_f64().unwrap() - 1.25).abs() < 1e-9);
    assert_eq!(json["reassembly"]["filler_segments"], 2);
}

#[tokio::test]
async fn test_correction_disabled_uses_transcript() {
    let harness = Harness::new();
    let config = harness.config().with_correction_enabled(false).build();

    let pipeline = harness.pipeline(
        config,
        FakeMedia::new(harness.media_log.clone()),
        TranscriberMode::Words(scenario_transcript()),
        None,
    );
    let report = assert_ok!(pipeline.run(&harness.input, &harness.output).await);

    assert_eq!(report.corrected_text, report.transcript);
}

#[tokio::test]
async fn test_custom_fillers() {
    let harness = Harness::new();
    let cleaned = harness.dir.path().join("cleaned.wav");
    let config = harness
        .config()
        .with_fillers(filler_dub::dub_core::FillerLexicon::parse_list("hello"))
        .with_cleaned_audio_path(&cleaned)
        .build();

    let report = assert_ok!(
        harness
            .default_pipeline(config)
            .run(&harness.input, &harness.output)
            .await
    );

    assert_eq!(report.reassembly.filler_segments, 1);
    let audio = wav::read_wav(&cleaned).unwrap();
    assert!(!audio.slice(0.0, 0.5).unwrap().is_silent());
    assert!(audio.slice(0.5, 1.2).unwrap().is_silent());
}

#[tokio::test]
async fn test_transcription_failure_names_stage() {
    let harness = Harness::new();
    let pipeline = harness.pipeline(
        harness.config().build(),
        FakeMedia::new(harness.media_log.clone()),
        TranscriberMode::Fail,
        Some(Box::new(UppercaseCorrector)),
    );

    let err = assert_err!(pipeline.run(&harness.input, &harness.output).await);

    assert_eq!(err.stage(), PipelineStage::Transcription);
    match err.cause() {
        StageError::Service(e) => assert_eq!(e.service, "fake-stt"),
        other => panic!("unexpected cause: {other:?}"),
    }
    assert!(!harness.output.exists());
    assert!(harness.scratch_is_empty());
}

#[tokio::test]
async fn test_transcription_timeout_is_unavailable() {
    let harness = Harness::new();
    let pipeline = harness.pipeline(
        harness.config().build(),
        FakeMedia::new(harness.media_log.clone()),
        TranscriberMode::Hang,
        None,
    );

    let err = assert_err!(pipeline.run(&harness.input, &harness.output).await);

    assert_eq!(err.stage(), PipelineStage::Transcription);
    match err.cause() {
        StageError::Service(e) => assert!(e.reason.contains("timed out")),
        other => panic!("unexpected cause: {other:?}"),
    }
    assert!(harness.scratch_is_empty());
}

#[tokio::test]
async fn test_cancel_during_service_call() {
    let harness = Harness::new();
    let cancel = CancelHandle::new();
    let config = harness.config().with_service_timeout(30).build();
    let pipeline = harness
        .pipeline(
            config,
            FakeMedia::new(harness.media_log.clone()),
            TranscriberMode::Hang,
            None,
        )
        .with_cancel_handle(cancel.clone());

    let trigger = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
    });

    let err = assert_err!(pipeline.run(&harness.input, &harness.output).await);
    trigger.await.unwrap();

    assert_eq!(err.stage(), PipelineStage::Transcription);
    match err.cause() {
        StageError::Service(e) => assert_eq!(e.reason, "cancelled"),
        other => panic!("unexpected cause: {other:?}"),
    }
    assert!(harness.scratch_is_empty());
}

#[tokio::test]
async fn test_cancel_before_run() {
    let harness = Harness::new();
    let pipeline = harness.default_pipeline(harness.config().build());
    pipeline.cancel_handle().cancel();

    let err = assert_err!(pipeline.run(&harness.input, &harness.output).await);

    assert_eq!(err.stage(), PipelineStage::AudioExtraction);
    assert!(matches!(err.cause(), StageError::Cancelled));
}

#[tokio::test]
async fn test_empty_transcript_aborts() {
    let harness = Harness::new();
    let pipeline = harness.pipeline(
        harness.config().build(),
        FakeMedia::new(harness.media_log.clone()),
        TranscriberMode::Words(Transcript::default()),
        Some(Box::new(UppercaseCorrector)),
    );

    let err = assert_err!(pipeline.run(&harness.input, &harness.output).await);

    assert_eq!(err.stage(), PipelineStage::Transcription);
    assert!(matches!(
        err.cause(),
        StageError::Core(DubCoreError::EmptyInput(_))
    ));
    assert!(harness.spoken.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_render_failure_exposes_no_output() {
    let harness = Harness::new();
    let mut media = FakeMedia::new(harness.media_log.clone());
    media.fail_render = true;
    let pipeline = harness.pipeline(
        harness.config().build(),
        media,
        TranscriberMode::Words(scenario_transcript()),
        None,
    );

    let err = assert_err!(pipeline.run(&harness.input, &harness.output).await);

    assert_eq!(err.stage(), PipelineStage::Render);
    assert!(!harness.output.exists());
    assert!(harness.scratch_is_empty());
}

#[tokio::test]
async fn test_missing_input() {
    let harness = Harness::new();
    let pipeline = harness.default_pipeline(harness.config().build());

    let err = assert_err!(
        pipeline
            .run(&harness.dir.path().join("missing.mp4"), &harness.output)
            .await
    );

    assert_eq!(err.stage(), PipelineStage::AudioExtraction);
    assert!(harness.scratch_is_empty());
}

#[tokio::test]
async fn test_out_of_range_segment_is_clamped() {
    let harness = Harness::new();
    let transcript = Transcript::new(vec![
        WordSegment::new("hello", 0.0, 1.2),
        WordSegment::new("world", 1.2, 3.0),
    ]);
    let pipeline = harness.pipeline(
        harness.config().build(),
        FakeMedia::new(harness.media_log.clone()),
        TranscriberMode::Words(transcript),
        None,
    );

    let report = assert_ok!(pipeline.run(&harness.input, &harness.output).await);

    assert_eq!(report.reassembly.clamped_segments, 1);
    assert!((report.reassembled_duration - 2.4).abs() < 1e-9);
}
