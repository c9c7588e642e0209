use dub_core::DubCoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Pipeline stages in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineStage {
    Setup,
    AudioExtraction,
    Transcription,
    Correction,
    Reassembly,
    Synthesis,
    Resync,
    Render,
    Report,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Setup => "setup",
            PipelineStage::AudioExtraction => "audio extraction",
            PipelineStage::Transcription => "transcription",
            PipelineStage::Correction => "correction",
            PipelineStage::Reassembly => "reassembly",
            PipelineStage::Synthesis => "speech synthesis",
            PipelineStage::Resync => "resync",
            PipelineStage::Render => "render",
            PipelineStage::Report => "report",
        };
        f.write_str(name)
    }
}

/// An external collaborator failed, timed out or was cancelled
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("{service} unavailable: {reason}")]
pub struct ServiceUnavailable {
    pub service: String,
    pub reason: String,
}

impl ServiceUnavailable {
    pub fn new(service: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self {
            service: service.into(),
            reason: reason.to_string(),
        }
    }
}

/// Best-effort deletion of an intermediate file failed
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("failed to remove {}: {message}", path.display())]
pub struct CleanupError {
    pub path: PathBuf,
    pub message: String,
}

/// Underlying cause of a failed stage
#[derive(thiserror::Error, Debug)]
pub enum StageError {
    #[error(transparent)]
    Core(#[from] DubCoreError),

    #[error(transparent)]
    Service(#[from] ServiceUnavailable),

    #[error("run cancelled")]
    Cancelled,

    #[error(transparent)]
    Media(#[from] anyhow::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error returned by a pipeline run
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("{stage} stage failed: {source}")]
    StageFailed {
        stage: PipelineStage,
        #[source]
        source: StageError,
    },
}

impl PipelineError {
    pub fn stage_failed(stage: PipelineStage, source: impl Into<StageError>) -> Self {
        PipelineError::StageFailed {
            stage,
            source: source.into(),
        }
    }

    /// The stage that aborted the run
    pub fn stage(&self) -> PipelineStage {
        match self {
            PipelineError::StageFailed { stage, .. } => *stage,
        }
    }

    pub fn cause(&self) -> &StageError {
        match self {
            PipelineError::StageFailed { source, .. } => source,
        }
    }
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_failed_display() {
        let err = PipelineError::stage_failed(
            PipelineStage::Transcription,
            ServiceUnavailable::new("deepgram", "HTTP 503"),
        );

        assert_eq!(err.stage(), PipelineStage::Transcription);
        assert_eq!(
            err.to_string(),
            "transcription stage failed: deepgram unavailable: HTTP 503"
        );
    }

    #[test]
    fn test_core_errors_convert() {
        let err = PipelineError::stage_failed(
            PipelineStage::Reassembly,
            DubCoreError::EmptyInput("transcript has no segments".to_string()),
        );

        assert!(matches!(err.cause(), StageError::Core(DubCoreError::EmptyInput(_))));
    }

    #[test]
    fn test_cleanup_error_display() {
        let err = CleanupError {
            path: PathBuf::from("/tmp/x.wav"),
            message: "permission denied".to_string(),
        };
        assert_eq!(err.to_string(), "failed to remove /tmp/x.wav: permission denied");
    }
}
