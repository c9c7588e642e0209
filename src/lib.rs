/// Filler Dub - silence filler words in a video and re-dub it
///
/// Extracts the speech track, transcribes it with word timestamps, silences
/// filler words segment by segment, then replaces the audio with a corrected
/// synthetic voice stretched to the exact length of the reassembled video.

pub mod audio;
pub mod config;
pub mod error;
pub mod llm;
pub mod media;
pub mod processing;
pub mod scratch;
pub mod speech;
pub mod transcription;
pub mod video;
pub mod wav;

// Re-export main types for easy access
pub use crate::audio::{AudioExtractor, AudioInfo};
pub use crate::config::{Config, ConfigBuilder};
pub use crate::error::{
    CleanupError, PipelineError, PipelineResult, PipelineStage, ServiceUnavailable, StageError,
};
pub use crate::llm::{GrammarCorrector, LLMConfig, LLMProvider, TextCorrector};
pub use crate::media::{FfmpegMedia, MediaBackend};
pub use crate::processing::{CancelHandle, DubPipeline, PipelineReport};
pub use crate::scratch::ScratchSpace;
pub use crate::speech::{DeepgramSpeech, SpeechSynthesizer};
pub use crate::transcription::{DeepgramTranscriber, Transcriber};
pub use crate::video::{VideoInfo, VideoProcessor};

pub use dub_core;
