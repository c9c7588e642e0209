pub mod deepgram;

pub use deepgram::DeepgramTranscriber;

use async_trait::async_trait;
use dub_core::Transcript;

use crate::error::ServiceUnavailable;

/// Speech-to-text service returning word-level timestamps
#[async_trait]
pub trait Transcriber: Send + Sync {
    fn name(&self) -> &str;

    /// Transcribe a WAV body into words ordered by start time
    async fn transcribe(&self, wav: Vec<u8>) -> Result<Transcript, ServiceUnavailable>;
}
