use anyhow::{anyhow, Result};
use async_trait::async_trait;
use dub_core::AudioTrack;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::SpeechConfig;
use crate::error::ServiceUnavailable;
use crate::wav;

const SERVICE: &str = "speech synthesis";

/// Text-to-speech service
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    fn name(&self) -> &str;

    async fn synthesize(&self, text: &str) -> std::result::Result<AudioTrack, ServiceUnavailable>;
}

/// Deepgram Aura text-to-speech
pub struct DeepgramSpeech {
    config: SpeechConfig,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct SpeakRequest<'a> {
    text: &'a str,
}

impl DeepgramSpeech {
    pub fn new(config: SpeechConfig) -> Result<Self> {
        if config.api_key.is_none() {
            return Err(anyhow!("Deepgram API key required for speech synthesis"));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self { config, client })
    }

    fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("model", self.config.model.clone()),
            ("encoding", self.config.encoding.clone()),
            ("container", self.config.container.clone()),
        ];
        if let Some(rate) = self.config.sample_rate {
            query.push(("sample_rate", rate.to_string()));
        }
        query
    }

    async fn request(&self, text: &str) -> Result<AudioTrack> {
        if text.trim().is_empty() {
            return Err(anyhow!("Nothing to synthesize: text is empty"));
        }

        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| anyhow!("Deepgram API key not configured"))?;

        debug!("Synthesizing {} chars with {}", text.len(), self.config.model);

        let response = self
            .client
            .post(&self.config.endpoint)
            .query(&self.query())
            .header("Authorization", format!("Token {}", api_key))
            .json(&SpeakRequest { text })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Deepgram API error {}: {}", status, body));
        }

        let body = response.bytes().await?;
        wav::decode_wav_bytes(&body)
    }
}

#[async_trait]
impl SpeechSynthesizer for DeepgramSpeech {
    fn name(&self) -> &str {
        SERVICE
    }

    async fn synthesize(&self, text: &str) -> std::result::Result<AudioTrack, ServiceUnavailable> {
        let track = self
            .request(text)
            .await
            .map_err(|e| ServiceUnavailable::new(SERVICE, format!("{:#}", e)))?;

        info!(
            "🗣️ Synthesized {:.2}s of speech at {}Hz",
            track.duration(),
            track.sample_rate()
        );
        Ok(track)
    }
}
