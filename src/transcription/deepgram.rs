use anyhow::{anyhow, Result};
use async_trait::async_trait;
use dub_core::{Transcript, WordSegment};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use super::Transcriber;
use crate::config::TranscriptionConfig;
use crate::error::ServiceUnavailable;

const SERVICE: &str = "transcription";

/// Deepgram pre-recorded transcription
pub struct DeepgramTranscriber {
    config: TranscriptionConfig,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ListenResponse {
    results: ListenResults,
}

#[derive(Debug, Deserialize)]
struct ListenResults {
    channels: Vec<ListenChannel>,
}

#[derive(Debug, Deserialize)]
struct ListenChannel {
    alternatives: Vec<ListenAlternative>,
}

#[derive(Debug, Deserialize)]
struct ListenAlternative {
    #[serde(default)]
    words: Vec<WordSegment>,
}

impl DeepgramTranscriber {
    pub fn new(config: TranscriptionConfig) -> Result<Self> {
        if config.api_key.is_none() {
            return Err(anyhow!("Deepgram API key required for transcription"));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self { config, client })
    }

    fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("model", self.config.model.clone()),
            ("smart_format", self.config.smart_format.to_string()),
        ];
        match &self.config.language {
            Some(language) => query.push(("language", language.clone())),
            None => query.push(("detect_language", "true".to_string())),
        }
        query
    }

    async fn request(&self, wav: Vec<u8>) -> Result<Transcript> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| anyhow!("Deepgram API key not configured"))?;

        debug!("Sending {} bytes to {}", wav.len(), self.config.endpoint);

        let response = self
            .client
            .post(&self.config.endpoint)
            .query(&self.query())
            .header("Authorization", format!("Token {}", api_key))
            .header("Content-Type", "audio/wav")
            .body(wav)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Deepgram API error {}: {}", status, text));
        }

        let body = response.bytes().await?;
        parse_listen_response(&body)
    }
}

/// Words of the first alternative of the first channel
fn parse_listen_response(body: &[u8]) -> Result<Transcript> {
    let response: ListenResponse = serde_json::from_slice(body)?;

    let words = response
        .results
        .channels
        .into_iter()
        .next()
        .and_then(|channel| channel.alternatives.into_iter().next())
        .map(|alternative| alternative.words)
        .ok_or_else(|| anyhow!("Deepgram response has no channels or alternatives"))?;

    Ok(Transcript::new(words))
}

#[async_trait]
impl Transcriber for DeepgramTranscriber {
    fn name(&self) -> &str {
        SERVICE
    }

    async fn transcribe(&self, wav: Vec<u8>) -> std::result::Result<Transcript, ServiceUnavailable> {
        let transcript = self
            .request(wav)
            .await
            .map_err(|e| ServiceUnavailable::new(SERVICE, format!("{:#}", e)))?;

        info!("📝 Transcribed {} words", transcript.len());
        Ok(transcript)
    }
}
