use super::{ChatMessage, LLM, LLMConfig, LLMProvider, LLMResponse};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

/// OpenAI-compatible chat completion request
#[derive(Debug, Serialize)]
struct ChatRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<String>,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    total_tokens: u32,
}

fn build_client(config: &LLMConfig) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .build()?)
}

/// Send a chat request and extract the first choice
async fn send_chat(
    name: &str,
    request: reqwest::RequestBuilder,
    body: &ChatRequest,
) -> Result<LLMResponse> {
    let response = request.json(body).send().await?;

    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        return Err(anyhow!("{} API error {}: {}", name, status, text));
    }

    let chat_response: ChatResponse = response.json().await?;
    parse_chat_response(name, chat_response)
}

fn parse_chat_response(name: &str, chat_response: ChatResponse) -> Result<LLMResponse> {
    let content = chat_response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("No response from {}", name))?
        .message
        .content;

    Ok(LLMResponse {
        content,
        tokens_used: chat_response.usage.map(|u| u.total_tokens),
    })
}

/// LMStudio provider implementation
pub struct LMStudioProvider {
    config: LLMConfig,
    client: reqwest::Client,
}

impl LMStudioProvider {
    pub fn new(config: LLMConfig) -> Result<Self> {
        if config.endpoint.is_none() {
            return Err(anyhow!("LMStudio endpoint required"));
        }
        let client = build_client(&config)?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl LLM for LMStudioProvider {
    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<LLMResponse> {
        let endpoint = self
            .config
            .endpoint
            .as_ref()
            .ok_or_else(|| anyhow!("LMStudio endpoint not configured"))?;

        let request = ChatRequest {
            model: Some(self.config.model.clone()),
            messages,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        debug!("Sending request to LMStudio at {}", endpoint);
        send_chat("LMStudio", self.client.post(endpoint), &request).await
    }

    fn provider_type(&self) -> LLMProvider {
        LLMProvider::LMStudio
    }
}

/// OpenAI provider implementation
pub struct OpenAIProvider {
    config: LLMConfig,
    client: reqwest::Client,
}

impl OpenAIProvider {
    pub fn new(config: LLMConfig) -> Result<Self> {
        if config.api_key.is_none() {
            return Err(anyhow!("OpenAI API key required"));
        }
        let client = build_client(&config)?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl LLM for OpenAIProvider {
    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<LLMResponse> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| anyhow!("OpenAI API key not configured"))?;

        let request = ChatRequest {
            model: Some(self.config.model.clone()),
            messages,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let url = self.config.endpoint.as_deref().unwrap_or(OPENAI_CHAT_URL);

        debug!("Sending request to OpenAI API");
        let builder = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", api_key));
        send_chat("OpenAI", builder, &request).await
    }

    fn provider_type(&self) -> LLMProvider {
        LLMProvider::OpenAI
    }
}

/// Azure OpenAI deployment.
///
/// The endpoint is the full deployment URL, e.g.
/// `https://<resource>.openai.azure.com/openai/deployments/gpt-4o/chat/completions?api-version=2024-08-01-preview`.
pub struct AzureOpenAIProvider {
    config: LLMConfig,
    client: reqwest::Client,
}

impl AzureOpenAIProvider {
    pub fn new(config: LLMConfig) -> Result<Self> {
        if config.api_key.is_none() {
            return Err(anyhow!("Azure OpenAI API key required"));
        }
        if config.endpoint.is_none() {
            return Err(anyhow!("Azure OpenAI deployment endpoint required"));
        }
        let client = build_client(&config)?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl LLM for AzureOpenAIProvider {
    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<LLMResponse> {
        let (endpoint, api_key) = match (&self.config.endpoint, &self.config.api_key) {
            (Some(endpoint), Some(api_key)) => (endpoint, api_key),
            _ => return Err(anyhow!("Azure OpenAI endpoint or key not configured")),
        };

        // The deployment in the URL selects the model
        let request = ChatRequest {
            model: None,
            messages,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        debug!("Sending request to Azure OpenAI deployment");
        let builder = self.client.post(endpoint).header("api-key", api_key);
        send_chat("Azure OpenAI", builder, &request).await
    }

    fn provider_type(&self) -> LLMProvider {
        LLMProvider::AzureOpenAI
    }
}
