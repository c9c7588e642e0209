use super::{create_llm, ChatMessage, LLMConfig, LLM};
use crate::error::ServiceUnavailable;
use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, info};

/// Placeholder replaced by the transcript text
pub const TRANSCRIPT_PLACEHOLDER: &str = "{transcript}";

pub const DEFAULT_CORRECTION_PROMPT: &str = "Please correct any grammatical mistakes in the following text and don't write anything else except the corrected text: {transcript}";

/// Text-correction service
#[async_trait]
pub trait TextCorrector: Send + Sync {
    fn name(&self) -> &str;

    async fn correct(&self, text: &str) -> std::result::Result<String, ServiceUnavailable>;
}

/// Grammar correction backed by a chat-completion LLM
pub struct GrammarCorrector {
    llm: Box<dyn LLM>,
    prompt_template: String,
}

impl GrammarCorrector {
    pub fn new(config: &LLMConfig, prompt_template: impl Into<String>) -> Result<Self> {
        let llm = create_llm(config)?;
        info!("✅ Grammar corrector initialized with {:?} provider", config.provider);
        Ok(Self::with_llm(llm, prompt_template))
    }

    /// Use an already constructed LLM
    pub fn with_llm(llm: Box<dyn LLM>, prompt_template: impl Into<String>) -> Self {
        Self {
            llm,
            prompt_template: prompt_template.into(),
        }
    }

    /// Fill the prompt template; a template without the placeholder gets the
    /// text appended after a blank line
    pub fn build_prompt(&self, text: &str) -> String {
        if self.prompt_template.contains(TRANSCRIPT_PLACEHOLDER) {
            self.prompt_template.replace(TRANSCRIPT_PLACEHOLDER, text)
        } else {
            format!("{}\n\n{}", self.prompt_template, text)
        }
    }
}

#[async_trait]
impl TextCorrector for GrammarCorrector {
    fn name(&self) -> &str {
        "correction"
    }

    async fn correct(&self, text: &str) -> std::result::Result<String, ServiceUnavailable> {
        debug!("Correcting transcript ({} chars)", text.len());

        let messages = vec![ChatMessage::user(self.build_prompt(text))];
        let response = self
            .llm
            .chat(messages)
            .await
            .map_err(|e| ServiceUnavailable::new(self.name(), format!("{:#}", e)))?;

        debug!("LLM correction completed (tokens: {:?})", response.tokens_used);

        let corrected = response.content.trim();
        if corrected.is_empty() {
            return Err(ServiceUnavailable::new(self.name(), "model returned an empty reply"));
        }

        Ok(corrected.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LLMProvider, LLMResponse};

    struct CannedLLM {
        reply: Result<String, String>,
    }

    impl CannedLLM {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
            }
        }
    }

    #[async_trait]
    impl LLM for CannedLLM {
        async fn chat(&self, messages: Vec<ChatMessage>) -> Result<LLMResponse> {
            assert_eq!(messages.len(), 1);
            match &self.reply {
                Ok(content) => Ok(LLMResponse {
                    content: content.clone(),
                    tokens_used: Some(10),
                }),
                Err(e) => Err(anyhow::anyhow!(e.clone())),
            }
        }

        fn provider_type(&self) -> LLMProvider {
            LLMProvider::LMStudio
        }
    }

    #[test]
    fn test_default_prompt() {
        let corrector = GrammarCorrector::with_llm(
            Box::new(CannedLLM::replying("")),
            DEFAULT_CORRECTION_PROMPT,
        );
        assert_eq!(
            corrector.build_prompt("me and him goes"),
            "Please correct any grammatical mistakes in the following text and don't write anything else except the corrected text: me and him goes"
        );
    }

    #[test]
    fn test_prompt_without_placeholder() {
        let corrector = GrammarCorrector::with_llm(Box::new(CannedLLM::replying("")), "Fix this:");
        assert_eq!(corrector.build_prompt("text"), "Fix this:\n\ntext");
    }

    #[tokio::test]
    async fn test_correct_trims_reply() {
        let corrector = GrammarCorrector::with_llm(
            Box::new(CannedLLM::replying("  He and I go.\n")),
            DEFAULT_CORRECTION_PROMPT,
        );
        assert_eq!(corrector.correct("me and him goes").await.unwrap(), "He and I go.");
    }

    #[tokio::test]
    async fn test_empty_reply_is_unavailable() {
        let corrector = GrammarCorrector::with_llm(
            Box::new(CannedLLM::replying("   ")),
            DEFAULT_CORRECTION_PROMPT,
        );
        let err = corrector.correct("text").await.unwrap_err();
        assert_eq!(err.service, "correction");
    }

    #[tokio::test]
    async fn test_llm_error_is_unavailable() {
        let llm = CannedLLM {
            reply: Err("OpenAI API error 500".to_string()),
        };
        let corrector = GrammarCorrector::with_llm(Box::new(llm), DEFAULT_CORRECTION_PROMPT);

        let err = corrector.correct("text").await.unwrap_err();
        assert!(err.reason.contains("500"));
    }
}
