use anyhow::{anyhow, Context, Result};
use dub_core::FillerLexicon;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::llm::{LLMConfig, LLMProvider, DEFAULT_CORRECTION_PROMPT};

/// Files searched by [`Config::load`], in order
pub const CONFIG_PATHS: [&str; 2] = ["filler-dub.toml", "config/filler-dub.toml"];

/// Configuration for the filler-dub pipeline
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Audio extraction settings
    pub audio: AudioConfig,

    /// Speech-to-text service settings
    pub transcription: TranscriptionConfig,

    /// Grammar correction settings
    pub correction: CorrectionConfig,

    /// Text-to-speech service settings
    pub speech: SpeechConfig,

    /// Filler words to silence
    pub fillers: FillerConfig,

    /// Output files and encoding
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Sample rate of the extracted mono track
    pub sample_rate: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    /// Pre-recorded transcription endpoint
    pub endpoint: String,

    pub api_key: Option<String>,

    pub model: String,

    pub smart_format: bool,

    /// Language hint; auto-detected when unset
    pub language: Option<String>,

    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrectionConfig {
    /// When false the raw transcript is synthesized as-is
    pub enabled: bool,

    /// Prompt template; `{transcript}` is replaced by the transcript text
    pub prompt: String,

    pub llm: LLMConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Text-to-speech endpoint
    pub endpoint: String,

    pub api_key: Option<String>,

    /// Voice model
    pub model: String,

    pub encoding: String,

    pub container: String,

    /// Output sample rate; service default when unset
    pub sample_rate: Option<u32>,

    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FillerConfig {
    /// Case-sensitive tokens silenced in the cleaned audio
    pub words: FillerLexicon,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Final video path
    pub output_path: PathBuf,

    /// Save the filler-silenced audio here as WAV
    pub cleaned_audio_path: Option<PathBuf>,

    /// Write a JSON run report here
    pub report_path: Option<PathBuf>,

    pub video_codec: String,

    pub audio_codec: String,

    /// Log level
    pub log_level: String,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self { sample_rate: 16000 }
    }
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.deepgram.com/v1/listen".to_string(),
            api_key: None,
            model: "nova-2".to_string(),
            smart_format: true,
            language: None,
            timeout_seconds: 300,
        }
    }
}

impl Default for CorrectionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            prompt: DEFAULT_CORRECTION_PROMPT.to_string(),
            llm: LLMConfig::default(),
        }
    }
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.deepgram.com/v1/speak".to_string(),
            api_key: None,
            model: "aura-helios-en".to_string(),
            encoding: "linear16".to_string(),
            container: "wav".to_string(),
            sample_rate: None,
            timeout_seconds: 120,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("final_output_video.mp4"),
            cleaned_audio_path: None,
            report_path: None,
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load the first configuration file found in [`CONFIG_PATHS`], falling
    /// back to defaults. Environment overrides are applied either way.
    pub fn load() -> Result<Self> {
        for path in CONFIG_PATHS {
            if Path::new(path).exists() {
                return Self::load_from(path);
            }
        }

        Ok(Self::from_env())
    }

    /// Load an explicit configuration file, then apply environment overrides
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: Config = toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        config.apply_env();
        Ok(config)
    }

    /// Defaults with environment overrides
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    fn apply_env(&mut self) {
        if let Ok(api_key) = std::env::var("DG_API_KEY") {
            self.transcription.api_key = Some(api_key.clone());
            self.speech.api_key = Some(api_key);
        }

        if let Ok(api_key) = std::env::var("OPENAI_API_KEY") {
            self.correction.llm.api_key = Some(api_key);
        }

        if let Ok(sample_rate) = std::env::var("FILLER_DUB_SAMPLE_RATE") {
            if let Ok(sample_rate) = sample_rate.parse() {
                self.audio.sample_rate = sample_rate;
            }
        }

        if let Ok(fillers) = std::env::var("FILLER_DUB_FILLERS") {
            self.fillers.words = FillerLexicon::parse_list(&fillers);
        }

        if let Ok(log_level) = std::env::var("FILLER_DUB_LOG_LEVEL") {
            self.output.log_level = log_level;
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let config_str = toml::to_string_pretty(self)?;
        std::fs::write(path, config_str)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        tracing::info!("💾 Configuration saved to: {}", path.display());
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.audio.sample_rate == 0 {
            return Err(anyhow!("audio.sample_rate must be greater than 0"));
        }

        if self.fillers.words.tokens().any(|t| t.trim().is_empty()) {
            return Err(anyhow!("fillers.words must not contain empty entries"));
        }

        if self.transcription.timeout_seconds == 0 || self.speech.timeout_seconds == 0 {
            return Err(anyhow!("service timeouts must be greater than 0"));
        }

        if self.transcription.api_key.is_none() {
            return Err(anyhow!("Transcription API key required (set DG_API_KEY)"));
        }

        if self.speech.api_key.is_none() {
            return Err(anyhow!("Speech API key required (set DG_API_KEY)"));
        }

        if self.correction.enabled {
            let llm = &self.correction.llm;
            if llm.timeout_seconds == 0 {
                return Err(anyhow!("correction.llm.timeout_seconds must be greater than 0"));
            }
            if llm.requires_api_key() && llm.api_key.is_none() {
                return Err(anyhow!(
                    "API key required for {:?} correction provider (set OPENAI_API_KEY)",
                    llm.provider
                ));
            }
            if llm.requires_endpoint() && llm.endpoint.is_none() {
                return Err(anyhow!(
                    "Endpoint required for {:?} correction provider",
                    llm.provider
                ));
            }
        }

        tracing::info!("✅ Configuration validation passed");
        Ok(())
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "Filler Dub Configuration:\n\
            - Audio Sample Rate: {}Hz\n\
            - Transcription Model: {}\n\
            - Correction: {}\n\
            - Speech Model: {}\n\
            - Fillers: {}\n\
            - Output: {}",
            self.audio.sample_rate,
            self.transcription.model,
            if self.correction.enabled {
                format!("{:?} ({})", self.correction.llm.provider, self.correction.llm.model)
            } else {
                "disabled".to_string()
            },
            self.speech.model,
            self.fillers.words.tokens().collect::<Vec<_>>().join(", "),
            self.output.output_path.display(),
        )
    }
}

/// Programmatic construction of a [`Config`]
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.config.audio.sample_rate = sample_rate;
        self
    }

    pub fn with_fillers(mut self, fillers: FillerLexicon) -> Self {
        self.config.fillers.words = fillers;
        self
    }

    /// Key used for both transcription and speech synthesis
    pub fn with_deepgram_key(mut self, api_key: impl Into<String>) -> Self {
        let api_key = api_key.into();
        self.config.transcription.api_key = Some(api_key.clone());
        self.config.speech.api_key = Some(api_key);
        self
    }

    pub fn with_correction_llm(mut self, llm: LLMConfig) -> Self {
        self.config.correction.llm = llm;
        self
    }

    pub fn with_correction_provider(mut self, provider: LLMProvider) -> Self {
        self.config.correction.llm.provider = provider;
        self
    }

    pub fn with_correction_key(mut self, api_key: impl Into<String>) -> Self {
        self.config.correction.llm.api_key = Some(api_key.into());
        self
    }

    pub fn with_correction_enabled(mut self, enabled: bool) -> Self {
        self.config.correction.enabled = enabled;
        self
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.correction.prompt = prompt.into();
        self
    }

    /// Same timeout for every external service
    pub fn with_service_timeout(mut self, timeout_seconds: u64) -> Self {
        self.config.transcription.timeout_seconds = timeout_seconds;
        self.config.speech.timeout_seconds = timeout_seconds;
        self.config.correction.llm.timeout_seconds = timeout_seconds;
        self
    }

    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output.output_path = path.into();
        self
    }

    pub fn with_cleaned_audio_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output.cleaned_audio_path = Some(path.into());
        self
    }

    pub fn with_report_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output.report_path = Some(path.into());
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.audio.sample_rate, 16000);
        assert_eq!(config.transcription.model, "nova-2");
        assert!(config.transcription.smart_format);
        assert_eq!(config.speech.model, "aura-helios-en");
        assert_eq!(config.speech.encoding, "linear16");
        assert_eq!(config.fillers.words.len(), 4);
        assert!(config.fillers.words.contains("umm"));
        assert_eq!(config.output.output_path, PathBuf::from("final_output_video.mp4"));
        assert_eq!(config.output.video_codec, "libx264");
        assert_eq!(config.output.audio_codec, "aac");
    }

    #[test]
    fn test_validate_requires_keys() {
        assert!(Config::default().validate().is_err());

        let config = ConfigBuilder::new()
            .with_deepgram_key("dg")
            .with_correction_key("sk")
            .build();
        assert!(config.validate().is_ok());

        let without_correction = ConfigBuilder::new()
            .with_deepgram_key("dg")
            .with_correction_enabled(false)
            .build();
        assert!(without_correction.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let base = ConfigBuilder::new().with_deepgram_key("dg").with_correction_key("sk");

        assert!(base.clone().with_sample_rate(0).build().validate().is_err());
        assert!(base.clone().with_service_timeout(0).build().validate().is_err());
        assert!(base
            .clone()
            .with_fillers(FillerLexicon::from_tokens(["um", " "]))
            .build()
            .validate()
            .is_err());
        assert!(base
            .with_correction_provider(LLMProvider::AzureOpenAI)
            .build()
            .validate()
            .is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [fillers]
            words = ["euh", "ben"]

            [correction.llm]
            provider = "LMStudio"
            endpoint = "http://localhost:1234/v1/chat/completions"
            "#,
        )
        .unwrap();

        assert_eq!(config.fillers.words.len(), 2);
        assert!(config.fillers.words.contains("euh"));
        assert_eq!(config.correction.llm.provider, LLMProvider::LMStudio);
        assert_eq!(config.correction.llm.temperature, 0.5);
        assert_eq!(config.audio.sample_rate, 16000);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("filler-dub.toml");

        let config = ConfigBuilder::new()
            .with_sample_rate(22050)
            .with_report_path("report.json")
            .build();
        config.save(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.audio.sample_rate, 22050);
        assert_eq!(loaded.output.report_path, Some(PathBuf::from("report.json")));
    }

    #[test]
    fn test_sample_config_matches_defaults() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/filler-dub.toml");
        let config: Config = toml::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        let defaults = Config::default();

        assert_eq!(config.fillers.words, defaults.fillers.words);
        assert_eq!(config.correction.prompt, defaults.correction.prompt);
        assert_eq!(config.correction.llm.provider, LLMProvider::OpenAI);
        assert_eq!(config.speech.model, defaults.speech.model);
        assert_eq!(config.transcription.endpoint, defaults.transcription.endpoint);
    }

    #[test]
    fn test_load_from_missing_file() {
        let err = Config::load_from("/nonexistent/filler-dub.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
