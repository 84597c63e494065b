//! Configuration management for Lingua
//!
//! Values resolve with priority env → TOML file → built-in default.

pub mod file;

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::voice::TtsProvider;
use crate::{Error, Result};

use file::LinguaConfigFile;

/// Default language code
pub const DEFAULT_LANGUAGE: &str = "pt";

/// Default conversational model
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4";

/// Default transcription model
pub const DEFAULT_STT_MODEL: &str = "whisper-1";

/// Default OpenAI-compatible API base URL
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Lingua configuration
#[derive(Debug)]
pub struct Config {
    /// Session language code (ISO 639-1, e.g. "pt")
    pub language: String,

    /// Conversational model configuration
    pub chat: ChatConfig,

    /// Recording and transcription configuration
    pub voice: VoiceConfig,

    /// Speech synthesis configuration
    pub tts: TtsConfig,

    /// API keys
    pub api_keys: ApiKeys,
}

/// Conversational model configuration
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Model identifier for chat completions
    pub model: String,

    /// Base URL of the OpenAI-compatible API
    pub base_url: String,

    /// Standing system instruction installed at startup
    pub system_prompt: Option<String>,
}

/// Recording and transcription configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Transcription model (e.g. "whisper-1")
    pub stt_model: String,

    /// Recording duration in seconds
    pub recording_duration_secs: u64,

    /// Capture sample rate in Hz
    pub sample_rate: u32,

    /// Directory for recorded and synthesized clips
    pub output_dir: PathBuf,
}

impl VoiceConfig {
    /// Recording duration as a [`Duration`]
    #[must_use]
    pub const fn recording_duration(&self) -> Duration {
        Duration::from_secs(self.recording_duration_secs)
    }
}

/// Speech synthesis configuration
#[derive(Debug, Clone)]
pub struct TtsConfig {
    /// Synthesis backend
    pub provider: TtsProvider,

    /// Slow speech (Google only)
    pub slow: bool,

    /// TTS model (`OpenAI` only)
    pub model: String,

    /// Voice identifier (`OpenAI` only)
    pub voice: String,

    /// Speed multiplier, 0.25 to 4.0 (`OpenAI` only)
    pub speed: f32,
}

/// API keys for external services
#[derive(Debug, Default)]
pub struct ApiKeys {
    /// `OpenAI` API key (chat, Whisper and optional TTS)
    pub openai: Option<SecretString>,
}

impl Config {
    /// Load configuration from the environment and the TOML config file
    ///
    /// # Errors
    ///
    /// Returns error if a value is present but invalid
    pub fn load() -> Result<Self> {
        let fc = file::load_config_file();
        Self::from_sources(fc, |key| std::env::var(key).ok())
    }

    /// Resolve configuration from a parsed file and an environment lookup
    ///
    /// # Errors
    ///
    /// Returns error if a value is present but invalid
    pub fn from_sources<F>(fc: LinguaConfigFile, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let language = env("DEFAULT_LANGUAGE")
            .or(fc.language)
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());

        let chat = ChatConfig {
            model: env("DEFAULT_MODEL")
                .or(fc.chat.model)
                .unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
            base_url: env("OPENAI_BASE_URL")
                .or(fc.chat.base_url)
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            system_prompt: env("LINGUA_SYSTEM_PROMPT").or(fc.chat.system_prompt),
        };

        let recording_duration_secs = match env("RECORDING_DURATION") {
            Some(raw) => parse_env("RECORDING_DURATION", &raw)?,
            None => fc.voice.recording_duration.unwrap_or(5),
        };
        if recording_duration_secs == 0 {
            return Err(Error::Config(
                "recording duration must be at least one second".to_string(),
            ));
        }

        let sample_rate = match env("LINGUA_SAMPLE_RATE") {
            Some(raw) => parse_env("LINGUA_SAMPLE_RATE", &raw)?,
            None => fc
                .voice
                .sample_rate
                .unwrap_or(crate::voice::DEFAULT_SAMPLE_RATE),
        };
        if sample_rate == 0 {
            return Err(Error::Config("sample rate must be non-zero".to_string()));
        }

        let voice = VoiceConfig {
            stt_model: env("WHISPER_MODEL")
                .or(fc.voice.stt_model)
                .unwrap_or_else(|| DEFAULT_STT_MODEL.to_string()),
            recording_duration_secs,
            sample_rate,
            output_dir: env("LINGUA_OUTPUT_DIR")
                .or(fc.voice.output_dir)
                .map_or_else(|| PathBuf::from("output"), PathBuf::from),
        };

        let provider = env("LINGUA_TTS_PROVIDER")
            .or(fc.tts.provider)
            .map(|p| p.parse::<TtsProvider>())
            .transpose()?
            .unwrap_or_default();

        let tts = TtsConfig {
            provider,
            slow: fc.tts.slow.unwrap_or(false),
            model: env("LINGUA_TTS_MODEL")
                .or(fc.tts.model)
                .unwrap_or_else(|| "tts-1".to_string()),
            voice: env("LINGUA_TTS_VOICE")
                .or(fc.tts.voice)
                .unwrap_or_else(|| "alloy".to_string()),
            speed: fc.tts.speed.unwrap_or(1.0),
        };

        let api_keys = ApiKeys {
            openai: env("OPENAI_API_KEY")
                .or(fc.api_keys.openai)
                .map(SecretString::from),
        };

        Ok(Self {
            language,
            chat,
            voice,
            tts,
            api_keys,
        })
    }

    /// The `OpenAI` key, required by every remote stage except Google TTS
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingCredential`] if no key is configured
    pub fn openai_key(&self) -> Result<&SecretString> {
        self.api_keys.openai.as_ref().ok_or_else(|| {
            Error::MissingCredential(
                "OpenAI API key not found; set OPENAI_API_KEY or run `lingua setup`".to_string(),
            )
        })
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| Error::Config(format!("invalid value for {key}: {raw:?}")))
}
