//! TOML configuration file loading
//!
//! Supports `~/.config/lingua/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct LinguaConfigFile {
    /// Default language code (e.g. "pt", "en")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// Conversational model configuration
    #[serde(default)]
    pub chat: ChatFileConfig,

    /// Recording and transcription configuration
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// Speech synthesis configuration
    #[serde(default)]
    pub tts: TtsFileConfig,

    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,
}

/// Conversational model configuration
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ChatFileConfig {
    /// Model identifier (e.g. "gpt-4", "gpt-3.5-turbo")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Base URL of an OpenAI-compatible API
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Standing system instruction
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

/// Recording and transcription configuration
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct VoiceFileConfig {
    /// Transcription model (e.g. "whisper-1")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stt_model: Option<String>,

    /// Recording duration in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recording_duration: Option<u64>,

    /// Capture sample rate in Hz
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<u32>,

    /// Directory for recorded and synthesized clips
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,
}

/// Speech synthesis configuration
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct TtsFileConfig {
    /// Provider ("google" or "openai")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    /// Speak slowly (Google provider only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slow: Option<bool>,

    /// TTS model (OpenAI provider only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Voice identifier (OpenAI provider only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,

    /// Speed multiplier (OpenAI provider only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f32>,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ApiKeysFileConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openai: Option<String>,
}

/// Load the TOML config file from the standard path
///
/// Returns `LinguaConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> LinguaConfigFile {
    let Some(path) = config_file_path() else {
        return LinguaConfigFile::default();
    };

    if !path.exists() {
        return LinguaConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                LinguaConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            LinguaConfigFile::default()
        }
    }
}

/// Write the config file to the standard path, creating parent directories
///
/// # Errors
///
/// Returns error if the path cannot be determined, serialized or written
pub fn save_config_file(config: &LinguaConfigFile) -> crate::Result<PathBuf> {
    let path = config_file_path()
        .ok_or_else(|| crate::Error::Config("could not determine config directory".to_string()))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content = toml::to_string_pretty(config)
        .map_err(|e| crate::Error::Config(format!("failed to serialize config: {e}")))?;
    std::fs::write(&path, content)?;

    Ok(path)
}

/// Return the config file path: `~/.config/lingua/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("lingua").join("config.toml"))
}
