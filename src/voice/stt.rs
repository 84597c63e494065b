//! Speech-to-text (STT) processing

use std::path::Path;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_OPENAI_BASE_URL;
use crate::{Error, Result};

/// Transcribes audio files to text
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe `audio`, biased toward `language` or the configured default
    async fn transcribe(&self, audio: &Path, language: Option<&str>) -> Result<String>;

    /// Transcribe with detected language and per-segment timing
    async fn transcribe_detailed(
        &self,
        audio: &Path,
        language: Option<&str>,
    ) -> Result<Transcription>;

    /// Default language code
    fn language(&self) -> &str;

    /// Change the default language code
    fn set_language(&mut self, language: &str);
}

/// Detailed transcription result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcription {
    /// Full transcript, trimmed
    pub text: String,
    /// Detected (or requested) language
    pub language: String,
    /// Clip duration in seconds, when reported
    pub duration: Option<f64>,
    /// Timed segments in order
    pub segments: Vec<Segment>,
}

/// One timed span of a transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id: u32,
    /// Start offset in seconds
    pub start: f64,
    /// End offset in seconds
    pub end: f64,
    pub text: String,
}

/// Response from the Whisper transcription API (`json` format)
#[derive(Deserialize)]
struct WhisperResponse {
    text: String,
}

/// Response from the Whisper transcription API (`verbose_json` format)
#[derive(Deserialize)]
struct WhisperVerboseResponse {
    text: String,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    segments: Vec<Segment>,
}

/// Transcribes speech through an OpenAI-compatible Whisper endpoint
pub struct WhisperTranscriber {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    language: String,
}

impl WhisperTranscriber {
    /// Create a transcriber bound to one model
    ///
    /// The model is fixed here and reused for every call.
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new(api_key: &str, model: String, language: String) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(Error::MissingCredential(
                "OpenAI API key required for Whisper".to_string(),
            ));
        }

        tracing::debug!(model = %model, language = %language, "transcriber initialized");

        Ok(Self {
            client: reqwest::Client::new(),
            api_key: SecretString::from(api_key.to_string()),
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            model,
            language,
        })
    }

    /// Point at a different OpenAI-compatible server
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Model identifier
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Upload `audio` and return the successful response
    async fn request(
        &self,
        audio: &Path,
        language: &str,
        response_format: &str,
    ) -> Result<reqwest::Response> {
        let bytes = tokio::fs::read(audio).await?;
        let file_name = audio
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.wav")
            .to_string();

        tracing::debug!(
            path = %audio.display(),
            audio_bytes = bytes.len(),
            language,
            "starting Whisper transcription"
        );

        let form = Form::new()
            .part(
                "file",
                Part::bytes(bytes)
                    .file_name(file_name)
                    .mime_str("audio/wav")
                    .map_err(|e| Error::Stt(e.to_string()))?,
            )
            .text("model", self.model.clone())
            .text("language", language.to_string())
            .text("response_format", response_format.to_string());

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Whisper request failed");
                e
            })?;

        let status = response.status();
        tracing::debug!(status = %status, "received response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Whisper API error");
            return Err(Error::Stt(format!("Whisper API error {status}: {body}")));
        }

        Ok(response)
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    async fn transcribe(&self, audio: &Path, language: Option<&str>) -> Result<String> {
        let lang = language.unwrap_or(self.language.as_str());
        let response = self.request(audio, lang, "json").await?;

        let result: WhisperResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse response");
            Error::Stt(format!("malformed Whisper response: {e}"))
        })?;

        let transcript = result.text.trim().to_string();
        tracing::info!(transcript = %transcript, language = lang, "transcription complete");
        Ok(transcript)
    }

    async fn transcribe_detailed(
        &self,
        audio: &Path,
        language: Option<&str>,
    ) -> Result<Transcription> {
        let lang = language.unwrap_or(self.language.as_str());
        let response = self.request(audio, lang, "verbose_json").await?;

        let result: WhisperVerboseResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse verbose response");
            Error::Stt(format!("malformed Whisper response: {e}"))
        })?;

        tracing::info!(
            segments = result.segments.len(),
            detected = ?result.language,
            "detailed transcription complete"
        );

        Ok(Transcription {
            text: result.text.trim().to_string(),
            language: result.language.unwrap_or_else(|| lang.to_string()),
            duration: result.duration,
            segments: result.segments,
        })
    }

    fn language(&self) -> &str {
        &self.language
    }

    fn set_language(&mut self, language: &str) {
        self.language = language.to_string();
    }
}
