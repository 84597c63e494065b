//! `OpenAI` chat completions provider

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::{ChatProvider, Exchange};
use crate::config::DEFAULT_OPENAI_BASE_URL;
use crate::{Error, Result};

/// Environment variable holding the `OpenAI` credential
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Chat completions over an OpenAI-compatible API
pub struct OpenAiChat {
    client: Client,
    api_key: SecretString,
    base_url: String,
    model: String,
}

impl OpenAiChat {
    /// Create a client, taking the key from `api_key` or `OPENAI_API_KEY`
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingCredential`] if neither source has a key
    pub fn new(api_key: Option<&str>, model: impl Into<String>) -> Result<Self> {
        let api_key = resolve_api_key(api_key, std::env::var(API_KEY_ENV).ok())?;
        let model = model.into();

        tracing::info!(model = %model, "chat client initialized");

        Ok(Self {
            client: Client::new(),
            api_key,
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            model,
        })
    }

    /// Point at a different OpenAI-compatible server
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

/// Pick the explicit key, else the environment value
///
/// # Errors
///
/// Returns [`Error::MissingCredential`] when both are absent or blank
pub fn resolve_api_key(explicit: Option<&str>, from_env: Option<String>) -> Result<SecretString> {
    explicit
        .map(str::to_string)
        .filter(|k| !k.trim().is_empty())
        .or_else(|| from_env.filter(|k| !k.trim().is_empty()))
        .map(SecretString::from)
        .ok_or_else(|| {
            Error::MissingCredential(format!(
                "OpenAI API key not found; set {API_KEY_ENV} or pass it explicitly"
            ))
        })
}

#[async_trait]
impl ChatProvider for OpenAiChat {
    async fn complete(&self, messages: &[Exchange]) -> Result<String> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages,
        };

        tracing::debug!(model = %self.model, messages = messages.len(), "sending chat request");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "chat request failed");
                e
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "chat API error");
            return Err(Error::Chat(format!("OpenAI API error {status}: {body}")));
        }

        let result: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::Chat(format!("failed to parse OpenAI response: {e}")))?;

        result
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Error::Chat("response contained no reply".to_string()))
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Exchange],
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}
