//! Text-to-speech (TTS) processing

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use super::playback;
use super::wav::{decode_mp3, write_wav};
use crate::config::DEFAULT_OPENAI_BASE_URL;
use crate::{Error, Result};

/// Google Translate TTS endpoint
const GOOGLE_TTS_URL: &str = "https://translate.google.com/translate_tts";

/// Longest text the Google endpoint accepts in one request
pub const MAX_CHUNK_CHARS: usize = 100;

/// Preferred chunk boundaries, checked before whitespace
const SENTENCE_BREAKS: &[char] = &['.', '!', '?', ';', ':', ',', '。', '！', '？', '，', '、'];

/// Languages the Google endpoint can voice
const GOOGLE_LANGUAGES: &[&str] = &[
    "af", "ar", "bg", "bn", "bs", "ca", "cs", "cy", "da", "de", "el", "en", "eo", "es", "et",
    "fi", "fr", "gu", "hi", "hr", "hu", "hy", "id", "is", "it", "iw", "ja", "jw", "km", "kn",
    "ko", "la", "lv", "mk", "ml", "mr", "ms", "my", "ne", "nl", "no", "pl", "pt", "ro", "ru",
    "si", "sk", "sq", "sr", "su", "sv", "sw", "ta", "te", "th", "tl", "tr", "uk", "ur", "vi",
    "zh-CN", "zh-TW",
];

/// Synthesizes speech from text into audio files
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Render `text` as WAV at `output` in `language` or the configured default
    ///
    /// With `autoplay`, the file is also played; playback problems are logged,
    /// never returned. Returns the path that was written.
    async fn synthesize(
        &self,
        text: &str,
        output: &Path,
        language: Option<&str>,
        autoplay: bool,
    ) -> Result<PathBuf>;

    /// Default language code
    fn language(&self) -> &str;

    /// Change the default language code
    fn set_language(&mut self, language: &str);
}

/// TTS provider backend
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TtsProvider {
    /// Google Translate voices, language-tagged, no key needed
    #[default]
    Google,
    /// `OpenAI` speech API
    OpenAi,
}

impl FromStr for TtsProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "google" | "gtts" => Ok(Self::Google),
            "openai" => Ok(Self::OpenAi),
            other => Err(Error::Config(format!("unknown TTS provider: {other}"))),
        }
    }
}

enum Backend {
    Google {
        url: String,
        slow: bool,
    },
    OpenAi {
        api_key: SecretString,
        base_url: String,
        model: String,
        voice: String,
        speed: f32,
    },
}

/// Synthesizes speech through Google Translate or `OpenAI`
pub struct SpeechSynthesizer {
    client: reqwest::Client,
    backend: Backend,
    language: String,
}

impl SpeechSynthesizer {
    /// Create a synthesizer using Google Translate voices
    #[must_use]
    pub fn new_google(language: String, slow: bool) -> Self {
        Self {
            client: reqwest::Client::new(),
            backend: Backend::Google {
                url: GOOGLE_TTS_URL.to_string(),
                slow,
            },
            language,
        }
    }

    /// Create a synthesizer using `OpenAI` TTS
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new_openai(
        api_key: &str,
        model: String,
        voice: String,
        speed: f32,
        language: String,
    ) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(Error::MissingCredential(
                "OpenAI API key required for TTS".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            backend: Backend::OpenAi {
                api_key: SecretString::from(api_key.to_string()),
                base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
                model,
                voice,
                speed: speed.clamp(0.25, 4.0),
            },
            language,
        })
    }

    /// Override the service URL
    ///
    /// For Google this is the full `translate_tts` endpoint; for `OpenAI` the
    /// API base (`.../v1`).
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into().trim_end_matches('/').to_string();
        match &mut self.backend {
            Backend::Google { url: u, .. } => *u = url,
            Backend::OpenAi { base_url, .. } => *base_url = url,
        }
        self
    }

    /// Which provider this synthesizer talks to
    #[must_use]
    pub const fn provider(&self) -> TtsProvider {
        match self.backend {
            Backend::Google { .. } => TtsProvider::Google,
            Backend::OpenAi { .. } => TtsProvider::OpenAi,
        }
    }

    /// Synthesize with Google Translate TTS and write a WAV file
    async fn synthesize_google(
        &self,
        url: &str,
        slow: bool,
        text: &str,
        language: &str,
        output: &Path,
    ) -> Result<()> {
        let tl = google_language(language)?;
        let chunks = chunk_text(text, MAX_CHUNK_CHARS);
        let total = chunks.len().to_string();
        let speed = if slow { "0.24" } else { "1" };

        let mut mp3 = Vec::new();
        for (idx, chunk) in chunks.iter().enumerate() {
            let idx = idx.to_string();
            let textlen = chunk.chars().count().to_string();

            tracing::debug!(chunk = %idx, total = %total, chars = %textlen, "requesting speech chunk");

            let response = self
                .client
                .get(url)
                .query(&[
                    ("ie", "UTF-8"),
                    ("q", chunk.as_str()),
                    ("tl", tl),
                    ("client", "tw-ob"),
                    ("ttsspeed", speed),
                    ("total", total.as_str()),
                    ("idx", idx.as_str()),
                    ("textlen", textlen.as_str()),
                ])
                .header("User-Agent", "Mozilla/5.0")
                .header("Referer", "http://translate.google.com/")
                .send()
                .await?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(Error::Tts(format!("Google TTS error {status}: {body}")));
            }

            mp3.extend_from_slice(&response.bytes().await?);
        }

        let pcm = decode_mp3(&mp3)
            .map_err(|e| Error::Tts(format!("Google TTS returned undecodable audio: {e}")))?;
        write_wav(output, &pcm.samples, pcm.sample_rate)
    }

    /// Synthesize with `OpenAI` TTS, which returns WAV directly
    async fn synthesize_openai(
        &self,
        backend: &Backend,
        text: &str,
        output: &Path,
    ) -> Result<()> {
        #[derive(serde::Serialize)]
        struct TtsRequest<'a> {
            model: &'a str,
            input: &'a str,
            voice: &'a str,
            speed: f32,
            response_format: &'a str,
        }

        let Backend::OpenAi {
            api_key,
            base_url,
            model,
            voice,
            speed,
        } = backend
        else {
            return Err(Error::Tts("OpenAI backend not configured".to_string()));
        };

        let request = TtsRequest {
            model,
            input: text,
            voice,
            speed: *speed,
            response_format: "wav",
        };

        let response = self
            .client
            .post(format!("{base_url}/audio/speech"))
            .bearer_auth(api_key.expose_secret())
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("OpenAI TTS error {status}: {body}")));
        }

        let audio = response.bytes().await?;
        hound::WavReader::new(Cursor::new(&audio[..]))
            .map_err(|e| Error::Tts(format!("OpenAI TTS returned invalid WAV: {e}")))?;
        tokio::fs::write(output, &audio).await?;
        Ok(())
    }
}

#[async_trait]
impl Synthesizer for SpeechSynthesizer {
    async fn synthesize(
        &self,
        text: &str,
        output: &Path,
        language: Option<&str>,
        autoplay: bool,
    ) -> Result<PathBuf> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::Tts("nothing to synthesize".to_string()));
        }

        let lang = language.unwrap_or(self.language.as_str());
        tracing::info!(
            provider = ?self.provider(),
            language = lang,
            chars = text.chars().count(),
            "synthesizing speech"
        );

        match &self.backend {
            Backend::Google { url, slow } => {
                self.synthesize_google(url, *slow, text, lang, output).await?;
            }
            backend @ Backend::OpenAi { .. } => {
                self.synthesize_openai(backend, text, output).await?;
            }
        }

        tracing::info!(path = %output.display(), "speech saved");

        if autoplay {
            if let Err(e) = playback::play_file(output).await {
                tracing::warn!(
                    error = %e,
                    path = %output.display(),
                    "autoplay unavailable, audio left on disk"
                );
            }
        }

        Ok(output.to_path_buf())
    }

    fn language(&self) -> &str {
        &self.language
    }

    fn set_language(&mut self, language: &str) {
        self.language = language.to_string();
    }
}

/// Map a language code to the form the Google endpoint expects
///
/// # Errors
///
/// Returns [`Error::UnsupportedLanguage`] for codes Google cannot voice
pub fn google_language(code: &str) -> Result<&'static str> {
    let normalized = code.trim().to_ascii_lowercase().replace('_', "-");
    let wanted = match normalized.as_str() {
        "zh" | "zh-cn" | "zh-hans" => "zh-CN",
        "zh-tw" | "zh-hant" => "zh-TW",
        "he" => "iw",
        other => other,
    };

    GOOGLE_LANGUAGES
        .iter()
        .copied()
        .find(|l| *l == wanted)
        .ok_or_else(|| Error::UnsupportedLanguage(code.to_string()))
}

/// Split text into pieces of at most `max_chars` characters
///
/// Splits after sentence punctuation when possible, then at whitespace, and
/// only mid-word when a window has neither.
#[must_use]
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut rest = text.trim();

    while !rest.is_empty() {
        if rest.chars().count() <= max_chars {
            chunks.push(rest.to_string());
            break;
        }

        let window_end = rest
            .char_indices()
            .nth(max_chars)
            .map_or(rest.len(), |(i, _)| i);
        let window = &rest[..window_end];

        let split = window
            .rfind(SENTENCE_BREAKS)
            .map(|i| i + window[i..].chars().next().map_or(1, char::len_utf8))
            .or_else(|| window.rfind(char::is_whitespace))
            .filter(|&i| i > 0)
            .unwrap_or(window_end);

        let (head, tail) = rest.split_at(split);
        let head = head.trim();
        if !head.is_empty() {
            chunks.push(head.to_string());
        }
        rest = tail.trim_start();
    }

    chunks
}
