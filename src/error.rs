//! Error types for Lingua voice assistant

use thiserror::Error;

/// Result type alias for Lingua operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the voice pipeline
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// No API credential available for a service that requires one
    #[error("missing credential: {0}")]
    MissingCredential(String),

    /// Neither native capture nor a capture tool exists on this host
    #[error("no audio capture backend available (need an input device or `arecord`)")]
    NoAudioBackendAvailable,

    /// Audio device or encoding error
    #[error("audio error: {0}")]
    Audio(String),

    /// Playback is not possible in this environment
    #[error("playback unavailable: {0}")]
    PlaybackUnavailable(String),

    /// Speech-to-text error
    #[error("STT error: {0}")]
    Stt(String),

    /// Conversational API error
    #[error("chat error: {0}")]
    Chat(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// Language not supported by the synthesis service
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Whether the error came from one of the remote backends
    /// (transcription, chat or synthesis)
    #[must_use]
    pub const fn is_external_service(&self) -> bool {
        matches!(
            self,
            Self::Stt(_) | Self::Chat(_) | Self::Tts(_) | Self::Http(_)
        )
    }

    /// Whether the error should terminate the process
    ///
    /// Missing credentials, bad configuration and a host with no capture
    /// backend are fatal; everything else is reported and the session continues
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::MissingCredential(_) | Self::Config(_) | Self::NoAudioBackendAvailable
        )
    }
}
