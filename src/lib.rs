//! Lingua - Multilingual voice assistant
//!
//! This library provides the pipeline behind the `lingua` binary:
//! - Microphone capture to WAV
//! - Speech-to-text via an OpenAI-compatible Whisper endpoint
//! - Conversation with a chat model, keeping session history
//! - Text-to-speech via Google Translate voices or `OpenAI`
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    Interfaces                       │
//! │        CLI subcommands   │   Interactive menu       │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                    Assistant                        │
//! │  Recorder → Transcriber → Conversation → Synthesizer│
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                External services                    │
//! │   Audio device  │  Whisper  │  Chat  │  TTS         │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod assistant;
pub mod chat;
pub mod config;
pub mod error;
pub mod language;
pub mod menu;
pub mod setup;
pub mod voice;

pub use assistant::{Assistant, VoiceTurn};
pub use chat::{ChatProvider, Conversation, Exchange, OpenAiChat, Role};
pub use config::Config;
pub use error::{Error, Result};
pub use language::{LANGUAGES, language_name};
