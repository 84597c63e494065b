//! Voice assistant coordinator
//!
//! Chains the stages into the user-facing operations. Each operation runs its
//! stages strictly in order and stops at the first failure, returning that
//! stage's error unchanged.

use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::ExposeSecret;

use crate::chat::{Conversation, OpenAiChat};
use crate::config::Config;
use crate::voice::{
    MicRecorder, Recorder, SpeechSynthesizer, Synthesizer, Transcriber, TtsProvider,
    WhisperTranscriber,
};
use crate::Result;

/// File name of the recorded question inside the destination directory
pub const INPUT_AUDIO_FILE: &str = "user_input.wav";

/// File name of the spoken answer inside the destination directory
pub const OUTPUT_AUDIO_FILE: &str = "assistant_response.wav";

/// File name used for spoken replies to text messages
pub const TEXT_REPLY_AUDIO_FILE: &str = "response.wav";

/// Artifacts of one spoken round trip
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceTurn {
    /// What the user said, as transcribed
    pub user_text: String,
    /// The assistant's reply
    pub assistant_text: String,
    /// Recorded question
    pub input_audio: PathBuf,
    /// Synthesized answer
    pub output_audio: PathBuf,
}

/// Owns one instance of each stage for a single session
pub struct Assistant {
    language: String,
    output_dir: PathBuf,
    recorder: Box<dyn Recorder>,
    transcriber: Box<dyn Transcriber>,
    conversation: Conversation,
    synthesizer: Box<dyn Synthesizer>,
}

impl Assistant {
    /// Assemble an assistant from prebuilt stages
    ///
    /// The transcriber and synthesizer are switched to `language`.
    #[must_use]
    pub fn new(
        language: impl Into<String>,
        output_dir: impl Into<PathBuf>,
        recorder: Box<dyn Recorder>,
        mut transcriber: Box<dyn Transcriber>,
        conversation: Conversation,
        mut synthesizer: Box<dyn Synthesizer>,
    ) -> Self {
        let language = language.into();
        transcriber.set_language(&language);
        synthesizer.set_language(&language);

        Self {
            language,
            output_dir: output_dir.into(),
            recorder,
            transcriber,
            conversation,
            synthesizer,
        }
    }

    /// Build the production stages from configuration
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::MissingCredential`] if no `OpenAI` key is configured
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config.openai_key()?;

        let chat = OpenAiChat::new(Some(api_key.expose_secret()), config.chat.model.clone())?
            .with_base_url(config.chat.base_url.clone());
        let mut conversation = Conversation::new(Box::new(chat));
        if let Some(prompt) = &config.chat.system_prompt {
            conversation.set_system_instruction(prompt);
        }

        let transcriber = build_transcriber(config)?;
        let synthesizer = build_synthesizer(config)?;
        let recorder = MicRecorder::new(config.voice.sample_rate);

        tracing::info!(
            language = %config.language,
            chat_model = %config.chat.model,
            stt_model = %config.voice.stt_model,
            tts = ?config.tts.provider,
            "assistant ready"
        );

        Ok(Self::new(
            config.language.clone(),
            config.voice.output_dir.clone(),
            Box::new(recorder),
            Box::new(transcriber),
            conversation,
            Box::new(synthesizer),
        ))
    }

    /// Record a spoken question, answer it and speak the answer
    ///
    /// Clips go to `destination` (default: the configured output directory),
    /// which is created when missing.
    ///
    /// # Errors
    ///
    /// Returns the error of the first stage that fails; later stages do not run
    pub async fn converse_by_voice(
        &mut self,
        duration: Duration,
        destination: Option<&Path>,
    ) -> Result<VoiceTurn> {
        let dir = destination.unwrap_or(self.output_dir.as_path()).to_path_buf();
        tokio::fs::create_dir_all(&dir).await?;

        let input_audio = self
            .recorder
            .record(duration, &dir.join(INPUT_AUDIO_FILE))
            .await?;

        let user_text = self.transcriber.transcribe(&input_audio, None).await?;

        let assistant_text = self.conversation.send(&user_text, None).await?;

        let output_audio = self
            .synthesizer
            .synthesize(&assistant_text, &dir.join(OUTPUT_AUDIO_FILE), None, true)
            .await?;

        Ok(VoiceTurn {
            user_text,
            assistant_text,
            input_audio,
            output_audio,
        })
    }

    /// Answer a typed message, optionally speaking the reply
    ///
    /// Spoken replies always go to the same file, overwriting the last one.
    ///
    /// # Errors
    ///
    /// Returns the chat or synthesis error
    pub async fn converse_by_text(&mut self, message: &str, speak_reply: bool) -> Result<String> {
        let reply = self.conversation.send(message, None).await?;

        if speak_reply {
            let output = self.text_reply_path();
            if let Some(dir) = output.parent().filter(|d| !d.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(dir).await?;
            }
            self.synthesizer
                .synthesize(&reply, &output, None, true)
                .await?;
        }

        Ok(reply)
    }

    /// Forget the conversation so far
    pub fn clear_history(&mut self) {
        self.conversation.clear();
    }

    /// Switch the transcription and synthesis language
    ///
    /// The conversation and its model are unaffected.
    pub fn change_language(&mut self, code: &str) {
        code.clone_into(&mut self.language);
        self.transcriber.set_language(code);
        self.synthesizer.set_language(code);
        tracing::info!(language = code, "language changed");
    }

    /// Current session language
    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Fixed path for spoken replies to text messages
    #[must_use]
    pub fn text_reply_path(&self) -> PathBuf {
        self.output_dir.join(TEXT_REPLY_AUDIO_FILE)
    }

    #[must_use]
    pub const fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    #[must_use]
    pub fn transcriber(&self) -> &dyn Transcriber {
        self.transcriber.as_ref()
    }

    #[must_use]
    pub fn synthesizer(&self) -> &dyn Synthesizer {
        self.synthesizer.as_ref()
    }

    #[must_use]
    pub fn recorder(&self) -> &dyn Recorder {
        self.recorder.as_ref()
    }
}

/// Build the Whisper transcriber described by `config`
///
/// # Errors
///
/// Returns [`crate::Error::MissingCredential`] if no `OpenAI` key is configured
pub fn build_transcriber(config: &Config) -> Result<WhisperTranscriber> {
    let api_key = config.openai_key()?;
    Ok(WhisperTranscriber::new(
        api_key.expose_secret(),
        config.voice.stt_model.clone(),
        config.language.clone(),
    )?
    .with_base_url(config.chat.base_url.clone()))
}

/// Build the synthesizer for the configured provider
///
/// # Errors
///
/// Returns [`crate::Error::MissingCredential`] if the `OpenAI` provider is
/// selected without a key
pub fn build_synthesizer(config: &Config) -> Result<SpeechSynthesizer> {
    match config.tts.provider {
        TtsProvider::Google => Ok(SpeechSynthesizer::new_google(
            config.language.clone(),
            config.tts.slow,
        )),
        TtsProvider::OpenAi => {
            let api_key = config.openai_key()?;
            Ok(SpeechSynthesizer::new_openai(
                api_key.expose_secret(),
                config.tts.model.clone(),
                config.tts.voice.clone(),
                config.tts.speed,
                config.language.clone(),
            )?
            .with_base_url(config.chat.base_url.clone()))
        }
    }
}

impl std::fmt::Debug for Assistant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Assistant")
            .field("language", &self.language)
            .field("output_dir", &self.output_dir)
            .field("model", &self.conversation.model())
            .field("history", &self.conversation.history().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::config::file::LinguaConfigFile;

    #[test]
    fn test_from_config_requires_credential() {
        let config = Config::from_sources(LinguaConfigFile::default(), |_| None).unwrap();

        let err = Assistant::from_config(&config).unwrap_err();
        assert!(matches!(err, Error::MissingCredential(_)));
    }

    #[test]
    fn test_google_synthesizer_needs_no_key() {
        let config = Config::from_sources(LinguaConfigFile::default(), |_| None).unwrap();

        let synthesizer = build_synthesizer(&config).unwrap();
        assert_eq!(synthesizer.provider(), TtsProvider::Google);
        assert_eq!(synthesizer.language(), "pt");

        assert!(matches!(
            build_transcriber(&config),
            Err(Error::MissingCredential(_))
        ));
    }

    #[test]
    fn test_openai_synthesizer_needs_key() {
        let mut fc = LinguaConfigFile::default();
        fc.tts.provider = Some("openai".to_string());
        let config = Config::from_sources(fc, |_| None).unwrap();

        assert!(matches!(
            build_synthesizer(&config),
            Err(Error::MissingCredential(_))
        ));
    }

    #[test]
    fn test_from_config_applies_language_and_prompt() {
        let mut fc = LinguaConfigFile::default();
        fc.language = Some("es".to_string());
        fc.chat.system_prompt = Some("Responde en español.".to_string());
        fc.api_keys.openai = Some("sk-test".to_string());
        let config = Config::from_sources(fc, |_| None).unwrap();

        let assistant = Assistant::from_config(&config).unwrap();

        assert_eq!(assistant.language(), "es");
        assert_eq!(assistant.transcriber().language(), "es");
        assert_eq!(assistant.synthesizer().language(), "es");
        assert_eq!(assistant.conversation().history().len(), 1);
        assert_eq!(assistant.conversation().model(), "gpt-4");
        assert_eq!(
            assistant.text_reply_path(),
            PathBuf::from("output").join(TEXT_REPLY_AUDIO_FILE)
        );
    }
}
