//! Shared test utilities
//!
//! Scripted stand-ins for every pipeline stage. Each stage pushes its name to
//! a shared [`CallLog`] so tests can assert which stages ran and in what order.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use lingua_voice::chat::{ChatProvider, Conversation, Exchange};
use lingua_voice::voice::{Recorder, Synthesizer, Transcriber, Transcription, write_wav};
use lingua_voice::{Assistant, Error, Result};

/// Sample rate of the clips the mocks write
pub const MOCK_SAMPLE_RATE: u32 = 16_000;

/// Ordered names of the stages that were invoked
pub type CallLog = Arc<Mutex<Vec<&'static str>>>;

/// Snapshot of a call log
#[must_use]
pub fn calls(log: &CallLog) -> Vec<&'static str> {
    log.lock().unwrap().clone()
}

/// Writes a silent clip of the requested length
pub struct MockRecorder {
    pub log: CallLog,
    pub fail: bool,
}

#[async_trait]
impl Recorder for MockRecorder {
    async fn record(&self, duration: Duration, output: &Path) -> Result<PathBuf> {
        self.log.lock().unwrap().push("record");
        if self.fail {
            return Err(Error::NoAudioBackendAvailable);
        }

        let frames = lingua_voice::voice::frame_count(duration, MOCK_SAMPLE_RATE);
        write_wav(output, &vec![0.0; frames], MOCK_SAMPLE_RATE)?;
        Ok(output.to_path_buf())
    }
}

/// Returns a fixed transcript, or a service error when `transcript` is `None`
pub struct MockTranscriber {
    pub log: CallLog,
    pub transcript: Option<String>,
    pub language: String,
}

#[async_trait]
impl Transcriber for MockTranscriber {
    async fn transcribe(&self, audio: &Path, _language: Option<&str>) -> Result<String> {
        self.log.lock().unwrap().push("transcribe");
        assert!(audio.exists(), "transcriber got a missing clip");

        self.transcript
            .clone()
            .ok_or_else(|| Error::Stt("model overloaded".to_string()))
    }

    async fn transcribe_detailed(
        &self,
        audio: &Path,
        language: Option<&str>,
    ) -> Result<Transcription> {
        let text = self.transcribe(audio, language).await?;
        Ok(Transcription {
            text,
            language: language.unwrap_or(self.language.as_str()).to_string(),
            duration: None,
            segments: Vec::new(),
        })
    }

    fn language(&self) -> &str {
        &self.language
    }

    fn set_language(&mut self, language: &str) {
        self.language = language.to_string();
    }
}

/// Echoes the last user message, or fails every call
pub struct MockChat {
    pub log: CallLog,
    pub fail: bool,
}

#[async_trait]
impl ChatProvider for MockChat {
    async fn complete(&self, messages: &[Exchange]) -> Result<String> {
        self.log.lock().unwrap().push("chat");
        if self.fail {
            return Err(Error::Chat("rate limited".to_string()));
        }

        let last = messages.last().map(Exchange::content).unwrap_or_default();
        Ok(format!("echo: {last}"))
    }

    fn model(&self) -> &str {
        "mock-model"
    }
}

/// Writes a short clip and remembers `(text, language)` of every call
pub struct MockSynthesizer {
    pub log: CallLog,
    pub spoken: Arc<Mutex<Vec<(String, String)>>>,
    pub language: String,
}

#[async_trait]
impl Synthesizer for MockSynthesizer {
    async fn synthesize(
        &self,
        text: &str,
        output: &Path,
        language: Option<&str>,
        _autoplay: bool,
    ) -> Result<PathBuf> {
        self.log.lock().unwrap().push("synthesize");

        let language = language.unwrap_or(self.language.as_str()).to_string();
        self.spoken.lock().unwrap().push((text.to_string(), language));

        write_wav(output, &[0.0; 160], MOCK_SAMPLE_RATE)?;
        Ok(output.to_path_buf())
    }

    fn language(&self) -> &str {
        &self.language
    }

    fn set_language(&mut self, language: &str) {
        self.language = language.to_string();
    }
}

/// Which stages should fail
#[derive(Default, Clone, Copy)]
pub struct Failures {
    pub recorder: bool,
    pub transcriber: bool,
    pub chat: bool,
}

/// An assistant built from mocks plus handles for inspecting it
pub struct Harness {
    pub assistant: Assistant,
    pub log: CallLog,
    pub spoken: Arc<Mutex<Vec<(String, String)>>>,
}

/// Build a mock-backed assistant writing into `output_dir`
#[must_use]
pub fn harness(output_dir: &Path, failures: Failures) -> Harness {
    let log = CallLog::default();
    let spoken = Arc::new(Mutex::new(Vec::new()));

    let recorder = MockRecorder {
        log: Arc::clone(&log),
        fail: failures.recorder,
    };
    let transcriber = MockTranscriber {
        log: Arc::clone(&log),
        transcript: (!failures.transcriber).then(|| "Qual é a capital da França?".to_string()),
        language: "en".to_string(),
    };
    let chat = MockChat {
        log: Arc::clone(&log),
        fail: failures.chat,
    };
    let synthesizer = MockSynthesizer {
        log: Arc::clone(&log),
        spoken: Arc::clone(&spoken),
        language: "en".to_string(),
    };

    let assistant = Assistant::new(
        "pt",
        output_dir,
        Box::new(recorder),
        Box::new(transcriber),
        Conversation::new(Box::new(chat)),
        Box::new(synthesizer),
    );

    Harness {
        assistant,
        log,
        spoken,
    }
}
