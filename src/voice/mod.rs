//! Voice processing module
//!
//! The three audio stages of the pipeline: capture (recorder), transcription
//! and synthesis, plus WAV helpers and best-effort playback.

mod capture;
mod playback;
mod stt;
mod tts;
mod wav;

pub use capture::{
    CaptureBackend, DEFAULT_SAMPLE_RATE, MicRecorder, Recorder, fit_to_length, frame_count,
};
pub use playback::{play_file, resample};
pub use stt::{Segment, Transcriber, Transcription, WhisperTranscriber};
pub use tts::{
    MAX_CHUNK_CHARS, SpeechSynthesizer, Synthesizer, TtsProvider, chunk_text, google_language,
};
pub use wav::{Pcm, decode_mp3, downmix, read_wav, samples_to_wav, write_wav};
