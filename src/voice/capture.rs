//! Audio capture from microphone
//!
//! The capture mechanism is resolved once, when the recorder is built, and
//! every recording goes through that [`CaptureBackend`].

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SampleRate, SupportedStreamConfigRange};

use super::wav::{downmix, read_wav, write_wav};
use crate::{Error, Result};

/// Default capture sample rate (CD quality)
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Records fixed-duration clips to WAV files
#[async_trait]
pub trait Recorder: Send + Sync {
    /// Capture `duration` of audio and write it as mono WAV to `output`
    ///
    /// Blocks for the full duration and overwrites `output`. Returns the path
    /// that was written.
    async fn record(&self, duration: Duration, output: &Path) -> Result<PathBuf>;
}

/// Mechanism used to capture audio on this host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureBackend {
    /// Native device capture through cpal
    Cpal,
    /// ALSA `arecord` command-line tool
    Arecord(PathBuf),
}

impl CaptureBackend {
    /// Pick the first available backend: a cpal input device that can
    /// deliver f32 samples at `sample_rate`, then `arecord`
    #[must_use]
    pub fn detect(sample_rate: u32) -> Option<Self> {
        let native = cpal::default_host()
            .default_input_device()
            .and_then(|device| device.supported_input_configs().ok())
            .and_then(|configs| f32_input_config(configs, sample_rate));

        if native.is_some() {
            return Some(Self::Cpal);
        }

        which::which("arecord").ok().map(Self::Arecord)
    }

    /// Short name for logging
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Cpal => "cpal",
            Self::Arecord(_) => "arecord",
        }
    }
}

/// Records from the default input device
pub struct MicRecorder {
    backend: Option<CaptureBackend>,
    sample_rate: u32,
}

impl MicRecorder {
    /// Create a recorder, detecting the capture backend once
    ///
    /// A host without any backend still yields a recorder; its `record`
    /// calls fail with [`Error::NoAudioBackendAvailable`].
    #[must_use]
    pub fn new(sample_rate: u32) -> Self {
        let backend = CaptureBackend::detect(sample_rate);

        match &backend {
            Some(b) => tracing::debug!(backend = b.name(), sample_rate, "audio capture initialized"),
            None => tracing::warn!("no audio capture backend found, voice input disabled"),
        }

        Self::with_backend(backend, sample_rate)
    }

    /// Create a recorder with an explicit backend
    #[must_use]
    pub const fn with_backend(backend: Option<CaptureBackend>, sample_rate: u32) -> Self {
        Self {
            backend,
            sample_rate,
        }
    }

    /// The backend selected at construction
    #[must_use]
    pub const fn backend(&self) -> Option<&CaptureBackend> {
        self.backend.as_ref()
    }

    /// Get the sample rate
    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

#[async_trait]
impl Recorder for MicRecorder {
    async fn record(&self, duration: Duration, output: &Path) -> Result<PathBuf> {
        let backend = self
            .backend
            .as_ref()
            .ok_or(Error::NoAudioBackendAvailable)?;
        let sample_rate = self.sample_rate;
        let frames = frame_count(duration, sample_rate);

        tracing::info!(
            backend = backend.name(),
            secs = duration.as_secs_f32(),
            path = %output.display(),
            "recording"
        );

        match backend {
            CaptureBackend::Cpal => {
                let samples =
                    tokio::task::spawn_blocking(move || capture_cpal(sample_rate, duration))
                        .await
                        .map_err(|e| Error::Audio(format!("capture task failed: {e}")))??;
                write_wav(output, &fit_to_length(samples, frames), sample_rate)?;
            }
            CaptureBackend::Arecord(program) => {
                capture_arecord(program, sample_rate, duration, output).await?;
                let pcm = read_wav(output)?;
                write_wav(output, &fit_to_length(pcm.samples, frames), sample_rate)?;
            }
        }

        tracing::info!(path = %output.display(), frames, "recording saved");
        Ok(output.to_path_buf())
    }
}

/// The f32 config covering `sample_rate` with the fewest channels
///
/// Stereo-only devices get down-mixed after capture.
fn f32_input_config(
    configs: impl IntoIterator<Item = SupportedStreamConfigRange>,
    sample_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| {
            c.sample_format() == SampleFormat::F32
                && c.min_sample_rate() <= SampleRate(sample_rate)
                && c.max_sample_rate() >= SampleRate(sample_rate)
        })
        .min_by_key(SupportedStreamConfigRange::channels)
}

/// Capture from the default cpal input device for `duration`
///
/// Runs on a blocking thread; cpal streams are not `Send`.
fn capture_cpal(sample_rate: u32, duration: Duration) -> Result<Vec<f32>> {
    let host = cpal::default_host();

    let device = host
        .default_input_device()
        .ok_or_else(|| Error::Audio("no input device available".to_string()))?;

    let configs = device
        .supported_input_configs()
        .map_err(|e| Error::Audio(e.to_string()))?;
    let supported_config = f32_input_config(configs, sample_rate).ok_or_else(|| {
        Error::Audio(format!("no f32 input config supports {sample_rate} Hz"))
    })?;

    let config = supported_config
        .with_sample_rate(SampleRate(sample_rate))
        .config();
    let channels = usize::from(config.channels);

    tracing::debug!(
        device = %device.name().unwrap_or_default(),
        sample_rate,
        channels,
        "opening input stream"
    );

    let buffer = Arc::new(Mutex::new(Vec::<f32>::new()));
    let sink = Arc::clone(&buffer);

    let stream = device
        .build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                if let Ok(mut buf) = sink.lock() {
                    buf.extend_from_slice(data);
                }
            },
            |err| {
                tracing::error!(error = %err, "audio capture error");
            },
            None,
        )
        .map_err(|e| Error::Audio(e.to_string()))?;

    stream.play().map_err(|e| Error::Audio(e.to_string()))?;
    std::thread::sleep(duration);
    drop(stream);

    let interleaved = buffer
        .lock()
        .map(|mut buf| std::mem::take(&mut *buf))
        .unwrap_or_default();

    Ok(downmix(&interleaved, channels))
}

/// Capture through `arecord`, which writes the WAV file itself
async fn capture_arecord(
    program: &Path,
    sample_rate: u32,
    duration: Duration,
    output: &Path,
) -> Result<()> {
    // arecord only takes whole seconds; the clip is trimmed afterwards
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let secs = (duration.as_secs_f64().ceil() as u64).max(1);

    let status = tokio::process::Command::new(program)
        .args(["-q", "-f", "S16_LE", "-c", "1", "-r"])
        .arg(sample_rate.to_string())
        .arg("-d")
        .arg(secs.to_string())
        .arg(output)
        .status()
        .await
        .map_err(|e| Error::Audio(format!("failed to run {}: {e}", program.display())))?;

    if !status.success() {
        return Err(Error::Audio(format!("arecord exited with {status}")));
    }

    Ok(())
}

/// Number of frames in `duration` at `sample_rate`
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn frame_count(duration: Duration, sample_rate: u32) -> usize {
    (duration.as_secs_f64() * f64::from(sample_rate)).round() as usize
}

/// Zero-pad or truncate `samples` to exactly `frames`
#[must_use]
pub fn fit_to_length(mut samples: Vec<f32>, frames: usize) -> Vec<f32> {
    samples.resize(frames, 0.0);
    samples
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_count() {
        assert_eq!(frame_count(Duration::from_secs(5), 44_100), 220_500);
        assert_eq!(frame_count(Duration::from_millis(500), 16_000), 8_000);
        assert_eq!(frame_count(Duration::ZERO, 44_100), 0);
    }

    #[test]
    fn test_fit_to_length_pads_short_capture() {
        let samples = fit_to_length(vec![0.5; 3], 5);
        assert_eq!(samples, vec![0.5, 0.5, 0.5, 0.0, 0.0]);
    }

    #[test]
    fn test_fit_to_length_truncates_long_capture() {
        let samples = fit_to_length(vec![0.25; 10], 4);
        assert_eq!(samples.len(), 4);
    }

    fn range(channels: u16, format: SampleFormat) -> SupportedStreamConfigRange {
        SupportedStreamConfigRange::new(
            channels,
            SampleRate(8_000),
            SampleRate(48_000),
            cpal::SupportedBufferSize::Unknown,
            format,
        )
    }

    #[test]
    fn test_integer_only_device_is_not_native() {
        let configs = vec![range(1, SampleFormat::I16), range(2, SampleFormat::I32)];
        assert!(f32_input_config(configs, DEFAULT_SAMPLE_RATE).is_none());
    }

    #[test]
    fn test_f32_config_prefers_fewest_channels() {
        let configs = vec![
            range(2, SampleFormat::F32),
            range(1, SampleFormat::I16),
            range(1, SampleFormat::F32),
        ];
        let chosen = f32_input_config(configs, 16_000).unwrap();
        assert_eq!(chosen.channels(), 1);
        assert_eq!(chosen.sample_format(), SampleFormat::F32);
    }

    #[test]
    fn test_f32_config_must_cover_rate() {
        let configs = vec![range(1, SampleFormat::F32)];
        assert!(f32_input_config(configs, 96_000).is_none());
    }

    #[test]
    fn test_backend_names() {
        assert_eq!(CaptureBackend::Cpal.name(), "cpal");
        assert_eq!(
            CaptureBackend::Arecord(PathBuf::from("/usr/bin/arecord")).name(),
            "arecord"
        );
    }

    #[tokio::test]
    async fn test_record_without_backend_fails_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("input.wav");
        let recorder = MicRecorder::with_backend(None, DEFAULT_SAMPLE_RATE);

        let err = recorder
            .record(Duration::from_secs(5), &output)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::NoAudioBackendAvailable));
        assert!(!output.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_capture_tool_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("input.wav");
        let recorder = MicRecorder::with_backend(
            Some(CaptureBackend::Arecord(PathBuf::from("false"))),
            DEFAULT_SAMPLE_RATE,
        );

        let err = recorder
            .record(Duration::from_secs(1), &output)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Audio(_)));
    }
}
