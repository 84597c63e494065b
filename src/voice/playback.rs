//! Audio playback to speakers

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, StreamConfig};

use super::wav::{read_wav, Pcm};
use crate::{Error, Result};

/// Play a WAV file on the default output device, waiting until it finishes
///
/// # Errors
///
/// Returns [`Error::PlaybackUnavailable`] when the host has no output device,
/// or an audio error if decoding or the stream fails
pub async fn play_file(path: &Path) -> Result<()> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let pcm = read_wav(&path)?;
        play_blocking(&pcm)
    })
    .await
    .map_err(|e| Error::Audio(format!("playback task failed: {e}")))?
}

/// Open the output device and pick a stream config for `sample_rate`
///
/// Tries mono, then stereo at the requested rate, then the device default.
fn open_output(sample_rate: u32) -> Result<(Device, StreamConfig)> {
    let host = cpal::default_host();

    let device = host
        .default_output_device()
        .ok_or_else(|| Error::PlaybackUnavailable("no output device available".to_string()))?;

    let supports = |channels: u16| {
        device.supported_output_configs().ok()?.find(|c| {
            c.channels() == channels
                && c.min_sample_rate() <= SampleRate(sample_rate)
                && c.max_sample_rate() >= SampleRate(sample_rate)
        })
    };

    let config = if let Some(c) = supports(1).or_else(|| supports(2)) {
        c.with_sample_rate(SampleRate(sample_rate)).config()
    } else {
        device
            .default_output_config()
            .map_err(|e| Error::PlaybackUnavailable(e.to_string()))?
            .config()
    };

    tracing::debug!(
        device = %device.name().unwrap_or_default(),
        sample_rate = config.sample_rate.0,
        channels = config.channels,
        "audio playback initialized"
    );

    Ok((device, config))
}

/// Play samples in a blocking manner
fn play_blocking(pcm: &Pcm) -> Result<()> {
    if pcm.samples.is_empty() {
        return Ok(());
    }

    let (device, config) = open_output(pcm.sample_rate)?;
    let channels = usize::from(config.channels);
    let output_rate = config.sample_rate.0;

    let samples = Arc::new(resample(&pcm.samples, pcm.sample_rate, output_rate)?);
    let sample_count = samples.len();
    let position = Arc::new(AtomicUsize::new(0));
    let finished = Arc::new(AtomicBool::new(false));

    let stream = {
        let samples = Arc::clone(&samples);
        let position = Arc::clone(&position);
        let finished = Arc::clone(&finished);

        device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    for frame in data.chunks_mut(channels) {
                        let pos = position.load(Ordering::Relaxed);
                        let sample = if let Some(&s) = samples.get(pos) {
                            position.store(pos + 1, Ordering::Relaxed);
                            s
                        } else {
                            finished.store(true, Ordering::Relaxed);
                            0.0
                        };

                        for out in frame.iter_mut() {
                            *out = sample;
                        }
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio playback error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?
    };

    stream.play().map_err(|e| Error::Audio(e.to_string()))?;

    // Poll for completion with timeout
    let duration_ms = (sample_count as u64 * 1000) / u64::from(output_rate.max(1));
    let start = Instant::now();
    let timeout = Duration::from_millis(duration_ms + 500);

    while !finished.load(Ordering::Relaxed) {
        if start.elapsed() > timeout {
            break;
        }
        std::thread::sleep(Duration::from_millis(50));
    }

    // Small delay to ensure audio finishes
    std::thread::sleep(Duration::from_millis(100));

    drop(stream);
    tracing::debug!(samples = sample_count, "playback complete");

    Ok(())
}

/// Resample mono samples between two rates
///
/// The tail chunk is zero-padded and the filter delay trimmed, so the output
/// holds `len * to_rate / from_rate` samples.
///
/// # Errors
///
/// Returns error if either rate is zero or the resampler fails
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    use rubato::{FftFixedIn, Resampler};

    if from_rate == 0 || to_rate == 0 {
        return Err(Error::Audio(format!(
            "cannot resample {from_rate} Hz to {to_rate} Hz"
        )));
    }
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let chunk_size = 1024;
    let sub_chunks = 2;
    let mut resampler =
        FftFixedIn::<f64>::new(from_rate as usize, to_rate as usize, chunk_size, sub_chunks, 1)
            .map_err(|e| Error::Audio(format!("Resampler init failed: {e}")))?;

    let input: Vec<f64> = samples.iter().map(|&s| f64::from(s)).collect();
    let expected =
        (samples.len() as f64 * f64::from(to_rate) / f64::from(from_rate)).round() as usize;
    let delay = resampler.output_delay();
    let mut output = Vec::with_capacity(expected + delay);

    for chunk in input.chunks(chunk_size) {
        let result = if chunk.len() == chunk_size {
            resampler.process(&[chunk], None)
        } else {
            resampler.process_partial(Some(&[chunk]), None)
        };
        let result = result.map_err(|e| Error::Audio(format!("Resample failed: {e}")))?;
        output.extend_from_slice(&result[0]);
    }

    // Flush what is still held back by the filter delay
    while output.len() < expected + delay {
        let result = resampler
            .process_partial(None::<&[&[f64]]>, None)
            .map_err(|e| Error::Audio(format!("Resample failed: {e}")))?;
        if result[0].is_empty() {
            break;
        }
        output.extend_from_slice(&result[0]);
    }

    Ok(output
        .iter()
        .skip(delay)
        .take(expected)
        .map(|&s| s as f32)
        .collect())
}
