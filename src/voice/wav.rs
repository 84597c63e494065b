//! WAV encoding/decoding and MP3 decoding helpers

use std::io::Cursor;
use std::path::Path;

use crate::{Error, Result};

/// Decoded PCM audio, mono `f32` samples in [-1.0, 1.0]
#[derive(Debug, Clone, PartialEq)]
pub struct Pcm {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

fn wav_spec(sample_rate: u32) -> hound::WavSpec {
    hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    }
}

#[allow(clippy::cast_possible_truncation)]
fn to_i16(sample: f32) -> i16 {
    (sample * 32767.0).clamp(-32768.0, 32767.0) as i16
}

/// Convert f32 samples to mono 16-bit WAV bytes
///
/// # Errors
///
/// Returns error if WAV encoding fails
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, wav_spec(sample_rate))
            .map_err(|e| Error::Audio(e.to_string()))?;

        for &sample in samples {
            writer
                .write_sample(to_i16(sample))
                .map_err(|e| Error::Audio(e.to_string()))?;
        }

        writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}

/// Write f32 samples to a mono 16-bit WAV file, replacing any existing file
///
/// # Errors
///
/// Returns error if the file cannot be created or encoding fails
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<()> {
    let mut writer =
        hound::WavWriter::create(path, wav_spec(sample_rate)).map_err(|e| wav_error(path, &e))?;

    for &sample in samples {
        writer
            .write_sample(to_i16(sample))
            .map_err(|e| wav_error(path, &e))?;
    }

    writer.finalize().map_err(|e| wav_error(path, &e))?;

    tracing::debug!(
        path = %path.display(),
        samples = samples.len(),
        sample_rate,
        "wrote wav file"
    );
    Ok(())
}

/// Read a WAV file into mono f32 samples
///
/// Multi-channel files are down-mixed by averaging
///
/// # Errors
///
/// Returns error if the file cannot be opened or decoded
#[allow(clippy::cast_precision_loss)]
pub fn read_wav(path: &Path) -> Result<Pcm> {
    let reader = hound::WavReader::open(path).map_err(|e| wav_error(path, &e))?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| wav_error(path, &e))?,
        hound::SampleFormat::Int => {
            let scale = (1_i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| wav_error(path, &e))?
        }
    };

    Ok(Pcm {
        samples: downmix(&interleaved, usize::from(spec.channels)),
        sample_rate: spec.sample_rate,
    })
}

/// Average interleaved frames down to a single channel
#[must_use]
pub fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }

    #[allow(clippy::cast_precision_loss)]
    let divisor = channels as f32;
    interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / divisor)
        .collect()
}

/// Decode MP3 bytes to mono f32 samples
///
/// Concatenated MP3 streams decode as one continuous clip
///
/// # Errors
///
/// Returns error if the data holds no decodable frames
pub fn decode_mp3(mp3_data: &[u8]) -> Result<Pcm> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(mp3_data));
    let mut samples = Vec::new();
    let mut sample_rate = 0_u32;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                if sample_rate == 0 {
                    sample_rate = u32::try_from(frame.sample_rate).unwrap_or_default();
                }

                let frame_samples: Vec<f32> =
                    frame.data.iter().map(|&s| f32::from(s) / 32768.0).collect();
                samples.extend(downmix(&frame_samples, frame.channels));
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Audio(format!("MP3 decode error: {e}"))),
        }
    }

    if sample_rate == 0 {
        return Err(Error::Audio("MP3 data contained no audio frames".to_string()));
    }

    Ok(Pcm {
        samples,
        sample_rate,
    })
}

fn wav_error(path: &Path, e: &hound::Error) -> Error {
    Error::Audio(format!("{}: {e}", path.display()))
}
