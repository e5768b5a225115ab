//! Audio playback to speakers
//!
//! Plays a finished synthesis artifact (WAV or MP3) and blocks until the
//! audio has drained. Playback is best-effort from the session's point of
//! view: a failure here degrades the request, it never erases the
//! translated text.

use std::io::Cursor;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, StreamConfig};

use crate::{Error, Result};

/// Plays a synthesized audio artifact to completion
#[async_trait]
pub trait Player: Send + Sync {
    /// Play the artifact at `path`, blocking until playback completes
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be opened, decoded, or played
    async fn play(&self, path: &Path) -> Result<()>;
}

/// Plays audio to the default output device
pub struct AudioPlayback;

impl AudioPlayback {
    /// Create a playback instance, verifying an output device exists
    ///
    /// # Errors
    ///
    /// Returns error if no output device is available
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();
        host.default_output_device()
            .ok_or_else(|| Error::Playback("no output device available".to_string()))?;
        Ok(Self)
    }

    /// Play samples in a blocking manner at the artifact's sample rate
    fn play_samples_blocking(&self, samples: Vec<f32>, sample_rate: u32) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }

        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Playback("no output device".to_string()))?;

        let supported_config = device
            .supported_output_configs()
            .map_err(|e| Error::Playback(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(sample_rate)
                    && c.max_sample_rate() >= SampleRate(sample_rate)
            })
            .or_else(|| {
                // fallback: stereo, duplicating the mono signal
                device.supported_output_configs().ok()?.find(|c| {
                    c.channels() == 2
                        && c.min_sample_rate() <= SampleRate(sample_rate)
                        && c.max_sample_rate() >= SampleRate(sample_rate)
                })
            })
            .ok_or_else(|| {
                Error::Playback(format!("no output config supports {sample_rate} Hz"))
            })?;

        let config: StreamConfig = supported_config
            .with_sample_rate(SampleRate(sample_rate))
            .config();
        let channels = config.channels as usize;

        let samples = Arc::new(samples);
        let position = Arc::new(Mutex::new(0usize));
        let finished = Arc::new(Mutex::new(false));

        let samples_cb = Arc::clone(&samples);
        let position_cb = Arc::clone(&position);
        let finished_cb = Arc::clone(&finished);

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let Ok(mut pos) = position_cb.lock() else {
                        return;
                    };

                    for frame in data.chunks_mut(channels) {
                        let sample = if *pos < samples_cb.len() {
                            samples_cb[*pos]
                        } else {
                            if let Ok(mut done) = finished_cb.lock() {
                                *done = true;
                            }
                            0.0
                        };

                        for out in frame.iter_mut() {
                            *out = sample;
                        }

                        if *pos < samples_cb.len() {
                            *pos += 1;
                        }
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio playback error");
                },
                None,
            )
            .map_err(|e| Error::Playback(e.to_string()))?;

        stream.play().map_err(|e| Error::Playback(e.to_string()))?;

        // Wait for playback to drain, bounded by the clip duration
        let duration_ms = (samples.len() as u64 * 1000) / u64::from(sample_rate);
        let start = std::time::Instant::now();
        let timeout = std::time::Duration::from_millis(duration_ms + 500);

        loop {
            if finished.lock().is_ok_and(|done| *done) {
                break;
            }
            if start.elapsed() > timeout {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(50));
        }

        // small tail so the device buffer empties
        std::thread::sleep(std::time::Duration::from_millis(100));

        drop(stream);
        tracing::debug!(samples = samples.len(), sample_rate, "playback complete");

        Ok(())
    }
}

#[async_trait]
impl Player for AudioPlayback {
    #[allow(clippy::unused_async)]
    async fn play(&self, path: &Path) -> Result<()> {
        let (samples, sample_rate) = decode_artifact(path)?;
        self.play_samples_blocking(samples, sample_rate)
    }
}

/// Decode a synthesis artifact into mono f32 samples. WAV and MP3 are the
/// formats the backends produce; the header decides, not the extension.
fn decode_artifact(path: &Path) -> Result<(Vec<f32>, u32)> {
    let bytes =
        std::fs::read(path).map_err(|e| Error::Playback(format!("cannot open artifact: {e}")))?;

    if bytes.starts_with(b"RIFF") {
        decode_wav(&bytes)
    } else {
        decode_mp3(&bytes)
    }
}

/// Decode WAV bytes to mono f32 samples
fn decode_wav(bytes: &[u8]) -> Result<(Vec<f32>, u32)> {
    let mut reader =
        hound::WavReader::new(Cursor::new(bytes)).map_err(|e| Error::Playback(e.to_string()))?;
    let spec = reader.spec();
    let channels = usize::from(spec.channels.max(1));

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| Error::Playback(e.to_string()))?,
        hound::SampleFormat::Int => {
            let max = f32::from(i16::MAX);
            let samples: Vec<i16> = reader
                .samples::<i16>()
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| Error::Playback(e.to_string()))?;
            samples.iter().map(|&s| f32::from(s) / max).collect()
        }
    };

    let mono = downmix(&interleaved, channels);
    Ok((mono, spec.sample_rate))
}

/// Decode MP3 bytes to mono f32 samples
fn decode_mp3(bytes: &[u8]) -> Result<(Vec<f32>, u32)> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(bytes));
    let mut samples = Vec::new();
    let mut sample_rate = 0u32;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                #[allow(clippy::cast_sign_loss)]
                {
                    sample_rate = frame.sample_rate as u32;
                }
                let interleaved: Vec<f32> =
                    frame.data.iter().map(|&s| f32::from(s) / 32768.0).collect();
                samples.extend(downmix(&interleaved, frame.channels.max(1)));
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Playback(format!("MP3 decode error: {e}"))),
        }
    }

    if samples.is_empty() || sample_rate == 0 {
        return Err(Error::Playback("artifact contains no audio".to_string()));
    }

    Ok((samples, sample_rate))
}

/// Average interleaved channels down to mono
fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }

    interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_wav_artifact() {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 22050,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for i in 0..1000i16 {
                writer.write_sample(i).unwrap();
            }
            writer.finalize().unwrap();
        }

        let (samples, rate) = decode_wav(cursor.get_ref()).unwrap();
        assert_eq!(rate, 22050);
        assert_eq!(samples.len(), 1000);
    }

    #[test]
    fn downmix_averages_stereo() {
        let stereo = vec![1.0, 0.0, 0.5, 0.5];
        assert_eq!(downmix(&stereo, 2), vec![0.5, 0.5]);
    }

    #[test]
    fn rejects_garbage_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noise.bin");
        std::fs::write(&path, b"not audio at all").unwrap();
        assert!(decode_artifact(&path).is_err());
    }
}
