//! Audio capture from microphone
//!
//! The cpal callback is the producer: it slices incoming audio into
//! fixed-size PCM frames and pushes them into a bounded queue. The
//! consumer (the recognition side) drains the queue at its own pace;
//! backpressure is blocking, not dropping — a slow consumer stalls
//! capture rather than losing audio.

use std::sync::mpsc::{Receiver, RecvTimeoutError, SyncSender, sync_channel};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, Stream, StreamConfig};

use crate::config::CaptureConfig;
use crate::{Error, Result};

/// Sample rate for audio capture (16kHz for speech)
pub const SAMPLE_RATE: u32 = 16000;

/// Consumer end of the capture queue
pub struct FrameReceiver {
    rx: Receiver<Vec<i16>>,
}

impl FrameReceiver {
    /// Wait up to `timeout` for the next PCM frame.
    ///
    /// # Errors
    ///
    /// Returns `Error::Timeout` if no frame arrives in time (a hung or
    /// silent capture device), or `Error::Audio` if the producer is gone.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Vec<i16>> {
        self.rx.recv_timeout(timeout).map_err(|e| match e {
            RecvTimeoutError::Timeout => Error::Timeout {
                stage: "capture",
                seconds: timeout.as_secs(),
            },
            RecvTimeoutError::Disconnected => {
                Error::Audio("capture stream closed unexpectedly".to_string())
            }
        })
    }
}

/// Captures audio from the default input device
pub struct AudioCapture {
    device: Device,
    config: StreamConfig,
    frame_samples: usize,
    queue_frames: usize,
    stream: Option<Stream>,
}

impl AudioCapture {
    /// Create a new audio capture instance
    ///
    /// # Errors
    ///
    /// Returns error if no input device offers 16kHz mono
    pub fn new(capture: &CaptureConfig) -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_input_device()
            .ok_or_else(|| Error::Audio("no input device available".to_string()))?;

        let supported_config = device
            .supported_input_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(SAMPLE_RATE)
            })
            .ok_or_else(|| Error::Audio("no suitable audio config found".to_string()))?;

        let config = supported_config
            .with_sample_rate(SampleRate(SAMPLE_RATE))
            .config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = SAMPLE_RATE,
            frame_samples = capture.frame_samples,
            queue_frames = capture.queue_frames,
            "audio capture initialized"
        );

        Ok(Self {
            device,
            config,
            frame_samples: capture.frame_samples,
            queue_frames: capture.queue_frames,
            stream: None,
        })
    }

    /// Start capturing and return the consumer end of the frame queue
    ///
    /// # Errors
    ///
    /// Returns error if the input stream cannot be built or started
    pub fn start(&mut self) -> Result<FrameReceiver> {
        let (tx, rx) = sync_channel::<Vec<i16>>(self.queue_frames);
        let frame_samples = self.frame_samples;
        let mut pending: Vec<i16> = Vec::with_capacity(frame_samples * 2);

        let stream = self
            .device
            .build_input_stream(
                &self.config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    push_frames(&tx, &mut pending, data, frame_samples);
                },
                |err| {
                    tracing::error!(error = %err, "audio capture error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;
        self.stream = Some(stream);

        tracing::debug!("audio capture started");
        Ok(FrameReceiver { rx })
    }

    /// Stop capturing audio
    pub fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            tracing::debug!("audio capture stopped");
        }
    }

    /// Check if currently capturing
    #[must_use]
    pub const fn is_capturing(&self) -> bool {
        self.stream.is_some()
    }

    /// Get the sample rate
    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }
}

/// Accumulate samples and push complete frames into the queue. The send
/// blocks when the queue is full; single producer, single consumer.
fn push_frames(tx: &SyncSender<Vec<i16>>, pending: &mut Vec<i16>, data: &[f32], frame_samples: usize) {
    pending.extend(data.iter().map(|&sample| {
        // f32 [-1.0, 1.0] to i16
        #[allow(clippy::cast_possible_truncation)]
        let converted = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
        converted
    }));

    while pending.len() >= frame_samples {
        let frame: Vec<i16> = pending.drain(..frame_samples).collect();
        if tx.send(frame).is_err() {
            // consumer hung up; drop the rest silently
            pending.clear();
            return;
        }
    }
}

/// Convert PCM samples to WAV bytes for the recognition engines
///
/// # Errors
///
/// Returns error if WAV encoding fails
pub fn samples_to_wav(samples: &[i16], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).map_err(|e| Error::Audio(e.to_string()))?;

        for &sample in samples {
            writer
                .write_sample(sample)
                .map_err(|e| Error::Audio(e.to_string()))?;
        }

        writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}
