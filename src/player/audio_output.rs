// SPDX-License-Identifier: MPL-2.0
//! Audio output using cpal.
//!
//! The device callback runs the [`AudioFeed`] directly: every hardware period
//! pulls exactly one buffer's worth of samples from the sample channel. Volume
//! and mute are applied on the way out; underruns and pauses are silence.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use super::audio_feed::AudioFeed;
use super::transport::SharedTransport;
use crate::domain::{AudioTrackInfo, Volume};
use crate::error::{Error, Result};

/// Linear gain to apply, with the perceptual curve and mute folded in.
fn output_gain(volume: Volume, muted: bool) -> f32 {
    if muted {
        0.0
    } else {
        volume.gain()
    }
}

/// Callback state: the feed plus a scratch buffer in `f32`.
struct Renderer {
    feed: AudioFeed,
    transport: SharedTransport,
    gain: f32,
    scratch: Vec<f32>,
}

impl Renderer {
    fn render<T: cpal::SizedSample + cpal::FromSample<f32>>(&mut self, data: &mut [T]) {
        // While paused nothing is consumed, so the sample channel keeps its place
        if self.transport.mode().is_paused() {
            silence(data);
            return;
        }

        self.scratch.resize(data.len(), 0.0);
        let filled = self.feed.feed(&mut self.scratch);
        self.scratch[filled..].fill(0.0);

        for (sample, value) in data.iter_mut().zip(&self.scratch) {
            // Just below 1.0 to keep i16 conversion from overflowing
            *sample = T::from_sample((value * self.gain).clamp(-1.0, 0.999_999_9));
        }
    }
}

fn silence<T: cpal::SizedSample + cpal::FromSample<f32>>(data: &mut [T]) {
    for sample in data.iter_mut() {
        *sample = T::from_sample(0.0f32);
    }
}

/// The default output device and its preferred configuration.
pub struct AudioDevice {
    device: cpal::Device,
    config: cpal::SupportedStreamConfig,
}

impl AudioDevice {
    /// Opens the system's default output device.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no output device or its configuration
    /// cannot be read.
    pub fn default_output() -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Audio("No audio output device found".to_string()))?;

        let config = device
            .default_output_config()
            .map_err(|e| Error::Audio(format!("Failed to get audio config: {e}")))?;

        Ok(Self { device, config })
    }

    /// Format the decoder must deliver samples in.
    #[must_use]
    pub fn format(&self) -> AudioTrackInfo {
        AudioTrackInfo {
            sample_rate: self.config.sample_rate(),
            channels: self.config.channels(),
        }
    }
}

impl std::fmt::Debug for AudioDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioDevice")
            .field("format", &self.format())
            .field("sample_format", &self.config.sample_format())
            .finish_non_exhaustive()
    }
}

/// A running output stream driven by an [`AudioFeed`].
pub struct AudioOutput {
    format: AudioTrackInfo,
    /// Kept alive to keep the stream playing.
    _stream: cpal::Stream,
}

impl AudioOutput {
    /// Builds and starts the output stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the device's sample format is unsupported or the
    /// stream fails to build or start.
    pub fn start(
        device: &AudioDevice,
        feed: AudioFeed,
        transport: SharedTransport,
        volume: Volume,
        muted: bool,
    ) -> Result<Self> {
        let renderer = Renderer {
            feed,
            transport,
            gain: output_gain(volume, muted),
            scratch: Vec::new(),
        };

        let config: cpal::StreamConfig = device.config.clone().into();
        let stream = match device.config.sample_format() {
            cpal::SampleFormat::F32 => Self::build_stream::<f32>(&device.device, &config, renderer)?,
            cpal::SampleFormat::I16 => Self::build_stream::<i16>(&device.device, &config, renderer)?,
            cpal::SampleFormat::U16 => Self::build_stream::<u16>(&device.device, &config, renderer)?,
            other => {
                return Err(Error::Audio(format!(
                    "Unsupported audio sample format: {other:?}"
                )))
            }
        };

        stream
            .play()
            .map_err(|e| Error::Audio(format!("Failed to start audio stream: {e}")))?;

        let format = device.format();
        log::info!(
            "Audio output started: {} Hz, {} channels",
            format.sample_rate,
            format.channels
        );

        Ok(Self {
            format,
            _stream: stream,
        })
    }

    fn build_stream<T: cpal::SizedSample + cpal::FromSample<f32>>(
        device: &cpal::Device,
        config: &cpal::StreamConfig,
        mut renderer: Renderer,
    ) -> Result<cpal::Stream> {
        device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| renderer.render(data),
                |err| log::error!("Audio output error: {err}"),
                None,
            )
            .map_err(|e| Error::Audio(format!("Failed to build audio stream: {e}")))
    }

    #[must_use]
    pub fn format(&self) -> AudioTrackInfo {
        self.format
    }
}

impl std::fmt::Debug for AudioOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioOutput")
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}
