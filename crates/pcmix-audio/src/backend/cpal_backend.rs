//! cpal audio backend

use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use pcmix_core::{backend_debug, backend_trace};

use crate::error::{MixerError, Result};
use crate::mixer::Mixer;

fn backend_error(err: impl std::fmt::Display) -> MixerError {
    MixerError::Backend(err.to_string())
}

/// Plays the mixer through the default output device. The device callback
/// pulls samples straight from the mixer, so no audio thread is needed.
pub struct CpalBackend {
    stream: cpal::Stream,
    sample_rate: u32,
}

impl CpalBackend {
    /// Open the default output device as a stereo stream at the mixer's
    /// rate. The stream stays paused until [`start`](Self::start).
    pub fn new(mixer: Arc<Mixer>) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| MixerError::Backend("no output device available".into()))?;
        let sample_format = device
            .default_output_config()
            .map_err(backend_error)?
            .sample_format();

        let sample_rate = mixer.mix_rate();
        let config = cpal::StreamConfig {
            channels: 2,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };
        let on_error = |err| tracing::error!("Audio stream error: {}", err);

        let stream = match sample_format {
            cpal::SampleFormat::I16 => device.build_output_stream(
                &config,
                move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                    mixer.get_pcm(data);
                },
                on_error,
                None,
            ),
            cpal::SampleFormat::F32 => {
                let mut scratch: Vec<i16> = Vec::new();
                device.build_output_stream(
                    &config,
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        scratch.resize(data.len(), 0);
                        mixer.get_pcm(&mut scratch);
                        for (out, &sample) in data.iter_mut().zip(&scratch) {
                            *out = f32::from(sample) / 32768.0;
                        }
                        backend_trace!("Rendered {} frames", data.len() / 2);
                    },
                    on_error,
                    None,
                )
            }
            other => {
                return Err(MixerError::Backend(format!(
                    "unsupported sample format {:?}",
                    other
                )))
            }
        }
        .map_err(backend_error)?;

        backend_debug!(
            "Opened cpal output at {} Hz ({:?})",
            sample_rate,
            sample_format
        );
        Ok(Self {
            stream,
            sample_rate,
        })
    }

    /// Output sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Start pulling from the mixer
    pub fn start(&self) -> Result<()> {
        self.stream.play().map_err(backend_error)
    }

    /// Pause output; the mixer is left untouched
    pub fn stop(&self) -> Result<()> {
        self.stream.pause().map_err(backend_error)
    }
}
