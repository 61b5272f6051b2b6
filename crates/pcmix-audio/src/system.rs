//! Init/cleanup facade around the mixer

use std::sync::Arc;

use parking_lot::RwLock;
use pcmix_core::config::MixerConfig;

use crate::channel::ChannelState;
use crate::error::{MixerError, Result};
use crate::mixer::Mixer;
use crate::source::DecodeSource;

/// Process-facing entry point for the mixer.
///
/// Output backends may call [`get_pcm`](Self::get_pcm) at any time: before
/// [`init`](Self::init) or after [`cleanup`](Self::cleanup) it produces
/// silence. Control calls made while uninitialized fail with
/// [`MixerError::NotInitialized`].
#[derive(Default)]
pub struct MixerSystem {
    mixer: RwLock<Option<Arc<Mixer>>>,
}

impl MixerSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the mixer. Fails without side effects if a mixer already
    /// exists or the parameters are rejected.
    pub fn init(&self, num_channels: u32, mix_rate: u32) -> Result<()> {
        let mut slot = self.mixer.write();
        if slot.is_some() {
            pcmix_core::mixer_warn!("Mixer init called twice");
            return Err(MixerError::AlreadyInitialized);
        }
        *slot = Some(Arc::new(Mixer::new(num_channels, mix_rate)?));
        Ok(())
    }

    /// Create the mixer from configuration, including its base volume
    pub fn init_with_config(&self, config: &MixerConfig) -> Result<()> {
        self.init(config.num_channels, config.mix_rate)?;
        self.with_mixer(|mixer| {
            mixer.set_base_volume(config.base_volume);
            Ok(())
        })
    }

    /// Reset every channel and release the mixer. Backends still holding
    /// the [`Arc<Mixer>`] from [`mixer`](Self::mixer) keep a silent mixer
    /// until they let go of it.
    pub fn cleanup(&self) {
        let mixer = self.mixer.write().take();
        if let Some(mixer) = mixer {
            mixer.reset_all();
            tracing::info!("Mixer cleaned up");
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.mixer.read().is_some()
    }

    /// Shared handle for output backends
    pub fn mixer(&self) -> Option<Arc<Mixer>> {
        self.mixer.read().clone()
    }

    fn with_mixer<T>(&self, f: impl FnOnce(&Mixer) -> Result<T>) -> Result<T> {
        match self.mixer.read().as_deref() {
            Some(mixer) => f(mixer),
            None => Err(MixerError::NotInitialized),
        }
    }

    /// Mix `output.len() / 2` interleaved stereo samples, or silence when
    /// uninitialized
    pub fn get_pcm(&self, output: &mut [i16]) {
        match self.mixer() {
            Some(mixer) => mixer.get_pcm(output),
            None => output.fill(0),
        }
    }

    pub fn set_base_volume(&self, volume: f32) -> Result<()> {
        self.with_mixer(|mixer| {
            mixer.set_base_volume(volume);
            Ok(())
        })
    }

    pub fn assign<S>(&self, channel: u32, source: S, is_stereo: bool) -> Result<()>
    where
        S: DecodeSource + 'static,
    {
        self.with_mixer(|mixer| mixer.assign(channel, source, is_stereo))
    }

    pub fn set_volume(&self, channel: u32, volume: f32) -> Result<()> {
        self.with_mixer(|mixer| mixer.set_volume(channel, volume))
    }

    pub fn set_pan(&self, channel: u32, pan: f32) -> Result<()> {
        self.with_mixer(|mixer| mixer.set_pan(channel, pan))
    }

    pub fn set_fade(&self, channel: u32, target: f32, length: f32, cut: bool) -> Result<()> {
        self.with_mixer(|mixer| mixer.set_fade(channel, target, length, cut))
    }

    pub fn start(&self, channel: u32) -> Result<()> {
        self.with_mixer(|mixer| mixer.start(channel))
    }

    pub fn stop(&self, channel: u32) -> Result<()> {
        self.with_mixer(|mixer| mixer.stop(channel))
    }

    pub fn reset(&self, channel: u32) -> Result<()> {
        self.with_mixer(|mixer| mixer.reset(channel))
    }

    /// Whether a channel is playing; `false` when uninitialized
    pub fn status(&self, channel: u32) -> bool {
        self.with_mixer(|mixer| Ok(mixer.status(channel)))
            .unwrap_or(false)
    }

    pub fn state(&self, channel: u32) -> Option<ChannelState> {
        self.with_mixer(|mixer| Ok(mixer.state(channel))).ok().flatten()
    }
}
