//! pcmix demo
//!
//! Mixes two tones through the configured output: a mono tone panned left
//! that fades out and cuts, and a stereo tone that fades in.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use pcmix_audio::{AudioThread, Mixer, MixerSystem, ToneSource};
use pcmix_core::config::{BackendKind, Config};

/// Whatever is pulling audio out of the mixer
enum Output {
    Thread(AudioThread),
    #[cfg(feature = "cpal")]
    Cpal(pcmix_audio::backend::CpalBackend),
}

impl Output {
    fn open(config: &Config, mixer: Arc<Mixer>) -> Result<Self> {
        let period = config.mixer.period as usize;
        match config.audio.backend {
            #[cfg(feature = "cpal")]
            BackendKind::Cpal if config.audio.enable => {
                let backend = pcmix_audio::backend::CpalBackend::new(mixer)?;
                backend.start()?;
                Ok(Self::Cpal(backend))
            }
            #[cfg(not(feature = "cpal"))]
            BackendKind::Cpal if config.audio.enable => {
                tracing::warn!("Built without the cpal feature; using the null backend");
                Self::null(mixer, period)
            }
            _ => Self::null(mixer, period),
        }
    }

    fn null(mixer: Arc<Mixer>, period: usize) -> Result<Self> {
        let mut thread = AudioThread::new(mixer, period);
        thread.start()?;
        tracing::info!("Null output pulling {} samples per period", thread.period());
        Ok(Self::Thread(thread))
    }

    fn stop(self) -> Result<()> {
        match self {
            Self::Thread(mut thread) => thread.stop(),
            #[cfg(feature = "cpal")]
            Self::Cpal(backend) => backend.stop()?,
        }
        Ok(())
    }
}

fn main() -> Result<()> {
    let config = Config::load().unwrap_or_default();
    pcmix_core::logging::init(&config);

    tracing::info!("Starting pcmix");

    let system = MixerSystem::new();
    system
        .init_with_config(&config.mixer)
        .context("failed to initialize mixer")?;
    let rate = config.mixer.mix_rate;

    system.assign(1, ToneSource::new(440.0, 8000, rate), false)?;
    system.set_pan(1, -0.75)?;
    system.start(1)?;

    let pad = ToneSource::new(659.25, 6000, rate)
        .stereo(true)
        .limited(u64::from(rate) * 4);
    let stereo = pad.is_stereo();
    system.assign(2, pad, stereo)?;
    system.set_volume(2, 0.0)?;
    system.set_fade(2, 0.8, 1.0, false)?;
    system.start(2)?;

    let mixer = system.mixer().context("mixer missing after init")?;
    let output = Output::open(&config, mixer)?;

    std::thread::sleep(Duration::from_secs(1));
    system.set_fade(1, 0.0, 1.5, true)?;
    std::thread::sleep(Duration::from_secs(2));

    tracing::info!(
        "Channel 1 playing: {}, channel 2 playing: {}",
        system.status(1),
        system.status(2)
    );

    output.stop()?;
    system.cleanup();
    Ok(())
}
