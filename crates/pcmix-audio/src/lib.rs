//! Fixed-point multi-channel PCM mixer
//!
//! Channels are fed by [`DecodeSource`]s and controlled through [`Mixer`]
//! (or the [`MixerSystem`] facade). Output backends pull interleaved
//! 16-bit stereo with [`Mixer::get_pcm`].

pub mod backend;
pub mod channel;
pub mod error;
pub mod fixed;
pub mod mix;
pub mod mixer;
pub mod snapshot;
pub mod source;
pub mod system;
pub mod thread;

pub use channel::ChannelState;
pub use error::MixerError;
pub use fixed::{Pan, MIX_ACCUM_BUFLEN};
pub use mixer::Mixer;
pub use source::{DecodeSource, PcmSource, ToneSource};
pub use system::MixerSystem;
pub use thread::AudioThread;
