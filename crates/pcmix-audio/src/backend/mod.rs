//! Audio output backends
//!
//! Push backends implement [`AudioBackend`] and are fed by an
//! [`AudioThread`](crate::thread::AudioThread). The cpal backend pulls from
//! the mixer inside the device callback instead.

use crate::error::Result;

#[cfg(feature = "cpal")]
pub mod cpal_backend;
pub mod null;

#[cfg(feature = "cpal")]
pub use cpal_backend::CpalBackend;
pub use null::NullAudioBackend;

/// Backend interface used by the audio thread
pub trait AudioBackend: Send {
    /// Prepare the backend for playback
    fn start(&mut self) -> Result<()>;
    /// Stop playback and release resources
    fn stop(&mut self);
    /// Submit a buffer of interleaved 16-bit stereo samples
    fn play_samples(&mut self, samples: &[i16]) -> Result<()>;
}
