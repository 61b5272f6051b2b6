//! Mixer error type

use thiserror::Error;

/// Errors reported by the mixer control plane and lifecycle calls.
///
/// A returned error always means nothing was changed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MixerError {
    #[error("Invalid channel index: {0}")]
    InvalidChannel(u32),
    #[error("Channel {0} has no decode source assigned")]
    NotAssigned(u32),
    #[error("Channel {0} already has a decode source assigned")]
    AlreadyAssigned(u32),
    #[error("Invalid parameter: {0}")]
    InvalidParameter(&'static str),
    #[error("Mixer is already initialized")]
    AlreadyInitialized,
    #[error("Mixer is not initialized")]
    NotInitialized,
    #[error("Out of memory allocating mixer buffers")]
    Allocation,
    #[error("Audio backend error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, MixerError>;
