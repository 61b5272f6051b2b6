//! Core support for pcmix: configuration, errors and logging

pub mod config;
pub mod error;
pub mod logging;

pub use config::Config;
pub use error::{Error, Result};
