//! Logging infrastructure for pcmix

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{Config, LogLevel};

/// Map a configured level onto a tracing level (`None` disables logging)
pub fn level_for(log_level: LogLevel) -> Option<Level> {
    match log_level {
        LogLevel::Off => None,
        LogLevel::Error => Some(Level::ERROR),
        LogLevel::Warn => Some(Level::WARN),
        LogLevel::Info => Some(Level::INFO),
        LogLevel::Debug => Some(Level::DEBUG),
        LogLevel::Trace => Some(Level::TRACE),
    }
}

/// Initialize the logging system based on configuration
pub fn init(config: &Config) {
    let Some(level) = level_for(config.debug.log_level) else {
        return;
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    let subscriber = tracing_subscriber::registry().with(filter).with(
        fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true),
    );

    if config.debug.log_to_file {
        if let Ok(file) = std::fs::File::create(&config.debug.log_path) {
            let file_layer = fmt::layer()
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false);
            let _ = subscriber.with(file_layer).try_init();
        } else {
            let _ = subscriber.try_init();
        }
    } else {
        let _ = subscriber.try_init();
    }
}

/// Initialize logging with default settings (for tests and quick starts)
pub fn init_default() {
    let filter = EnvFilter::from_default_env().add_directive(Level::INFO.into());

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .try_init();
}

// Convenience macros for component-specific logging

/// Log a mixer trace message
#[macro_export]
macro_rules! mixer_trace {
    ($($arg:tt)*) => {
        tracing::trace!(target: "mixer", $($arg)*)
    };
}

/// Log a mixer debug message
#[macro_export]
macro_rules! mixer_debug {
    ($($arg:tt)*) => {
        tracing::debug!(target: "mixer", $($arg)*)
    };
}

/// Log a mixer warning (invalid arguments and similar)
#[macro_export]
macro_rules! mixer_warn {
    ($($arg:tt)*) => {
        tracing::warn!(target: "mixer", $($arg)*)
    };
}

/// Log an output backend trace message
#[macro_export]
macro_rules! backend_trace {
    ($($arg:tt)*) => {
        tracing::trace!(target: "backend", $($arg)*)
    };
}

/// Log an output backend debug message
#[macro_export]
macro_rules! backend_debug {
    ($($arg:tt)*) => {
        tracing::debug!(target: "backend", $($arg)*)
    };
}
