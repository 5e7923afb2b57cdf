//! Logging utilities and structured logging support

pub use log::{debug, error, info, trace, warn};

use crate::core::config::LoggingConfig;

/// Initialize the logging system from `RUST_LOG`
pub fn init() {
    env_logger::init();
}

/// Initialize the logging system from a [`LoggingConfig`].
///
/// `RUST_LOG` still wins when it is set. Calling this more than once is
/// harmless; later calls leave the first logger in place.
pub fn init_with_config(config: &LoggingConfig) {
    let mut builder = env_logger::Builder::new();
    builder.parse_filters(&config.filter);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    if !config.timestamps {
        builder.format_timestamp(None);
    }
    if builder.try_init().is_err() {
        log::debug!("Logger already initialized, keeping existing configuration");
    }
}
