//! Logging configuration and setup
//!
//! This module provides logging initialization and structured logging utilities
//! for registration lifecycle operations.

use tracing::{debug, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};
use crate::config::LoggingConfig;
use crate::utils::errors::{CampusError, ErrorSeverity, Result};

/// Initialize logging based on configuration
///
/// The returned guard flushes the file appender on drop and must be held
/// for as long as file logging is wanted.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = tracing_subscriber::EnvFilter::try_new(&config.level)
        .map_err(|e| CampusError::Config(format!("Invalid log filter '{}': {}", config.level, e)))?;

    let stdout_layer = if config.json {
        tracing_subscriber::fmt::layer().json().with_writer(std::io::stdout).boxed()
    } else {
        tracing_subscriber::fmt::layer().with_writer(std::io::stdout).boxed()
    };

    let (file_layer, guard) = match &config.file_path {
        Some(directory) => {
            let file_appender = tracing_appender::rolling::daily(directory, "campus-events.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(non_blocking)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| CampusError::Config(format!("Logging already initialized: {}", e)))?;

    info!("Logging initialized with level: {}", config.level);
    Ok(guard)
}

/// Log catalog actions performed by organizers
pub fn log_event_action(event_id: i64, action: &str, user_id: i64, details: Option<&str>) {
    info!(
        event_id = event_id,
        action = action,
        user_id = user_id,
        details = details,
        "Event action performed"
    );
}

/// Log a derived-counter mutation
pub fn log_counter_change(event_id: i64, counter: &str, delta: i32, value: i32) {
    debug!(
        event_id = event_id,
        counter = counter,
        delta = delta,
        value = value,
        "Event counter updated"
    );
}

/// Log a failed operation at a level matching the error's severity
pub fn log_operation_failure(operation: &str, user_id: i64, error: &CampusError) {
    match error.severity() {
        ErrorSeverity::Info => info!(
            operation = operation,
            user_id = user_id,
            code = error.code(),
            "Operation rejected: {}", error
        ),
        ErrorSeverity::Warning => warn!(
            operation = operation,
            user_id = user_id,
            code = error.code(),
            "Operation rejected: {}", error
        ),
        ErrorSeverity::Error | ErrorSeverity::Critical => error!(
            operation = operation,
            user_id = user_id,
            code = error.code(),
            error = %error,
            "Operation failed"
        ),
    }
}
