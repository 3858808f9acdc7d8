//! Configuration validation module
//!
//! This module provides validation functions for application configuration
//! to ensure all required settings are properly configured.

use url::Url;
use crate::utils::errors::{CampusError, Result};
use super::Settings;

/// Validate all configuration settings
pub fn validate_settings(settings: &Settings) -> Result<()> {
    validate_database_config(&settings.database)?;
    validate_logging_config(&settings.logging)?;
    validate_registration_config(&settings.registration)?;

    Ok(())
}

/// Validate database configuration
fn validate_database_config(config: &super::DatabaseConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(CampusError::Config(
            "Database URL is required".to_string()
        ));
    }

    let url = Url::parse(&config.url)
        .map_err(|e| CampusError::Config(format!("Invalid database URL: {}", e)))?;

    if !matches!(url.scheme(), "postgres" | "postgresql") {
        return Err(CampusError::Config(
            format!("Unsupported database scheme: {}", url.scheme())
        ));
    }

    if config.max_connections == 0 {
        return Err(CampusError::Config(
            "Max connections must be greater than 0".to_string()
        ));
    }

    if config.min_connections > config.max_connections {
        return Err(CampusError::Config(
            "Min connections cannot be greater than max connections".to_string()
        ));
    }

    Ok(())
}

/// Validate logging configuration
fn validate_logging_config(config: &super::LoggingConfig) -> Result<()> {
    if config.level.is_empty() {
        return Err(CampusError::Config(
            "Log level is required".to_string()
        ));
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.level.as_str()) {
        return Err(CampusError::Config(
            format!("Invalid log level: {}. Valid levels: {:?}", config.level, valid_levels)
        ));
    }

    Ok(())
}

/// Validate retry configuration
fn validate_registration_config(config: &super::RegistrationConfig) -> Result<()> {
    if config.max_transaction_retries == 0 {
        return Err(CampusError::Config(
            "At least one transaction retry must be allowed".to_string()
        ));
    }

    Ok(())
}
