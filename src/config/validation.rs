//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (sample rate, intervals, key caps)
//! - Validate logging and listener settings
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: TelemetryConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::TelemetryConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: &[&str] = &["pretty", "json"];

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("analyzer.sample_rate must be within [0, 1], got {0}")]
    SampleRate(f64),

    #[error("tracker.interval_ms must be greater than zero")]
    ZeroInterval,

    #[error("analyzer.max_endpoint_keys must be greater than zero")]
    ZeroEndpointKeys,

    #[error("server.request_timeout_secs must be greater than zero")]
    ZeroTimeout,

    #[error("unknown observability.log_level '{0}'")]
    LogLevel(String),

    #[error("unknown observability.log_format '{0}'")]
    LogFormat(String),

    #[error("server.bind_address '{0}' is not a socket address")]
    BindAddress(String),
}

/// Check every semantic constraint and collect all violations.
pub fn validate_config(config: &TelemetryConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let rate = config.analyzer.sample_rate;
    if !(0.0..=1.0).contains(&rate) {
        errors.push(ValidationError::SampleRate(rate));
    }
    if config.tracker.interval_ms == 0 {
        errors.push(ValidationError::ZeroInterval);
    }
    if config.analyzer.max_endpoint_keys == 0 {
        errors.push(ValidationError::ZeroEndpointKeys);
    }
    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::LogLevel(config.observability.log_level.clone()));
    }
    let format = config.observability.log_format.to_ascii_lowercase();
    if !LOG_FORMATS.contains(&format.as_str()) {
        errors.push(ValidationError::LogFormat(config.observability.log_format.clone()));
    }

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.server.bind_address.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&TelemetryConfig::default()).is_ok());
    }

    #[test]
    fn test_reports_every_violation() {
        let mut config = TelemetryConfig::default();
        config.analyzer.sample_rate = 1.5;
        config.tracker.interval_ms = 0;
        config.observability.log_level = "loud".into();
        config.server.bind_address = "nowhere".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::SampleRate(1.5)));
        assert!(errors.contains(&ValidationError::ZeroInterval));
        assert!(errors.contains(&ValidationError::LogLevel("loud".into())));
        assert!(errors.contains(&ValidationError::BindAddress("nowhere".into())));
    }

    #[test]
    fn test_sample_rate_bounds_are_inclusive() {
        let mut config = TelemetryConfig::default();
        config.analyzer.sample_rate = 0.0;
        assert!(validate_config(&config).is_ok());
        config.analyzer.sample_rate = 1.0;
        assert!(validate_config(&config).is_ok());
        config.analyzer.sample_rate = -0.01;
        assert!(validate_config(&config).is_err());
    }
}
