//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals > 0, rates within [0, 1])
//! - Validate addresses parse before anything binds
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::ServiceConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.service.name.trim().is_empty() {
        errors.push(ValidationError::new("service.name", "must not be empty"));
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("{:?} is not a socket address", config.listener.bind_address),
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    let exporter = &config.exporter;
    if exporter.endpoint.trim().is_empty() {
        errors.push(ValidationError::new("exporter.endpoint", "must not be empty"));
    }
    if exporter.interval_secs == 0 {
        errors.push(ValidationError::new("exporter.interval_secs", "must be greater than 0"));
    }
    if exporter.timeout_secs == 0 {
        errors.push(ValidationError::new("exporter.timeout_secs", "must be greater than 0"));
    } else if exporter.timeout_secs > exporter.interval_secs {
        errors.push(ValidationError::new(
            "exporter.timeout_secs",
            "must not exceed exporter.interval_secs",
        ));
    }
    if exporter.max_pending_batches == 0 {
        errors.push(ValidationError::new("exporter.max_pending_batches", "must be greater than 0"));
    }
    if exporter.max_queued_spans == 0 {
        errors.push(ValidationError::new("exporter.max_queued_spans", "must be greater than 0"));
    }

    let observability = &config.observability;
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("{:?} is not a socket address", observability.metrics_address),
        ));
    }

    for (field, rate) in [
        ("simulation.server_error_rate", config.simulation.server_error_rate),
        ("simulation.client_error_rate", config.simulation.client_error_rate),
    ] {
        if !(0.0..=1.0).contains(&rate) {
            errors.push(ValidationError::new(field, "must be between 0 and 1"));
        }
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
        assert_eq!(validate_config(&ServiceConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = ServiceConfig::default();
        config.service.name = " ".into();
        config.listener.bind_address = ":8080".into();
        config.exporter.interval_secs = 0;
        config.exporter.max_pending_batches = 0;
        config.simulation.client_error_rate = 1.5;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "service.name",
                "listener.bind_address",
                "exporter.interval_secs",
                "exporter.timeout_secs",
                "exporter.max_pending_batches",
                "simulation.client_error_rate",
            ]
        );
    }

    #[test]
    fn test_metrics_address_only_checked_when_enabled() {
        let mut config = ServiceConfig::default();
        config.observability.metrics_address = "nowhere".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "observability.metrics_address");
    }
}
