//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ServiceConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variables read on top of the file (or defaults).
pub const ENV_SERVICE_NAME: &str = "SERVICE_NAME";
pub const ENV_EXPORTER_ENDPOINT: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";
pub const ENV_INSECURE_MODE: &str = "INSECURE_MODE";
pub const ENV_SERVER_PORT: &str = "SERVER_PORT";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a TOML document without validating it.
pub fn parse_config(content: &str) -> Result<ServiceConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Build the effective configuration: file (if any) or defaults, then
/// environment overrides, then validation.
pub fn load_config(path: Option<&Path>) -> Result<ServiceConfig, ConfigError> {
    let mut config = match path {
        Some(path) => parse_config(&fs::read_to_string(path)?)?,
        None => ServiceConfig::default(),
    };

    apply_env_overrides(&mut config, |key| {
        std::env::var(key).ok().filter(|value| !value.is_empty())
    });

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Apply the supported environment overrides using `lookup` to read them.
pub fn apply_env_overrides(config: &mut ServiceConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(name) = lookup(ENV_SERVICE_NAME) {
        config.service.name = name;
    }
    if let Some(endpoint) = lookup(ENV_EXPORTER_ENDPOINT) {
        config.exporter.endpoint = endpoint;
    }
    if let Some(insecure) = lookup(ENV_INSECURE_MODE) {
        config.exporter.insecure = parse_insecure_flag(&insecure);
    }
    if let Some(port) = lookup(ENV_SERVER_PORT) {
        config.listener.bind_address = bind_address_from_port(&port);
    }
}

/// Only an explicit `false`, `0` or `f` (any case) selects a secure
/// transport. Anything else stays insecure.
pub fn parse_insecure_flag(value: &str) -> bool {
    let value = value.trim().to_ascii_lowercase();
    !matches!(value.as_str(), "false" | "0" | "f")
}

/// Accepts `:8080`, `8080` or a full `host:port`.
pub fn bind_address_from_port(value: &str) -> String {
    let value = value.trim();
    if let Some(port) = value.strip_prefix(':') {
        format!("0.0.0.0:{}", port)
    } else if value.chars().all(|c| c.is_ascii_digit()) {
        format!("0.0.0.0:{}", value)
    } else {
        value.to_string()
    }
}
