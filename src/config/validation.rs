//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and cross-field
//! consistency. All problems are reported at once rather than the first one.

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::{GatewayConfig, PolicyConfig};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field}: invalid URL {value:?}")]
    InvalidUrl { field: &'static str, value: String },

    #[error("{field}: must be greater than zero")]
    Zero { field: String },

    #[error("cors.allowed_origins: {0:?} is not an origin (scheme://host[:port])")]
    InvalidOrigin(String),

    #[error("experiments: duplicate id {0:?}")]
    DuplicateExperiment(String),

    #[error("experiments.{0}: needs at least one variant with non-zero weight")]
    EmptyExperiment(String),

    #[error("observability.log_format: expected \"pretty\" or \"json\", got {0:?}")]
    UnknownLogFormat(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if !matches!(config.observability.log_format.as_str(), "pretty" | "json") {
        errors.push(ValidationError::UnknownLogFormat(
            config.observability.log_format.clone(),
        ));
    }

    for (field, value) in [
        ("timeouts.request_secs", config.timeouts.request_secs),
        ("timeouts.upstream_request_secs", config.timeouts.upstream_request_secs),
        ("rate_limit.sweep_interval_secs", config.rate_limit.sweep_interval_secs),
        ("security.max_body_size", config.security.max_body_size as u64),
    ] {
        if value == 0 {
            errors.push(ValidationError::Zero { field: field.to_string() });
        }
    }

    let presets = [
        ("strict", config.rate_limit.strict),
        ("standard", config.rate_limit.standard),
        ("relaxed", config.rate_limit.relaxed),
        ("public", config.rate_limit.public),
    ];
    for (name, preset) in presets {
        check_policy(name, preset, &mut errors);
    }

    for (field, value) in [
        ("youtube.base_url", &config.youtube.base_url),
        ("bitcoin.base_url", &config.bitcoin.base_url),
        ("newsletter.base_url", &config.newsletter.base_url),
    ] {
        if Url::parse(value).is_err() {
            errors.push(ValidationError::InvalidUrl { field, value: value.clone() });
        }
    }

    for origin in &config.cors.allowed_origins {
        if !is_origin(origin) {
            errors.push(ValidationError::InvalidOrigin(origin.clone()));
        }
    }

    let mut seen = HashSet::new();
    for experiment in &config.experiments {
        if !seen.insert(experiment.id.as_str()) {
            errors.push(ValidationError::DuplicateExperiment(experiment.id.clone()));
        }
        if experiment.variants.iter().all(|v| v.weight == 0) {
            errors.push(ValidationError::EmptyExperiment(experiment.id.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_policy(name: &str, preset: PolicyConfig, errors: &mut Vec<ValidationError>) {
    if preset.max_requests == 0 {
        errors.push(ValidationError::Zero {
            field: format!("rate_limit.{name}.max_requests"),
        });
    }
    if preset.window_secs == 0 {
        errors.push(ValidationError::Zero {
            field: format!("rate_limit.{name}.window_secs"),
        });
    }
}

/// Origins are compared byte-for-byte, so they must not carry a path.
fn is_origin(value: &str) -> bool {
    match Url::parse(value) {
        Ok(url) => {
            matches!(url.scheme(), "http" | "https")
                && url.host_str().is_some()
                && url.path() == "/"
                && !value.ends_with('/')
        }
        Err(_) => false,
    }
}
