//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: MuxConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::MuxConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Label keys the usage reporter sets itself.
pub const RESERVED_LABELS: [&str; 2] = ["datacenter", "namespace"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("usage.datacenter must not be empty")]
    EmptyDatacenter,

    #[error("usage.labels: {0:?} is set by the reporter and cannot be overridden")]
    ReservedLabel(String),

    #[error("observability.log_level: unknown level {0:?}")]
    UnknownLogLevel(String),
}

pub fn validate_config(config: &MuxConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::Zero {
            field: "listener.max_connections",
        });
    }
    if config.listener.classify_timeout_secs == 0 {
        errors.push(ValidationError::Zero {
            field: "listener.classify_timeout_secs",
        });
    }
    if config.rpc.request_timeout_secs == 0 {
        errors.push(ValidationError::Zero {
            field: "rpc.request_timeout_secs",
        });
    }

    if config.usage.enabled {
        if config.usage.datacenter.trim().is_empty() {
            errors.push(ValidationError::EmptyDatacenter);
        }
        if config.usage.reporting_interval_secs == 0 {
            errors.push(ValidationError::Zero {
                field: "usage.reporting_interval_secs",
            });
        }
        for key in config.usage.labels.keys() {
            if RESERVED_LABELS.contains(&key.as_str()) {
                errors.push(ValidationError::ReservedLabel(key.clone()));
            }
        }
    }

    if !LOG_LEVELS.contains(&config.observability.log_level.as_str()) {
        errors.push(ValidationError::UnknownLogLevel(
            config.observability.log_level.clone(),
        ));
    }
    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
