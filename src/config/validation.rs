//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses, route paths and header names
//! - Validate value ranges (timeouts > 0, limits > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;
use std::str::FromStr;

use axum::http::{uri::Authority, HeaderName};
use thiserror::Error;

use crate::config::schema::GatewayConfig;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: '{value}' is not a valid socket address")]
    InvalidBindAddress { field: &'static str, value: String },
    #[error("{field}: '{value}' is not a valid host:port authority")]
    InvalidAuthority { field: &'static str, value: String },
    #[error("{field}: '{value}' must start with '/' and must not contain '*'")]
    InvalidPath { field: &'static str, value: String },
    #[error("routes.base_path: '{0}' must not end with '/'")]
    TrailingSlash(String),
    #[error("auth.identity_header: '{0}' is not a valid header name")]
    InvalidHeaderName(String),
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("auth.users: empty username")]
    EmptyUsername,
    #[error("auth.users: duplicate username '{0}'")]
    DuplicateUser(String),
}

/// Validate a deserialized configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_socket_addr(&mut errors, "listener.bind_address", &config.listener.bind_address);
    check_socket_addr(&mut errors, "forwarder.bind_address", &config.forwarder.bind_address);
    check_authority(&mut errors, "backend.address", &config.backend.address);
    check_authority(&mut errors, "forwarder.backend_address", &config.forwarder.backend_address);
    if config.observability.metrics_enabled {
        check_socket_addr(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    let routes = &config.routes;
    check_path(&mut errors, "routes.base_path", &routes.base_path);
    if routes.base_path.len() > 1 && routes.base_path.ends_with('/') {
        errors.push(ValidationError::TrailingSlash(routes.base_path.clone()));
    }
    check_path(&mut errors, "routes.login_path", &routes.login_path);
    check_path(&mut errors, "routes.command_path", &routes.command_path);

    if HeaderName::from_str(&config.auth.identity_header).is_err() {
        errors.push(ValidationError::InvalidHeaderName(config.auth.identity_header.clone()));
    }

    let mut seen = HashSet::new();
    for user in &config.auth.users {
        if user.username.is_empty() {
            errors.push(ValidationError::EmptyUsername);
        } else if !seen.insert(user.username.as_str()) {
            errors.push(ValidationError::DuplicateUser(user.username.clone()));
        }
    }

    if config.listener.max_connections == 0 {
        errors.push(ValidationError::Zero("listener.max_connections"));
    }
    if config.forwarder.max_connections == 0 {
        errors.push(ValidationError::Zero("forwarder.max_connections"));
    }
    if config.auth.max_payload_bytes == 0 {
        errors.push(ValidationError::Zero("auth.max_payload_bytes"));
    }
    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.connect_secs"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.request_secs"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_socket_addr(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress {
            field,
            value: value.to_string(),
        });
    }
}

fn check_authority(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    let valid = Authority::from_str(value)
        .map(|a| a.port_u16().is_some() && !a.host().is_empty())
        .unwrap_or(false);
    if !valid {
        errors.push(ValidationError::InvalidAuthority {
            field,
            value: value.to_string(),
        });
    }
}

fn check_path(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if !value.starts_with('/') || value.contains('*') {
        errors.push(ValidationError::InvalidPath {
            field,
            value: value.to_string(),
        });
    }
}
