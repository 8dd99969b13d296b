//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse, status codes valid)
//! - Check stub routes before they reach the router
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Route conflicts are left to the router, which reports them precisely

use std::fmt;
use std::net::SocketAddr;

use axum::http::{HeaderValue, Method, StatusCode};

use crate::config::schema::AppConfig;

/// A single semantic problem, located by its config key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check every semantic rule and collect all failures.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "server.bind_address",
            format!("'{}' is not a socket address", config.server.bind_address),
        ));
    }
    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "server.request_timeout_secs",
            "must be greater than 0",
        ));
    }
    if config.server.max_body_bytes == 0 {
        errors.push(ValidationError::new(
            "server.max_body_bytes",
            "must be greater than 0",
        ));
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!(
                "'{}' is not a socket address",
                config.observability.metrics_address
            ),
        ));
    }

    for (i, route) in config.routes.iter().enumerate() {
        let field = |name: &str| format!("routes[{i}].{name}");

        if !route.method.eq_ignore_ascii_case("ANY") && Method::from_bytes(route.method.as_bytes()).is_err() {
            errors.push(ValidationError::new(
                field("method"),
                format!("'{}' is not an HTTP method", route.method),
            ));
        }
        if !route.path.starts_with('/') {
            errors.push(ValidationError::new(field("path"), "must begin with '/'"));
        }
        if StatusCode::from_u16(route.status).is_err() {
            errors.push(ValidationError::new(
                field("status"),
                format!("{} is not a valid status code", route.status),
            ));
        }
        if route.content_type.is_empty() || HeaderValue::from_str(&route.content_type).is_err() {
            errors.push(ValidationError::new(
                field("content_type"),
                "must be a non-empty header value",
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
