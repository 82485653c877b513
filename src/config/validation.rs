//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (clap handles syntactic)
//! - Reject values the router or listeners cannot work with
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - A missing listener source is not a validation error; listener
//!   selection reports it so the priority order stays in one place

use std::fmt;

use crate::config::schema::HelperConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a configuration, collecting every error.
pub fn validate_config(config: &HelperConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let path = &config.web.telemetry_path;
    if !path.starts_with('/') {
        errors.push(ValidationError {
            field: "web.telemetry-path",
            message: format!("must start with '/', got {:?}", path),
        });
    } else if let Some(problem) = route_syntax(path) {
        errors.push(ValidationError {
            field: "web.telemetry-path",
            message: format!("{}, got {:?}", problem, path),
        });
    }

    for address in &config.web.listener.listen_addresses {
        if address.trim().is_empty() {
            errors.push(ValidationError {
                field: "web.listen-address",
                message: "must not be empty".to_string(),
            });
        }
    }

    if config.overlay.service_name.trim().is_empty() {
        errors.push(ValidationError {
            field: "web.ziti.service-name",
            message: "must not be empty".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// The telemetry path is a literal route; the router would read captures
/// and wildcards out of it.
fn route_syntax(path: &str) -> Option<&'static str> {
    if path.contains(['{', '}']) {
        return Some("must not contain '{' or '}'");
    }
    if path.split('/').any(|segment| segment.starts_with([':', '*'])) {
        return Some("segments must not start with ':' or '*'");
    }
    None
}
