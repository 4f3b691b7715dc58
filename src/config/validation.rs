//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate the site base URL and single-user nickname
//! - Validate addresses and value ranges
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>

use std::fmt;
use std::net::SocketAddr;
use url::Url;

use crate::bootstrap::NICKNAME_PATTERN;
use crate::config::schema::AppConfig;

/// One failed check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

impl std::error::Error for ValidationError {}

fn invalid(field: &'static str, reason: impl Into<String>) -> ValidationError {
    ValidationError {
        field,
        reason: reason.into(),
    }
}

/// Check a parsed configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match Url::parse(&config.site.base_url) {
        Ok(url) if url.cannot_be_a_base() => {
            errors.push(invalid("site.base_url", "must be a hierarchical URL"));
        }
        Ok(_) => {}
        Err(e) => errors.push(invalid("site.base_url", e.to_string())),
    }

    if config.site.single_user {
        let nickname = &config.site.single_user_nickname;
        let pattern = format!("^{}$", NICKNAME_PATTERN);
        let valid = regex::Regex::new(&pattern)
            .map(|re| re.is_match(nickname))
            .unwrap_or(false);
        if !valid {
            errors.push(invalid(
                "site.single_user_nickname",
                format!("'{}' is not a valid nickname", nickname),
            ));
        }
    }

    if config.site.version.trim().is_empty() {
        errors.push(invalid("site.version", "must not be empty"));
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(invalid(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(invalid(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(invalid("timeouts.request_secs", "must be greater than zero"));
    }

    if config.stream.window == 0 {
        errors.push(invalid("stream.window", "must be greater than zero"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
