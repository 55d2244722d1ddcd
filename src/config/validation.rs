//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (caps > 0, windows > 0, sane backoff)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GovernorConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use crate::config::schema::GovernorConfig;

/// A single semantic validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field (e.g. "scheduler.max_concurrent").
    pub field: String,
    /// Human-readable description of the violation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a configuration, collecting every violation.
pub fn validate_config(config: &GovernorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.scheduler.max_concurrent == 0 {
        errors.push(ValidationError {
            field: "scheduler.max_concurrent".into(),
            message: "must be greater than zero".into(),
        });
    }

    if config.rate_limit.max_requests == 0 {
        errors.push(ValidationError {
            field: "rate_limit.max_requests".into(),
            message: "must be greater than zero".into(),
        });
    }
    if config.rate_limit.window_ms == 0 {
        errors.push(ValidationError {
            field: "rate_limit.window_ms".into(),
            message: "must be greater than zero".into(),
        });
    }

    if config.retries.backoff_multiplier < 1.0 {
        errors.push(ValidationError {
            field: "retries.backoff_multiplier".into(),
            message: "must be at least 1.0".into(),
        });
    }
    if config.retries.initial_delay_ms > config.retries.max_delay_ms {
        errors.push(ValidationError {
            field: "retries.initial_delay_ms".into(),
            message: "must not exceed retries.max_delay_ms".into(),
        });
    }
    if config.retries.enabled && config.retries.retryable_statuses.is_empty() {
        errors.push(ValidationError {
            field: "retries.retryable_statuses".into(),
            message: "must be non-empty when retries are enabled".into(),
        });
    }

    if config.timeouts.request_ms == 0 {
        errors.push(ValidationError {
            field: "timeouts.request_ms".into(),
            message: "must be greater than zero".into(),
        });
    }

    if !LOG_LEVELS.contains(&config.observability.log_level.as_str()) {
        errors.push(ValidationError {
            field: "observability.log_level".into(),
            message: format!(
                "unrecognized level '{}' (expected one of {})",
                config.observability.log_level,
                LOG_LEVELS.join(", ")
            ),
        });
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
        assert!(validate_config(&GovernorConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = GovernorConfig::default();
        config.scheduler.max_concurrent = 0;
        config.rate_limit.window_ms = 0;
        config.retries.backoff_multiplier = 0.5;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().any(|e| e.field == "scheduler.max_concurrent"));
    }

    #[test]
    fn test_rejects_unknown_log_level() {
        let mut config = GovernorConfig::default();
        config.observability.log_level = "verbose".into();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "observability.log_level");
    }
}
