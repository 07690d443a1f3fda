//! Configuration validation
//!
//! Validates configuration and reports issues.

use secrecy::ExposeSecret;

use super::types::{Config, StorageBackendType};

/// Result of configuration validation
#[derive(Debug, Clone)]
pub struct ConfigValidationResult {
    /// Whether the config is valid
    pub valid: bool,
    /// Validation errors (critical)
    pub errors: Vec<ValidationIssue>,
    /// Validation warnings (non-critical)
    pub warnings: Vec<ValidationIssue>,
}

impl ConfigValidationResult {
    /// Create a valid result
    pub fn valid() -> Self {
        ConfigValidationResult {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Add an error
    pub fn with_error(mut self, issue: ValidationIssue) -> Self {
        self.valid = false;
        self.errors.push(issue);
        self
    }

    /// Add a warning
    pub fn with_warning(mut self, issue: ValidationIssue) -> Self {
        self.warnings.push(issue);
        self
    }
}

/// A validation issue
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Path to the config field
    pub path: String,
    /// Issue message
    pub message: String,
    /// Suggested fix
    pub suggestion: Option<String>,
}

impl ValidationIssue {
    /// Create a new issue
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationIssue {
            path: path.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    /// Add a suggestion
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, " ({})", suggestion)?;
        }
        Ok(())
    }
}

/// Validate the configuration
pub fn validate_config(config: &Config) -> ConfigValidationResult {
    let mut result = ConfigValidationResult::valid();

    result = validate_gateway_config(config, result);
    result = validate_storage_config(config, result);

    result
}

fn validate_gateway_config(config: &Config, mut result: ConfigValidationResult) -> ConfigValidationResult {
    let gateway = &config.gateway;

    let has_key = gateway
        .api_key
        .as_ref()
        .is_some_and(|key| !key.expose_secret().is_empty());
    if !has_key {
        result = result.with_warning(
            ValidationIssue::new(
                "gateway.api_key",
                "No gateway API key configured. Downstream HTTP pushes will be rejected.",
            )
            .with_suggestion("Set GCM_API_KEY environment variable or configure gateway.api_key"),
        );
    }

    if gateway.sender_id.is_empty() {
        result = result.with_warning(
            ValidationIssue::new("gateway.sender_id", "No sender ID configured")
                .with_suggestion("Set GCM_SENDER_ID environment variable"),
        );
    }

    if let Err(e) = url::Url::parse(&gateway.http_endpoint) {
        result = result.with_error(ValidationIssue::new(
            "gateway.http_endpoint",
            format!("Invalid URL: {}", e),
        ));
    }

    if let Err(e) = url::Url::parse(&gateway.bridge_url) {
        result = result.with_error(
            ValidationIssue::new("gateway.bridge_url", format!("Invalid URL: {}", e))
                .with_suggestion("Point gateway.bridge_url at the XMPP connection bridge"),
        );
    }

    if gateway.ack_timeout_secs == 0 || gateway.request_timeout_secs == 0 {
        result = result.with_error(ValidationIssue::new(
            "gateway",
            "Timeouts must be at least one second",
        ));
    }

    if gateway.inbound_buffer == 0 {
        result = result.with_error(ValidationIssue::new(
            "gateway.inbound_buffer",
            "Inbound buffer must hold at least one event",
        ));
    }

    result
}

fn validate_storage_config(config: &Config, mut result: ConfigValidationResult) -> ConfigValidationResult {
    if config.storage.backend == StorageBackendType::Postgres && config.storage.postgres.is_none() {
        result = result.with_error(
            ValidationIssue::new(
                "storage.postgres",
                "PostgreSQL backend selected but not configured",
            )
            .with_suggestion("Set DATABASE_URL environment variable or configure storage.postgres"),
        );
    }

    if config.storage.backend == StorageBackendType::Memory {
        result = result.with_warning(ValidationIssue::new(
            "storage.backend",
            "In-memory registry: registrations are lost on restart",
        ));
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        let config = Config::default();
        let result = validate_config(&config);

        // Default config should have warnings but no errors
        assert!(result.valid);
        assert!(result.errors.is_empty());
        assert!(!result.warnings.is_empty());
    }

    #[test]
    fn test_postgres_without_settings_is_error() {
        let mut config = Config::default();
        config.storage.backend = StorageBackendType::Postgres;

        let result = validate_config(&config);
        assert!(!result.valid);
        assert_eq!(result.errors[0].path, "storage.postgres");
    }

    #[test]
    fn test_bad_bridge_url_is_error() {
        let mut config = Config::default();
        config.gateway.bridge_url = "not a url".to_string();

        let result = validate_config(&config);
        assert!(result.errors.iter().any(|i| i.path == "gateway.bridge_url"));
    }
}
