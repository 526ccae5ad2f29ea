//! Configuration validation.
//!
//! Semantic checks on [`ServiceSettings`] after typed extraction. Returns every
//! problem found, not just the first. Auth authority URLs are checked when the
//! auth gate is composed, not here.

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::ServiceSettings;

const MAX_INDEX_NAME_LEN: usize = 128;

/// A single semantic validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub key: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(key: &'static str, message: impl Into<String>) -> Self {
        Self {
            key,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.message)
    }
}

/// Validate settings, collecting all errors.
pub fn validate_settings(settings: &ServiceSettings) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if settings.search.sync_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "AzureSearchSyncTimeoutSecs",
            "must be greater than zero",
        ));
    }
    if settings.search.sync_max_attempts == 0 {
        errors.push(ValidationError::new(
            "AzureSearchSyncMaxAttempts",
            "must be at least 1",
        ));
    }
    if !is_valid_index_name(&settings.search.index_name) {
        errors.push(ValidationError::new(
            "AzureSearchIndexName",
            format!(
                "'{}' must be at most {} lowercase letters, digits or dashes, starting with a letter or digit",
                settings.search.index_name, MAX_INDEX_NAME_LEN
            ),
        ));
    }
    if settings.discovery.max_attempts == 0 {
        errors.push(ValidationError::new(
            "ServiceDiscovery.MaxAttempts",
            "must be at least 1",
        ));
    }
    if settings.server.request_timeout_secs == 0 {
        errors.push(ValidationError::new("RequestTimeoutSecs", "must be greater than zero"));
    }
    if settings.observability.metrics_enabled
        && settings.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "Metrics.Address",
            format!("'{}' is not a socket address", settings.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Azure Search index naming rules.
fn is_valid_index_name(name: &str) -> bool {
    let is_lower_alnum = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit();
    name.len() <= MAX_INDEX_NAME_LEN
        && name.chars().next().is_some_and(is_lower_alnum)
        && name.chars().all(|c| is_lower_alnum(c) || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        assert!(validate_settings(&ServiceSettings::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut settings = ServiceSettings::default();
        settings.search.sync_timeout_secs = 0;
        settings.search.sync_max_attempts = 0;
        settings.observability.metrics_enabled = true;
        settings.observability.metrics_address = "not-an-address".into();

        let errors = validate_settings(&settings).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().any(|e| e.key == "Metrics.Address"));
    }

    #[test]
    fn test_index_name_characters() {
        let mut settings = ServiceSettings::default();
        settings.search.index_name = "docs_v1".into();
        let errors = validate_settings(&settings).unwrap_err();
        assert_eq!(errors[0].key, "AzureSearchIndexName");
    }

    #[test]
    fn test_index_name_rules() {
        let longest = "a".repeat(128);
        let too_long = "a".repeat(129);
        for name in ["documents", "docs-2024", "7-day-logs", longest.as_str()] {
            assert!(is_valid_index_name(name), "{name}");
        }
        for name in ["", "Documents", "-docs", "docs.v1", too_long.as_str()] {
            assert!(!is_valid_index_name(name), "{name:?}");
        }
    }

    #[test]
    fn test_uppercase_index_name_is_rejected() {
        let mut settings = ServiceSettings::default();
        settings.search.index_name = "Documents".into();
        let errors = validate_settings(&settings).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].key, "AzureSearchIndexName");
    }
}
