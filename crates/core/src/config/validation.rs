//! Post-load checks on `AppConfig`.

use crate::config::AppConfig;
use thiserror::Error;

const MAX_WINDOW_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Why a configuration could not be loaded or accepted.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Reject configurations the worker cannot run with.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `cache_version` or `store_prefix` is empty or contains whitespace
    /// - `origin` is not an absolute http(s) URL
    /// - `shell_resources` is empty or `root_document`/a shell entry is not an absolute path
    /// - `api_path_markers` is empty or holds an empty marker
    /// - a staleness window is zero
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    ///
    /// Returns `ConfigError::Missing` if `shell_resources` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [("cache_version", &self.cache_version), ("store_prefix", &self.store_prefix)] {
            if value.is_empty() {
                return Err(invalid(field, "must not be empty"));
            }
            if value.chars().any(char::is_whitespace) {
                return Err(invalid(field, "must not contain whitespace"));
            }
        }

        let origin = self.origin_url()?;
        if !matches!(origin.scheme(), "http" | "https") {
            return Err(invalid("origin", "scheme must be http or https"));
        }

        if self.shell_resources.is_empty() {
            return Err(ConfigError::Missing {
                field: "shell_resources".into(),
                hint: "list at least the root document, e.g. [\"/\", \"/index.html\"]".into(),
            });
        }
        if let Some(bad) = self.shell_resources.iter().find(|p| !p.starts_with('/')) {
            return Err(ConfigError::Invalid {
                field: "shell_resources".into(),
                reason: format!("{bad:?} must start with '/'"),
            });
        }
        if !self.root_document.starts_with('/') {
            return Err(invalid("root_document", "must start with '/'"));
        }

        if self.api_path_markers.is_empty() || self.api_path_markers.iter().any(String::is_empty) {
            return Err(invalid("api_path_markers", "must contain at least one non-empty marker"));
        }

        for (field, secs) in [("api_max_age_secs", self.api_max_age_secs), ("image_max_age_secs", self.image_max_age_secs)] {
            if secs == 0 {
                return Err(invalid(field, "must be greater than 0"));
            }
            if secs > MAX_WINDOW_SECS {
                return Err(invalid(field, "must not exceed 10 years (315360000s)"));
            }
        }

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if !self.shell_resources.contains(&self.root_document) {
            tracing::warn!(
                root_document = %self.root_document,
                "root_document is not part of shell_resources; \
                 navigation fallback will only work once it has been fetched"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_version_whitespace() {
        let config = AppConfig { cache_version: "v 1".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "cache_version"));
    }

    #[test]
    fn test_validate_empty_prefix() {
        let config = AppConfig { store_prefix: String::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "store_prefix"));
    }

    #[test]
    fn test_validate_origin_scheme() {
        let config = AppConfig { origin: "ftp://example.com".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "origin"));
    }

    #[test]
    fn test_validate_empty_shell() {
        let config = AppConfig { shell_resources: vec![], ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Missing { .. })));
    }

    #[test]
    fn test_validate_relative_shell_entry() {
        let config = AppConfig { shell_resources: vec!["index.html".into()], ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "shell_resources"));
    }

    #[test]
    fn test_validate_empty_api_marker() {
        let config = AppConfig { api_path_markers: vec![String::new()], ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "api_path_markers"));
    }

    #[test]
    fn test_validate_zero_window() {
        let config = AppConfig { api_max_age_secs: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "api_max_age_secs"));
    }

    #[test]
    fn test_validate_window_upper_bound() {
        let config = AppConfig { image_max_age_secs: 10_000_000_000_000_000, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "image_max_age_secs"));

        let config = AppConfig { api_max_age_secs: u64::MAX, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "api_max_age_secs"));

        let config = AppConfig { image_max_age_secs: MAX_WINDOW_SECS, ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_timeout_bounds() {
        let config = AppConfig { timeout_ms: 50, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));

        let config = AppConfig { timeout_ms: 300_000, max_bytes: 50 * 1024 * 1024, ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_root_outside_shell_is_allowed() {
        let config = AppConfig { root_document: "/app.html".into(), ..Default::default() };
        assert!(config.validate().is_ok());
    }
}
