//! Configuration validation utilities.

use thiserror::Error;

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse YAML configuration.
    #[error("failed to parse YAML config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// Failed to parse TOML configuration.
    #[error("failed to parse TOML config: {0}")]
    TomlError(#[from] toml::de::Error),

    /// Configuration validation failed.
    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// Expand environment variables in a string.
/// Supports ${VAR} and ${VAR:-default} syntax.
pub fn expand_env_vars(input: &str) -> String {
    static ENV_VAR_REGEX: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();

    let regex = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("failed to compile env var regex")
    });

    regex
        .replace_all(input, |caps: &regex::Captures| {
            let var_name = &caps[1];
            let default_value = caps.get(2).map(|m| m.as_str()).unwrap_or("");
            std::env::var(var_name).unwrap_or_else(|_| default_value.to_string())
        })
        .into_owned()
}

/// Reject values that would break a line-protocol record.
pub(crate) fn require_single_line(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::ValidationError(format!(
            "{field} cannot be empty"
        )));
    }
    if value.contains(['\n', '\r']) {
        return Err(ConfigError::ValidationError(format!(
            "{field} cannot contain line breaks"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_env_vars_no_vars() {
        assert_eq!(expand_env_vars("plain-password"), "plain-password");
    }

    #[test]
    fn test_expand_env_vars_with_default() {
        let result = expand_env_vars("${PINGFLUX_NONEXISTENT_PASSWORD_4711:-fallback}");
        assert_eq!(result, "fallback");
    }

    #[test]
    fn test_expand_env_vars_from_env() {
        // SAFETY: only this test touches this variable.
        unsafe {
            std::env::set_var("PINGFLUX_TEST_EXPAND", "s3cret");
        }
        assert_eq!(expand_env_vars("pw-${PINGFLUX_TEST_EXPAND}"), "pw-s3cret");
        // SAFETY: cleanup of the variable set above.
        unsafe {
            std::env::remove_var("PINGFLUX_TEST_EXPAND");
        }
    }

    #[test]
    fn test_require_single_line() {
        assert!(require_single_line("database", "telegraf").is_ok());
        assert!(require_single_line("database", "  ").is_err());
        let err = require_single_line("measurement", "ping\nx").unwrap_err();
        assert!(err.to_string().contains("line breaks"));
    }
}
