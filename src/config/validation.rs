//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("lifecycle.max_temp_per_user must be at least 1")]
    ZeroQuota,
    #[error("lifecycle.poll_interval_secs must be at least 1")]
    ZeroPollInterval,
    #[error("lifecycle.watcher_ceiling_secs ({ceiling}) must exceed two poll intervals ({poll}s each)")]
    CeilingTooShort { ceiling: u64, poll: u64 },
    #[error("keepalive.tick_secs must be at least 1")]
    ZeroKeepaliveTick,
    #[error("listen.max_line_length must be at least 64, got {0}")]
    LineLengthTooSmall(usize),
    #[error("store.path parent directory does not exist: {0}")]
    StorePathInvalid(String),
    #[error("bot.token is set but empty")]
    EmptyToken,
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let lifecycle = &config.lifecycle;
    if lifecycle.max_temp_per_user == 0 {
        errors.push(ValidationError::ZeroQuota);
    }
    if lifecycle.poll_interval_secs == 0 {
        errors.push(ValidationError::ZeroPollInterval);
    } else if lifecycle.watcher_ceiling_secs <= lifecycle.poll_interval_secs * 2 {
        // A watcher needs at least one poll plus the debounce before the
        // ceiling, or it can never confirm emptiness.
        errors.push(ValidationError::CeilingTooShort {
            ceiling: lifecycle.watcher_ceiling_secs,
            poll: lifecycle.poll_interval_secs,
        });
    }

    if config.keepalive.tick_secs == 0 {
        errors.push(ValidationError::ZeroKeepaliveTick);
    }

    if config.listen.max_line_length < 64 {
        errors.push(ValidationError::LineLengthTooSmall(
            config.listen.max_line_length,
        ));
    }

    if let Some(parent) = config.store.path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        errors.push(ValidationError::StorePathInvalid(
            config.store.path.display().to_string(),
        ));
    }

    if config.bot.token.as_deref().is_some_and(str::is_empty) {
        errors.push(ValidationError::EmptyToken);
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
    fn test_default_config_passes() {
        let config: Config = toml::from_str("").unwrap();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_zero_quota_fails() {
        let config: Config = toml::from_str("[lifecycle]\nmax_temp_per_user = 0").unwrap();
        let errors = validate(&config).unwrap_err();
        assert!(errors.iter().any(|e| matches!(e, ValidationError::ZeroQuota)));
    }

    #[test]
    fn test_short_ceiling_fails() {
        let toml = r#"
[lifecycle]
poll_interval_secs = 10
watcher_ceiling_secs = 15
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let errors = validate(&config).unwrap_err();
        assert!(
            errors
                .iter()
                .any(|e| matches!(e, ValidationError::CeilingTooShort { .. }))
        );
    }

    #[test]
    fn test_missing_store_directory_fails() {
        let config: Config =
            toml::from_str("[store]\npath = \"/nonexistent/dir/bot_data.json\"").unwrap();
        let errors = validate(&config).unwrap_err();
        assert!(
            errors
                .iter()
                .any(|e| matches!(e, ValidationError::StorePathInvalid(_)))
        );
    }

    #[test]
    fn test_all_errors_are_collected() {
        let toml = r#"
[bot]
token = ""

[lifecycle]
max_temp_per_user = 0
poll_interval_secs = 0

[keepalive]
tick_secs = 0
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let errors = validate(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
    }
}
