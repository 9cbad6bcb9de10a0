use crate::config::types::{Config, CrawlerConfig, OutputConfig, RetryConfig, RetryMode};
use crate::ConfigError;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_retry_config(&config.retry)?;
    validate_output_config(&config.output)?;

    if config.input.pages_file.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "pages-file cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    validate_domain_pattern(&config.target_domain)?;

    if config.max_concurrent_downloads < 1 || config.max_concurrent_downloads > 256 {
        return Err(ConfigError::Validation(format!(
            "max-concurrent-downloads must be between 1 and 256, got {}",
            config.max_concurrent_downloads
        )));
    }

    if config.download_timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "download-timeout-ms must be >= 100ms, got {}ms",
            config.download_timeout_ms
        )));
    }

    Ok(())
}

/// Validates retry configuration
fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.strategy == RetryMode::Bounded && config.max_attempts < 1 {
        return Err(ConfigError::Validation(
            "max-attempts must be >= 1 for the bounded retry strategy".to_string(),
        ));
    }

    if !config.backoff_multiplier.is_finite() || config.backoff_multiplier < 1.0 {
        return Err(ConfigError::Validation(format!(
            "backoff-multiplier must be a finite number >= 1.0, got {}",
            config.backoff_multiplier
        )));
    }

    if config.max_delay_ms < config.base_delay_ms {
        return Err(ConfigError::Validation(format!(
            "max-delay-ms ({}) must not be smaller than base-delay-ms ({})",
            config.max_delay_ms, config.base_delay_ms
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.mirror_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "mirror-dir cannot be empty".to_string(),
        ));
    }

    // Cleaning "/" or the working directory would delete far more than a mirror
    if config.clean_before_crawl
        && (config.mirror_dir.parent().is_none() || config.mirror_dir == std::path::Path::new("."))
    {
        return Err(ConfigError::Validation(format!(
            "refusing to clean mirror-dir '{}'",
            config.mirror_dir.display()
        )));
    }

    Ok(())
}

/// Validates a domain pattern (supports a leading "*." wildcard)
pub(crate) fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain pattern cannot be empty".to_string(),
        ));
    }

    let domain = pattern.strip_prefix("*.").unwrap_or(pattern);
    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(format!(
            "Pattern '{}' has no domain after the wildcard",
            pattern
        )));
    }

    if !domain
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
        || domain.contains("..")
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' has an empty or malformed label",
            domain
        )));
    }

    Ok(())
}
