use crate::config::types::{Config, CrawlConfig, HttpConfig, OutputConfig};
use crate::ConfigError;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_http_config(&config.http)?;
    validate_crawl_config(&config.crawl)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates HTTP session configuration
fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout_secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    Ok(())
}

/// Validates crawl pacing configuration
fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    // Delays of zero are allowed; u64 cannot be negative

    if config.max_retries < 1 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be >= 1, got {}",
            config.max_retries
        )));
    }

    if config.chapters_per_page < 1 {
        return Err(ConfigError::Validation(format!(
            "chapters_per_page must be >= 1, got {}",
            config.chapters_per_page
        )));
    }

    if config.ad_patterns.is_empty() {
        return Err(ConfigError::Validation(
            "ad_patterns must list at least one pattern".to_string(),
        ));
    }

    if config.ad_patterns.iter().any(|p| p.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "ad_patterns cannot contain empty entries".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.directory.is_empty() {
        return Err(ConfigError::Validation(
            "directory cannot be empty".to_string(),
        ));
    }

    if config.language.is_empty() || !config.language.chars().all(|c| c.is_ascii_alphabetic() || c == '-') {
        return Err(ConfigError::Validation(format!(
            "language must be a language tag such as 'vi', got '{}'",
            config.language
        )));
    }

    Ok(())
}
