use crate::config::types::{Config, CrawlerConfig, FilterConfig, OutputConfig, SessionConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_session_config(&config.session)?;
    validate_filter_config(&config.filter)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawl loop configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    validate_seconds("crawl_delay", config.crawl_delay)?;
    validate_seconds("error_cooldown", config.error_cooldown)?;

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    Ok(())
}

/// Validates session configuration
fn validate_session_config(config: &SessionConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    validate_seconds("backoff_factor", config.backoff_factor)?;

    if !config.timeout.is_finite() || config.timeout <= 0.0 {
        return Err(ConfigError::Validation(format!(
            "timeout must be > 0 seconds, got {}",
            config.timeout
        )));
    }

    if config.use_proxies {
        for proxy in &config.proxies {
            Url::parse(proxy)
                .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy '{}': {}", proxy, e)))?;
        }
    }

    Ok(())
}

/// Validates blacklist and whitelist patterns
fn validate_filter_config(config: &FilterConfig) -> Result<(), ConfigError> {
    let patterns = config.blacklist.iter().chain(config.whitelist.iter());
    for pattern in patterns {
        if pattern.is_empty() {
            return Err(ConfigError::Validation(
                "filter patterns cannot be empty".to_string(),
            ));
        }
    }
    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    let paths = [
        ("crawled_dir", &config.crawled_dir),
        ("exports_dir", &config.exports_dir),
        ("results_dir", &config.results_dir),
        ("checkpoint_database", &config.checkpoint_database),
    ];

    for (name, value) in paths {
        if value.is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }

    Ok(())
}

fn validate_seconds(name: &str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ConfigError::Validation(format!(
            "{} must be a non-negative number of seconds, got {}",
            name, value
        )));
    }
    Ok(())
}
