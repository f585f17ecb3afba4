use crate::config::job::CrawlJob;
use crate::config::types::{Config, UserAgentConfig};
use crate::url::normalize_url;
use crate::ConfigError;
use url::Url;

/// Upper bound on the worker pool size
pub const MAX_WORKERS: usize = 64;

/// Validates a crawl job before it is started
///
/// Returns the parsed, normalized seed URL so callers do not parse it twice.
///
/// # Errors
///
/// Any violation is reported as a `ConfigError`, which the engine surfaces as `InvalidConfig`:
/// negative `max_depth`, zero `max_pages`, an unparsable or non-HTTP(S) seed, and out-of-range
/// worker counts, timeouts, scoring thresholds or domain patterns.
pub fn validate_job(job: &CrawlJob) -> Result<Url, ConfigError> {
    if job.max_depth < 0 {
        return Err(ConfigError::Validation(format!(
            "max_depth must be >= 0, got {}",
            job.max_depth
        )));
    }

    if job.max_pages == 0 {
        return Err(ConfigError::Validation(
            "max_pages must be > 0".to_string(),
        ));
    }

    let seed = normalize_url(&job.seed_url, None).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", job.seed_url, e))
    })?;

    if job.workers < 1 || job.workers > MAX_WORKERS {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and {}, got {}",
            MAX_WORKERS, job.workers
        )));
    }

    if job.timeout.is_zero() {
        return Err(ConfigError::Validation("timeout must be > 0".to_string()));
    }

    if job.fetch_timeout.is_zero() {
        return Err(ConfigError::Validation(
            "fetch_timeout must be > 0".to_string(),
        ));
    }

    if job.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if let Some(scoring) = &job.scoring {
        if scoring.backend.trim().is_empty() {
            return Err(ConfigError::Validation(
                "scoring backend cannot be empty".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&scoring.threshold) {
            return Err(ConfigError::Validation(format!(
                "scoring threshold must be between 0 and 1, got {}",
                scoring.threshold
            )));
        }
        if scoring.timeout.is_zero() {
            return Err(ConfigError::Validation(
                "scoring timeout must be > 0".to_string(),
            ));
        }
    }

    for pattern in job.allow_domains.iter().chain(job.deny_domains.iter()) {
        validate_domain_pattern(pattern)?;
    }

    Ok(seed)
}

/// Validates the parts of a configuration file that do not end up in a job
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_user_agent_config(&config.user_agent)?;

    if let Some(scorer) = &config.scorer {
        Url::parse(&scorer.endpoint).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid scorer endpoint '{}': {}", scorer.endpoint, e))
        })?;
    }

    if let Some(images) = &config.images {
        if images.directory.trim().is_empty() {
            return Err(ConfigError::Validation(
                "images directory cannot be empty".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)
}

/// Validates a host pattern (supports a leading `*.` wildcard)
fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    let domain = pattern.strip_prefix("*.").unwrap_or(pattern);

    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain pattern '{}' is empty",
            pattern
        )));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
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
            "Domain '{}' has a misplaced '.' or '-'",
            domain
        )));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    let Some((local, domain)) = email.split_once('@') else {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    };

    if local.is_empty() || domain.is_empty() || domain.contains('@') || !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    Ok(())
}
