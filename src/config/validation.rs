use crate::config::types::{Config, CrawlerConfig, SearchConfig, UserAgentConfig};
use crate::ConfigError;
use crate::url::parse_crawl_url;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_storage_config(&config.storage)?;
    validate_search_config(&config.search)?;
    validate_seeds(&config.seeds)?;
    validate_blacklist(&config.blacklist)?;
    validate_seed_domains(&config.seed_domains)?;

    if config.enrichment.body_text_limit == 0 {
        return Err(ConfigError::Validation(
            "body_text_limit must be >= 1".to_string(),
        ));
    }

    if config.openai.dimensions == 0 {
        return Err(ConfigError::Validation(
            "embedding dimensions must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.follow_redirects && config.max_redirects == 0 {
        return Err(ConfigError::Validation(
            "max_redirects must be >= 1 when follow_redirects is enabled".to_string(),
        ));
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

    validate_email(&config.contact_email)?;

    Ok(())
}

fn validate_storage_config(config: &crate::config::types::StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates search index configuration
fn validate_search_config(config: &SearchConfig) -> Result<(), ConfigError> {
    Url::parse(&config.host)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid search host: {}", e)))?;

    if config.batch_size == 0 {
        return Err(ConfigError::Validation("batch_size must be >= 1".to_string()));
    }

    if config.page_size == 0 {
        return Err(ConfigError::Validation("page_size must be >= 1".to_string()));
    }

    if config.embedding_concurrency == 0 {
        return Err(ConfigError::Validation(
            "embedding_concurrency must be >= 1".to_string(),
        ));
    }

    if !(0.0..=1.0).contains(&config.semantic_ratio) {
        return Err(ConfigError::Validation(format!(
            "semantic_ratio must be between 0.0 and 1.0, got {}",
            config.semantic_ratio
        )));
    }

    if config.properties_index.is_empty() || config.nodes_index.is_empty() {
        return Err(ConfigError::Validation(
            "index names cannot be empty".to_string(),
        ));
    }

    if config.properties_index == config.nodes_index {
        return Err(ConfigError::Validation(format!(
            "properties and nodes must use different indexes, both are '{}'",
            config.nodes_index
        )));
    }

    Ok(())
}

/// Validates frontier seed URLs
fn validate_seeds(seeds: &[String]) -> Result<(), ConfigError> {
    for seed in seeds {
        parse_crawl_url(seed)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed URL: {}", e)))?;
    }
    Ok(())
}

fn validate_blacklist(entries: &[String]) -> Result<(), ConfigError> {
    if entries.iter().any(|e| e.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "blacklist entries cannot be empty (an empty entry matches every URL)".to_string(),
        ));
    }
    Ok(())
}

/// Validates enrichment bootstrap hostnames
fn validate_seed_domains(domains: &[String]) -> Result<(), ConfigError> {
    for domain in domains {
        if domain.is_empty() {
            continue;
        }

        if domain.contains("://") || domain.contains('/') {
            return Err(ConfigError::Validation(format!(
                "seed-domains entries must be bare hostnames, got '{}'",
                domain
            )));
        }

        if !domain
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':')
        {
            return Err(ConfigError::Validation(format!(
                "Domain '{}' contains invalid characters",
                domain
            )));
        }
    }
    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
