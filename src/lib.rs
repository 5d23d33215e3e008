//! Prospect: a polite business-site discovery crawler
//!
//! This crate crawls outward from seed URLs, registers the external domains it
//! finds as properties, enriches them with AI-extracted metadata, and keeps a
//! search index in sync with the relational store using vector embeddings.

pub mod ai;
pub mod config;
pub mod crawler;
pub mod enrich;
pub mod output;
pub mod search;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Prospect operations
#[derive(Debug, Error)]
pub enum ProspectError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Fetch error: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] enrich::ExtractionError),

    #[error("Embedding error: {0}")]
    Embedding(#[from] ai::EmbeddingError),

    #[error("Search index error: {0}")]
    Index(#[from] search::IndexError),

    #[error("Sync error: {0}")]
    Sync(#[from] search::SyncError),

    #[error("Invalid query: {0}")]
    Validation(#[from] search::ValidationError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Missing environment variable: {0}")]
    MissingEnv(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL {url}: {source}")]
    Parse {
        url: String,
        source: ::url::ParseError,
    },

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing hostname in URL: {0}")]
    MissingHost(String),
}

/// Result type alias for Prospect operations
pub type Result<T> = std::result::Result<T, ProspectError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use state::QueueStatus;
pub use url::{classify_link, extract_hostname, is_same_domain, Blacklist, LinkClass};
