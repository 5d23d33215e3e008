//! Configuration module for Prospect
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use prospect::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("prospect.toml")).unwrap();
//! println!("Frontier will follow links to depth {}", config.crawler.max_depth);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{
    Config, CrawlerConfig, EnrichmentConfig, OpenAiConfig, SearchConfig, StorageConfig,
    UserAgentConfig,
};

pub use parser::{
    compute_config_hash, load_config, load_config_with_hash, optional_env, parse_config,
    require_env,
};
