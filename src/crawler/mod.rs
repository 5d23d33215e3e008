//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching behind the `PageFetcher` capability
//! - HTML parsing for links and homepage metadata
//! - Politeness pacing between items
//! - The crawl frontier loop

mod coordinator;
mod fetcher;
mod parser;
mod scheduler;

pub use coordinator::{CrawlReport, Frontier, ItemOutcome};
pub use fetcher::{build_http_client, FetchError, HttpFetcher, PageFetcher};
pub use parser::{extract_links, PageSnapshot};
pub use scheduler::{FixedDelay, NoDelay, Pacer};

use crate::config::Config;
use crate::storage::Storage;
use crate::url::Blacklist;
use crate::ProspectError;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Build the HTTP fetcher from the configuration
/// 2. Seed the queue from `config.seeds`
/// 3. Process the queue until no Pending item remains
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `storage` - The relational store holding the queue
///
/// # Returns
///
/// * `Ok(CrawlReport)` - Crawl completed
/// * `Err(ProspectError)` - The store failed while scheduling
pub async fn crawl<S: Storage>(config: &Config, storage: S) -> Result<(CrawlReport, S), ProspectError> {
    let fetcher = HttpFetcher::from_config(&config.crawler, &config.user_agent)?;
    let pacer = FixedDelay::from_millis(config.crawler.crawl_delay_ms);
    let blacklist = Blacklist::new(config.blacklist.iter());
    tracing::debug!(
        "Frontier: max depth {}, {} blacklist keywords, {}ms delay",
        config.crawler.max_depth,
        blacklist.len(),
        config.crawler.crawl_delay_ms
    );

    let mut frontier = Frontier::new(storage, fetcher, pacer, blacklist, config.crawler.max_depth);
    frontier.initialize_seeds(&config.seeds)?;
    let report = frontier.run().await?;

    Ok((report, frontier.into_storage()))
}
