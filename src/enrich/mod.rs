//! Metadata enrichment
//!
//! This module contains:
//! - The metadata extractor contract and its model-output decoding
//! - The enrichment pipeline that turns discovered properties into
//!   populated properties with a homepage node

mod metadata;
mod pipeline;

pub use metadata::{
    decode_contact_details, decode_page_metadata, ExtractionError, MetadataExtractor,
    PageContext, PageMetadata,
};
pub use pipeline::{truncate_chars, EnrichmentPipeline, EnrichmentReport};

use crate::ai::OpenAiClient;
use crate::config::Config;
use crate::crawler::{FixedDelay, HttpFetcher};
use crate::storage::Storage;
use crate::ProspectError;

/// Runs the enrichment pipeline with production clients
///
/// The inter-domain delay is `enrichment.delay-ms`, falling back to the
/// crawler delay.
pub async fn enrich<S: Storage>(
    config: &Config,
    storage: S,
    extractor: OpenAiClient,
) -> Result<(EnrichmentReport, S), ProspectError> {
    let fetcher = HttpFetcher::from_config(&config.crawler, &config.user_agent)?;
    let delay_ms = config
        .enrichment
        .delay_ms
        .unwrap_or(config.crawler.crawl_delay_ms);

    let mut pipeline = EnrichmentPipeline::new(
        storage,
        fetcher,
        extractor,
        FixedDelay::from_millis(delay_ms),
        config.enrichment.body_text_limit,
    );
    let report = pipeline.run(&config.seed_domains).await?;

    Ok((report, pipeline.into_storage()))
}
