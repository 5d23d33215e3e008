//! Metadata enrichment pipeline
//!
//! Visits the homepage of every property that owns no node yet (or the
//! configured seed domains when there are none), extracts its metadata and
//! stores the property, its media and the homepage node. Any failure drops
//! the property so the next run does not pick it up again.

use crate::crawler::{Pacer, PageFetcher, PageSnapshot};
use crate::enrich::metadata::{MetadataExtractor, PageContext};
use crate::storage::{ContactDetails, NodeUpsert, PropertyUpdate, Storage};
use crate::ProspectError;
use url::Url;

/// Counters for one enrichment run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichmentReport {
    pub enriched: u64,
    /// Domains whose property was deleted after an error
    pub dropped: u64,
}

/// Cuts `text` to at most `limit` characters
pub fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Single-worker enrichment loop
pub struct EnrichmentPipeline<S, F, X, P> {
    storage: S,
    fetcher: F,
    extractor: X,
    pacer: P,
    body_text_limit: usize,
}

impl<S, F, X, P> EnrichmentPipeline<S, F, X, P>
where
    S: Storage,
    F: PageFetcher,
    X: MetadataExtractor,
    P: Pacer,
{
    pub fn new(storage: S, fetcher: F, extractor: X, pacer: P, body_text_limit: usize) -> Self {
        Self {
            storage,
            fetcher,
            extractor,
            pacer,
            body_text_limit,
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    /// Hostnames to enrich: properties without nodes, else the seed domains
    pub fn pending_domains(&self, seed_domains: &[String]) -> Result<Vec<String>, ProspectError> {
        let unvisited = self.storage.properties_without_nodes()?;
        if !unvisited.is_empty() {
            return Ok(unvisited);
        }

        Ok(seed_domains
            .iter()
            .map(|d| d.trim())
            .filter(|d| !d.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Enriches every pending domain, pausing after each one
    pub async fn run(&mut self, seed_domains: &[String]) -> Result<EnrichmentReport, ProspectError> {
        let domains = self.pending_domains(seed_domains)?;
        tracing::info!("Enriching {} domains", domains.len());

        let mut report = EnrichmentReport::default();

        for hostname in &domains {
            tracing::info!("Processing domain: {}", hostname);

            match self.enrich_domain(hostname).await {
                Ok(()) => {
                    tracing::info!("Successfully processed: {}", hostname);
                    report.enriched += 1;
                }
                Err(e) => {
                    tracing::error!("Error processing {}: {}", hostname, e);
                    match self.storage.delete_property(hostname) {
                        Ok(true) => tracing::info!("Dropped property {}", hostname),
                        Ok(false) => {}
                        Err(de) => {
                            tracing::error!("Could not drop property {}: {}", hostname, de)
                        }
                    }
                    report.dropped += 1;
                }
            }

            self.pacer.pause().await;
        }

        tracing::info!(
            "All domains processed: {} enriched, {} dropped",
            report.enriched,
            report.dropped
        );
        Ok(report)
    }

    /// Fetches, extracts and stores one domain's homepage
    pub async fn enrich_domain(&mut self, hostname: &str) -> Result<(), ProspectError> {
        let url = Url::parse(&format!("https://{}", hostname))?;
        let html = self.fetcher.fetch(url.as_str()).await?;
        let snapshot = PageSnapshot::parse(&html, &url)?;

        let page = PageContext {
            body_text: truncate_chars(&snapshot.body_text, self.body_text_limit).to_string(),
            title: snapshot.title.clone().unwrap_or_default(),
            description: snapshot.description.clone().unwrap_or_default(),
        };
        let metadata = self.extractor.page_metadata(&page).await?;

        let contact = match snapshot.footer_html.as_deref() {
            Some(footer) if !footer.trim().is_empty() => {
                self.extractor.contact_details(footer).await?
            }
            _ => {
                tracing::debug!("No footer on {}", url);
                ContactDetails::default()
            }
        };

        let favicon_id = snapshot
            .favicon_url
            .as_deref()
            .map(|u| self.storage.insert_media(u))
            .transpose()?;
        let og_image_id = snapshot
            .og_image_url
            .as_deref()
            .map(|u| self.storage.insert_media(u))
            .transpose()?;

        let property_id = self.storage.upsert_property(
            hostname,
            &PropertyUpdate {
                contact,
                favicon_id,
                og_image_id,
            },
        )?;

        self.storage.upsert_node(&NodeUpsert {
            url: url.to_string(),
            title: snapshot.title,
            description: snapshot.description,
            summary: non_empty(metadata.summary),
            keywords: metadata.keywords,
            industry: non_empty(metadata.industry),
            audience: non_empty(metadata.audience),
            property_id,
        })?;

        Ok(())
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}
