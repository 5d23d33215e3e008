//! Crawl frontier - the main crawl loop
//!
//! The frontier drives breadth-first discovery over the persistent crawl
//! queue:
//! - Seeding the queue from configured seed URLs
//! - Picking the shallowest, oldest Pending item, one at a time
//! - Fetching it and classifying the links it contains
//! - Enqueueing internal links within the depth limit
//! - Registering external hostnames as property stubs
//! - Pausing after every fetched item

use crate::crawler::fetcher::PageFetcher;
use crate::crawler::parser::extract_links;
use crate::crawler::scheduler::Pacer;
use crate::state::QueueStatus;
use crate::storage::{QueueItem, Storage};
use crate::url::{classify_link, parse_crawl_url, Blacklist, LinkClass};
use crate::ProspectError;
use std::time::Instant;
use url::Url;

/// Result of processing a single queue item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    /// Fetched and its links recorded
    Completed,
    /// Matched the blacklist; completed without fetching
    Blacklisted,
    /// Fetch or processing failed; terminal
    Failed,
}

/// Counters for one frontier run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlReport {
    pub completed: u64,
    pub failed: u64,
    pub blacklisted: u64,
    /// Items returned from Processing to Pending at start-up
    pub recovered: usize,
    pub enqueued: u64,
    pub properties_created: u64,
}

impl CrawlReport {
    pub fn processed(&self) -> u64 {
        self.completed + self.failed + self.blacklisted
    }

    fn record(&mut self, outcome: ItemOutcome) {
        match outcome {
            ItemOutcome::Completed => self.completed += 1,
            ItemOutcome::Blacklisted => self.blacklisted += 1,
            ItemOutcome::Failed => self.failed += 1,
        }
    }
}

/// What a fetched page contributed to the store
#[derive(Debug, Default)]
struct LinkTally {
    enqueued: u64,
    properties_created: u64,
}

/// Single-worker crawl frontier over a `Storage` queue
pub struct Frontier<S, F, P> {
    storage: S,
    fetcher: F,
    pacer: P,
    blacklist: Blacklist,
    max_depth: u32,
}

impl<S, F, P> Frontier<S, F, P>
where
    S: Storage,
    F: PageFetcher,
    P: Pacer,
{
    /// Creates a new frontier
    ///
    /// # Arguments
    ///
    /// * `storage` - The relational store holding the queue
    /// * `fetcher` - Page fetcher used for every queue item
    /// * `pacer` - Delay applied after every fetched item
    /// * `blacklist` - URL substrings that are never fetched or followed
    /// * `max_depth` - Internal links found at this depth are not enqueued
    pub fn new(storage: S, fetcher: F, pacer: P, blacklist: Blacklist, max_depth: u32) -> Self {
        Self {
            storage,
            fetcher,
            pacer,
            blacklist,
            max_depth,
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    /// Inserts each seed URL at depth 0 unless it is already queued
    ///
    /// Seeds are stored in serialized URL form, the same form extracted links
    /// take, so `https://a.com` and a discovered `https://a.com/` share a row.
    ///
    /// # Returns
    ///
    /// The number of seeds newly added
    pub fn initialize_seeds(&mut self, seeds: &[String]) -> Result<usize, ProspectError> {
        let mut added = 0;
        for seed in seeds {
            let seed = parse_crawl_url(seed)?;
            if self.storage.enqueue_if_absent(seed.as_str(), 0, true)? {
                tracing::debug!("Seeded {}", seed);
                added += 1;
            }
        }
        tracing::info!(
            "Initialized {} seed URLs ({} new)",
            seeds.len(),
            added
        );
        Ok(added)
    }

    /// Runs the crawl loop until no Pending item remains
    ///
    /// Per-item errors are logged and recorded as Failed; only storage
    /// failures while scheduling abort the run.
    pub async fn run(&mut self) -> Result<CrawlReport, ProspectError> {
        let mut report = CrawlReport {
            recovered: self.storage.recover_interrupted()?,
            ..Default::default()
        };
        if report.recovered > 0 {
            tracing::info!(
                "Recovered {} items interrupted mid-crawl",
                report.recovered
            );
        }

        let start_time = Instant::now();

        loop {
            let item = match self.storage.next_pending()? {
                Some(item) => item,
                None => {
                    tracing::info!("No more pending items in queue");
                    break;
                }
            };

            let outcome = match self.process_item(&item).await {
                Ok((outcome, tally)) => {
                    report.enqueued += tally.enqueued;
                    report.properties_created += tally.properties_created;
                    outcome
                }
                Err(e) => {
                    tracing::error!("Error processing {}: {}", item.url, e);
                    // An item that cannot leave the active states would be
                    // scheduled again forever
                    if !self.mark_failed(&item) {
                        return Err(e);
                    }
                    ItemOutcome::Failed
                }
            };
            report.record(outcome);

            // Blacklisted items make no request, so there is nothing to pace
            if outcome != ItemOutcome::Blacklisted {
                self.pacer.pause().await;
            }

            let processed = report.processed();
            if processed % 10 == 0 {
                tracing::info!(
                    "Progress: {} items processed ({} completed, {} failed) in {:.1}s",
                    processed,
                    report.completed,
                    report.failed,
                    start_time.elapsed().as_secs_f64()
                );
            }
        }

        self.log_summary()?;
        Ok(report)
    }

    /// Processes one queue item
    ///
    /// Fetch errors are handled here (the item is marked Failed and
    /// `ItemOutcome::Failed` returned). An `Err` means a storage operation
    /// failed part-way through.
    async fn process_item(
        &mut self,
        item: &QueueItem,
    ) -> Result<(ItemOutcome, LinkTally), ProspectError> {
        if self.blacklist.is_blacklisted(&item.url) {
            tracing::info!("Skipping blacklisted: {}", item.url);
            self.storage
                .update_queue_status(item.id, QueueStatus::Completed)?;
            return Ok((ItemOutcome::Blacklisted, LinkTally::default()));
        }

        tracing::info!("Processing: {} (depth: {})", item.url, item.depth);
        self.storage
            .update_queue_status(item.id, QueueStatus::Processing)?;

        let html = match self.fetcher.fetch(&item.url).await {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!("Failed: {}: {}", item.url, e);
                self.storage
                    .update_queue_status(item.id, QueueStatus::Failed)?;
                return Ok((ItemOutcome::Failed, LinkTally::default()));
            }
        };

        let base_url = Url::parse(&item.url)?;
        let links = extract_links(&html, &base_url);
        tracing::debug!("Found {} links on {}", links.len(), item.url);

        let tally = self.record_links(item, &links)?;

        self.storage
            .update_queue_status(item.id, QueueStatus::Completed)?;
        tracing::info!(
            "Completed: {} ({} queued, {} new properties)",
            item.url,
            tally.enqueued,
            tally.properties_created
        );

        Ok((ItemOutcome::Completed, tally))
    }

    fn record_links(
        &mut self,
        item: &QueueItem,
        links: &[String],
    ) -> Result<LinkTally, ProspectError> {
        let mut tally = LinkTally::default();

        for link in links {
            match classify_link(link, &item.url, &self.blacklist) {
                LinkClass::Internal => {
                    if item.depth >= self.max_depth {
                        continue;
                    }
                    let depth = item.depth + 1;
                    if self.storage.enqueue_if_absent(link, depth, false)? {
                        tracing::debug!("Added to queue: {} (depth: {})", link, depth);
                        tally.enqueued += 1;
                    }
                }
                LinkClass::External { hostname } => {
                    if self.storage.ensure_property_stub(&hostname)? {
                        tracing::debug!("Created property: {}", hostname);
                        tally.properties_created += 1;
                    }
                }
                LinkClass::Blacklisted | LinkClass::Invalid => {
                    tracing::trace!("Ignoring link {}", link);
                }
            }
        }

        Ok(tally)
    }

    /// Moves an item that errored mid-processing to Failed
    ///
    /// Returns true once the item is in a terminal state.
    fn mark_failed(&mut self, item: &QueueItem) -> bool {
        let current = match self.storage.get_queue_item_by_url(&item.url) {
            Ok(Some(current)) => current.status,
            Ok(None) => return false,
            Err(e) => {
                tracing::error!("Could not read status of {}: {}", item.url, e);
                return false;
            }
        };

        let steps: &[QueueStatus] = match current {
            QueueStatus::Completed | QueueStatus::Failed => return true,
            QueueStatus::Pending => &[QueueStatus::Processing, QueueStatus::Failed],
            QueueStatus::Processing => &[QueueStatus::Failed],
        };

        for &step in steps {
            if let Err(e) = self.storage.update_queue_status(item.id, step) {
                tracing::error!("Could not mark {} as failed: {}", item.url, e);
                return false;
            }
        }
        true
    }

    fn log_summary(&self) -> Result<(), ProspectError> {
        let counts = self.storage.count_queue_by_status()?;
        tracing::info!("=== Crawl Summary ===");
        for status in QueueStatus::ALL {
            tracing::info!("{}: {}", status, counts.get(&status).copied().unwrap_or(0));
        }
        tracing::info!(
            "Total properties discovered: {}",
            self.storage.count_properties()?
        );
        Ok(())
    }
}
