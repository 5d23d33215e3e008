//! Statistics generation from the relational store
//!
//! This module provides functionality for extracting and displaying
//! frontier, property and node counts from the storage layer.

use crate::state::QueueStatus;
use crate::storage::Storage;
use crate::ProspectError;
use std::collections::HashMap;

/// Store statistics summary
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreStatistics {
    /// Total number of queue rows
    pub total_queued: u64,

    /// Count of queue rows by status
    pub queue_by_status: HashMap<QueueStatus, u64>,

    /// Number of properties (stubs included)
    pub total_properties: u64,

    /// Properties that own no node yet
    pub awaiting_enrichment: u64,

    pub total_nodes: u64,

    /// Document counts of the search indexes, when they could be read
    pub property_documents: Option<u64>,
    pub node_documents: Option<u64>,
}

impl StoreStatistics {
    pub fn queue_count(&self, status: QueueStatus) -> u64 {
        self.queue_by_status.get(&status).copied().unwrap_or(0)
    }
}

/// Loads statistics from storage
///
/// Index document counts are left empty; the caller fills them in when an
/// index is reachable.
pub fn load_statistics<S: Storage + ?Sized>(storage: &S) -> Result<StoreStatistics, ProspectError> {
    let queue_by_status = storage.count_queue_by_status()?;

    Ok(StoreStatistics {
        total_queued: queue_by_status.values().sum(),
        queue_by_status,
        total_properties: storage.count_properties()?,
        awaiting_enrichment: storage.properties_without_nodes()?.len() as u64,
        total_nodes: storage.count_nodes()?,
        property_documents: None,
        node_documents: None,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &StoreStatistics) {
    println!("=== Prospect Statistics ===\n");

    println!("Crawl Queue ({} items):", stats.total_queued);
    for status in QueueStatus::ALL {
        let count = stats.queue_count(status);
        let percentage = if stats.total_queued > 0 {
            (count as f64 / stats.total_queued as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", status, count, percentage);
    }
    println!();

    println!("Properties:");
    println!("  Total: {}", stats.total_properties);
    println!("  Awaiting enrichment: {}", stats.awaiting_enrichment);
    println!();

    println!("Nodes: {}", stats.total_nodes);

    if stats.property_documents.is_some() || stats.node_documents.is_some() {
        println!();
        println!("Search Index:");
        if let Some(count) = stats.property_documents {
            println!("  Property documents: {}", count);
        }
        if let Some(count) = stats.node_documents {
            println!("  Node documents: {}", count);
        }
    }
}
