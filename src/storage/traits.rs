//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::state::QueueStatus;
use crate::storage::{
    NodeRecord, NodeSyncRecord, NodeUpsert, PropertyRecord, PropertySyncRecord, PropertyUpdate,
    QueueItem,
};
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Queue item not found: {0}")]
    QueueItemNotFound(i64),

    #[error("Invalid queue transition for item {id}: {from} -> {to}")]
    InvalidTransition {
        id: i64,
        from: QueueStatus,
        to: QueueStatus,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Every find-or-create and upsert is a single atomic statement keyed on the
/// declared unique column (queue URL, property hostname, node URL).
pub trait Storage {
    // ===== Crawl Queue =====

    /// Inserts a Pending queue item unless a row for `url` already exists
    ///
    /// Existing rows are never reset, whatever their status.
    ///
    /// # Returns
    ///
    /// true if a new row was created
    fn enqueue_if_absent(
        &mut self,
        url: &str,
        depth: u32,
        is_seed_domain: bool,
    ) -> StorageResult<bool>;

    /// Gets a queue item by URL
    fn get_queue_item_by_url(&self, url: &str) -> StorageResult<Option<QueueItem>>;

    /// Returns the Pending item with the smallest depth, oldest first
    fn next_pending(&self) -> StorageResult<Option<QueueItem>>;

    /// Moves a queue item to `status`
    ///
    /// Terminal statuses also stamp `processed_at`. Transitions not allowed by
    /// `QueueStatus::can_transition_to` fail with `InvalidTransition`.
    fn update_queue_status(&mut self, id: i64, status: QueueStatus) -> StorageResult<()>;

    /// Returns items left in Processing by an interrupted run to Pending
    fn recover_interrupted(&mut self) -> StorageResult<usize>;

    /// Counts queue rows by status
    fn count_queue_by_status(&self) -> StorageResult<HashMap<QueueStatus, u64>>;

    // ===== Properties =====

    /// Creates a bare property (hostname only) unless one exists
    ///
    /// # Returns
    ///
    /// true if a new row was created
    fn ensure_property_stub(&mut self, hostname: &str) -> StorageResult<bool>;

    /// Gets a property by hostname
    fn get_property_by_hostname(&self, hostname: &str) -> StorageResult<Option<PropertyRecord>>;

    /// Inserts or enriches the property keyed by hostname, returning its id
    fn upsert_property(&mut self, hostname: &str, update: &PropertyUpdate) -> StorageResult<i64>;

    /// Deletes the property with this hostname (and its nodes)
    ///
    /// # Returns
    ///
    /// true if a row was deleted
    fn delete_property(&mut self, hostname: &str) -> StorageResult<bool>;

    /// Hostnames of properties that own no nodes yet, oldest first
    fn properties_without_nodes(&self) -> StorageResult<Vec<String>>;

    /// Counts all properties
    fn count_properties(&self) -> StorageResult<u64>;

    /// Loads every property with media URLs resolved
    fn load_properties_for_sync(&self) -> StorageResult<Vec<PropertySyncRecord>>;

    // ===== Media =====

    /// Records a media URL, returning the new row id
    fn insert_media(&mut self, url: &str) -> StorageResult<i64>;

    // ===== Nodes =====

    /// Inserts or updates the node keyed by URL, returning its id
    fn upsert_node(&mut self, node: &NodeUpsert) -> StorageResult<i64>;

    /// Gets a node by URL
    fn get_node_by_url(&self, url: &str) -> StorageResult<Option<NodeRecord>>;

    /// Counts all nodes
    fn count_nodes(&self) -> StorageResult<u64>;

    /// Loads every node joined with its property
    fn load_nodes_for_sync(&self) -> StorageResult<Vec<NodeSyncRecord>>;
}
