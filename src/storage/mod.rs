//! Storage module for persisting crawl data
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - The crawl queue (frontier) and its status transitions
//! - Properties, nodes and media discovered by the crawler and enrichment
//! - Denormalized reads used by the index sync engine

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::state::QueueStatus;
use crate::ProspectError;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;

use std::path::Path;

/// Initializes or opens a storage database
pub fn open_storage(path: &Path) -> Result<SqliteStorage, ProspectError> {
    SqliteStorage::new(path)
}

/// Timestamp format used for every stored time
///
/// Fixed-width microsecond RFC 3339 in UTC, so lexical order equals time order.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Converts a stored timestamp to epoch milliseconds (0 if unparseable)
pub fn timestamp_millis(stored: &str) -> i64 {
    DateTime::parse_from_rfc3339(stored)
        .map(|dt| dt.timestamp_millis())
        .unwrap_or(0)
}

/// A row of the crawl queue
#[derive(Debug, Clone, PartialEq)]
pub struct QueueItem {
    pub id: i64,
    pub url: String,
    /// Hops from a seed URL; fixed at creation
    pub depth: u32,
    pub is_seed_domain: bool,
    pub status: QueueStatus,
    pub created_at: String,
    pub processed_at: Option<String>,
}

/// Address and social-link fields of a property
///
/// Also the decoded output of the footer extraction call, so every field
/// defaults to None when absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ContactDetails {
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub country: Option<String>,
    pub facebook: Option<String>,
    pub twitter: Option<String>,
    pub instagram: Option<String>,
    pub linkedin: Option<String>,
    pub youtube: Option<String>,
    pub tiktok: Option<String>,
    pub discord: Option<String>,
    pub github: Option<String>,
}

/// A discovered external business domain
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyRecord {
    pub id: i64,
    pub hostname: String,
    pub contact: ContactDetails,
    pub favicon_id: Option<i64>,
    pub og_image_id: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

/// Values written when a property is enriched
#[derive(Debug, Clone, Default)]
pub struct PropertyUpdate {
    pub contact: ContactDetails,
    /// None keeps whatever media reference the row already has
    pub favicon_id: Option<i64>,
    pub og_image_id: Option<i64>,
}

/// A property with its media references resolved to URLs
#[derive(Debug, Clone, PartialEq)]
pub struct PropertySyncRecord {
    pub property: PropertyRecord,
    pub favicon_url: Option<String>,
    pub og_image_url: Option<String>,
}

/// A crawled page belonging to a property
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRecord {
    pub id: i64,
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub summary: Option<String>,
    pub keywords: Vec<String>,
    pub industry: Option<String>,
    pub audience: Option<String>,
    pub technologies: Vec<String>,
    pub property_id: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// Values written when a node is enriched
#[derive(Debug, Clone, Default)]
pub struct NodeUpsert {
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub summary: Option<String>,
    pub keywords: Vec<String>,
    pub industry: Option<String>,
    pub audience: Option<String>,
    /// Only used when the node is created; an existing node keeps its owner
    pub property_id: i64,
}

/// A node joined with its owning property, as read by the sync engine
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSyncRecord {
    pub node: NodeRecord,
    pub property: PropertySyncRecord,
}
