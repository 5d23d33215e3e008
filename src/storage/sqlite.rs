//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::state::QueueStatus;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{
    now_timestamp, ContactDetails, NodeRecord, NodeSyncRecord, NodeUpsert, PropertyRecord,
    PropertySyncRecord, PropertyUpdate, QueueItem,
};
use crate::ProspectError;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;

const QUEUE_COLUMNS: &str = "id, url, depth, is_seed_domain, status, created_at, processed_at";

const PROPERTY_COLUMNS: &str = "p.id, p.hostname, p.address1, p.address2, p.city, p.state, \
     p.zip, p.country, p.facebook, p.twitter, p.instagram, p.linkedin, p.youtube, p.tiktok, \
     p.discord, p.github, p.favicon_id, p.og_image_id, p.created_at, p.updated_at";
const PROPERTY_COLUMN_COUNT: usize = 20;

const NODE_COLUMNS: &str = "n.id, n.url, n.title, n.description, n.summary, n.keywords, \
     n.industry, n.audience, n.technologies, n.property_id, n.created_at, n.updated_at";
const NODE_COLUMN_COUNT: usize = 12;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(ProspectError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, ProspectError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> Result<Self, ProspectError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn count(&self, sql: &str) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

fn queue_item_from_row(row: &Row<'_>) -> rusqlite::Result<QueueItem> {
    let status: String = row.get(4)?;
    Ok(QueueItem {
        id: row.get(0)?,
        url: row.get(1)?,
        depth: row.get(2)?,
        is_seed_domain: row.get(3)?,
        status: QueueStatus::from_db_string(&status).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                4,
                Type::Text,
                format!("unknown queue status '{}'", status).into(),
            )
        })?,
        created_at: row.get(5)?,
        processed_at: row.get(6)?,
    })
}

fn property_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<PropertyRecord> {
    let col = |i: usize| offset + i;
    Ok(PropertyRecord {
        id: row.get(col(0))?,
        hostname: row.get(col(1))?,
        contact: ContactDetails {
            address1: row.get(col(2))?,
            address2: row.get(col(3))?,
            city: row.get(col(4))?,
            state: row.get(col(5))?,
            zip: row.get(col(6))?,
            country: row.get(col(7))?,
            facebook: row.get(col(8))?,
            twitter: row.get(col(9))?,
            instagram: row.get(col(10))?,
            linkedin: row.get(col(11))?,
            youtube: row.get(col(12))?,
            tiktok: row.get(col(13))?,
            discord: row.get(col(14))?,
            github: row.get(col(15))?,
        },
        favicon_id: row.get(col(16))?,
        og_image_id: row.get(col(17))?,
        created_at: row.get(col(18))?,
        updated_at: row.get(col(19))?,
    })
}

/// Property columns followed by the favicon and og:image URLs
fn property_sync_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<PropertySyncRecord> {
    Ok(PropertySyncRecord {
        property: property_from_row(row, offset)?,
        favicon_url: row.get(offset + PROPERTY_COLUMN_COUNT)?,
        og_image_url: row.get(offset + PROPERTY_COLUMN_COUNT + 1)?,
    })
}

fn string_list(row: &Row<'_>, idx: usize) -> rusqlite::Result<Vec<String>> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn node_from_row(row: &Row<'_>) -> rusqlite::Result<NodeRecord> {
    Ok(NodeRecord {
        id: row.get(0)?,
        url: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        summary: row.get(4)?,
        keywords: string_list(row, 5)?,
        industry: row.get(6)?,
        audience: row.get(7)?,
        technologies: string_list(row, 8)?,
        property_id: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

impl Storage for SqliteStorage {
    // ===== Crawl Queue =====

    fn enqueue_if_absent(
        &mut self,
        url: &str,
        depth: u32,
        is_seed_domain: bool,
    ) -> StorageResult<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO crawl_queue (url, depth, is_seed_domain, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                url,
                depth,
                is_seed_domain,
                QueueStatus::Pending.to_db_string(),
                now_timestamp()
            ],
        )?;
        Ok(inserted == 1)
    }

    fn get_queue_item_by_url(&self, url: &str) -> StorageResult<Option<QueueItem>> {
        let sql = format!("SELECT {} FROM crawl_queue WHERE url = ?1", QUEUE_COLUMNS);
        let item = self
            .conn
            .query_row(&sql, params![url], queue_item_from_row)
            .optional()?;
        Ok(item)
    }

    fn next_pending(&self) -> StorageResult<Option<QueueItem>> {
        let sql = format!(
            "SELECT {} FROM crawl_queue WHERE status = ?1
             ORDER BY depth ASC, created_at ASC, id ASC LIMIT 1",
            QUEUE_COLUMNS
        );
        let item = self
            .conn
            .query_row(
                &sql,
                params![QueueStatus::Pending.to_db_string()],
                queue_item_from_row,
            )
            .optional()?;
        Ok(item)
    }

    fn update_queue_status(&mut self, id: i64, status: QueueStatus) -> StorageResult<()> {
        let current: Option<String> = self
            .conn
            .query_row(
                "SELECT status FROM crawl_queue WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        let current = current
            .as_deref()
            .and_then(QueueStatus::from_db_string)
            .ok_or(StorageError::QueueItemNotFound(id))?;

        if !current.can_transition_to(status) {
            return Err(StorageError::InvalidTransition {
                id,
                from: current,
                to: status,
            });
        }

        let processed_at = status.is_terminal().then(now_timestamp);
        let updated = self.conn.execute(
            "UPDATE crawl_queue SET status = ?1, processed_at = COALESCE(?2, processed_at)
             WHERE id = ?3 AND status = ?4",
            params![
                status.to_db_string(),
                processed_at,
                id,
                current.to_db_string()
            ],
        )?;

        // Status changed underneath us between the read and the write
        if updated == 0 {
            return Err(StorageError::InvalidTransition {
                id,
                from: current,
                to: status,
            });
        }
        Ok(())
    }

    fn recover_interrupted(&mut self) -> StorageResult<usize> {
        let recovered = self.conn.execute(
            "UPDATE crawl_queue SET status = ?1 WHERE status = ?2",
            params![
                QueueStatus::Pending.to_db_string(),
                QueueStatus::Processing.to_db_string()
            ],
        )?;
        Ok(recovered)
    }

    fn count_queue_by_status(&self) -> StorageResult<HashMap<QueueStatus, u64>> {
        let mut counts: HashMap<QueueStatus, u64> =
            QueueStatus::ALL.iter().map(|s| (*s, 0)).collect();

        let mut stmt = self
            .conn
            .prepare("SELECT status, COUNT(*) FROM crawl_queue GROUP BY status")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        for (status, count) in rows {
            if let Some(status) = QueueStatus::from_db_string(&status) {
                counts.insert(status, count as u64);
            }
        }

        Ok(counts)
    }

    // ===== Properties =====

    fn ensure_property_stub(&mut self, hostname: &str) -> StorageResult<bool> {
        let now = now_timestamp();
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO properties (hostname, created_at, updated_at)
             VALUES (?1, ?2, ?2)",
            params![hostname, now],
        )?;
        Ok(inserted == 1)
    }

    fn get_property_by_hostname(&self, hostname: &str) -> StorageResult<Option<PropertyRecord>> {
        let sql = format!(
            "SELECT {} FROM properties p WHERE p.hostname = ?1",
            PROPERTY_COLUMNS
        );
        let property = self
            .conn
            .query_row(&sql, params![hostname], |row| property_from_row(row, 0))
            .optional()?;
        Ok(property)
    }

    fn upsert_property(&mut self, hostname: &str, update: &PropertyUpdate) -> StorageResult<i64> {
        let c = &update.contact;
        let id = self.conn.query_row(
            "INSERT INTO properties (
                hostname, address1, address2, city, state, zip, country,
                facebook, twitter, instagram, linkedin, youtube, tiktok, discord, github,
                favicon_id, og_image_id, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?18)
             ON CONFLICT(hostname) DO UPDATE SET
                address1 = excluded.address1,
                address2 = excluded.address2,
                city = excluded.city,
                state = excluded.state,
                zip = excluded.zip,
                country = excluded.country,
                facebook = excluded.facebook,
                twitter = excluded.twitter,
                instagram = excluded.instagram,
                linkedin = excluded.linkedin,
                youtube = excluded.youtube,
                tiktok = excluded.tiktok,
                discord = excluded.discord,
                github = excluded.github,
                favicon_id = COALESCE(excluded.favicon_id, properties.favicon_id),
                og_image_id = COALESCE(excluded.og_image_id, properties.og_image_id),
                updated_at = excluded.updated_at
             RETURNING id",
            params![
                hostname,
                c.address1,
                c.address2,
                c.city,
                c.state,
                c.zip,
                c.country,
                c.facebook,
                c.twitter,
                c.instagram,
                c.linkedin,
                c.youtube,
                c.tiktok,
                c.discord,
                c.github,
                update.favicon_id,
                update.og_image_id,
                now_timestamp(),
            ],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    fn delete_property(&mut self, hostname: &str) -> StorageResult<bool> {
        let deleted = self.conn.execute(
            "DELETE FROM properties WHERE hostname = ?1",
            params![hostname],
        )?;
        Ok(deleted > 0)
    }

    fn properties_without_nodes(&self) -> StorageResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT p.hostname FROM properties p
             WHERE NOT EXISTS (SELECT 1 FROM nodes n WHERE n.property_id = p.id)
             ORDER BY p.created_at ASC, p.id ASC",
        )?;
        let hostnames = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(hostnames)
    }

    fn count_properties(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM properties")
    }

    fn load_properties_for_sync(&self) -> StorageResult<Vec<PropertySyncRecord>> {
        let sql = format!(
            "SELECT {}, f.url, o.url FROM properties p
             LEFT JOIN media f ON f.id = p.favicon_id
             LEFT JOIN media o ON o.id = p.og_image_id
             ORDER BY p.id ASC",
            PROPERTY_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let records = stmt
            .query_map([], |row| property_sync_from_row(row, 0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    // ===== Media =====

    fn insert_media(&mut self, url: &str) -> StorageResult<i64> {
        self.conn.execute(
            "INSERT INTO media (url, created_at) VALUES (?1, ?2)",
            params![url, now_timestamp()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    // ===== Nodes =====

    fn upsert_node(&mut self, node: &NodeUpsert) -> StorageResult<i64> {
        let keywords = serde_json::to_string(&node.keywords)?;
        let id = self.conn.query_row(
            "INSERT INTO nodes (
                url, title, description, summary, keywords, industry, audience,
                property_id, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
             ON CONFLICT(url) DO UPDATE SET
                title = excluded.title,
                description = excluded.description,
                summary = excluded.summary,
                keywords = excluded.keywords,
                industry = excluded.industry,
                audience = excluded.audience,
                updated_at = excluded.updated_at
             RETURNING id",
            params![
                node.url,
                node.title,
                node.description,
                node.summary,
                keywords,
                node.industry,
                node.audience,
                node.property_id,
                now_timestamp(),
            ],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    fn get_node_by_url(&self, url: &str) -> StorageResult<Option<NodeRecord>> {
        let sql = format!("SELECT {} FROM nodes n WHERE n.url = ?1", NODE_COLUMNS);
        let node = self
            .conn
            .query_row(&sql, params![url], node_from_row)
            .optional()?;
        Ok(node)
    }

    fn count_nodes(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM nodes")
    }

    fn load_nodes_for_sync(&self) -> StorageResult<Vec<NodeSyncRecord>> {
        let sql = format!(
            "SELECT {}, {}, f.url, o.url FROM nodes n
             JOIN properties p ON p.id = n.property_id
             LEFT JOIN media f ON f.id = p.favicon_id
             LEFT JOIN media o ON o.id = p.og_image_id
             ORDER BY n.id ASC",
            NODE_COLUMNS, PROPERTY_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let records = stmt
            .query_map([], |row| {
                Ok(NodeSyncRecord {
                    node: node_from_row(row)?,
                    property: property_sync_from_row(row, NODE_COLUMN_COUNT)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }
}
