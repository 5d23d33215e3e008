//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Prospect database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Frontier: one row per URL ever discovered
CREATE TABLE IF NOT EXISTS crawl_queue (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    depth INTEGER NOT NULL CHECK (depth >= 0),
    is_seed_domain INTEGER NOT NULL DEFAULT 0,
    status TEXT NOT NULL,
    created_at TEXT NOT NULL,
    processed_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_crawl_queue_schedule
    ON crawl_queue(status, depth, created_at, id);

-- Favicon and social preview images
CREATE TABLE IF NOT EXISTS media (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL,
    created_at TEXT NOT NULL
);

-- External business domains
CREATE TABLE IF NOT EXISTS properties (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    hostname TEXT NOT NULL UNIQUE,
    address1 TEXT,
    address2 TEXT,
    city TEXT,
    state TEXT,
    zip TEXT,
    country TEXT,
    facebook TEXT,
    twitter TEXT,
    instagram TEXT,
    linkedin TEXT,
    youtube TEXT,
    tiktok TEXT,
    discord TEXT,
    github TEXT,
    favicon_id INTEGER REFERENCES media(id) ON DELETE SET NULL,
    og_image_id INTEGER REFERENCES media(id) ON DELETE SET NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Crawled pages, each owned by exactly one property
CREATE TABLE IF NOT EXISTS nodes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    title TEXT,
    description TEXT,
    summary TEXT,
    keywords TEXT NOT NULL DEFAULT '[]',
    industry TEXT,
    audience TEXT,
    technologies TEXT NOT NULL DEFAULT '[]',
    property_id INTEGER NOT NULL REFERENCES properties(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_nodes_property ON nodes(property_id);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
