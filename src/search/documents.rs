//! Search documents built from store records
//!
//! Documents use camelCase field names, epoch-millisecond timestamps and carry
//! their embedding under `_vectors.default`.

use crate::storage::{timestamp_millis, NodeSyncRecord, PropertySyncRecord};
use serde::Serialize;
use serde_json::Value;

/// Vectors attached to a document, keyed by embedder name
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Vectors {
    pub default: Vec<f32>,
}

/// Property fields shared by property documents and the node projection
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PropertyFields {
    pub id: i64,
    pub hostname: String,
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
    pub favicon_url: Option<String>,
    pub og_image_url: Option<String>,
}

impl From<&PropertySyncRecord> for PropertyFields {
    fn from(record: &PropertySyncRecord) -> Self {
        let p = &record.property;
        let c = &p.contact;
        Self {
            id: p.id,
            hostname: p.hostname.clone(),
            address1: c.address1.clone(),
            address2: c.address2.clone(),
            city: c.city.clone(),
            state: c.state.clone(),
            zip: c.zip.clone(),
            country: c.country.clone(),
            facebook: c.facebook.clone(),
            twitter: c.twitter.clone(),
            instagram: c.instagram.clone(),
            linkedin: c.linkedin.clone(),
            youtube: c.youtube.clone(),
            tiktok: c.tiktok.clone(),
            discord: c.discord.clone(),
            github: c.github.clone(),
            favicon_url: record.favicon_url.clone(),
            og_image_url: record.og_image_url.clone(),
        }
    }
}

/// Document stored in the properties index
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDocument {
    #[serde(flatten)]
    pub fields: PropertyFields,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(rename = "_vectors")]
    pub vectors: Vectors,
}

impl PropertyDocument {
    pub fn new(record: &PropertySyncRecord, embedding: Vec<f32>) -> Self {
        Self {
            fields: PropertyFields::from(record),
            created_at: timestamp_millis(&record.property.created_at),
            updated_at: timestamp_millis(&record.property.updated_at),
            vectors: Vectors { default: embedding },
        }
    }
}

/// Document stored in the nodes index
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodeDocument {
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
    pub property_hostname: String,
    pub property: PropertyFields,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(rename = "_vectors")]
    pub vectors: Vectors,
}

impl NodeDocument {
    pub fn new(record: &NodeSyncRecord, embedding: Vec<f32>) -> Self {
        let node = &record.node;
        Self {
            id: node.id,
            url: node.url.clone(),
            title: node.title.clone(),
            description: node.description.clone(),
            summary: node.summary.clone(),
            keywords: node.keywords.clone(),
            industry: node.industry.clone(),
            audience: node.audience.clone(),
            technologies: node.technologies.clone(),
            property_id: node.property_id,
            property_hostname: record.property.property.hostname.clone(),
            property: PropertyFields::from(&record.property),
            created_at: timestamp_millis(&node.created_at),
            updated_at: timestamp_millis(&node.updated_at),
            vectors: Vectors { default: embedding },
        }
    }
}

/// Joins the non-empty parts with single spaces
fn join_parts<'a>(parts: impl IntoIterator<Item = Option<&'a str>>) -> String {
    parts
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text embedded for a property: hostname and address, without the zip code
pub fn property_embedding_text(record: &PropertySyncRecord) -> String {
    let p = &record.property;
    let c = &p.contact;
    join_parts([
        Some(p.hostname.as_str()),
        c.address1.as_deref(),
        c.address2.as_deref(),
        c.city.as_deref(),
        c.state.as_deref(),
        c.country.as_deref(),
    ])
}

/// Text embedded for a node: its descriptive fields and tag lists
///
/// A node with none of those fields is embedded by its URL, since the
/// embeddings API rejects empty input.
pub fn node_embedding_text(record: &NodeSyncRecord) -> String {
    let n = &record.node;
    let keywords = n.keywords.join(" ");
    let technologies = n.technologies.join(" ");
    let text = join_parts([
        n.title.as_deref(),
        n.description.as_deref(),
        n.summary.as_deref(),
        Some(keywords.as_str()),
        n.industry.as_deref(),
        n.audience.as_deref(),
        Some(technologies.as_str()),
    ]);
    if text.is_empty() {
        n.url.clone()
    } else {
        text
    }
}

/// A store record that can be written to a search index
pub trait IndexedRecord {
    fn id(&self) -> i64;

    fn embedding_text(&self) -> String;

    fn to_document(&self, embedding: Vec<f32>) -> Result<Value, serde_json::Error>;
}

impl IndexedRecord for PropertySyncRecord {
    fn id(&self) -> i64 {
        self.property.id
    }

    fn embedding_text(&self) -> String {
        property_embedding_text(self)
    }

    fn to_document(&self, embedding: Vec<f32>) -> Result<Value, serde_json::Error> {
        serde_json::to_value(PropertyDocument::new(self, embedding))
    }
}

impl IndexedRecord for NodeSyncRecord {
    fn id(&self) -> i64 {
        self.node.id
    }

    fn embedding_text(&self) -> String {
        node_embedding_text(self)
    }

    fn to_document(&self, embedding: Vec<f32>) -> Result<Value, serde_json::Error> {
        serde_json::to_value(NodeDocument::new(self, embedding))
    }
}
