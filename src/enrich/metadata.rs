//! Metadata extraction contract
//!
//! The extractor turns page text into structured fields with two JSON-mode
//! model calls. Decoding the model output is a separate, pure step: absent,
//! null or wrongly-typed fields become defaults, and output that is not a
//! JSON object decodes to all defaults.

use crate::ai::{AiError, OpenAiClient};
use crate::storage::ContactDetails;
use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors produced by a metadata extractor
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Metadata extraction request failed: {0}")]
    Request(#[from] AiError),
}

/// Input to page metadata extraction
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    /// Visible body text, already cut to the configured prefix
    pub body_text: String,
    pub title: String,
    pub description: String,
}

/// Descriptive fields of a page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMetadata {
    pub keywords: Vec<String>,
    pub industry: String,
    pub summary: String,
    pub audience: String,
}

/// Extracts structured metadata from page content
#[async_trait]
pub trait MetadataExtractor: Send + Sync {
    /// Keywords, industry, summary and audience of a page
    async fn page_metadata(&self, page: &PageContext) -> Result<PageMetadata, ExtractionError>;

    /// Address and social links found in a footer fragment
    async fn contact_details(&self, footer_html: &str) -> Result<ContactDetails, ExtractionError>;
}

const PAGE_SYSTEM_PROMPT: &str = "You classify business websites. Reply with a JSON object \
     with the keys keywords (array of strings), industry (string), summary (string) and \
     audience (string).";

const CONTACT_SYSTEM_PROMPT: &str = "You read website footers. Reply with a JSON object with \
     the keys address1, address2, city, state, zip, country, facebook, twitter, instagram, \
     linkedin, youtube, tiktok, discord and github. Use null for anything not present.";

#[async_trait]
impl MetadataExtractor for OpenAiClient {
    async fn page_metadata(&self, page: &PageContext) -> Result<PageMetadata, ExtractionError> {
        let prompt = format!(
            "Extract keywords, an industry classification, a short summary and the target \
             audience of this webpage.\n\nTitle: {}\nDescription: {}\n\nBody text:\n{}",
            page.title, page.description, page.body_text
        );
        let raw = self.chat_json(PAGE_SYSTEM_PROMPT, &prompt).await?;
        Ok(decode_page_metadata(&raw))
    }

    async fn contact_details(&self, footer_html: &str) -> Result<ContactDetails, ExtractionError> {
        let prompt = format!(
            "Extract the physical address, split into address1, address2, city, state, zip \
             and country, and the social media profile links from this footer HTML.\n\n{}",
            footer_html
        );
        let raw = self.chat_json(CONTACT_SYSTEM_PROMPT, &prompt).await?;
        Ok(decode_contact_details(&raw))
    }
}

fn parse_object(raw: &str) -> Map<String, Value> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => map,
        Ok(_) => {
            tracing::warn!("Model output is not a JSON object; using defaults");
            Map::new()
        }
        Err(e) => {
            tracing::warn!("Unparseable model output ({}); using defaults", e);
            Map::new()
        }
    }
}

/// Trimmed non-empty string value of `key`
fn text_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Decodes the page metadata reply
///
/// # Examples
///
/// ```
/// use prospect::enrich::decode_page_metadata;
///
/// let metadata = decode_page_metadata(r#"{"industry": "Retail", "keywords": ["bikes", 3]}"#);
/// assert_eq!(metadata.industry, "Retail");
/// assert_eq!(metadata.keywords, vec!["bikes"]);
/// assert_eq!(metadata.summary, "");
///
/// assert_eq!(decode_page_metadata("not json"), Default::default());
/// ```
pub fn decode_page_metadata(raw: &str) -> PageMetadata {
    let map = parse_object(raw);

    let keywords = match map.get("keywords") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    };

    PageMetadata {
        keywords,
        industry: text_field(&map, "industry").unwrap_or_default(),
        summary: text_field(&map, "summary").unwrap_or_default(),
        audience: text_field(&map, "audience").unwrap_or_default(),
    }
}

/// Decodes the footer contact reply; every field is nullable
pub fn decode_contact_details(raw: &str) -> ContactDetails {
    let map = parse_object(raw);
    let field = |key: &str| text_field(&map, key);

    ContactDetails {
        address1: field("address1"),
        address2: field("address2"),
        city: field("city"),
        state: field("state"),
        zip: field("zip"),
        country: field("country"),
        facebook: field("facebook"),
        twitter: field("twitter"),
        instagram: field("instagram"),
        linkedin: field("linkedin"),
        youtube: field("youtube"),
        tiktok: field("tiktok"),
        discord: field("discord"),
        github: field("github"),
    }
}
