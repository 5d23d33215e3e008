//! Index settings applied on every sync

use serde::Serialize;
use std::collections::BTreeMap;

/// Name of the user-provided embedder documents carry vectors for
pub const DEFAULT_EMBEDDER: &str = "default";

/// A vector source whose embeddings are supplied with each document
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EmbedderSettings {
    pub source: String,
    pub dimensions: usize,
}

impl EmbedderSettings {
    pub fn user_provided(dimensions: usize) -> Self {
        Self {
            source: "userProvided".to_string(),
            dimensions,
        }
    }
}

/// Attribute lists and embedders of one index
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IndexSettings {
    pub searchable_attributes: Vec<String>,
    pub filterable_attributes: Vec<String>,
    pub sortable_attributes: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub embedders: BTreeMap<String, EmbedderSettings>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_embedder(dimensions: usize) -> BTreeMap<String, EmbedderSettings> {
    let mut embedders = BTreeMap::new();
    embedders.insert(
        DEFAULT_EMBEDDER.to_string(),
        EmbedderSettings::user_provided(dimensions),
    );
    embedders
}

/// Settings of the properties index
pub fn property_settings(dimensions: usize) -> IndexSettings {
    IndexSettings {
        searchable_attributes: strings(&[
            "hostname", "city", "state", "country", "address1", "address2",
        ]),
        filterable_attributes: strings(&["city", "state", "country"]),
        sortable_attributes: strings(&["createdAt", "updatedAt"]),
        embedders: default_embedder(dimensions),
    }
}

/// Settings of the nodes index
pub fn node_settings(dimensions: usize) -> IndexSettings {
    IndexSettings {
        searchable_attributes: strings(&[
            "title",
            "description",
            "summary",
            "keywords",
            "industry",
            "audience",
            "technologies",
            "propertyHostname",
            "property.hostname",
            "property.city",
            "property.state",
            "property.country",
        ]),
        filterable_attributes: strings(&[
            "propertyId",
            "industry",
            "keywords",
            "technologies",
            "propertyHostname",
            "property.city",
            "property.state",
            "property.country",
        ]),
        sortable_attributes: strings(&["createdAt", "updatedAt"]),
        embedders: default_embedder(dimensions),
    }
}
