//! Search index integration
//!
//! This module contains:
//! - The `SearchIndex` capability and its Meilisearch client
//! - Index documents and settings
//! - The append-only delta sync engine
//! - The query surface used by the `search` command

mod client;
mod documents;
mod query;
mod settings;
mod sync;

pub use client::{
    HybridQuery, IndexCreation, IndexError, MeiliClient, SearchIndex, SearchQuery, SearchResults,
};
pub use documents::{
    node_embedding_text, property_embedding_text, IndexedRecord, NodeDocument, PropertyDocument,
    PropertyFields, Vectors,
};
pub use query::{
    build_filter, execute_search, search_with_params, SearchFilters, SearchRequest,
    SearchResponse, SearchType, ValidationError, DEFAULT_LIMIT,
};
pub use settings::{
    node_settings, property_settings, EmbedderSettings, IndexSettings, DEFAULT_EMBEDDER,
};
pub use sync::{
    BatchFailure, EntityKind, EntitySyncReport, IndexSyncEngine, SyncError, SyncOptions,
    SyncReport,
};

use crate::ai::OpenAiClient;
use crate::config::Config;
use crate::storage::Storage;
use crate::ProspectError;

/// Loads the store snapshot and runs a full sync against Meilisearch
///
/// Both entity types are read before any network call, so the run works on a
/// consistent snapshot of the store.
pub async fn sync_indexes<S: Storage>(
    config: &Config,
    storage: &S,
    embedder: OpenAiClient,
) -> Result<SyncReport, ProspectError> {
    let properties = storage.load_properties_for_sync()?;
    let nodes = storage.load_nodes_for_sync()?;
    tracing::info!(
        "Loaded {} properties and {} nodes from the store",
        properties.len(),
        nodes.len()
    );

    let engine = IndexSyncEngine::new(
        MeiliClient::from_config(&config.search),
        embedder,
        SyncOptions::from_config(&config.search, config.openai.dimensions),
    );
    Ok(engine.run(&properties, &nodes).await?)
}
