//! Incremental index synchronization
//!
//! The sync is append-only: records whose id is already in the index are
//! skipped, new ones are embedded and added in batches. Existing documents are
//! never updated or removed, so edits in the store after a record's first sync
//! do not reach the index.

use crate::ai::{Embedder, EmbeddingError};
use crate::config::SearchConfig;
use crate::search::client::{IndexCreation, IndexError, SearchIndex};
use crate::search::documents::IndexedRecord;
use crate::search::settings::{node_settings, property_settings};
use crate::storage::{NodeSyncRecord, PropertySyncRecord};
use futures::{stream, StreamExt, TryStreamExt};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// The two synced entity types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Properties,
    Nodes,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Properties => write!(f, "properties"),
            EntityKind::Nodes => write!(f, "nodes"),
        }
    }
}

/// Why a single batch could not be written
#[derive(Debug, Error)]
pub enum BatchFailure {
    #[error("embedding record {id}: {source}")]
    Embedding { id: i64, source: EmbeddingError },

    #[error("serializing record {id}: {source}")]
    Document { id: i64, source: serde_json::Error },

    #[error("adding documents: {0}")]
    Index(#[from] IndexError),
}

/// Errors produced by the sync engine
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Failed to set up index {index}: {source}")]
    Setup { index: String, source: IndexError },

    #[error("Failed to list existing {entity} documents: {source}")]
    Listing { entity: EntityKind, source: IndexError },

    #[error("{entity} batch {batch} failed after {synced} documents were indexed: {source}")]
    Batch {
        entity: EntityKind,
        batch: usize,
        synced: usize,
        source: BatchFailure,
    },
}

/// Index names and throughput limits of a sync run
#[derive(Debug, Clone, PartialEq)]
pub struct SyncOptions {
    pub properties_index: String,
    pub nodes_index: String,
    pub batch_size: usize,
    pub page_size: usize,
    pub embedding_concurrency: usize,
    pub dimensions: usize,
}

impl SyncOptions {
    pub fn from_config(search: &SearchConfig, dimensions: usize) -> Self {
        Self {
            properties_index: search.properties_index.clone(),
            nodes_index: search.nodes_index.clone(),
            batch_size: search.batch_size,
            page_size: search.page_size,
            embedding_concurrency: search.embedding_concurrency,
            dimensions,
        }
    }

    pub fn index_for(&self, entity: EntityKind) -> &str {
        match entity {
            EntityKind::Properties => &self.properties_index,
            EntityKind::Nodes => &self.nodes_index,
        }
    }
}

/// Outcome of syncing one entity type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntitySyncReport {
    pub entity: EntityKind,
    /// Records read from the store
    pub total: usize,
    /// Ids already present in the index before this run
    pub existing: usize,
    /// Documents added by this run
    pub synced: usize,
    pub batches: usize,
}

/// Outcome of a full sync run
///
/// A failure of one entity type does not stop the other.
#[derive(Debug)]
pub struct SyncReport {
    pub properties: Result<EntitySyncReport, SyncError>,
    pub nodes: Result<EntitySyncReport, SyncError>,
    pub property_documents: Option<u64>,
    pub node_documents: Option<u64>,
}

impl SyncReport {
    pub fn is_complete(&self) -> bool {
        self.properties.is_ok() && self.nodes.is_ok()
    }
}

/// Reconciles the relational store with the search index
pub struct IndexSyncEngine<I, E> {
    index: I,
    embedder: E,
    options: SyncOptions,
}

impl<I, E> IndexSyncEngine<I, E>
where
    I: SearchIndex,
    E: Embedder,
{
    pub fn new(index: I, embedder: E, options: SyncOptions) -> Self {
        Self {
            index,
            embedder,
            options,
        }
    }

    pub fn index(&self) -> &I {
        &self.index
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Creates both indexes if needed and (re)applies their settings
    pub async fn setup_indexes(&self) -> Result<(), SyncError> {
        let dimensions = self.options.dimensions;
        let plan = [
            (&self.options.properties_index, property_settings(dimensions)),
            (&self.options.nodes_index, node_settings(dimensions)),
        ];

        for (uid, settings) in plan {
            let setup_error = |source| SyncError::Setup {
                index: uid.clone(),
                source,
            };

            match self.index.create_index(uid, "id").await.map_err(setup_error)? {
                IndexCreation::Created => tracing::info!("Created index {}", uid),
                IndexCreation::AlreadyExists => tracing::debug!("Index {} already exists", uid),
            }

            self.index
                .update_settings(uid, &settings)
                .await
                .map_err(setup_error)?;
            tracing::info!("Applied settings to index {}", uid);
        }

        Ok(())
    }

    /// All document ids of an index, read page by page until a short page
    pub async fn existing_ids(&self, uid: &str) -> Result<HashSet<i64>, IndexError> {
        let page_size = self.options.page_size.max(1);
        let mut ids = HashSet::new();
        let mut offset = 0;

        loop {
            let page = self.index.list_document_ids(uid, offset, page_size).await?;
            let fetched = page.len();
            ids.extend(page);

            if fetched < page_size {
                break;
            }
            offset += fetched;
        }

        Ok(ids)
    }

    /// Embeds a batch with bounded concurrency, keeping record order
    async fn build_documents<R>(&self, batch: &[R]) -> Result<Vec<Value>, BatchFailure>
    where
        R: IndexedRecord + Sync,
    {
        stream::iter(batch)
            .map(|record| async move {
                let id = record.id();
                let embedding = self
                    .embedder
                    .embed(&record.embedding_text())
                    .await
                    .map_err(|source| BatchFailure::Embedding { id, source })?;
                record
                    .to_document(embedding)
                    .map_err(|source| BatchFailure::Document { id, source })
            })
            .buffered(self.options.embedding_concurrency.max(1))
            .try_collect()
            .await
    }

    /// Adds every record not yet in the index
    ///
    /// Batches are written in store order; the first failing batch aborts the
    /// remaining ones for this entity type.
    pub async fn sync_records<R>(
        &self,
        entity: EntityKind,
        records: &[R],
    ) -> Result<EntitySyncReport, SyncError>
    where
        R: IndexedRecord + Sync,
    {
        let uid = self.options.index_for(entity);
        tracing::info!("Syncing {}...", entity);

        let existing = self
            .existing_ids(uid)
            .await
            .map_err(|source| SyncError::Listing { entity, source })?;
        tracing::info!("Found {} existing {} in index", existing.len(), entity);

        let pending: Vec<&R> = records
            .iter()
            .filter(|r| !existing.contains(&r.id()))
            .collect();
        tracing::info!("Found {} new {} to sync", pending.len(), entity);

        let mut report = EntitySyncReport {
            entity,
            total: records.len(),
            existing: existing.len(),
            synced: 0,
            batches: 0,
        };

        for (batch_idx, chunk) in pending.chunks(self.options.batch_size.max(1)).enumerate() {
            let batch_no = batch_idx + 1;
            let result = match self.build_documents(chunk).await {
                Ok(documents) => self
                    .index
                    .add_documents(uid, &documents)
                    .await
                    .map_err(BatchFailure::from),
                Err(e) => Err(e),
            };

            if let Err(source) = result {
                return Err(SyncError::Batch {
                    entity,
                    batch: batch_no,
                    synced: report.synced,
                    source,
                });
            }

            report.synced += chunk.len();
            report.batches += 1;
            tracing::info!(
                "Synced {} batch {} ({}/{})",
                entity,
                batch_no,
                report.synced,
                pending.len()
            );
        }

        Ok(report)
    }

    pub async fn sync_properties(
        &self,
        records: &[PropertySyncRecord],
    ) -> Result<EntitySyncReport, SyncError> {
        self.sync_records(EntityKind::Properties, records).await
    }

    pub async fn sync_nodes(&self, records: &[NodeSyncRecord]) -> Result<EntitySyncReport, SyncError> {
        self.sync_records(EntityKind::Nodes, records).await
    }

    async fn document_count(&self, entity: EntityKind) -> Option<u64> {
        let uid = self.options.index_for(entity);
        match self.index.document_count(uid).await {
            Ok(count) => {
                tracing::info!("Index {} holds {} documents", uid, count);
                Some(count)
            }
            Err(e) => {
                tracing::warn!("Could not read stats of index {}: {}", uid, e);
                None
            }
        }
    }

    /// Sets up the indexes, then syncs properties and nodes independently
    ///
    /// Only a setup failure is returned as an error; per-entity failures are
    /// carried in the report.
    pub async fn run(
        &self,
        properties: &[PropertySyncRecord],
        nodes: &[NodeSyncRecord],
    ) -> Result<SyncReport, SyncError> {
        self.setup_indexes().await?;

        let properties = self.sync_properties(properties).await;
        if let Err(e) = &properties {
            tracing::error!("{}", e);
        }
        let nodes = self.sync_nodes(nodes).await;
        if let Err(e) = &nodes {
            tracing::error!("{}", e);
        }

        Ok(SyncReport {
            properties,
            nodes,
            property_documents: self.document_count(EntityKind::Properties).await,
            node_documents: self.document_count(EntityKind::Nodes).await,
        })
    }
}

impl<R: IndexedRecord> IndexedRecord for &R {
    fn id(&self) -> i64 {
        (**self).id()
    }

    fn embedding_text(&self) -> String {
        (**self).embedding_text()
    }

    fn to_document(&self, embedding: Vec<f32>) -> Result<Value, serde_json::Error> {
        (**self).to_document(embedding)
    }
}
