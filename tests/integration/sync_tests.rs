//! Integration tests for the index sync engine
//!
//! The engine runs against an in-memory index fake for delta and batching
//! behavior, and against wiremock-backed Meilisearch and OpenAI endpoints for
//! the wire protocol.

use async_trait::async_trait;
use prospect::ai::{Embedder, EmbeddingError, OpenAiClient};
use prospect::search::{
    EntityKind, IndexCreation, IndexError, IndexSettings, IndexSyncEngine, MeiliClient,
    SearchIndex, SearchQuery, SearchResults, SyncError, SyncOptions,
};
use prospect::storage::{ContactDetails, NodeUpsert, PropertyUpdate, SqliteStorage, Storage};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// In-memory index keeping documents by id
#[derive(Default, Clone)]
struct MemoryIndex {
    indexes: Arc<Mutex<HashMap<String, BTreeMap<i64, Value>>>>,
    add_batches: Arc<Mutex<Vec<(String, usize)>>>,
    settings: Arc<Mutex<HashMap<String, IndexSettings>>>,
}

impl MemoryIndex {
    fn preload(&self, uid: &str, ids: impl IntoIterator<Item = i64>) {
        let mut indexes = self.indexes.lock().unwrap();
        let docs = indexes.entry(uid.to_string()).or_default();
        for id in ids {
            docs.insert(id, json!({ "id": id }));
        }
    }

    fn document(&self, uid: &str, id: i64) -> Option<Value> {
        self.indexes.lock().unwrap().get(uid)?.get(&id).cloned()
    }

    fn batches(&self, uid: &str) -> Vec<usize> {
        self.add_batches
            .lock()
            .unwrap()
            .iter()
            .filter(|(index, _)| index == uid)
            .map(|(_, size)| *size)
            .collect()
    }
}

#[async_trait]
impl SearchIndex for MemoryIndex {
    async fn create_index(&self, uid: &str, _pk: &str) -> Result<IndexCreation, IndexError> {
        let mut indexes = self.indexes.lock().unwrap();
        if indexes.contains_key(uid) {
            return Ok(IndexCreation::AlreadyExists);
        }
        indexes.insert(uid.to_string(), BTreeMap::new());
        Ok(IndexCreation::Created)
    }

    async fn update_settings(&self, uid: &str, settings: &IndexSettings) -> Result<(), IndexError> {
        self.settings
            .lock()
            .unwrap()
            .insert(uid.to_string(), settings.clone());
        Ok(())
    }

    async fn list_document_ids(
        &self,
        uid: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<i64>, IndexError> {
        let indexes = self.indexes.lock().unwrap();
        Ok(indexes
            .get(uid)
            .map(|docs| docs.keys().skip(offset).take(limit).copied().collect())
            .unwrap_or_default())
    }

    async fn add_documents(&self, uid: &str, documents: &[Value]) -> Result<(), IndexError> {
        self.add_batches
            .lock()
            .unwrap()
            .push((uid.to_string(), documents.len()));
        let mut indexes = self.indexes.lock().unwrap();
        let docs = indexes.entry(uid.to_string()).or_default();
        for doc in documents {
            let id = doc["id"]
                .as_i64()
                .ok_or_else(|| IndexError::Parse("missing id".to_string()))?;
            docs.insert(id, doc.clone());
        }
        Ok(())
    }

    async fn search(&self, _uid: &str, _query: &SearchQuery) -> Result<SearchResults, IndexError> {
        Ok(SearchResults::default())
    }

    async fn document_count(&self, uid: &str) -> Result<u64, IndexError> {
        Ok(self
            .indexes
            .lock()
            .unwrap()
            .get(uid)
            .map_or(0, |docs| docs.len() as u64))
    }
}

/// Deterministic embedder that fails on texts containing "unembeddable"
#[derive(Default, Clone)]
struct CountingEmbedder {
    calls: Arc<AtomicUsize>,
}

impl CountingEmbedder {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for CountingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if text.contains("unembeddable") {
            return Err(EmbeddingError::EmptyResponse);
        }
        Ok(vec![text.len() as f32, 1.0])
    }
}

fn options(batch_size: usize) -> SyncOptions {
    SyncOptions {
        properties_index: "properties".to_string(),
        nodes_index: "nodes".to_string(),
        batch_size,
        page_size: 4,
        embedding_concurrency: 3,
        dimensions: 2,
    }
}

/// A store with `count` enriched properties, each owning one homepage node
fn populated_store(count: usize) -> SqliteStorage {
    let mut storage = SqliteStorage::new_in_memory().unwrap();
    for i in 1..=count {
        let hostname = format!("shop{}.test", i);
        let property_id = storage
            .upsert_property(
                &hostname,
                &PropertyUpdate {
                    contact: ContactDetails {
                        city: Some("Grand Rapids".to_string()),
                        ..Default::default()
                    },
                    ..Default::default()
                },
            )
            .unwrap();
        storage
            .upsert_node(&NodeUpsert {
                url: format!("https://{}/", hostname),
                title: Some(format!("Shop {}", i)),
                keywords: vec!["retail".to_string()],
                property_id,
                ..Default::default()
            })
            .unwrap();
    }
    storage
}

#[tokio::test]
async fn test_delta_sync_adds_only_missing_documents() {
    let storage = populated_store(10);
    let index = MemoryIndex::default();
    index.preload("properties", 1..=7);
    let embedder = CountingEmbedder::default();

    let engine = IndexSyncEngine::new(index.clone(), embedder.clone(), options(2));
    let report = engine
        .sync_properties(&storage.load_properties_for_sync().unwrap())
        .await
        .unwrap();

    assert_eq!(report.entity, EntityKind::Properties);
    assert_eq!(report.total, 10);
    assert_eq!(report.existing, 7);
    assert_eq!(report.synced, 3);
    assert_eq!(index.batches("properties"), vec![2, 1]);
    assert_eq!(embedder.calls(), 3);
    assert!(index.document("properties", 10).is_some());
}

#[tokio::test]
async fn test_second_run_makes_no_writes() {
    let storage = populated_store(5);
    let properties = storage.load_properties_for_sync().unwrap();
    let nodes = storage.load_nodes_for_sync().unwrap();

    let index = MemoryIndex::default();
    let embedder = CountingEmbedder::default();
    let engine = IndexSyncEngine::new(index.clone(), embedder.clone(), options(2));

    let first = engine.run(&properties, &nodes).await.unwrap();
    assert!(first.is_complete());
    assert_eq!(first.property_documents, Some(5));
    assert_eq!(first.node_documents, Some(5));
    let embeds_after_first = embedder.calls();
    let batches_after_first = index.add_batches.lock().unwrap().len();

    let second = engine.run(&properties, &nodes).await.unwrap();
    assert_eq!(second.properties.as_ref().unwrap().synced, 0);
    assert_eq!(second.nodes.as_ref().unwrap().synced, 0);
    assert_eq!(embedder.calls(), embeds_after_first);
    assert_eq!(index.add_batches.lock().unwrap().len(), batches_after_first);

    // Settings are reapplied on every run
    assert_eq!(index.settings.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_node_documents_embed_property_projection() {
    let storage = populated_store(1);
    let index = MemoryIndex::default();
    let engine = IndexSyncEngine::new(index.clone(), CountingEmbedder::default(), options(10));

    engine
        .run(
            &storage.load_properties_for_sync().unwrap(),
            &storage.load_nodes_for_sync().unwrap(),
        )
        .await
        .unwrap();

    let node = index.document("nodes", 1).unwrap();
    assert_eq!(node["url"], json!("https://shop1.test/"));
    assert_eq!(node["propertyHostname"], json!("shop1.test"));
    assert_eq!(node["property"]["city"], json!("Grand Rapids"));
    assert_eq!(node["_vectors"]["default"].as_array().unwrap().len(), 2);
    assert!(node["createdAt"].as_i64().unwrap() > 0);

    let property = index.document("properties", 1).unwrap();
    assert_eq!(property["hostname"], json!("shop1.test"));
    assert!(property.get("property").is_none());
}

#[tokio::test]
async fn test_failure_in_one_entity_does_not_stop_the_other() {
    let mut storage = populated_store(3);
    storage
        .upsert_property("unembeddable.test", &PropertyUpdate::default())
        .unwrap();

    let index = MemoryIndex::default();
    let engine = IndexSyncEngine::new(index.clone(), CountingEmbedder::default(), options(2));

    let report = engine
        .run(
            &storage.load_properties_for_sync().unwrap(),
            &storage.load_nodes_for_sync().unwrap(),
        )
        .await
        .unwrap();

    assert!(!report.is_complete());
    // The first batch (ids 1, 2) landed; the batch holding id 4 failed
    assert!(matches!(
        report.properties,
        Err(SyncError::Batch { entity: EntityKind::Properties, batch: 2, synced: 2, .. })
    ));
    assert_eq!(index.batches("properties"), vec![2]);
    assert_eq!(report.nodes.as_ref().unwrap().synced, 3);
}

async fn mount_task(server: &MockServer, uid: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/tasks/{}", uid)))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"uid": uid, "status": "succeeded"})),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_sync_against_meilisearch_and_openai() {
    let meili = MockServer::start().await;
    let openai = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/indexes"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({"taskUid": 1})))
        .expect(2)
        .mount(&meili)
        .await;
    Mock::given(method("PATCH"))
        .and(path_regex(r"^/indexes/(properties|nodes)/settings$"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({"taskUid": 2})))
        .expect(2)
        .mount(&meili)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/indexes/(properties|nodes)/documents$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [], "offset": 0, "limit": 1000, "total": 0
        })))
        .mount(&meili)
        .await;
    Mock::given(method("POST"))
        .and(path("/indexes/properties/documents"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({"taskUid": 3})))
        .expect(1)
        .mount(&meili)
        .await;
    Mock::given(method("POST"))
        .and(path("/indexes/nodes/documents"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({"taskUid": 4})))
        .expect(1)
        .mount(&meili)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/indexes/(properties|nodes)/stats$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"numberOfDocuments": 2})))
        .mount(&meili)
        .await;
    for uid in 1..=4 {
        mount_task(&meili, uid).await;
    }

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"embedding": [0.25, 0.5, 0.75], "index": 0}]
        })))
        .expect(4)
        .mount(&openai)
        .await;

    let storage = populated_store(2);
    let index = MeiliClient::new(meili.uri(), None).with_poll_interval(Duration::from_millis(5));
    let embedder = OpenAiClient::new("sk-test")
        .with_base_url(openai.uri())
        .with_dimensions(3);
    let engine = IndexSyncEngine::new(
        index,
        embedder,
        SyncOptions {
            dimensions: 3,
            page_size: 1000,
            ..options(100)
        },
    );

    let report = engine
        .run(
            &storage.load_properties_for_sync().unwrap(),
            &storage.load_nodes_for_sync().unwrap(),
        )
        .await
        .unwrap();

    assert!(report.is_complete());
    assert_eq!(report.properties.as_ref().unwrap().batches, 1);
    assert_eq!(report.node_documents, Some(2));
}
