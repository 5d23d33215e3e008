//! Integration tests for the search query surface

use async_trait::async_trait;
use prospect::ai::{Embedder, EmbeddingError};
use prospect::config::SearchConfig;
use prospect::search::{
    execute_search, search_with_params, HybridQuery, IndexCreation, IndexError, IndexSettings,
    MeiliClient, SearchIndex, SearchQuery, SearchRequest, SearchResults, ValidationError,
};
use prospect::ProspectError;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

type EventLog = Arc<Mutex<Vec<String>>>;

/// Index fake that records every search it receives
struct RecordingIndex {
    events: EventLog,
    queries: Mutex<Vec<(String, SearchQuery)>>,
}

impl RecordingIndex {
    fn new(events: &EventLog) -> Self {
        Self {
            events: Arc::clone(events),
            queries: Mutex::new(Vec::new()),
        }
    }

    fn last_query(&self) -> (String, SearchQuery) {
        self.queries.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl SearchIndex for RecordingIndex {
    async fn create_index(&self, _uid: &str, _pk: &str) -> Result<IndexCreation, IndexError> {
        Ok(IndexCreation::AlreadyExists)
    }

    async fn update_settings(&self, _uid: &str, _s: &IndexSettings) -> Result<(), IndexError> {
        Ok(())
    }

    async fn list_document_ids(
        &self,
        _uid: &str,
        _offset: usize,
        _limit: usize,
    ) -> Result<Vec<i64>, IndexError> {
        Ok(Vec::new())
    }

    async fn add_documents(&self, _uid: &str, _docs: &[serde_json::Value]) -> Result<(), IndexError> {
        Ok(())
    }

    async fn search(&self, uid: &str, query: &SearchQuery) -> Result<SearchResults, IndexError> {
        self.events.lock().unwrap().push("search".to_string());
        self.queries
            .lock()
            .unwrap()
            .push((uid.to_string(), query.clone()));
        Ok(SearchResults {
            hits: vec![json!({"id": 1, "title": "Spokes Bike Shop"})],
            estimated_total_hits: Some(1),
            limit: Some(query.limit),
            offset: Some(query.offset),
            processing_time_ms: 2,
            query: query.q.clone(),
        })
    }

    async fn document_count(&self, _uid: &str) -> Result<u64, IndexError> {
        Ok(0)
    }
}

struct RecordingEmbedder {
    events: EventLog,
}

#[async_trait]
impl Embedder for RecordingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.events.lock().unwrap().push(format!("embed:{}", text));
        Ok(vec![0.5, 0.5])
    }
}

fn fakes() -> (EventLog, RecordingIndex, RecordingEmbedder) {
    let events: EventLog = Arc::default();
    let index = RecordingIndex::new(&events);
    let embedder = RecordingEmbedder {
        events: Arc::clone(&events),
    };
    (events, index, embedder)
}

fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[tokio::test]
async fn test_missing_query_never_reaches_the_index() {
    let (events, index, embedder) = fakes();

    let result = search_with_params(
        &index,
        &embedder,
        &SearchConfig::default(),
        &params(&[("type", "nodes"), ("vector", "true")]),
    )
    .await;

    assert!(matches!(
        result,
        Err(ProspectError::Validation(ValidationError::MissingQuery))
    ));
    assert!(events.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_type_never_reaches_the_index() {
    let (events, index, embedder) = fakes();

    let result = search_with_params(
        &index,
        &embedder,
        &SearchConfig::default(),
        &params(&[("q", "bikes"), ("type", "pages")]),
    )
    .await;

    match result {
        Err(ProspectError::Validation(e)) => {
            assert_eq!(e.to_string(), "Invalid type 'pages'. Must be 'nodes' or 'properties'")
        }
        other => panic!("expected a validation error, got {:?}", other),
    }
    assert!(events.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_vector_mode_embeds_before_searching() {
    let (events, index, embedder) = fakes();
    let config = SearchConfig {
        semantic_ratio: 0.7,
        ..Default::default()
    };

    let response = search_with_params(
        &index,
        &embedder,
        &config,
        &params(&[("q", "bike repair"), ("vector", "true")]),
    )
    .await
    .unwrap();

    assert_eq!(
        *events.lock().unwrap(),
        vec!["embed:bike repair".to_string(), "search".to_string()]
    );

    let (uid, query) = index.last_query();
    assert_eq!(uid, "nodes");
    assert_eq!(query.vector, Some(vec![0.5, 0.5]));
    assert_eq!(
        query.hybrid,
        Some(HybridQuery {
            semantic_ratio: 0.7,
            embedder: "default".to_string(),
        })
    );
    assert_eq!(response.query, "bike repair");
    assert_eq!(response.hits.len(), 1);
}

#[tokio::test]
async fn test_keyword_mode_does_not_embed() {
    let (events, index, embedder) = fakes();

    let response = search_with_params(
        &index,
        &embedder,
        &SearchConfig::default(),
        &params(&[("q", "bikes"), ("vector", "false"), ("limit", "5"), ("offset", "10")]),
    )
    .await
    .unwrap();

    assert_eq!(*events.lock().unwrap(), vec!["search".to_string()]);
    let (_, query) = index.last_query();
    assert_eq!(query.hybrid, None);
    assert_eq!(query.vector, None);
    assert_eq!((query.limit, query.offset), (5, 10));
    assert_eq!((response.limit, response.offset), (5, 10));
}

#[tokio::test]
async fn test_node_filters_are_joined_and_escaped() {
    let (_, index, embedder) = fakes();

    search_with_params(
        &index,
        &embedder,
        &SearchConfig::default(),
        &params(&[
            ("q", "coffee"),
            ("industry", r#"Food "Service""#),
            ("city", "Grand Rapids"),
            ("state", "MI"),
        ]),
    )
    .await
    .unwrap();

    let (_, query) = index.last_query();
    assert_eq!(
        query.filter.as_deref(),
        Some(
            r#"industry = "Food \"Service\"" AND property.city = "Grand Rapids" AND property.state = "MI""#
        )
    );
}

#[tokio::test]
async fn test_property_search_targets_property_index() {
    let (_, index, embedder) = fakes();
    let request = SearchRequest::from_params(&params(&[
        ("q", "shop"),
        ("type", "properties"),
        ("country", "US"),
    ]))
    .unwrap();

    execute_search(&index, &embedder, &SearchConfig::default(), &request)
        .await
        .unwrap();

    let (uid, query) = index.last_query();
    assert_eq!(uid, "properties");
    assert_eq!(query.filter.as_deref(), Some(r#"country = "US""#));
}

#[tokio::test]
async fn test_response_serializes_camel_case() {
    let (_, index, embedder) = fakes();
    let response = search_with_params(
        &index,
        &embedder,
        &SearchConfig::default(),
        &params(&[("q", "bikes")]),
    )
    .await
    .unwrap();

    let value = serde_json::to_value(&response).unwrap();
    assert_eq!(value["estimatedTotalHits"], json!(1));
    assert_eq!(value["processingTimeMs"], json!(2));
    assert_eq!(value["limit"], json!(20));
    assert_eq!(value["offset"], json!(0));
    assert_eq!(value["query"], json!("bikes"));
}

#[tokio::test]
async fn test_hybrid_search_wire_format() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/indexes/nodes/search"))
        .and(body_json(json!({
            "q": "espresso",
            "limit": 20,
            "offset": 0,
            "filter": "industry = \"Cafe\"",
            "hybrid": {"semanticRatio": 0.5, "embedder": "default"},
            "vector": [0.5, 0.5]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "hits": [{"id": 9}],
            "query": "espresso",
            "processingTimeMs": 4,
            "limit": 20,
            "offset": 0,
            "estimatedTotalHits": 1,
            "semanticHitCount": 1
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (_, _, embedder) = fakes();
    let index = MeiliClient::new(server.uri(), None);

    let response = search_with_params(
        &index,
        &embedder,
        &SearchConfig::default(),
        &params(&[("q", "espresso"), ("vector", "true"), ("industry", "Cafe")]),
    )
    .await
    .unwrap();

    assert_eq!(response.hits, vec![json!({"id": 9})]);
    assert_eq!(response.processing_time_ms, 4);
}
