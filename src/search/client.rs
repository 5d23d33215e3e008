//! Search index capability and its Meilisearch implementation
//!
//! Write operations (create index, settings, documents) are asynchronous in
//! Meilisearch: the API answers with a task id which is polled on
//! `/tasks/{uid}` until it succeeds or fails.

use crate::config::{optional_env, SearchConfig};
use crate::search::settings::IndexSettings;
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Errors returned by a search index
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Network error talking to search index: {0}")]
    Network(String),

    #[error("Search index API error ({status}, {code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("Index task {uid} failed ({code}): {message}")]
    TaskFailed {
        uid: u64,
        code: String,
        message: String,
    },

    #[error("Index task {uid} did not finish within {timeout_secs}s")]
    TaskTimeout { uid: u64, timeout_secs: u64 },

    #[error("Unexpected search index response: {0}")]
    Parse(String),
}

/// Outcome of an index creation request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexCreation {
    Created,
    AlreadyExists,
}

/// Hybrid (keyword + vector) ranking options
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HybridQuery {
    pub semantic_ratio: f32,
    pub embedder: String,
}

/// Body of a search request
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub q: String,
    pub limit: usize,
    pub offset: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hybrid: Option<HybridQuery>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector: Option<Vec<f32>>,
}

/// Search results as returned by the index
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
    #[serde(default)]
    pub hits: Vec<Value>,
    #[serde(default)]
    pub estimated_total_hits: Option<u64>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: Option<usize>,
    #[serde(default)]
    pub processing_time_ms: u64,
    #[serde(default)]
    pub query: String,
}

/// A document store with keyword and vector search
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Creates index `uid`, reporting an existing index instead of failing
    async fn create_index(&self, uid: &str, primary_key: &str)
        -> Result<IndexCreation, IndexError>;

    /// Replaces the searchable/filterable/sortable lists and embedders
    async fn update_settings(&self, uid: &str, settings: &IndexSettings) -> Result<(), IndexError>;

    /// One page of document ids, in index order
    async fn list_document_ids(
        &self,
        uid: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<i64>, IndexError>;

    /// Adds (or replaces) documents keyed by `id` and waits for the write
    async fn add_documents(&self, uid: &str, documents: &[Value]) -> Result<(), IndexError>;

    async fn search(&self, uid: &str, query: &SearchQuery) -> Result<SearchResults, IndexError>;

    async fn document_count(&self, uid: &str) -> Result<u64, IndexError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnqueuedTask {
    task_uid: u64,
}

#[derive(Debug, Deserialize)]
struct TaskView {
    status: String,
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    code: String,
}

#[derive(Debug, Deserialize)]
struct DocumentsPage {
    #[serde(default)]
    results: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndexStats {
    number_of_documents: u64,
}

/// Meilisearch REST client
#[derive(Debug, Clone)]
pub struct MeiliClient {
    http_client: Client,
    host: String,
    api_key: Option<String>,
    poll_interval: Duration,
    task_timeout: Duration,
}

impl MeiliClient {
    pub fn new(host: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            http_client: Client::new(),
            host: host.into().trim_end_matches('/').to_string(),
            api_key,
            poll_interval: Duration::from_millis(100),
            task_timeout: Duration::from_secs(60),
        }
    }

    /// Builds the client from the `[search]` section
    ///
    /// The API key is optional; a local development instance needs none.
    pub fn from_config(config: &SearchConfig) -> Self {
        Self::new(&config.host, optional_env(&config.api_key_env))
            .with_task_timeout(Duration::from_secs(config.task_timeout_secs))
    }

    pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .http_client
            .request(method, format!("{}{}", self.host, path));
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, IndexError> {
        let response = builder
            .send()
            .await
            .map_err(|e| IndexError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let body: ApiErrorBody = serde_json::from_str(&text).unwrap_or(ApiErrorBody {
            message: text,
            code: String::new(),
        });
        Err(IndexError::Api {
            status: status.as_u16(),
            code: body.code,
            message: body.message,
        })
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, IndexError> {
        self.send(builder)
            .await?
            .json()
            .await
            .map_err(|e| IndexError::Parse(e.to_string()))
    }

    /// Polls a task until it leaves the enqueued/processing states
    async fn wait_for_task(&self, uid: u64) -> Result<TaskView, IndexError> {
        let start = Instant::now();
        loop {
            let task: TaskView = self
                .send_json(self.request(Method::GET, &format!("/tasks/{}", uid)))
                .await?;

            match task.status.as_str() {
                "enqueued" | "processing" => {}
                _ => return Ok(task),
            }

            if start.elapsed() >= self.task_timeout {
                return Err(IndexError::TaskTimeout {
                    uid,
                    timeout_secs: self.task_timeout.as_secs(),
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Enqueues a write, waits for it and turns a failed task into an error
    async fn run_task(&self, builder: RequestBuilder) -> Result<(), IndexError> {
        let enqueued: EnqueuedTask = self.send_json(builder).await?;
        let task = self.wait_for_task(enqueued.task_uid).await?;
        task_result(enqueued.task_uid, task)
    }
}

fn task_result(uid: u64, task: TaskView) -> Result<(), IndexError> {
    if task.status == "succeeded" {
        return Ok(());
    }
    let error = task.error.unwrap_or_default();
    Err(IndexError::TaskFailed {
        uid,
        code: if error.code.is_empty() {
            task.status
        } else {
            error.code
        },
        message: error.message,
    })
}

/// Reads a document id that may be serialized as a number or a string
fn document_id(doc: &Value) -> Option<i64> {
    match doc.get("id")? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

const INDEX_ALREADY_EXISTS: &str = "index_already_exists";

#[async_trait]
impl SearchIndex for MeiliClient {
    async fn create_index(
        &self,
        uid: &str,
        primary_key: &str,
    ) -> Result<IndexCreation, IndexError> {
        let builder = self
            .request(Method::POST, "/indexes")
            .json(&json!({ "uid": uid, "primaryKey": primary_key }));

        match self.run_task(builder).await {
            Ok(()) => Ok(IndexCreation::Created),
            Err(IndexError::TaskFailed { code, .. }) | Err(IndexError::Api { code, .. })
                if code == INDEX_ALREADY_EXISTS =>
            {
                Ok(IndexCreation::AlreadyExists)
            }
            Err(e) => Err(e),
        }
    }

    async fn update_settings(&self, uid: &str, settings: &IndexSettings) -> Result<(), IndexError> {
        let builder = self
            .request(Method::PATCH, &format!("/indexes/{}/settings", uid))
            .json(settings);
        self.run_task(builder).await
    }

    async fn list_document_ids(
        &self,
        uid: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<i64>, IndexError> {
        let builder = self
            .request(Method::GET, &format!("/indexes/{}/documents", uid))
            .query(&[
                ("offset", offset.to_string()),
                ("limit", limit.to_string()),
                ("fields", "id".to_string()),
            ]);
        let page: DocumentsPage = self.send_json(builder).await?;

        page.results
            .iter()
            .map(|doc| {
                document_id(doc)
                    .ok_or_else(|| IndexError::Parse(format!("document without numeric id: {}", doc)))
            })
            .collect()
    }

    async fn add_documents(&self, uid: &str, documents: &[Value]) -> Result<(), IndexError> {
        let builder = self
            .request(Method::POST, &format!("/indexes/{}/documents", uid))
            .query(&[("primaryKey", "id")])
            .json(documents);
        self.run_task(builder).await
    }

    async fn search(&self, uid: &str, query: &SearchQuery) -> Result<SearchResults, IndexError> {
        let builder = self
            .request(Method::POST, &format!("/indexes/{}/search", uid))
            .json(query);
        self.send_json(builder).await
    }

    async fn document_count(&self, uid: &str) -> Result<u64, IndexError> {
        let stats: IndexStats = self
            .send_json(self.request(Method::GET, &format!("/indexes/{}/stats", uid)))
            .await?;
        Ok(stats.number_of_documents)
    }
}
