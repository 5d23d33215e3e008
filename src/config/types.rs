use serde::Deserialize;

/// Main configuration structure for Prospect
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub search: SearchConfig,

    /// URLs the frontier starts from (depth 0)
    #[serde(default)]
    pub seeds: Vec<String>,

    /// Case-insensitive substrings; any URL containing one is never fetched
    #[serde(default)]
    pub blacklist: Vec<String>,

    /// Hostnames enriched when no unvisited properties exist yet
    #[serde(default, rename = "seed-domains")]
    pub seed_domains: Vec<String>,
}

/// Frontier behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Maximum depth to follow internal links from a seed URL
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    /// Delay after every processed item, success or failure (milliseconds)
    #[serde(default = "default_crawl_delay_ms")]
    pub crawl_delay_ms: u64,

    /// Whole-request timeout for page fetches (seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_true")]
    pub follow_redirects: bool,

    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            crawl_delay_ms: default_crawl_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            follow_redirects: true,
            max_redirects: default_max_redirects(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Format: CrawlerName/Version (+ContactURL; ContactEmail)
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Relational store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// Metadata enrichment configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct EnrichmentConfig {
    /// Number of body-text characters sent to the metadata extractor
    #[serde(default = "default_body_text_limit")]
    pub body_text_limit: usize,

    /// Delay between domains (milliseconds); falls back to the crawler delay
    #[serde(default)]
    pub delay_ms: Option<u64>,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            body_text_limit: default_body_text_limit(),
            delay_ms: None,
        }
    }
}

/// OpenAI-compatible API configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OpenAiConfig {
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// Environment variable holding the API key
    #[serde(default = "default_openai_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_chat_model")]
    pub chat_model: String,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Embedding vector length produced by `embedding_model`
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            api_key_env: default_openai_key_env(),
            chat_model: default_chat_model(),
            embedding_model: default_embedding_model(),
            dimensions: default_dimensions(),
        }
    }
}

/// Search index configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SearchConfig {
    #[serde(default = "default_search_host")]
    pub host: String,

    /// Environment variable holding the index API key (optional)
    #[serde(default = "default_search_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_properties_index")]
    pub properties_index: String,

    #[serde(default = "default_nodes_index")]
    pub nodes_index: String,

    /// Documents per add-documents call
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Page size used when listing known document ids
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Concurrent embedding calls within one batch
    #[serde(default = "default_embedding_concurrency")]
    pub embedding_concurrency: usize,

    /// Weight of vector similarity in hybrid queries (0.0 - 1.0)
    #[serde(default = "default_semantic_ratio")]
    pub semantic_ratio: f32,

    /// How long to wait for an index task to finish (seconds)
    #[serde(default = "default_task_timeout_secs")]
    pub task_timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            host: default_search_host(),
            api_key_env: default_search_key_env(),
            properties_index: default_properties_index(),
            nodes_index: default_nodes_index(),
            batch_size: default_batch_size(),
            page_size: default_page_size(),
            embedding_concurrency: default_embedding_concurrency(),
            semantic_ratio: default_semantic_ratio(),
            task_timeout_secs: default_task_timeout_secs(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_depth() -> u32 {
    7
}

fn default_crawl_delay_ms() -> u64 {
    5000
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_max_redirects() -> usize {
    10
}

fn default_body_text_limit() -> usize {
    3000
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_chat_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_dimensions() -> usize {
    1536
}

fn default_search_host() -> String {
    "http://127.0.0.1:7700".to_string()
}

fn default_search_key_env() -> String {
    "MEILISEARCH_API_KEY".to_string()
}

fn default_properties_index() -> String {
    "properties".to_string()
}

fn default_nodes_index() -> String {
    "nodes".to_string()
}

fn default_batch_size() -> usize {
    100
}

fn default_page_size() -> usize {
    1000
}

fn default_embedding_concurrency() -> usize {
    8
}

fn default_semantic_ratio() -> f32 {
    0.5
}

fn default_task_timeout_secs() -> u64 {
    60
}
