//! Integration tests for the enrichment pipeline
//!
//! Homepages are served by an in-memory fetcher; metadata comes from either a
//! canned extractor or the OpenAI client pointed at a wiremock server.

use async_trait::async_trait;
use prospect::ai::OpenAiClient;
use prospect::crawler::{FetchError, NoDelay, PageFetcher, Pacer};
use prospect::enrich::{
    EnrichmentPipeline, ExtractionError, MetadataExtractor, PageContext, PageMetadata,
};
use prospect::storage::{ContactDetails, SqliteStorage, Storage};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct StaticSite {
    pages: HashMap<String, String>,
}

impl StaticSite {
    fn with_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }
}

#[async_trait]
impl PageFetcher for StaticSite {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.pages.get(url).cloned().ok_or(FetchError::Status {
            url: url.to_string(),
            status: 503,
        })
    }
}

/// Returns fixed metadata; the call logs are shared so tests can read them
/// after the extractor has moved into the pipeline
#[derive(Default)]
struct CannedExtractor {
    page_calls: Arc<Mutex<Vec<PageContext>>>,
    footer_calls: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl MetadataExtractor for CannedExtractor {
    async fn page_metadata(&self, page: &PageContext) -> Result<PageMetadata, ExtractionError> {
        self.page_calls.lock().unwrap().push(page.clone());
        Ok(PageMetadata {
            keywords: vec!["bicycles".to_string(), "repair".to_string()],
            industry: "Retail".to_string(),
            summary: "A neighborhood bike shop.".to_string(),
            audience: String::new(),
        })
    }

    async fn contact_details(&self, footer_html: &str) -> Result<ContactDetails, ExtractionError> {
        self.footer_calls.lock().unwrap().push(footer_html.to_string());
        Ok(ContactDetails {
            address1: Some("12 Spoke Ave".to_string()),
            city: Some("Grand Rapids".to_string()),
            state: Some("MI".to_string()),
            instagram: Some("https://instagram.com/spokes".to_string()),
            ..Default::default()
        })
    }
}

/// Counts pauses instead of sleeping
#[derive(Default)]
struct CountingPacer {
    pauses: Arc<AtomicUsize>,
}

#[async_trait]
impl Pacer for CountingPacer {
    async fn pause(&self) {
        self.pauses.fetch_add(1, Ordering::SeqCst);
    }
}

const SHOP_HOMEPAGE: &str = r#"
<html>
<head>
    <title>Spokes Bike Shop</title>
    <meta name="description" content="Bikes, parts and repairs">
    <link rel="icon" href="/favicon.png">
    <meta property="og:image" content="https://cdn.spokes.test/og.jpg">
</head>
<body>
    <h1>Spokes</h1>
    <p>Family owned since 1988.</p>
    <footer><p>12 Spoke Ave, Grand Rapids, MI</p></footer>
</body>
</html>
"#;

fn pipeline<X: MetadataExtractor>(
    storage: SqliteStorage,
    site: StaticSite,
    extractor: X,
) -> EnrichmentPipeline<SqliteStorage, StaticSite, X, NoDelay> {
    EnrichmentPipeline::new(storage, site, extractor, NoDelay, 3000)
}

#[tokio::test]
async fn test_enriches_property_stub() {
    let mut storage = SqliteStorage::new_in_memory().unwrap();
    storage.ensure_property_stub("spokes.test").unwrap();

    let site = StaticSite::default().with_page("https://spokes.test/", SHOP_HOMEPAGE);
    let mut pipeline = pipeline(storage, site, CannedExtractor::default());

    let report = pipeline.run(&[]).await.unwrap();
    assert_eq!(report.enriched, 1);
    assert_eq!(report.dropped, 0);

    let storage = pipeline.storage();
    let property = storage
        .get_property_by_hostname("spokes.test")
        .unwrap()
        .unwrap();
    assert_eq!(property.contact.city.as_deref(), Some("Grand Rapids"));
    assert_eq!(
        property.contact.instagram.as_deref(),
        Some("https://instagram.com/spokes")
    );
    assert!(property.favicon_id.is_some());
    assert!(property.og_image_id.is_some());

    let node = storage
        .get_node_by_url("https://spokes.test/")
        .unwrap()
        .unwrap();
    assert_eq!(node.property_id, property.id);
    assert_eq!(node.title.as_deref(), Some("Spokes Bike Shop"));
    assert_eq!(node.description.as_deref(), Some("Bikes, parts and repairs"));
    assert_eq!(node.industry.as_deref(), Some("Retail"));
    assert_eq!(node.audience, None);
    assert_eq!(node.keywords, vec!["bicycles", "repair"]);

    let synced = storage.load_properties_for_sync().unwrap();
    assert_eq!(
        synced[0].favicon_url.as_deref(),
        Some("https://spokes.test/favicon.png")
    );
    assert_eq!(
        synced[0].og_image_url.as_deref(),
        Some("https://cdn.spokes.test/og.jpg")
    );

    assert!(storage.properties_without_nodes().unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_domain_is_dropped_and_others_continue() {
    let mut storage = SqliteStorage::new_in_memory().unwrap();
    storage.ensure_property_stub("offline.test").unwrap();
    storage.ensure_property_stub("spokes.test").unwrap();

    let site = StaticSite::default().with_page("https://spokes.test/", SHOP_HOMEPAGE);
    let mut pipeline = pipeline(storage, site, CannedExtractor::default());

    let report = pipeline.run(&[]).await.unwrap();
    assert_eq!(report.enriched, 1);
    assert_eq!(report.dropped, 1);

    let storage = pipeline.storage();
    assert!(storage
        .get_property_by_hostname("offline.test")
        .unwrap()
        .is_none());
    assert!(storage
        .get_property_by_hostname("spokes.test")
        .unwrap()
        .is_some());
    assert_eq!(storage.count_properties().unwrap(), 1);
}

#[tokio::test]
async fn test_pause_follows_every_domain() {
    let mut storage = SqliteStorage::new_in_memory().unwrap();
    storage.ensure_property_stub("offline.test").unwrap();
    storage.ensure_property_stub("spokes.test").unwrap();

    let pacer = CountingPacer::default();
    let pauses = Arc::clone(&pacer.pauses);
    let site = StaticSite::default().with_page("https://spokes.test/", SHOP_HOMEPAGE);
    let mut pipeline =
        EnrichmentPipeline::new(storage, site, CannedExtractor::default(), pacer, 3000);

    let report = pipeline.run(&[]).await.unwrap();

    assert_eq!((report.enriched, report.dropped), (1, 1));
    assert_eq!(pauses.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_seed_domains_bootstrap_empty_store() {
    let storage = SqliteStorage::new_in_memory().unwrap();
    let site = StaticSite::default().with_page("https://spokes.test/", SHOP_HOMEPAGE);
    let mut pipeline = pipeline(storage, site, CannedExtractor::default());

    let report = pipeline
        .run(&["spokes.test".to_string(), " ".to_string()])
        .await
        .unwrap();
    assert_eq!(report.enriched, 1);
    assert_eq!(pipeline.storage().count_nodes().unwrap(), 1);
}

#[tokio::test]
async fn test_page_without_footer_skips_contact_extraction() {
    let mut storage = SqliteStorage::new_in_memory().unwrap();
    storage.ensure_property_stub("plain.test").unwrap();

    let site = StaticSite::default().with_page(
        "https://plain.test/",
        "<html><head><title>Plain</title></head><body><p>Hello</p></body></html>",
    );
    let extractor = CannedExtractor::default();
    let footer_calls = Arc::clone(&extractor.footer_calls);
    let mut pipeline = EnrichmentPipeline::new(storage, site, extractor, NoDelay, 3);

    pipeline.run(&[]).await.unwrap();
    assert!(footer_calls.lock().unwrap().is_empty());

    let property = pipeline
        .storage()
        .get_property_by_hostname("plain.test")
        .unwrap()
        .unwrap();
    assert_eq!(property.contact, ContactDetails::default());
    assert_eq!(property.favicon_id, None);
}

#[tokio::test]
async fn test_body_text_is_truncated_for_extraction() {
    let mut storage = SqliteStorage::new_in_memory().unwrap();
    storage.ensure_property_stub("spokes.test").unwrap();

    let site = StaticSite::default().with_page("https://spokes.test/", SHOP_HOMEPAGE);
    let extractor = CannedExtractor::default();
    let page_calls = Arc::clone(&extractor.page_calls);
    let footer_calls = Arc::clone(&extractor.footer_calls);
    let mut pipeline = EnrichmentPipeline::new(storage, site, extractor, NoDelay, 6);
    pipeline.enrich_domain("spokes.test").await.unwrap();

    {
        let pages = page_calls.lock().unwrap();
        assert_eq!(pages[0].body_text, "Spokes");
        assert_eq!(pages[0].title, "Spokes Bike Shop");
        let footers = footer_calls.lock().unwrap();
        assert!(footers[0].contains("12 Spoke Ave"));
    }

    // Re-enriching updates in place
    pipeline.enrich_domain("spokes.test").await.unwrap();
    assert_eq!(pipeline.storage().count_nodes().unwrap(), 1);
    assert_eq!(pipeline.storage().count_properties().unwrap(), 1);
}

#[tokio::test]
async fn test_openai_backed_enrichment() {
    let server = MockServer::start().await;
    let reply = json!({
        "keywords": ["coffee", "espresso"],
        "industry": "Food & Beverage",
        "summary": "Specialty coffee roaster.",
        "audience": "Coffee lovers",
        "city": "Holland",
        "state": "MI",
        "zip": null
    });
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": reply.to_string()}}]
        })))
        .expect(2)
        .mount(&server)
        .await;

    let mut storage = SqliteStorage::new_in_memory().unwrap();
    storage.ensure_property_stub("roaster.test").unwrap();
    let site = StaticSite::default().with_page(
        "https://roaster.test/",
        "<html><head><title>Roaster</title></head>\
         <body><p>Fresh beans.</p><footer>Holland, MI</footer></body></html>",
    );
    let client = OpenAiClient::new("sk-test").with_base_url(server.uri());
    let mut pipeline = pipeline(storage, site, client);

    let report = pipeline.run(&[]).await.unwrap();
    assert_eq!(report.enriched, 1);

    let storage = pipeline.storage();
    let property = storage
        .get_property_by_hostname("roaster.test")
        .unwrap()
        .unwrap();
    assert_eq!(property.contact.city.as_deref(), Some("Holland"));
    assert_eq!(property.contact.zip, None);

    let node = storage
        .get_node_by_url("https://roaster.test/")
        .unwrap()
        .unwrap();
    assert_eq!(node.industry.as_deref(), Some("Food & Beverage"));
    assert_eq!(node.audience.as_deref(), Some("Coffee lovers"));
}

#[tokio::test]
async fn test_model_api_failure_drops_property() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&server)
        .await;

    let mut storage = SqliteStorage::new_in_memory().unwrap();
    storage.ensure_property_stub("spokes.test").unwrap();
    let site = StaticSite::default().with_page("https://spokes.test/", SHOP_HOMEPAGE);
    let client = OpenAiClient::new("sk-test").with_base_url(server.uri());
    let mut pipeline = pipeline(storage, site, client);

    let report = pipeline.run(&[]).await.unwrap();
    assert_eq!(report.dropped, 1);
    assert_eq!(pipeline.storage().count_properties().unwrap(), 0);
}
