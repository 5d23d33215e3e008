//! Integration tests for the crawl frontier
//!
//! These tests use wiremock to serve a small site and run the frontier
//! end-to-end against an on-disk SQLite store.

use prospect::config::parse_config;
use prospect::crawler::{crawl, Frontier, HttpFetcher, NoDelay};
use prospect::state::QueueStatus;
use prospect::storage::{SqliteStorage, Storage};
use prospect::url::Blacklist;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn html_page(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(format!("<html><body>{}</body></html>", body))
        .insert_header("content-type", "text/html")
}

async fn mount_page(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html_page(body))
        .mount(server)
        .await;
}

fn build_frontier(
    storage: SqliteStorage,
    blacklist: &[&str],
    max_depth: u32,
) -> Frontier<SqliteStorage, HttpFetcher, NoDelay> {
    Frontier::new(
        storage,
        HttpFetcher::new(reqwest::Client::new()),
        NoDelay,
        Blacklist::new(blacklist.iter()),
        max_depth,
    )
}

#[tokio::test]
async fn test_full_crawl_single_site() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        r#"<a href="/about">About</a>
           <a href="/members">Members</a>
           <a href="https://acme-widgets.com/">Acme</a>
           <a href="mailto:info@chamber.test">Mail</a>"#,
    )
    .await;
    mount_page(
        &server,
        "/about",
        r#"<a href="/">Home</a><a href="https://www.acme-widgets.com/contact">Acme</a>"#,
    )
    .await;
    mount_page(
        &server,
        "/members",
        r#"<a href="https://acme-widgets.com/shop">Acme shop</a>
           <a href="https://bakery.test/">Bakery</a>"#,
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let storage = SqliteStorage::new(&dir.path().join("crawl.db")).unwrap();
    let mut frontier = build_frontier(storage, &[], 3);

    let seed = format!("{}/", base);
    assert_eq!(frontier.initialize_seeds(&[seed.clone()]).unwrap(), 1);
    let report = frontier.run().await.unwrap();

    assert_eq!(report.completed, 3);
    assert_eq!(report.failed, 0);

    let storage = frontier.storage();
    let counts = storage.count_queue_by_status().unwrap();
    assert_eq!(counts.get(&QueueStatus::Completed).copied(), Some(3));
    assert_eq!(counts.get(&QueueStatus::Pending).copied().unwrap_or(0), 0);

    // acme-widgets.com and www.acme-widgets.com are distinct hostnames
    assert_eq!(storage.count_properties().unwrap(), 3);
    assert!(storage
        .get_property_by_hostname("acme-widgets.com")
        .unwrap()
        .is_some());
    assert!(storage
        .get_property_by_hostname("bakery.test")
        .unwrap()
        .is_some());

    let about = storage
        .get_queue_item_by_url(&format!("{}/about", base))
        .unwrap()
        .unwrap();
    assert_eq!(about.depth, 1);
    assert!(!about.is_seed_domain);

    // External pages are never queued
    assert!(storage
        .get_queue_item_by_url("https://bakery.test/")
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_crawl_with_depth_limit() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", r#"<a href="/level1">1</a>"#).await;
    mount_page(&server, "/level1", r#"<a href="/level2">2</a>"#).await;
    mount_page(
        &server,
        "/level2",
        r#"<a href="/level3">3</a><a href="https://deep-link.test/">Deep</a>"#,
    )
    .await;
    mount_page(&server, "/level3", "").await;

    let mut frontier = build_frontier(SqliteStorage::new_in_memory().unwrap(), &[], 2);
    frontier.initialize_seeds(&[format!("{}/", base)]).unwrap();
    let report = frontier.run().await.unwrap();

    assert_eq!(report.completed, 3);
    let storage = frontier.storage();
    assert!(storage
        .get_queue_item_by_url(&format!("{}/level3", base))
        .unwrap()
        .is_none());

    // External links on the deepest page still register properties
    assert!(storage
        .get_property_by_hostname("deep-link.test")
        .unwrap()
        .is_some());

    let requests = server.received_requests().await.unwrap();
    assert!(requests.iter().all(|r| r.url.path() != "/level3"));
}

#[tokio::test]
async fn test_blacklisted_links_and_seeds_are_not_fetched() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        r#"<a href="/wcpages/123">Member page</a>
           <a href="https://www.facebook.com/chamber">Facebook</a>
           <a href="/events">Events</a>"#,
    )
    .await;
    mount_page(&server, "/events", "").await;

    let mut frontier = build_frontier(
        SqliteStorage::new_in_memory().unwrap(),
        &["wcpages", "facebook.com"],
        5,
    );
    frontier
        .initialize_seeds(&[format!("{}/", base), format!("{}/wcpages/seed", base)])
        .unwrap();
    let report = frontier.run().await.unwrap();

    assert_eq!(report.completed, 2);
    assert_eq!(report.blacklisted, 1);

    let storage = frontier.storage();
    assert!(storage
        .get_queue_item_by_url(&format!("{}/wcpages/123", base))
        .unwrap()
        .is_none());
    assert_eq!(storage.count_properties().unwrap(), 0);

    let seed = storage
        .get_queue_item_by_url(&format!("{}/wcpages/seed", base))
        .unwrap()
        .unwrap();
    assert_eq!(seed.status, QueueStatus::Completed);

    let requests = server.received_requests().await.unwrap();
    assert!(requests.iter().all(|r| !r.url.path().contains("wcpages")));
}

#[tokio::test]
async fn test_http_errors_fail_items_without_retry() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", r#"<a href="/broken">Broken</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("crawl.db");

    let mut frontier = build_frontier(SqliteStorage::new(&db_path).unwrap(), &[], 3);
    frontier.initialize_seeds(&[format!("{}/", base)]).unwrap();
    let first = frontier.run().await.unwrap();
    assert_eq!(first.completed, 1);
    assert_eq!(first.failed, 1);
    drop(frontier);

    // A second run over the same store has nothing left to do
    let mut frontier = build_frontier(SqliteStorage::new(&db_path).unwrap(), &[], 3);
    frontier.initialize_seeds(&[format!("{}/", base)]).unwrap();
    let second = frontier.run().await.unwrap();
    assert_eq!(second.processed(), 0);

    let broken = frontier
        .storage()
        .get_queue_item_by_url(&format!("{}/broken", base))
        .unwrap()
        .unwrap();
    assert_eq!(broken.status, QueueStatus::Failed);
    assert!(broken.processed_at.is_some());
}

#[tokio::test]
async fn test_interrupted_items_are_recovered() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_page(&server, "/", "").await;

    let mut storage = SqliteStorage::new_in_memory().unwrap();
    let seed = format!("{}/", base);
    storage.enqueue_if_absent(&seed, 0, true).unwrap();
    let item = storage.get_queue_item_by_url(&seed).unwrap().unwrap();
    storage
        .update_queue_status(item.id, QueueStatus::Processing)
        .unwrap();

    let mut frontier = build_frontier(storage, &[], 3);
    let report = frontier.run().await.unwrap();

    assert_eq!(report.recovered, 1);
    assert_eq!(report.completed, 1);
}

#[tokio::test]
async fn test_crawl_entry_point_from_config() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_page(
        &server,
        "/",
        r#"<a href="/next">Next</a><a href="https://partner.test/">Partner</a>"#,
    )
    .await;
    mount_page(&server, "/next", "").await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("crawl.db");
    let config = parse_config(&format!(
        r#"
seeds = ["{base}/"]

[crawler]
max-depth = 4
crawl-delay-ms = 0

[user-agent]
crawler-name = "TestCrawler"
crawler-version = "1.0"
contact-url = "https://example.com/about"
contact-email = "admin@example.com"

[storage]
database-path = "{db}"
"#,
        base = base,
        db = db_path.display()
    ))
    .unwrap();

    let storage = SqliteStorage::new(&db_path).unwrap();
    let (report, storage) = crawl(&config, storage).await.unwrap();

    assert_eq!(report.completed, 2);
    assert_eq!(report.properties_created, 1);
    assert_eq!(storage.count_properties().unwrap(), 1);
}
