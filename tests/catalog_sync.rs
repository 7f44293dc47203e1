//! Integration tests for catalog caching: TTL, background revalidation and
//! stale fallback against a mocked catalog endpoint.
//!
//! Each test creates its own in-memory SQLite database and mock server.

use std::time::Duration;

use chrono::Utc;
use duorou::catalog::{CatalogCacheManager, CatalogError, Provenance, RevalidationOutcome};
use duorou::model::{CatalogEntry, CatalogSnapshot};
use duorou::storage::Database;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn test_db() -> Database {
    Database::open(":memory:").await.unwrap()
}

fn manager(server: &MockServer, db: &Database, timeout: Duration) -> CatalogCacheManager {
    CatalogCacheManager::with_settings(
        db.clone(),
        reqwest::Client::new(),
        &format!("{}/data/image-links.json", server.uri()),
        chrono::Duration::hours(24),
        timeout,
    )
}

async fn seed(db: &Database, version: &str, age_hours: i64) -> CatalogSnapshot {
    let snapshot = CatalogSnapshot::new(
        vec![
            CatalogEntry::new("1", "熊童子", "景天科"),
            CatalogEntry::new("2", "生石花", "番杏科"),
        ],
        version,
        Utc::now() - chrono::Duration::hours(age_hours),
    );
    db.save_snapshot(&snapshot).await.unwrap();
    db.load_snapshot().await.unwrap().unwrap()
}

fn catalog_body(version: &str) -> serde_json::Value {
    json!({
        "version": version,
        "plants": [
            {"id": "1", "title": "熊童子", "category": "景天科", "src": "a.png", "articles": []},
            {"id": "3", "title": "玉露", "category": "百合科", "src": "b.png", "articles": []}
        ]
    })
}

async fn mount_ok(server: &MockServer, version: &str) {
    Mock::given(method("GET"))
        .and(path("/data/image-links.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(catalog_body(version)))
        .mount(server)
        .await;
}

// ============================================================================
// TTL Freshness
// ============================================================================

#[tokio::test]
async fn test_fresh_cache_served_without_waiting_for_network() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(catalog_body("v2"))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;
    let db = test_db().await;
    let seeded = seed(&db, "v1", 23).await;
    let mgr = manager(&server, &db, Duration::from_secs(10));

    let started = std::time::Instant::now();
    let load = mgr.get_catalog().await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(2));

    assert_eq!(load.provenance, Provenance::FreshCache);
    assert_eq!(load.snapshot, seeded);
    assert!(load.revalidation.is_some());
}

#[tokio::test]
async fn test_expired_cache_fetches_synchronously() {
    let server = MockServer::start().await;
    mount_ok(&server, "v2").await;
    let db = test_db().await;
    let seeded = seed(&db, "v1", 25).await;
    let mgr = manager(&server, &db, Duration::from_secs(5));

    let load = mgr.get_catalog().await.unwrap();
    assert_eq!(load.provenance, Provenance::Network);
    assert_eq!(load.snapshot.version, "v2");
    assert!(load.revalidation.is_none());

    let stored = db.load_snapshot().await.unwrap().unwrap();
    assert_eq!(stored.version, "v2");
    assert!(stored.fetched_at > seeded.fetched_at);
    let ids: Vec<_> = stored.entries.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "3"]);
}

// ============================================================================
// Stale Fallback
// ============================================================================

#[tokio::test]
async fn test_expired_cache_served_when_fetch_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let db = test_db().await;
    let seeded = seed(&db, "v1", 72).await;
    let mgr = manager(&server, &db, Duration::from_secs(5));

    let load = mgr.get_catalog().await.unwrap();
    assert_eq!(load.provenance, Provenance::StaleServed);
    assert!(load.is_stale());
    assert_eq!(load.snapshot, seeded);
}

#[tokio::test]
async fn test_expired_cache_served_when_payload_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": "nope"})))
        .mount(&server)
        .await;
    let db = test_db().await;
    let seeded = seed(&db, "v1", 25).await;
    let mgr = manager(&server, &db, Duration::from_secs(5));

    let load = mgr.get_catalog().await.unwrap();
    assert_eq!(load.provenance, Provenance::StaleServed);
    assert_eq!(load.snapshot.version, seeded.version);
}

#[tokio::test]
async fn test_expired_cache_served_when_fetch_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(catalog_body("v2"))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;
    let db = test_db().await;
    seed(&db, "v1", 25).await;
    let mgr = manager(&server, &db, Duration::from_millis(200));

    let load = mgr.get_catalog().await.unwrap();
    assert_eq!(load.provenance, Provenance::StaleServed);
    assert_eq!(load.snapshot.version, "v1");
}

// ============================================================================
// Cold Failure
// ============================================================================

#[tokio::test]
async fn test_cold_start_failure_is_data_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let db = test_db().await;
    let mgr = manager(&server, &db, Duration::from_secs(5));

    let err = mgr.get_catalog().await.unwrap_err();
    match err {
        CatalogError::DataUnavailable(cause) => {
            assert!(matches!(*cause, CatalogError::NetworkFailure(_)), "got {cause:?}");
        }
        other => panic!("expected DataUnavailable, got {other:?}"),
    }
    assert!(db.load_snapshot().await.unwrap().is_none());
}

#[tokio::test]
async fn test_refresh_recovers_after_data_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_ok(&server, "v1").await;
    let db = test_db().await;
    let mgr = manager(&server, &db, Duration::from_secs(5));

    assert!(mgr.get_catalog().await.is_err());
    let load = mgr.refresh().await.unwrap();
    assert_eq!(load.provenance, Provenance::Network);
    assert_eq!(load.snapshot.entries.len(), 2);
}

// ============================================================================
// Background Revalidation
// ============================================================================

#[tokio::test]
async fn test_same_version_revalidation_is_noop() {
    let server = MockServer::start().await;
    mount_ok(&server, "v1").await;
    let db = test_db().await;
    let seeded = seed(&db, "v1", 1).await;
    let mgr = manager(&server, &db, Duration::from_secs(5));

    let load = mgr.get_catalog().await.unwrap();
    let outcome = load.revalidation.unwrap().await.unwrap();
    assert_eq!(outcome, RevalidationOutcome::Unchanged);

    // Entries and fetched_at untouched even though the server's entries differ.
    let stored = db.load_snapshot().await.unwrap().unwrap();
    assert_eq!(stored, seeded);
}

#[tokio::test]
async fn test_changed_version_visible_to_next_load() {
    let server = MockServer::start().await;
    mount_ok(&server, "v2").await;
    let db = test_db().await;
    seed(&db, "v1", 1).await;
    let mgr = manager(&server, &db, Duration::from_secs(5));

    let first = mgr.get_catalog().await.unwrap();
    assert_eq!(first.snapshot.version, "v1");
    assert_eq!(
        first.revalidation.unwrap().await.unwrap(),
        RevalidationOutcome::Updated
    );

    let second = mgr.get_catalog().await.unwrap();
    assert_eq!(second.provenance, Provenance::FreshCache);
    assert_eq!(second.snapshot.version, "v2");
}

#[tokio::test]
async fn test_failed_revalidation_keeps_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;
    let db = test_db().await;
    let seeded = seed(&db, "v1", 2).await;
    let mgr = manager(&server, &db, Duration::from_secs(5));

    let load = mgr.get_catalog().await.unwrap();
    assert_eq!(
        load.revalidation.unwrap().await.unwrap(),
        RevalidationOutcome::Failed
    );
    assert_eq!(db.load_snapshot().await.unwrap().unwrap(), seeded);
}

#[tokio::test]
async fn test_bare_array_placeholder_version() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "1", "title": "a"},
            {"id": "2", "title": "b"}
        ])))
        .mount(&server)
        .await;
    let db = test_db().await;
    let mgr = manager(&server, &db, Duration::from_secs(5));

    let load = mgr.get_catalog().await.unwrap();
    assert_eq!(load.snapshot.version, "1.0.0");

    // Cached placeholder now equals the fetched placeholder.
    assert_eq!(mgr.revalidate().await, RevalidationOutcome::Unchanged);
}
