use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tokio::task::JoinHandle;

use super::fetcher::{fetch_catalog_bytes, FetchError};
use super::payload::{banners_from_entries, PayloadError, RawCatalogPayload};
use crate::config::Config;
use crate::model::{Banner, CatalogSnapshot};
use crate::storage::Database;

// ============================================================================
// Error and Result Types
// ============================================================================

/// Failures of a catalog load.
///
/// Only [`CatalogError::DataUnavailable`] ever leaves [`CatalogCacheManager::get_catalog`]:
/// the other variants are recovered from by serving the cached snapshot.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Transport-level fetch failure
    #[error("Network failure: {0}")]
    NetworkFailure(#[from] FetchError),
    /// Payload shape not recognized after normalization
    #[error("Malformed catalog data: {0}")]
    MalformedData(#[from] PayloadError),
    /// No cached snapshot and the fetch failed
    #[error("Catalog unavailable: no cached data and fetch failed ({0})")]
    DataUnavailable(#[source] Box<CatalogError>),
    /// Local storage failed during an explicit cache operation
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Where the snapshot in a [`CatalogLoad`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// Cached and within the TTL; a background revalidation was started.
    FreshCache,
    /// Fetched synchronously during this call.
    Network,
    /// Fetch failed; the cached snapshot was served regardless of age.
    StaleServed,
}

/// Outcome of one background revalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevalidationOutcome {
    /// Server version differed; the snapshot was replaced.
    Updated,
    /// Same version as cached; nothing written.
    Unchanged,
    /// Fetch, decode or write failed; nothing written.
    Failed,
}

/// Result of [`CatalogCacheManager::get_catalog`].
#[derive(Debug)]
pub struct CatalogLoad {
    pub snapshot: CatalogSnapshot,
    pub provenance: Provenance,
    /// Handle of the background revalidation, when one was started. Dropping
    /// it detaches the task; awaiting it observes the outcome.
    pub revalidation: Option<JoinHandle<RevalidationOutcome>>,
}

impl CatalogLoad {
    /// True when the UI should show a non-blocking "showing cached data" notice.
    pub fn is_stale(&self) -> bool {
        self.provenance == Provenance::StaleServed
    }
}

// ============================================================================
// Cache Manager
// ============================================================================

/// Owner of the cached catalog snapshot.
///
/// Cache-aside with stale-while-revalidate: fresh snapshots are served
/// immediately and refreshed in the background; expired or missing
/// snapshots are fetched synchronously, with any cached snapshot as the
/// fallback when the network fails. This is the only writer of the
/// snapshot keys.
#[derive(Clone)]
pub struct CatalogCacheManager {
    db: Database,
    client: reqwest::Client,
    url: Arc<str>,
    ttl: chrono::Duration,
    timeout: Duration,
}

impl CatalogCacheManager {
    pub fn new(db: Database, client: reqwest::Client, config: &Config) -> Self {
        Self::with_settings(
            db,
            client,
            &config.catalog_url,
            config.cache_ttl(),
            config.fetch_timeout(),
        )
    }

    pub fn with_settings(
        db: Database,
        client: reqwest::Client,
        url: &str,
        ttl: chrono::Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            db,
            client,
            url: Arc::from(url),
            ttl,
            timeout,
        }
    }

    /// Produce a snapshot for a surface.
    ///
    /// # Errors
    ///
    /// [`CatalogError::DataUnavailable`] when nothing is cached and the fetch
    /// failed. Every other failure is absorbed by serving the cache.
    pub async fn get_catalog(&self) -> Result<CatalogLoad, CatalogError> {
        let cached = self.load_cached().await;

        if let Some(snapshot) = cached.as_ref() {
            let age = snapshot.age(Utc::now());
            if age < self.ttl {
                tracing::debug!(
                    version = %snapshot.version,
                    age_minutes = age.num_minutes(),
                    "Serving cached catalog, revalidating in background"
                );
                let this = self.clone();
                let handle = tokio::spawn(async move { this.revalidate().await });
                return Ok(CatalogLoad {
                    snapshot: snapshot.clone(),
                    provenance: Provenance::FreshCache,
                    revalidation: Some(handle),
                });
            }
            tracing::debug!(
                version = %snapshot.version,
                age_hours = age.num_hours(),
                "Cached catalog expired, fetching"
            );
        }

        self.fetch_or_fallback(cached).await
    }

    /// Forced synchronous fetch (pull-to-refresh, retry after
    /// `DataUnavailable`). Same fallback rules as an expired cache.
    pub async fn refresh(&self) -> Result<CatalogLoad, CatalogError> {
        let cached = self.load_cached().await;
        self.fetch_or_fallback(cached).await
    }

    /// One revalidation pass: fetch, and replace the snapshot only if the
    /// version changed. Failures are logged and swallowed.
    pub async fn revalidate(&self) -> RevalidationOutcome {
        let fresh = match self.fetch_snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::debug!(error = %e, "Background catalog revalidation failed");
                return RevalidationOutcome::Failed;
            }
        };

        // Re-read right before deciding: another writer may have landed
        // while this fetch was in flight.
        let cached_version = match self.db.snapshot_version().await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read cached catalog version");
                return RevalidationOutcome::Failed;
            }
        };

        if cached_version.as_deref() == Some(fresh.version.as_str()) {
            tracing::debug!(version = %fresh.version, "Catalog unchanged");
            return RevalidationOutcome::Unchanged;
        }

        match self.db.save_snapshot(&fresh).await {
            Ok(()) => {
                tracing::info!(
                    old_version = cached_version.as_deref().unwrap_or("<none>"),
                    new_version = %fresh.version,
                    entries = fresh.entries.len(),
                    "Catalog updated in background"
                );
                RevalidationOutcome::Updated
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to store revalidated catalog");
                RevalidationOutcome::Failed
            }
        }
    }

    /// The cached snapshot without touching the network.
    pub async fn cached(&self) -> Option<CatalogSnapshot> {
        self.load_cached().await
    }

    /// Drop the cached snapshot.
    pub async fn clear_cache(&self) -> Result<(), CatalogError> {
        self.db
            .clear_snapshot()
            .await
            .map_err(|e| CatalogError::Storage(e.to_string()))?;
        tracing::info!("Catalog cache cleared");
        Ok(())
    }

    /// Carousel items for the home feed. Never fails: network payload first,
    /// then the cached entries, then the built-in defaults.
    pub async fn banners(&self) -> Vec<Banner> {
        match self.fetch_raw().await {
            Ok(raw) => {
                if let Some(banners) = raw.banners().filter(|b| !b.is_empty()) {
                    return banners;
                }
            }
            Err(e) => tracing::debug!(error = %e, "Banner fetch failed, using fallback"),
        }

        self.load_cached()
            .await
            .and_then(|snapshot| banners_from_entries(&snapshot.entries))
            .filter(|b| !b.is_empty())
            .unwrap_or_else(Banner::defaults)
    }

    // ========================================================================
    // Internal Helpers
    // ========================================================================

    async fn fetch_or_fallback(
        &self,
        cached: Option<CatalogSnapshot>,
    ) -> Result<CatalogLoad, CatalogError> {
        match self.fetch_snapshot().await {
            Ok(snapshot) => {
                // A failed write only costs a refetch next time.
                if let Err(e) = self.db.save_snapshot(&snapshot).await {
                    tracing::warn!(error = %e, "Failed to store fetched catalog");
                }
                tracing::info!(
                    version = %snapshot.version,
                    entries = snapshot.entries.len(),
                    "Catalog fetched"
                );
                Ok(CatalogLoad {
                    snapshot,
                    provenance: Provenance::Network,
                    revalidation: None,
                })
            }
            Err(e) => match cached {
                Some(snapshot) => {
                    tracing::warn!(
                        error = %e,
                        version = %snapshot.version,
                        fetched_at = %snapshot.fetched_at,
                        "Catalog fetch failed, serving cached data"
                    );
                    Ok(CatalogLoad {
                        snapshot,
                        provenance: Provenance::StaleServed,
                        revalidation: None,
                    })
                }
                None => {
                    tracing::error!(error = %e, "Catalog fetch failed with no cached data");
                    Err(CatalogError::DataUnavailable(Box::new(e)))
                }
            },
        }
    }

    async fn fetch_raw(&self) -> Result<RawCatalogPayload, CatalogError> {
        let bytes = fetch_catalog_bytes(&self.client, &self.url, self.timeout).await?;
        Ok(RawCatalogPayload::from_slice(&bytes)?)
    }

    async fn fetch_snapshot(&self) -> Result<CatalogSnapshot, CatalogError> {
        let decoded = self.fetch_raw().await?.decode();
        Ok(CatalogSnapshot::new(
            decoded.entries,
            decoded.version,
            Utc::now(),
        ))
    }

    /// Storage trouble on the read side degrades to "no cache".
    async fn load_cached(&self) -> Option<CatalogSnapshot> {
        match self.db.load_snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read cached catalog");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CatalogEntry;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn manager_for(server: &MockServer) -> CatalogCacheManager {
        let db = Database::open(":memory:").await.unwrap();
        CatalogCacheManager::with_settings(
            db,
            reqwest::Client::new(),
            &format!("{}/data.json", server.uri()),
            chrono::Duration::hours(24),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_cold_fetch_persists_snapshot() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "version": "v1",
                "plants": [{"id": "1", "title": "熊童子", "category": "景天科"}]
            })))
            .mount(&server)
            .await;

        let mgr = manager_for(&server).await;
        let load = mgr.get_catalog().await.unwrap();
        assert_eq!(load.provenance, Provenance::Network);
        assert!(load.revalidation.is_none());
        assert_eq!(load.snapshot.version, "v1");

        let stored = mgr.cached().await.unwrap();
        assert_eq!(stored.entries, load.snapshot.entries);
    }

    #[tokio::test]
    async fn test_revalidate_placeholder_version_written_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"[{"id":"1"}]"#))
            .mount(&server)
            .await;

        let mgr = manager_for(&server).await;
        assert_eq!(mgr.revalidate().await, RevalidationOutcome::Updated);
        assert_eq!(mgr.revalidate().await, RevalidationOutcome::Unchanged);
    }

    #[tokio::test]
    async fn test_revalidate_malformed_is_failed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"oops": true}"#))
            .mount(&server)
            .await;

        let mgr = manager_for(&server).await;
        assert_eq!(mgr.revalidate().await, RevalidationOutcome::Failed);
        assert!(mgr.cached().await.is_none());
    }

    #[tokio::test]
    async fn test_clear_cache_then_cold() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let mgr = manager_for(&server).await;
        mgr.db
            .save_snapshot(&CatalogSnapshot::new(
                vec![CatalogEntry::new("1", "a", "")],
                "v",
                Utc::now() - chrono::Duration::hours(30),
            ))
            .await
            .unwrap();

        mgr.clear_cache().await.unwrap();
        let err = mgr.get_catalog().await.unwrap_err();
        assert!(matches!(err, CatalogError::DataUnavailable(_)));
    }

    #[tokio::test]
    async fn test_banners_default_when_offline_and_uncached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let mgr = manager_for(&server).await;
        assert_eq!(mgr.banners().await, Banner::defaults());
    }

    #[tokio::test]
    async fn test_banners_from_payload() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "banner": [{"image": "b.jpg", "title": "春季"}],
                "plants": []
            })))
            .mount(&server)
            .await;

        let mgr = manager_for(&server).await;
        let banners = mgr.banners().await;
        assert_eq!(banners.len(), 1);
        assert_eq!(banners[0].title, "春季");
    }
}
