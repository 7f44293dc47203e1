use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use super::schema::Database;
use super::types::keys;
use crate::model::{CatalogEntry, CatalogSnapshot};

const SNAPSHOT_KEYS: [&str; 3] = [
    keys::CATALOG_ENTRIES,
    keys::CATALOG_VERSION,
    keys::CATALOG_FETCHED_AT,
];

impl Database {
    // ========================================================================
    // Catalog Snapshot Operations
    // ========================================================================

    /// Persist a snapshot. The three snapshot keys land in one transaction.
    pub async fn save_snapshot(&self, snapshot: &CatalogSnapshot) -> Result<()> {
        let entries = serde_json::to_string(snapshot.entries.as_slice())
            .context("Failed to encode catalog entries")?;
        let fetched_at = snapshot.fetched_at.to_rfc3339();

        self.set_values(&[
            (keys::CATALOG_ENTRIES, entries.as_str()),
            (keys::CATALOG_VERSION, snapshot.version.as_str()),
            (keys::CATALOG_FETCHED_AT, fetched_at.as_str()),
        ])
        .await
    }

    /// Load the cached snapshot.
    ///
    /// Returns `None` when nothing is cached. A partially written or
    /// undecodable snapshot is also reported as `None` (logged), since a
    /// snapshot is only meaningful as a whole.
    pub async fn load_snapshot(&self) -> Result<Option<CatalogSnapshot>> {
        let values = self.get_values(&SNAPSHOT_KEYS).await?;

        let (entries, version, fetched_at) = match values.as_slice() {
            [Some(e), Some(v), Some(t)] => (e, v, t),
            [None, None, None] => return Ok(None),
            _ => {
                tracing::warn!("Incomplete catalog snapshot in storage, ignoring");
                return Ok(None);
            }
        };

        let entries: Vec<CatalogEntry> = match serde_json::from_str(entries) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(error = %e, "Cached catalog entries are corrupt, ignoring");
                return Ok(None);
            }
        };

        let fetched_at = match DateTime::parse_from_rfc3339(fetched_at) {
            Ok(t) => t.with_timezone(&Utc),
            Err(e) => {
                tracing::warn!(error = %e, "Cached catalog timestamp is corrupt, ignoring");
                return Ok(None);
            }
        };

        Ok(Some(CatalogSnapshot::new(entries, version.clone(), fetched_at)))
    }

    /// Stored version string alone, without decoding the entries.
    pub async fn snapshot_version(&self) -> Result<Option<String>> {
        self.get_value(keys::CATALOG_VERSION).await
    }

    /// Drop the cached snapshot (all three keys together).
    pub async fn clear_snapshot(&self) -> Result<()> {
        let removed = self.remove_values(&SNAPSHOT_KEYS).await?;
        tracing::debug!(removed = removed, "Cleared catalog snapshot");
        Ok(())
    }
}
