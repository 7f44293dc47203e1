//! User State Store: the bookmark collection and display preferences.
//!
//! Both live in local storage as JSON under a single key each. Every
//! mutation is a read-modify-write inside one storage transaction and is
//! durable before the call returns. There is no change notification;
//! surfaces re-read on activation.
use std::collections::HashSet;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::model::CatalogEntry;
use crate::storage::{keys, Database};
use crate::theme::{FontSize, ThemeName};

#[derive(Debug, Error)]
pub enum UserStateError {
    /// Storage read or write failed. Never downgraded to a no-op.
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

// ============================================================================
// Collection
// ============================================================================

/// Bookmarked entries as full snapshots, in insertion order, unique by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionSet {
    entries: Vec<CatalogEntry>,
}

impl CollectionSet {
    pub fn contains(&self, id: &str) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ids for repeated membership checks.
    pub fn id_set(&self) -> HashSet<&str> {
        self.entries.iter().map(|e| e.id.as_str()).collect()
    }

    /// Remove `entry` if an entry with its id is present (discarding the
    /// stored snapshot), otherwise append it. Returns whether it is now
    /// collected.
    fn toggle(&mut self, entry: &CatalogEntry) -> bool {
        if self.remove(&entry.id) {
            false
        } else {
            self.entries.push(entry.clone());
            true
        }
    }

    fn remove(&mut self, id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        self.entries.len() != before
    }

    /// Decode a stored collection. Unreadable data reads as empty and is
    /// replaced by the next write.
    fn from_stored(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::default();
        };
        match serde_json::from_str::<Vec<Value>>(raw) {
            Ok(items) => {
                let mut set = Self::default();
                for item in items {
                    match serde_json::from_value::<CatalogEntry>(item) {
                        Ok(entry) if !set.contains(&entry.id) => set.entries.push(entry),
                        Ok(_) => {}
                        Err(e) => tracing::warn!(error = %e, "Dropping unreadable collection item"),
                    }
                }
                set
            }
            Err(e) => {
                tracing::warn!(error = %e, "Stored collection unreadable, treating as empty");
                Self::default()
            }
        }
    }
}

// ============================================================================
// Preferences
// ============================================================================

/// Display preferences.
///
/// Keys written by other clients (e.g. `imageQuality`) are kept in `extra`
/// and written back untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    #[serde(default, deserialize_with = "de_name_or_default")]
    pub theme_name: ThemeName,
    #[serde(default, deserialize_with = "de_name_or_default")]
    pub font_size: FontSize,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Preferences {
    fn from_stored(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::default();
        };
        serde_json::from_str(raw).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Stored preferences unreadable, using defaults");
            Self::default()
        })
    }

    fn apply(&mut self, patch: PreferencesPatch) {
        if let Some(theme) = patch.theme_name {
            self.theme_name = theme;
        }
        if let Some(size) = patch.font_size {
            self.font_size = size;
        }
    }
}

/// Null, blank or non-string names read as the default, so one bad field
/// never discards the rest of the stored settings.
fn de_name_or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + From<String>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(name) if !name.trim().is_empty() => T::from(name),
        _ => T::default(),
    })
}

/// Partial preferences update; `None` fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreferencesPatch {
    pub theme_name: Option<ThemeName>,
    pub font_size: Option<FontSize>,
}

impl PreferencesPatch {
    pub fn is_empty(&self) -> bool {
        self.theme_name.is_none() && self.font_size.is_none()
    }
}

// ============================================================================
// Store
// ============================================================================

/// Owner of the collection and preferences keys.
#[derive(Clone)]
pub struct UserStateStore {
    db: Database,
}

impl UserStateStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn collection(&self) -> Result<CollectionSet, UserStateError> {
        let raw = self.db.get_value(keys::COLLECTION).await?;
        Ok(CollectionSet::from_stored(raw.as_deref()))
    }

    pub async fn is_collected(&self, id: &str) -> Result<bool, UserStateError> {
        Ok(self.collection().await?.contains(id))
    }

    /// Add `entry` if absent, remove it if present. Returns the collection
    /// after the change.
    pub async fn toggle_collection(
        &self,
        entry: &CatalogEntry,
    ) -> Result<CollectionSet, UserStateError> {
        let (set, collected) = self
            .db
            .update_value(keys::COLLECTION, |raw| {
                let mut set = CollectionSet::from_stored(raw);
                let collected = set.toggle(entry);
                Ok((serde_json::to_string(&set)?, (set, collected)))
            })
            .await?;

        tracing::info!(
            id = %entry.id,
            collected = collected,
            size = set.len(),
            "Collection toggled"
        );
        Ok(set)
    }

    /// Remove by id. An id that is not collected is not an error.
    pub async fn remove_from_collection(&self, id: &str) -> Result<CollectionSet, UserStateError> {
        let (set, removed) = self
            .db
            .update_value(keys::COLLECTION, |raw| {
                let mut set = CollectionSet::from_stored(raw);
                let removed = set.remove(id);
                Ok((serde_json::to_string(&set)?, (set, removed)))
            })
            .await?;

        if removed {
            tracing::info!(id = %id, size = set.len(), "Removed from collection");
        } else {
            tracing::debug!(id = %id, "Remove of uncollected id ignored");
        }
        Ok(set)
    }

    pub async fn clear_collection(&self) -> Result<(), UserStateError> {
        self.db.remove_values(&[keys::COLLECTION]).await?;
        tracing::info!("Collection cleared");
        Ok(())
    }

    /// Current preferences, `{green, medium}` when nothing is stored.
    pub async fn preferences(&self) -> Result<Preferences, UserStateError> {
        let raw = self.db.get_value(keys::USER_SETTINGS).await?;
        Ok(Preferences::from_stored(raw.as_deref()))
    }

    /// Merge `patch` into the stored preferences and return the result.
    pub async fn set_preferences(
        &self,
        patch: PreferencesPatch,
    ) -> Result<Preferences, UserStateError> {
        let prefs = self
            .db
            .update_value(keys::USER_SETTINGS, |raw| {
                let mut prefs = Preferences::from_stored(raw);
                prefs.apply(patch);
                Ok((serde_json::to_string(&prefs)?, prefs))
            })
            .await?;

        tracing::info!(
            theme = prefs.theme_name.as_str(),
            font_size = prefs.font_size.as_str(),
            "Preferences updated"
        );
        Ok(prefs)
    }
}
