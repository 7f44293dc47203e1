//! Boundary decoding of the catalog response.
//!
//! The endpoint has served two shapes over time: a bare JSON array of entries,
//! and an object wrapping that array (under `plants`, or `entries`) next to an
//! optional top-level `version` and `banner`. Everything past this module sees
//! only the normalized [`DecodedCatalog`].
use std::collections::HashSet;

use serde_json::Value;
use thiserror::Error;

use crate::model::{Banner, CatalogEntry};

/// Version assumed when the payload carries none. It compares by plain
/// equality, so it reads as "changed" against an empty cache and
/// "unchanged" once stored.
pub const DEFAULT_VERSION: &str = "1.0.0";

/// Keys under which an object payload may wrap the entry array, in priority order.
const WRAPPER_KEYS: [&str; 2] = ["plants", "entries"];

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("Payload is not an entry array ({0})")]
    NotAnArray(&'static str),
}

/// The response as received, before normalization.
#[derive(Debug, Clone)]
pub enum RawCatalogPayload {
    Bare(Vec<Value>),
    Wrapped {
        entries: Vec<Value>,
        version: Option<Value>,
        banner: Option<Value>,
    },
}

/// Normalized result of decoding a payload.
#[derive(Debug, Clone)]
pub struct DecodedCatalog {
    pub entries: Vec<CatalogEntry>,
    pub version: String,
    /// Items dropped for lacking a usable id or repeating an earlier id.
    pub skipped: usize,
}

impl RawCatalogPayload {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, PayloadError> {
        let value: Value = serde_json::from_slice(bytes)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, PayloadError> {
        match value {
            Value::Array(items) => Ok(Self::Bare(items)),
            Value::Object(mut map) => {
                let wrapped = WRAPPER_KEYS
                    .iter()
                    .find_map(|key| map.remove(*key).filter(|v| !v.is_null()));
                match wrapped {
                    Some(Value::Array(entries)) => Ok(Self::Wrapped {
                        entries,
                        version: map.remove("version"),
                        banner: map.remove("banner"),
                    }),
                    Some(_) => Err(PayloadError::NotAnArray("wrapped value is not an array")),
                    None => Err(PayloadError::NotAnArray("object without an entry array")),
                }
            }
            _ => Err(PayloadError::NotAnArray("scalar payload")),
        }
    }

    fn items(&self) -> &[Value] {
        match self {
            Self::Bare(items) => items,
            Self::Wrapped { entries, .. } => entries,
        }
    }

    /// A wrapped payload's top-level `version`, or a bare array's first
    /// entry `version`, else [`DEFAULT_VERSION`]. Wrapped entries never
    /// supply the version. Empty strings count as absent.
    pub fn version(&self) -> String {
        let found = match self {
            Self::Wrapped { version, .. } => version.as_ref().and_then(version_string),
            Self::Bare(items) => items
                .first()
                .and_then(|first| first.get("version"))
                .and_then(version_string),
        };
        found.unwrap_or_else(|| DEFAULT_VERSION.to_string())
    }

    /// Carousel items: top-level `banner`, else the first entry's `banner`.
    pub fn banners(&self) -> Option<Vec<Banner>> {
        if let Self::Wrapped {
            banner: Some(banner),
            ..
        } = self
        {
            if let Some(banners) = banner_list(banner) {
                return Some(banners);
            }
        }
        self.items()
            .first()
            .and_then(|first| first.get("banner"))
            .and_then(banner_list)
    }

    /// Decode entries, dropping items without a usable id and later
    /// duplicates of an id already seen.
    pub fn decode(self) -> DecodedCatalog {
        let version = self.version();
        let items = match self {
            Self::Bare(items) => items,
            Self::Wrapped { entries, .. } => entries,
        };

        let total = items.len();
        let mut seen = HashSet::with_capacity(total);
        let mut entries = Vec::with_capacity(total);

        for item in items {
            match serde_json::from_value::<CatalogEntry>(item) {
                Ok(entry) => {
                    if seen.insert(entry.id.clone()) {
                        entries.push(entry);
                    } else {
                        tracing::debug!(id = %entry.id, "Duplicate catalog id, keeping first");
                    }
                }
                Err(e) => tracing::debug!(error = %e, "Skipping undecodable catalog item"),
            }
        }

        let skipped = total - entries.len();
        if skipped > 0 {
            tracing::warn!(skipped = skipped, total = total, "Catalog items skipped during decode");
        }

        DecodedCatalog {
            entries,
            version,
            skipped,
        }
    }
}

/// Banners taken from the first entry of already-decoded entries, the
/// fallback when no raw payload is at hand.
pub fn banners_from_entries(entries: &[CatalogEntry]) -> Option<Vec<Banner>> {
    entries
        .first()
        .and_then(|first| first.extra.get("banner"))
        .and_then(banner_list)
}

fn version_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn banner_list(value: &Value) -> Option<Vec<Banner>> {
    let items = value.as_array()?;
    Some(
        items
            .iter()
            .filter_map(|v| serde_json::from_value(v.clone()).ok())
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn decode(value: Value) -> Result<DecodedCatalog, PayloadError> {
        RawCatalogPayload::from_value(value).map(RawCatalogPayload::decode)
    }

    #[test]
    fn bare_array_is_accepted() {
        let decoded = decode(json!([{"id": "1", "title": "a"}, {"id": "2", "title": "b"}])).unwrap();
        assert_eq!(decoded.entries.len(), 2);
        assert_eq!(decoded.version, DEFAULT_VERSION);
    }

    #[test]
    fn wrapped_under_plants() {
        let decoded = decode(json!({"version": "v7", "plants": [{"id": "1"}]})).unwrap();
        assert_eq!(decoded.entries.len(), 1);
        assert_eq!(decoded.version, "v7");
    }

    #[test]
    fn wrapped_under_entries() {
        let decoded = decode(json!({"entries": [{"id": "1"}]})).unwrap();
        assert_eq!(decoded.entries.len(), 1);
    }

    #[test]
    fn plants_key_wins_over_entries() {
        let decoded = decode(json!({"plants": [{"id": "p"}], "entries": [{"id": "e"}]})).unwrap();
        assert_eq!(decoded.entries[0].id, "p");
    }

    #[test]
    fn object_without_array_is_malformed() {
        assert!(matches!(
            decode(json!({"version": "1", "data": {}})),
            Err(PayloadError::NotAnArray(_))
        ));
        assert!(matches!(
            decode(json!({"plants": {"id": "1"}})),
            Err(PayloadError::NotAnArray(_))
        ));
    }

    #[test]
    fn scalar_is_malformed() {
        assert!(matches!(decode(json!("hello")), Err(PayloadError::NotAnArray(_))));
        assert!(matches!(decode(json!(null)), Err(PayloadError::NotAnArray(_))));
    }

    #[test]
    fn invalid_json_is_malformed() {
        assert!(matches!(
            RawCatalogPayload::from_slice(b"{not json"),
            Err(PayloadError::InvalidJson(_))
        ));
    }

    #[test]
    fn version_from_first_element() {
        let decoded = decode(json!([{"id": "1", "version": "2024.3"}, {"id": "2"}])).unwrap();
        assert_eq!(decoded.version, "2024.3");

        let decoded = decode(json!([{"id": "1", "version": 5}])).unwrap();
        assert_eq!(decoded.version, "5");
    }

    #[test]
    fn wrapped_entries_never_supply_version() {
        let decoded = decode(json!({"plants": [{"id": "1", "version": "inner"}]})).unwrap();
        assert_eq!(decoded.version, DEFAULT_VERSION);
    }

    #[test]
    fn top_level_version_beats_first_element() {
        let decoded = decode(json!({"version": "top", "plants": [{"id": "1", "version": "inner"}]})).unwrap();
        assert_eq!(decoded.version, "top");
    }

    #[test]
    fn empty_version_falls_back() {
        let decoded = decode(json!({"version": "", "plants": []})).unwrap();
        assert_eq!(decoded.version, DEFAULT_VERSION);
    }

    #[test]
    fn duplicates_and_idless_items_skipped() {
        let decoded = decode(json!([
            {"id": "1", "title": "first"},
            {"title": "no id"},
            {"id": "1", "title": "again"},
            {"id": 2}
        ]))
        .unwrap();
        let ids: Vec<_> = decoded.entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
        assert_eq!(decoded.entries[0].title, "first");
        assert_eq!(decoded.skipped, 2);
    }

    #[test]
    fn banners_top_level_then_first_entry() {
        let top = RawCatalogPayload::from_value(json!({
            "banner": [{"image": "a.jpg", "title": "A"}],
            "plants": [{"id": "1", "banner": [{"image": "b.jpg", "title": "B"}]}]
        }))
        .unwrap();
        assert_eq!(top.banners().unwrap()[0].title, "A");

        let inner = RawCatalogPayload::from_value(json!([
            {"id": "1", "banner": [{"image": "b.jpg", "title": "B"}]}
        ]))
        .unwrap();
        assert_eq!(inner.banners().unwrap()[0].title, "B");

        let none = RawCatalogPayload::from_value(json!([{"id": "1"}])).unwrap();
        assert!(none.banners().is_none());
    }

    #[test]
    fn banners_from_decoded_entries() {
        let decoded = decode(json!([{"id": "1", "banner": [{"image": "x", "title": "X"}]}])).unwrap();
        let banners = banners_from_entries(&decoded.entries).unwrap();
        assert_eq!(banners, vec![Banner { image: "x".into(), title: "X".into() }]);
    }
}
