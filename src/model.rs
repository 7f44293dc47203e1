//! Catalog data model shared by the cache manager, the projections and the
//! collection store.
//!
//! Entries are read-only on the client. Fields the client does not interpret
//! are kept in [`CatalogEntry::extra`] so an entry stored in the collection
//! round-trips exactly as the server sent it.
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// Catalog Entry
// ============================================================================

/// One plant record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Unique across the whole catalog. Numeric ids from the admin tool are
    /// normalized to their decimal string.
    #[serde(deserialize_with = "de_id")]
    pub id: String,

    #[serde(default, deserialize_with = "de_nullable_string")]
    pub title: String,

    /// Empty (or whitespace) means uncategorized.
    #[serde(default, deserialize_with = "de_nullable_string")]
    pub category: String,

    /// Icon reference.
    #[serde(
        default,
        rename = "src",
        alias = "imageRef",
        deserialize_with = "de_nullable_string"
    )]
    pub image_ref: String,

    #[serde(default, deserialize_with = "de_articles")]
    pub articles: Vec<ArticleLink>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "de_string_list"
    )]
    pub tags: Vec<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CatalogEntry {
    /// Minimal constructor, mostly for tests and fixtures.
    pub fn new(id: impl Into<String>, title: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            category: category.into(),
            image_ref: String::new(),
            articles: Vec::new(),
            description: None,
            tags: Vec::new(),
            extra: Map::new(),
        }
    }

    pub fn is_uncategorized(&self) -> bool {
        self.category.trim().is_empty()
    }
}

/// A linked article about a plant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleLink {
    #[serde(default, deserialize_with = "de_nullable_string")]
    pub title: String,
    #[serde(default, deserialize_with = "de_nullable_string")]
    pub url: String,
    #[serde(default, rename = "type", deserialize_with = "de_nullable_string")]
    pub kind: String,
}

// ============================================================================
// Snapshot
// ============================================================================

/// The client's cached copy of the full catalog.
///
/// Replaced wholesale on every version change, never patched. `entries` is
/// behind an `Arc` so surfaces can hold the same snapshot without copying.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogSnapshot {
    pub entries: Arc<Vec<CatalogEntry>>,
    pub version: String,
    pub fetched_at: DateTime<Utc>,
}

impl CatalogSnapshot {
    pub fn new(entries: Vec<CatalogEntry>, version: impl Into<String>, fetched_at: DateTime<Utc>) -> Self {
        Self {
            entries: Arc::new(entries),
            version: version.into(),
            fetched_at,
        }
    }

    /// Age relative to `now`. Negative if `fetched_at` is in the future.
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.fetched_at
    }

    pub fn find(&self, id: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.id == id)
    }
}

// ============================================================================
// Banner
// ============================================================================

/// A carousel item on the home feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Banner {
    #[serde(default, deserialize_with = "de_nullable_string")]
    pub image: String,
    #[serde(default, deserialize_with = "de_nullable_string")]
    pub title: String,
}

impl Banner {
    /// Banners shown when the catalog carries none.
    pub fn defaults() -> Vec<Banner> {
        [
            (
                "https://mmbiz.qpic.cn/sz_mmbiz_jpg/venVgYic7svSmSgiaN806tNPsiaThgqWloRVKBR8B4uQWLZ7PCdYenFxmNTh1eYAPVdwMBia6emTCcQgH6zb8LKKYg/0?from=appmsg",
                "多肉花园",
            ),
            (
                "https://mmbiz.qpic.cn/sz_mmbiz_jpg/venVgYic7svSmSgiaN806tNPsiaThgqWloRsibibxjljR3KXU8FE9H9ObzjhbEbKUHRiaM8wtftLY1KdyDHsCmdpT7kw/0?from=appmsg",
                "发现多肉之美",
            ),
            (
                "https://mmbiz.qpic.cn/sz_mmbiz_jpg/venVgYic7svSmSgiaN806tNPsiaThgqWloRsCSRicqukwHUjeZDrfpmBkbY4YQjHJFCc049KVfm5ia9snUWraTtebAQ/0?from=appmsg",
                "多肉百科全书",
            ),
        ]
        .into_iter()
        .map(|(image, title)| Banner {
            image: image.to_string(),
            title: title.to_string(),
        })
        .collect()
    }
}

// ============================================================================
// Lenient field decoding
// ============================================================================

fn de_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) if !s.trim().is_empty() => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "entry id must be a non-empty string or number, got {other}"
        ))),
    }
}

fn de_nullable_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Tags may contain nulls or non-strings in hand-edited data; keep only strings.
fn de_string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

/// `articles` may be null or contain junk; keep the object-shaped items.
fn de_articles<'de, D>(deserializer: D) -> Result<Vec<ArticleLink>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|v| serde_json::from_value(v).ok())
            .collect(),
        _ => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn numeric_id_is_normalized() {
        let entry: CatalogEntry = serde_json::from_value(json!({"id": 42, "title": "熊童子"})).unwrap();
        assert_eq!(entry.id, "42");
    }

    #[test]
    fn missing_id_is_rejected() {
        let result = serde_json::from_value::<CatalogEntry>(json!({"title": "no id"}));
        assert!(result.is_err());
    }

    #[test]
    fn null_fields_default() {
        let entry: CatalogEntry = serde_json::from_value(json!({
            "id": "a",
            "title": null,
            "category": null,
            "articles": null,
            "tags": ["ok", null, 3]
        }))
        .unwrap();
        assert_eq!(entry.title, "");
        assert!(entry.is_uncategorized());
        assert!(entry.articles.is_empty());
        assert_eq!(entry.tags, vec!["ok".to_string()]);
    }

    #[test]
    fn image_ref_accepts_src_and_alias() {
        let a: CatalogEntry = serde_json::from_value(json!({"id": "a", "src": "x.webp"})).unwrap();
        let b: CatalogEntry = serde_json::from_value(json!({"id": "b", "imageRef": "y.webp"})).unwrap();
        assert_eq!(a.image_ref, "x.webp");
        assert_eq!(b.image_ref, "y.webp");
    }

    #[test]
    fn unknown_fields_round_trip() {
        let raw = json!({
            "id": "p1",
            "title": "玉露",
            "category": "百合科",
            "src": "icon/yulu.jpg",
            "articles": [{"title": "养护", "url": "https://example.com/a", "type": "care"}],
            "srcList": [{"local": "a.jpg", "remote": "b.jpg"}],
            "genus": "Haworthia"
        });
        let entry: CatalogEntry = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(entry.articles[0].kind, "care");
        assert_eq!(entry.extra.get("genus"), Some(&json!("Haworthia")));

        let back = serde_json::to_value(&entry).unwrap();
        assert_eq!(back, raw);
    }

    #[test]
    fn whitespace_category_is_uncategorized() {
        assert!(CatalogEntry::new("a", "t", "  \t").is_uncategorized());
        assert!(!CatalogEntry::new("a", "t", "景天科").is_uncategorized());
    }

    #[test]
    fn snapshot_find_by_id() {
        let snap = CatalogSnapshot::new(
            vec![CatalogEntry::new("1", "a", ""), CatalogEntry::new("2", "b", "")],
            "v1",
            Utc::now(),
        );
        assert_eq!(snap.find("2").map(|e| e.title.as_str()), Some("b"));
        assert!(snap.find("3").is_none());
    }

    #[test]
    fn default_banners_present() {
        let banners = Banner::defaults();
        assert_eq!(banners.len(), 3);
        assert_eq!(banners[0].title, "多肉花园");
    }
}
