//! View-local projection of a catalog snapshot.
//!
//! Everything here is pure: a surface feeds in the snapshot entries, its
//! filter and the collection it read on activation, and gets back the rows
//! to render. Nothing is cached between activations.
use std::collections::HashMap;

use crate::model::CatalogEntry;
use crate::user_state::CollectionSet;

/// Entries per page.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Key of the synthetic bucket matching every entry.
pub const ALL_KEY: &str = "all";

/// Key of the synthetic bucket matching entries with a blank category.
pub const UNCATEGORIZED_KEY: &str = "uncategorized";

// ============================================================================
// Filters
// ============================================================================

/// Category selection for list surfaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryFilter {
    All,
    Uncategorized,
    Named(String),
}

impl CategoryFilter {
    /// Map a bucket key to a filter. The synthetic keys win over a real
    /// category of the same name.
    pub fn parse(key: &str) -> Self {
        match key {
            ALL_KEY => Self::All,
            UNCATEGORIZED_KEY => Self::Uncategorized,
            other => Self::Named(other.to_string()),
        }
    }

    pub fn matches(&self, entry: &CatalogEntry) -> bool {
        match self {
            Self::All => true,
            Self::Uncategorized => entry.is_uncategorized(),
            Self::Named(name) => entry.category == *name,
        }
    }
}

/// What a surface shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Category(CategoryFilter),
    /// Case-insensitive substring search. A blank keyword matches nothing.
    Keyword(String),
}

impl Filter {
    pub fn matches(&self, entry: &CatalogEntry) -> bool {
        match self {
            Self::Category(category) => category.matches(entry),
            Self::Keyword(keyword) => {
                let needle = fold_case(keyword.trim());
                !needle.is_empty() && keyword_matches(entry, &needle)
            }
        }
    }
}

fn keyword_matches(entry: &CatalogEntry, needle: &str) -> bool {
    let hit = |s: &str| fold_case(s).contains(needle);
    hit(&entry.title)
        || hit(&entry.category)
        || entry.description.as_deref().is_some_and(hit)
        || entry.tags.iter().any(|t| hit(t))
        || entry.articles.iter().any(|a| hit(&a.title))
}

/// Per-character lowercase. Search and [`highlight`] both fold with this so
/// every search hit has a highlighted run.
fn fold_case(s: &str) -> String {
    s.chars().flat_map(char::to_lowercase).collect()
}

// ============================================================================
// Projection
// ============================================================================

/// An entry with its collection flag for the current activation.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedEntry<'a> {
    pub entry: &'a CatalogEntry,
    pub is_collected: bool,
}

/// Filter `entries` in order and mark collected ones.
pub fn project<'a>(
    entries: &'a [CatalogEntry],
    filter: &Filter,
    collection: &CollectionSet,
) -> Vec<AnnotatedEntry<'a>> {
    // Blank search short-circuits before touching any entry.
    if let Filter::Keyword(keyword) = filter {
        if keyword.trim().is_empty() {
            return Vec::new();
        }
    }

    let collected = collection.id_set();
    entries
        .iter()
        .filter(|entry| filter.matches(entry))
        .map(|entry| AnnotatedEntry {
            entry,
            is_collected: collected.contains(entry.id.as_str()),
        })
        .collect()
}

/// One page of a projected list.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-indexed page number actually served.
    pub page: usize,
    pub has_more: bool,
    pub total: usize,
}

/// Cut page `page` (1-indexed, 0 read as 1) out of `items`.
pub fn paginate<T>(items: Vec<T>, page: usize, page_size: usize) -> Page<T> {
    let page = page.max(1);
    let size = page_size.max(1);
    let total = items.len();
    let start = (page - 1).saturating_mul(size);
    let end = page.saturating_mul(size);

    Page {
        items: items.into_iter().skip(start).take(size).collect(),
        page,
        has_more: end < total,
        total,
    }
}

// ============================================================================
// Category Summary
// ============================================================================

/// One row of the category overview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryBucket {
    /// Filter key: a category name, or [`ALL_KEY`] / [`UNCATEGORIZED_KEY`].
    pub key: String,
    pub label: String,
    pub count: usize,
    pub icon: &'static str,
}

impl CategoryBucket {
    pub fn filter(&self) -> CategoryFilter {
        CategoryFilter::parse(&self.key)
    }
}

/// `all` first, named categories by descending count (ties in order of
/// first appearance), `uncategorized` last when nonempty.
pub fn category_summary(entries: &[CatalogEntry]) -> Vec<CategoryBucket> {
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut uncategorized = 0;

    for entry in entries {
        if entry.is_uncategorized() {
            uncategorized += 1;
            continue;
        }
        let count = counts.entry(entry.category.as_str()).or_insert_with(|| {
            order.push(entry.category.as_str());
            0
        });
        *count += 1;
    }

    // Stable sort keeps first-appearance order among equal counts.
    order.sort_by(|a, b| counts[b].cmp(&counts[a]));

    let mut buckets = Vec::with_capacity(order.len() + 2);
    buckets.push(CategoryBucket {
        key: ALL_KEY.to_string(),
        label: "全部".to_string(),
        count: entries.len(),
        icon: DEFAULT_ICON,
    });
    buckets.extend(order.into_iter().map(|name| CategoryBucket {
        key: name.to_string(),
        label: name.to_string(),
        count: counts[name],
        icon: category_icon(name),
    }));
    if uncategorized > 0 {
        buckets.push(CategoryBucket {
            key: UNCATEGORIZED_KEY.to_string(),
            label: "未分类".to_string(),
            count: uncategorized,
            icon: DEFAULT_ICON,
        });
    }
    buckets
}

const DEFAULT_ICON: &str = "🌱";

/// Glyph for a plant family.
pub fn category_icon(category: &str) -> &'static str {
    match category {
        "景天科" => "🌵",
        "番杏科" => "🌿",
        "仙人掌科" => "🌵",
        "百合科" => "🌸",
        "龙舌兰科" => "🌱",
        "大戟科" => "🍃",
        "萝藦科" => "🌺",
        "菊科" => "🌼",
        "马齿苋科" => "🍀",
        _ => DEFAULT_ICON,
    }
}

// ============================================================================
// Highlighting
// ============================================================================

/// A run of text, flagged when it matched the search keyword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment<'a> {
    pub text: &'a str,
    pub matched: bool,
}

/// Split `text` around case-insensitive occurrences of `keyword`.
///
/// Matching is per character so multi-byte text never splits mid-char. A
/// blank keyword yields the whole text unmatched.
pub fn highlight<'a>(text: &'a str, keyword: &str) -> Vec<Segment<'a>> {
    let needle: Vec<char> = fold_case(keyword.trim()).chars().collect();
    if needle.is_empty() || text.is_empty() {
        return plain(text);
    }

    // Folded chars with the byte span of the source char each came from. A
    // char whose lowercase form expands contributes several folded chars
    // sharing one span.
    let folded: Vec<(usize, usize, char)> = text
        .char_indices()
        .flat_map(|(i, c)| {
            let end = i + c.len_utf8();
            c.to_lowercase().map(move |l| (i, end, l))
        })
        .collect();

    let mut segments = Vec::new();
    let mut plain_start = 0;
    let mut i = 0;
    while i + needle.len() <= folded.len() {
        let window = &folded[i..i + needle.len()];
        let start = window[0].0;
        if start >= plain_start && window.iter().map(|(_, _, c)| *c).eq(needle.iter().copied()) {
            let end = window[needle.len() - 1].1;
            if plain_start < start {
                segments.push(Segment {
                    text: &text[plain_start..start],
                    matched: false,
                });
            }
            segments.push(Segment {
                text: &text[start..end],
                matched: true,
            });
            plain_start = end;
            i += needle.len();
        } else {
            i += 1;
        }
    }
    if plain_start < text.len() {
        segments.push(Segment {
            text: &text[plain_start..],
            matched: false,
        });
    }
    segments
}

fn plain(text: &str) -> Vec<Segment<'_>> {
    if text.is_empty() {
        Vec::new()
    } else {
        vec![Segment {
            text,
            matched: false,
        }]
    }
}
