//! Surfaces: one view of the catalog (feed, category list, search results,
//! collection, detail, settings).
//!
//! A surface owns nothing durable. [`Surface::activate`] re-reads
//! preferences, the collection and (where shown) the catalog, and every
//! derived value is recomputed from those reads. Surfaces never notify each
//! other: a change made in one is seen by a sibling on its next activation.
//! Concurrent writers from different surfaces resolve last-write-wins.
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::catalog::{CatalogCacheManager, CatalogError, CatalogLoad, RevalidationOutcome};
use crate::config::Config;
use crate::model::{Banner, CatalogEntry, CatalogSnapshot};
use crate::projection::{self, AnnotatedEntry, CategoryBucket, CategoryFilter, Filter, Page};
use crate::storage::Database;
use crate::theme::{FontSize, NavigationColors, ThemeName};
use crate::user_state::{
    CollectionSet, Preferences, PreferencesPatch, UserStateError, UserStateStore,
};

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    UserState(#[from] UserStateError),
    #[error("No entry with id {0}")]
    EntryNotFound(String),
}

// ============================================================================
// Services
// ============================================================================

/// Shared services handed to every surface.
#[derive(Clone)]
pub struct Services {
    pub catalog: CatalogCacheManager,
    pub user_state: UserStateStore,
    pub page_size: usize,
}

impl Services {
    pub fn new(db: Database, client: reqwest::Client, config: &Config) -> Self {
        Self {
            catalog: CatalogCacheManager::new(db.clone(), client, config),
            user_state: UserStateStore::new(db),
            page_size: config.page_size,
        }
    }
}

// ============================================================================
// Display Settings
// ============================================================================

/// Values derived from [`Preferences`] for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplaySettings {
    pub theme: ThemeName,
    pub font_size: FontSize,
    pub font_points: u32,
    pub navigation: NavigationColors,
}

impl DisplaySettings {
    pub fn from_preferences(prefs: &Preferences) -> Self {
        Self {
            theme: prefs.theme_name.clone(),
            font_size: prefs.font_size,
            font_points: prefs.font_size.points(),
            navigation: prefs.theme_name.navigation_colors(),
        }
    }
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self::from_preferences(&Preferences::default())
    }
}

// ============================================================================
// Surface
// ============================================================================

/// Which view a surface renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceKind {
    /// Home feed: banners and every entry.
    Feed,
    /// Category overview.
    Categories,
    /// Entries of one category.
    List(CategoryFilter),
    /// Keyword results.
    Search(String),
    /// Bookmarked entries.
    Collection,
    /// One entry.
    Detail(String),
    Settings,
}

impl SurfaceKind {
    /// Whether activation loads the catalog.
    fn shows_catalog(&self) -> bool {
        !matches!(self, Self::Collection | Self::Settings)
    }

    pub fn title(&self) -> String {
        match self {
            Self::Feed => "多肉花园".to_string(),
            Self::Categories => "植物分类".to_string(),
            Self::List(CategoryFilter::All) => "全部".to_string(),
            Self::List(CategoryFilter::Uncategorized) => "未分类".to_string(),
            Self::List(CategoryFilter::Named(name)) => name.clone(),
            Self::Search(keyword) => format!("搜索: {keyword}"),
            Self::Collection => "我的收藏".to_string(),
            Self::Detail(_) => "植物详情".to_string(),
            Self::Settings => "设置".to_string(),
        }
    }
}

pub struct Surface {
    kind: SurfaceKind,
    services: Services,
    display: DisplaySettings,
    collection: CollectionSet,
    snapshot: Option<CatalogSnapshot>,
    stale: bool,
    revalidation: Option<JoinHandle<RevalidationOutcome>>,
}

impl Surface {
    pub fn new(kind: SurfaceKind, services: Services) -> Self {
        Self {
            kind,
            services,
            display: DisplaySettings::default(),
            collection: CollectionSet::default(),
            snapshot: None,
            stale: false,
            revalidation: None,
        }
    }

    pub fn kind(&self) -> &SurfaceKind {
        &self.kind
    }

    /// Re-read everything this surface shows.
    ///
    /// Preferences and the collection are refreshed before the catalog, so
    /// a `DataUnavailable` failure still leaves current display settings.
    pub async fn activate(&mut self) -> Result<(), SurfaceError> {
        self.reload_user_state().await?;
        if self.kind.shows_catalog() {
            let load = self.services.catalog.get_catalog().await?;
            self.apply_load(load);
        }
        tracing::debug!(surface = ?self.kind, stale = self.stale, "Surface activated");
        Ok(())
    }

    /// Forced catalog fetch (pull-to-refresh).
    pub async fn refresh(&mut self) -> Result<(), SurfaceError> {
        self.reload_user_state().await?;
        let load = self.services.catalog.refresh().await?;
        self.apply_load(load);
        Ok(())
    }

    /// Wait for a pending background revalidation, if any.
    pub async fn settle(&mut self) -> Option<RevalidationOutcome> {
        let handle = self.revalidation.take()?;
        match handle.await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                tracing::warn!(error = %e, "Background revalidation task failed");
                None
            }
        }
    }

    pub fn display(&self) -> &DisplaySettings {
        &self.display
    }

    pub fn collection(&self) -> &CollectionSet {
        &self.collection
    }

    pub fn snapshot(&self) -> Option<&CatalogSnapshot> {
        self.snapshot.as_ref()
    }

    /// True when the catalog shown is a fallback after a failed fetch.
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Rows for list-like surfaces. Empty for categories, detail and settings.
    pub fn rows(&self, page: usize) -> Page<AnnotatedEntry<'_>> {
        let rows = match &self.kind {
            SurfaceKind::Feed => self.project(&Filter::Category(CategoryFilter::All)),
            SurfaceKind::List(category) => self.project(&Filter::Category(category.clone())),
            SurfaceKind::Search(keyword) => self.project(&Filter::Keyword(keyword.clone())),
            SurfaceKind::Collection => self
                .collection
                .entries()
                .iter()
                .map(|entry| AnnotatedEntry {
                    entry,
                    is_collected: true,
                })
                .collect(),
            SurfaceKind::Categories | SurfaceKind::Detail(_) | SurfaceKind::Settings => Vec::new(),
        };
        projection::paginate(rows, page, self.services.page_size)
    }

    pub fn categories(&self) -> Vec<CategoryBucket> {
        self.snapshot
            .as_ref()
            .map(|s| projection::category_summary(&s.entries))
            .unwrap_or_default()
    }

    /// The entry of a detail surface, falling back to the collected snapshot
    /// when the catalog no longer has it.
    pub fn detail(&self) -> Option<AnnotatedEntry<'_>> {
        let SurfaceKind::Detail(id) = &self.kind else {
            return None;
        };
        self.lookup(id).map(|entry| AnnotatedEntry {
            entry,
            is_collected: self.collection.contains(id),
        })
    }

    pub async fn banners(&self) -> Vec<Banner> {
        self.services.catalog.banners().await
    }

    /// Toggle bookmark state of `id` and re-read. Returns whether the entry
    /// is now collected.
    pub async fn toggle_collection(&mut self, id: &str) -> Result<bool, SurfaceError> {
        let entry = self
            .lookup(id)
            .cloned()
            .ok_or_else(|| SurfaceError::EntryNotFound(id.to_string()))?;
        self.services.user_state.toggle_collection(&entry).await?;
        self.reload_user_state().await?;
        Ok(self.collection.contains(id))
    }

    pub async fn remove_from_collection(&mut self, id: &str) -> Result<(), SurfaceError> {
        self.services.user_state.remove_from_collection(id).await?;
        self.reload_user_state().await?;
        Ok(())
    }

    pub async fn clear_collection(&mut self) -> Result<(), SurfaceError> {
        self.services.user_state.clear_collection().await?;
        self.reload_user_state().await?;
        Ok(())
    }

    pub async fn update_preferences(
        &mut self,
        patch: PreferencesPatch,
    ) -> Result<&DisplaySettings, SurfaceError> {
        self.services.user_state.set_preferences(patch).await?;
        self.reload_user_state().await?;
        Ok(&self.display)
    }

    pub async fn clear_cache(&mut self) -> Result<(), SurfaceError> {
        self.services.catalog.clear_cache().await?;
        self.snapshot = None;
        self.stale = false;
        Ok(())
    }

    // ========================================================================
    // Internal Helpers
    // ========================================================================

    async fn reload_user_state(&mut self) -> Result<(), UserStateError> {
        let prefs = self.services.user_state.preferences().await?;
        self.display = DisplaySettings::from_preferences(&prefs);
        self.collection = self.services.user_state.collection().await?;
        Ok(())
    }

    fn apply_load(&mut self, load: CatalogLoad) {
        self.stale = load.is_stale();
        if let Some(previous) = self.revalidation.take() {
            previous.abort();
        }
        self.revalidation = load.revalidation;
        self.snapshot = Some(load.snapshot);
    }

    fn project(&self, filter: &Filter) -> Vec<AnnotatedEntry<'_>> {
        match &self.snapshot {
            Some(snapshot) => projection::project(&snapshot.entries, filter, &self.collection),
            None => Vec::new(),
        }
    }

    fn lookup(&self, id: &str) -> Option<&CatalogEntry> {
        self.snapshot
            .as_ref()
            .and_then(|s| s.find(id))
            .or_else(|| self.collection.entries().iter().find(|e| e.id == id))
    }
}
