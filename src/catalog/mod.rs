//! Catalog Cache Manager: fetching, decoding and caching the plant catalog.
//!
//! - [`fetcher`] - bounded HTTP GET of the raw catalog body
//! - [`payload`] - normalization of the two payload shapes at the boundary
//! - `manager` - TTL, background revalidation and stale fallback
//!
//! # Example
//!
//! ```ignore
//! let manager = CatalogCacheManager::new(db, client, &config);
//! let load = manager.get_catalog().await?;
//! if load.is_stale() {
//!     // show "showing cached data"
//! }
//! ```

pub mod fetcher;
mod manager;
pub mod payload;

pub use fetcher::{build_client, FetchError};
pub use manager::{CatalogCacheManager, CatalogError, CatalogLoad, Provenance, RevalidationOutcome};
pub use payload::{PayloadError, RawCatalogPayload, DEFAULT_VERSION};
