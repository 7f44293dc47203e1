//! duorou: offline-first succulent plant catalog client.
//!
//! The catalog is fetched from a static JSON endpoint and cached locally
//! with a 24 hour TTL and background revalidation; bookmarks and display
//! preferences live in the same local store. Surfaces (feed, categories,
//! search, collection, detail, settings) are thin views over those two
//! services, rebuilt from storage every time they activate.

pub mod catalog;
pub mod config;
pub mod model;
pub mod projection;
pub mod storage;
pub mod surface;
pub mod theme;
pub mod user_state;
pub mod util;
