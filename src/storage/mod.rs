//! Durable local state: a SQLite-backed key/value table.
//!
//! - `schema` opens the database and runs the migration
//! - `kv` provides get/set/remove and single-key read-modify-write
//! - `snapshot` stores the catalog snapshot as three keys written together

mod kv;
mod schema;
mod snapshot;
mod types;

pub use schema::Database;
pub use types::{keys, DatabaseError};
