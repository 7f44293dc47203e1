use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Database-specific errors with user-friendly messages
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Another instance of the application has locked the database
    #[error("Another instance of duorou appears to be running. Please close it and try again.")]
    InstanceLocked,

    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Check if a sqlx error indicates database locking
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        let error_string = err.to_string().to_lowercase();

        // SQLITE_BUSY (5): database is locked
        // SQLITE_LOCKED (6): database table is locked
        // SQLITE_CANTOPEN (14): unable to open database file
        if error_string.contains("database is locked")
            || error_string.contains("database table is locked")
            || error_string.contains("sqlite_busy")
            || error_string.contains("sqlite_locked")
            || error_string.contains("unable to open database file")
        {
            return DatabaseError::InstanceLocked;
        }

        DatabaseError::Other(err)
    }
}

// ============================================================================
// Storage Keys
// ============================================================================

/// Keys used in the `local_storage` table.
///
/// The three `CATALOG_*` keys describe one snapshot and are always written
/// and removed together.
pub mod keys {
    pub const CATALOG_ENTRIES: &str = "catalog.entries";
    pub const CATALOG_VERSION: &str = "catalog.version";
    pub const CATALOG_FETCHED_AT: &str = "catalog.fetched_at";
    pub const COLLECTION: &str = "collection";
    pub const USER_SETTINGS: &str = "user_settings";
}
