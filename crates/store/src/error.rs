use vigil_core::CoreError;

/// Errors surfaced by [`LocalStore`](crate::LocalStore) operations.
///
/// Backend failures (quota, corruption, constraint violations) are
/// propagated as-is; the store never retries.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend rejected a read or write.
    #[error("Storage error: {0}")]
    Database(#[from] sqlx::Error),

    /// The schema could not be brought up to date.
    #[error("Storage migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Input failed a domain rule (e.g. group name too long).
    #[error(transparent)]
    Core(#[from] CoreError),
}
